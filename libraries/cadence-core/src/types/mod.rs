mod ids;
mod track;

pub use ids::{PlaylistId, TrackId};
pub use track::Track;
