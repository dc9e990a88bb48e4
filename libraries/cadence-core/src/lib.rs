//! Cadence Core
//!
//! Platform-agnostic domain types, collaborator traits, and error handling
//! shared by the Cadence playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackId`, `PlaylistId`
//! - **Collaborator Traits**: `LibraryProvider`, `PlaylistStore`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{resolve_tracks, Track, TrackId};
//!
//! let library = vec![
//!     Track::new("a", "Intro", "Band", "/music/intro.flac", 90_000),
//!     Track::new("b", "Outro", "Band", "/music/outro.flac", 120_000),
//! ];
//!
//! let queue = resolve_tracks(&library, &[TrackId::new("b"), TrackId::new("missing")]);
//! assert_eq!(queue.len(), 1);
//! assert_eq!(queue[0].title, "Outro");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CadenceError, Result};
pub use traits::{resolve_tracks, LibraryProvider, PlaylistStore};
pub use types::{PlaylistId, Track, TrackId};
