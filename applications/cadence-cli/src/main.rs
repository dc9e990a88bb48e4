/// Cadence CLI - headless playback controller driver
use anyhow::Context;
use cadence_cli::{repl, CliConfig, JsonLibrary, SimulatedPlayer};
use cadence_playback::{JsonSessionStore, PlaybackController, PlaybackSnapshot};
use clap::Parser;
use crossbeam_channel::Receiver;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-cli")]
#[command(about = "Drive the Cadence playback controller from stdin", long_about = None)]
struct Cli {
    /// Library manifest (JSON)
    #[arg(short, long, env = "CADENCE_LIBRARY")]
    library: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session file path (overrides configuration)
    #[arg(short, long)]
    session: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_cli=info,cadence_playback=info,cadence_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(library) = cli.library {
        config.library.manifest = Some(library);
    }
    if let Some(session) = cli.session {
        config.session.path = session;
    }
    config.validate()?;

    let library = match &config.library.manifest {
        Some(path) => JsonLibrary::open(path)?,
        None => {
            tracing::warn!("No library manifest configured; starting with an empty library");
            JsonLibrary::empty()
        }
    };

    tracing::info!("Session file: {}", config.session.path.display());

    let player = SimulatedPlayer::new(Duration::from_millis(config.player.prepare_delay_ms));
    let controller = PlaybackController::builder(player)
        .config(config.playback.clone())
        .session(JsonSessionStore::new(config.session.path.clone()))
        .spawn()
        .context("failed to start playback controller")?;

    let printer = spawn_printer(controller.subscribe())?;

    controller.load_library(&library)?;
    controller.restore_session()?;

    run_repl(&controller, &library)?;

    tracing::info!("Shutting down");
    controller.shutdown()?;
    printer.join().ok();

    Ok(())
}

fn run_repl(controller: &PlaybackController, library: &JsonLibrary) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", repl::HELP);
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;

        match repl::parse(&line) {
            Ok(command) => match repl::execute(controller, library, command) {
                Ok(flow) if flow.is_break() => break,
                Ok(_) => {}
                Err(e) => eprintln!("error: {}", e),
            },
            Err(repl::ParseError::Empty) => {}
            Err(e) => eprintln!("{} (try 'help')", e),
        }

        print!("> ");
        stdout.flush()?;
    }

    Ok(())
}

/// Log every snapshot until the controller goes away
fn spawn_printer(snapshots: Receiver<PlaybackSnapshot>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("snapshot-printer".to_string())
        .spawn(move || {
            for snapshot in snapshots {
                match &snapshot.error {
                    Some(error) => tracing::warn!("'{}': {}", snapshot.title, error),
                    None => tracing::info!(
                        "{} '{}' by {} [{} / {} ms]",
                        if snapshot.is_playing { "Playing" } else { "Paused" },
                        snapshot.title,
                        snapshot.artist,
                        snapshot.position_ms,
                        snapshot.duration_ms
                    ),
                }
            }
        })
}
