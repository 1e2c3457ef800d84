use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tools::{ReplayError, Trace, run};
use tracing_subscriber::EnvFilter;
use tracking::TrackerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a recorded bus-tracking session headlessly")]
struct Args {
    /// JSON trace: `{"user": {...}, "steps": [...]}`
    #[arg(long)]
    trace: PathBuf,

    /// Tracker config JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the summary
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), ReplayError> {
    let config = match &args.config {
        Some(path) => TrackerConfig::from_json(&read(path)?)?,
        None => TrackerConfig::default(),
    };
    let trace = Trace::from_json(&read(&args.trace)?)?;
    tracing::info!(steps = trace.steps.len(), "replaying trace");

    let summary = run(&trace, &config)?;
    let out = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{out}");
    Ok(())
}

fn read(path: &PathBuf) -> Result<String, ReplayError> {
    fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.display().to_string(),
        source,
    })
}
