// src/main.rs
mod cli;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use hand_tracker::config::Config;
use hand_tracker::data::DataExporter;
use hand_tracker::mediapipe_bridge::JsonLinesSource;
use hand_tracker::report;
use hand_tracker::TrackingSession;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // --verbose enables debug-level output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            name,
            fps,
            output,
            dry_run,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_analyze(&input, name, fps, output, dry_run, config)
        }
        Commands::InitConfig { path, force } => run_init_config(path, force),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_default().context("Failed to load default config"),
    }
}

fn run_analyze(
    input: &Path,
    name: Option<String>,
    fps: Option<f64>,
    output: Option<PathBuf>,
    dry_run: bool,
    mut config: Config,
) -> Result<()> {
    if let Some(fps) = fps {
        config.analysis.frame_rate = fps;
    }
    if let Some(output) = output {
        config.export.output_dir = output;
    }

    let name = name.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string())
    });

    let mut source = JsonLinesSource::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut session = TrackingSession::new(name.clone(), config).context("Invalid configuration")?;

    info!("Analyzing {} as session {}", input.display(), name);
    session
        .process_source(&mut source)
        .with_context(|| format!("Failed at line {} of {}", source.line_number(), input.display()))?;

    if session.store().is_empty() {
        warn!("No hands were detected in {}", input.display());
    }

    let analysis = session.analyze().context("Failed to analyze session")?;
    println!("{}", report::render_report(&analysis));

    if dry_run {
        info!("Dry run: no files written");
        return Ok(());
    }

    let export = &session.config().export;
    let exporter = DataExporter::new(&export.output_dir, Some(name));
    let files = exporter
        .export_session(session.store(), &analysis, export)
        .with_context(|| format!("Failed to write outputs to {}", exporter.session_dir().display()))?;

    for path in [files.csv, files.report, files.series].into_iter().flatten() {
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn run_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
