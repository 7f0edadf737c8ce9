//! neurolock
//!
//! Command-line front end: enroll, authenticate, delete, list and self-test.
//! Exit codes follow `ExitStatus`; rejection is distinct from every error.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neurolock_core::capture::{CaptureGuard, SimulatedDevice};
use neurolock_core::prelude::*;
use neurolock_core::utils::hex_preview;

#[derive(Parser)]
#[command(name = "neurolock", version, about = "EEG biometric authentication")]
struct Cli {
    /// JSON engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the template directory
    #[arg(long, global = true)]
    template_dir: Option<PathBuf>,

    /// Capture device name
    #[arg(long, global = true, default_value = "simulated")]
    device: String,

    /// Mental task label (0-4)
    #[arg(long, global = true, default_value_t = 0)]
    task: i32,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record trials and store a new template
    Enroll { username: String },

    /// Record a trial and match it against the stored template
    Auth { username: String },

    /// Remove a stored template
    Delete {
        username: String,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// List enrolled users
    List,

    /// Run the pipeline once without touching stored templates
    Test,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.template_dir {
        cfg.template_dir = dir.clone();
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn parse_task(raw: i32) -> Result<MentalTask> {
    MentalTask::try_from(raw).map_err(|_| {
        anyhow::Error::new(NeuroError::Validation(format!("unknown task {} (expected 0-4)", raw)))
    })
}

fn device(cli: &Cli, cfg: &EngineConfig) -> SimulatedDevice {
    SimulatedDevice::new(cli.device.clone(), cfg.channels, cfg.sampling_rate)
}

fn banner(title: &str) {
    println!();
    println!("==============================================");
    println!("  NeuroLock :: {}", title);
    println!("==============================================");
}

fn show_instructions(task: MentalTask) {
    println!("Task: {}", task);
    for (i, line) in task.instructions().iter().enumerate() {
        println!("  {}. {}", i + 1, line);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let status = match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("error: {:#}", e);
            if let Some(ne) = e.downcast_ref::<NeuroError>() {
                ne.exit_status()
            } else if e.downcast_ref::<io::Error>().is_some() {
                ExitStatus::Io
            } else {
                ExitStatus::Validation
            }
        }
    };
    ExitCode::from(status.code())
}

fn run(cli: &Cli) -> Result<ExitStatus> {
    let cfg = load_config(cli)?;
    match &cli.command {
        Commands::Enroll { username } => cmd_enroll(cli, cfg, username),
        Commands::Auth { username } => cmd_auth(cli, cfg, username),
        Commands::Delete { username, yes } => cmd_delete(cfg, username, *yes),
        Commands::List => cmd_list(cli, cfg),
        Commands::Test => cmd_test(cli, cfg),
    }
}

fn cmd_enroll(cli: &Cli, cfg: EngineConfig, username: &str) -> Result<ExitStatus> {
    let task = parse_task(cli.task)?;
    let trials = cfg.enrollment_trials;
    let mut dev = device(cli, &cfg);
    let session = AuthSession::new(cfg)?;

    if !cli.json {
        banner("Enrollment");
        println!("User: {}  Device: {}  Trials: {}", username, cli.device, trials);
        show_instructions(task);
    }

    let report = session
        .enroll_from_source(username, &mut dev, task)
        .with_context(|| format!("enrollment of '{}' failed", username))?;

    if cli.json {
        let out = serde_json::json!({
            "username": report.username.as_str(),
            "path": report.path,
            "trials": report.trials,
        });
        println!("{}", out);
    } else {
        println!();
        println!("Enrolled '{}' from {} trials", report.username, report.trials);
        println!("Template: {}", report.path.display());
        for (stage, dur) in report.timings.ordered() {
            println!("  {:<10} {:>9.3} ms", stage.to_string(), dur.as_secs_f64() * 1_000.0);
        }
        println!("  {:<10} {:>9.3} ms", "total", report.timings.total().as_secs_f64() * 1_000.0);
    }
    Ok(ExitStatus::Success)
}

fn cmd_auth(cli: &Cli, cfg: EngineConfig, username: &str) -> Result<ExitStatus> {
    let task = parse_task(cli.task)?;
    let mut dev = device(cli, &cfg);
    let threshold = cfg.similarity_threshold;
    let session = AuthSession::new(cfg)?;

    if !cli.json {
        banner("Authentication");
        println!("User: {}  Device: {}", username, cli.device);
        show_instructions(task);
    }

    let result = session
        .authenticate_from_source(username, &mut dev, task)
        .with_context(|| format!("authentication of '{}' failed", username))?;

    if cli.json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!();
        if result.accepted {
            println!("ACCESS GRANTED");
        } else {
            println!("ACCESS DENIED");
        }
        println!(
            "Similarity: {:.4} (threshold {:.2}), attempts: {}",
            result.score, threshold, result.attempts
        );
    }
    Ok(result.status())
}

fn cmd_delete(cfg: EngineConfig, username: &str, yes: bool) -> Result<ExitStatus> {
    let session = AuthSession::new(cfg)?;
    if !session.exists(username)? {
        return Err(anyhow::Error::new(NeuroError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no template for '{}'", username),
        ))));
    }

    if !yes {
        print!("Delete template for '{}'? Type 'yes' to confirm: ", username);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != "yes" {
            println!("Aborted.");
            return Ok(ExitStatus::Cancelled);
        }
    }

    session.delete(username)?;
    println!("Deleted template for '{}'", username);
    Ok(ExitStatus::Success)
}

fn cmd_list(cli: &Cli, cfg: EngineConfig) -> Result<ExitStatus> {
    let dir = cfg.template_dir.clone();
    let session = AuthSession::new(cfg)?;
    let users = session.list()?;

    if cli.json {
        let names: Vec<&str> = users.iter().map(|u| u.as_str()).collect();
        println!("{}", serde_json::to_string(&names)?);
        return Ok(ExitStatus::Success);
    }

    if users.is_empty() {
        println!("No users enrolled in {}", dir.display());
    } else {
        println!("Enrolled users ({}):", users.len());
        for user in &users {
            println!("  {}", user);
        }
    }
    Ok(ExitStatus::Success)
}

/// Capture, extract, seal, verify and self-match one trial in memory.
fn cmd_test(cli: &Cli, cfg: EngineConfig) -> Result<ExitStatus> {
    let task = parse_task(cli.task)?;
    let mut dev = device(cli, &cfg);
    let capture_secs = cfg.capture_secs;
    let session = AuthSession::new(cfg)?;

    banner("System test");

    let raw = {
        let mut capture = CaptureGuard::start(&mut dev).context("device did not start")?;
        capture.record(capture_secs, task).context("capture failed")?
    };
    println!("[ok] capture: {} channels x {} samples", raw.n_channels(), raw.max_samples());

    let features = session.extractor().extract(&raw).context("feature extraction failed")?;
    println!("[ok] features: {} values", features.len());

    let hasher = FeatureHasher::new(session.config().hash_alg, session.config().salt_len)?;
    let seal = hasher.seal(&features).map_err(NeuroError::from)?;
    hasher.verify(&features, &seal).map_err(NeuroError::from)?;
    println!("[ok] seal: {} {}", seal.alg, hex_preview(&seal.digest, 8));

    let matcher = SimilarityMatcher::new(session.config().similarity_threshold)?;
    let result = matcher
        .compare(features.as_slice(), features.as_slice())
        .map_err(NeuroError::from)?;
    println!("[ok] self-match: {:.4}", result.score);

    println!("All checks passed.");
    Ok(ExitStatus::Success)
}
