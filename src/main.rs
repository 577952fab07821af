//! Containment Physics entry point
//!
//! `run` plays a full experiment session headlessly with a simulated
//! participant and writes the payload to a JSON directory. `export` flattens
//! saved sessions into a CSV with one row per trial.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};

use containment_physics::experiment::{ExperimentRunner, TrialList, condition_list_for};
use containment_physics::participant::{NearestGoal, Participant, Silent};
use containment_physics::persistence::JsonDirSink;
use containment_physics::records::write_csv;
use containment_physics::settings::{RunMode, Settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParticipantKind {
    /// Always picks the goal closest to the frozen ball
    Nearest,
    /// Never answers; every trial times out
    Silent,
}

#[derive(Parser)]
#[command(name = "containment-physics")]
#[command(about = "Run a ball-trajectory prediction experiment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experiment session
    Run(RunArgs),

    /// Export saved sessions to CSV
    Export {
        /// Directory holding saved session JSON files
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Output CSV file
        #[arg(long, default_value = "raw.csv")]
        out: PathBuf,

        /// Include TEST_ sessions
        #[arg(long, default_value = "false")]
        include_test: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Condition list JSON (array of [trial file, ...] rows)
    #[arg(long)]
    conditions: PathBuf,

    /// Condition list used instead in short mode
    #[arg(long)]
    short_conditions: Option<PathBuf>,

    /// Directory holding the trial JSON files
    #[arg(long)]
    trials: PathBuf,

    /// Optional settings JSON
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Shuffle / goal-swap seed
    #[arg(long)]
    seed: Option<u64>,

    /// normal, test or short
    #[arg(long, value_parser = ["normal", "test", "short"])]
    mode: Option<String>,

    #[arg(long, value_enum, default_value = "nearest")]
    participant: ParticipantKind,

    /// Simulated response latency (ms)
    #[arg(long, default_value_t = 600.0)]
    latency_ms: f64,

    /// Skip trials that fail instead of stopping the session
    #[arg(long, default_value = "false")]
    skip_failed: bool,

    /// Output directory for the session payload
    #[arg(long, default_value = "data")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Export {
            data,
            out,
            include_test,
        } => {
            let sessions = JsonDirSink::new(data.clone())
                .load_sessions(include_test)
                .with_context(|| format!("reading sessions from {}", data.display()))?;
            let file =
                File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            let rows = write_csv(&sessions, file)?;
            println!(
                "Exported {} trials from {} sessions to {}",
                rows,
                sessions.len(),
                out.display()
            );
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(mode) = &args.mode {
        settings.mode = RunMode::from_str(mode).ok_or_else(|| anyhow!("unknown mode {mode}"))?;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if args.skip_failed {
        settings.skip_failed_trials = true;
    }

    let conditions = condition_list_for(
        settings.mode,
        &args.conditions,
        args.short_conditions.as_deref(),
    );
    let trials = TrialList::load(conditions, &args.trials)
        .with_context(|| format!("loading trials from {}", conditions.display()))?;

    let mut participant: Box<dyn Participant> = match args.participant {
        ParticipantKind::Nearest => Box::new(NearestGoal {
            latency_ms: args.latency_ms,
        }),
        ParticipantKind::Silent => Box::new(Silent),
    };

    let mut runner = ExperimentRunner::new(settings, trials);
    // Save whatever finished even if a trial fails
    let outcome = runner.run(participant.as_mut()).map(|_| ());

    let mut sink = JsonDirSink::new(args.out.clone());
    let saved = runner.finish(&mut sink);

    let board = runner.scoreboard();
    println!("Session:  {}", runner.session_id());
    println!("Trials:   {}", board.trials);
    println!("Skipped:  {}", runner.skipped().len());
    println!("Total:    {}", board.total);
    println!("Average:  {:.1}", board.average());
    if saved {
        println!("Saved:    {}", sink.path_for(runner.session_id()).display());
    }

    outcome.with_context(|| format!("session {} stopped early", runner.session_id()))
}
