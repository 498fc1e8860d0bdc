//! Markov chain Monte Carlo CLI
//!
//! Run the ergodicity experiments, or export a replicate run as JSON.

use clap::Parser;
use markov_core::TransitionMatrix;
use markov_sim::{
    load_matrix, log_filter, ScenarioId, ScenarioResult, ScenarioRunner, SimConfig, SimError,
    SimExport,
};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Monte Carlo exploration of a discrete-time Markov chain
#[derive(Parser, Debug)]
#[command(name = "markov-sim")]
#[command(about = "Simulate a Markov chain and check ergodicity empirically", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// JSON file with the transition matrix rows (default: bouncing blob)
    #[arg(short, long)]
    matrix: Option<String>,

    /// Scenario to run (ergodicity, long_run, markov_property, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Steps per replicate
    #[arg(long, default_value = "100")]
    steps: usize,

    /// Replicates per starting state
    #[arg(short, long, default_value = "1000")]
    reps: usize,

    /// Starting state for --export
    #[arg(short, long, default_value = "1")]
    init: usize,

    /// Starting state of the long run
    #[arg(long, default_value = "2")]
    long_run_init: usize,

    /// Steps in the long run
    #[arg(long, default_value = "10000")]
    long_run_steps: usize,

    /// Number of consecutive seeds to test
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export one replicate run from --init to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn config(&self, seed: u64) -> SimConfig {
        SimConfig {
            seed,
            steps: self.steps,
            reps: self.reps,
            long_run_init: self.long_run_init,
            long_run_steps: self.long_run_steps,
            ..Default::default()
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides --verbose
    let rust_log = std::env::var("RUST_LOG").ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every scenario run passed.
fn run(args: &Args) -> Result<bool, SimError> {
    let matrix = match &args.matrix {
        Some(path) => {
            info!("Loading transition matrix from {}", path);
            load_matrix(path)?
        }
        None => TransitionMatrix::bouncing_blob(),
    };
    debug!("Transition matrix: {:?}", matrix.to_rows());

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        let runner = ScenarioRunner::new(&matrix, args.config(base_seed))?;
        let record = runner.simulate(args.init)?;

        SimExport::new(base_seed, &matrix, &record).write_to_file(export_path)?;
        info!(
            "Exported {} rows (init={}, steps={}, reps={}) to {}",
            record.len(),
            record.init(),
            record.steps(),
            record.reps(),
            export_path
        );
        return Ok(true);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse::<ScenarioId>().map_err(|e: String| {
            SimError::config(format!(
                "{} (available: ergodicity, long_run, markov_property, all)",
                e
            ))
        })?]
    };

    if !args.json {
        info!("Markov chain ergodicity check ({} states)", matrix.num_states());
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(&matrix, args.config(seed))?;

        for scenario in &scenarios {
            let result = runner.run(*scenario)?;

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {:.4} < {:.4}",
                        scenario.name(),
                        seed,
                        result.metrics.statistic,
                        result.metrics.threshold
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(failed_count == 0)
}
