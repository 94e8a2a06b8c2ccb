// CLI entry point: `make-spec` writes a canonical `ScenarioSpec` JSON file
// from flags; `run` drives the scenario runner against a spec (loaded from
// disk or built from the same flags) and writes the run directory. Ported
// from the reference CLI's `__main__.py`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use microstructure_sim::runner::{run_scenario, RunnerError};
use microstructure_sim::spec_model::ScenarioSpec;

#[derive(Parser)]
#[command(name = "msim-run", about = "Deterministic L2 microstructure simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Tracing filter, e.g. "info" or "msim_run=debug".
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create a pure-JSON scenario spec.
    MakeSpec {
        #[command(flatten)]
        knobs: SpecKnobs,
        /// Output spec.json path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a scenario and write auditable artifacts.
    Run {
        /// Path to spec.json; if omitted, build one from the flags below.
        #[arg(long)]
        spec: Option<PathBuf>,
        #[command(flatten)]
        knobs: SpecKnobs,
        /// Root directory for run artifacts.
        #[arg(long, default_value = "runs")]
        out_root: PathBuf,
        /// Fail hard (non-zero exit) on invariant violations.
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct SpecKnobs {
    /// Snapshot path (required unless --spec is given to `run`).
    #[arg(long)]
    snap: Option<String>,
    #[arg(long, default_value_t = 0)]
    max_steps: u64,
    #[arg(long, default_value_t = 1000)]
    warmup: u64,
    #[arg(long, default_value_t = 5000)]
    order_every: u64,
    #[arg(long, default_value_t = 5000)]
    log_every: u64,
    #[arg(long, default_value_t = 5000)]
    check_every: u64,
    #[arg(long, default_value_t = 1)]
    qty: i64,
    #[arg(long, default_value_t = 1)]
    tick: i64,
    #[arg(long = "alpha-ppm", default_value_t = 0)]
    alpha_ppm: i64,
    #[arg(long = "maker-fee-ppm", default_value_t = 0)]
    maker_fee_ppm: i64,
    #[arg(long = "taker-fee-ppm", default_value_t = 0)]
    taker_fee_ppm: i64,
    #[arg(long = "outbound-latency-ns", default_value_t = 0)]
    outbound_latency_ns: i64,
    #[arg(long = "observation-latency-ns", default_value_t = 0)]
    observation_latency_ns: i64,
    #[arg(long = "max-orders", default_value_t = 200_000)]
    max_orders: u64,
    #[arg(long = "max-events", default_value_t = 200_000)]
    max_events: u64,
    #[arg(long = "initial-cash-q", default_value_t = 1_000_000_000_000_000_000)]
    initial_cash_q: i64,
    #[arg(long = "initial-position-qty-q", default_value_t = 1_000_000_000)]
    initial_position_qty_q: i64,
    #[arg(long = "cash-residual-tolerance-q", default_value_t = 1)]
    cash_residual_tolerance_q: i64,
    #[arg(long, default_value_t = true)]
    enable_markout: bool,
    #[arg(long = "markout-horizons-steps", num_args = 0.., default_values_t = vec![100u64, 1000, 10000])]
    markout_horizons_steps: Vec<u64>,
}

impl SpecKnobs {
    fn into_spec(self, snap_path: String) -> ScenarioSpec {
        ScenarioSpec {
            snap_path,
            max_steps: self.max_steps,
            warmup_steps: self.warmup,
            order_every_steps: self.order_every,
            log_every_steps: self.log_every,
            check_every_steps: self.check_every,
            qty_q: self.qty,
            tick_q: self.tick,
            max_orders: self.max_orders,
            max_events: self.max_events,
            alpha_ppm: self.alpha_ppm,
            maker_fee_ppm: self.maker_fee_ppm,
            taker_fee_ppm: self.taker_fee_ppm,
            outbound_latency_ns: self.outbound_latency_ns,
            observation_latency_ns: self.observation_latency_ns,
            start_ts_ns: 0,
            initial_cash_q: self.initial_cash_q,
            initial_position_qty_q: self.initial_position_qty_q,
            initial_locked_cash_q: 0,
            initial_locked_position_qty_q: 0,
            cash_residual_tolerance_q: self.cash_residual_tolerance_q,
            enable_markout: self.enable_markout,
            markout_horizons_steps: self.markout_horizons_steps,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .init();
}

/// Builds the spec named by a `make-spec`/`run` invocation from either an
/// on-disk `spec.json` or the flattened CLI flags. Config resolution is the
/// one place this binary reaches for `anyhow`'s `Context` — the library
/// surface below it returns typed errors exclusively.
fn resolve_spec(spec: Option<PathBuf>, knobs: SpecKnobs) -> Result<ScenarioSpec> {
    match spec {
        Some(path) => ScenarioSpec::load(&path).with_context(|| format!("loading spec {}", path.display())),
        None => {
            let snap = knobs.snap.clone().context("--snap is required when --spec is not provided")?;
            Ok(knobs.into_spec(snap))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::MakeSpec { knobs, out } => {
            let result: Result<()> = (|| {
                let snap = knobs.snap.clone().context("--snap is required for make-spec")?;
                let spec = knobs.into_spec(snap);
                spec.save(&out).with_context(|| format!("writing spec to {}", out.display()))?;
                println!("{}", out.display());
                Ok(())
            })();
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{e:#}");
                    ExitCode::from(2)
                }
            }
        }
        Command::Run { spec, knobs, out_root, strict } => {
            let resolved = match resolve_spec(spec, knobs) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{e:#}");
                    return ExitCode::from(2);
                }
            };

            match run_scenario(&resolved, &out_root, strict) {
                Ok(run_dir) => {
                    println!("{}", run_dir.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{e}");
                    match e {
                        RunnerError::StrictFailure { .. } | RunnerError::InvariantViolated { .. } => {
                            ExitCode::FAILURE
                        }
                        _ => ExitCode::from(2),
                    }
                }
            }
        }
    }
}
