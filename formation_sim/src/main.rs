//! Formation Simulator CLI
//!
//! Run deterministic formation-control scenarios, or convert a bounding box
//! into bearing angles.

use clap::{ArgAction, Parser};
use formation_core::{parse_labels, BearingConverter, LabelBox, DEFAULT_HORIZONTAL_FOV_DEG};
use formation_env::Callback;
use formation_sim::scenarios::ScenarioId;
#[cfg(feature = "dashboard")]
use formation_sim::StdoutRenderer;
use formation_sim::{
    RerunObserver, ScenarioResult, ScenarioRunner, SimConfig, TracingObserver, Verbosity,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Formation control simulation CLI
#[derive(Parser, Debug)]
#[command(name = "formation-sim")]
#[command(about = "Run deterministic multi-robot formation scenarios", long_about = None)]
struct Args {
    /// Master seed for randomized fleets (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Fleet size for scenarios that accept one
    #[arg(short, long, default_value = "6")]
    robots: usize,

    /// Scenario to run (square_consensus, linear_decay, scatter, ring, leader_follower, spin, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Override the number of steps
    #[arg(long)]
    steps: Option<usize>,

    /// Override the step time in seconds
    #[arg(long)]
    step_time: Option<f64>,

    /// Override the controller gain
    #[arg(short, long)]
    gain: Option<f64>,

    /// Simulation config (JSON SimConfig)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbosity: -v pose snapshots, -vv velocities and unicycle inputs
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Draw every step in the terminal (needs the `dashboard` feature)
    #[arg(long)]
    render: bool,

    /// Frame-rate cap for --render
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Stream runs to a Rerun viewer (needs the `visualization` feature)
    #[arg(long)]
    rerun: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Convert a bounding box `cx,cy,w,h` (normalized) to bearing angles and exit
    #[arg(long, value_name = "CX,CY,W,H", allow_hyphen_values = true)]
    bearing: Option<String>,

    /// Read the bounding box from a YOLO label file instead
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// Target class in the label file
    #[arg(long, default_value = "0")]
    class: u32,

    /// Horizontal field of view of the camera, in degrees
    #[arg(long, default_value_t = DEFAULT_HORIZONTAL_FOV_DEG)]
    fov: f64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over -v
    let default_level = if args.verbose >= 2 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let outcome = if args.bearing.is_some() || args.labels.is_some() {
        run_bearing(&args)
    } else {
        run_scenarios(&args)
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Prints the bearing angles of one bounding box.
fn run_bearing(args: &Args) -> Result<bool, Box<dyn Error>> {
    let converter = BearingConverter::new(args.fov)?;

    let label = match (&args.bearing, &args.labels) {
        (Some(text), _) => parse_box(text)?,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            match parse_labels(&text, args.class)? {
                Some(label) => label,
                None => {
                    error!("No label of class {} in {}", args.class, path.display());
                    return Ok(false);
                }
            }
        }
        (None, None) => return Err("no bounding box given".into()),
    };

    let (left, right) = converter.relative_angles(&label);
    if args.json {
        let out = serde_json::json!({ "box": label, "left_deg": left, "right_deg": right });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("left: {:.3}°  right: {:.3}°", left, right);
    }
    Ok(true)
}

fn parse_box(text: &str) -> Result<LabelBox, Box<dyn Error>> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        &[cx, cy, w, h] => Ok(LabelBox::new(cx, cy, w, h)?),
        _ => Err(format!("expected 4 comma-separated values, got {}", values.len()).into()),
    }
}

/// Runs the selected scenarios; returns whether all of them passed.
fn run_scenarios(args: &Args) -> Result<bool, Box<dyn Error>> {
    if !args.json {
        info!("Formation Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse()?]
    };

    let config = match &args.config {
        Some(path) => {
            let config: SimConfig = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            config.validate()?;
            info!("Loaded config from {}", path.display());
            Some(config)
        }
        None => None,
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.render && !cfg!(feature = "dashboard") {
        warn!("--render ignored: built without the `dashboard` feature");
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds.max(1) {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = configure(ScenarioRunner::new(seed, args.robots), args, config.as_ref());

        for scenario in &scenarios {
            let mut tracer = TracingObserver::default();
            #[cfg(feature = "dashboard")]
            let mut renderer = open_renderer(args)?;
            let mut viewer = args.rerun.then(|| RerunObserver::new("formation-sim"));

            let mut observers: Vec<&mut dyn Callback> = Vec::new();
            if args.verbose > 0 {
                observers.push(&mut tracer);
            }
            #[cfg(feature = "dashboard")]
            observers.extend(renderer.as_mut().map(|r| r as &mut dyn Callback));
            if let Some(viewer) = viewer.as_mut() {
                observers.push(viewer);
            }

            let result = runner.run_with(*scenario, observers)?;

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED  spread {:.4} -> {:.3e} in {:.1}s",
                        scenario.name(),
                        seed,
                        result.initial_spread,
                        result.final_spread,
                        result.simulated_secs
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

    // Summary
    let total = all_results.len();
    let failed: Vec<&ScenarioResult> = all_results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": all_results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for result in &failed {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(failed.is_empty())
}

/// Terminal renderer for `--render`; JSON output keeps stdout clean.
#[cfg(feature = "dashboard")]
fn open_renderer(args: &Args) -> std::io::Result<Option<StdoutRenderer>> {
    if !args.render || args.json {
        return Ok(None);
    }
    Ok(Some(StdoutRenderer::stdout(7.0)?.with_fps(args.fps)))
}

/// Applies config file values first, then explicit CLI overrides.
fn configure(mut runner: ScenarioRunner, args: &Args, config: Option<&SimConfig>) -> ScenarioRunner {
    if let Some(config) = config {
        runner = runner.with_config(config);
    }
    if let Some(steps) = args.steps {
        runner = runner.with_steps(steps);
    }
    if let Some(step_time) = args.step_time {
        runner = runner.with_step_time(step_time);
    }
    if let Some(gain) = args.gain {
        runner = runner.with_gain(gain);
    }
    if args.verbose > 0 {
        runner = runner.with_verbosity(Verbosity::from_level(args.verbose));
    }
    runner
}
