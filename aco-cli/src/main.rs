use aco_config::{default_colony_config, load_colony_config_from_path};
use aco_core::Simulation;
use aco_types::{AcoParams, ColonyConfig, EdgeView, MetricsSnapshot, NodeId};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "aco-cli")]
#[command(about = "Ant colony shortest-path simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 60.0)]
        seconds: f32,
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = false)]
        all_active: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Inspect {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    Benchmark {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1_000)]
        ticks: u32,
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    Export {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 300)]
        ticks: u32,
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u32,
    seed: u64,
    nest: Option<NodeId>,
    food: Option<NodeId>,
    metrics: MetricsSnapshot,
    edges: Vec<EdgeView>,
}

#[derive(Debug, Serialize)]
struct InspectSummary {
    nodes: usize,
    edges: usize,
    isolated_nodes: Vec<NodeId>,
    nest: Option<NodeId>,
    food: Option<NodeId>,
    ant_count: u32,
    params: AcoParams,
}

#[derive(Debug, Serialize)]
struct BenchmarkSummary {
    ticks: u32,
    ants: u32,
    elapsed_ms: u128,
    avg_us_per_tick: f64,
    final_metrics: MetricsSnapshot,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aco_cli=info,aco_core=info".to_owned()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            graph,
            config,
            seconds,
            dt,
            seed,
            all_active,
            format,
            out,
        } => run_command(&graph, config, seconds, dt, seed, all_active, format, out),
        Commands::Inspect { graph, config } => inspect_command(&graph, config),
        Commands::Benchmark {
            graph,
            config,
            ticks,
            dt,
            seed,
        } => benchmark_command(&graph, config, ticks, dt, seed),
        Commands::Export {
            graph,
            config,
            ticks,
            dt,
            seed,
            out,
        } => export_command(&graph, config, ticks, dt, seed, &out),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_command(
    graph_path: &Path,
    config_path: Option<PathBuf>,
    seconds: f32,
    dt: f32,
    seed: u64,
    all_active: bool,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds");
    }
    if !(seconds.is_finite() && seconds >= 0.0) {
        bail!("--seconds must not be negative");
    }
    let ticks = (seconds / dt).ceil() as u32;

    let mut sim = load_simulation(graph_path, config_path, seed)?;
    sim.start()
        .with_context(|| format!("graph {} cannot be run", graph_path.display()))?;
    if all_active {
        sim.activate_all()?;
    }
    info!(ticks, dt, "running colony");
    sim.step_n(ticks, dt);

    let snapshot = sim.snapshot();
    let summary = RunSummary {
        ticks,
        seed,
        nest: snapshot.nest,
        food: snapshot.food,
        metrics: snapshot.metrics,
        edges: snapshot.edges,
    };

    match format {
        OutputFormat::Pretty => emit(&render_run_summary(&summary), out.as_deref()),
        OutputFormat::Json => emit(&serde_json::to_string_pretty(&summary)?, out.as_deref()),
    }
}

fn inspect_command(graph_path: &Path, config_path: Option<PathBuf>) -> Result<()> {
    let sim = load_simulation(graph_path, config_path, 0)?;
    let isolated_nodes = sim
        .nodes()
        .into_iter()
        .filter(|node| node.degree == 0)
        .map(|node| node.id)
        .collect();

    let summary = InspectSummary {
        nodes: sim.node_count(),
        edges: sim.edge_count(),
        isolated_nodes,
        nest: sim.nest(),
        food: sim.food(),
        ant_count: sim.config().ant_count,
        params: *sim.params(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn benchmark_command(
    graph_path: &Path,
    config_path: Option<PathBuf>,
    ticks: u32,
    dt: f32,
    seed: u64,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds");
    }
    let mut sim = load_simulation(graph_path, config_path, seed)?;
    sim.start()
        .with_context(|| format!("graph {} cannot be run", graph_path.display()))?;
    sim.activate_all()?;

    let start = Instant::now();
    sim.step_n(ticks.max(1), dt);
    let elapsed = start.elapsed();

    let summary = BenchmarkSummary {
        ticks: ticks.max(1),
        ants: sim.config().ant_count,
        elapsed_ms: elapsed.as_millis(),
        avg_us_per_tick: elapsed.as_secs_f64() * 1_000_000.0 / f64::from(ticks.max(1)),
        final_metrics: sim.metrics().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn export_command(
    graph_path: &Path,
    config_path: Option<PathBuf>,
    ticks: u32,
    dt: f32,
    seed: u64,
    out: &Path,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds");
    }
    let mut sim = load_simulation(graph_path, config_path, seed)?;
    sim.start()
        .with_context(|| format!("graph {} cannot be run", graph_path.display()))?;
    let lines = sim.export_trace_jsonl(ticks, dt)?;
    info!(snapshots = lines.len(), "trace recorded");
    emit(&lines.join("\n"), Some(out))
}

fn load_simulation(
    graph_path: &Path,
    config_path: Option<PathBuf>,
    seed: u64,
) -> Result<Simulation> {
    let config = load_config(config_path)?;
    let raw = fs::read_to_string(graph_path)
        .with_context(|| format!("failed to read graph file {}", graph_path.display()))?;
    let mut sim = Simulation::new(config, seed)?;
    sim.load_graph_str(&raw)
        .with_context(|| format!("failed to load graph file {}", graph_path.display()))?;
    Ok(sim)
}

fn load_config(path: Option<PathBuf>) -> Result<ColonyConfig> {
    match path {
        Some(path) => load_colony_config_from_path(&path),
        None => Ok(default_colony_config()),
    }
}

fn render_run_summary(summary: &RunSummary) -> String {
    let metrics = &summary.metrics;
    let mut text = format!(
        "ticks={} seed={} simulated_secs={:.2} active_ants={} food_arrivals={} round_trips={} expired={} abandoned={}",
        summary.ticks,
        summary.seed,
        metrics.simulated_secs,
        metrics.active_ants,
        metrics.food_arrivals,
        metrics.round_trips,
        metrics.expired_searches,
        metrics.abandoned_searches,
    );
    match metrics.best_path_length {
        Some(best) => text.push_str(&format!(" best_path={best:.2}")),
        None => text.push_str(" best_path=none"),
    }

    let mut edges: Vec<&EdgeView> = summary.edges.iter().collect();
    edges.sort_by(|a, b| b.pheromone.total_cmp(&a.pheromone));
    for edge in edges {
        text.push_str(&format!(
            "\n  edge {:>4}  {:>4} - {:<4}  length={:>8.2}  pheromone={:>6.2}",
            edge.id, edge.a, edge.b, edge.length, edge.pheromone
        ));
    }
    text
}

/// Prints `text` to stdout, or writes it newline-terminated to `out`,
/// creating missing parent directories.
fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    let Some(path) = out else {
        println!("{text}");
        return Ok(());
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed creating output directory {}", dir.display()))?;
    }
    let mut contents = text.to_owned();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(path, &contents).with_context(|| format!("failed writing {}", path.display()))?;
    info!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}
