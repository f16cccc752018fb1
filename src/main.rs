//! flowmesh - Command Line Entry Point
//!
//! Reads a velocity grid, generates the ribbon mesh and writes the raw
//! buffers next to a JSON run summary.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use flowmesh::{
    config::{default_config_path, ExecutionMode, FlowConfig},
    field::{SumField, VortexField},
    CancellationToken, ExecutionContext, Mesh, MeshOutcome, VelocityGrid,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flow-field ribbon mesh generator
#[derive(Parser)]
#[command(name = "flowmesh")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn 2D velocity grids into animated ribbon meshes", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a ribbon mesh from a JSON grid
    Generate(GenerateArgs),
    /// Write an analytic vortex grid as JSON
    Grid(GridArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct GenerateArgs {
    /// Input grid (`{"columns", "rows", "cell_size", "data"}`)
    input: PathBuf,

    /// Output prefix; writes `<prefix>.vertices.bin`, `<prefix>.indices.bin`, `<prefix>.json`
    #[arg(short, long)]
    output: PathBuf,

    /// Override the smoothing sigma
    #[arg(long)]
    sigma: Option<f32>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of streamlines
    #[arg(long)]
    lines: Option<usize>,

    /// Run on the worker thread
    #[arg(long)]
    delegated: bool,
}

#[derive(Args)]
struct GridArgs {
    /// Output JSON path
    output: PathBuf,

    #[arg(long, default_value = "64")]
    columns: usize,

    #[arg(long, default_value = "64")]
    rows: usize,

    #[arg(long, default_value = "1.0")]
    cell_size: f32,

    /// Number of vortices, placed on a circle around the grid centre
    #[arg(long, default_value = "2")]
    vortices: usize,
}

/// Written to `<prefix>.json` after a run
#[derive(Debug, Serialize)]
struct RunSummary {
    generated_at: DateTime<Utc>,
    input: PathBuf,
    columns: usize,
    rows: usize,
    sigma: f32,
    seed: u64,
    execution: ExecutionMode,
    line_count: usize,
    vertex_count: usize,
    triangle_count: usize,
    elapsed_ms: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for `config`
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flowmesh=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(generate(config, args))
        }
        Commands::Grid(args) => write_vortex_grid(args),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FlowConfig> {
    match path {
        Some(path) => {
            FlowConfig::load(path).with_context(|| format!("Loading config {:?}", path))
        }
        None => {
            if let Some(path) = default_config_path() {
                tracing::debug!("Looking for config at {:?}", path);
            }
            Ok(FlowConfig::load_or_default())
        }
    }
}

async fn generate(mut config: FlowConfig, args: GenerateArgs) -> Result<()> {
    if let Some(sigma) = args.sigma {
        config.smoothing.sigma = sigma;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(lines) = args.lines {
        config.trace.line_count = lines;
    }
    if args.delegated {
        config.execution = ExecutionMode::Delegated;
    }
    config.validate()?;

    let grid = read_grid(&args.input)?;
    let (columns, rows) = (grid.columns(), grid.rows());
    tracing::info!(
        "Generating mesh for {}x{} grid ({} lines, sigma {}, {} execution)",
        columns,
        rows,
        config.trace.line_count,
        config.smoothing.sigma,
        config.execution
    );

    let context = ExecutionContext::from_config(&config)?;
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let start = Instant::now();
    let outcome = context
        .compute_mesh(grid, config.smoothing.sigma, &cancel)
        .await;
    ctrl_c.abort();

    let mesh = match outcome? {
        MeshOutcome::Completed(mesh) => mesh,
        MeshOutcome::Cancelled => {
            tracing::warn!("Generation cancelled; no output written");
            return Ok(());
        }
    };
    let elapsed = start.elapsed();

    write_mesh(&mesh, &args.output)?;

    let summary = RunSummary {
        generated_at: Utc::now(),
        input: args.input,
        columns,
        rows,
        sigma: config.smoothing.sigma,
        seed: config.seed,
        execution: config.execution,
        line_count: config.trace.line_count,
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        elapsed_ms: elapsed.as_millis() as u64,
    };
    let summary_path = with_suffix(&args.output, "json");
    let file = File::create(&summary_path)
        .with_context(|| format!("Creating {:?}", summary_path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &summary)
        .with_context(|| format!("Writing {:?}", summary_path))?;

    tracing::info!(
        "Wrote {} vertices, {} triangles in {:?}",
        summary.vertex_count,
        summary.triangle_count,
        elapsed
    );
    Ok(())
}

fn read_grid(path: &Path) -> Result<VelocityGrid> {
    let file = File::open(path).with_context(|| format!("Opening grid {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing grid {:?}", path))
}

fn write_mesh(mesh: &Mesh, prefix: &Path) -> Result<()> {
    let vertices = with_suffix(prefix, "vertices.bin");
    let file = File::create(&vertices).with_context(|| format!("Creating {:?}", vertices))?;
    mesh.write_vertices_le(BufWriter::new(file))?;

    let indices = with_suffix(prefix, "indices.bin");
    let file = File::create(&indices).with_context(|| format!("Creating {:?}", indices))?;
    mesh.write_indices_le(BufWriter::new(file))?;
    Ok(())
}

/// `out/run` + `json` -> `out/run.json`
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn write_vortex_grid(args: GridArgs) -> Result<()> {
    if args.vortices == 0 {
        bail!("--vortices must be at least 1");
    }

    let cx = args.columns as f32 / 2.0;
    let cy = args.rows as f32 / 2.0;
    let radius = cx.min(cy) / 2.0;
    let core = (radius / 4.0).max(1.0);

    let mut field = SumField::new();
    for i in 0..args.vortices {
        let angle = i as f32 / args.vortices as f32 * std::f32::consts::TAU;
        // Alternate spin so neighbouring vortices push flow between them
        let strength = if i % 2 == 0 { radius } else { -radius };
        field.push(Box::new(VortexField::new(
            cx + radius * angle.cos(),
            cy + radius * angle.sin(),
            strength,
            core,
        )));
    }

    let grid = VelocityGrid::from_field(&field, args.columns, args.rows, args.cell_size)?;
    let file = File::create(&args.output).with_context(|| format!("Creating {:?}", args.output))?;
    serde_json::to_writer(BufWriter::new(file), &grid)
        .with_context(|| format!("Writing {:?}", args.output))?;

    tracing::info!(
        "Wrote {}x{} grid with {} vortices to {:?}",
        args.columns,
        args.rows,
        args.vortices,
        args.output
    );
    Ok(())
}
