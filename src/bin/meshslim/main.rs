//! meshslim CLI - mesh simplification command-line tool.
//!
//! Usage: meshslim <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `meshslim --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshslim::algo::decimate::{self, DetailLevel, QueueLayout, SimplifyOptions};
use meshslim::algo::{Cancellation, Progress};
use meshslim::io;

#[derive(Parser)]
#[command(name = "meshslim")]
#[command(author, version, about = "Triangle mesh simplification CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress the progress bar and all logging
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Simplify a mesh by quadric edge collapse
    Simplify {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Target number of triangles
        #[arg(short, long, conflicts_with_all = ["ratio", "detail"])]
        triangles: Option<usize>,

        /// Target ratio of triangles to keep (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5", conflicts_with = "detail")]
        ratio: f64,

        /// Maximum error of a single collapse
        #[arg(short = 'e', long, conflicts_with = "detail")]
        max_error: Option<f32>,

        /// Collapse everything below the error of a detail level
        #[arg(short, long, value_enum)]
        detail: Option<Detail>,

        /// Priority queue layout
        #[arg(long, value_enum, default_value = "skip-heap")]
        queue: Queue,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Detail {
    /// Maximum error 1e-3
    ExtraHigh,
    /// Maximum error 1e-2
    High,
    /// Maximum error 0.1
    Medium,
    /// Maximum error 0.5
    Low,
    /// Maximum error 1.0
    ExtraLow,
}

impl From<Detail> for DetailLevel {
    fn from(detail: Detail) -> Self {
        match detail {
            Detail::ExtraHigh => DetailLevel::ExtraHigh,
            Detail::High => DetailLevel::High,
            Detail::Medium => DetailLevel::Medium,
            Detail::Low => DetailLevel::Low,
            Detail::ExtraLow => DetailLevel::ExtraLow,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Queue {
    /// Flat binary heap
    Binary,
    /// Cache-friendly blocked heap
    SkipHeap,
}

impl From<Queue> for QueueLayout {
    fn from(queue: Queue) -> Self {
        match queue {
            Queue::Binary => QueueLayout::Binary,
            Queue::SkipHeap => QueueLayout::SkipHeap,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber based on verbosity level.
///
/// `RUST_LOG` takes precedence over the `-v` flags.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "meshslim=info",
            2 => "meshslim=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => cmd_info(&input)?,

        Commands::Simplify {
            input,
            output,
            triangles,
            ratio,
            max_error,
            detail,
            queue,
            sequential,
        } => {
            let options = match (detail, triangles) {
                (Some(detail), _) => SimplifyOptions::with_detail_level(detail.into()),
                (None, Some(target)) => SimplifyOptions::with_target_triangles(target),
                (None, None) => SimplifyOptions::with_target_ratio(ratio),
            };
            let mut options = options
                .with_parallel(!sequential)
                .with_queue_layout(queue.into());
            if let Some(max_error) = max_error {
                options = options.with_max_error(max_error);
            }
            cmd_simplify(&input, &output, &options, cli.quiet)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let shown = AtomicI32::new(-1);

    Progress::new(move |percent| {
        // Redraw only when the value changes
        if shown.swap(percent, Ordering::Relaxed) == percent {
            return;
        }

        let bar_width = 30;
        let filled = (percent as usize * bar_width) / 100;
        let empty = bar_width - filled;

        eprint!("\r[{}{}] {:3}%", "=".repeat(filled), " ".repeat(empty), percent);
        let _ = std::io::stderr().flush();

        if percent == 100 {
            eprintln!();
        }
    })
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Triangles: {}", mesh.num_triangles());
    println!("Surface area: {:.6}", mesh.surface_area());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let boundary_edges = mesh.num_boundary_edges();
    if boundary_edges == 0 && mesh.is_closed_manifold() {
        println!("Topology: Closed manifold");
    } else {
        println!("Topology: Open ({} boundary edges)", boundary_edges);
    }

    Ok(())
}

fn cmd_simplify(
    input: &Path,
    output: &Path,
    options: &SimplifyOptions,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = io::load(input)?;

    println!(
        "Loaded: {} vertices, {} triangles",
        mesh.num_vertices(),
        mesh.num_triangles()
    );

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!(
        "Simplifying to {} triangles ({})...",
        options.compute_target(mesh.num_triangles()),
        mode
    );

    let progress = if quiet { Progress::none() } else { create_progress() };

    let start = Instant::now();
    let report =
        decimate::simplify_with_progress(&mut mesh, options, &progress, &Cancellation::none())?;
    let elapsed = start.elapsed();

    println!("{}", report);
    io::save(&mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}
