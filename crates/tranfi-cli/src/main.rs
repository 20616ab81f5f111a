//! tranfi CLI: run, compile and inspect pipelines.
//!
//! `run` drives a pipeline purely through the handle API, the same surface
//! host-language bindings use.

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tranfi_core::plan::Plan;
use tranfi_exec::{
    tf_last_error, tf_pipeline_create, tf_pipeline_create_dsl, tf_pipeline_finish,
    tf_pipeline_free, tf_pipeline_pull, tf_pipeline_push, Channel, Handle,
};
use tranfi_io::buf::{bounded_from_path, BoundedBufReader};
use tranfi_planner::{compile, compile_json, compile_yaml, recipes, to_sql};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "tranfi")]
#[command(about = "Streaming ETL over CSV, JSONL and text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over a file or stdin
    Run {
        /// DSL text or recipe name, e.g. "csv | head 5 | csv"
        #[arg(required_unless_present = "plan")]
        pipeline: Option<String>,

        /// JSON or YAML plan file instead of DSL
        #[arg(long, conflicts_with = "pipeline")]
        plan: Option<PathBuf>,

        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bytes per pushed chunk
        #[arg(long, default_value_t = 64 * 1024)]
        chunk_size: usize,

        /// Print error records to stderr
        #[arg(long)]
        errors: bool,

        /// Print the stats block to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Compile DSL and print the plan
    Compile {
        pipeline: String,

        #[arg(long, value_enum, default_value_t = PlanFormat::Json)]
        format: PlanFormat,
    },

    /// Print the DuckDB SQL equivalent of a pipeline
    Sql { pipeline: String },

    /// List built-in recipes
    Recipes,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanFormat {
    Json,
    Yaml,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            pipeline,
            plan,
            input,
            output,
            chunk_size,
            errors,
            stats,
        } => run_pipeline(RunArgs {
            pipeline,
            plan,
            input,
            output,
            chunk_size: chunk_size.max(1),
            errors,
            stats,
        }),
        Commands::Compile { pipeline, format } => compile_pipeline(&pipeline, format),
        Commands::Sql { pipeline } => print_sql(&pipeline),
        Commands::Recipes => {
            list_recipes();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise only warnings.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

struct RunArgs {
    pipeline: Option<String>,
    plan: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    chunk_size: usize,
    errors: bool,
    stats: bool,
}

fn last_error() -> Box<dyn Error> {
    tf_last_error()
        .unwrap_or_else(|| "unknown pipeline error".to_string())
        .into()
}

fn check(status: i32) -> CliResult<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(last_error())
    }
}

fn load_plan(path: &Path) -> CliResult<Plan> {
    let text = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    Ok(if is_yaml {
        compile_yaml(&text)?
    } else {
        compile_json(&text)?
    })
}

fn create_handle(args: &RunArgs) -> CliResult<Handle> {
    let handle = match (&args.pipeline, &args.plan) {
        (_, Some(path)) => tf_pipeline_create(&load_plan(path)?.to_json()?),
        (Some(dsl), None) => tf_pipeline_create_dsl(dsl),
        (None, None) => return Err("a pipeline or --plan is required".into()),
    };
    if handle.is_null() {
        return Err(last_error());
    }
    Ok(handle)
}

/// Copy everything pending on `channel` into `sink`.
fn drain(handle: Handle, channel: Channel, sink: &mut dyn Write) -> CliResult<()> {
    let mut buf = [0u8; 16 * 1024];
    loop {
        let n = tf_pipeline_pull(handle, channel.id(), &mut buf);
        if n == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..n])?;
    }
}

struct Sinks {
    main: Box<dyn Write>,
    errors: Option<io::Stderr>,
}

impl Sinks {
    fn drain(&mut self, handle: Handle) -> CliResult<()> {
        drain(handle, Channel::Main, &mut self.main)?;
        match self.errors.as_mut() {
            Some(stderr) => drain(handle, Channel::Errors, stderr),
            None => drain(handle, Channel::Errors, &mut io::sink()),
        }
    }
}

fn run_pipeline(args: RunArgs) -> CliResult<()> {
    let handle = create_handle(&args)?;
    let result = feed(handle, &args);
    check(tf_pipeline_free(handle))?;
    result
}

fn feed(handle: Handle, args: &RunArgs) -> CliResult<()> {
    let main: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sinks = Sinks {
        main,
        errors: args.errors.then(io::stderr),
    };

    let mut push = |chunk: &[u8]| -> CliResult<()> {
        check(tf_pipeline_push(handle, chunk))?;
        sinks.drain(handle)
    };
    match &args.input {
        Some(path) => bounded_from_path(path, args.chunk_size)?.for_each_chunk(&mut push)?,
        None => BoundedBufReader::with_capacity(args.chunk_size, io::stdin().lock())
            .for_each_chunk(&mut push)?,
    }

    check(tf_pipeline_finish(handle))?;
    sinks.drain(handle)?;
    sinks.main.flush()?;

    if args.stats {
        drain(handle, Channel::Stats, &mut io::stderr())?;
    }
    tracing::debug!(input = ?args.input, "run complete");
    Ok(())
}

fn compile_pipeline(src: &str, format: PlanFormat) -> CliResult<()> {
    let plan = compile(src)?;
    match format {
        PlanFormat::Json => println!("{}", plan.to_json_pretty()?),
        PlanFormat::Yaml => print!("{}", plan.to_yaml()?),
    }
    Ok(())
}

fn print_sql(src: &str) -> CliResult<()> {
    let plan = compile(src)?;
    println!("{}", to_sql(&plan)?);
    Ok(())
}

fn list_recipes() {
    let width = recipes().iter().map(|r| r.name.len()).max().unwrap_or(0);
    for r in recipes() {
        println!("{:width$}  {}", r.name, r.description, width = width);
        println!("{:width$}  {}", "", r.dsl, width = width);
    }
}
