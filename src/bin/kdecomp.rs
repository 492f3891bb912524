//! Binary entry point for the kdecomp CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Emit every root class of a class-set dump to stdout
//! kdecomp emit --classes dump.json
//!
//! # Emit one class with prerendered bodies into a directory
//! kdecomp emit --classes dump.json --bodies bodies.json --class a/b/Outer --out src/
//!
//! # Show the resolved class topology
//! kdecomp tree --classes dump.json
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use kdecomp::processor::{ClassOutput, Decompiler};
use kdecomp::reconstruct::PrerenderedBodies;
use kdecomp::source::{NoRenamer, Renamer, ReservedWordRenamer};
use kdecomp::topology::OutlineNode;
use kdecomp::{ClassSet, DecompileResult, DecompilerOptions};

// ============================================================================
// CLI Structure
// ============================================================================

/// Structural reconstruction of JVM class files into Kotlin-style source.
#[derive(Parser, Debug)]
#[command(name = "kdecomp", version, about = "Reconstruct class structure from JVM class records")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for loading a class set.
#[derive(Parser, Debug)]
struct InputArgs {
    /// Class-set dump (JSON array of class records).
    #[arg(long)]
    classes: PathBuf,

    /// Options file (JSON). Flags given on the command line win.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Trust anonymous-class metadata without scanning bytecode.
    #[arg(long)]
    no_verify_anonymous: bool,

    /// Rename classes whose names are reserved words or invalid identifiers.
    #[arg(long)]
    rename: bool,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Emit source for every root class, or for the root containing --class.
    Emit {
        #[command(flatten)]
        input: InputArgs,

        /// Prerendered method bodies (JSON).
        #[arg(long)]
        bodies: Option<PathBuf>,

        /// Internal name of one class to emit (its root is emitted).
        #[arg(long)]
        class: Option<String>,

        /// Write one `.kt` file per root under this directory instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Append the bytecode offset to source line table to each file.
        #[arg(long)]
        mapping: bool,
    },

    /// Print the resolved class topology as JSON.
    Tree {
        #[command(flatten)]
        input: InputArgs,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> DecompileResult<()> {
    match cli.command {
        Command::Emit {
            input,
            bodies,
            class,
            out,
            mapping,
        } => execute_emit(&input, bodies.as_deref(), class.as_deref(), out.as_deref(), mapping),
        Command::Tree { input } => execute_tree(&input),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn execute_emit(
    input: &InputArgs,
    bodies: Option<&Path>,
    class: Option<&str>,
    out: Option<&Path>,
    mapping: bool,
) -> DecompileResult<()> {
    let mut options = load_options(input)?;
    options.bytecode_source_mapping |= mapping;
    let bodies = match bodies {
        Some(path) => PrerenderedBodies::from_json_file(path)?,
        None => PrerenderedBodies::new(),
    };
    let decompiler = Decompiler::new(
        Arc::new(ClassSet::from_json_file(&input.classes)?),
        options,
        renamer(input),
        Box::new(bodies),
    );

    let mut topology = decompiler.load_classes();
    let outputs = match class {
        Some(name) => vec![decompiler.write_named(&mut topology, name)?],
        None => decompiler.write_all(topology),
    };

    match out {
        Some(dir) => write_files(dir, &outputs),
        None => {
            let mut stdout = io::stdout().lock();
            for (i, output) in outputs.iter().enumerate() {
                if i > 0 {
                    writeln!(stdout)?;
                }
                stdout.write_all(output.text.as_bytes())?;
            }
            stdout.flush()?;
            Ok(())
        }
    }
}

fn execute_tree(input: &InputArgs) -> DecompileResult<()> {
    let options = load_options(input)?;
    let decompiler = Decompiler::new(
        Arc::new(ClassSet::from_json_file(&input.classes)?),
        options,
        renamer(input),
        Box::new(PrerenderedBodies::new()),
    );
    let topology = decompiler.load_classes();
    let outline: Vec<OutlineNode> = topology.trees().map(|t| t.outline()).collect();

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &outline)?;
    writeln!(stdout)?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Defaults, then the options file, then flags.
fn load_options(input: &InputArgs) -> DecompileResult<DecompilerOptions> {
    let mut options = match &input.options {
        Some(path) => DecompilerOptions::from_json_file(path)?,
        None => DecompilerOptions::default(),
    };
    if input.no_verify_anonymous {
        options.verify_anonymous_classes = false;
    }
    Ok(options)
}

fn renamer(input: &InputArgs) -> Box<dyn Renamer> {
    if input.rename {
        Box::new(ReservedWordRenamer::new())
    } else {
        Box::new(NoRenamer)
    }
}

fn write_files(dir: &Path, outputs: &[ClassOutput]) -> DecompileResult<()> {
    for output in outputs {
        let path = dir.join(output.file_name());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &output.text)?;
    }
    Ok(())
}
