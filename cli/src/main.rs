use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use brine_helium_compiler::{compile_schema, Compiler, CompilerConfig, FsLoader, Output, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "bhelium")]
#[command(version, about = "Validate Helium schemas and generate Rust code from them", long_about = None)]
struct Cli {
    /// Log every phase and emitted file
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the project described by a `heconfig.json` and write every output
    Build {
        /// Project file
        #[arg(short, long, default_value = CONFIG_FILE)]
        project: PathBuf,
    },

    /// Parse and validate the project without writing anything
    Check {
        /// Project file
        #[arg(short, long, default_value = CONFIG_FILE)]
        project: PathBuf,
    },

    /// Generate a Rust module from a single `.he` file, without a project file
    GenRust {
        /// Input `.he` schema file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory of the generated crate
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Namespace of the generated crate (defaults to the file name)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Print the wire schema of a `.he` file as JSON
    Schema {
        /// Input `.he` schema file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default().filter_or(
        "HELIUM_LOG",
        if verbose {
            "debug"
        } else if quiet {
            "error"
        } else {
            "info"
        },
    );

    env_logger::Builder::from_env(env)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_module_path(verbose)
        .init();
}

/// Loads a project file. Paths in the project are relative to its directory.
fn load_project(project: &Path) -> Result<Compiler> {
    let config = CompilerConfig::load(project)?;
    let project_dir = match project.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debug!("Project directory is {}", project_dir.display());
    Ok(Compiler::new(&project_dir, config, Box::new(FsLoader))?)
}

/// Writes generated files once the whole run succeeded.
fn write_outputs(outputs: &[Output]) -> Result<()> {
    for output in outputs {
        if let Some(dir) = output.file_path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::write(&output.file_path, &output.file_content)
            .with_context(|| format!("writing {}", output.file_path.display()))?;
        debug!("Wrote {}", output.file_path.display());
    }
    info!("Wrote {} file(s)", outputs.len());
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Build { project } => {
            let compiler = load_project(project)?;
            let outputs = compiler.emit()?;
            write_outputs(&outputs)
        }

        Commands::Check { project } => {
            let compiler = load_project(project)?;
            compiler.check()?;
            info!(
                "{} schema file(s) are valid, {} parsed in total",
                compiler.sources().len(),
                compiler.session().parse_count()
            );
            Ok(())
        }

        Commands::GenRust { input, output, namespace } => {
            let namespace = match namespace {
                Some(namespace) => namespace.clone(),
                None => input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().replace('-', "_"))
                    .context("input has no file name")?,
            };
            let compiler = Compiler::single_file(input, output, &namespace);
            let outputs = compiler.emit()?;
            write_outputs(&outputs)
        }

        Commands::Schema { input } => {
            let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
            let schema = compile_schema(input, &text)?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(&cli) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
