//! Flow CLI
//!
//! Usage:
//!   flow dependencies add testnet://8efde57e98c557fa.Hello
//!   flow dependencies add FlowToken --skip-alias
//!   flow dependencies install
//!   flow cadence lint cadence/contracts/Hello.cdc --format json

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flowkit::config::{FlowConfig, LintFormat};
use flowkit::dependencies::{self, Installer, InstallerOptions, TerminalPrompter};
use flowkit::fs::{OsFs, ReaderWriter};
use flowkit::gateway::Gateways;
use flowkit::lint::{self, render, Linter};
use flowkit::Manifest;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Manage Flow project dependencies and lint Cadence code")]
struct Cli {
    /// Path to flow.json
    #[arg(short = 'f', long, global = true)]
    manifest: Option<PathBuf>,

    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage contracts installed from the chain
    #[command(subcommand, alias = "deps")]
    Dependencies(DependencyCommands),

    /// Work with Cadence source
    #[command(subcommand)]
    Cadence(CadenceCommands),
}

#[derive(Subcommand)]
enum DependencyCommands {
    /// Install every dependency declared in flow.json
    Install,

    /// Add a dependency by source string or core contract name
    Add {
        /// `<network>://<address>.<contract>` or a core contract name
        source: String,

        /// Don't ask for an emulator deployment account
        #[arg(long)]
        skip_deployments: bool,

        /// Don't ask for aliases on other networks
        #[arg(long)]
        skip_alias: bool,
    },

    /// Pick core contracts to install
    Discover,

    /// Show installed dependencies
    List,
}

#[derive(Subcommand)]
enum CadenceCommands {
    /// Lint Cadence files; all .cdc files under the working directory by default
    Lint {
        files: Vec<PathBuf>,

        /// Report format
        #[arg(long, value_enum)]
        format: Option<LintFormat>,
    },
}

/// What an installer run should do
enum Operation {
    Install,
    Add(String),
    Discover,
}

fn main() {
    let cli = Cli::parse();

    let config = match FlowConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli, mut config: FlowConfig) -> anyhow::Result<i32> {
    let manifest_path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| config.manifest.path.clone());

    match cli.command {
        Commands::Dependencies(command) => {
            let operation = match command {
                DependencyCommands::Install => Operation::Install,
                DependencyCommands::Add {
                    source,
                    skip_deployments,
                    skip_alias,
                } => {
                    config.dependencies.skip_deployments |= skip_deployments;
                    config.dependencies.skip_alias |= skip_alias;
                    Operation::Add(source)
                }
                DependencyCommands::Discover => Operation::Discover,
                DependencyCommands::List => return list_dependencies(&manifest_path),
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start the async runtime")?;
            runtime.block_on(install(operation, &manifest_path, &config))
        }
        Commands::Cadence(CadenceCommands::Lint { files, format }) => {
            lint_files(files, format.unwrap_or(config.lint.format), &manifest_path)
        }
    }
}

async fn install(operation: Operation, manifest_path: &Path, config: &FlowConfig) -> anyhow::Result<i32> {
    let rw = OsFs;
    let manifest = Manifest::load(&rw, manifest_path)
        .with_context(|| format!("failed to load {}", manifest_path.display()))?;
    let gateways = Gateways::connect(&manifest, config)?;
    let prompter = TerminalPrompter;
    let mut installer = Installer::new(&rw, &gateways, &prompter, manifest, manifest_path)
        .with_options(InstallerOptions::from(&config.dependencies));

    let result = match operation {
        Operation::Install => {
            println!("🔄 Installing dependencies from {}...", manifest_path.display());
            installer.install().await
        }
        Operation::Add(source) if source.contains("://") => installer.add_by_source_string(&source).await,
        Operation::Add(name) => installer.add_by_core_contract_name(&name).await,
        Operation::Discover => installer.discover().await,
    };

    // The summary is printed on failure too, so partial work is visible
    let logs = installer.logs();
    if !logs.is_empty() {
        println!("{}", logs);
    }
    result?;

    let graph = installer.graph();
    tracing::debug!(
        dependencies = graph.names().len(),
        imports = graph.edge_count(),
        "import graph"
    );
    if graph.has_cycle() {
        println!("🔁 Installed dependencies import each other in a cycle");
    }

    println!("✅ Dependency installation complete. Check your {}", manifest_path.display());
    Ok(0)
}

fn list_dependencies(manifest_path: &Path) -> anyhow::Result<i32> {
    let rw = OsFs;
    let manifest = Manifest::load(&rw, manifest_path)
        .with_context(|| format!("failed to load {}", manifest_path.display()))?;
    let root = manifest_path.parent().unwrap_or(Path::new(""));
    print!("{}", dependencies::list(&rw, &manifest, root));
    Ok(0)
}

fn lint_files(files: Vec<PathBuf>, format: LintFormat, manifest_path: &Path) -> anyhow::Result<i32> {
    let rw = OsFs;
    let files: Vec<PathBuf> = if files.is_empty() {
        lint::discover_files(Path::new("."))
            .into_iter()
            .map(|path| path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path))
            .collect()
    } else {
        files
    };

    let manifest = if rw.exists(manifest_path) {
        Some(
            Manifest::load(&rw, manifest_path)
                .with_context(|| format!("failed to load {}", manifest_path.display()))?,
        )
    } else {
        None
    };
    let root = manifest_path.parent().unwrap_or(Path::new("")).to_path_buf();

    let mut linter = Linter::new(&rw);
    if let Some(manifest) = &manifest {
        linter = linter.with_manifest(manifest, root);
    }
    let result = linter.lint_files(&files);
    println!("{}", render::render(&result, format)?);
    Ok(result.exit_code())
}
