//! podbuild - sequential build steps as pod init containers
//!
//! ## Commands
//!
//! - `render`: Convert a build document into the pod that runs it
//! - `status`: Derive a build outcome from an observed pod
//! - `steps`: Recover the user steps from a rendered pod
//! - `run`: Render a build and execute it on this host

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use podbuild_core::creds::DEFAULT_SERVICE_ACCOUNT;
use podbuild_core::{
    from_build, from_pod, to_build_spec, BuildConfig, LocalExecutor, SequenceExecutor,
    StaticAccounts,
};
use podbuild_model::{Build, BuildStatus, ConditionStatus, Pod};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "podbuild")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run build steps in order as pod init containers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pod that implements a build
    Render {
        #[command(flatten)]
        input: BuildInput,
    },

    /// Print the build status derived from a pod document
    Status {
        /// Path to the pod document (JSON, with status)
        #[arg(short, long)]
        pod: PathBuf,
    },

    /// Print the user-visible build spec recovered from a rendered pod
    Steps {
        /// Path to the pod document (JSON)
        #[arg(short, long)]
        pod: PathBuf,
    },

    /// Render a build and run its units as host processes
    Run {
        #[command(flatten)]
        input: BuildInput,

        /// Host directory mounted as /workspace
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },
}

#[derive(Args)]
struct BuildInput {
    /// Path to the build document (JSON)
    #[arg(short, long)]
    build: PathBuf,

    /// Service accounts and secrets (JSON: {"serviceAccounts": [], "secrets": []})
    #[arg(short, long)]
    accounts: Option<PathBuf>,

    #[command(flatten)]
    images: ImageArgs,
}

#[derive(Args)]
struct ImageArgs {
    /// Image settings file (JSON); flags below take precedence
    #[arg(long, env = "PODBUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Credential initializer image
    #[arg(long, env = "PODBUILD_CREDS_IMAGE")]
    creds_image: Option<String>,

    /// Git fetcher image
    #[arg(long, env = "PODBUILD_GIT_IMAGE")]
    git_image: Option<String>,

    /// Image of the main container that runs after the last step
    #[arg(long, env = "PODBUILD_NOP_IMAGE")]
    nop_image: Option<String>,

    /// Object-store fetcher image
    #[arg(long, env = "PODBUILD_GCS_FETCHER_IMAGE")]
    gcs_fetcher_image: Option<String>,
}

impl ImageArgs {
    fn resolve(&self) -> Result<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::from_file(path)
                .with_context(|| format!("Failed to load config: {:?}", path))?,
            None => BuildConfig::default(),
        };
        if let Some(image) = &self.creds_image {
            config.creds_image = image.clone();
        }
        if let Some(image) = &self.git_image {
            config.git_image = image.clone();
        }
        if let Some(image) = &self.nop_image {
            config.nop_image = image.clone();
        }
        if let Some(image) = &self.gcs_fetcher_image {
            config.gcs_fetcher_image = image.clone();
        }
        Ok(config)
    }
}

/// Output of `run`: the executed pod alongside its derived outcome.
#[derive(Serialize)]
struct RunReport {
    pod: Pod,
    status: BuildStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    podbuild_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Render { input } => cmd_render(&input).await,
        Commands::Status { pod } => cmd_status(&pod),
        Commands::Steps { pod } => cmd_steps(&pod),
        Commands::Run { input, workspace } => cmd_run(&input, &workspace).await,
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_accounts(path: Option<&Path>, build: &Build) -> Result<StaticAccounts> {
    let accounts = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read accounts file: {:?}", path))?;
            StaticAccounts::from_json(&raw)
                .with_context(|| format!("Invalid accounts file: {:?}", path))?
        }
        None => StaticAccounts::new(),
    };
    // Without an accounts file the build's account exists with no secrets.
    if path.is_none() {
        let name = if build.spec.service_account_name.is_empty() {
            DEFAULT_SERVICE_ACCOUNT
        } else {
            build.spec.service_account_name.as_str()
        };
        accounts.ensure_account(&build.metadata.namespace, name);
    }
    Ok(accounts)
}

async fn render(input: &BuildInput) -> Result<Pod> {
    let build: Build = read_json_file(&input.build)?;
    let accounts = load_accounts(input.accounts.as_deref(), &build)?;
    let config = input.images.resolve()?;

    let pod = from_build(&build, &accounts, &config)
        .await
        .with_context(|| format!("Failed to convert build {:?}", build.metadata.name))?;
    info!(
        pod = %pod.metadata.name,
        units = pod.spec.init_containers.len(),
        "Rendered pod"
    );
    Ok(pod)
}

async fn cmd_render(input: &BuildInput) -> Result<()> {
    print_json(&render(input).await?)
}

fn cmd_status(path: &Path) -> Result<()> {
    let pod: Pod = read_json_file(path)?;
    print_json(&from_pod(&pod))
}

fn cmd_steps(path: &Path) -> Result<()> {
    let pod: Pod = read_json_file(path)?;
    print_json(&to_build_spec(&pod))
}

async fn cmd_run(input: &BuildInput, workspace: &Path) -> Result<()> {
    let mut pod = render(input).await?;

    pod.status = LocalExecutor::new(workspace)
        .run_sequence(&pod)
        .await
        .context("Failed to execute build")?;
    let status = from_pod(&pod);
    let outcome = status.outcome();

    print_json(&RunReport { pod, status })?;

    if outcome == ConditionStatus::True {
        Ok(())
    } else {
        anyhow::bail!("Build did not succeed")
    }
}
