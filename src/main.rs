//! Admin Console Bootstrap
//!
//! Provisions the admin console's credential secrets and object store into a
//! namespace, or renders the same bundle as manifests.
//!
//! ```text
//! kotsadm-bootstrap render --namespace ns1 --output-dir ./manifests
//! kotsadm-bootstrap apply  --namespace ns1 --params-file params.yaml --save-params
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::Term;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kotsadm_bootstrap::{
    DeploymentParameters, DisabledPrompt, Error, InMemoryCluster, KubeCluster, ManifestFormat,
    ManifestRenderer, PasswordPrompt, ProgressSink, Provisioner, SecretPolicy, SpinnerProgress,
    SystemSecretSource, TerminalPrompt, TracingProgress,
};

/// Exit status for an operator-cancelled run
const EXIT_CANCELLED: u8 = 130;

/// Namespace used when neither the flags nor the parameters file name one
const DEFAULT_NAMESPACE: &str = "default";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Admin Console Bootstrap - credential secrets and object store provisioning
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Target namespace
    #[arg(long, short = 'n', env = "NAMESPACE", global = true)]
    namespace: Option<String>,

    /// YAML file with deployment parameters
    #[arg(long, env = "PARAMS_FILE", global = true)]
    params_file: Option<PathBuf>,

    /// Write the completed parameters back to --params-file
    #[arg(long, global = true)]
    save_params: bool,

    /// Plaintext shared password for the admin console
    #[arg(long, env = "SHARED_PASSWORD", hide_env_values = true, global = true)]
    shared_password: Option<String>,

    /// Never prompt; a missing shared password fails the run
    #[arg(long, env = "NO_PROMPT", global = true)]
    no_prompt: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the resource bundle without contacting the cluster
    Render {
        /// Write one file per document into this directory instead of stdout
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Document encoding (yaml or json)
        #[arg(long, default_value = "yaml")]
        format: ManifestFormat,
    },

    /// Create every missing object in the target namespace
    Apply {
        /// Kubeconfig file; defaults to in-cluster or $KUBECONFIG
        #[arg(long)]
        kubeconfig: Option<PathBuf>,

        /// Kubeconfig context to use
        #[arg(long)]
        context: Option<String>,

        /// Run against an empty in-memory cluster and list what would be created
        #[arg(long)]
        dry_run: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("Error: failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("Starting {} {}", kotsadm_bootstrap::NAME, kotsadm_bootstrap::VERSION);

    if args.save_params && args.params_file.is_none() {
        return Err(Error::Configuration("--save-params requires --params-file".into()).into());
    }

    let params = load_params(&args)?;
    let policy = build_policy(&args);

    let completed = match &args.command {
        Command::Render { output_dir, format } => {
            let renderer = ManifestRenderer::new(policy).with_format(*format);
            let (manifests, completed) = renderer.render(&params)?;

            match output_dir {
                Some(dir) => manifests.write_to_dir(dir)?,
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout
                        .write_all(&manifests.to_stream())
                        .context("failed to write manifests to stdout")?;
                    stdout.flush()?;
                }
            }
            completed
        }

        Command::Apply {
            kubeconfig,
            context,
            dry_run,
        } => {
            let progress = build_progress(&args);

            if *dry_run {
                let cluster = Arc::new(InMemoryCluster::new());
                let completed = Provisioner::new(cluster.clone(), policy)
                    .with_progress(progress)
                    .provision(&params)
                    .await?;
                for key in cluster.created() {
                    info!("Would create {}", key);
                }
                completed
            } else {
                let cluster = KubeCluster::connect(kubeconfig.as_deref(), context.clone()).await?;
                Provisioner::new(Arc::new(cluster), policy)
                    .with_progress(progress)
                    .provision(&params)
                    .await?
            }
        }
    };

    if args.save_params {
        if let Some(path) = &args.params_file {
            completed.save(path)?;
            info!("Saved completed parameters to {}", path.display());
        }
    }

    Ok(())
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>().is_some_and(Error::is_cancelled)
}

// =============================================================================
// Parameters
// =============================================================================

fn load_params(args: &Args) -> anyhow::Result<DeploymentParameters> {
    let mut params = match &args.params_file {
        Some(path) if path.exists() => DeploymentParameters::load(path)?,
        Some(path) => {
            info!("Parameters file {} not found, starting empty", path.display());
            DeploymentParameters::default()
        }
        None => DeploymentParameters::default(),
    };

    if let Some(namespace) = &args.namespace {
        params.namespace = namespace.clone();
    }
    if params.namespace.is_empty() {
        params.namespace = DEFAULT_NAMESPACE.to_string();
    }
    if let Some(password) = &args.shared_password {
        params.shared_password = Some(password.clone());
    }

    Ok(params)
}

fn build_policy(args: &Args) -> SecretPolicy {
    let prompt: Arc<dyn PasswordPrompt> = if args.no_prompt {
        Arc::new(DisabledPrompt)
    } else {
        Arc::new(TerminalPrompt::new())
    };
    SecretPolicy::new(Arc::new(SystemSecretSource), prompt)
}

fn build_progress(args: &Args) -> Arc<dyn ProgressSink> {
    if !args.log_json && Term::stderr().is_term() {
        Arc::new(SpinnerProgress::new())
    } else {
        Arc::new(TracingProgress)
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("tower=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
