//! kwait - wait for Kubernetes pods and custom resources to reach a state.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kube::ResourceExt;
use poller::{InterruptPolicy, Interrupter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use verify::{KubeSource, PodPhase, Settings, VerifyCustomResource, VerifyPod};

/// Wait until Kubernetes resources reach an expected state.
#[derive(Parser)]
#[command(name = "kwait")]
#[command(about = "Wait for Kubernetes pods and custom resources to reach a condition")]
struct Cli {
    /// Namespace to look resources up in.
    #[arg(short, long, env = "KWAIT_NAMESPACE")]
    namespace: Option<String>,

    /// Maximum number of attempts.
    #[arg(long, env = "KWAIT_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds.
    #[arg(long = "delay-ms", env = "KWAIT_DELAY_BETWEEN_ATTEMPTS")]
    delay_ms: Option<u64>,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Resource selection shared by all commands.
#[derive(Args)]
struct Selection {
    /// Resource name.
    #[arg(required_unless_present = "label")]
    name: Option<String>,

    /// Select by label instead of name (`key=value`).
    #[arg(long, conflicts_with = "name")]
    label: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a pod to reach a phase.
    Pod {
        #[command(flatten)]
        selection: Selection,

        /// Wait for a terminal phase (Succeeded or Failed) instead of Running.
        #[arg(long, conflicts_with = "phase")]
        stopped: bool,

        /// Wait for an exact phase name.
        #[arg(long)]
        phase: Option<String>,

        /// Also wait for the pod logs to contain this message.
        #[arg(long)]
        log_message: Option<String>,

        /// Do not print the pod logs on success.
        #[arg(long)]
        no_print_logs: bool,
    },

    /// Wait for a custom resource to report a condition.
    Resource {
        #[command(flatten)]
        selection: Selection,

        /// Resource type as `plural.group/version` (e.g. brokers.eventing.knative.dev/v1).
        #[arg(long = "type")]
        resource_type: Option<String>,

        /// Resource kind (derived from `kind/name` when omitted).
        #[arg(long)]
        kind: Option<String>,

        /// API version as `group/version`.
        #[arg(long)]
        api_version: Option<String>,

        /// Condition type that must be true.
        #[arg(long, default_value = "Ready")]
        condition: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(namespace) = cli.namespace {
        settings.namespace = namespace;
    }

    let source = KubeSource::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // Ctrl-C stops waiting instead of killing the process mid-request
    let interrupter = Interrupter::new();
    let handle = interrupter.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            handle.interrupt();
        }
    });

    match cli.command {
        Commands::Pod {
            selection,
            stopped,
            phase,
            log_message,
            no_print_logs,
        } => {
            let mut builder = VerifyPod::named(&settings, selection.name.unwrap_or_default())
                .print_logs(settings.print_pod_logs && !no_print_logs)
                .interrupter(interrupter)
                .on_interrupt(InterruptPolicy::Abort);
            if let Some(label) = selection.label {
                builder = builder.label_expression(label);
            }
            if stopped {
                builder = builder.is_stopped();
            } else if let Some(phase) = phase {
                builder = builder.phase(phase.parse::<PodPhase>()?);
            }
            if let Some(message) = log_message {
                builder = builder.wait_for_log_message(message);
            }
            if let Some(max_attempts) = cli.max_attempts {
                builder = builder.max_attempts(max_attempts);
            }
            if let Some(delay_ms) = cli.delay_ms {
                builder = builder.delay_between_attempts(Duration::from_millis(delay_ms));
            }

            let action = builder.build().context("Invalid pod verification")?;
            let pod = action
                .execute(&source)
                .await
                .with_context(|| format!("Pod '{}' not verified", action.target()))?;

            info!(pod = %pod.name_any(), "Pod verified");
            println!("pod/{} {}", pod.name_any(), action.condition());
        }

        Commands::Resource {
            selection,
            resource_type,
            kind,
            api_version,
            condition,
        } => {
            let mut builder = VerifyCustomResource::named(
                &settings,
                selection.name.as_deref().unwrap_or_default(),
            )
            .condition(condition)
            .interrupter(interrupter)
            .on_interrupt(InterruptPolicy::Abort);
            if let Some(label) = selection.label {
                builder = builder.label_expression(label);
            }
            if let Some(kind) = kind {
                builder = builder.kind(kind);
            }
            if let Some(api_version) = api_version {
                builder = builder.api_version(&api_version);
            }
            if let Some(resource_type) = resource_type {
                builder = builder.resource_type(&resource_type);
            }
            if let Some(max_attempts) = cli.max_attempts {
                builder = builder.max_attempts(max_attempts);
            }
            if let Some(delay_ms) = cli.delay_ms {
                builder = builder.delay_between_attempts(Duration::from_millis(delay_ms));
            }

            let action = builder.build().context("Invalid resource verification")?;
            let resource = action
                .execute(&source)
                .await
                .with_context(|| format!("Resource '{}' not verified", action.target()))?;

            info!(resource = %resource.name_any(), "Resource verified");
            println!(
                "{}/{} condition={}",
                action.api_resource().kind.to_lowercase(),
                resource.name_any(),
                action.condition()
            );
        }
    }

    Ok(())
}
