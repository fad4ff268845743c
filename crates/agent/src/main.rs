//! `loadshield-agent` -- load-triggered Cloudflare shield toggle.
//!
//! Samples the host's 1-minute load average once, enables a Cloudflare WAF
//! rule when it exceeds the threshold, and disables it again once load is
//! back to normal and the cooldown window has passed. Meant to be invoked
//! periodically by an external scheduler (cron, systemd timer).
//!
//! Exit status is `0` for every outcome that completed as designed and `1`
//! for remote, marker, configuration or sampling failures.
//!
//! See [`loadshield_agent::config::AgentConfig::from_env`] for the
//! environment variables.

use std::process::ExitCode;

use loadshield_agent::cloudflare::CloudflareClient;
use loadshield_agent::config::{AgentConfig, LogFormat};
use loadshield_agent::controller::ShieldController;
use loadshield_agent::marker_store::FileMarkerStore;
use loadshield_agent::sampler::{HostLoadSampler, SampleError};
use loadshield_core::outcome::EXIT_FAILURE;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_tracing(config.log_format);

    tracing::info!(
        zone_id = %config.rule.zone_id,
        rule_id = %config.rule.rule_id,
        threshold = config.policy.threshold(),
        cooldown_mins = config.policy.cooldown().num_minutes(),
        marker = %config.marker_path.display(),
        "Starting loadshield-agent",
    );

    let client = match CloudflareClient::new(config.rule.clone(), config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let store = FileMarkerStore::new(config.marker_path.clone());
    let controller = ShieldController::new(store, client, config.policy);

    let now = chrono::Local::now().naive_local();
    match controller.run(&HostLoadSampler::new(), now).await {
        Ok(outcome) => {
            tracing::info!(%outcome, "Evaluation finished");
            ExitCode::from(outcome.exit_code())
        }
        Err(e @ SampleError::Unsupported { .. }) => {
            tracing::warn!(error = %e, "Load monitoring unsupported on this host, skipping check");
            ExitCode::from(EXIT_FAILURE)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to sample host load");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "loadshield_agent=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
