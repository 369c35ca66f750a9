// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hachi serve` implementation.
//!
//! Builds the routing pipeline from configuration and runs the HTTP gateway
//! until ctrl-c.

use std::sync::Arc;

use hachi_config::HachiConfig;
use hachi_core::{HachiError, ProcessingTier};
use hachi_gateway::{start_server, GatewayState, MetricsRender, ServerConfig};
use hachi_router::RequestHandler;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};

/// Run the gateway with the given configuration.
pub async fn run_serve(config: HachiConfig) -> Result<(), HachiError> {
    crate::init_tracing(&config.companion.log_level);

    let enabled: Vec<String> = ProcessingTier::ALL
        .into_iter()
        .filter(|tier| config.tier_enabled(*tier))
        .map(|tier| tier.to_string())
        .collect();
    info!(
        companion = config.companion.name.as_str(),
        tiers = ?enabled,
        "starting hachi serve"
    );

    let metrics_render = if config.gateway.metrics_enabled {
        install_metrics()
    } else {
        debug!("metrics disabled by configuration");
        None
    };

    let handler = Arc::new(RequestHandler::from_config(&config).await?);
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    let mut state = GatewayState::new(handler);
    if let Some(render) = metrics_render {
        state = state.with_metrics_render(render);
    }
    start_server(&server_config, state, shutdown_signal()).await?;

    info!("hachi serve shutdown complete");
    Ok(())
}

/// Install the process-wide Prometheus recorder.
///
/// A failure leaves the gateway running without /metrics.
fn install_metrics() -> Option<MetricsRender> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            hachi_router::register_metrics();
            info!("prometheus metrics recorder installed");
            Some(Arc::new(move || handle.render()))
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
