use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_campaign_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campaign_desk::config::AppConfig;
use campaign_desk::error::AppError;
use campaign_desk::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (service, sessions) = build_service(&config).await?;

    let app = with_campaign_routes(service, sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campaign desk listening");

    let readiness = readiness_flag.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    readiness.store(false, Ordering::Release);
                    info!("shutting down after interrupt");
                }
                Err(err) => {
                    warn!(error = %err, "interrupt handler unavailable; running until killed");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;
    Ok(())
}
