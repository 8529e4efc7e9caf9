use crate::cli::ServeArgs;
use crate::gateway::HttpSubmissionGateway;
use crate::infra::{AppState, InMemorySessionRepository, SimulatedGateway};
use crate::routes::with_onboarding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kyc_onboarding::config::AppConfig;
use kyc_onboarding::error::AppError;
use kyc_onboarding::telemetry;
use kyc_onboarding::workflows::onboarding::{OnboardingService, SubmissionGateway};
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

    if args.simulate_gateway {
        warn!("gateway calls are simulated in-process; nothing reaches the KYC backend");
        serve(config, Arc::new(SimulatedGateway::new())).await
    } else {
        info!(gateway = %config.gateway.base_url, "forwarding wizard steps to KYC backend");
        let gateway = HttpSubmissionGateway::new(config.gateway.clone());
        serve(config, Arc::new(gateway)).await
    }
}

async fn serve<G>(config: AppConfig, gateway: Arc<G>) -> Result<(), AppError>
where
    G: SubmissionGateway + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemorySessionRepository::default());
    let onboarding_service = Arc::new(OnboardingService::new(repository, gateway));

    let app = with_onboarding_routes(onboarding_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "kyc onboarding service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
