use microplastic_monitor::{
    create_router, intake::serial::spawn_serial_capture, AppError, AppState, Configuration,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let configuration = Configuration::load()?;
    let bind_address = configuration.server.bind_address.clone();
    let cancel_token = CancellationToken::new();

    let serial_task = match &configuration.serial {
        Some(settings) => match spawn_serial_capture(settings, cancel_token.clone()).await {
            Ok(task) => Some(task),
            Err(e) => {
                error!("Serial capture disabled: {}", e);
                None
            }
        },
        None => None,
    };

    info!("Camera source: {} ({:?})", configuration.camera.url, configuration.camera.mode);
    let state = AppState::new(configuration)?;
    let router = create_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|e| AppError::Bind(e, bind_address.clone()))?;
    info!("Listening on {}", bind_address);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Serve);

    cancel_token.cancel();
    if let Some(task) = serial_task {
        if let Err(e) = task.await {
            error!("Serial capture task panicked: {}", e);
        }
    }
    served
}
