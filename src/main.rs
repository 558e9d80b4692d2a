use recruitment_assistant::{
    config::{get_config, init_config},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const REAPER_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    init_config()?;
    let config = get_config()?;

    let app_state = AppState::new(config)?;

    {
        let knowledge = app_state.knowledge.clone();
        let source = config.document_source_path.clone();
        tokio::spawn(async move {
            if let Err(e) = knowledge.load_or_ingest(&source).await {
                tracing::error!(error = %e, "Knowledge base unavailable");
            }
        });
    }

    {
        let chat = app_state.chat_service.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAPER_INTERVAL);
            loop {
                ticker.tick().await;
                chat.reap(chrono::Utc::now()).await;
            }
        });
    }

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
