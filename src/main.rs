use log::*;
use quiz_host::{
    config::Config,
    controller::TournamentController,
    http,
    persistence::PersistenceClient,
    server::{AppState, Console, QuestionSource, start_ws_server},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    env_logger::init();
    info!("Starting quiz host console");

    let source = QuestionSource {
        questions_path: config.questions_path.clone(),
        final_questions_path: config.final_questions_path.clone(),
        media_base_url: config.media_base_url.clone(),
    };
    let store = PersistenceClient::new(config.state_dir.clone());

    let console = match source.load_with_retry().await {
        Ok(repository) => Console::Ready(TournamentController::open(repository, store)),
        Err(e) => {
            error!("Questions unavailable, waiting for a reload: {e}");
            Console::Loading {
                reason: e.to_string(),
                store,
            }
        }
    };

    let app_state = AppState::new(
        console,
        source,
        config.ping_interval,
        config.pong_timeout,
    );

    let ws_listener = TcpListener::bind(config.ws_addr).await?;
    let http_listener = TcpListener::bind(config.http_addr).await?;
    info!("HTTP listening on: {}", config.http_addr);

    tokio::select! {
        _ = start_ws_server(ws_listener, app_state.clone()) => {},
        res = axum::serve(http_listener, http::router(app_state)) => res?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
