use std::sync::Arc;

use attendance_server::config::Config;
use attendance_server::state::AppState;
use attendance_server::{io, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;
    io::prepare_io(&config.data_dir).await?;

    let addr = config.addr;
    let app = router(Arc::new(AppState::new(config)));

    log::info!("Starting attendance HTTP server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
