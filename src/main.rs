use std::net::SocketAddr;
use std::sync::Arc;

use classroom_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    repositories::PgStore,
    routes,
    storage::LocalBlobStore,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("classroom_backend=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log_format.is_some_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;
    init_tracing(config.log_format.as_deref());

    let pool = create_pool(config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));
    let blobs = Arc::new(LocalBlobStore::new(
        config.uploads_dir.clone(),
        config.max_upload_bytes,
    ));
    let app_state = AppState::with_store(config.clone(), store, blobs);
    let app = routes::app(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
