use anyhow::{Context, Result};
use tracing::info;

use hospital_db::init_db_pool;
use hospital_portal::built_info;
use hospital_portal::config::PortalConfig;
use hospital_portal::http::{self, AppState};
use hospital_portal::services::bootstrap;
use hospital_portal::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PortalConfig::from_env().context("Configuração inválida")?;
    telemetry::init(config.log_format);

    info!(
        version = built_info::PKG_VERSION,
        db_path = %config.db.db_path,
        "Iniciando portal hospitalar"
    );

    let pool = init_db_pool(&config.db).await?;
    bootstrap::seed(&pool, &config.admin_password).await?;

    let state = AppState::from_config(pool.clone(), &config);
    let app = http::router(state, config.max_concurrent_requests);

    info!(addr = %config.bind_addr, "Servidor HTTP escutando");
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Falha no servidor HTTP")?;

    pool.close().await;
    info!("Portal encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Falha ao aguardar sinal de encerramento");
    }
    info!("Sinal de encerramento recebido");
}
