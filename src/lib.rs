pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use error::Result;
use state::AppState;

/// 启动服务
///
/// 1. 加载 `.env`，初始化日志
/// 2. 连接数据库并执行建表迁移
/// 3. 启动 HTTP 服务直到收到退出信号
pub async fn run() -> Result<()> {
    let dotenv = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(
            EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenv {
        tracing::debug!(%e, ".env not loaded");
    }

    let config = Config::from_env();
    let pool = storage::connect(&config).await?;
    storage::migrate(&pool).await?;

    api::run_server(AppState::from_pool(pool), config.listen_addr()).await
}
