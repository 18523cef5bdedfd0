mod extract;
mod news;
pub mod response;
mod tag;

use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    http::{HeaderName, Method, header},
};
use tokio::signal;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, instrument};

use crate::{
    error::Result,
    state::AppState,
    storage::{NewsRepository, TagRepository},
};

/// 收到退出信号后继续处理请求的时间
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// 设置应用的路由。
///
/// 将新闻接口和标签接口组合在一起，并绑定应用状态。
pub fn setup_route<N, T>(app: AppState<N, T>) -> Router
where
    N: NewsRepository,
    T: TagRepository,
{
    Router::new()
        .merge(news::setup_route::<N, T>())
        .merge(tag::setup_route::<N, T>())
        .with_state(app)
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
///
/// 收到 SIGINT / SIGTERM 后等待 [`GRACE_PERIOD`]，再停止接收新连接并等待已有请求完成。
#[instrument(name = "http server", skip_all)]
pub async fn run_server_with_router(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加日志追踪与 CORS 中间件
/// 3. 启动服务器
pub async fn run_server<N, T>(app: AppState<N, T>, addr: SocketAddr) -> Result<()>
where
    N: NewsRepository,
    T: TagRepository,
{
    let router = setup_route(app);
    let router = add_middlewares(router);
    run_server_with_router(router, addr).await
}

/// 为路由添加 CORS 与请求追踪，只记录失败的请求
pub fn add_middlewares(router: Router) -> Router {
    let trace = TraceLayer::new_for_http().on_request(()).on_failure(
        |class: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
            tracing::error!(error = %class, ?latency, "request failed");
        },
    );

    router.layer(cors()).layer(trace)
}

/// 允许任意来源，仅放行 GET/POST/PUT/DELETE/OPTIONS 与 `X-Requested-With`、`Content-Type`
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
        ])
}

/// 等待 SIGINT 或 SIGTERM，之后再保留 [`GRACE_PERIOD`] 处理进行中的请求
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(%e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(%e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let sig = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!(signal = sig, "caught signal, wait {:?} to finish processing", GRACE_PERIOD);
    tokio::time::sleep(GRACE_PERIOD).await;
}
