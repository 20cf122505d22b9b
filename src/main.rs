mod accounts;
mod admin;
mod auth;
mod config;
mod error;
mod logger;
mod metrics;
mod throttle;
mod users;
mod utils;

use accounts::{AccountRepository, Admin, FileAccountStore};
use auth::JwtService;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Json, Router,
};
use config::{BootstrapAdmin, Config};
use error::AppError;
use logger::LoggerConfig;
use metrics::METRICS;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use throttle::{LoginThrottle, ThrottlePolicy};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

// 统一的应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt_service: Arc<JwtService>,
    pub throttle: Arc<LoginThrottle>, // 管理员登录限流，进程内唯一
    pub accounts: Arc<dyn AccountRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_logger(LoggerConfig::default())?;

    let config = Config::load()?;
    tracing::info!("配置加载成功");
    tracing::info!("服务器地址: {}:{}", config.server.host, config.server.port);

    let jwt_service = Arc::new(
        JwtService::new(config.auth.jwt_secret.clone(), config.auth.token_ttl_seconds)
            .map_err(|e| anyhow::anyhow!("JWT服务初始化失败: {}", e))?,
    );

    let throttle = Arc::new(LoginThrottle::new(ThrottlePolicy::from(&config.throttle)));
    let policy = throttle.policy();
    tracing::info!(
        "登录限流: 窗口 {} 秒内每账户 {} 次 / 每来源 {} 次, 封禁 {} 秒",
        policy.window.as_secs(),
        policy.max_attempts,
        policy.max_attempts_per_source,
        policy.block_duration.as_secs()
    );

    let accounts: Arc<dyn AccountRepository> =
        Arc::new(FileAccountStore::open(config.storage.data_file.clone()).await?);
    bootstrap_admin(accounts.as_ref(), config.storage.bootstrap_admin.as_ref()).await?;

    let config = Arc::new(config);
    let app_state = AppState {
        config: config.clone(),
        jwt_service,
        throttle,
        accounts,
    };

    let app = build_router(app_state)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 账户服务启动成功: http://{}", addr);
    tracing::info!("📝 管理员登录: POST http://{}/admin/login", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("服务已停止");
    Ok(())
}

/// 构建路由
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // 公开路由（无需认证）
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .route("/admin/validateJWT", post(auth::validate_admin_jwt));

    // 需要 token 的用户路由
    let user_routes = Router::new()
        .route("/user/:id", get(users::get_user))
        .route("/user/edit/:id", post(users::edit_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    // 需要管理员 token 的路由
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/user/search", post(admin::search_users))
        .route("/user/delete/:id", post(admin::delete_user))
        .route("/admin/:id", get(admin::get_admin))
        .route("/admins", get(admin::list_admins))
        .route("/admin/edit/:id", post(admin::edit_admin))
        .route("/admin/delete/:id", post(admin::delete_admin))
        .route("/admin/add", post(admin::add_admin))
        .route_layer(middleware::from_fn(admin::require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    let cors = cors_layer(&state.config.server.cors_origin)?;
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Ok(public_routes
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin.parse()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(auth::middleware::TOKEN_HEADER),
            HeaderName::from_static(auth::middleware::ID_HEADER),
        ])
        .allow_credentials(true))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "time": utils::now_beijing().to_rfc3339(),
    }))
}

async fn render_metrics() -> Result<String, AppError> {
    METRICS.render().map_err(AppError::InternalError)
}

/// 没有任何管理员时按配置创建初始管理员
async fn bootstrap_admin(
    accounts: &dyn AccountRepository,
    bootstrap: Option<&BootstrapAdmin>,
) -> anyhow::Result<()> {
    if accounts.admin_count().await > 0 {
        return Ok(());
    }

    let Some(bootstrap) = bootstrap else {
        tracing::warn!("当前没有任何管理员，且未配置 storage.bootstrap_admin");
        return Ok(());
    };

    let password_hash = crate::accounts::hash_new_password(bootstrap.password.clone()).await?;
    let admin = accounts
        .create_admin(Admin {
            id: Uuid::new_v4(),
            user_name: bootstrap.user_name.clone(),
            email: bootstrap.email.clone(),
            password_hash,
            created: utils::now_unix(),
        })
        .await
        .map_err(|e| anyhow::anyhow!("创建初始管理员失败: {}", e))?;

    tracing::info!("已创建初始管理员: {} ({})", admin.user_name, admin.email);
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl+C 信号: {}", e);
        return;
    }
    tracing::info!("收到关闭信号，正在停止服务...");
}
