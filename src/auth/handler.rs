use crate::{
    accounts::{self, AccountKind, LoginRequest, RegisterUserRequest, User},
    error::AppError,
    metrics::METRICS,
    utils::{normalize_email, now_unix},
    AppState,
};
use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    #[serde(rename = "xJwtToken")]
    pub token: String,
    #[serde(rename = "adminId", skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct ValidateJwtRequest {
    #[serde(rename = "xJwtToken")]
    pub token: String,
    #[serde(rename = "adminId")]
    pub admin_id: String,
}

fn require_field(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", name)));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    Ok(email)
}

fn issue_token(state: &AppState, subject: &str, kind: AccountKind) -> Result<String, AppError> {
    state
        .jwt_service
        .generate_token(subject, kind)
        .map_err(|e| AppError::internal_with_context("生成 token 失败", &e))
}

/// 用户注册
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    require_field("firstName", &req.first_name)?;
    require_field("lastName", &req.last_name)?;
    require_field("password", &req.password)?;
    let email = require_email(&req.email)?;

    let password_hash = accounts::hash_new_password(req.password).await?;

    let user = state
        .accounts
        .create_user(User {
            id: Uuid::new_v4(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            password_hash,
            created: now_unix(),
        })
        .await?;

    tracing::info!("新用户注册: {} ({})", user.id, user.email);
    Ok(MessageResponse::new("successfully created user"))
}

/// 用户登录（不经过限流）
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = match accounts::authenticate_user(state.accounts.as_ref(), &req.email, &req.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            METRICS.record_login(AccountKind::User.as_str(), "invalid");
            return Err(e);
        }
    };

    let user_id = user.id.to_string();
    let token = issue_token(&state, &user_id, AccountKind::User)?;
    METRICS.record_login(AccountKind::User.as_str(), "success");
    tracing::info!("用户 {} 登录成功", user_id);

    Ok(Json(LoginResponse {
        message: "successfully logged in".to_string(),
        token,
        admin_id: None,
        user_id: Some(user_id),
        expires_in: state.jwt_service.get_ttl_seconds(),
    }))
}

/// 管理员登录
///
/// 先经过登录限流，被拒绝时直接返回 429，不查询账户存储。
/// 放行后登录成功与否都不会回报给限流器。
pub async fn admin_login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = require_email(&req.email)?;
    let source = addr.ip().to_string();

    if state.throttle.evaluate(&email, &source) {
        METRICS.record_login(AccountKind::Admin.as_str(), "blocked");
        tracing::warn!("管理员登录被限流: {} (来源: {})", email, source);
        return Err(AppError::TooManyRequests);
    }

    let admin = match accounts::authenticate_admin(state.accounts.as_ref(), &email, &req.password)
        .await
    {
        Ok(admin) => admin,
        Err(e) => {
            METRICS.record_login(AccountKind::Admin.as_str(), "invalid");
            tracing::info!("管理员登录失败: {} (来源: {})", email, source);
            return Err(e);
        }
    };

    let admin_id = admin.id.to_string();
    let token = issue_token(&state, &admin_id, AccountKind::Admin)?;
    METRICS.record_login(AccountKind::Admin.as_str(), "success");
    tracing::info!("管理员 {} 登录成功 (来源: {})", admin_id, source);

    Ok(Json(LoginResponse {
        message: "successfully logged in".to_string(),
        token,
        admin_id: Some(admin_id),
        user_id: None,
        expires_in: state.jwt_service.get_ttl_seconds(),
    }))
}

/// 校验管理员 token 是否有效且属于指定管理员
pub async fn validate_admin_jwt(
    State(state): State<AppState>,
    Json(req): Json<ValidateJwtRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let claims = state
        .jwt_service
        .validate_token(&req.token)
        .map_err(|_| AppError::Forbidden("invalid token".to_string()))?;

    if !claims.is_admin() || claims.sub != req.admin_id {
        return Err(AppError::Forbidden("invalid token".to_string()));
    }

    Ok(MessageResponse::new("valid token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_email() {
        assert_eq!(require_email(" A@B.com ").unwrap(), "a@b.com");
        assert!(require_email("").is_err());
        assert!(require_email("not-an-email").is_err());
    }

    #[test]
    fn test_login_response_field_names() {
        let response = LoginResponse {
            message: "ok".to_string(),
            token: "t".to_string(),
            admin_id: Some("a".to_string()),
            user_id: None,
            expires_in: 60,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["xJwtToken"], "t");
        assert_eq!(json["adminId"], "a");
        assert!(json.get("userId").is_none());
        assert_eq!(json["expiresIn"], 60);
        assert!(json.get("expires_in").is_none());
    }
}
