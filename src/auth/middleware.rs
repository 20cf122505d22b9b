use crate::{error::AppError, AppState};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

/// 前端传递 token 使用的 header (xJwtToken)
pub const TOKEN_HEADER: &str = "xjwttoken";
/// 调用方声明自己账户 ID 的 header，必须和 token 的 sub 一致
pub const ID_HEADER: &str = "id";

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get(TOKEN_HEADER).and_then(|h| h.to_str().ok()) {
        return Some(token);
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Token 验证中间件
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;

    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|e| {
            tracing::debug!("Token 校验失败: {}", e);
            AppError::Unauthorized("invalid token".to_string())
        })?;

    let declared_id = request
        .headers()
        .get(ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if declared_id != claims.sub {
        tracing::warn!("ID header 与 token 不一致: token={}, header={}", claims.sub, declared_id);
        return Err(AppError::Forbidden("invalid token".to_string()));
    }

    // 将账户信息存入 request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
