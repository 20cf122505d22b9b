use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("认证失败: {0}")]
    Unauthorized(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("登录尝试过于频繁")]
    TooManyRequests,

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            // 无论账户是否存在都返回同样的内容
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "too many login attempts, try again later".to_string(),
            ),
            AppError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

// anyhow::Error 统一转为 InternalError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(
            error = %err,
            backtrace = ?err.backtrace(),
            "anyhow::Error 被转换为 InternalError"
        );

        let error_chain = err
            .chain()
            .enumerate()
            .map(|(i, e)| format!("  [{}] {}", i, e))
            .collect::<Vec<_>>()
            .join("\n");

        AppError::InternalError(format!("内部错误:\n{}", error_chain))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!(
            error = %err,
            kind = ?err.kind(),
            "IO 错误"
        );

        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                AppError::InternalError(format!("权限不足: {}", err))
            }
            _ => AppError::InternalError(format!("IO 错误: {}", err)),
        }
    }
}

impl AppError {
    /// 创建带上下文的内部错误
    pub fn internal_with_context(context: &str, err: &dyn std::fmt::Display) -> Self {
        tracing::error!(
            context = context,
            error = %err,
            "内部错误发生"
        );
        AppError::InternalError(format!("{}: {}", context, err))
    }

    /// 邮箱或密码错误，不区分账户是否存在
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("invalid email or password".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_too_many_requests_body() {
        let (status, body) = body_json(AppError::TooManyRequests).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "too_many_requests");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = vec![
            (AppError::invalid_credentials(), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, _) = body_json(err).await;
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_anyhow_conversion_keeps_chain() {
        let err = anyhow::anyhow!("磁盘已满").context("保存账户失败");
        match AppError::from(err) {
            AppError::InternalError(msg) => {
                assert!(msg.contains("保存账户失败"));
                assert!(msg.contains("磁盘已满"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
