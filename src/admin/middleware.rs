use crate::{auth::Claims, error::AppError};
use axum::{extract::Request, middleware::Next, response::Response};

/// 中间件：只允许管理员 token 访问，需放在 `jwt_auth` 之后
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;

    if !claims.is_admin() {
        tracing::warn!("拒绝非管理员访问管理接口: {}", claims.sub);
        return Err(AppError::Forbidden("permission denied".to_string()));
    }

    tracing::debug!("允许管理员 {} 访问: {}", claims.sub, request.uri());
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountKind;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "OK"
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(ok_handler))
            .layer(middleware::from_fn(require_admin))
    }

    fn request_with(role: Option<AccountKind>) -> Request<Body> {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(Claims {
                sub: "someone".to_string(),
                role,
                exp: usize::MAX,
            });
        }
        request
    }

    #[tokio::test]
    async fn test_allows_admin() {
        let response = app().oneshot(request_with(Some(AccountKind::Admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_denies_user() {
        let response = app().oneshot(request_with(Some(AccountKind::User))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_denies_missing_claims() {
        let response = app().oneshot(request_with(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
