use crate::{
    accounts::{EditUserRequest, UserView},
    admin::handler::parse_id,
    auth::Claims,
    error::AppError,
    utils::normalize_email,
    AppState,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

/// 用户只能访问自己的资料，管理员可以访问任意用户
fn ensure_access(claims: &Claims, id: Uuid) -> Result<(), AppError> {
    if claims.is_admin() || claims.sub == id.to_string() {
        Ok(())
    } else {
        Err(AppError::Forbidden("permission denied".to_string()))
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, AppError> {
    let id = parse_id(&id)?;
    ensure_access(&claims, id)?;

    let user = state
        .accounts
        .get_user(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

    Ok(Json(UserView::from(&user)))
}

pub async fn edit_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<EditUserRequest>,
) -> Result<Json<UserView>, AppError> {
    let id = parse_id(&id)?;
    ensure_access(&claims, id)?;

    if req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || !normalize_email(&req.email).contains('@')
    {
        return Err(AppError::BadRequest(
            "firstName, lastName and a valid email are required".to_string(),
        ));
    }

    let user = state
        .accounts
        .update_user(
            id,
            EditUserRequest {
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                email: req.email,
            },
        )
        .await?;

    tracing::info!("用户 {} 的资料已由 {} 更新", id, claims.sub);
    Ok(Json(UserView::from(&user)))
}
