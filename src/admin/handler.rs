use crate::{
    accounts::{
        self, AddAdminRequest, Admin, AdminView, EditAdminRequest, SearchUserRequest, UserView,
    },
    auth::{Claims, MessageResponse},
    error::AppError,
    utils::{normalize_email, now_unix},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_QUANTITY: usize = 10;

/// 列表接口的数量参数
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub quantity: Option<usize>,
}

impl ListQuery {
    fn limit(&self) -> usize {
        self.quantity.unwrap_or(DEFAULT_QUANTITY)
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest("invalid ID".to_string()))
}

/// 管理接口：列出用户
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let users = state.accounts.list_users(query.limit()).await;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// 管理接口：搜索用户
pub async fn search_users(
    State(state): State<AppState>,
    Json(req): Json<SearchUserRequest>,
) -> Result<Json<Vec<UserView>>, AppError> {
    if req.is_empty() {
        return Err(AppError::BadRequest("at least one search field is required".to_string()));
    }
    let users = state.accounts.search_users(&req).await;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// 管理接口：删除用户
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    state.accounts.delete_user(id).await?;
    tracing::info!("管理员 {} 删除了用户 {}", claims.sub, id);
    Ok(MessageResponse::new(format!("user {} deleted", id)))
}

/// 管理接口：获取管理员信息
pub async fn get_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdminView>, AppError> {
    let id = parse_id(&id)?;
    let admin = state
        .accounts
        .get_admin(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("admin {} not found", id)))?;
    Ok(Json(AdminView::from(&admin)))
}

/// 管理接口：列出管理员
pub async fn list_admins(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AdminView>>, AppError> {
    let admins = state.accounts.list_admins(query.limit()).await;
    Ok(Json(admins.iter().map(AdminView::from).collect()))
}

/// 管理接口：修改管理员
pub async fn edit_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditAdminRequest>,
) -> Result<Json<AdminView>, AppError> {
    let id = parse_id(&id)?;
    if req.user_name.trim().is_empty() || !normalize_email(&req.email).contains('@') {
        return Err(AppError::BadRequest("userName and a valid email are required".to_string()));
    }
    let admin = state
        .accounts
        .update_admin(
            id,
            EditAdminRequest {
                user_name: req.user_name.trim().to_string(),
                email: req.email,
            },
        )
        .await?;
    Ok(Json(AdminView::from(&admin)))
}

/// 管理接口：删除管理员，最后一个管理员不能删除
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    state.accounts.delete_admin(id).await?;
    tracing::info!("管理员 {} 删除了管理员 {}", claims.sub, id);
    Ok(MessageResponse::new(format!("admin {} deleted", id)))
}

/// 管理接口：新增管理员
pub async fn add_admin(
    State(state): State<AppState>,
    Json(req): Json<AddAdminRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = normalize_email(&req.email);
    if req.user_name.trim().is_empty() || !email.contains('@') || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "userName, a valid email and password are required".to_string(),
        ));
    }

    let password_hash = accounts::hash_new_password(req.password).await?;

    let admin = state
        .accounts
        .create_admin(Admin {
            id: Uuid::new_v4(),
            user_name: req.user_name.trim().to_string(),
            email,
            password_hash,
            created: now_unix(),
        })
        .await?;

    tracing::info!("新管理员已创建: {} ({})", admin.id, admin.email);
    Ok(MessageResponse::new(format!("admin {} successfully created", admin.user_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("42"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_list_query_default() {
        assert_eq!(ListQuery { quantity: None }.limit(), 10);
        assert_eq!(ListQuery { quantity: Some(3) }.limit(), 3);
    }
}
