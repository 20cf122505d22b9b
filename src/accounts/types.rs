use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 账户类型，用于区分 JWT 角色和日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Admin,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub created: i64,
}

/// 对外返回的用户信息（不含密码哈希）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "userId")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            created: user.created,
        }
    }
}

/// 对外返回的管理员信息（不含密码哈希）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    #[serde(rename = "adminId")]
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub created: i64,
}

impl From<&Admin> for AdminView {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            user_name: admin.user_name.clone(),
            email: admin.email.clone(),
            created: admin.created,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAdminRequest {
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// 用户搜索条件，非空字段之间是"或"的关系
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchUserRequest {
    #[serde(rename = "userId")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl SearchUserRequest {
    pub fn is_empty(&self) -> bool {
        self.id.trim().is_empty()
            && self.first_name.trim().is_empty()
            && self.last_name.trim().is_empty()
            && self.email.trim().is_empty()
    }

    /// id 精确匹配，姓名和邮箱做不区分大小写的子串匹配
    pub fn matches(&self, user: &User) -> bool {
        fn contains(haystack: &str, needle: &str) -> bool {
            let needle = needle.trim();
            !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        let id = self.id.trim();
        (!id.is_empty() && user.id.to_string() == id)
            || contains(&user.first_name, &self.first_name)
            || contains(&user.last_name, &self.last_name)
            || contains(&user.email, &self.email)
    }
}
