use super::types::{Admin, EditAdminRequest, EditUserRequest, SearchUserRequest, User};
use crate::error::AppError;
use crate::utils::normalize_email;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 账户存储接口
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn find_user_by_email(&self, email: &str) -> Option<User>;
    async fn list_users(&self, limit: usize) -> Vec<User>;
    async fn search_users(&self, query: &SearchUserRequest) -> Vec<User>;
    async fn update_user(&self, id: Uuid, edit: EditUserRequest) -> Result<User, AppError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), AppError>;

    async fn create_admin(&self, admin: Admin) -> Result<Admin, AppError>;
    async fn get_admin(&self, id: Uuid) -> Option<Admin>;
    async fn find_admin_by_email(&self, email: &str) -> Option<Admin>;
    async fn list_admins(&self, limit: usize) -> Vec<Admin>;
    async fn update_admin(&self, id: Uuid, edit: EditAdminRequest) -> Result<Admin, AppError>;
    /// 删除管理员；若它是最后一个管理员则返回 `Conflict`
    async fn delete_admin(&self, id: Uuid) -> Result<(), AppError>;
    async fn admin_count(&self) -> usize;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountData {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    admins: Vec<Admin>,
}

/// 基于 JSON 文件的账户存储
///
/// 内存中保存全部账户，每次修改后整体写回文件（先写临时文件再 rename）。
/// 修改在副本上完成，写盘成功后才替换内存状态。
pub struct FileAccountStore {
    data: RwLock<AccountData>,
    path: PathBuf,
}

impl FileAccountStore {
    pub async fn open(path: PathBuf) -> anyhow::Result<Self> {
        let data = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("解析账户文件 {:?} 失败: {}", path, e))?
        } else {
            AccountData::default()
        };

        tracing::info!(
            "账户存储已加载: {} 个用户, {} 个管理员 ({:?})",
            data.users.len(),
            data.admins.len(),
            path
        );

        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    async fn persist(&self, data: &AccountData) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| AppError::internal_with_context("序列化账户数据失败", &e))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }

    /// 在副本上执行修改，写盘成功后提交
    async fn mutate<T, F>(&self, apply: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut AccountData) -> Result<T, AppError> + Send,
        T: Send,
    {
        let mut guard = self.data.write().await;
        let mut next = guard.clone();
        let result = apply(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(result)
    }
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("user {} not found", id))
}

fn admin_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("admin {} not found", id))
}

#[async_trait]
impl AccountRepository for FileAccountStore {
    async fn create_user(&self, mut user: User) -> Result<User, AppError> {
        user.email = normalize_email(&user.email);
        self.mutate(|data| {
            if data.users.iter().any(|u| u.email == user.email) {
                return Err(AppError::Conflict("user already exists".to_string()));
            }
            data.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        let data = self.data.read().await;
        data.users.iter().find(|u| u.id == id).cloned()
    }

    async fn find_user_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        let data = self.data.read().await;
        data.users.iter().find(|u| u.email == email).cloned()
    }

    async fn list_users(&self, limit: usize) -> Vec<User> {
        let data = self.data.read().await;
        data.users.iter().take(limit).cloned().collect()
    }

    async fn search_users(&self, query: &SearchUserRequest) -> Vec<User> {
        let data = self.data.read().await;
        data.users.iter().filter(|u| query.matches(u)).cloned().collect()
    }

    async fn update_user(&self, id: Uuid, edit: EditUserRequest) -> Result<User, AppError> {
        let email = normalize_email(&edit.email);
        self.mutate(|data| {
            if data.users.iter().any(|u| u.email == email && u.id != id) {
                return Err(AppError::Conflict("email already in use".to_string()));
            }
            let user = data
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| user_not_found(id))?;
            user.first_name = edit.first_name;
            user.last_name = edit.last_name;
            user.email = email;
            Ok(user.clone())
        })
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        self.mutate(|data| {
            let before = data.users.len();
            data.users.retain(|u| u.id != id);
            if data.users.len() == before {
                return Err(user_not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn create_admin(&self, mut admin: Admin) -> Result<Admin, AppError> {
        admin.email = normalize_email(&admin.email);
        self.mutate(|data| {
            if data.admins.iter().any(|a| a.email == admin.email) {
                return Err(AppError::Conflict("admin already exists".to_string()));
            }
            data.admins.push(admin.clone());
            Ok(admin)
        })
        .await
    }

    async fn get_admin(&self, id: Uuid) -> Option<Admin> {
        let data = self.data.read().await;
        data.admins.iter().find(|a| a.id == id).cloned()
    }

    async fn find_admin_by_email(&self, email: &str) -> Option<Admin> {
        let email = normalize_email(email);
        let data = self.data.read().await;
        data.admins.iter().find(|a| a.email == email).cloned()
    }

    async fn list_admins(&self, limit: usize) -> Vec<Admin> {
        let data = self.data.read().await;
        data.admins.iter().take(limit).cloned().collect()
    }

    async fn update_admin(&self, id: Uuid, edit: EditAdminRequest) -> Result<Admin, AppError> {
        let email = normalize_email(&edit.email);
        self.mutate(|data| {
            if data.admins.iter().any(|a| a.email == email && a.id != id) {
                return Err(AppError::Conflict("email already in use".to_string()));
            }
            let admin = data
                .admins
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| admin_not_found(id))?;
            admin.user_name = edit.user_name;
            admin.email = email;
            Ok(admin.clone())
        })
        .await
    }

    async fn delete_admin(&self, id: Uuid) -> Result<(), AppError> {
        self.mutate(|data| {
            let index = data
                .admins
                .iter()
                .position(|a| a.id == id)
                .ok_or_else(|| admin_not_found(id))?;
            // 与删除在同一把写锁内判断，并发删除不会删光管理员
            if data.admins.len() <= 1 {
                return Err(AppError::Conflict("cannot delete the last admin".to_string()));
            }
            data.admins.remove(index);
            Ok(())
        })
        .await
    }

    async fn admin_count(&self) -> usize {
        self.data.read().await.admins.len()
    }
}
