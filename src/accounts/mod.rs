pub mod password;
pub mod store;
pub mod types;

pub use store::*;
pub use types::*;

use crate::error::AppError;
use once_cell::sync::Lazy;

// 邮箱不存在时也做一次哈希校验，让两种失败的耗时接近
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| password::hash_password("account-not-found").ok());

/// 在阻塞线程池中计算密码哈希，避免占用运行时工作线程
pub async fn hash_new_password(plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AppError::internal_with_context("密码哈希任务失败", &e))?
        .map_err(|e| AppError::internal_with_context("密码哈希失败", &e))
}

async fn check_password(hash: Option<String>, candidate: &str) -> Result<bool, AppError> {
    let candidate = candidate.to_string();
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => password::verify_password(&hash, &candidate),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = password::verify_password(dummy, &candidate);
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| AppError::internal_with_context("密码校验任务失败", &e))?
    .map_err(|e| AppError::internal_with_context("密码校验失败", &e))
}

/// 校验用户邮箱和密码
pub async fn authenticate_user(
    repo: &dyn AccountRepository,
    email: &str,
    candidate: &str,
) -> Result<User, AppError> {
    let user = repo.find_user_by_email(email).await;
    let hash = user.as_ref().map(|u| u.password_hash.clone());
    if check_password(hash, candidate).await? {
        user.ok_or_else(AppError::invalid_credentials)
    } else {
        Err(AppError::invalid_credentials())
    }
}

/// 校验管理员邮箱和密码
pub async fn authenticate_admin(
    repo: &dyn AccountRepository,
    email: &str,
    candidate: &str,
) -> Result<Admin, AppError> {
    let admin = repo.find_admin_by_email(email).await;
    let hash = admin.as_ref().map(|a| a.password_hash.clone());
    if check_password(hash, candidate).await? {
        admin.ok_or_else(AppError::invalid_credentials)
    } else {
        Err(AppError::invalid_credentials())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_authenticate_admin() {
        let dir = TempDir::new().unwrap();
        let store = FileAccountStore::open(dir.path().join("accounts.json"))
            .await
            .unwrap();
        store
            .create_admin(Admin {
                id: Uuid::new_v4(),
                user_name: "root".to_string(),
                email: "root@example.com".to_string(),
                password_hash: password::hash_password("s3cret").unwrap(),
                created: 0,
            })
            .await
            .unwrap();

        let admin = authenticate_admin(&store, " ROOT@example.com", "s3cret").await.unwrap();
        assert_eq!(admin.user_name, "root");

        let wrong = authenticate_admin(&store, "root@example.com", "nope").await.unwrap_err();
        let missing = authenticate_admin(&store, "ghost@example.com", "s3cret").await.unwrap_err();
        assert_eq!(wrong.to_string(), missing.to_string());

        // 管理员账户不能用于普通用户登录
        assert!(authenticate_user(&store, "root@example.com", "s3cret").await.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_password_work_does_not_block_runtime() {
        let dir = TempDir::new().unwrap();
        let store = FileAccountStore::open(dir.path().join("accounts.json"))
            .await
            .unwrap();
        let hash = hash_new_password("s3cret".to_string()).await.unwrap();
        store
            .create_admin(Admin {
                id: Uuid::new_v4(),
                user_name: "root".to_string(),
                email: "root@example.com".to_string(),
                password_hash: hash,
                created: 0,
            })
            .await
            .unwrap();

        // 单线程运行时：哈希校验若在当前线程执行，定时任务要等它结束才能推进
        let (auth_done, tick_done) = tokio::join!(
            async {
                authenticate_admin(&store, "root@example.com", "s3cret")
                    .await
                    .unwrap();
                std::time::Instant::now()
            },
            async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                std::time::Instant::now()
            }
        );
        assert!(tick_done < auth_done);
    }
}
