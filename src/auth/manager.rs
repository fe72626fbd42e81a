use bcrypt::{hash, verify, DEFAULT_COST};
use log::{debug, error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use super::types::AuthError;
use crate::db::{User, UserStore};

pub struct AuthManager {
    store: Arc<dyn UserStore>,
}

impl AuthManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        info!("初始化认证管理器");
        Self { store }
    }

    /// 校验凭证，`owner_id` 给定时同时校验目标资源是否属于该用户。
    /// 失败一律返回类型化错误，由边界层翻译成固定的 HTTP 状态码
    pub async fn authenticate(
        &self,
        tx_id: Uuid,
        owner_id: Option<i32>,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        debug!("[{}] 尝试认证用户: {}", tx_id, username);

        let user = match self.store.find_by_username(username).await? {
            Some(user) => user,
            None => {
                warn!("[{}] 用户 {} 不存在", tx_id, username);
                return Err(AuthError::Unauthorized);
            }
        };

        if !user.active {
            warn!("[{}] 用户 {} 已停用", tx_id, username);
            return Err(AuthError::Unauthorized);
        }

        if !Self::verify_password(password, &user.password_hash).unwrap_or(false) {
            warn!("[{}] 用户 {} 密码错误", tx_id, username);
            return Err(AuthError::Unauthorized);
        }

        if let Some(owner_id) = owner_id {
            if owner_id != user.id {
                warn!(
                    "[{}] 用户 {} (id: {}) 尝试操作用户 {} 的资源",
                    tx_id, username, user.id, owner_id
                );
                return Err(AuthError::Forbidden);
            }
        }

        info!("[{}] 用户 {} 认证成功", tx_id, username);
        Ok(user)
    }

    /// 仅用于登录场景的简化形式：不做资源所有权校验，
    /// 凭证不匹配时返回 false 而不是错误
    pub async fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.authenticate(Uuid::new_v4(), None, username, password)
            .await
            .is_ok()
    }

    pub fn hash_password(password: &str) -> Result<String, String> {
        debug!("加密密码");
        match hash(password.as_bytes(), DEFAULT_COST) {
            Ok(hash) => Ok(hash),
            Err(e) => {
                error!("密码加密失败: {}", e);
                Err(format!("密码加密失败: {}", e))
            }
        }
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
        match verify(password, hash) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("密码验证过程出错: {}", e);
                Err(format!("密码验证失败: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockUserStore;

    fn stored_user(active: bool) -> User {
        User {
            id: 42,
            username: "bob".to_string(),
            // cost 取最小值，避免测试变慢
            password_hash: hash("secret", 4).unwrap(),
            active,
        }
    }

    fn store_returning(user: Option<User>) -> Arc<dyn UserStore> {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_username()
            .returning(move |_| Ok(user.clone()));
        Arc::new(store)
    }

    #[tokio::test]
    async fn correct_credentials_succeed() {
        let manager = AuthManager::new(store_returning(Some(stored_user(true))));

        let user = manager
            .authenticate(Uuid::new_v4(), None, "bob", "secret")
            .await
            .unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.username, "bob");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let manager = AuthManager::new(store_returning(Some(stored_user(true))));

        let err = manager
            .authenticate(Uuid::new_v4(), None, "bob", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let manager = AuthManager::new(store_returning(None));

        let err = manager
            .authenticate(Uuid::new_v4(), None, "nobody", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn inactive_user_is_unauthorized() {
        let manager = AuthManager::new(store_returning(Some(stored_user(false))));

        let err = manager
            .authenticate(Uuid::new_v4(), None, "bob", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn owner_mismatch_is_forbidden() {
        let manager = AuthManager::new(store_returning(Some(stored_user(true))));

        let err = manager
            .authenticate(Uuid::new_v4(), Some(7), "bob", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));

        let user = manager
            .authenticate(Uuid::new_v4(), Some(42), "bob", "secret")
            .await
            .unwrap();
        assert_eq!(user.id, 42);
    }

    #[tokio::test]
    async fn verify_credentials_returns_bool() {
        let manager = AuthManager::new(store_returning(Some(stored_user(true))));

        assert!(manager.verify_credentials("bob", "secret").await);
        assert!(!manager.verify_credentials("bob", "wrong").await);
    }
}
