use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub iss: String, // 签发者
    pub sub: String, // 用户名
    pub iat: usize,  // 签发时间
    pub exp: usize,  // 过期时间
    pub id: String,  // 用户 id（字符串形式，所有权校验时再解析）
}

#[derive(Debug, Clone)]
pub struct FailedLogin {
    pub count: i32,
    pub last_attempt: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// 用户不存在、已停用或密码错误，对外统一表现为 401
    #[error("认证失败")]
    Unauthorized,

    /// 凭证有效但访问的不是自己的资源，对外表现为 403
    #[error("无权访问该资源")]
    Forbidden,

    /// 用户当前处于登录锁定期，对外响应与 401 保持一致
    #[error("账户已被临时锁定")]
    Blocked,

    #[error("存储错误: {0}")]
    Storage(String),
}
