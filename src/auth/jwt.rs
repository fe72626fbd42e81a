use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};

use super::types::Claims;
use crate::db::User;

const TOKEN_ISSUER: &str = "app";
const TOKEN_VALIDITY_HOURS: i64 = 1;

/// 签名密钥在启动时构建一次，之后只读共享
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenManager {
    pub fn new(secret: &str) -> Self {
        info!("初始化 token 管理器");
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        debug!("为用户 {} 生成 JWT token", user.username);
        let now = Utc::now();
        let claims = Claims {
            iss: TOKEN_ISSUER.to_string(),
            sub: user.username.clone(),
            iat: now.timestamp() as usize,
            exp: (now + chrono::Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp() as usize,
            id: user.id.to_string(),
        };

        match encode(&Header::default(), &claims, &self.encoding_key) {
            Ok(token) => {
                info!("成功为用户 {} 生成 token", user.username);
                Ok(token)
            }
            Err(e) => {
                error!("为用户 {} 生成 token 失败: {}", user.username, e);
                Err(e)
            }
        }
    }

    /// 校验签名与过期时间，返回 token 中的 claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        debug!("验证 JWT token");
        decode::<Claims>(token, &self.decoding_key, &Validation::default()).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 42,
            username: "bob".to_string(),
            password_hash: "x".to_string(),
            active: true,
        }
    }

    #[test]
    fn token_round_trip_carries_identity() {
        let manager = TokenManager::new("test-secret-test-secret");
        let token = manager.generate_token(&test_user()).unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "bob");
        assert_eq!(claims.id, "42");
        assert_eq!(claims.iss, "app");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let secret = "test-secret-test-secret";
        let manager = TokenManager::new(secret);

        let now = Utc::now();
        let claims = Claims {
            iss: "app".to_string(),
            sub: "bob".to_string(),
            iat: (now - chrono::Duration::hours(2)).timestamp() as usize,
            exp: (now - chrono::Duration::hours(1)).timestamp() as usize,
            id: "42".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn token_with_wrong_signature_is_rejected() {
        let manager = TokenManager::new("correct-secret-correct");
        let other = TokenManager::new("another-secret-another");

        let token = other.generate_token(&test_user()).unwrap();
        assert!(manager.validate_token(&token).is_err());
    }
}
