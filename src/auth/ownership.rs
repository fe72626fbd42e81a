use log::{debug, warn};

use super::types::Claims;

/// 校验 token 中的 id claim 是否与目标资源的所属用户一致。
/// id claim 解析失败时记录告警并按无权处理，不向调用方抛错
pub fn check_ownership(claims: &Claims, target_user_id: i32) -> bool {
    debug!(
        "所有权校验 - 用户: {}, 目标用户 id: {}",
        claims.sub, target_user_id
    );

    match claims.id.parse::<i32>() {
        Ok(id) => {
            let owned = id == target_user_id;
            if !owned {
                warn!(
                    "用户 {} (id: {}) 尝试访问用户 {} 的资源",
                    claims.sub, id, target_user_id
                );
            }
            owned
        }
        Err(_) => {
            warn!("token 中的 id claim 无法解析: {}", claims.id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_id(id: &str) -> Claims {
        Claims {
            iss: "app".to_string(),
            sub: "bob".to_string(),
            iat: 0,
            exp: 0,
            id: id.to_string(),
        }
    }

    #[test]
    fn owner_id_match() {
        assert!(check_ownership(&claims_with_id("42"), 42));
    }

    #[test]
    fn owner_id_mismatch() {
        assert!(!check_ownership(&claims_with_id("42"), 7));
    }

    #[test]
    fn malformed_id_claim_is_denied_without_panicking() {
        assert!(!check_ownership(&claims_with_id("not-a-number"), 42));
        assert!(!check_ownership(&claims_with_id(""), 42));
    }
}
