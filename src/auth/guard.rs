use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Mutex;

use super::types::FailedLogin;

/// 清理阈值：超过 24 小时未再失败的记录视为过期垃圾，
/// 与可配置的锁定时长无关
const STALE_HORIZON_HOURS: i64 = 24;

pub struct LoginAttemptManager {
    attempts: Mutex<HashMap<String, FailedLogin>>,
    max_attempts: i32,
    block_period_minutes: i64,
    cache_size: usize,
}

impl LoginAttemptManager {
    pub fn new(max_attempts: i32, block_period_minutes: i64, cache_size: usize) -> Self {
        info!(
            "初始化登录尝试管理器 (最大失败次数: {}, 锁定时长: {} 分钟, 缓存上限: {})",
            max_attempts, block_period_minutes, cache_size
        );
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            block_period_minutes,
            cache_size,
        }
    }

    /// 记录一次登录失败。用户名统一按小写记账，
    /// 新建记录导致缓存超出上限时顺带清理过期记录
    pub fn record_failed_attempt(&self, username: &str) {
        let key = username.to_lowercase();
        let now = Utc::now();
        let mut attempts = self.attempts.lock().unwrap();

        match attempts.get_mut(&key) {
            Some(attempt) => {
                attempt.count += 1;
                attempt.last_attempt = now;
                warn!("用户 {} 登录失败，当前失败次数: {}", key, attempt.count);
            }
            None => {
                attempts.insert(
                    key.clone(),
                    FailedLogin {
                        count: 1,
                        last_attempt: now,
                    },
                );
                warn!("用户 {} 第 1 次登录失败", key);

                if attempts.len() > self.cache_size {
                    let before = attempts.len();
                    let horizon = Duration::hours(STALE_HORIZON_HOURS);
                    attempts.retain(|_, a| now - a.last_attempt <= horizon);
                    info!(
                        "失败记录缓存超出上限 {}，清理了 {} 条过期记录",
                        self.cache_size,
                        before - attempts.len()
                    );
                }
            }
        }
    }

    /// 判断用户是否处于锁定期。锁定期已过的记录在这里顺带
    /// 重置为零计数（惰性过期），重置和读取在同一把锁内完成
    pub fn is_blocked(&self, username: &str) -> bool {
        let key = username.to_lowercase();
        debug!("检查用户 {} 是否被锁定", key);
        let now = Utc::now();
        let mut attempts = self.attempts.lock().unwrap();

        let attempt = match attempts.get_mut(&key) {
            Some(attempt) => attempt,
            None => return false,
        };

        if now - attempt.last_attempt > Duration::minutes(self.block_period_minutes) {
            attempt.count = 0;
            attempt.last_attempt = now;
            info!("用户 {} 的锁定期已过，失败次数已重置", key);
            return false;
        }

        let blocked = attempt.count >= self.max_attempts;
        if blocked {
            warn!("用户 {} 处于锁定期 (失败次数: {})", key, attempt.count);
        }
        blocked
    }

    #[cfg(test)]
    fn backdate(&self, username: &str, minutes: i64) {
        let key = username.to_lowercase();
        let mut attempts = self.attempts.lock().unwrap();
        if let Some(attempt) = attempts.get_mut(&key) {
            attempt.last_attempt = attempt.last_attempt - Duration::minutes(minutes);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_username_is_not_blocked() {
        let manager = LoginAttemptManager::new(3, 5, 100);
        assert!(!manager.is_blocked("nobody"));
    }

    #[test]
    fn blocks_after_max_attempts() {
        let manager = LoginAttemptManager::new(3, 5, 100);

        manager.record_failed_attempt("Bob");
        manager.record_failed_attempt("Bob");
        assert!(!manager.is_blocked("bob"));

        manager.record_failed_attempt("Bob");
        assert!(manager.is_blocked("bob"));
    }

    #[test]
    fn username_case_shares_one_record() {
        let manager = LoginAttemptManager::new(2, 5, 100);

        manager.record_failed_attempt("Alice");
        manager.record_failed_attempt("ALICE");
        assert_eq!(manager.len(), 1);
        assert!(manager.is_blocked("alice"));
    }

    #[test]
    fn block_expires_and_resets_count() {
        let manager = LoginAttemptManager::new(3, 5, 100);

        manager.record_failed_attempt("Bob");
        manager.record_failed_attempt("Bob");
        manager.record_failed_attempt("Bob");
        assert!(manager.is_blocked("bob"));

        // 模拟 6 分钟后
        manager.backdate("bob", 6);
        assert!(!manager.is_blocked("bob"));
        // 重置后再查一次仍然不锁定
        assert!(!manager.is_blocked("bob"));

        // 重置后的下一次失败从 1 开始计数，而不是 4
        manager.record_failed_attempt("bob");
        assert!(!manager.is_blocked("bob"));
    }

    #[test]
    fn sweep_removes_stale_records_only() {
        let manager = LoginAttemptManager::new(3, 5, 1);

        manager.record_failed_attempt("alice");
        manager.record_failed_attempt("carol");
        // alice 超过 24 小时未再失败，carol 是新鲜记录
        manager.backdate("alice", 25 * 60);
        manager.backdate("carol", 1);

        // 插入第三个用户触发清理
        manager.record_failed_attempt("bob");
        assert_eq!(manager.len(), 2);
        assert!(!manager.is_blocked("alice"));

        manager.record_failed_attempt("carol");
        manager.record_failed_attempt("carol");
        assert!(manager.is_blocked("carol"));
    }
}
