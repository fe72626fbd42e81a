use log::info;
use std::env;

/// 应用配置，启动时从环境变量读取并校验一次
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub max_attempts: i32,
    pub block_period_minutes: i64,
    pub cache_size: usize,
}

const DEFAULT_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_BLOCK_PERIOD_MINUTES: i64 = 15;
const DEFAULT_CACHE_SIZE: usize = 1000;

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "必须设置 DATABASE_URL".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "必须设置 JWT_SECRET".to_string())?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET 不能为空".to_string());
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let max_attempts = parse_positive("BRUTEFORCE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS as i64)?;
        let block_period_minutes =
            parse_positive("BRUTEFORCE_BLOCK_PERIOD_MINUTES", DEFAULT_BLOCK_PERIOD_MINUTES)?;
        let cache_size = parse_positive("BRUTEFORCE_CACHE_SIZE", DEFAULT_CACHE_SIZE as i64)? as usize;

        info!(
            "加载配置完成 (最大失败次数: {}, 锁定时长: {} 分钟, 缓存上限: {})",
            max_attempts, block_period_minutes, cache_size
        );

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            max_attempts: max_attempts as i32,
            block_period_minutes,
            cache_size,
        })
    }
}

fn parse_positive(name: &str, default: i64) -> Result<i64, String> {
    match env::var(name) {
        Ok(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| format!("{} 必须是整数: {}", name, raw))?;
            if value <= 0 {
                return Err(format!("{} 必须大于 0: {}", name, value));
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}
