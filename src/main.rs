mod auth;
mod config;
mod db;
mod handlers;
mod logger;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::fs;
use std::io;
use std::sync::Arc;

use auth::{AuthManager, AuthMiddleware, LoginAttemptManager, TokenManager};
use config::AppConfig;
use db::{PostgresUserStore, UserStore};
use log::info;

// 应用状态
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub auth_manager: AuthManager,
    pub attempt_manager: LoginAttemptManager,
    pub token_manager: Arc<TokenManager>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 加载 .env
    dotenv().ok();

    // 创建日志目录
    let log_dir = std::path::Path::new("logs");
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    // 初始化日志系统
    let log_path = log_dir.join("app.log");
    if let Err(e) = logger::Logger::init(&log_path) {
        eprintln!("初始化日志系统失败: {}", e);
    }

    info!("应用程序启动");

    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("配置错误: {}", e)))?;

    // 连接数据库
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库连接错误: {}", e)))?;

    // 初始化数据库
    db::initialize_db(&pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库初始化错误: {}", e)))?;

    let store: Arc<dyn UserStore> = Arc::new(PostgresUserStore::new(pool));
    let token_manager = Arc::new(TokenManager::new(&config.jwt_secret));

    let app_state = web::Data::new(AppState {
        store: store.clone(),
        auth_manager: AuthManager::new(store),
        attempt_manager: LoginAttemptManager::new(
            config.max_attempts,
            config.block_period_minutes,
            config.cache_size,
        ),
        token_manager: token_manager.clone(),
    });

    let bind_addr = config.bind_addr.clone();
    println!("服务器启动在 http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/api/register", web::post().to(handlers::register))
            .route("/api/login", web::post().to(handlers::login))
            .route(
                "/api/users/{user_id}/password",
                web::put().to(handlers::change_password),
            )
            .service(
                web::scope("/api/users")
                    .wrap(AuthMiddleware::new(token_manager.clone()))
                    .route("/{user_id}", web::get().to(handlers::get_user)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
