use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthError, AuthManager, Claims};
use crate::AppState;

// 统一的响应结构体
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub password: String,
    pub new_password: String,
}

/// 登录失败与账户锁定对外返回完全一致的 401，
/// 避免向攻击者泄露锁定状态或用户是否存在
fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse {
        success: false,
        message: "用户名或密码错误".to_string(),
        data: None,
    })
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiResponse {
        success: false,
        message: "服务器内部错误".to_string(),
        data: None,
    })
}

pub async fn register(
    body: web::Json<RegisterRequest>,
    data: web::Data<AppState>,
) -> HttpResponse {
    info!("开始处理注册请求");

    if body.username.is_empty() || body.password.is_empty() {
        warn!("注册请求参数不足");
        return HttpResponse::BadRequest().json(ApiResponse {
            success: false,
            message: "请提供用户名和密码".to_string(),
            data: None,
        });
    }

    debug!("注册用户: {}", body.username);

    match data.store.find_by_username(&body.username).await {
        Ok(Some(_)) => {
            warn!("用户名 {} 已存在", body.username);
            return HttpResponse::Conflict().json(ApiResponse {
                success: false,
                message: "用户名已存在".to_string(),
                data: None,
            });
        }
        Ok(None) => {}
        Err(e) => {
            error!("查询用户失败: {}", e);
            return internal_error();
        }
    }

    let password_hash = match AuthManager::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("密码加密失败: {}", e);
            return internal_error();
        }
    };

    match data.store.create_user(&body.username, &password_hash).await {
        Ok(user) => {
            info!("用户 {} 注册成功", user.username);
            HttpResponse::Ok().json(ApiResponse {
                success: true,
                message: "注册成功".to_string(),
                data: Some(json!({
                    "user": { "id": user.id, "username": user.username }
                })),
            })
        }
        Err(e) => {
            error!("创建用户失败: {}", e);
            internal_error()
        }
    }
}

pub async fn login(body: web::Json<LoginRequest>, data: web::Data<AppState>) -> HttpResponse {
    let tx_id = Uuid::new_v4();
    info!("[{}] 开始处理登录请求", tx_id);

    // 锁定检查在凭证校验之前，锁定期间不增加失败计数
    let result = if data.attempt_manager.is_blocked(&body.username) {
        Err(AuthError::Blocked)
    } else {
        data.auth_manager
            .authenticate(tx_id, None, &body.username, &body.password)
            .await
    };

    match result {
        Ok(user) => {
            let token = match data.token_manager.generate_token(&user) {
                Ok(token) => token,
                Err(e) => {
                    error!("[{}] 生成 token 失败: {}", tx_id, e);
                    return internal_error();
                }
            };

            info!("[{}] 用户 {} 登录成功", tx_id, user.username);
            HttpResponse::Ok().json(ApiResponse {
                success: true,
                message: "登录成功".to_string(),
                data: Some(json!({
                    "token": token,
                    "user": { "id": user.id, "username": user.username }
                })),
            })
        }
        Err(AuthError::Unauthorized) => {
            // 记录失败尝试，连带传递事务 id 便于追查暴力破解
            data.attempt_manager.record_failed_attempt(&body.username);
            warn!("[{}] 用户 {} 登录失败", tx_id, body.username);
            unauthorized()
        }
        Err(AuthError::Blocked) => {
            // 对外响应与凭证错误完全一致，仅在日志中区分以便告警
            warn!("[{}] 用户 {} 处于锁定期，拒绝登录", tx_id, body.username);
            unauthorized()
        }
        Err(AuthError::Forbidden) => HttpResponse::Forbidden().json(ApiResponse {
            success: false,
            message: "无权访问该资源".to_string(),
            data: None,
        }),
        Err(e) => {
            error!("[{}] 登录处理失败: {}", tx_id, e);
            internal_error()
        }
    }
}

pub async fn get_user(
    req: HttpRequest,
    path: web::Path<i32>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let user_id = path.into_inner();
    debug!("查询用户信息: {}", user_id);

    // 中间件已完成 token 与所有权校验
    let claims = match req.extensions().get::<Claims>().cloned() {
        Some(claims) => claims,
        None => {
            warn!("请求缺少认证信息");
            return unauthorized();
        }
    };

    match data.store.find_by_username(&claims.sub).await {
        Ok(Some(user)) => HttpResponse::Ok().json(ApiResponse {
            success: true,
            message: "查询成功".to_string(),
            data: Some(json!({
                "user": {
                    "id": user.id,
                    "username": user.username,
                    "active": user.active
                }
            })),
        }),
        Ok(None) => {
            warn!("用户 {} 不存在", claims.sub);
            HttpResponse::NotFound().json(ApiResponse {
                success: false,
                message: "用户不存在".to_string(),
                data: None,
            })
        }
        Err(e) => {
            error!("查询用户失败: {}", e);
            internal_error()
        }
    }
}

/// 修改密码需要重新提交凭证，并校验目标资源属于该用户
pub async fn change_password(
    path: web::Path<i32>,
    body: web::Json<ChangePasswordRequest>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let user_id = path.into_inner();
    let tx_id = Uuid::new_v4();
    info!("[{}] 开始处理修改密码请求 (目标用户: {})", tx_id, user_id);

    let result = if data.attempt_manager.is_blocked(&body.username) {
        Err(AuthError::Blocked)
    } else {
        data.auth_manager
            .authenticate(tx_id, Some(user_id), &body.username, &body.password)
            .await
    };

    match result {
        Ok(user) => {
            let password_hash = match AuthManager::hash_password(&body.new_password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!("[{}] 密码加密失败: {}", tx_id, e);
                    return internal_error();
                }
            };

            if let Err(e) = data.store.update_password(user.id, &password_hash).await {
                error!("[{}] 更新密码失败: {}", tx_id, e);
                return internal_error();
            }

            info!("[{}] 用户 {} 修改密码成功", tx_id, user.username);
            HttpResponse::Ok().json(ApiResponse {
                success: true,
                message: "密码修改成功".to_string(),
                data: None,
            })
        }
        Err(AuthError::Unauthorized) => {
            data.attempt_manager.record_failed_attempt(&body.username);
            warn!("[{}] 用户 {} 凭证校验失败", tx_id, body.username);
            unauthorized()
        }
        Err(AuthError::Blocked) => {
            warn!("[{}] 用户 {} 处于锁定期，拒绝操作", tx_id, body.username);
            unauthorized()
        }
        Err(AuthError::Forbidden) => {
            warn!(
                "[{}] 用户 {} 尝试修改用户 {} 的密码",
                tx_id, body.username, user_id
            );
            HttpResponse::Forbidden().json(ApiResponse {
                success: false,
                message: "无权访问该资源".to_string(),
                data: None,
            })
        }
        Err(e) => {
            error!("[{}] 修改密码处理失败: {}", tx_id, e);
            internal_error()
        }
    }
}
