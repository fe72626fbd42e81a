use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use std::sync::Arc;

use super::jwt::TokenManager;
use super::ownership::check_ownership;

/// 认证中间件：校验 Bearer token，路由中带 user_id 参数时
/// 额外做资源所有权校验
#[derive(Clone)]
pub struct AuthMiddleware {
    token_manager: Arc<TokenManager>,
}

impl AuthMiddleware {
    pub fn new(token_manager: Arc<TokenManager>) -> Self {
        Self { token_manager }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            token_manager: self.token_manager.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    token_manager: Arc<TokenManager>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token_manager = self.token_manager.clone();
        let service = self.service.clone();

        Box::pin(async move {
            // 从请求头中获取 token
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .unwrap_or("");

            if token.is_empty() {
                warn!("未提供认证 token");
                return Err(ErrorUnauthorized("未提供认证 token"));
            }

            let claims = match token_manager.validate_token(token) {
                Ok(claims) => claims,
                Err(e) => {
                    warn!("Token 验证失败: {}", e);
                    return Err(ErrorUnauthorized("Token 验证失败"));
                }
            };

            // 路由带 user_id 参数时校验资源所有权
            if let Some(raw_id) = req.match_info().get("user_id") {
                let target_user_id = match raw_id.parse::<i32>() {
                    Ok(id) => id,
                    Err(_) => {
                        warn!("路径中的 user_id 无法解析: {}", raw_id);
                        return Err(ErrorForbidden("无权访问该资源"));
                    }
                };
                if !check_ownership(&claims, target_user_id) {
                    return Err(ErrorForbidden("无权访问该资源"));
                }
            }

            debug!("用户 {} 认证成功", claims.sub);

            // 将用户信息添加到请求扩展中
            let mut req = req;
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}
