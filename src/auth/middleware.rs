use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;
use std::sync::Arc;

use super::extractors::AuthenticatedUser;
use super::token::TokenIssuer;
use crate::error::AppError;

/// Routes reachable without a token.
const PUBLIC_PATHS: &[&str] = &["/health", "/api/auth/login", "/api/auth/register"];

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token on every non-public request and binds the
/// caller's [`AuthenticatedUser`] to the request extensions.
///
/// Any verification failure ends the request with a 401; the precise reason is
/// only logged.
pub struct AuthMiddleware {
    tokens: Arc<TokenIssuer>,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<TokenIssuer>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Arc<TokenIssuer>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if PUBLIC_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let verified = match bearer_token(req.headers()) {
            Some(token) => self.tokens.verify(token).map_err(|e| {
                debug!("Rejected token on {} {}: {}", req.method(), req.path(), e);
                AppError::from(e)
            }),
            None => Err(AppError::Unauthorized("Missing token".into())),
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(AuthenticatedUser::from(claims));
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                let response = req
                    .into_response(err.error_response())
                    .map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new("middleware_test_secret", Duration::hours(1)).unwrap())
    }

    #[actix_rt::test]
    async fn test_gate_binds_identity() {
        let tokens = issuer();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens.clone()))
                .route("/api/whoami", web::get().to(whoami)),
        )
        .await;

        let token = tokens.issue(Uuid::new_v4(), "alice", Role::User).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "alice");
    }

    #[actix_rt::test]
    async fn test_gate_rejects_uniformly() {
        let tokens = issuer();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(tokens.clone()))
                .route("/api/whoami", web::get().to(whoami)),
        )
        .await;

        let expired = tokens
            .issue_at(
                Uuid::new_v4(),
                "alice",
                Role::User,
                Utc::now() - Duration::hours(2),
            )
            .unwrap();
        let foreign = TokenIssuer::new("another_secret", Duration::hours(1))
            .unwrap()
            .issue(Uuid::new_v4(), "alice", Role::User)
            .unwrap();

        let mut bodies = Vec::new();
        for header in [
            format!("Bearer {}", expired),
            format!("Bearer {}", foreign),
            "Bearer garbage".to_string(),
        ] {
            let req = test::TestRequest::get()
                .uri("/api/whoami")
                .insert_header(("Authorization", header))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            bodies.push(test::read_body(resp).await);
        }
        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

        let req = test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_public_paths_skip_gate() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(issuer()))
                .route(
                    "/api/auth/login",
                    web::post().to(|| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/auth/login").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
