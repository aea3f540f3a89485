use crate::config::AppConfig;
use crate::error::ApiError;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::http::Method;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, ResponseError};
use futures::future::{ok, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Claims carried by a valid token, stored in the request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    pub exp: usize,
}

/// Rejects unsafe requests (anything but GET, HEAD and OPTIONS) that do not
/// carry a valid `Authorization: Bearer <jwt>` header.
pub struct RequireAuth;

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireAuthService {
            service: Rc::new(service),
        })
    }
}

pub struct RequireAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if is_safe(req.method()) {
                return service.call(req).await.map(|res| res.map_into_left_body());
            }

            let claims = req
                .app_data::<Data<AppConfig>>()
                .ok_or(AuthError::Unconfigured)
                .and_then(|config| {
                    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
                    verify_token(token, &config.jwt_secret)
                });

            match claims {
                Ok(claims) => {
                    log::debug!(
                        "Authorized {} {} for {:?} ({:?})",
                        req.method(),
                        req.path(),
                        claims.user_id,
                        claims.email
                    );
                    req.extensions_mut().insert(claims);
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
                Err(err) => {
                    log::warn!("Auth failed for {} {}: {}", req.method(), req.path(), err);
                    let response = ApiError::Unauthorized.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum AuthError {
    #[error("no bearer token")]
    MissingToken,

    #[error("no application config registered")]
    Unconfigured,

    #[error(transparent)]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp: usize) -> String {
        let claims = Claims {
            email: Some("a@b.c".to_owned()),
            user_id: Some("42".to_owned()),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn accepts_a_token_signed_with_the_secret() {
        let claims = verify_token(&token("secret", in_one_hour()), "secret").unwrap();
        assert_eq!(claims.user_id.as_deref(), Some("42"));
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        assert!(verify_token(&token("other", in_one_hour()), "secret").is_err());

        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        assert!(verify_token(&token("secret", expired), "secret").is_err());
        assert!(verify_token("not-a-jwt", "secret").is_err());
    }

    #[test]
    fn only_unsafe_methods_need_auth() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::PATCH));
        assert!(!is_safe(&Method::DELETE));
    }
}
