use actix_web::FromRequest;
use actix_web::{Error, HttpRequest, dev::Payload, web};
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use crate::auth::jwt::TokenVerifier;
use crate::cache::{CacheData, CacheTtl, keys};
use crate::db::users::find_or_create_from_auth;
use crate::error::AppError;
use crate::models::users::{self, CreateUserFromAuth, Roles};

/// The requester identity for a request, resolved from its bearer token.
///
/// Handlers that take this extractor reject unauthenticated requests with
/// 401. Wrapping it in `Option` makes authentication optional.
pub struct AuthenticatedUser(pub users::Model);

impl AuthenticatedUser {
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token from the Authorization header.
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    actix_web::error::ErrorUnauthorized("Missing Authorization header")
                })?;

            let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("Authorization header must be: Bearer <token>")
            })?;

            // 2. Validate the token.
            let verifier = req.app_data::<web::Data<TokenVerifier>>().ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("Token verifier not configured")
            })?;

            let claims = verifier
                .verify(token)
                .await
                .map_err(|e| actix_web::error::ErrorUnauthorized(format!("Invalid token: {e}")))?;

            let user_id = claims
                .user_id()
                .map_err(actix_web::error::ErrorUnauthorized)?;

            // 3. Cached user record, when Redis is configured.
            let cache = req.app_data::<web::Data<CacheData>>().cloned();
            let ttl = req
                .app_data::<web::Data<CacheTtl>>()
                .map(|t| t.user)
                .unwrap_or_else(|| CacheTtl::default().user);

            if let Some(cache) = &cache {
                match cache.get::<users::Model>(&keys::user(user_id)).await {
                    Ok(Some(user)) => return Ok(AuthenticatedUser(user)),
                    Ok(None) => {}
                    Err(e) => debug!(%user_id, error = %e, "user cache read failed"),
                }
            }

            let email = claims
                .user_email()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("No email in token claims"))?;

            // 4. Find or create the user.
            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("Database not configured")
                })?;

            let user = find_or_create_from_auth(
                db.get_ref(),
                CreateUserFromAuth {
                    id: user_id,
                    email,
                    display_name: claims.display_name(),
                    avatar_url: claims.avatar_url(),
                    auth_provider: "google".to_string(),
                    role: Roles::Client, // default role for new users
                },
            )
            .await
            .map_err(|e| Error::from(AppError::from(e)))?;

            if let Some(cache) = &cache {
                if let Err(e) = cache.set(&keys::user(user_id), &user, ttl).await {
                    debug!(%user_id, error = %e, "user cache write failed");
                }
            }

            Ok(AuthenticatedUser(user))
        })
    }
}
