use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{CacheData, keys};
use crate::db::users;
use crate::error::AppError;
use crate::models::users::{CompleteProfile, UserResponse};

/// GET /api/auth/me: return the currently authenticated user's profile.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(user.0))
}

/// POST /api/auth/complete-profile: set username, role, display_name after first login.
pub async fn complete_profile(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: Option<web::Data<CacheData>>,
    body: web::Json<CompleteProfile>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.id();
    let updated = users::complete_profile(db.get_ref(), user_id, body.into_inner())
        .await
        .map_err(|e| AppError::from_db_with_conflict(e, "That username is already taken"))?;

    // The extractor would otherwise keep serving the old record.
    if let Some(cache) = cache {
        cache.invalidate(&keys::user(user_id)).await;
    }

    info!(%user_id, "profile completed");
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}
