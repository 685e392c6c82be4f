use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use tracing::debug;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{self, CacheData, CacheTtl, keys};
use crate::error::AppError;
use crate::models::gigs::{self, CreateGig, GigListQuery, StatusQuery, UpdateGig};
use crate::services::gigs as gig_service;

/// GET /api/gigs: open gigs, paginated and searchable. Public.
pub async fn list_gigs(
    db: web::Data<DatabaseConnection>,
    query: web::Query<GigListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = gig_service::list_open_gigs(db.get_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/gigs/{id}: a single gig. Public; a signed-in viewer also learns
/// whether they have already bid.
pub async fn get_gig(
    viewer: Option<AuthenticatedUser>,
    db: web::Data<DatabaseConnection>,
    cache: Option<web::Data<CacheData>>,
    ttl: Option<web::Data<CacheTtl>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let gig_id = path.into_inner();
    let viewer_id = viewer.as_ref().map(AuthenticatedUser::id);

    let cached = match &cache {
        Some(cache) => match cache.get::<gigs::Model>(&keys::gig(gig_id)).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!(%gig_id, error = %e, "gig cache read failed");
                None
            }
        },
        None => None,
    };

    let gig = match cached {
        Some(gig) => gig,
        None => {
            let gig = gig_service::load_gig(db.get_ref(), gig_id).await?;
            if let Some(cache) = &cache {
                let ttl = ttl.map(|t| t.gig).unwrap_or_else(|| CacheTtl::default().gig);
                if let Err(e) = cache.set(&keys::gig(gig_id), &gig, ttl).await {
                    debug!(%gig_id, error = %e, "gig cache write failed");
                }
            }
            gig
        }
    };

    let detail = gig_service::describe_gig(db.get_ref(), gig, viewer_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/gigs: post a new gig.
pub async fn create_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateGig>,
) -> Result<HttpResponse, AppError> {
    let gig = gig_service::create_gig(db.get_ref(), user.id(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(gig))
}

/// GET /api/gigs/my-gigs: gigs posted by the requester.
pub async fn my_gigs(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
    let gigs =
        gig_service::list_my_gigs(db.get_ref(), user.id(), query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(gigs))
}

/// PATCH /api/gigs/{id}: edit an open gig.
pub async fn update_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: Option<web::Data<CacheData>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateGig>,
) -> Result<HttpResponse, AppError> {
    let gig_id = path.into_inner();
    let gig = gig_service::update_gig(db.get_ref(), gig_id, user.id(), body.into_inner()).await?;

    cache::invalidate_gig(cache.as_ref().map(|c| c.get_ref()), gig_id).await;
    Ok(HttpResponse::Ok().json(gig))
}

/// DELETE /api/gigs/{id}: delete an open gig and its bids.
pub async fn delete_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: Option<web::Data<CacheData>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let gig_id = path.into_inner();
    let removed_bids = gig_service::delete_gig(db.get_ref(), gig_id, user.id()).await?;

    cache::invalidate_gig(cache.as_ref().map(|c| c.get_ref()), gig_id).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Gig deleted successfully",
        "removed_bids": removed_bids,
    })))
}
