use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{self, CacheData};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::bids::{EditBid, GigBidsQuery, MyBidsQuery, SubmitBid};
use crate::notify::Dispatcher;
use crate::services::{bids as bid_service, hire};

/// POST /api/bids: bid on an open gig.
pub async fn submit_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    dispatcher: web::Data<Dispatcher>,
    body: web::Json<SubmitBid>,
) -> Result<HttpResponse, AppError> {
    let bid =
        bid_service::submit_bid(db.get_ref(), &dispatcher, user.id(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(bid))
}

/// GET /api/bids/my-bids: the requester's own bids.
pub async fn my_bids(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<MyBidsQuery>,
) -> Result<HttpResponse, AppError> {
    let bids = bid_service::list_my_bids(db.get_ref(), user.id(), query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(bids))
}

/// GET /api/bids/gig/{gig_id}: bids on one of the requester's gigs.
pub async fn bids_for_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    query: web::Query<GigBidsQuery>,
) -> Result<HttpResponse, AppError> {
    let listing = bid_service::list_bids_for_gig(
        db.get_ref(),
        path.into_inner(),
        user.id(),
        query.include_rejected.unwrap_or(false),
    )
    .await?;
    Ok(HttpResponse::Ok().json(listing))
}

/// PATCH /api/bids/{id}: edit a pending bid.
pub async fn update_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<EditBid>,
) -> Result<HttpResponse, AppError> {
    let bid =
        bid_service::edit_bid(db.get_ref(), path.into_inner(), user.id(), body.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(bid))
}

/// DELETE /api/bids/{id}: withdraw a bid that has not been hired.
pub async fn withdraw_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    bid_service::withdraw_bid(db.get_ref(), path.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Bid withdrawn successfully",
    })))
}

/// PATCH /api/bids/{id}/hire: hire the freelancer behind a bid.
pub async fn hire_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    dispatcher: web::Data<Dispatcher>,
    config: web::Data<AppConfig>,
    cache: Option<web::Data<CacheData>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let outcome = hire::hire_bid(
        db.get_ref(),
        &dispatcher,
        path.into_inner(),
        user.id(),
        config.hire_timeout,
    )
    .await?;

    cache::invalidate_gig(cache.as_ref().map(|c| c.get_ref()), outcome.gig.id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Freelancer hired successfully",
        "bid": outcome.bid,
        "gig": outcome.gig,
        "rejected_count": outcome.rejected_count,
    })))
}
