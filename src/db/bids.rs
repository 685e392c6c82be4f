use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::bids::{self, BidChanges, BidStatus, NewBid};

/// Insert a new bid in the pending state.
///
/// The unique index on (gig_id, freelancer_id) rejects a second bid from the
/// same freelancer; callers translate that error into a conflict.
pub async fn insert_bid<C: ConnectionTrait>(db: &C, input: NewBid) -> Result<bids::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_bid = bids::ActiveModel {
        id: Set(Uuid::new_v4()),
        gig_id: Set(input.gig_id),
        freelancer_id: Set(input.freelancer_id),
        message: Set(input.message),
        proposed_price: Set(input.proposed_price),
        status: Set(BidStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_bid.insert(db).await
}

/// Fetch a single bid by ID.
pub async fn get_bid_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<bids::Model>, DbErr> {
    bids::Entity::find_by_id(id).one(db).await
}

/// Check whether a freelancer already bid on a gig.
pub async fn bid_exists_for_gig_and_freelancer<C: ConnectionTrait>(
    db: &C,
    gig_id: Uuid,
    freelancer_id: Uuid,
) -> Result<bool, DbErr> {
    let count = bids::Entity::find()
        .filter(bids::Column::GigId.eq(gig_id))
        .filter(bids::Column::FreelancerId.eq(freelancer_id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Fetch the bids on a gig, newest first.
pub async fn get_bids_by_gig<C: ConnectionTrait>(
    db: &C,
    gig_id: Uuid,
    include_rejected: bool,
) -> Result<Vec<bids::Model>, DbErr> {
    let mut query = bids::Entity::find().filter(bids::Column::GigId.eq(gig_id));

    if !include_rejected {
        query = query.filter(bids::Column::Status.ne(BidStatus::Rejected));
    }

    query
        .order_by_desc(bids::Column::CreatedAt)
        .order_by_desc(bids::Column::Id)
        .all(db)
        .await
}

/// Fetch the bids placed by a freelancer, newest first.
pub async fn get_bids_by_freelancer<C: ConnectionTrait>(
    db: &C,
    freelancer_id: Uuid,
    status: Option<BidStatus>,
) -> Result<Vec<bids::Model>, DbErr> {
    let mut query = bids::Entity::find().filter(bids::Column::FreelancerId.eq(freelancer_id));

    if let Some(status) = status {
        query = query.filter(bids::Column::Status.eq(status));
    }

    query
        .order_by_desc(bids::Column::CreatedAt)
        .order_by_desc(bids::Column::Id)
        .all(db)
        .await
}

/// Count the bids on a gig in a given status.
pub async fn count_bids_by_status<C: ConnectionTrait>(
    db: &C,
    gig_id: Uuid,
    status: BidStatus,
) -> Result<u64, DbErr> {
    bids::Entity::find()
        .filter(bids::Column::GigId.eq(gig_id))
        .filter(bids::Column::Status.eq(status))
        .count(db)
        .await
}

/// Apply changes to a bid only while it is still pending.
pub async fn update_pending_bid<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    changes: BidChanges,
) -> Result<u64, DbErr> {
    let mut update = bids::Entity::update_many()
        .col_expr(bids::Column::UpdatedAt, Expr::value(chrono::Utc::now()));

    if let Some(message) = changes.message {
        update = update.col_expr(bids::Column::Message, Expr::value(message));
    }
    if let Some(price) = changes.proposed_price {
        update = update.col_expr(bids::Column::ProposedPrice, Expr::value(price));
    }

    let result = update
        .filter(bids::Column::Id.eq(id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Compare-and-set pending -> `status` for one bid.
pub async fn transition_pending_bid<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    status: BidStatus,
) -> Result<u64, DbErr> {
    let result = bids::Entity::update_many()
        .col_expr(bids::Column::Status, Expr::value(status))
        .col_expr(bids::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(bids::Column::Id.eq(id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Reject every pending bid on a gig except the winner, in one statement.
/// Bids that are already rejected are not touched and not counted.
pub async fn reject_competing_bids<C: ConnectionTrait>(
    db: &C,
    gig_id: Uuid,
    winning_bid_id: Uuid,
    rejected: BidStatus,
) -> Result<u64, DbErr> {
    let result = bids::Entity::update_many()
        .col_expr(bids::Column::Status, Expr::value(rejected))
        .col_expr(bids::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(bids::Column::GigId.eq(gig_id))
        .filter(bids::Column::Id.ne(winning_bid_id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete a bid unless it has been hired.
pub async fn delete_unhired_bid<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
    let result = bids::Entity::delete_many()
        .filter(bids::Column::Id.eq(id))
        .filter(bids::Column::Status.ne(BidStatus::Hired))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete every bid on a gig.
pub async fn delete_bids_for_gig<C: ConnectionTrait>(db: &C, gig_id: Uuid) -> Result<u64, DbErr> {
    let result = bids::Entity::delete_many()
        .filter(bids::Column::GigId.eq(gig_id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
