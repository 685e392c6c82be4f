//! Bid lifecycle: submit, edit, withdraw and the two listings.
//!
//! Status checks here are early rejections with good messages. The writes
//! themselves are conditional on the expected status, so a hire that lands
//! between the check and the write is never overwritten.

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{bids as bid_db, gigs as gig_db, users as user_db};
use crate::error::{AppError, AppResult};
use crate::models::bids::{
    self, BidChanges, BidStatus, BidView, EditBid, GigBids, GigHeader, NewBid, SubmitBid,
};
use crate::models::gigs::{self, GigSummary};
use crate::models::users::UserSummary;
use crate::notify::Dispatcher;
use crate::notify::protocol::ServerEvent;
use crate::services::validation;

pub const DUPLICATE_BID: &str = "You have already placed a bid on this gig";

/// Submit a bid on an open gig.
pub async fn submit_bid(
    db: &DatabaseConnection,
    dispatcher: &Dispatcher,
    freelancer_id: Uuid,
    input: SubmitBid,
) -> AppResult<BidView> {
    let (gig_id, message, raw_price) = match (input.gig_id, input.message, input.proposed_price) {
        (Some(gig_id), Some(message), Some(price)) if !message.trim().is_empty() => {
            (gig_id, message, price)
        }
        _ => {
            return Err(AppError::validation(
                "Please provide gig, message and proposed price",
            ));
        }
    };

    let proposed_price = validation::parse_amount(&raw_price, "Proposed price")?;
    let message = validation::bid_message(&message)?;

    let new_bid = NewBid {
        gig_id,
        freelancer_id,
        message,
        proposed_price,
    };

    // The gig stays share-locked until the insert commits, so a hire either
    // sees this bid and rejects it or finishes first and the read refuses it.
    let txn = db.begin().await?;
    let (bid, gig) = match insert_bid_on_open_gig(&txn, new_bid).await {
        Ok(placed) => placed,
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(%gig_id, error = %rollback_err, "rollback after refused bid returned an error");
            }
            return Err(e);
        }
    };
    txn.commit().await?;

    info!(bid_id = %bid.id, %gig_id, %freelancer_id, "bid submitted");

    let view = bid_view(db, bid, Some(&gig)).await?;

    dispatcher.notify(
        gig.owner_id,
        ServerEvent::BidReceived {
            gig_id: gig.id,
            gig_title: gig.title.clone(),
            bid_id: view.bid.id,
            freelancer_name: view.freelancer.as_ref().and_then(|f| f.name.clone()),
        },
    );

    Ok(view)
}

async fn insert_bid_on_open_gig<C: ConnectionTrait>(
    txn: &C,
    input: NewBid,
) -> AppResult<(bids::Model, gigs::Model)> {
    let gig = gig_db::get_gig_for_share(txn, input.gig_id)
        .await?
        .ok_or_else(|| AppError::not_found("Gig not found"))?;

    gig.status.ensure_accepting_bids()?;

    if gig.is_owner(input.freelancer_id) {
        return Err(AppError::validation("You cannot bid on your own gig"));
    }

    // Cheap early rejection; the unique index is what actually holds.
    if bid_db::bid_exists_for_gig_and_freelancer(txn, input.gig_id, input.freelancer_id).await? {
        return Err(AppError::conflict(DUPLICATE_BID));
    }

    let bid = bid_db::insert_bid(txn, input)
        .await
        .map_err(|e| AppError::from_db_with_conflict(e, DUPLICATE_BID))?;

    Ok((bid, gig))
}

/// Edit the message and/or price of one's own pending bid.
pub async fn edit_bid(
    db: &DatabaseConnection,
    bid_id: Uuid,
    requester_id: Uuid,
    input: EditBid,
) -> AppResult<BidView> {
    let bid = load_own_bid(db, bid_id, requester_id, "update").await?;
    bid.status.ensure_editable()?;

    let changes = BidChanges {
        message: input
            .message
            .as_deref()
            .map(validation::bid_message)
            .transpose()?,
        proposed_price: input
            .proposed_price
            .as_ref()
            .map(|p| validation::parse_amount(p, "Proposed price"))
            .transpose()?,
    };

    if bid_db::update_pending_bid(db, bid_id, changes).await? == 0 {
        return Err(lost_race(db, bid_id, BidStatus::ensure_editable).await);
    }

    let updated = bid_db::get_bid_by_id(db, bid_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bid not found"))?;

    info!(%bid_id, "bid updated");
    bid_view(db, updated, None).await
}

/// Withdraw (delete) one's own bid. Pending and rejected bids can go; a
/// hired bid stays.
pub async fn withdraw_bid(
    db: &DatabaseConnection,
    bid_id: Uuid,
    requester_id: Uuid,
) -> AppResult<()> {
    let bid = load_own_bid(db, bid_id, requester_id, "delete").await?;
    bid.status.ensure_withdrawable()?;

    if bid_db::delete_unhired_bid(db, bid_id).await? == 0 {
        return Err(lost_race(db, bid_id, BidStatus::ensure_withdrawable).await);
    }

    info!(%bid_id, gig_id = %bid.gig_id, "bid withdrawn");
    Ok(())
}

/// All bids on a gig, for its owner only.
pub async fn list_bids_for_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
    requester_id: Uuid,
    include_rejected: bool,
) -> AppResult<GigBids> {
    let gig = gig_db::get_gig_by_id(db, gig_id)
        .await?
        .ok_or_else(|| AppError::not_found("Gig not found"))?;

    if !gig.is_owner(requester_id) {
        return Err(AppError::authorization(
            "You are not authorized to view bids for this gig",
        ));
    }

    let rows = bid_db::get_bids_by_gig(db, gig_id, include_rejected).await?;
    let freelancers =
        user_db::get_users_by_ids(db, rows.iter().map(|b| b.freelancer_id).collect()).await?;

    let bids = rows
        .into_iter()
        .map(|bid| BidView {
            freelancer: freelancers.get(&bid.freelancer_id).map(UserSummary::from),
            gig: None,
            bid,
        })
        .collect();

    Ok(GigBids {
        bids,
        gig: GigHeader {
            id: gig.id,
            title: gig.title,
            status: gig.status,
        },
    })
}

/// The requester's own bids, each with its gig and the gig owner attached.
/// An unrecognised status filter is ignored.
pub async fn list_my_bids(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
    status_filter: Option<&str>,
) -> AppResult<Vec<BidView>> {
    let status = status_filter.and_then(BidStatus::parse_filter);
    let rows = bid_db::get_bids_by_freelancer(db, freelancer_id, status).await?;

    let gigs = gig_db::get_gigs_by_ids(db, rows.iter().map(|b| b.gig_id).collect()).await?;
    let owners =
        user_db::get_users_by_ids(db, gigs.values().map(|g| g.owner_id).collect()).await?;

    Ok(rows
        .into_iter()
        .map(|bid| {
            let gig = gigs.get(&bid.gig_id).map(|g| {
                GigSummary::from_model(g, owners.get(&g.owner_id).map(UserSummary::from))
            });
            BidView {
                bid,
                freelancer: None,
                gig,
            }
        })
        .collect())
}

/// Attach the freelancer's profile and the gig summary to a bid.
pub async fn bid_view<C: ConnectionTrait>(
    db: &C,
    bid: bids::Model,
    gig: Option<&gigs::Model>,
) -> AppResult<BidView> {
    let freelancer = user_db::get_user_by_id(db, bid.freelancer_id)
        .await?
        .as_ref()
        .map(UserSummary::from);

    let gig = match gig {
        Some(gig) => Some(GigSummary::from_model(gig, None)),
        None => gig_db::get_gig_by_id(db, bid.gig_id)
            .await?
            .map(|g| GigSummary::from_model(&g, None)),
    };

    Ok(BidView {
        bid,
        freelancer,
        gig,
    })
}

async fn load_own_bid(
    db: &DatabaseConnection,
    bid_id: Uuid,
    requester_id: Uuid,
    action: &str,
) -> AppResult<bids::Model> {
    let bid = bid_db::get_bid_by_id(db, bid_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bid not found"))?;

    if !bid.is_author(requester_id) {
        return Err(AppError::authorization(format!(
            "You are not authorized to {action} this bid"
        )));
    }

    Ok(bid)
}

/// A conditional write touched no row: explain why from the current state.
async fn lost_race(
    db: &DatabaseConnection,
    bid_id: Uuid,
    guard: fn(BidStatus) -> Result<(), AppError>,
) -> AppError {
    match bid_db::get_bid_by_id(db, bid_id).await {
        Ok(None) => AppError::not_found("Bid not found"),
        Ok(Some(current)) => guard(current.status)
            .err()
            .unwrap_or_else(|| AppError::transient("Bid changed concurrently, please retry")),
        Err(e) => AppError::from(e),
    }
}
