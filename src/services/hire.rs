//! The hire transaction.
//!
//! A hire moves the gig open -> assigned, the chosen bid pending -> hired
//! and every other pending bid of the gig pending -> rejected, all in one
//! database transaction. Either all three writes commit or none do.
//!
//! The status reads at the top give precise errors. The writes are
//! compare-and-set updates (`WHERE status = ...`) whose row counts are
//! checked, so two concurrent hires on one gig cannot both commit even
//! under READ COMMITTED: the second blocks on the gig row, then matches
//! zero rows and aborts with a conflict.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{bids as bid_db, gigs as gig_db};
use crate::error::{AppError, AppResult};
use crate::models::bids::{self, BidStatus, BidView};
use crate::models::gigs::{self, GigSummary};
use crate::notify::Dispatcher;
use crate::notify::protocol::ServerEvent;
use crate::services::bids::bid_view;

/// Result of a committed hire.
#[derive(Debug, Clone, Serialize)]
pub struct HireOutcome {
    pub bid: BidView,
    pub gig: gigs::Model,
    /// Pending bids rejected by this hire. Bids already rejected before the
    /// hire are not counted.
    pub rejected_count: u64,
}

/// Rows as they stand just before commit.
struct Committed {
    bid: bids::Model,
    gig: gigs::Model,
    rejected_count: u64,
}

/// Hire the freelancer behind `bid_id`. Only the gig owner may do this, and
/// only once per gig.
///
/// The transaction is bounded by `timeout`. When it elapses the in-flight
/// transaction is dropped, which rolls it back, and a retryable
/// `AppError::Transient` is returned.
pub async fn hire_bid(
    db: &DatabaseConnection,
    dispatcher: &Dispatcher,
    bid_id: Uuid,
    requester_id: Uuid,
    timeout: Duration,
) -> AppResult<HireOutcome> {
    let committed = match tokio::time::timeout(timeout, run_transaction(db, bid_id, requester_id))
        .await
    {
        Ok(result) => result?,
        Err(_) => {
            warn!(%bid_id, ?timeout, "hire timed out, transaction rolled back");
            return Err(AppError::transient(
                "Hiring took too long and was rolled back. Please try again.",
            ));
        }
    };

    let Committed {
        bid,
        gig,
        rejected_count,
    } = committed;

    info!(
        %bid_id,
        gig_id = %gig.id,
        freelancer_id = %bid.freelancer_id,
        rejected_count,
        "freelancer hired"
    );

    // Post-commit and fire-and-forget: nothing below can undo the hire.
    dispatcher.notify(
        bid.freelancer_id,
        ServerEvent::bid_hired(gig.id, &gig.title, bid.id),
    );

    let bid = match bid_view(db, bid.clone(), Some(&gig)).await {
        Ok(view) => view,
        Err(e) => {
            warn!(%bid_id, error = %e, "could not load bid details after hire");
            BidView {
                bid,
                freelancer: None,
                gig: Some(GigSummary::from_model(&gig, None)),
            }
        }
    };

    Ok(HireOutcome {
        bid,
        gig,
        rejected_count,
    })
}

async fn run_transaction(
    db: &DatabaseConnection,
    bid_id: Uuid,
    requester_id: Uuid,
) -> AppResult<Committed> {
    let txn = db.begin().await?;

    match apply_hire(&txn, bid_id, requester_id).await {
        Ok(committed) => {
            txn.commit().await?;
            Ok(committed)
        }
        Err(err) => {
            if let Err(e) = txn.rollback().await {
                warn!(%bid_id, error = %e, "rollback after failed hire returned an error");
            }
            debug!(%bid_id, kind = err.kind(), error = %err, "hire aborted");
            Err(err)
        }
    }
}

async fn apply_hire(
    txn: &DatabaseTransaction,
    bid_id: Uuid,
    requester_id: Uuid,
) -> AppResult<Committed> {
    let bid = bid_db::get_bid_by_id(txn, bid_id)
        .await?
        .ok_or_else(|| AppError::not_found("Bid not found"))?;

    let gig = gig_db::get_gig_by_id(txn, bid.gig_id)
        .await?
        .ok_or_else(|| AppError::not_found("Gig not found"))?;

    if !gig.is_owner(requester_id) {
        return Err(AppError::authorization(
            "You are not authorized to hire for this gig",
        ));
    }

    // Gig first: a repeated hire on an assigned gig is a conflict even if
    // the bid itself was rejected by the first one.
    gig.status.assign()?;
    let hired = bid.status.hire()?;
    let rejected = BidStatus::Pending.reject()?;

    if gig_db::assign_open_gig(txn, gig.id, bid.freelancer_id).await? != 1 {
        return Err(AppError::conflict(gigs::ALREADY_ASSIGNED));
    }

    if bid_db::transition_pending_bid(txn, bid.id, hired).await? != 1 {
        return Err(AppError::validation(
            "Cannot hire this bid. It is no longer pending",
        ));
    }

    let rejected_count = bid_db::reject_competing_bids(txn, gig.id, bid.id, rejected).await?;

    let bid = bid_db::get_bid_by_id(txn, bid.id)
        .await?
        .ok_or_else(|| AppError::transient("Hired bid disappeared before commit"))?;
    let gig = gig_db::get_gig_by_id(txn, gig.id)
        .await?
        .ok_or_else(|| AppError::transient("Assigned gig disappeared before commit"))?;

    Ok(Committed {
        bid,
        gig,
        rejected_count,
    })
}
