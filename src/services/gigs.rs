//! Gig lifecycle outside of hiring: post, browse, edit and delete.

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{bids as bid_db, gigs as gig_db, users as user_db};
use crate::error::{AppError, AppResult};
use crate::models::bids::BidStatus;
use crate::models::gigs::{
    self, CreateGig, GigChanges, GigDetail, GigListQuery, GigPage, GigStatus, GigView, NewGig,
    Pagination, UpdateGig,
};
use crate::models::users::UserSummary;
use crate::services::validation;

/// Post a new gig owned by `owner_id`. New gigs always start open.
pub async fn create_gig(
    db: &DatabaseConnection,
    owner_id: Uuid,
    input: CreateGig,
) -> AppResult<GigView> {
    let (title, description, raw_budget) = match (input.title, input.description, input.budget) {
        (Some(title), Some(description), Some(budget)) => (title, description, budget),
        _ => {
            return Err(AppError::validation(
                "Please provide a title, description and budget",
            ));
        }
    };

    let new_gig = NewGig {
        title: validation::gig_title(&title)?,
        description: validation::gig_description(&description)?,
        budget: validation::parse_amount(&raw_budget, "Budget")?,
    };

    let gig = gig_db::insert_gig(db, new_gig, owner_id).await?;
    info!(gig_id = %gig.id, %owner_id, "gig created");

    gig_view(db, gig).await
}

/// A single gig with its pending-bid count. `user_has_bid` is only ever
/// true for an authenticated viewer who has bid on it.
pub async fn get_gig_detail(
    db: &DatabaseConnection,
    gig_id: Uuid,
    viewer_id: Option<Uuid>,
) -> AppResult<GigDetail> {
    let gig = load_gig(db, gig_id).await?;
    describe_gig(db, gig, viewer_id).await
}

/// Detail view for a gig row the caller already holds, e.g. from cache.
pub async fn describe_gig(
    db: &DatabaseConnection,
    gig: gigs::Model,
    viewer_id: Option<Uuid>,
) -> AppResult<GigDetail> {
    let gig_id = gig.id;
    let bid_count = bid_db::count_bids_by_status(db, gig_id, BidStatus::Pending).await?;
    let user_has_bid = match viewer_id {
        Some(viewer) => bid_db::bid_exists_for_gig_and_freelancer(db, gig_id, viewer).await?,
        None => false,
    };

    Ok(GigDetail {
        gig,
        bid_count,
        user_has_bid,
    })
}

/// Public marketplace listing: open gigs only, newest first.
pub async fn list_open_gigs(db: &DatabaseConnection, query: &GigListQuery) -> AppResult<GigPage> {
    let page = query.page();
    let limit = query.limit();

    let (rows, total) = gig_db::get_open_gigs_page(db, query.search_term(), page, limit).await?;
    let owners = user_db::get_users_by_ids(db, rows.iter().map(|g| g.owner_id).collect()).await?;

    let shown = (page - 1) * limit + rows.len() as u64;
    let gigs = rows
        .into_iter()
        .map(|gig| GigView {
            owner: owners.get(&gig.owner_id).map(UserSummary::from),
            hired_freelancer: None,
            gig,
        })
        .collect();

    Ok(GigPage {
        gigs,
        pagination: Pagination {
            current_page: page,
            total_pages: total.div_ceil(limit),
            total_gigs: total,
            has_more: shown < total,
        },
    })
}

/// Gigs posted by `owner_id`, with the hired freelancer attached where there
/// is one. An unrecognised status filter is ignored.
pub async fn list_my_gigs(
    db: &DatabaseConnection,
    owner_id: Uuid,
    status_filter: Option<&str>,
) -> AppResult<Vec<GigView>> {
    let status = status_filter.and_then(GigStatus::parse_filter);
    let rows = gig_db::get_gigs_by_owner(db, owner_id, status).await?;

    let mut user_ids: Vec<Uuid> = rows.iter().filter_map(|g| g.hired_freelancer_id).collect();
    user_ids.push(owner_id);
    let users = user_db::get_users_by_ids(db, user_ids).await?;

    Ok(rows
        .into_iter()
        .map(|gig| GigView {
            owner: users.get(&gig.owner_id).map(UserSummary::from),
            hired_freelancer: gig
                .hired_freelancer_id
                .and_then(|id| users.get(&id))
                .map(UserSummary::from),
            gig,
        })
        .collect())
}

/// Edit an open gig. Only the owner may, and never after assignment.
pub async fn update_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
    requester_id: Uuid,
    input: UpdateGig,
) -> AppResult<GigView> {
    let gig = load_owned_gig(db, gig_id, requester_id, "update").await?;
    gig.status.ensure_mutable()?;

    let changes = GigChanges {
        title: input
            .title
            .as_deref()
            .map(validation::gig_title)
            .transpose()?,
        description: input
            .description
            .as_deref()
            .map(validation::gig_description)
            .transpose()?,
        budget: input
            .budget
            .as_ref()
            .map(|b| validation::parse_amount(b, "Budget"))
            .transpose()?,
    };

    if gig_db::update_open_gig(db, gig_id, changes).await? == 0 {
        // Assigned (or deleted) between the read and the write.
        let current = load_gig(db, gig_id).await?;
        current.status.ensure_mutable()?;
        return Err(AppError::transient("Gig changed concurrently, please retry"));
    }

    let updated = load_gig(db, gig_id).await?;
    info!(%gig_id, "gig updated");
    gig_view(db, updated).await
}

/// Delete an open gig together with all of its bids. Returns the number of
/// bids removed.
pub async fn delete_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
    requester_id: Uuid,
) -> AppResult<u64> {
    let gig = load_owned_gig(db, gig_id, requester_id, "delete").await?;
    gig.status.ensure_mutable()?;

    let txn = db.begin().await?;

    // Gig row first, then its bids: the same lock order as a hire.
    if gig_db::lock_open_gig(&txn, gig_id).await?.is_none() {
        if let Err(e) = txn.rollback().await {
            warn!(%gig_id, error = %e, "rollback after failed gig delete returned an error");
        }
        return Err(AppError::validation(
            "This gig has been assigned and can no longer be modified",
        ));
    }

    let removed_bids = bid_db::delete_bids_for_gig(&txn, gig_id).await?;
    gig_db::delete_open_gig(&txn, gig_id).await?;

    txn.commit().await?;
    info!(%gig_id, removed_bids, "gig deleted");
    Ok(removed_bids)
}

async fn gig_view(db: &DatabaseConnection, gig: gigs::Model) -> AppResult<GigView> {
    let owner = user_db::get_user_by_id(db, gig.owner_id)
        .await?
        .as_ref()
        .map(UserSummary::from);

    let hired_freelancer = match gig.hired_freelancer_id {
        Some(id) => user_db::get_user_by_id(db, id)
            .await?
            .as_ref()
            .map(UserSummary::from),
        None => None,
    };

    Ok(GigView {
        gig,
        owner,
        hired_freelancer,
    })
}

pub async fn load_gig(db: &DatabaseConnection, gig_id: Uuid) -> AppResult<gigs::Model> {
    gig_db::get_gig_by_id(db, gig_id)
        .await?
        .ok_or_else(|| AppError::not_found("Gig not found"))
}

async fn load_owned_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
    requester_id: Uuid,
    action: &str,
) -> AppResult<gigs::Model> {
    let gig = load_gig(db, gig_id).await?;

    if !gig.is_owner(requester_id) {
        return Err(AppError::authorization(format!(
            "You are not authorized to {action} this gig"
        )));
    }

    Ok(gig)
}
