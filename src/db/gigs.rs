use sea_orm::prelude::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::gigs::{self, GigChanges, GigStatus, NewGig};

/// Insert a new gig in the open state.
pub async fn insert_gig<C: ConnectionTrait>(
    db: &C,
    input: NewGig,
    owner_id: Uuid,
) -> Result<gigs::Model, DbErr> {
    let now = chrono::Utc::now();
    let new_gig = gigs::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title),
        description: Set(input.description),
        budget: Set(input.budget),
        owner_id: Set(owner_id),
        status: Set(GigStatus::Open),
        hired_freelancer_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_gig.insert(db).await
}

/// Fetch a single gig by ID.
pub async fn get_gig_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<gigs::Model>, DbErr> {
    gigs::Entity::find_by_id(id).one(db).await
}

/// Read a gig under a shared row lock, so a concurrent hire cannot assign it
/// until the caller's transaction ends. SQLite has no row locks and runs
/// the plain select.
pub async fn get_gig_for_share<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<gigs::Model>, DbErr> {
    gigs::Entity::find_by_id(id).lock_shared().one(db).await
}

/// Lock a gig row for writing if it is still open. `None` when the gig is
/// missing or already assigned.
pub async fn lock_open_gig<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<gigs::Model>, DbErr> {
    gigs::Entity::find_by_id(id)
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .lock_exclusive()
        .one(db)
        .await
}

/// Fetch many gigs in one query and return an id -> gig map.
pub async fn get_gigs_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, gigs::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = gigs::Entity::find()
        .filter(gigs::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|g| (g.id, g)).collect())
}

/// Fetch one page of open gigs, newest first, optionally filtered by a
/// substring of the title or description. Returns the page and the total
/// number of matching gigs.
pub async fn get_open_gigs_page<C: ConnectionTrait>(
    db: &C,
    search: Option<&str>,
    page: u64,
    limit: u64,
) -> Result<(Vec<gigs::Model>, u64), DbErr> {
    let mut query = gigs::Entity::find().filter(gigs::Column::Status.eq(GigStatus::Open));

    if let Some(term) = search {
        query = query.filter(
            Condition::any()
                .add(gigs::Column::Title.contains(term))
                .add(gigs::Column::Description.contains(term)),
        );
    }

    let paginator = query
        .order_by_desc(gigs::Column::CreatedAt)
        .order_by_desc(gigs::Column::Id)
        .paginate(db, limit);

    let total = paginator.num_items().await?;
    let gigs = paginator.fetch_page(page.saturating_sub(1)).await?;

    Ok((gigs, total))
}

/// Fetch all gigs posted by an owner, newest first.
pub async fn get_gigs_by_owner<C: ConnectionTrait>(
    db: &C,
    owner_id: Uuid,
    status: Option<GigStatus>,
) -> Result<Vec<gigs::Model>, DbErr> {
    let mut query = gigs::Entity::find().filter(gigs::Column::OwnerId.eq(owner_id));

    if let Some(status) = status {
        query = query.filter(gigs::Column::Status.eq(status));
    }

    query
        .order_by_desc(gigs::Column::CreatedAt)
        .order_by_desc(gigs::Column::Id)
        .all(db)
        .await
}

/// Apply changes to a gig only if it is still open. Returns the number of
/// rows written (0 when the gig is missing or no longer open).
pub async fn update_open_gig<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    changes: GigChanges,
) -> Result<u64, DbErr> {
    let mut update = gigs::Entity::update_many()
        .col_expr(gigs::Column::UpdatedAt, Expr::value(chrono::Utc::now()));

    if let Some(title) = changes.title {
        update = update.col_expr(gigs::Column::Title, Expr::value(title));
    }
    if let Some(description) = changes.description {
        update = update.col_expr(gigs::Column::Description, Expr::value(description));
    }
    if let Some(budget) = changes.budget {
        update = update.col_expr(gigs::Column::Budget, Expr::value(budget));
    }

    let result = update
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Compare-and-set open -> assigned. Returns 0 if another writer got there
/// first, so the caller can refuse the hire instead of overwriting it.
pub async fn assign_open_gig<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    freelancer_id: Uuid,
) -> Result<u64, DbErr> {
    let result = gigs::Entity::update_many()
        .col_expr(gigs::Column::Status, Expr::value(GigStatus::Assigned))
        .col_expr(gigs::Column::HiredFreelancerId, Expr::value(freelancer_id))
        .col_expr(gigs::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete a gig only if it is still open.
pub async fn delete_open_gig<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
    let result = gigs::Entity::delete_many()
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
