use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::users::UserSummary;

pub const ALREADY_ASSIGNED: &str = "This gig has already been assigned to another freelancer";

/// Gig status stored as a lowercase string in the database.
///
/// `Open` is the only state that accepts bids or edits; `Assigned` is
/// terminal and only reachable through a hire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum GigStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "assigned")]
    Assigned,
}

impl GigStatus {
    /// open -> assigned. A second assignment is a conflict, never a no-op.
    pub fn assign(self) -> Result<GigStatus, AppError> {
        match self {
            Self::Open => Ok(Self::Assigned),
            Self::Assigned => Err(AppError::conflict(ALREADY_ASSIGNED)),
        }
    }

    /// Title, description and budget can change, and the gig can be
    /// deleted, only while open.
    pub fn ensure_mutable(self) -> Result<(), AppError> {
        match self {
            Self::Open => Ok(()),
            Self::Assigned => Err(AppError::validation(
                "This gig has been assigned and can no longer be modified",
            )),
        }
    }

    pub fn ensure_accepting_bids(self) -> Result<(), AppError> {
        match self {
            Self::Open => Ok(()),
            Self::Assigned => Err(AppError::validation(
                "This gig is no longer accepting bids. It has been assigned",
            )),
        }
    }

    pub fn parse_filter(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(Self::Open),
            "assigned" => Some(Self::Assigned),
            _ => None,
        }
    }
}

/// SeaORM entity for the `gigs` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gigs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Double")]
    pub budget: f64,
    pub owner_id: Uuid,
    pub status: GigStatus,
    pub hired_freelancer_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bids::Entity")]
    Bids,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
}

impl Related<super::bids::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

// ── DTOs ──

/// Validated input for a new gig.
#[derive(Debug, Clone)]
pub struct NewGig {
    pub title: String,
    pub description: String,
    pub budget: f64,
}

/// Request body for `POST /api/gigs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<serde_json::Value>,
}

/// Request body for `PATCH /api/gigs/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<serde_json::Value>,
}

/// Validated partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct GigChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GigListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl GigListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// The slice of a gig embedded in bid responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub status: GigStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummary>,
}

impl GigSummary {
    pub fn from_model(gig: &Model, owner: Option<UserSummary>) -> Self {
        Self {
            id: gig.id,
            title: gig.title.clone(),
            description: gig.description.clone(),
            budget: gig.budget,
            status: gig.status,
            owner,
        }
    }
}

/// A gig together with its owner's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct GigView {
    #[serde(flatten)]
    pub gig: Model,
    pub owner: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hired_freelancer: Option<UserSummary>,
}

/// Response for `GET /api/gigs/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct GigDetail {
    #[serde(flatten)]
    pub gig: Model,
    pub bid_count: u64,
    pub user_has_bid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_gigs: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GigPage {
    pub gigs: Vec<GigView>,
    pub pagination: Pagination,
}
