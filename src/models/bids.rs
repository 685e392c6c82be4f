use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::gigs::GigSummary;
use crate::models::users::UserSummary;

/// Bid status stored as a lowercase string in the database.
///
/// `Pending` is the only live state. `Hired` and `Rejected` are terminal and
/// are only ever entered through a hire on the owning gig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "hired")]
    Hired,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl BidStatus {
    /// pending -> hired.
    pub fn hire(self) -> Result<BidStatus, AppError> {
        match self {
            Self::Pending => Ok(Self::Hired),
            other => Err(AppError::validation(format!(
                "Cannot hire this bid. Current status: {}",
                other.as_str()
            ))),
        }
    }

    /// pending -> rejected.
    pub fn reject(self) -> Result<BidStatus, AppError> {
        match self {
            Self::Pending => Ok(Self::Rejected),
            other => Err(AppError::validation(format!(
                "Cannot reject a {} bid",
                other.as_str()
            ))),
        }
    }

    pub fn ensure_editable(self) -> Result<(), AppError> {
        match self {
            Self::Pending => Ok(()),
            other => Err(AppError::validation(format!(
                "Cannot update a {} bid. Only pending bids can be modified.",
                other.as_str()
            ))),
        }
    }

    pub fn ensure_withdrawable(self) -> Result<(), AppError> {
        match self {
            Self::Hired => Err(AppError::validation(
                "Cannot withdraw a hired bid. Please contact the gig owner.",
            )),
            Self::Pending | Self::Rejected => Ok(()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse_filter(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "hired" => Some(Self::Hired),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// SeaORM entity for the `bids` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "Double")]
    pub proposed_price: f64,
    pub status: BidStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gigs::Entity",
        from = "Column::GigId",
        to = "super::gigs::Column::Id"
    )]
    Gig,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FreelancerId",
        to = "super::users::Column::Id"
    )]
    Freelancer,
}

impl Related<super::gigs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gig.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freelancer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_author(&self, user_id: Uuid) -> bool {
        self.freelancer_id == user_id
    }
}

// ── DTOs ──

/// Request body for `POST /api/bids`.
///
/// The price is kept as raw JSON so that numeric strings are accepted and
/// anything else is reported as a validation failure rather than a
/// deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitBid {
    pub gig_id: Option<Uuid>,
    pub message: Option<String>,
    pub proposed_price: Option<serde_json::Value>,
}

/// Request body for `PATCH /api/bids/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditBid {
    pub message: Option<String>,
    pub proposed_price: Option<serde_json::Value>,
}

/// Validated insert for the store.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub gig_id: Uuid,
    pub freelancer_id: Uuid,
    pub message: String,
    pub proposed_price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BidChanges {
    pub message: Option<String>,
    pub proposed_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GigBidsQuery {
    pub include_rejected: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MyBidsQuery {
    pub status: Option<String>,
}

/// A bid with the freelancer's profile and a summary of its gig attached.
#[derive(Debug, Clone, Serialize)]
pub struct BidView {
    #[serde(flatten)]
    pub bid: Model,
    pub freelancer: Option<UserSummary>,
    pub gig: Option<GigSummary>,
}

/// The gig fields shown alongside the owner's bid listing.
#[derive(Debug, Clone, Serialize)]
pub struct GigHeader {
    pub id: Uuid,
    pub title: String,
    pub status: super::gigs::GigStatus,
}

/// Response for `GET /api/bids/gig/{gig_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct GigBids {
    pub bids: Vec<BidView>,
    pub gig: GigHeader,
}
