use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Client -> Server messages ──

/// Messages the client sends to the server over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Application-level keepalive.
    Ping,
}

// ── Server -> Client messages ──

/// Events pushed to a user's live connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The recipient's bid won the gig.
    BidHired {
        gig_id: Uuid,
        gig_title: String,
        bid_id: Uuid,
        message: String,
    },
    /// A freelancer bid on one of the recipient's gigs.
    BidReceived {
        gig_id: Uuid,
        gig_title: String,
        bid_id: Uuid,
        freelancer_name: Option<String>,
    },
    Pong,
    /// An error occurred.
    Error { message: String },
}

impl ServerEvent {
    pub fn bid_hired(gig_id: Uuid, gig_title: &str, bid_id: Uuid) -> Self {
        Self::BidHired {
            gig_id,
            gig_title: gig_title.to_string(),
            bid_id,
            message: format!("Congratulations! You have been hired for {gig_title}"),
        }
    }
}
