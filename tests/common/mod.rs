//! Shared fixtures for the integration tests: an in-memory SQLite database
//! with migrations applied, user and gig factories, and notification
//! transports that record or refuse deliveries.
#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use gigmarket_backend::db::{gigs as gig_db, users as user_db};
use gigmarket_backend::models::bids::{BidView, SubmitBid};
use gigmarket_backend::models::gigs::{self, NewGig};
use gigmarket_backend::models::users::{self, CreateUserFromAuth, Roles};
use gigmarket_backend::notify::protocol::ServerEvent;
use gigmarket_backend::notify::{DeliveryError, Dispatcher, NotificationTransport};
use gigmarket_backend::services::bids as bid_service;
use migration::{Migrator, MigratorTrait};

pub const HIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fresh database per test. One connection, so the in-memory database is
/// shared by every query and concurrent transactions serialize.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, name: &str) -> users::Model {
    let id = Uuid::new_v4();
    user_db::find_or_create_from_auth(
        db,
        CreateUserFromAuth {
            id,
            email: format!("{name}-{id}@example.com"),
            display_name: Some(name.to_string()),
            avatar_url: None,
            auth_provider: "google".to_string(),
            role: Roles::Client,
        },
    )
    .await
    .expect("create user")
}

pub async fn create_gig(db: &DatabaseConnection, owner_id: Uuid, title: &str) -> gigs::Model {
    gig_db::insert_gig(
        db,
        NewGig {
            title: title.to_string(),
            description: "A reasonably detailed description of the work".to_string(),
            budget: 500.0,
        },
        owner_id,
    )
    .await
    .expect("create gig")
}

pub async fn place_bid(
    db: &DatabaseConnection,
    dispatcher: &Dispatcher,
    gig_id: Uuid,
    freelancer_id: Uuid,
    price: f64,
) -> BidView {
    bid_service::submit_bid(
        db,
        dispatcher,
        freelancer_id,
        SubmitBid {
            gig_id: Some(gig_id),
            message: Some("I can deliver this within a week".to_string()),
            proposed_price: Some(json!(price)),
        },
    )
    .await
    .expect("place bid")
}

/// Forwards every delivery to a channel the test can await.
pub struct RecordingTransport {
    sent: mpsc::UnboundedSender<(Uuid, ServerEvent)>,
}

impl NotificationTransport for RecordingTransport {
    async fn deliver(&self, user_id: Uuid, event: ServerEvent) -> Result<usize, DeliveryError> {
        let _ = self.sent.send((user_id, event));
        Ok(1)
    }
}

pub fn recording_dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<(Uuid, ServerEvent)>) {
    let (sent, rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::spawn(Arc::new(RecordingTransport { sent }));
    (dispatcher, rx)
}

/// A transport that is always down.
pub struct FailingTransport;

impl NotificationTransport for FailingTransport {
    async fn deliver(&self, _user_id: Uuid, _event: ServerEvent) -> Result<usize, DeliveryError> {
        Err(DeliveryError::Unavailable("socket closed".to_string()))
    }
}

pub fn failing_dispatcher() -> Dispatcher {
    Dispatcher::spawn(Arc::new(FailingTransport))
}

/// Next recorded delivery, or `None` if nothing arrives within a second.
pub async fn next_delivery(
    rx: &mut mpsc::UnboundedReceiver<(Uuid, ServerEvent)>,
) -> Option<(Uuid, ServerEvent)> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .flatten()
}
