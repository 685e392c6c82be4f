//! Integration tests for the bid lifecycle.
//!
//! Run with: `cargo test --test bids_test`
mod common;

use serde_json::json;
use uuid::Uuid;

use gigmarket_backend::db::bids as bid_db;
use gigmarket_backend::error::AppError;
use gigmarket_backend::models::bids::{BidStatus, EditBid, NewBid, SubmitBid};
use gigmarket_backend::notify::protocol::ServerEvent;
use gigmarket_backend::services::bids::{self as bid_service, DUPLICATE_BID};
use gigmarket_backend::services::hire::hire_bid;

use common::*;

fn submission(gig_id: Uuid, message: &str, price: serde_json::Value) -> SubmitBid {
    SubmitBid {
        gig_id: Some(gig_id),
        message: Some(message.to_string()),
        proposed_price: Some(price),
    }
}

#[tokio::test]
async fn second_bid_from_same_freelancer_is_a_conflict() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Landing page").await;

    place_bid(&db, &dispatcher, gig.id, bob.id, 200.0).await;

    let again = bid_service::submit_bid(
        &db,
        &dispatcher,
        bob.id,
        submission(gig.id, "Second attempt at this gig", json!(180)),
    )
    .await;
    assert_eq!(again.unwrap_err(), AppError::conflict(DUPLICATE_BID));
}

#[tokio::test]
async fn unique_index_rejects_duplicate_even_without_precheck() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Landing page").await;

    let new_bid = || NewBid {
        gig_id: gig.id,
        freelancer_id: bob.id,
        message: "Straight to the store".to_string(),
        proposed_price: 50.0,
    };

    bid_db::insert_bid(&db, new_bid()).await.unwrap();
    let err = bid_db::insert_bid(&db, new_bid()).await.unwrap_err();

    assert_eq!(
        AppError::from_db_with_conflict(err, DUPLICATE_BID),
        AppError::conflict(DUPLICATE_BID)
    );
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Translation").await;

    let cases = [
        (bob.id, submission(gig.id, "Happy to take this on", json!(0))),
        (bob.id, submission(gig.id, "Happy to take this on", json!(-5))),
        (bob.id, submission(gig.id, "Happy to take this on", json!("abc"))),
        (bob.id, submission(gig.id, "too short", json!(10))),
        (bob.id, SubmitBid::default()),
        (owner.id, submission(gig.id, "Bidding on my own gig", json!(10))),
    ];

    for (freelancer, input) in cases {
        let result = bid_service::submit_bid(&db, &dispatcher, freelancer, input.clone()).await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "{input:?} -> {result:?}"
        );
    }

    let missing = bid_service::submit_bid(
        &db,
        &dispatcher,
        bob.id,
        submission(Uuid::new_v4(), "Happy to take this on", json!(10)),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let stored = bid_db::get_bids_by_gig(&db, gig.id, true).await.unwrap();
    assert!(stored.is_empty(), "{stored:?}");
}

#[tokio::test]
async fn numeric_string_price_is_accepted() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Translation").await;

    let view = bid_service::submit_bid(
        &db,
        &dispatcher,
        bob.id,
        submission(gig.id, "  Native speaker, fast turnaround  ", json!("150.5")),
    )
    .await
    .unwrap();

    assert_eq!(view.bid.proposed_price, 150.5);
    assert_eq!(view.bid.message, "Native speaker, fast turnaround");
    assert_eq!(view.bid.status, BidStatus::Pending);
    assert_eq!(view.freelancer.unwrap().name.as_deref(), Some("bob"));
}

#[tokio::test]
async fn assigned_gig_stops_accepting_bids() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let gig = create_gig(&db, owner.id, "Illustration").await;
    let bid = place_bid(&db, &dispatcher, gig.id, bob.id, 75.0).await;

    hire_bid(&db, &dispatcher, bid.bid.id, owner.id, HIRE_TIMEOUT)
        .await
        .unwrap();

    let late = bid_service::submit_bid(
        &db,
        &dispatcher,
        carol.id,
        submission(gig.id, "Sorry I am late to this", json!(70)),
    )
    .await;
    assert!(matches!(late, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn owner_is_notified_of_new_bid() {
    let db = setup_db().await;
    let (dispatcher, mut deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Video intro").await;
    let bid = place_bid(&db, &dispatcher, gig.id, bob.id, 40.0).await;

    let (recipient, event) = next_delivery(&mut deliveries).await.unwrap();
    assert_eq!(recipient, owner.id);
    assert_eq!(
        event,
        ServerEvent::BidReceived {
            gig_id: gig.id,
            gig_title: "Video intro".to_string(),
            bid_id: bid.bid.id,
            freelancer_name: Some("bob".to_string()),
        }
    );
}

#[tokio::test]
async fn only_pending_bids_can_be_edited_by_their_author() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let gig = create_gig(&db, owner.id, "Research report").await;

    let bob_bid = place_bid(&db, &dispatcher, gig.id, bob.id, 300.0).await;
    let carol_bid = place_bid(&db, &dispatcher, gig.id, carol.id, 280.0).await;

    let edited = bid_service::edit_bid(
        &db,
        bob_bid.bid.id,
        bob.id,
        EditBid {
            message: None,
            proposed_price: Some(json!(275)),
        },
    )
    .await
    .unwrap();
    assert_eq!(edited.bid.proposed_price, 275.0);
    assert_eq!(edited.bid.message, bob_bid.bid.message);

    let stranger = bid_service::edit_bid(&db, bob_bid.bid.id, carol.id, EditBid::default()).await;
    assert!(matches!(stranger, Err(AppError::Authorization(_))));

    hire_bid(&db, &dispatcher, carol_bid.bid.id, owner.id, HIRE_TIMEOUT)
        .await
        .unwrap();

    for (bid_id, author) in [(bob_bid.bid.id, bob.id), (carol_bid.bid.id, carol.id)] {
        let before = bid_db::get_bid_by_id(&db, bid_id).await.unwrap().unwrap();
        let result = bid_service::edit_bid(
            &db,
            bid_id,
            author,
            EditBid {
                message: Some("Changing my terms after the fact".to_string()),
                proposed_price: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{result:?}");

        let after = bid_db::get_bid_by_id(&db, bid_id).await.unwrap().unwrap();
        assert_eq!(after, before);
    }
}

#[tokio::test]
async fn hired_bid_cannot_be_withdrawn_but_rejected_can() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let gig = create_gig(&db, owner.id, "SEO review").await;

    let bob_bid = place_bid(&db, &dispatcher, gig.id, bob.id, 90.0).await;
    let carol_bid = place_bid(&db, &dispatcher, gig.id, carol.id, 95.0).await;

    hire_bid(&db, &dispatcher, bob_bid.bid.id, owner.id, HIRE_TIMEOUT)
        .await
        .unwrap();

    let hired = bid_service::withdraw_bid(&db, bob_bid.bid.id, bob.id).await;
    assert!(matches!(hired, Err(AppError::Validation(_))));
    assert!(bid_db::get_bid_by_id(&db, bob_bid.bid.id).await.unwrap().is_some());

    bid_service::withdraw_bid(&db, carol_bid.bid.id, carol.id)
        .await
        .unwrap();
    assert!(bid_db::get_bid_by_id(&db, carol_bid.bid.id).await.unwrap().is_none());

    let gone = bid_service::withdraw_bid(&db, carol_bid.bid.id, carol.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn withdrawing_someone_elses_bid_is_forbidden() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "SEO review").await;
    let bid = place_bid(&db, &dispatcher, gig.id, bob.id, 90.0).await;

    let result = bid_service::withdraw_bid(&db, bid.bid.id, owner.id).await;
    assert!(matches!(result, Err(AppError::Authorization(_))));
}

#[tokio::test]
async fn gig_bid_listing_is_owner_only_and_hides_rejected_by_default() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let gig = create_gig(&db, owner.id, "API integration").await;

    let bob_bid = place_bid(&db, &dispatcher, gig.id, bob.id, 400.0).await;
    place_bid(&db, &dispatcher, gig.id, carol.id, 450.0).await;

    let forbidden = bid_service::list_bids_for_gig(&db, gig.id, bob.id, false).await;
    assert!(matches!(forbidden, Err(AppError::Authorization(_))));

    let before = bid_service::list_bids_for_gig(&db, gig.id, owner.id, false)
        .await
        .unwrap();
    assert_eq!(before.bids.len(), 2);
    assert!(before.bids.iter().all(|b| b.freelancer.is_some()));

    hire_bid(&db, &dispatcher, bob_bid.bid.id, owner.id, HIRE_TIMEOUT)
        .await
        .unwrap();

    let visible = bid_service::list_bids_for_gig(&db, gig.id, owner.id, false)
        .await
        .unwrap();
    assert_eq!(visible.bids.len(), 1);
    assert_eq!(visible.bids[0].bid.id, bob_bid.bid.id);

    let all = bid_service::list_bids_for_gig(&db, gig.id, owner.id, true)
        .await
        .unwrap();
    assert_eq!(all.bids.len(), 2);
}

#[tokio::test]
async fn my_bids_filters_by_status_and_ignores_unknown_filters() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let first = create_gig(&db, owner.id, "First gig").await;
    let second = create_gig(&db, owner.id, "Second gig").await;

    let won = place_bid(&db, &dispatcher, first.id, bob.id, 10.0).await;
    place_bid(&db, &dispatcher, second.id, bob.id, 20.0).await;

    hire_bid(&db, &dispatcher, won.bid.id, owner.id, HIRE_TIMEOUT)
        .await
        .unwrap();

    let hired = bid_service::list_my_bids(&db, bob.id, Some("hired"))
        .await
        .unwrap();
    assert_eq!(hired.len(), 1);
    let gig = hired[0].gig.as_ref().unwrap();
    assert_eq!(gig.id, first.id);
    assert_eq!(gig.owner.as_ref().unwrap().id, owner.id);

    let pending = bid_service::list_my_bids(&db, bob.id, Some("pending"))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].bid.gig_id, second.id);

    let everything = bid_service::list_my_bids(&db, bob.id, Some("bogus"))
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn pending_bid_can_be_withdrawn() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let gig = create_gig(&db, owner.id, "Landing page copy").await;
    let bid = place_bid(&db, &dispatcher, gig.id, bob.id, 120.0).await;

    bid_service::withdraw_bid(&db, bid.bid.id, bob.id).await.unwrap();
    assert!(bid_db::get_bid_by_id(&db, bid.bid.id).await.unwrap().is_none());

    // Withdrawing frees the slot for a fresh bid.
    place_bid(&db, &dispatcher, gig.id, bob.id, 110.0).await;
}

#[tokio::test]
async fn bid_racing_a_hire_never_stays_pending_on_an_assigned_gig() {
    let db = setup_db().await;
    let (dispatcher, _deliveries) = recording_dispatcher();

    let owner = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    let gig = create_gig(&db, owner.id, "Brand guidelines").await;
    let bob_bid = place_bid(&db, &dispatcher, gig.id, bob.id, 500.0).await;

    let (hired, late) = tokio::join!(
        hire_bid(&db, &dispatcher, bob_bid.bid.id, owner.id, HIRE_TIMEOUT),
        bid_service::submit_bid(
            &db,
            &dispatcher,
            carol.id,
            submission(gig.id, "I can start tomorrow morning", json!(450)),
        ),
    );
    assert!(hired.is_ok(), "{hired:?}");

    match late {
        Ok(view) => {
            let stored = bid_db::get_bid_by_id(&db, view.bid.id).await.unwrap().unwrap();
            assert_eq!(stored.status, BidStatus::Rejected);
        }
        Err(e) => assert!(matches!(e, AppError::Validation(_)), "{e:?}"),
    }

    let pending = bid_db::get_bids_by_gig(&db, gig.id, true)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.status == BidStatus::Pending)
        .count();
    assert_eq!(pending, 0);
}
