//! Requests through the actix routing table, without Redis configured.
//!
//! Run with: `cargo test --test http_test`
mod common;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use gigmarket_backend::auth::jwt::{Claims, TokenVerifier};
use gigmarket_backend::config::{AppConfig, AuthConfig};
use gigmarket_backend::handlers;
use gigmarket_backend::notify::Dispatcher;
use gigmarket_backend::notify::hub::NotificationHub;

use common::*;

const TEST_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";

fn bearer(user_id: Uuid, name: &str) -> (header::HeaderName, String) {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + 3600) as usize,
        iat: Some(now as usize),
        iss: None,
        email: Some(format!("{name}@example.com")),
        role: Some("authenticated".to_string()),
        user_metadata: None,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode test JWT");
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        redis_url: None,
        port: 0,
        auth: AuthConfig::Secret(TEST_SECRET.to_string()),
        hire_timeout: Duration::from_secs(10),
        user_cache_ttl: Duration::from_secs(300),
        gig_cache_ttl: Duration::from_secs(600),
    }
}

#[actix_web::test]
async fn gig_update_hire_and_delete_routes_work_without_a_cache() {
    let db = setup_db().await;
    let config = test_config();
    let hub = Arc::new(NotificationHub::new());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db))
            .app_data(web::Data::new(TokenVerifier::from_config(&config.auth)))
            .app_data(web::Data::new(Dispatcher::spawn(hub.clone())))
            .app_data(web::Data::new(hub))
            .app_data(web::Data::new(config))
            .service(web::scope("/api").configure(handlers::init_routes)),
    )
    .await;

    let owner = bearer(Uuid::new_v4(), "alice");
    let freelancer = bearer(Uuid::new_v4(), "bob");

    let req = test::TestRequest::post()
        .uri("/api/gigs")
        .insert_header(owner.clone())
        .set_json(json!({
            "title": "Logo design",
            "description": "A reasonably detailed description of the work",
            "budget": 500,
        }))
        .to_request();
    let gig: Value = test::call_and_read_body_json(&app, req).await;
    let gig_id = gig["id"].as_str().expect("gig id").to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/gigs/{gig_id}"))
        .insert_header(owner.clone())
        .set_json(json!({ "budget": 650 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/bids")
        .insert_header(freelancer.clone())
        .set_json(json!({
            "gig_id": gig_id,
            "message": "I can deliver this within a week",
            "proposed_price": 600,
        }))
        .to_request();
    let bid: Value = test::call_and_read_body_json(&app, req).await;
    let bid_id = bid["id"].as_str().expect("bid id").to_string();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bids/{bid_id}/hire"))
        .insert_header(freelancer)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bids/{bid_id}/hire"))
        .insert_header(owner.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let hired: Value = test::read_body_json(resp).await;
    assert_eq!(hired["gig"]["status"], "assigned");
    assert_eq!(hired["rejected_count"], 0);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/gigs/{gig_id}"))
        .insert_header(owner)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "validation");
}
