pub mod auth;
pub mod bids;
pub mod gigs;

use actix_web::web;

use crate::notify::session;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (protected by JWT via the AuthenticatedUser extractor) ──
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(auth::me))
            .route("/complete-profile", web::post().to(auth::complete_profile)),
    );

    // ── Gig routes (browsing is public, everything else needs a JWT) ──
    cfg.service(
        web::scope("/gigs")
            .route("", web::get().to(gigs::list_gigs))
            .route("", web::post().to(gigs::create_gig))
            .route("/my-gigs", web::get().to(gigs::my_gigs))
            .route("/{id}", web::get().to(gigs::get_gig))
            .route("/{id}", web::patch().to(gigs::update_gig))
            .route("/{id}", web::delete().to(gigs::delete_gig)),
    );

    // ── Bid routes (all protected) ──
    cfg.service(
        web::scope("/bids")
            .route("", web::post().to(bids::submit_bid))
            .route("/my-bids", web::get().to(bids::my_bids))
            .route("/gig/{gig_id}", web::get().to(bids::bids_for_gig))
            .route("/{id}", web::patch().to(bids::update_bid))
            .route("/{id}", web::delete().to(bids::withdraw_bid))
            .route("/{id}/hire", web::patch().to(bids::hire_bid)),
    );

    // ── Notification WebSocket (JWT in the query string) ──
    cfg.service(web::scope("/notifications").route("/ws", web::get().to(session::ws_connect)));
}
