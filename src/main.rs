use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use dotenv::dotenv;
use gigmarket_backend::auth::jwt::TokenVerifier;
use gigmarket_backend::cache::{CacheTtl, RedisCache};
use gigmarket_backend::config::AppConfig;
use gigmarket_backend::create_pool;
use gigmarket_backend::handlers;
use gigmarket_backend::notify::Dispatcher;
use gigmarket_backend::notify::hub::NotificationHub;
use migration::{Migrator, MigratorTrait};
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let db = create_pool(&config.database_url)
        .await
        .map_err(io::Error::other)?;
    Migrator::up(&db, None).await.map_err(io::Error::other)?;
    tracing::info!("Database ready");
    let db_data = web::Data::new(db);

    // Redis is optional: without it every read goes to the database.
    let redis_data = match &config.redis_url {
        Some(url) => match RedisCache::new(url).await {
            Ok(cache) => {
                tracing::info!("Connected to Redis");
                Some(web::Data::new(Arc::new(cache)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, caching disabled");
                None
            }
        },
        None => None,
    };

    let verifier = web::Data::new(TokenVerifier::from_config(&config.auth));
    let cache_ttl = web::Data::new(CacheTtl {
        user: config.user_cache_ttl,
        gig: config.gig_cache_ttl,
    });

    let hub = Arc::new(NotificationHub::new());
    let dispatcher = web::Data::new(Dispatcher::spawn(hub.clone()));
    let hub_data = web::Data::new(hub);

    let bind_addr = config.bind_addr();
    let config_data = web::Data::new(config);
    tracing::info!("Server running at http://{bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        let mut app = App::new()
            .wrap(cors)
            .app_data(db_data.clone())
            .app_data(verifier.clone())
            .app_data(cache_ttl.clone())
            .app_data(dispatcher.clone())
            .app_data(hub_data.clone())
            .app_data(config_data.clone());

        if let Some(redis) = &redis_data {
            app = app.app_data(redis.clone());
        }

        app.service(web::scope("/api").configure(handlers::init_routes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
