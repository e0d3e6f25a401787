use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use kidmy_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{OblioService, ReplicateService, SketchfabService, StorageService, StripeService},
    handlers,
    middlewares::{create_cors, AuthMiddleware},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let replicate_service = ReplicateService::new(config.replicate.clone());
    let storage_service = StorageService::new(&config.storage);
    let stripe_service = StripeService::new(config.stripe.clone());
    let oblio_service = OblioService::new(config.oblio.clone());
    let sketchfab_service = SketchfabService::new(config.sketchfab.clone());

    let credit_service = CreditService::new(pool.clone());
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let user_service = UserService::new(pool.clone());
    let generation_service = GenerationService::new(
        pool.clone(),
        replicate_service.clone(),
        storage_service.clone(),
        credit_service.clone(),
    );
    let marketplace_service = MarketplaceService::new(
        pool.clone(),
        sketchfab_service,
        storage_service.clone(),
        credit_service.clone(),
    );
    let purchase_service = PurchaseService::new(
        pool.clone(),
        stripe_service.clone(),
        oblio_service,
        config.app.clone(),
    );
    let story_service = StoryService::new(replicate_service);

    tasks::spawn_all(generation_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .app_data(web::Data::new(generation_service.clone()))
            .app_data(web::Data::new(marketplace_service.clone()))
            .app_data(web::Data::new(purchase_service.clone()))
            .app_data(web::Data::new(story_service.clone()))
            .app_data(web::Data::new(stripe_service.clone()))
            .app_data(web::Data::new(storage_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::generation_config)
                    .configure(handlers::gallery_config)
                    .configure(handlers::purchase_config)
                    .configure(handlers::story_config)
                    .configure(handlers::storage_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
