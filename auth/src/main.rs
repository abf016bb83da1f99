use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use serde_json::json;

use authbridge_auth::handlers::configure_auth_routes;
use authbridge_config::AppConfig;
use authbridge_database::{Database, DatabaseConfig};
use authbridge_observability::{init_tracing, TracingConfig};

async fn health_check(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": config.app.name,
        "version": config.app.version,
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing(TracingConfig::for_service("auth-service"));

    let config = AppConfig::from_env()?;
    let database_config = DatabaseConfig::from_env()?;

    let database = Database::new(&database_config).await?;
    database.migrate().await?;
    let pool = database.pool().clone();

    let host = config.server.host.clone();
    let port = config.server.port;
    let whitelist_origins = config.server.whitelist_origins.clone();
    tracing::info!(%host, port, "starting auth service");

    HttpServer::new(move || {
        let cors = if whitelist_origins.is_empty() {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            let mut cors = Cors::default().allow_any_method().allow_any_header();
            for origin in &whitelist_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .route("/health", web::get().to(health_check))
            .configure(configure_auth_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
