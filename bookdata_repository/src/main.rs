use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use bookdata_repository::app_config::config_app;
use bookdata_repository::auth::AuthService;
use bookdata_repository::settings::{AuthSettings, DatabaseSettings, ServerSettings};
use bookdata_repository::telemetry::init_telemetry;
use bookdata_repository::{books_repository, users_repository};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry("bookdata_api");

    let database_settings = DatabaseSettings::load().context("Invalid database settings")?;
    let auth_settings = AuthSettings::load().context("Invalid auth settings")?;
    let server_settings = ServerSettings::load().context("Invalid server settings")?;

    let books_repository = books_repository::open(&database_settings).await?;
    let users_repository = users_repository::open(&database_settings).await?;
    let auth_service = web::Data::new(AuthService::new(users_repository, auth_settings)?);

    tracing::info!(
        "Starting HTTP server at http://{}:{}",
        server_settings.bind_address,
        server_settings.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(books_repository.clone()))
            .app_data(auth_service.clone())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((server_settings.bind_address.as_str(), server_settings.port))
    .context("Failed to bind server address")?
    .run()
    .await
    .context("Server failure")
}
