use anyhow::Context;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

use crate::settings::DatabaseSettings;

pub struct PostgresConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl From<&DatabaseSettings> for PostgresConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            hostname: settings.db_host.clone(),
            username: settings.db_username.clone(),
            password: settings.db_password.clone(),
        }
    }
}

/// Connects and drives the connection on a background task, then creates the table with `schema`
pub async fn connect(config: &PostgresConfig, schema: &str) -> anyhow::Result<Client> {
    let connection_str = format!(
        "postgresql://{}:{}@{}",
        config.username, config.password, config.hostname
    );
    tracing::info!(
        "Connecting to postgres at {} as {}",
        config.hostname,
        config.username
    );
    let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
        .await
        .context("Failed to start postgres")?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Postgres connection error: {}", e);
        }
    });

    client
        .batch_execute(schema)
        .await
        .context("Failed to setup table")?;
    Ok(client)
}

pub fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.as_db_error()
        .map(|db_err| db_err.code() == &SqlState::UNIQUE_VIOLATION)
        .unwrap_or_default()
}
