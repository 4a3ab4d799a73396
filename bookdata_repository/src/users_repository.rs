use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio_postgres::{Client, Row};

use crate::api::UserId;
use crate::postgres::{connect, is_unique_violation, PostgresConfig};
use crate::settings::DatabaseSettings;

#[derive(thiserror::Error, Debug)]
pub enum UsersRepositoryError {
    #[error("Username {0} already registered")]
    UsernameTaken(String),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub hashed_password: String,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait UsersRepository: Send + Sync {
    /// Stores an active user, usernames are unique
    async fn add_user(
        &self,
        username: String,
        hashed_password: String,
    ) -> Result<UserRecord, UsersRepositoryError>;
    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError>;
}

pub async fn open(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn UsersRepository>> {
    Ok(if settings.use_in_memory_db {
        Arc::new(InMemoryUsersRepository::default())
    } else {
        Arc::new(
            PostgresUsersRepository::init(settings.into())
                .await
                .context("Failed to init postgres users repository")?,
        )
    })
}

pub struct InMemoryUsersRepository {
    user_sequence_generator: AtomicI32,
    users: parking_lot::RwLock<Vec<UserRecord>>,
}

impl Default for InMemoryUsersRepository {
    fn default() -> Self {
        Self {
            user_sequence_generator: AtomicI32::new(1),
            users: Default::default(),
        }
    }
}

#[async_trait::async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn add_user(
        &self,
        username: String,
        hashed_password: String,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let mut locked_users = self.users.write();
        if locked_users.iter().any(|user| user.username == username) {
            return Err(UsersRepositoryError::UsernameTaken(username));
        }
        let user = UserRecord {
            id: self.user_sequence_generator.fetch_add(1, Ordering::Relaxed),
            username,
            hashed_password,
            is_active: true,
        };
        locked_users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

const USERS_SCHEMA: &str = "
        CREATE TABLE IF NOT EXISTS users (
            id                  SERIAL PRIMARY KEY,
            username            VARCHAR(255) NOT NULL UNIQUE,
            hashed_password     VARCHAR(255) NOT NULL,
            is_active           BOOLEAN NOT NULL DEFAULT TRUE
            )
        ";

pub struct PostgresUsersRepository {
    client: Client,
}

impl PostgresUsersRepository {
    pub async fn init(config: PostgresConfig) -> anyhow::Result<Self> {
        let client = connect(&config, USERS_SCHEMA).await?;
        Ok(Self { client })
    }
}

fn user_from_row(row: &Row) -> Result<UserRecord, tokio_postgres::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        hashed_password: row.try_get("hashed_password")?,
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait::async_trait]
impl UsersRepository for PostgresUsersRepository {
    async fn add_user(
        &self,
        username: String,
        hashed_password: String,
    ) -> Result<UserRecord, UsersRepositoryError> {
        let result = self
            .client
            .query_one(
                "INSERT INTO users (username, hashed_password) VALUES ($1, $2) \
                 RETURNING id, username, hashed_password, is_active",
                &[&username, &hashed_password],
            )
            .await;
        match result {
            Ok(row) => Ok(user_from_row(&row)?),
            Err(err) if is_unique_violation(&err) => {
                Err(UsersRepositoryError::UsernameTaken(username))
            }
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UsersRepositoryError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, username, hashed_password, is_active FROM users WHERE username = ($1)",
                &[&username],
            )
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[cfg(test)]
mod users_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::postgres::PostgresConfig;
    use crate::users_repository::{
        InMemoryUsersRepository, PostgresUsersRepository, UsersRepository, UsersRepositoryError,
    };

    async fn check_add_and_get_user(repo: &dyn UsersRepository) {
        assert_eq!(repo.get_user_by_username("alice").await.unwrap(), None);

        let user = repo
            .add_user("alice".to_string(), "hash1".to_string())
            .await
            .expect("Failed to add user");
        assert_eq!(user.username, "alice");
        assert!(user.is_active);

        let duplicate = repo
            .add_user("alice".to_string(), "hash2".to_string())
            .await;
        assert!(
            matches!(duplicate, Err(UsersRepositoryError::UsernameTaken(name)) if name == "alice")
        );

        let stored = repo
            .get_user_by_username("alice")
            .await
            .unwrap()
            .expect("User not found");
        assert_eq!(stored, user);
        assert_eq!(stored.hashed_password, "hash1");

        let other = repo
            .add_user("bob".to_string(), "hash3".to_string())
            .await
            .unwrap();
        assert_ne!(other.id, user.id);
    }

    #[tokio::test]
    async fn test_in_memory_add_and_get_user() {
        check_add_and_get_user(&InMemoryUsersRepository::default()).await;
    }

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresUsersRepository) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = PostgresUsersRepository::init(PostgresConfig {
                hostname: "127.0.0.1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            })
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    #[cfg_attr(not(feature = "postgres_tests"), ignore)]
    async fn test_postgres_add_and_get_user() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;
        check_add_and_get_user(&repo).await;
    }
}
