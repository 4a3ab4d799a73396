//! Password registration and login with bearer tokens.
//!
//! Passwords are stored as bcrypt hashes, tokens are HMAC signed JWTs carrying the
//! username as subject and an absolute expiry in seconds since the epoch.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::bail;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::{AccessToken, UserPublic};
use crate::settings::AuthSettings;
use crate::users_repository::{UserRecord, UsersRepository, UsersRepositoryError};

pub const TOKEN_TYPE: &str = "bearer";

// Verified against when the username is unknown so both login failures cost one bcrypt check
const UNKNOWN_USER_PASSWORD: &str = "unknown user placeholder";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Username {0} already registered")]
    Conflict(String),

    #[error("Incorrect username or password")]
    Unauthorized,

    #[error("Password hashing failure {0}")]
    Hashing(String),

    #[error("Token failure {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Users repository failure {0}")]
    Repository(#[from] UsersRepositoryError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

pub struct AuthService {
    users: Arc<dyn UsersRepository>,
    settings: AuthSettings,
    algorithm: Algorithm,
    unknown_user_hash: String,
}

impl From<UserRecord> for UserPublic {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_active: user.is_active,
        }
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

async fn verify_password(password: String, hashed_password: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed_password))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

impl AuthService {
    /// Fails when the configured algorithm is not one of HS256, HS384, HS512
    pub fn new(users: Arc<dyn UsersRepository>, settings: AuthSettings) -> anyhow::Result<Self> {
        let algorithm = match Algorithm::from_str(&settings.algorithm) {
            Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => algorithm,
            _ => bail!("Unsupported token algorithm {}", settings.algorithm),
        };
        let unknown_user_hash = bcrypt::hash(UNKNOWN_USER_PASSWORD, settings.bcrypt_cost)?;
        Ok(Self {
            users,
            settings,
            algorithm,
            unknown_user_hash,
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserPublic, AuthError> {
        if self.users.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict(username.to_string()));
        }
        let hashed_password =
            hash_password(password.to_string(), self.settings.bcrypt_cost).await?;
        match self
            .users
            .add_user(username.to_string(), hashed_password)
            .await
        {
            Ok(user) => {
                tracing::info!("Registered user {}", user.username);
                Ok(user.into())
            }
            Err(UsersRepositoryError::UsernameTaken(username)) => {
                Err(AuthError::Conflict(username))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unknown user and wrong password both end with [`AuthError::Unauthorized`]
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        let user = self.users.get_user_by_username(username).await?;
        let hashed_password = match &user {
            Some(user) => user.hashed_password.clone(),
            None => self.unknown_user_hash.clone(),
        };
        let password_matches = verify_password(password.to_string(), hashed_password).await?;
        let Some(user) = user.filter(|_| password_matches) else {
            return Err(AuthError::Unauthorized);
        };
        let now = jsonwebtoken::get_current_timestamp();
        Ok(AccessToken {
            access_token: self.issue_token_at(&user.username, now)?,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// Token for `subject` valid until `now` plus the configured lifetime
    pub fn issue_token_at(&self, subject: &str, now: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: now + self.settings.access_token_expire_seconds,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.settings.secret_key.as_bytes()),
        )?)
    }

    pub fn validate_token(&self, token: &str) -> Option<String> {
        self.validate_token_at(token, jsonwebtoken::get_current_timestamp())
    }

    /// Subject of the token if it is signed with our key and `exp` is not before `now`
    pub fn validate_token_at(&self, token: &str, now: u64) -> Option<String> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is compared against `now` below
        validation.validate_exp = false;
        validation.leeway = 0;
        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret_key.as_bytes()),
            &validation,
        )
        .map_err(|err| tracing::debug!("Rejected token {}", err))
        .ok()?;
        if token_data.claims.exp < now {
            return None;
        }
        Some(token_data.claims.sub)
    }

    pub async fn current_user(&self, token: &str) -> Result<UserPublic, AuthError> {
        let username = self.validate_token(token).ok_or(AuthError::Unauthorized)?;
        self.users
            .get_user_by_username(&username)
            .await?
            .map(UserPublic::from)
            .ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod auth_tests {
    use std::sync::Arc;

    use crate::auth::{AuthError, AuthService, TOKEN_TYPE, UNKNOWN_USER_PASSWORD};
    use crate::settings::AuthSettings;
    use crate::users_repository::{InMemoryUsersRepository, UsersRepository};

    fn test_settings() -> AuthSettings {
        AuthSettings {
            bcrypt_cost: 4,
            access_token_expire_seconds: 60,
            ..AuthSettings::new("test-secret")
        }
    }

    fn auth_service() -> (Arc<InMemoryUsersRepository>, AuthService) {
        let users = Arc::new(InMemoryUsersRepository::default());
        let service = AuthService::new(users.clone(), test_settings()).unwrap();
        (users, service)
    }

    #[tokio::test]
    async fn test_register_login_and_current_user() {
        let (_, service) = auth_service();

        let user = service.register("alice", "secret").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.is_active);

        let token = service.login("alice", "secret").await.unwrap();
        assert_eq!(token.token_type, TOKEN_TYPE);

        let current = service.current_user(&token.access_token).await.unwrap();
        assert_eq!(current, user);
    }

    #[tokio::test]
    /// Registering a taken username fails and the original password still works
    async fn test_duplicate_registration_keeps_stored_hash() {
        let (users, service) = auth_service();
        service.register("alice", "first").await.unwrap();
        let stored_hash = users
            .get_user_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .hashed_password;

        let duplicate = service.register("alice", "second").await;
        assert!(matches!(duplicate, Err(AuthError::Conflict(name)) if name == "alice"));

        let hash_after = users
            .get_user_by_username("alice")
            .await
            .unwrap()
            .unwrap()
            .hashed_password;
        assert_eq!(stored_hash, hash_after);
        assert!(service.login("alice", "first").await.is_ok());
        assert!(matches!(
            service.login("alice", "second").await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let (_, service) = auth_service();
        service.register("alice", "secret").await.unwrap();

        let wrong_password = service.login("alice", "nope").await.unwrap_err();
        let unknown_user = service.login("bob", "secret").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::Unauthorized));
        assert!(matches!(unknown_user, AuthError::Unauthorized));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    /// Unknown users are checked against a hash of the configured cost and are never let in
    async fn test_unknown_user_login_runs_password_check() {
        let (_, service) = auth_service();
        assert!(service.unknown_user_hash.starts_with("$2b$04$"));
        assert!(bcrypt::verify(UNKNOWN_USER_PASSWORD, &service.unknown_user_hash).unwrap());

        assert!(matches!(
            service.login("ghost", UNKNOWN_USER_PASSWORD).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_token_expiry() {
        let (_, service) = auth_service();
        let issued_at = 1_700_000_000;
        let token = service.issue_token_at("alice", issued_at).unwrap();

        assert_eq!(
            service.validate_token_at(&token, issued_at + 59),
            Some("alice".to_string())
        );
        assert_eq!(
            service.validate_token_at(&token, issued_at + 60),
            Some("alice".to_string())
        );
        assert_eq!(service.validate_token_at(&token, issued_at + 61), None);
    }

    #[test]
    fn test_malformed_and_foreign_tokens_are_rejected() {
        let (_, service) = auth_service();
        let now = jsonwebtoken::get_current_timestamp();
        assert_eq!(service.validate_token_at("not-a-token", now), None);

        let foreign = AuthService::new(
            Arc::new(InMemoryUsersRepository::default()),
            AuthSettings::new("other-secret"),
        )
        .unwrap();
        let token = foreign.issue_token_at("alice", now).unwrap();
        assert_eq!(service.validate_token_at(&token, now), None);
    }

    #[tokio::test]
    async fn test_current_user_requires_existing_user() {
        let (_, service) = auth_service();
        let token = service
            .issue_token_at("ghost", jsonwebtoken::get_current_timestamp())
            .unwrap();
        assert!(matches!(
            service.current_user(&token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_only_hmac_algorithms_are_accepted() {
        let settings = AuthSettings {
            algorithm: "RS256".to_string(),
            ..test_settings()
        };
        assert!(AuthService::new(Arc::new(InMemoryUsersRepository::default()), settings).is_err());

        let settings = AuthSettings {
            algorithm: "HS512".to_string(),
            ..test_settings()
        };
        assert!(AuthService::new(Arc::new(InMemoryUsersRepository::default()), settings).is_ok());
    }
}
