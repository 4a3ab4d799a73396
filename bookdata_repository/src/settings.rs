//! Settings are read once at process start, from an optional `bookdata.toml`
//! file overlaid by environment variables (`DB_HOST`, `SECRET_KEY`, ...).

use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const SETTINGS_FILE: &str = "bookdata";

fn load<T: DeserializeOwned>() -> Result<T, ConfigError> {
    load_from(Environment::default())
}

// Values stay strings until deserialized so passwords like `007` keep their leading zeros
fn load_from<T: DeserializeOwned>(environment: Environment) -> Result<T, ConfigError> {
    Config::builder()
        .add_source(File::with_name(SETTINGS_FILE).required(false))
        .add_source(environment)
        .build()?
        .try_deserialize()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub use_in_memory_db: bool,
    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_credential")]
    pub db_username: String,
    #[serde(default = "default_db_credential")]
    pub db_password: String,
}

impl DatabaseSettings {
    pub fn load() -> Result<Self, ConfigError> {
        load()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            use_in_memory_db: false,
            db_host: default_db_host(),
            db_username: default_db_credential(),
            db_password: default_db_credential(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Key used to sign access tokens, there is no default
    pub secret_key: String,
    /// One of HS256, HS384, HS512
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_token_expire_seconds")]
    pub access_token_expire_seconds: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn load() -> Result<Self, ConfigError> {
        load()
    }

    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            algorithm: default_algorithm(),
            access_token_expire_seconds: default_access_token_expire_seconds(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn load() -> Result<Self, ConfigError> {
        load()
    }
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_credential() -> String {
    "postgres".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_expire_seconds() -> u64 {
    1800
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}
