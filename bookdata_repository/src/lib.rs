pub mod api;
pub mod settings;
pub mod telemetry;

#[cfg(any(feature = "client", test))]
pub mod client;

#[cfg(any(feature = "store", test))]
pub mod books_repository;
#[cfg(any(feature = "store", test))]
pub mod postgres;
#[cfg(any(feature = "store", test))]
pub mod stats;
#[cfg(any(feature = "store", test))]
pub mod users_repository;

#[cfg(any(feature = "server", test))]
pub mod app_config;
#[cfg(any(feature = "server", test))]
pub mod auth;
#[cfg(any(feature = "server", test))]
mod handlers;
