pub mod actions;
pub mod auth;
pub mod client;
pub mod common;
pub mod credentials;
pub mod error;
pub mod integrations;
pub mod paging;
pub mod recording;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth::Credentials;
pub use client::{Client, RetryConfig};
pub use error::ApiError;
