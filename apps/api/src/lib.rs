pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ml;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::config::Config;
pub use crate::error::{ApiError, Result};
