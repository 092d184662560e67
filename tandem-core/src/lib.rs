pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod models;
pub mod registry;
pub mod relay;
pub mod service;
pub mod translate;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use service::SessionService;
