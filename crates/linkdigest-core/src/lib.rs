pub mod ai;
pub mod config;
pub mod error;
pub mod extract;
pub mod quality;
pub mod queue;
pub mod storage;
pub mod text;

pub use config::AppConfig;
pub use error::{Error, Result};
