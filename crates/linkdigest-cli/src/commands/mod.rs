pub mod add;
pub mod check;
pub mod extract;
pub mod init;
pub mod list;
pub mod providers;
pub mod show;
pub mod status;
pub mod summarize;

use anyhow::{Context, Result};
use uuid::Uuid;

/// Parse an id given on the command line
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("'{}' is not a valid id", raw))
}
