use async_trait::async_trait;

use crate::domain::RawTable;
use crate::error::Result;

/// Where decoded input tables come from
#[async_trait]
pub trait TableSourcePort: Send + Sync {
    /// Load the table at `location`; `Ok(None)` when nothing exists there.
    async fn load(&self, location: &str) -> Result<Option<RawTable>>;
}

/// Where finished artifacts go
#[async_trait]
pub trait ArtifactSinkPort: Send + Sync {
    /// Write the artifact so that it either appears complete or not at all.
    /// Returns the hex SHA-256 of the written bytes.
    async fn write(&self, location: &str, bytes: Vec<u8>) -> Result<String>;
}
