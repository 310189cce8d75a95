//! Remote destination directory.
//!
//! Used by the address resolver when a region is missing from the local
//! reference cache. Responses are cached in-process with `moka` (10-minute
//! TTL).

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::HttpDirectoryClient;

/// A region or sub-region as listed by the remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Provider identifier, opaque to us.
    pub id: String,
    pub name: String,
}

/// Errors that can occur when querying the remote directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request failed.
    #[error("directory request failed: {0}")]
    Request(String),

    /// Non-success status from the provider.
    #[error("directory returned status {0}")]
    Status(u16),

    /// Failed to parse the response.
    #[error("directory response error: {0}")]
    Response(String),

    /// Client could not be built.
    #[error("directory configuration error: {0}")]
    Config(String),
}

/// Read-only remote region and sub-region listing.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    async fn regions(&self) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn sub_regions(&self, region_id: &str) -> Result<Vec<DirectoryEntry>, DirectoryError>;
}
