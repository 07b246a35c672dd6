use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no Linear API key configured. Add api_key to ~/.linsync/config.toml")]
    NotConfigured,

    #[error("Linear API request failed: {0}")]
    Transport(String),
}
