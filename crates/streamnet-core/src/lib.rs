//! Shared configuration, domain records, and pure crawl rules for streamnet.

pub mod app_config;
pub mod config;
pub mod mentions;
pub mod staleness;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use mentions::{extract_mentions, resolve_mentions, MentionResolution};
pub use staleness::is_due;
pub use types::{
    canonical_pair, CategoryRecord, ChannelDetails, ChannelStub, MentionRecord, VideoRecord,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
