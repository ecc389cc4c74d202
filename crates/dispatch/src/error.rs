//! Application-level error type.
//!
//! Binaries return [`Result`] and use [`AppError::is_internal`]
//! to decide which failures are reported to Sentry.

use thiserror::Error;

use crate::config::ConfigError;
use crate::geo::GeoError;
use crate::services::IntakeError;

/// Application-level error type for dispatch.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to the database failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Address resolution failed.
    #[error("Geocoding error: {0}")]
    Geo(#[from] GeoError),

    /// Order intake failed.
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bad input from the operator.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the failure is on our side rather than the caller's.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Database(_) | Self::Migration(_) | Self::Serialization(_) => {
                true
            }
            Self::Geo(e) => !matches!(e, GeoError::NoMatch { .. }),
            Self::Intake(e) => matches!(e, IntakeError::Storage(_)),
            Self::BadRequest(_) => false,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
