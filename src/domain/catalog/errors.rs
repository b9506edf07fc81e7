//! Catalog loading errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate external product id '{0}'")]
    DuplicateProduct(String),

    #[error("Access role '{0}' is mapped to more than one product")]
    DuplicateRole(String),

    #[error("Subscription-tier product '{0}' has no tier level")]
    MissingTierLevel(String),

    #[error("One-off product '{0}' must not declare a tier level")]
    UnexpectedTierLevel(String),

    #[error("Tier {0} has more than one grant")]
    DuplicateTierGrant(String),
}
