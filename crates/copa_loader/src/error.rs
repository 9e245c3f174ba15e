use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Invalid input JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unsupported input shape: expected a list of events or an object with 'events', found {found}")]
    UnsupportedShape { found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LoadError {
    /// Configuration errors are raised before any store mutation.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LoadError::InputNotFound { .. }
                | LoadError::InvalidJson(_)
                | LoadError::UnsupportedShape { .. }
                | LoadError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        let missing = LoadError::InputNotFound {
            path: "data/x.json".to_string(),
        };
        assert!(missing.is_configuration_error());
        assert!(missing.to_string().contains("data/x.json"));

        let shape = LoadError::UnsupportedShape {
            found: "string".to_string(),
        };
        assert!(shape.is_configuration_error());

        let store = LoadError::Store(StoreError::InvalidCollectionName("a/b".to_string()));
        assert!(!store.is_configuration_error());
    }
}
