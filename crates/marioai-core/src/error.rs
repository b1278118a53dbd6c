use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Action/scene validation errors.
///
/// Carries only the offending index or size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Action flag {index} must be 0 or 1, got {value}")]
    InvalidActionEncoding { index: usize, value: u8 },

    #[error("Level scene size mismatch: expected {expected} cells, got {got}")]
    SceneSizeMismatch { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_message_names_field() {
        let err = ConfigError::invalid("task.player_pos", "must be < 22");
        let msg = err.to_string();
        assert!(msg.contains("task.player_pos"));
        assert!(msg.contains("must be < 22"));
    }

    #[test]
    fn config_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn validation_error_is_copy() {
        let err = ValidationError::InvalidActionEncoding { index: 3, value: 7 };
        let copy = err;
        assert_eq!(err, copy);
        assert!(err.to_string().contains("flag 3"));
    }

    #[test]
    fn scene_size_mismatch_display() {
        let err = ValidationError::SceneSizeMismatch {
            expected: 484,
            got: 10,
        };
        assert!(err.to_string().contains("484"));
        assert!(err.to_string().contains("10"));
    }
}
