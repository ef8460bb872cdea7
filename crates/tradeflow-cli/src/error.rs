use thiserror::Error;
use tradeflow_core::{ConfigError, LoadError, PipelineError, ValidationError};
use tradeflow_store::StoreError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Usage(String),

    #[error("the file is empty: {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("product store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Usage(_) | Self::EmptyInput(_) => 2,
            Self::Config(ConfigError::Validation(_)) => 2,
            Self::Config(ConfigError::Parse(_)) | Self::Serialization(_) => 4,
            Self::Config(ConfigError::Io(_)) => 10,
            Self::Pipeline(_) => 6,
            Self::Store(_) | Self::Load(LoadError::Cache(_)) => 7,
            Self::Load(LoadError::Source { .. }) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow_core::CacheError;

    #[test]
    fn maps_categories_to_exit_codes() {
        assert_eq!(CliError::EmptyInput("trade.csv".into()).exit_code(), 2);
        assert_eq!(CliError::from(ValidationError::ZeroBatchSize).exit_code(), 2);
        assert_eq!(
            CliError::from(PipelineError::Worker {
                seq: 0,
                message: "cancelled".into()
            })
            .exit_code(),
            6
        );
        assert_eq!(
            CliError::from(LoadError::Cache(CacheError::Storage("disk full".into()))).exit_code(),
            7
        );
        assert_eq!(
            CliError::from(std::io::Error::other("closed")).exit_code(),
            10
        );
    }

    #[test]
    fn empty_input_message_names_the_file() {
        let error = CliError::EmptyInput("trade.csv".into());
        assert_eq!(error.to_string(), "the file is empty: trade.csv");
    }
}
