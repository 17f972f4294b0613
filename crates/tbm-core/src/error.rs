use thiserror::Error;

#[derive(Debug, Error)]
pub enum TbmError {
    #[error("unknown interlock: {0}")]
    UnknownInterlock(String),

    #[error("unknown actuator: {0}")]
    UnknownActuator(String),

    #[error("invalid threshold operator '{0}': expected one of >=, <=, >, <")]
    InvalidOperator(String),

    #[error("interlock {0} is still active: clear the field condition before resetting")]
    ResetWhileActive(String),

    #[error("fault cannot be acknowledged while a critical interlock is active")]
    AcknowledgeWhileUnsafe,

    #[error("duplicate id in catalog: {0}")]
    DuplicateId(String),

    #[error("invalid id '{0}': must start with a letter or digit and contain only letters, digits, '_', '-' or '.'")]
    InvalidId(String),

    #[error("catalog defines no interlocks")]
    EmptyCatalog,

    #[error("unsupported catalog format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TbmError>;
