use modkit_domain::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("authorization: {0}")]
    Authorization(String),

    #[error("infra: {0}")]
    Infra(String),

    #[error("handler already registered: {name}")]
    AlreadyRegistered { name: &'static str },

    #[error("handler not registered: {name}")]
    NotRegistered { name: &'static str },

    #[error("request identity not valid: {reason}")]
    NotValid { reason: String },

    #[error("async queue full: command={name}")]
    QueueFull { name: &'static str },

    #[error("async queue closed: command={name}")]
    QueueClosed { name: &'static str },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
