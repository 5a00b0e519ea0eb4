use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("An account with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Administrator role required")]
    Forbidden,

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Cannot remove the last remaining administrator")]
    LastAdmin,

    #[error("Import rejected: {message}")]
    Import { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn email_already_exists(email: impl Into<String>) -> Self {
        Self::EmailAlreadyExists {
            email: email.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
