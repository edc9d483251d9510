//! Error types for the ledger engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TripError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Guard rejected operation: {0}")]
    Guard(#[from] GuardError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Expense title is missing")]
    MissingTitle,

    #[error("Expense amount is invalid: {value}")]
    InvalidAmount { value: String },

    #[error("Expense has no participants")]
    NoParticipants,

    #[error("Workspace name is missing")]
    MissingWorkspaceName,

    #[error("Workspace id is missing")]
    MissingWorkspaceId,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("No workspace is active")]
    NoActiveWorkspace,
}

#[derive(Debug, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("Network failure: {reason}")]
    Network { reason: String },

    #[error("Authentication failure: {reason}")]
    Auth { reason: String },

    #[error("Workspace not found: {id}")]
    NotFound { id: String },

    #[error("Chart surface failure: {reason}")]
    Chart { reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum GuardError {
    #[error("Root admin {email} cannot be revoked")]
    RootAdminProtected { email: String },

    #[error("Confirmation token did not match")]
    ConfirmationMismatch,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State fingerprint failed: {reason}")]
    FingerprintFailed { reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config could not be read from {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Config is malformed: {reason}")]
    Malformed { reason: String },

    #[error("Config field {field} is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Required component not provided: {component}")]
    MissingComponent { component: String },
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Deserialization failed: {reason}")]
    DeserializationFailed { reason: String },
}
