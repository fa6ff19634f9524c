use thiserror::Error;

/// Domain failures surfaced to clients. The `Display` strings are the exact
/// single-line wire replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Username already exists.")]
    DuplicateUser,

    #[error("List with code {0} already exists.")]
    ListExists(String),

    #[error("List with code {0} not found.")]
    ListNotFound(String),

    #[error("You are already a member.")]
    AlreadyMember,

    #[error("You are not a member of list {0}.")]
    NotAMember(String),

    #[error("Task {0} not found.")]
    TaskNotFound(String),

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Usage: ADD \"task text\"")]
    EmptyText,
}
