use thiserror::Error;

/// Errors from owner-only registry operations.
///
/// An unknown or already consumed token is not an error: it is an ordinary
/// rejection, indistinguishable from any other unauthorized event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing or non-numeric chat id argument.
    #[error("invalid chat id argument: {0:?}")]
    InvalidArgument(Option<String>),

    /// The chat's session is running a command or editing a file.
    #[error("chat {0} has an operation in progress")]
    OperationInProgress(i64),

    /// The caller is not acting as the owner.
    #[error("caller is not the owner")]
    Unauthorized,

    /// The owner is authorized by identity and cannot be revoked.
    #[error("the owner cannot be revoked")]
    OwnerUnrevokable,
}
