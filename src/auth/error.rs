use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Your account is inactive. Please contact support.")]
    InactiveAccount,
    #[error("An account with this email already exists.")]
    DuplicateEmail,
    #[error("{0}")]
    Validation(String),
    #[error("Registration failed. Please try again later.")]
    Storage,
    #[error("Unable to start a session. Please try again.")]
    SessionStore(anyhow::Error),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthError::Validation(msg.into())
    }
}
