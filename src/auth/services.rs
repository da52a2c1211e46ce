use thiserror::Error;
use tracing::{debug, warn};

use super::{
    dto::{LoginResponse, PublicUser},
    jwt::JwtKeys,
    password::verify_password,
};
use crate::{
    error::AppError,
    users::{repo::UserRepository, repo_types::SafeUser},
};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The account exists but was deactivated. Raised before the password
    /// is compared.
    #[error("account deactivated")]
    AccountDeactivated,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AccountDeactivated => AppError::Unauthorized,
            AuthError::Internal(e) => AppError::Internal(e),
        }
    }
}

/// Check `email`/`password` against the stored digest.
///
/// `Ok(None)` covers both an unknown email and a wrong password.
pub async fn validate_user(
    repo: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<Option<SafeUser>, AuthError> {
    let Some(user) = repo.find_by_email(email).await? else {
        debug!("login unknown email");
        return Ok(None);
    };

    if !user.status {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AuthError::AccountDeactivated);
    }

    if !verify_password(&user.email, password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }

    Ok(Some(SafeUser::from(user)))
}

/// Issue a bearer token for an identity returned by [`validate_user`].
pub fn login(keys: &JwtKeys, user: SafeUser) -> anyhow::Result<LoginResponse> {
    let access_token = keys.sign(user.id, &user.email)?;
    Ok(LoginResponse {
        access_token,
        user: PublicUser::from(user),
    })
}
