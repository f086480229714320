//! Decides whether submitted settings may replace the active ones.

use crate::domain::ports::{AuthClient, CredentialCache};
use crate::domain::settings::{Credentials, Settings};
use crate::utils::error::CredentialError;

/// Where a settings submission ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Unvalidated,
    Accepted,
    RolledBackToDefault,
    Rejected,
}

impl ValidationState {
    pub fn of(result: &Result<Settings, CredentialError>) -> Self {
        match result {
            Ok(_) => ValidationState::Accepted,
            Err(CredentialError::RolledBackToDefault { .. }) => {
                ValidationState::RolledBackToDefault
            }
            Err(_) => ValidationState::Rejected,
        }
    }
}

/// Validates `submitted` against the active `current` settings.
///
/// Returns the full submitted record when it may be persisted. The validator
/// never logs; callers record rejections themselves.
pub async fn validate<A, C>(
    current: &Settings,
    submitted: Settings,
    auth: &A,
    cache: &C,
) -> Result<Settings, CredentialError>
where
    A: AuthClient + ?Sized,
    C: CredentialCache + ?Sized,
{
    if !auth.is_current_authenticated().await {
        if current.credentials.is_default() {
            let mut settings = submitted;
            settings.credentials = Credentials::default_pair();
            return Err(CredentialError::RolledBackToDefault {
                settings: Box::new(settings),
            });
        }

        cache.invalidate();
        return Err(CredentialError::NotAuthenticated);
    }

    if submitted.credentials != current.credentials
        && !auth.is_new_authenticated(&submitted.credentials).await
    {
        return Err(CredentialError::IncorrectAccountDetails);
    }

    Ok(submitted)
}
