//! User accounts service
//!
//! Registration, credential verification and account deletion. The
//! "exactly one credential" invariant is carried by the [`Credential`]
//! enum; this service decides which variant a new account gets.

use crate::config::MIN_PASSWORD_LENGTH;
use crate::crypto;
use crate::database::{Credential, ExternalIdentity, RegisterUserRequest, Repository, User};
use crate::error::{AppError, Result};

/// Service for managing user accounts
#[derive(Clone)]
pub struct UserService {
    repo: Repository,
}

impl UserService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Register a local-password account.
    pub async fn register(&self, req: RegisterUserRequest) -> Result<User> {
        let email = req.email.trim().to_lowercase();
        let name = req.name.trim().to_string();

        validate_email(&email)?;
        if name.is_empty() {
            return Err(AppError::validation("name", "can't be blank"));
        }
        if req.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation("password", "is too short"));
        }

        let password_digest = crypto::hash_password(&req.password)?;

        let user = self
            .repo
            .create_user(&email, &name, Credential::Local { password_digest })
            .await?;

        tracing::info!("Registered user: {}", user.id);
        Ok(user)
    }

    /// Look up an account by external identity, creating it on first
    /// sign-in with the profile the identity provider handed over.
    pub async fn find_or_create_external(&self, identity: ExternalIdentity) -> Result<User> {
        if let Some(user) = self
            .repo
            .find_user_by_identity(&identity.provider, &identity.uid)
            .await?
        {
            return Ok(user);
        }

        let email = identity.email.trim().to_lowercase();
        validate_email(&email)?;

        let user = self
            .repo
            .create_user(
                &email,
                identity.name.trim(),
                Credential::External {
                    provider: identity.provider,
                    uid: identity.uid,
                },
            )
            .await?;

        tracing::info!("Created user from external identity: {}", user.id);
        Ok(user)
    }

    /// Check a local credential. `Ok(None)` covers unknown email, an
    /// external-identity account, and a wrong password alike; callers
    /// get no signal about which it was.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            return Ok(None);
        };

        match &user.credential {
            Credential::Local { password_digest } => {
                if crypto::verify_password(password, password_digest) {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            Credential::External { .. } => Ok(None),
        }
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.repo.get_user(id).await
    }

    /// Delete an account and everything it owns.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting account: {}", id);
        self.repo.delete_user(id).await
    }
}

/// Minimal structural email check: one `@`, a non-empty local part, and
/// a dotted domain. Deliverability is the mail system's problem.
fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::validation("email", "is invalid"))
    }
}
