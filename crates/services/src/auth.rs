//! Cosmetic sign-in: a short delay and a display name. Not a security boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::Clock;
use crate::error::AuthError;

/// How long the sign-in "request" takes.
pub const DEFAULT_LOGIN_DELAY: Duration = Duration::from_millis(800);

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    display_name: String,
    email: String,
    signed_in_at: DateTime<Utc>,
}

impl UserSession {
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    clock: Clock,
    delay: Duration,
}

impl AuthService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            delay: DEFAULT_LOGIN_DELAY,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Accept any non-blank email/password pair after the configured delay.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` immediately for blank input.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let display_name = display_name_for(email);
        tracing::info!(user = %display_name, "signed in");
        Ok(UserSession {
            display_name,
            email: email.to_string(),
            signed_in_at: self.clock.now(),
        })
    }
}

/// The local part of an email address, or the whole input if there is none.
fn display_name_for(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.trim().is_empty() => local.trim().to_string(),
        _ => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinhoc_core::time::{fixed_clock, fixed_now};

    fn instant_auth() -> AuthService {
        AuthService::new(fixed_clock()).with_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn login_uses_email_local_part() {
        let session = instant_auth()
            .login("lan.nguyen@school.edu.vn", "secret")
            .await
            .unwrap();
        assert_eq!(session.display_name(), "lan.nguyen");
        assert_eq!(session.email(), "lan.nguyen@school.edu.vn");
        assert_eq!(session.signed_in_at(), fixed_now());
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let auth = instant_auth();
        assert_eq!(
            auth.login("  ", "secret").await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            auth.login("lan@school.edu.vn", "").await.unwrap_err(),
            AuthError::MissingCredentials
        );
    }

    #[tokio::test]
    async fn login_waits_for_the_delay() {
        let auth = AuthService::new(fixed_clock()).with_delay(Duration::from_millis(20));
        let started = std::time::Instant::now();
        auth.login("lan@school.edu.vn", "pw").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn display_name_without_at_sign() {
        assert_eq!(display_name_for("hocsinh"), "hocsinh");
        assert_eq!(display_name_for("@school.edu.vn"), "@school.edu.vn");
    }

    #[test]
    fn default_delay() {
        assert_eq!(AuthService::new(fixed_clock()).delay(), DEFAULT_LOGIN_DELAY);
    }
}
