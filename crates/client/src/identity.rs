use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use uuid::Uuid;

use tenderbid_core::{Role, UserProfile};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid bootstrap token: {0}")]
    InvalidToken(String),
    #[error("sign-in rejected: {0}")]
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSession {
    pub user: UserProfile,
    pub anonymous: bool,
}

/// Published through a `tokio::sync::watch` channel on the session so the UI
/// can react to session establishment and loss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(UserProfile),
}

/// The identity collaborator, consumed only through this contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_anonymous(&self) -> Result<AuthSession, AuthError>;
    async fn sign_in_with_token(&self, token: &str) -> Result<AuthSession, AuthError>;
}

/// Signs in with the bootstrap token when one is configured, falling back
/// once to anonymous sign-in if the token is rejected. A failed anonymous
/// sign-in is terminal; the caller gets the error and no session exists.
pub async fn establish_session(
    provider: &dyn IdentityProvider,
    token: Option<&SecretString>,
) -> Result<AuthSession, AuthError> {
    if let Some(token) = token {
        match provider.sign_in_with_token(token.expose_secret()).await {
            Ok(session) => return Ok(session),
            Err(error) => {
                tracing::warn!(
                    event_name = "auth.token_rejected",
                    error = %error,
                    "bootstrap token rejected, falling back to anonymous sign-in"
                );
            }
        }
    }

    provider.sign_in_anonymous().await
}

/// Reference identity adapter. Bootstrap tokens have the shape
/// `uid:{id}:{role}:{name}` with role `client` or `contractor`; anonymous
/// sign-in mints a fresh guest profile.
pub struct LocalIdentityProvider {
    anonymous_role: Role,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self { anonymous_role: Role::Client }
    }

    pub fn with_anonymous_role(anonymous_role: Role) -> Self {
        Self { anonymous_role }
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_anonymous(&self) -> Result<AuthSession, AuthError> {
        let id = Uuid::new_v4().to_string();
        Ok(AuthSession {
            user: UserProfile::new(id, "Guest", self.anonymous_role),
            anonymous: true,
        })
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<AuthSession, AuthError> {
        let mut parts = token.splitn(4, ':');
        let (prefix, id, role, name) =
            (parts.next(), parts.next(), parts.next(), parts.next());

        let (Some("uid"), Some(id), Some(role), Some(name)) = (prefix, id, role, name) else {
            return Err(AuthError::InvalidToken(
                "expected `uid:{id}:{role}:{name}`".to_string(),
            ));
        };
        if id.is_empty() || name.is_empty() {
            return Err(AuthError::InvalidToken("id and name must be non-empty".to_string()));
        }

        let role = match role {
            "client" => Role::Client,
            "contractor" => Role::Contractor,
            other => {
                return Err(AuthError::InvalidToken(format!(
                    "unknown role `{other}` (expected client|contractor)"
                )))
            }
        };

        Ok(AuthSession {
            user: UserProfile::new(id, name, role),
            anonymous: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use tenderbid_core::Role;

    use super::{establish_session, AuthError, IdentityProvider, LocalIdentityProvider};

    #[tokio::test]
    async fn token_sign_in_builds_the_profile_from_the_token() {
        let provider = LocalIdentityProvider::new();
        let session = provider
            .sign_in_with_token("uid:client-7:client:Asha")
            .await
            .expect("valid token");

        assert_eq!(session.user.id.0, "client-7");
        assert_eq!(session.user.name, "Asha");
        assert_eq!(session.user.role, Role::Client);
        assert!(!session.anonymous);
    }

    #[tokio::test]
    async fn malformed_tokens_are_rejected() {
        let provider = LocalIdentityProvider::new();
        for token in ["", "uid:only-id", "uid:x:admin:Y", "token:client-7:client:Asha"] {
            let error = provider.sign_in_with_token(token).await.expect_err(token);
            assert!(matches!(error, AuthError::InvalidToken(_)), "token `{token}`");
        }
    }

    #[tokio::test]
    async fn rejected_token_falls_back_to_anonymous_exactly_once() {
        let provider = LocalIdentityProvider::with_anonymous_role(Role::Contractor);
        let token = SecretString::from("not-a-token".to_string());

        let session = establish_session(&provider, Some(&token)).await.expect("fallback");
        assert!(session.anonymous);
        assert_eq!(session.user.role, Role::Contractor);
        assert_eq!(session.user.name, "Guest");
    }

    #[tokio::test]
    async fn no_token_goes_straight_to_anonymous() {
        let provider = LocalIdentityProvider::new();
        let session = establish_session(&provider, None).await.expect("anonymous");
        assert!(session.anonymous);
    }
}
