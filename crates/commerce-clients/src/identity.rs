//! Identity Backend Client
//!
//! Sign-up and sign-in against the GraphQL identity API. The API returns a
//! custom database user id plus a bearer token; the auth-provider user id
//! the entitlement backend keys on lives in the token's `user_id`/`sub`
//! claim, so [`IdentityClient::decode_subject`] is the authoritative way to
//! recover it.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;

use commerce_core::Mode;

use crate::error::{ClientError, Result};

const SIGN_UP_MUTATION: &str = r"
mutation SignUp($email: String!, $password: String!, $firstName: String!) {
  signUp(input: { email: $email, password: $password, firstName: $firstName, startTrial: false }) {
    userId
    token
  }
}
";

const SIGN_IN_MUTATION: &str = r"
mutation SignIn($email: String!, $password: String!) {
  signIn(input: { email: $email, password: $password }) {
    userId
    token
    user {
      firstName
      lastName
      email
    }
  }
}
";

/// A successful sign-up or sign-in
#[derive(Clone, Debug)]
pub struct AuthSession {
    /// Custom database user id (not the auth-provider uid)
    pub user_id: String,
    /// Bearer token; its subject claim carries the auth-provider uid
    pub token: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Outcome of the create-or-sign-in flow used by entitlement granting
#[derive(Clone, Debug)]
pub struct EnsuredAccount {
    /// Auth-provider uid when the token decoded, else the db id or email
    pub user_id: String,
    pub account_created: bool,
    pub password: String,
    pub password_generated: bool,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubjectClaims {
    user_id: Option<String>,
    sub: Option<String>,
}

/// Client for the GraphQL identity API
pub struct IdentityClient {
    http: reqwest::Client,
    stage_url: String,
    live_url: String,
    jwt_public_key: Option<String>,
}

impl IdentityClient {
    pub fn new(
        http: reqwest::Client,
        stage_url: impl Into<String>,
        live_url: impl Into<String>,
        jwt_public_key: Option<String>,
    ) -> Self {
        Self {
            http,
            stage_url: stage_url.into(),
            live_url: live_url.into(),
            jwt_public_key,
        }
    }

    fn url(&self, mode: Mode) -> &str {
        match mode {
            Mode::Stage => &self.stage_url,
            Mode::Live => &self.live_url,
        }
    }

    async fn mutate(
        &self,
        mode: Mode,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse> {
        let response = self
            .http
            .post(self.url(mode))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        Ok(response.json::<GraphQlResponse>().await?)
    }

    /// Create a new account. Duplicate emails surface as `Conflict`.
    pub async fn sign_up(
        &self,
        mode: Mode,
        email: &str,
        password: &str,
        first_name: &str,
    ) -> Result<AuthSession> {
        let result = self
            .mutate(
                mode,
                SIGN_UP_MUTATION,
                json!({ "email": email, "password": password, "firstName": first_name }),
            )
            .await?;

        if let Some(errors) = result.errors {
            let message = errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Failed to create account".into());
            tracing::warn!(email, %message, "Sign-up rejected");
            if message.contains("already") || message.contains("exists") {
                return Err(ClientError::Conflict(message));
            }
            return Err(ClientError::Rejected(message));
        }

        Self::session_from(result.data, "signUp", email)
    }

    /// Sign in an existing account. Bad credentials surface as `Unauthorized`.
    pub async fn sign_in(&self, mode: Mode, email: &str, password: &str) -> Result<AuthSession> {
        let result = self
            .mutate(
                mode,
                SIGN_IN_MUTATION,
                json!({ "email": email, "password": password }),
            )
            .await?;

        if let Some(errors) = result.errors {
            let message = errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Failed to sign in".into());
            tracing::warn!(email, %message, "Sign-in rejected");
            if message.contains("Invalid") || message.contains("not found") {
                return Err(ClientError::Unauthorized(message));
            }
            return Err(ClientError::Rejected(message));
        }

        Self::session_from(result.data, "signIn", email)
    }

    fn session_from(
        data: Option<serde_json::Value>,
        operation: &str,
        email: &str,
    ) -> Result<AuthSession> {
        let payload = data
            .as_ref()
            .and_then(|d| d.get(operation))
            .cloned()
            .unwrap_or_default();

        let user_id = payload
            .get("userId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Provider("no user id returned".into()))?;

        let user = payload.get("user");
        let field = |name: &str| {
            user.and_then(|u| u.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Ok(AuthSession {
            user_id,
            token: payload
                .get("token")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            first_name: field("firstName"),
            last_name: field("lastName"),
            email: field("email").or_else(|| Some(email.to_string())),
        })
    }

    /// Extract the auth-provider uid from a bearer token.
    ///
    /// Verifies the signature when a public key is configured; otherwise
    /// decodes the payload without verification, which matches what the
    /// identity backend's own SDKs accept for this claim.
    pub fn decode_subject(&self, token: &str) -> Result<String> {
        let (key, validation) = match &self.jwt_public_key {
            Some(pem) => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| ClientError::Token(e.to_string()))?;
                (key, Validation::new(Algorithm::RS256))
            }
            None => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.algorithms = vec![Algorithm::RS256, Algorithm::HS256, Algorithm::ES256];
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims.clear();
                (DecodingKey::from_secret(&[]), validation)
            }
        };

        let decoded = jsonwebtoken::decode::<SubjectClaims>(token, &key, &validation)
            .map_err(|e| ClientError::Token(e.to_string()))?;

        decoded
            .claims
            .user_id
            .or(decoded.claims.sub)
            .ok_or_else(|| ClientError::Token("token carries no subject claim".into()))
    }

    /// Create an account for `email`, or sign in when it already exists.
    ///
    /// Best-effort by design: when neither works the email itself becomes
    /// the user id, so a grant can still proceed against the entitlement
    /// backend. Only transport failures propagate.
    pub async fn ensure_account(
        &self,
        mode: Mode,
        email: &str,
        password: Option<&str>,
        first_name: &str,
    ) -> Result<EnsuredAccount> {
        let password_generated = password.is_none();
        let password = password.map_or_else(generate_password, str::to_string);

        match self.sign_up(mode, email, &password, first_name).await {
            Ok(session) => Ok(EnsuredAccount {
                user_id: self.resolve_uid(&session),
                account_created: true,
                password,
                password_generated,
            }),
            Err(ClientError::Conflict(_)) => {
                tracing::info!(email, "Account exists, signing in to recover the user id");
                match self.sign_in(mode, email, &password).await {
                    Ok(session) => Ok(EnsuredAccount {
                        user_id: self.resolve_uid(&session),
                        account_created: false,
                        password,
                        password_generated,
                    }),
                    Err(ClientError::Http(e)) => Err(ClientError::Http(e)),
                    Err(e) => {
                        tracing::warn!(email, error = %e, "Sign-in failed, falling back to email as user id");
                        Ok(EnsuredAccount {
                            user_id: email.to_string(),
                            account_created: false,
                            password,
                            password_generated,
                        })
                    }
                }
            }
            Err(ClientError::Http(e)) => Err(ClientError::Http(e)),
            Err(e) => {
                tracing::warn!(email, error = %e, "Account creation failed, falling back to email as user id");
                Ok(EnsuredAccount {
                    user_id: email.to_string(),
                    account_created: false,
                    password,
                    password_generated,
                })
            }
        }
    }

    /// Prefer the token's subject over the custom db id
    fn resolve_uid(&self, session: &AuthSession) -> String {
        session
            .token
            .as_deref()
            .and_then(|t| self.decode_subject(t).ok())
            .unwrap_or_else(|| session.user_id.clone())
    }
}

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// Generate a 12-character password with at least one character from each
/// class, for accounts created on a customer's behalf after payment.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS]
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < 12 {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    fn client() -> IdentityClient {
        IdentityClient::new(
            reqwest::Client::new(),
            "https://identity.stage.test/graphql",
            "https://identity.live.test/graphql",
            None,
        )
    }

    #[derive(Serialize)]
    struct TestClaims {
        user_id: Option<String>,
        sub: Option<String>,
    }

    fn token(user_id: Option<&str>, sub: Option<&str>) -> String {
        let claims = TestClaims {
            user_id: user_id.map(str::to_string),
            sub: sub.map(str::to_string),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_subject_prefers_user_id_claim() {
        let t = token(Some("uid-123"), Some("db-456"));
        assert_eq!(client().decode_subject(&t).unwrap(), "uid-123");
    }

    #[test]
    fn test_decode_subject_falls_back_to_sub() {
        let t = token(None, Some("db-456"));
        assert_eq!(client().decode_subject(&t).unwrap(), "db-456");
    }

    #[test]
    fn test_decode_subject_rejects_garbage() {
        assert!(client().decode_subject("not-a-token").is_err());
    }

    #[test]
    fn test_generated_password_character_classes() {
        for _ in 0..50 {
            let p = generate_password();
            assert_eq!(p.len(), 12);
            assert!(p.bytes().any(|c| c.is_ascii_uppercase()));
            assert!(p.bytes().any(|c| c.is_ascii_lowercase()));
            assert!(p.bytes().any(|c| c.is_ascii_digit()));
            assert!(p.bytes().any(|c| SYMBOLS.contains(&c)));
        }
    }

    #[test]
    fn test_session_parsing_requires_user_id() {
        let data = serde_json::json!({ "signIn": { "token": "t" } });
        assert!(IdentityClient::session_from(Some(data), "signIn", "a@b.c").is_err());

        let data = serde_json::json!({
            "signIn": { "userId": "42", "token": "t", "user": { "firstName": "Ada" } }
        });
        let session = IdentityClient::session_from(Some(data), "signIn", "a@b.c").unwrap();
        assert_eq!(session.user_id, "42");
        assert_eq!(session.first_name.as_deref(), Some("Ada"));
        assert_eq!(session.email.as_deref(), Some("a@b.c"));
    }
}
