//! Token authentication and password handling for the Stockroom API.
//!
//! # Tokens
//!
//! Successful registration and login issue an HS256 JWT whose subject is the
//! user's email. Clients present it as `Authorization: Bearer <token>`.
//! Tokens expire after `auth.token_expiration_secs` (one hour by default).
//!
//! # Policy
//!
//! Which routes require a token is decided once, in
//! [`crate::server::routes::build_router`], by layering [`require_auth`] over
//! the protected routes. Handlers that want to know the caller take an
//! [`AuthenticatedUser`] argument, which reuses the identity the middleware
//! already verified.
//!
//! # Passwords
//!
//! Passwords are stored as Argon2id PHC strings with a per-user random salt
//! and are only ever compared through [`verify_password`].
//!
//! # Configuration
//!
//! - `STOCKROOM_JWT_SECRET` - Required secret key for HS256 signing
//! - `STOCKROOM_JWT_ISSUER` - Expected issuer claim (default: "stockroom")
//! - `STOCKROOM_JWT_AUDIENCE` - Expected audience claim (default: "stockroom-api")

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::errors::{StockroomError, StockroomResult};
use crate::server::api_error::{ApiError, ErrorCode};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (the user's email)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

/// Authenticated caller extracted from a verified JWT.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The subject from the JWT (the user's email)
    pub subject: String,
}

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Missing Authorization header
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader,
    /// Token validation failed
    InvalidToken(String),
    /// Token has expired
    TokenExpired,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "missing authorization token"),
            AuthError::InvalidHeader => write!(f, "invalid authorization header format"),
            AuthError::InvalidToken(msg) => write!(f, "invalid token: {msg}"),
            AuthError::TokenExpired => write!(f, "token has expired"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::MissingToken => ErrorCode::MissingToken,
            AuthError::InvalidHeader | AuthError::InvalidToken(_) => ErrorCode::InvalidToken,
            AuthError::TokenExpired => ErrorCode::TokenExpired,
        };
        ApiError::with_message(code, err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// JWT validator for token issuing and verification.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    expiration_secs: u64,
}

impl JwtValidator {
    /// Create a new JWT validator from auth configuration.
    pub fn from_config(config: &AuthConfig) -> StockroomResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(StockroomError::ConfigError(
                "jwt_secret is required for JWT authentication".to_string(),
            ));
        }

        // Resolve secret (support env: prefix for environment variable)
        let secret = if let Some(env_var) = config.jwt_secret.strip_prefix("env:") {
            std::env::var(env_var).map_err(|_| {
                StockroomError::ConfigError(format!(
                    "environment variable '{env_var}' not found for jwt_secret"
                ))
            })?
        } else {
            config.jwt_secret.clone()
        };

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);
        validation.validate_exp = true;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiration_secs: config.token_expiration_secs,
        })
    }

    /// Validate a JWT token and extract claims.
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
    }

    /// Create a new JWT token for the given subject.
    pub fn create_token(&self, subject: &str) -> StockroomResult<String> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StockroomError::ServerError(format!("system time error: {e}")))?
            .as_secs();

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.expiration_secs,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| StockroomError::AuthError(format!("failed to create token: {e}")))
    }

    /// Token lifetime in seconds.
    pub fn expiration_secs(&self) -> u64 {
        self.expiration_secs
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

/// Authentication state shared by the router.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub validator: Arc<JwtValidator>,
}

impl AuthState {
    /// Create auth state from configuration.
    pub fn from_config(config: &AuthConfig) -> StockroomResult<Self> {
        let validator = JwtValidator::from_config(config)?;
        Ok(Self {
            validator: Arc::new(validator),
        })
    }
}

/// Axum extractor for authenticated requests.
///
/// Behind [`require_auth`] this returns the identity the middleware stored
/// in the request extensions; elsewhere it verifies the bearer token itself.
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let auth_state = AuthState::from_ref(state);

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get("Authorization")
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidHeader)?;

        // Parse Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidHeader)?;

        let claims = auth_state.validator.validate_token(token.trim())?.claims;

        Ok(AuthenticatedUser { subject: claims.sub })
    }
}

/// Middleware that rejects requests without a valid bearer token.
///
/// The verified identity is stored in the request extensions for handlers.
pub async fn require_auth(user: AuthenticatedUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Hash a password into an Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> StockroomResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StockroomError::AuthError(format!("failed to hash password: {e}")))
}

/// Check a claimed password against a stored PHC string.
///
/// An unparseable stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            jwt_issuer: "stockroom".to_string(),
            jwt_audience: "stockroom-api".to_string(),
            token_expiration_secs: 3600,
        }
    }

    #[test]
    fn create_and_validate_token() {
        let validator = JwtValidator::from_config(&test_config()).unwrap();

        let token = validator.create_token("ann@example.com").unwrap();

        let token_data = validator.validate_token(&token).unwrap();
        assert_eq!(token_data.claims.sub, "ann@example.com");
        assert_eq!(token_data.claims.exp - token_data.claims.iat, 3600);
    }

    #[test]
    fn reject_invalid_token() {
        let validator = JwtValidator::from_config(&test_config()).unwrap();

        let result = validator.validate_token("invalid-token");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn reject_wrong_secret() {
        let validator = JwtValidator::from_config(&test_config()).unwrap();
        let token = validator.create_token("ann@example.com").unwrap();

        let other_config = AuthConfig {
            jwt_secret: "different-secret".to_string(),
            ..test_config()
        };
        let other_validator = JwtValidator::from_config(&other_config).unwrap();

        assert!(other_validator.validate_token(&token).is_err());
    }

    #[test]
    fn reject_wrong_audience() {
        let validator = JwtValidator::from_config(&test_config()).unwrap();
        let token = validator.create_token("ann@example.com").unwrap();

        let other_config = AuthConfig {
            jwt_audience: "other-audience".to_string(),
            ..test_config()
        };
        let other_validator = JwtValidator::from_config(&other_config).unwrap();

        assert!(other_validator.validate_token(&token).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let config = test_config();
        let validator = JwtValidator::from_config(&config).unwrap();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let expired_claims = Claims {
            sub: "ann@example.com".to_string(),
            iat: now - 7200, // 2 hours ago
            exp: now - 3600, // 1 hour ago (expired)
            iss: config.jwt_issuer.clone(),
            aud: config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::default(),
            &expired_claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let result = validator.validate_token(&token);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn empty_secret_fails() {
        let config = AuthConfig {
            jwt_secret: "".to_string(),
            ..Default::default()
        };

        assert!(JwtValidator::from_config(&config).is_err());
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        use axum::http::StatusCode;

        for err in [
            AuthError::MissingToken,
            AuthError::InvalidHeader,
            AuthError::InvalidToken("bad".to_string()),
            AuthError::TokenExpired,
        ] {
            assert_eq!(ApiError::from(err).status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn extractor_reads_subject_from_bearer_token() {
        let state = AuthState::from_config(&test_config()).unwrap();
        let token = state.validator.create_token("ann@example.com").unwrap();

        let (mut parts, _) = axum::http::Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts();
        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.subject, "ann@example.com");

        let (mut parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();
        let result = AuthenticatedUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct horse"));
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "plain-text-password"));
    }
}
