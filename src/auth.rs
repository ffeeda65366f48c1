use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Caller identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    /// Parsed but not enforced: any valid token may read every report.
    pub app_role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    app_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    email: String,
    #[serde(default)]
    app_metadata: AppMetadata,
}

/// Verifies HMAC-signed bearer tokens against a shared secret.
pub struct Authenticator {
    key: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, headers: &HeaderMap) -> Result<Identity, AppError> {
        let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

        let decoded = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("rejected access token: {}", e);
            AppError::Unauthorized
        })?;

        Ok(Identity {
            email: decoded.claims.email,
            app_role: decoded.claims.app_metadata.app_role,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = state.auth.verify(request.headers())?;
    debug!("{} {} requested by {}", request.method(), request.uri().path(), identity.email);

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &[u8], alg: Algorithm, exp: i64) -> String {
        let claims = serde_json::json!({
            "sub": "0d4a",
            "aud": "authenticated",
            "email": "admin@school.example",
            "exp": exp,
            "app_metadata": { "app_role": "Admin" }
        });
        encode(&Header::new(alg), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn accepts_valid_token_and_extracts_identity() {
        let auth = Authenticator::new(b"secret");
        let value = format!("Bearer {}", token(b"secret", Algorithm::HS256, future()));

        let identity = auth.verify(&headers(&value)).unwrap();
        assert_eq!(identity.email, "admin@school.example");
        assert_eq!(identity.app_role.as_deref(), Some("Admin"));
    }

    #[test]
    fn accepts_other_hmac_variants() {
        let auth = Authenticator::new(b"secret");
        let value = format!("Bearer {}", token(b"secret", Algorithm::HS512, future()));
        assert!(auth.verify(&headers(&value)).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let auth = Authenticator::new(b"secret");
        let value = format!("Bearer {}", token(b"other", Algorithm::HS256, future()));
        assert!(matches!(auth.verify(&headers(&value)), Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_expired_token() {
        let auth = Authenticator::new(b"secret");
        let value = format!("Bearer {}", token(b"secret", Algorithm::HS256, 1_000_000_000));
        assert!(matches!(auth.verify(&headers(&value)), Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let auth = Authenticator::new(b"secret");
        assert!(matches!(auth.verify(&HeaderMap::new()), Err(AppError::Unauthorized)));
        assert!(matches!(auth.verify(&headers("Basic abc")), Err(AppError::Unauthorized)));
        assert!(matches!(auth.verify(&headers("Bearer ")), Err(AppError::Unauthorized)));
        assert!(matches!(auth.verify(&headers("Bearer not.a.jwt")), Err(AppError::Unauthorized)));
    }
}
