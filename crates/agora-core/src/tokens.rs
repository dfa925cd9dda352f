use base64::{Engine, engine::general_purpose::STANDARD as B64};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;

use agora_types::api::Claims;
use agora_types::models::Role;

use crate::Result;

pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 20;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Issues and validates HS256 access tokens. The configured issuer is used
/// as both `iss` and `aud`.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
        }
    }

    pub fn issue(&self, user_id: i64, username: &str, email: &str, role: Role) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            email: email.to_string(),
            role,
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
            exp: (Utc::now() + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.decode(token, self.validation())
    }

    /// Signature, issuer and audience are still checked. Used by the
    /// refresh flow, where the access token has normally expired.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Result<Claims> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        self.decode(token, validation)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.issuer]);
        validation
    }

    fn decode(&self, token: &str, validation: Validation) -> Result<Claims> {
        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation)?;
        Ok(data.claims)
    }
}

/// 32 random bytes, base64 encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    B64.encode(bytes)
}
