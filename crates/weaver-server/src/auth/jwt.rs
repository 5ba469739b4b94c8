//! Access token issuance and validation.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use weaver_core::unix_timestamp;

use super::claims::Claims;

/// Signs and validates host access tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8], token_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl_secs,
        }
    }

    /// Issue an access token for the given host, returning the token and
    /// its expiry timestamp.
    pub fn issue_host_token(
        &self,
        host_id: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let exp = now + self.token_ttl_secs;

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: host_id.to_string(),
            iat: now,
            exp,
            token_type: "host".to_string(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, exp))
    }

    /// Validate a token and return its claims. Expired tokens fail here.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}
