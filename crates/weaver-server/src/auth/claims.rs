//! JWT claims embedded in host access tokens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (host ID).
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Token type, always "host" for tokens minted here.
    pub token_type: String,
}

impl Claims {
    pub fn is_host(&self) -> bool {
        self.token_type == "host"
    }
}
