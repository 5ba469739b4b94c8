//! Authentication for the control plane.
//!
//! Covers host credential hashing, one-time key digests, access token
//! issuance/validation, and the static operator keyring.

pub mod claims;
pub mod credential;
pub mod jwt;
pub mod operator;

pub use claims::Claims;
pub use jwt::JwtManager;
pub use operator::OperatorKeyring;
