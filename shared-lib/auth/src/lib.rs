//! Authentication and authorization library for the school services.
//!
//! Three pieces make up the access-control core:
//!
//! - [`TokenIssuer`] mints signed, time-bound credentials at login.
//! - [`TokenVerifier`] checks signature and expiry, then resolves the subject
//!   to a live [`Principal`] through a [`UserStore`].
//! - [`authorize`] decides allow/deny for a principal against an
//!   [`AccessPolicy`]. It is pure and does no IO.
//!
//! HTTP extraction and status mapping are left to the caller.

mod claims;
mod issuer;
mod jwt;
pub mod password;
mod policy;
mod principal;
mod verifier;

pub use claims::{Claims, PrincipalId, Role, RoleFlags};
pub use issuer::{Credential, TokenIssuer};
pub use jwt::{decode_token, encode_token, JwtConfig, SigningKey, DEFAULT_EXPIRES_IN_SECS};
pub use policy::{authorize, AccessPolicy, Decision};
pub use principal::{Principal, Status, UserCredentials, UserRecord, UserStore};
pub use verifier::{lookup_with_timeout, TokenVerifier, DEFAULT_STORE_TIMEOUT};

pub use error::{AccessDenied, AuthError};
