//! `storefront-auth`: authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! hash passwords, mint/verify tokens and decide permissions, nothing more.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError};
pub use claims::{JwtClaims, TokenKind, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator, TokenPair};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{permissions_for, Permission};
pub use principal::Principal;
pub use roles::Role;
pub use user::{normalize_email, NewUser, User, UserPatch};
