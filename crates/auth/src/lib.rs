//! `backhouse-auth` — credential and session-lifecycle subsystem.
//!
//! Issues short-lived access credentials and longer-lived renewal credentials,
//! verifies them on every protected request, enforces role-based authorization,
//! and handles explicit revocation (logout) and renewal (refresh).
//!
//! The crate is decoupled from HTTP and storage: stores are reached through the
//! [`RevocationStore`] and [`RenewalSlotStore`] ports, injected at construction.

pub mod claims;
pub mod context;
pub mod gate;
pub mod issuer;
pub mod password;
pub mod renewal;
pub mod revocation;
pub mod roles;
pub mod verifier;

pub use claims::{AccessClaims, CredentialStanding, RenewalClaims, TimeWindowError, validate_window};
pub use context::AuthorizationContext;
pub use gate::{GateError, Permission, require, role_permissions};
pub use issuer::{CredentialConfig, CredentialIssuer, CredentialPair, IssueError};
pub use password::{PasswordHashError, hash_password, verify_password};
pub use renewal::{RenewalError, RenewalRegistry, RenewalSlot, RenewalSlotStore, SlotStoreError, renewal_digest};
pub use revocation::{RevocationStore, RevocationStoreError};
pub use roles::Role;
pub use verifier::{CredentialVerifier, VerifyError};
