//! Validated value objects: equality by value, invalid states unrepresentable.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

// ─────────────────────────────────────────────────────────────────────────────
// Email Address
// ─────────────────────────────────────────────────────────────────────────────

/// A structurally valid, lowercased email address.
///
/// Validation is intentionally structural (local part, `@`, dotted domain)
/// rather than a full RFC 5321 grammar; deliverability is not a domain concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let candidate = raw.trim().to_lowercase();

        let Some((local, domain)) = candidate.split_once('@') else {
            return Err(DomainError::validation("email must contain '@'"));
        };

        if local.is_empty() || !local.chars().all(is_email_atom_char) {
            return Err(DomainError::validation("invalid email local part"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        let labels_ok = labels.len() >= 2
            && labels.iter().all(|l| {
                !l.is_empty()
                    && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                    && !l.starts_with('-')
                    && !l.ends_with('-')
            });
        if !labels_ok {
            return Err(DomainError::validation("invalid email domain"));
        }

        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_email_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+')
}

// ─────────────────────────────────────────────────────────────────────────────
// Password
// ─────────────────────────────────────────────────────────────────────────────

/// A plaintext password that has passed the complexity policy.
///
/// The policy: at least 8 characters with upper, lower, digit and symbol.
/// The contained secret never appears in `Debug` output or logs; only a
/// one-way hash of it is ever persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub const MIN_LEN: usize = 8;

    pub fn parse(raw: &str) -> DomainResult<Self> {
        if raw.chars().count() < Self::MIN_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {} characters",
                Self::MIN_LEN
            )));
        }

        let has_upper = raw.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = raw.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = raw.chars().any(|c| c.is_ascii_digit());
        let has_symbol = raw.chars().any(|c| !c.is_ascii_alphanumeric());

        if !(has_upper && has_lower && has_digit && has_symbol) {
            return Err(DomainError::validation(
                "password must include uppercase, lowercase, digit and symbol",
            ));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
