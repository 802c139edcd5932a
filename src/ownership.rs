//! Actor identity and the ownership gate guarding every mutation.
//!
//! The identity provider authenticates requests upstream and hands us an
//! actor id; nothing here re-verifies credentials. What this module does
//! enforce is that the gate runs before any patch is applied, so a rejected
//! mutation can never leave partial state behind.

use std::fmt;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Identity of the authenticated user performing a request. Always passed
/// explicitly into service calls, never read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorId(String);

impl ActorId {
    /// Validates that the raw header value is a well-formed entity id.
    pub fn parse(raw: &str) -> ApiResult<Self> {
        Uuid::parse_str(raw)
            .map_err(|_| ApiError::invalid(format!("malformed actor id {raw:?}")))?;
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entities whose mutations are gated on an immutable owner field.
pub trait Owned {
    const KIND: &'static str;

    fn entity_id(&self) -> &str;
    fn owner_id(&self) -> &str;
}

/// Fails with `Forbidden` unless `actor` owns the entity. Callers must run
/// this before touching any field of the entity.
pub fn authorize_owner<T: Owned>(entity: &T, actor: &ActorId) -> ApiResult<()> {
    if entity.owner_id() != actor.as_str() {
        return Err(ApiError::forbidden(T::KIND, entity.entity_id()));
    }
    Ok(())
}

/// Returns `trimmed` content for required text fields, rejecting blank input.
pub fn require_text(field: &'static str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_owned())
}

/// Partial-update policy: blank or missing strings leave the stored value
/// untouched instead of overwriting it with nothing.
pub fn patch_text(current: &mut String, candidate: Option<&str>) -> bool {
    match candidate {
        Some(value) if !value.trim().is_empty() => {
            *current = value.trim().to_owned();
            true
        }
        _ => false,
    }
}

/// Validates a path/body entity id before it reaches storage.
pub fn validate_id(kind: &'static str, raw: &str) -> ApiResult<()> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::invalid(format!("malformed {kind} id {raw:?}")))?;
    Ok(())
}
