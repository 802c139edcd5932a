//! The toggle primitive behind like/unlike and subscribe/unsubscribe.
//!
//! One call flips the existence of a relation record: present becomes absent,
//! absent becomes present. The storage schema declares a uniqueness
//! constraint on every relation tuple, so when two concurrent toggles both
//! observe "absent", exactly one insert wins; the loser's constraint failure
//! is interpreted as "the relation now exists" and resolved as a removal.

use serde::Serialize;

use crate::error::ApiResult;

/// Which side of the toggle this call landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// Runs one toggle over storage closures.
///
/// `exists` reports whether the relation is currently present, `insert`
/// returns `false` when a uniqueness constraint rejected the row, and
/// `delete` removes the relation if present. Exactly one relation record is
/// created or destroyed per call, nothing else.
pub fn toggle_relation<E, I, D>(exists: E, insert: I, delete: D) -> ApiResult<ToggleOutcome>
where
    E: FnOnce() -> ApiResult<bool>,
    I: FnOnce() -> ApiResult<bool>,
    D: FnOnce() -> ApiResult<bool>,
{
    if exists()? {
        delete()?;
        return Ok(ToggleOutcome::Removed);
    }
    if insert()? {
        return Ok(ToggleOutcome::Added);
    }
    // Lost the insert race: a concurrent toggle created the relation after
    // our existence check. Treat it as present and remove it.
    delete()?;
    Ok(ToggleOutcome::Removed)
}
