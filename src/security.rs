//! Process-level guards for the cliptube binary.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Refuses to start when invoked as root. The backend is meant to run under
/// its dedicated unprivileged service account; serving user uploads as root
/// is never intended.
pub fn ensure_not_root(process: &str) -> Result<()> {
    if Uid::current().is_root() {
        bail!("{process} must not run as root; use the cliptube service account");
    }
    Ok(())
}
