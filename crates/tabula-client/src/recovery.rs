//! Bad-session recovery.
//!
//! Every operation whose response is interpreted against [`SessionState`]
//! runs through [`recover_bad_session`]. When the server says the session is
//! gone, the state is reset *before* the error reaches the caller, so a retry
//! layer that catches it can start a brand-new session with no residue of the
//! old one. Every other failure passes through untouched.
//!
//! ```text
//! op(state) ──Ok(t)──────────────────────────────▶ Ok(t)
//!     │
//!     ├──Err(e), classifier(e) == bad session ──▶ state.reset(); Err(e)
//!     │
//!     └──Err(e), anything else ─────────────────▶ Err(e)
//! ```

use std::fmt;

use tracing::warn;

use crate::error::SessionError;
use crate::state::SessionState;

/// Run `op` against `state`, resetting the state exactly once if the failure
/// is classified as a bad session.
pub fn recover_with<T, E, C, F>(state: &mut SessionState, is_bad_session: C, op: F) -> Result<T, E>
where
    E: fmt::Display,
    C: Fn(&E) -> bool,
    F: FnOnce(&mut SessionState) -> Result<T, E>,
{
    match op(state) {
        Err(e) if is_bad_session(&e) => {
            warn!(
                "Session {:?} invalidated by server, resetting: {}",
                state.session_id().map(|s| s.short().to_string()),
                e
            );
            state.reset();
            Err(e)
        }
        other => other,
    }
}

/// [`recover_with`] using [`SessionError::is_bad_session`].
pub fn recover_bad_session<T, F>(state: &mut SessionState, op: F) -> Result<T, SessionError>
where
    F: FnOnce(&mut SessionState) -> Result<T, SessionError>,
{
    recover_with(state, SessionError::is_bad_session, op)
}
