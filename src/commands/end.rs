use crate::session::{self, SignalError, WELL_KNOWN_NAMES};

/// Signal every running session. Fails only if none was running.
pub fn end() -> Result<(), SignalError> {
    let mut not_found = None;
    let mut ended = 0;

    for name in WELL_KNOWN_NAMES {
        match session::signal(name) {
            Ok(()) => {
                tracing::info!(name, "session signalled");
                ended += 1;
            }
            Err(err @ SignalError::SignalNotFound { .. }) => {
                not_found.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }

    match not_found {
        Some(err) if ended == 0 => Err(err),
        _ => Ok(()),
    }
}
