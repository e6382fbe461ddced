use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::RefreshRejected;

/// Wall-clock throttle for user-initiated refreshes. Requests inside the
/// cooldown are rejected, never queued.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    cooldown: Duration,
    last: Option<DateTime<Utc>>,
}

impl RefreshGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
        }
    }

    /// Record a refresh at `now`, or report how long until one is allowed.
    /// A clock that moved backwards counts as the cooldown having passed.
    pub fn try_begin(&mut self, now: DateTime<Utc>) -> Result<(), RefreshRejected> {
        if let Some(last) = self.last {
            if let Ok(elapsed) = (now - last).to_std() {
                if elapsed < self.cooldown {
                    return Err(RefreshRejected {
                        retry_in: self.cooldown - elapsed,
                    });
                }
            }
        }
        self.last = Some(now);
        Ok(())
    }
}
