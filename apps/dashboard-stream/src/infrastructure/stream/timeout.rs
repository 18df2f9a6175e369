//! Connection Timeout Guard
//!
//! A one-shot deadline armed when a connection attempt starts. If the
//! attempt has not reached `Open` by the deadline the guard fires and the
//! stream client treats the attempt as a timeout failure. Disarming and
//! firing race through a single atomic transition, so a guard that has
//! been disarmed can never fire afterwards.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const ARMED: u8 = 0;
const DISARMED: u8 = 1;
const FIRED: u8 = 2;

/// One-shot timeout for a single connection attempt.
#[derive(Debug)]
pub struct ConnectionTimeoutGuard {
    deadline: Instant,
    duration: Duration,
    state: AtomicU8,
    disarmed: CancellationToken,
}

impl ConnectionTimeoutGuard {
    /// Arm a guard expiring `duration` from now.
    #[must_use]
    pub fn arm(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
            duration,
            state: AtomicU8::new(ARMED),
            disarmed: CancellationToken::new(),
        }
    }

    /// Disarm the guard.
    ///
    /// Returns `true` if this call won against expiry (the guard was still
    /// armed), `false` if it had already fired or been disarmed.
    pub fn disarm(&self) -> bool {
        let won = self
            .state
            .compare_exchange(ARMED, DISARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.disarmed.cancel();
        won
    }

    /// Resolve when the guard fires. Never resolves once disarmed.
    pub async fn expired(&self) {
        tokio::select! {
            biased;
            () = self.disarmed.cancelled() => {}
            () = tokio::time::sleep_until(self.deadline) => {
                if self
                    .state
                    .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return;
                }
            }
        }
        std::future::pending::<()>().await;
    }

    /// Whether the guard is still waiting for its deadline.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.load(Ordering::Acquire) == ARMED
    }

    /// Whether the guard fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// The configured timeout.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for ConnectionTimeoutGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}
