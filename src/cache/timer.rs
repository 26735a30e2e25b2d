//! Armed Timer Module
//!
//! Value object describing a one-shot timer spawned on the tokio runtime.
//! Remaining time is computed from the recorded arm instant and duration,
//! never by inspecting the runtime's timer internals.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

// == Armed Timer ==
/// A one-shot timer: sleeps for `duration`, then runs its callback.
#[derive(Debug, Clone)]
pub struct ArmedTimer {
    /// Instant the timer was armed at
    armed_at: Instant,
    /// Delay between arming and firing
    duration: Duration,
    /// Handle used to cancel the pending task
    handle: AbortHandle,
}

impl ArmedTimer {
    // == Constructor ==
    /// Spawns `callback` to run after `duration` on the current tokio runtime.
    ///
    /// Returns `None` when called outside of a runtime.
    pub fn try_spawn<F>(duration: Duration, callback: F) -> Option<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().ok()?;
        let armed_at = Instant::now();

        let task = runtime.spawn(async move {
            tokio::time::sleep_until(armed_at + duration).await;
            callback.await;
        });

        Some(Self {
            armed_at,
            duration,
            handle: task.abort_handle(),
        })
    }

    // == Accessors ==
    pub fn armed_at(&self) -> Instant {
        self.armed_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Instant at which the timer fires.
    pub fn deadline(&self) -> Instant {
        self.armed_at + self.duration
    }

    // == Remaining ==
    /// Time left before the timer fires, as seen at `now`. Zero once elapsed.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }

    /// Time left before the timer fires.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    // == Cancel ==
    /// Aborts the pending task. Has no effect once the callback completed.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl PartialEq for ArmedTimer {
    fn eq(&self, other: &Self) -> bool {
        self.armed_at == other.armed_at && self.duration == other.duration
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_spawn_outside_runtime() {
        let timer = ArmedTimer::try_spawn(Duration::from_secs(1), async {});
        assert!(timer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_is_pure_function_of_clock() {
        let timer = ArmedTimer::try_spawn(Duration::from_secs(10), async {}).unwrap();
        let armed_at = timer.armed_at();

        assert_eq!(timer.remaining_at(armed_at), Duration::from_secs(10));
        assert_eq!(
            timer.remaining_at(armed_at + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            timer.remaining_at(armed_at + Duration::from_secs(30)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let timer = ArmedTimer::try_spawn(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(timer.remaining(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let timer = ArmedTimer::try_spawn(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        timer.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!fired.load(Ordering::SeqCst));
    }
}
