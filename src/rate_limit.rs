// Temporal gates: Throttle (leading edge, drop the rest) and Debounce (trailing edge, last wins).
// Both use tokio's clock so tests can drive them with a paused runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// First request in a window passes; requests inside the window are dropped (not queued).
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true and opens a new window if the previous one has elapsed.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = lock(&self.last_fired);
        let open = last.is_none_or(|t| now.duration_since(t) >= self.interval);
        if open {
            *last = Some(now);
        }
        open
    }

    /// Runs `f` if the gate is open.
    pub fn call<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if self.try_acquire() { Some(f()) } else { None }
    }

    pub fn reset(&self) {
        *lock(&self.last_fired) = None;
    }
}

type Handler<A> = Arc<dyn Fn(A) + Send + Sync>;

struct DebounceState {
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Delays the handler until `interval` passes with no further request; only the last
/// request's argument is delivered. One timer in flight at a time.
pub struct Debounce<A> {
    interval: Duration,
    handler: Handler<A>,
    state: Arc<Mutex<DebounceState>>,
}

impl<A: Send + 'static> Debounce<A> {
    pub fn new(interval: Duration, handler: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            interval,
            handler: Arc::new(handler),
            state: Arc::new(Mutex::new(DebounceState {
                generation: 0,
                timer: None,
            })),
        }
    }

    /// Restarts the timer with `args`. Must be called from within a tokio runtime.
    pub fn call(&self, args: A) {
        self.schedule(self.interval, args);
    }

    /// Like [`call`](Self::call) but with a one-off delay.
    pub fn call_after(&self, delay: Duration, args: A) {
        self.schedule(delay, args);
    }

    fn schedule(&self, delay: Duration, args: A) {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let handler = self.handler.clone();
        let shared = self.state.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = lock(&shared);
                // A newer request (or cancel) superseded this timer while it was waking.
                if state.generation != generation {
                    return;
                }
                state.timer = None;
            }
            handler(args);
        }));
    }

    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).timer.is_some()
    }
}

impl<A> Drop for Debounce<A> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}
