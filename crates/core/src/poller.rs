//! Cancellable, timeout-bounded status polling.
//!
//! A [`StatusPoller`] repeatedly invokes a fetch function until it yields a
//! value, fails, runs out of time, or is cancelled:
//!
//! ```text
//! Idle --start()--> Polling --+--> Completed  (fetch returned Some, callback Ok)
//!                             +--> Failed     (fetch returned Err, callback Err)
//!                             +--> TimedOut   (deadline passed, callback Err(PollTimeout))
//!                             +--> Cancelled  (PollHandle::cancel, no callback)
//! ```
//!
//! The first fetch runs immediately on start; later fetches run once per
//! interval. Fetches are awaited inside the poll task, so a poller never has
//! more than one request in flight: a slow response pushes the next tick back
//! instead of stacking requests against the bridge.
//!
//! Terminal transitions are compare-and-set on shared state, so the callback
//! runs at most once and never after a successful cancel.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Default delay between two fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default overall time budget of a poller.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Lifecycle of a poller. Every state except `Idle` and `Polling` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
	Idle,
	Polling,
	Completed,
	TimedOut,
	Cancelled,
	Failed,
}

impl PollState {
	pub fn is_terminal(self) -> bool {
		!matches!(self, Self::Idle | Self::Polling)
	}
}

impl fmt::Display for PollState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Idle => "idle",
			Self::Polling => "polling",
			Self::Completed => "completed",
			Self::TimedOut => "timed_out",
			Self::Cancelled => "cancelled",
			Self::Failed => "failed",
		};
		f.write_str(name)
	}
}

struct Shared {
	state: Mutex<PollState>,
	cancel: Notify,
}

impl Shared {
	/// Moves `Polling -> next`; returns `false` if another transition won.
	fn finish(&self, next: PollState) -> bool {
		let mut state = self.state.lock();
		if *state != PollState::Polling {
			return false;
		}
		*state = next;
		true
	}
}

/// A configured poller that has not been started yet.
pub struct StatusPoller<T, F, C> {
	fetch: F,
	callback: C,
	interval: Duration,
	timeout: Duration,
	_value: PhantomData<fn() -> T>,
}

impl<T, F, C> fmt::Debug for StatusPoller<T, F, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StatusPoller")
			.field("interval", &self.interval)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

impl<T, F, Fut, C> StatusPoller<T, F, C>
where
	T: Send + 'static,
	F: FnMut() -> Fut + Send + 'static,
	Fut: Future<Output = Result<Option<T>>> + Send + 'static,
	C: FnOnce(Result<T>) + Send + 'static,
{
	/// Creates an idle poller.
	///
	/// `fetch` returns `Ok(None)` while the result is not available yet.
	/// `callback` receives the single terminal result unless the poller is
	/// cancelled.
	pub fn new(fetch: F, callback: C, interval: Duration, timeout: Duration) -> Result<Self> {
		if interval.is_zero() {
			return Err(Error::InvalidArgument("poll interval must be greater than zero".to_string()));
		}
		Ok(Self {
			fetch,
			callback,
			interval,
			timeout,
			_value: PhantomData,
		})
	}

	/// Spawns the poll loop on the current tokio runtime.
	pub fn start(self) -> PollHandle {
		let shared = Arc::new(Shared {
			state: Mutex::new(PollState::Polling),
			cancel: Notify::new(),
		});
		debug!(target = "wc.poll", interval = ?self.interval, timeout = ?self.timeout, "poller started");
		let task = tokio::spawn(self.run(Arc::clone(&shared)));
		PollHandle { shared, task }
	}

	async fn run(self, shared: Arc<Shared>) {
		let Self {
			mut fetch,
			callback,
			interval,
			timeout,
			..
		} = self;

		let deadline = tokio::time::sleep_until(Instant::now() + timeout);
		tokio::pin!(deadline);
		// Owned by this task: dropped on every exit path below.
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		let mut attempt: u32 = 0;
		let (next, outcome) = loop {
			tokio::select! {
				biased;
				() = shared.cancel.notified() => return,
				() = &mut deadline => break (PollState::TimedOut, Err(Error::PollTimeout(timeout))),
				_ = ticker.tick() => {}
			}

			attempt += 1;
			let result = tokio::select! {
				biased;
				() = shared.cancel.notified() => return,
				() = &mut deadline => break (PollState::TimedOut, Err(Error::PollTimeout(timeout))),
				result = fetch() => result,
			};

			match result {
				Ok(Some(value)) => break (PollState::Completed, Ok(value)),
				Ok(None) => trace!(target = "wc.poll", attempt, "no status yet"),
				Err(err) => break (PollState::Failed, Err(err)),
			}
		};

		if shared.finish(next) {
			debug!(target = "wc.poll", attempt, state = %next, "poller finished");
			callback(outcome);
		}
	}
}

/// Handle to a running poller.
///
/// Dropping the handle detaches the poller; it still runs to a terminal
/// state and delivers its callback.
pub struct PollHandle {
	shared: Arc<Shared>,
	task: JoinHandle<()>,
}

impl fmt::Debug for PollHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PollHandle").field("state", &self.state()).finish_non_exhaustive()
	}
}

impl PollHandle {
	pub fn state(&self) -> PollState {
		*self.shared.state.lock()
	}

	pub fn is_finished(&self) -> bool {
		self.state().is_terminal()
	}

	/// Stops a polling poller without invoking its callback.
	///
	/// Returns `false` (and does nothing) when the poller already reached a
	/// terminal state.
	pub fn cancel(&self) -> bool {
		if !self.shared.finish(PollState::Cancelled) {
			return false;
		}
		self.shared.cancel.notify_one();
		debug!(target = "wc.poll", "poller cancelled");
		true
	}

	/// Waits for the poll task to exit and returns the terminal state.
	pub async fn wait(self) -> PollState {
		if let Err(err) = self.task.await {
			debug!(target = "wc.poll", error = %err, "poll task ended abnormally");
			self.shared.finish(PollState::Failed);
		}
		*self.shared.state.lock()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	type Calls = Arc<Mutex<Vec<(Duration, std::result::Result<u32, String>)>>>;

	fn recorder(started: Instant) -> (Calls, impl FnOnce(Result<u32>) + Send + 'static) {
		let calls: Calls = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&calls);
		let callback = move |result: Result<u32>| {
			sink.lock().push((started.elapsed(), result.map_err(|e| e.to_string())));
		};
		(calls, callback)
	}

	#[tokio::test(start_paused = true)]
	async fn times_out_no_earlier_than_timeout() {
		let started = Instant::now();
		let fetches = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fetches);
		let (calls, callback) = recorder(started);

		let poller = StatusPoller::new(
			move || {
				counter.fetch_add(1, Ordering::SeqCst);
				async { Ok::<Option<u32>, Error>(None) }
			},
			callback,
			Duration::from_millis(100),
			Duration::from_secs(1),
		)
		.unwrap();

		let handle = poller.start();
		assert_eq!(handle.wait().await, PollState::TimedOut);

		let calls = calls.lock();
		assert_eq!(calls.len(), 1);
		let (at, result) = &calls[0];
		assert!(*at >= Duration::from_secs(1));
		assert!(result.as_ref().unwrap_err().contains("Timed out"));
		assert_eq!(fetches.load(Ordering::SeqCst), 10);
	}

	#[tokio::test(start_paused = true)]
	async fn completes_on_third_tick() {
		let started = Instant::now();
		let interval = Duration::from_millis(100);
		let fetches = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fetches);
		let (calls, callback) = recorder(started);

		let handle = StatusPoller::new(
			move || {
				let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
				async move { Ok(if n == 3 { Some(7u32) } else { None }) }
			},
			callback,
			interval,
			Duration::from_secs(10),
		)
		.unwrap()
		.start();

		assert_eq!(handle.wait().await, PollState::Completed);

		let calls = calls.lock();
		assert_eq!(calls.len(), 1);
		let (at, result) = &calls[0];
		assert_eq!(result.as_ref().unwrap(), &7);
		// Ticks fire at 0, I, 2I: the third tick completes before the fourth.
		assert!(*at >= interval * 2 && *at < interval * 3);
		assert_eq!(fetches.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn fetch_error_fails_without_retry() {
		let started = Instant::now();
		let fetches = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fetches);
		let (calls, callback) = recorder(started);

		let handle = StatusPoller::new(
			move || {
				counter.fetch_add(1, Ordering::SeqCst);
				async {
					Err::<Option<u32>, Error>(Error::Bridge {
						status: 500,
						message: "boom".to_string(),
					})
				}
			},
			callback,
			Duration::from_millis(100),
			Duration::from_secs(5),
		)
		.unwrap()
		.start();

		assert_eq!(handle.wait().await, PollState::Failed);
		assert_eq!(fetches.load(Ordering::SeqCst), 1);

		let calls = calls.lock();
		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].1.as_ref().unwrap_err(), "Bridge error 500: boom");
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_mid_flight_skips_callback() {
		let started = Instant::now();
		let (calls, callback) = recorder(started);

		let handle = StatusPoller::new(
			|| async { Ok::<Option<u32>, Error>(None) },
			callback,
			Duration::from_millis(100),
			Duration::from_secs(10),
		)
		.unwrap()
		.start();

		tokio::time::sleep(Duration::from_millis(250)).await;
		assert_eq!(handle.state(), PollState::Polling);

		assert!(handle.cancel());
		assert_eq!(handle.state(), PollState::Cancelled);
		assert!(!handle.cancel());
		assert_eq!(handle.state(), PollState::Cancelled);

		assert_eq!(handle.wait().await, PollState::Cancelled);
		assert!(calls.lock().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_interrupts_pending_fetch() {
		let started = Instant::now();
		let (calls, callback) = recorder(started);

		let handle = StatusPoller::new(
			|| std::future::pending::<Result<Option<u32>>>(),
			callback,
			Duration::from_millis(100),
			Duration::from_secs(10),
		)
		.unwrap()
		.start();

		tokio::time::sleep(Duration::from_millis(50)).await;
		assert!(handle.cancel());
		assert_eq!(handle.wait().await, PollState::Cancelled);
		assert!(started.elapsed() < Duration::from_secs(10));
		assert!(calls.lock().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_after_completion_is_noop() {
		let (calls, callback) = recorder(Instant::now());

		let handle = StatusPoller::new(|| async { Ok(Some(1u32)) }, callback, Duration::from_millis(10), Duration::from_secs(1))
			.unwrap()
			.start();

		while !handle.is_finished() {
			tokio::time::sleep(Duration::from_millis(1)).await;
		}
		assert!(!handle.cancel());
		assert_eq!(handle.wait().await, PollState::Completed);
		assert_eq!(calls.lock().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_fetches_never_overlap() {
		let in_flight = Arc::new(AtomicUsize::new(0));
		let max_in_flight = Arc::new(AtomicUsize::new(0));
		let (current, peak) = (Arc::clone(&in_flight), Arc::clone(&max_in_flight));
		let (_calls, callback) = recorder(Instant::now());

		let handle = StatusPoller::new(
			move || {
				let current = Arc::clone(&current);
				let peak = Arc::clone(&peak);
				async move {
					let now = current.fetch_add(1, Ordering::SeqCst) + 1;
					peak.fetch_max(now, Ordering::SeqCst);
					tokio::time::sleep(Duration::from_millis(350)).await;
					current.fetch_sub(1, Ordering::SeqCst);
					Ok::<Option<u32>, Error>(None)
				}
			},
			callback,
			Duration::from_millis(100),
			Duration::from_secs(2),
		)
		.unwrap()
		.start();

		assert_eq!(handle.wait().await, PollState::TimedOut);
		assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn zero_interval_is_rejected() {
		let result = StatusPoller::new(|| async { Ok::<Option<u32>, Error>(None) }, |_: Result<u32>| {}, Duration::ZERO, Duration::from_secs(1));
		assert!(matches!(result, Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn terminal_states() {
		assert!(!PollState::Idle.is_terminal());
		assert!(!PollState::Polling.is_terminal());
		for state in [PollState::Completed, PollState::TimedOut, PollState::Cancelled, PollState::Failed] {
			assert!(state.is_terminal(), "{state} should be terminal");
		}
	}
}
