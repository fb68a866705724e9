//! Request-scoped timers and memory checkpoints.
//!
//! A [`DebugTimer`] lives inside a single [`ToolbarContext`](crate::ToolbarContext)
//! and is dropped with it. Nothing here is process-global, so concurrent requests
//! never see each other's intervals.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Source of the current memory usage in bytes.
pub trait MemoryProbe: Send + Sync {
	/// Current memory usage of the process in bytes.
	fn current_usage(&self) -> u64;
}

/// Reads the resident set size of the current process through `sysinfo`.
pub struct ProcessMemoryProbe {
	system: Mutex<System>,
	pid: Option<Pid>,
}

impl ProcessMemoryProbe {
	/// Create a probe bound to the current process.
	pub fn new() -> Self {
		Self {
			system: Mutex::new(System::new()),
			pid: sysinfo::get_current_pid().ok(),
		}
	}
}

impl Default for ProcessMemoryProbe {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryProbe for ProcessMemoryProbe {
	fn current_usage(&self) -> u64 {
		let Some(pid) = self.pid else {
			return 0;
		};
		let mut system = self.system.lock();
		system.refresh_processes_specifics(
			ProcessesToUpdate::Some(&[pid]),
			true,
			ProcessRefreshKind::nothing().with_memory(),
		);
		system.process(pid).map(|p| p.memory()).unwrap_or(0)
	}
}

/// Probe returning a value set by hand, for tests and deterministic output.
#[derive(Debug, Default)]
pub struct FixedMemoryProbe(AtomicU64);

impl FixedMemoryProbe {
	/// Create a probe reporting `bytes`.
	pub fn new(bytes: u64) -> Self {
		Self(AtomicU64::new(bytes))
	}

	/// Change the reported value.
	pub fn set(&self, bytes: u64) {
		self.0.store(bytes, Ordering::SeqCst);
	}
}

impl MemoryProbe for FixedMemoryProbe {
	fn current_usage(&self) -> u64 {
		self.0.load(Ordering::SeqCst)
	}
}

/// Memory usage captured at a named checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
	/// Checkpoint description.
	pub description: String,
	/// Memory usage in bytes.
	pub bytes: u64,
	/// Milliseconds since the request started.
	pub at_ms: u64,
}

/// One named interval as shown by the timer panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSummary {
	/// Timer label.
	pub label: String,
	/// Human readable description.
	pub description: String,
	/// Start offset from the beginning of the request, in milliseconds.
	pub start_ms: f64,
	/// End offset, `None` while the timer is still running.
	pub end_ms: Option<f64>,
	/// Elapsed time; running timers are measured up to now.
	pub elapsed_ms: f64,
}

#[derive(Debug)]
struct TimerEntry {
	label: String,
	description: String,
	started: Duration,
	ended: Option<Duration>,
}

#[derive(Debug, Default)]
struct TimerState {
	timers: Vec<TimerEntry>,
	memory_points: Vec<MemorySnapshot>,
	peak: u64,
}

/// Named-interval stopwatch and memory recorder for one request.
pub struct DebugTimer {
	request_start: Instant,
	probe: Arc<dyn MemoryProbe>,
	state: Mutex<TimerState>,
}

impl DebugTimer {
	/// Create a timer reading memory from the current process.
	pub fn new() -> Self {
		Self::with_probe(Arc::new(ProcessMemoryProbe::new()))
	}

	/// Create a timer with a custom memory probe.
	pub fn with_probe(probe: Arc<dyn MemoryProbe>) -> Self {
		Self {
			request_start: Instant::now(),
			probe,
			state: Mutex::new(TimerState::default()),
		}
	}

	/// Start the interval `label`.
	///
	/// Starting a label that is already running opens a nested interval;
	/// each [`stop`](Self::stop) closes the most recent open one.
	pub fn start(&self, label: &str, description: &str) {
		let started = self.request_start.elapsed();
		self.state.lock().timers.push(TimerEntry {
			label: label.to_string(),
			description: description.to_string(),
			started,
			ended: None,
		});
	}

	/// Stop the most recent open interval named `label`.
	///
	/// Returns `false` if no such interval is running.
	pub fn stop(&self, label: &str) -> bool {
		let ended = self.request_start.elapsed();
		let mut state = self.state.lock();
		match state
			.timers
			.iter_mut()
			.rev()
			.find(|t| t.label == label && t.ended.is_none())
		{
			Some(entry) => {
				entry.ended = Some(ended);
				true
			}
			None => {
				tracing::trace!(label, "stop requested for a timer that is not running");
				false
			}
		}
	}

	/// Whether an interval named `label` is currently open.
	pub fn is_running(&self, label: &str) -> bool {
		self.state
			.lock()
			.timers
			.iter()
			.any(|t| t.label == label && t.ended.is_none())
	}

	/// Record the current memory usage under `description`.
	pub fn record(&self, description: &str) -> MemorySnapshot {
		let snapshot = MemorySnapshot {
			description: description.to_string(),
			bytes: self.probe.current_usage(),
			at_ms: self.request_start.elapsed().as_millis() as u64,
		};
		let mut state = self.state.lock();
		state.peak = state.peak.max(snapshot.bytes);
		state.memory_points.push(snapshot.clone());
		snapshot
	}

	/// All intervals in start order.
	pub fn timers(&self) -> Vec<TimerSummary> {
		let now = self.request_start.elapsed();
		self.state
			.lock()
			.timers
			.iter()
			.map(|t| TimerSummary {
				label: t.label.clone(),
				description: t.description.clone(),
				start_ms: as_ms(t.started),
				end_ms: t.ended.map(as_ms),
				elapsed_ms: as_ms(t.ended.unwrap_or(now).saturating_sub(t.started)),
			})
			.collect()
	}

	/// All memory checkpoints in recording order.
	pub fn memory_points(&self) -> Vec<MemorySnapshot> {
		self.state.lock().memory_points.clone()
	}

	/// Highest memory usage seen by [`record`](Self::record).
	pub fn peak_memory(&self) -> u64 {
		self.state.lock().peak
	}

	/// Time since the timer was created.
	pub fn request_elapsed(&self) -> Duration {
		self.request_start.elapsed()
	}
}

impl Default for DebugTimer {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for DebugTimer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("DebugTimer")
			.field("timers", &state.timers.len())
			.field("memory_points", &state.memory_points.len())
			.finish()
	}
}

fn as_ms(d: Duration) -> f64 {
	d.as_secs_f64() * 1000.0
}
