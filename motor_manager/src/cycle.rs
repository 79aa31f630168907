//! Fixed-period cycle loop around `MotorManager::update`.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` - lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` - pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)` - RT priority.
//!
//! Without the `rt` feature every step except stack prefaulting is a no-op.
//!
//! ## Cycle Loop
//! Absolute-time sleep on `CLOCK_MONOTONIC` for drift-free pacing (`rt`),
//! `std::thread::sleep` otherwise. Stop and pause are sampled once at the
//! start of each cycle; a running cycle always completes. Overruns are
//! counted and logged, never fatal.

use crate::manager::MotorManager;
use motor_common::error::{MotorError, ProtocolError};
use motor_common::motor::types::{CommandRecord, FeedbackRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Signal handler installation failed.
    #[error("signal setup error: {0}")]
    Signal(String),

    /// The manager aborted the cycle.
    #[error(transparent)]
    Motor(#[from] MotorError),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages (prevent page faults in RT loop).
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop does not fault pages in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Set SCHED_FIFO with the given RT priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the full RT setup sequence.
///
/// Must be called before entering the cycle loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Signals ────────────────────────────────────────────────────────

/// Toggled by SIGTSTP.
static PAUSE_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigtstp(_signal: libc::c_int) {
    PAUSE_REQUESTED.fetch_xor(true, Ordering::SeqCst);
}

/// Stop and pause requests sampled by the cycle loop.
///
/// Stop (SIGINT/SIGTERM) disables the fleet and ends the loop. Pause
/// (SIGTSTP, toggling) disables the fleet but keeps cycling; the next
/// SIGTSTP re-enables it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignals {
    stop: Arc<AtomicBool>,
}

impl ShutdownSignals {
    /// No request pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared stop flag, for callers that drive the loop themselves.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Ask the loop to disable the fleet and exit.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stop was requested.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Pause is currently toggled on.
    pub fn pause_requested(&self) -> bool {
        PAUSE_REQUESTED.load(Ordering::SeqCst)
    }

    /// Install SIGINT/SIGTERM (stop) and SIGTSTP (pause) handlers.
    pub fn install(&self) -> Result<(), CycleError> {
        let stop = self.stop_handle();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            stop.store(true, Ordering::SeqCst);
        })
        .map_err(|e| CycleError::Signal(format!("SIGINT/SIGTERM handler: {e}")))?;

        use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
        let action = SigAction::new(
            SigHandler::Handler(on_sigtstp),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler only touches an atomic.
        unsafe { sigaction(Signal::SIGTSTP, &action) }
            .map_err(|e| CycleError::Signal(format!("SIGTSTP handler: {e}")))?;
        Ok(())
    }
}

// ─── Command Source ─────────────────────────────────────────────────

/// Produces the commands of one cycle while the fleet is enabled.
///
/// `commands` holds one record per binding with targets cleared.
pub trait CommandSource {
    /// Fill `commands` for `cycle` from the last feedback.
    fn fill(
        &mut self,
        cycle: u64,
        feedback: &[FeedbackRecord],
        commands: &mut [CommandRecord],
    ) -> Result<(), ProtocolError>;
}

impl<F> CommandSource for F
where
    F: FnMut(u64, &[FeedbackRecord], &mut [CommandRecord]) -> Result<(), ProtocolError>,
{
    fn fill(
        &mut self,
        cycle: u64,
        feedback: &[FeedbackRecord],
        commands: &mut [CommandRecord],
    ) -> Result<(), ProtocolError> {
        self(cycle, feedback, commands)
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the manager and paces its cycle.
pub struct CycleRunner {
    manager: MotorManager,
    signals: ShutdownSignals,
    stats: CycleStats,
    period_ns: i64,
    health_interval: u64,
    states: Vec<FeedbackRecord>,
    commands: Vec<CommandRecord>,
    cycle: u64,
}

impl CycleRunner {
    /// Runner with feedback and command records pre-allocated per binding.
    pub fn new(manager: MotorManager, signals: ShutdownSignals) -> Self {
        let n = manager.binding_count();
        Self {
            period_ns: i64::from(manager.period_ns()),
            health_interval: manager.health_interval().max(1),
            states: (0..n)
                .map(|binding| FeedbackRecord {
                    binding,
                    ..FeedbackRecord::default()
                })
                .collect(),
            commands: (0..n).map(CommandRecord::new).collect(),
            manager,
            signals,
            stats: CycleStats::new(),
            cycle: 0,
        }
    }

    /// Timing statistics so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Last feedback per binding.
    pub fn feedback(&self) -> &[FeedbackRecord] {
        &self.states
    }

    /// The owned manager.
    pub fn manager(&self) -> &MotorManager {
        &self.manager
    }

    /// Release the manager.
    pub fn into_manager(self) -> MotorManager {
        self.manager
    }

    /// Start the transports and cycle until a stop request has fully
    /// disabled the fleet, then stop the transports.
    pub fn run<S: CommandSource>(&mut self, source: &mut S) -> Result<(), CycleError> {
        if !self.manager.is_active() {
            self.manager.start()?;
        }
        info!(
            "Entering cycle loop: period {} ns, {} bindings",
            self.period_ns,
            self.states.len()
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(source);
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(source);

        let stopped = self.manager.stop();
        info!(
            "Cycle loop finished: {} cycles, avg {} ns, max {} ns, {} overruns",
            self.stats.cycle_count,
            self.stats.avg_cycle_ns(),
            self.stats.max_cycle_ns,
            self.stats.overruns
        );
        result?;
        stopped?;
        Ok(())
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop<S: CommandSource>(&mut self, source: &mut S) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let mut next_wake = now()?;

        loop {
            next_wake = timespec_add_ns(next_wake, self.period_ns);

            let cycle_start = now()?;
            let done = self.cycle_body(source)?;
            let cycle_end = now()?;

            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            self.stats.record(duration_ns, latency_ns);
            self.note_overrun(duration_ns);

            if done {
                return Ok(());
            }
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
    }

    /// Simulation cycle loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<S: CommandSource>(&mut self, source: &mut S) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.period_ns as u64);
        loop {
            let cycle_start = Instant::now();
            let done = self.cycle_body(source)?;
            let elapsed = cycle_start.elapsed();

            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            self.note_overrun(duration_ns);

            if done {
                return Ok(());
            }
            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }

    fn note_overrun(&mut self, duration_ns: i64) {
        if duration_ns > self.period_ns {
            self.stats.overruns += 1;
            if self.stats.overruns == 1 || self.stats.overruns % 1000 == 0 {
                warn!(
                    "Cycle overrun: {}ns > {}ns budget ({} so far)",
                    duration_ns, self.period_ns, self.stats.overruns
                );
            }
        }
    }

    /// One cycle; returns true when the loop should end.
    fn cycle_body<S: CommandSource>(&mut self, source: &mut S) -> Result<bool, CycleError> {
        let stop = self.signals.stop_requested();
        let hold = stop || self.signals.pause_requested();

        if !hold && self.manager.is_enabled() {
            for command in &mut self.commands {
                command.clear();
            }
            source
                .fill(self.cycle, &self.states, &mut self.commands)
                .map_err(MotorError::from)?;
        }

        let disabled = self.manager.update(hold, &mut self.states, &self.commands)?;

        if self.cycle % self.health_interval == 0 {
            self.manager.check_health();
        }
        self.cycle += 1;

        Ok(stop && disabled)
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use motor_common::consts::NSEC_PER_SEC;
    use nix::sys::time::TimeSpec;

    let nsec_per_sec = NSEC_PER_SEC as i64;
    let mut secs = ts.tv_sec() as i64;
    let mut nanos = ts.tv_nsec() as i64 + ns;
    secs += nanos.div_euclid(nsec_per_sec);
    nanos = nanos.rem_euclid(nsec_per_sec);
    TimeSpec::new(secs as _, nanos as _)
}

/// Compute the difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    use motor_common::consts::NSEC_PER_SEC;
    (a.tv_sec() as i64 - b.tv_sec() as i64) * NSEC_PER_SEC as i64
        + (a.tv_nsec() as i64 - b.tv_nsec() as i64)
}

// ─── Tests ──────────────────────────────────────────────────────────
