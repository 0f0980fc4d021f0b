use lazy_static::lazy_static;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use parking_lot::ReentrantMutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

lazy_static! {
    static ref GLOBAL_GATE: Arc<RuntimeGate> = Arc::new(RuntimeGate::new());
}

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> ort::Result<()> {
    ort::init()
        .with_name("team-classifier")
        .commit()?;
    Ok(())
}

/// Initializes the process-wide ONNX Runtime environment on first use.
///
/// Later calls return the outcome of the first initialization.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    INIT.get_or_init(|| {
        log::info!("Initializing ONNX Runtime environment");
        init_onnx_environment().map_err(|e| e.to_string())
    })
    .clone()
    .map_err(ClassifierError::NativeRuntime)
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

/// Serializes access to the native runtime.
///
/// The wrapped runtime tolerates only one active caller at a time, so every
/// artifact call runs inside [`RuntimeGate::with_exclusive_access`]. The lock is
/// re-entrant: a thread already holding the gate may acquire it again.
/// It is released when the closure returns or unwinds.
#[derive(Debug, Default)]
pub struct RuntimeGate {
    lock: ReentrantMutex<()>,
    waiting: AtomicUsize,
    acquisitions: AtomicU64,
}

impl RuntimeGate {
    /// Creates an isolated gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gate shared by the whole process.
    pub fn global() -> Arc<RuntimeGate> {
        Arc::clone(&GLOBAL_GATE)
    }

    /// Runs `f` while holding the gate and returns its result.
    pub fn with_exclusive_access<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.waiting.fetch_add(1, Ordering::SeqCst) + 1;
        if depth > 1 {
            log::debug!("Runtime gate contended, {} callers queued", depth);
        }
        let _guard = self.lock.lock();
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        log::trace!("Runtime gate acquired");
        f()
    }

    /// Number of callers currently waiting for the gate.
    pub fn queue_depth(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Total number of times the gate has been acquired.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_gate_returns_closure_result() {
        let gate = RuntimeGate::new();
        assert_eq!(gate.with_exclusive_access(|| 41 + 1), 42);
        assert_eq!(gate.acquisitions(), 1);
    }

    #[test]
    fn test_gate_is_reentrant() {
        let gate = RuntimeGate::new();
        let value = gate.with_exclusive_access(|| gate.with_exclusive_access(|| "nested"));
        assert_eq!(value, "nested");
        assert_eq!(gate.acquisitions(), 2);
    }

    #[test]
    fn test_gate_released_after_panic() {
        let gate = Arc::new(RuntimeGate::new());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.with_exclusive_access(|| panic!("native call failed"))
        }));
        assert!(result.is_err());

        let other = Arc::clone(&gate);
        let handle = thread::spawn(move || other.with_exclusive_access(|| 7));
        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn test_queue_depth_reports_waiters() {
        let gate = Arc::new(RuntimeGate::new());
        let holder = Arc::clone(&gate);
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            holder.with_exclusive_access(|| {
                tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
            })
        });
        rx.recv().unwrap();

        let waiter = Arc::clone(&gate);
        let waiting = thread::spawn(move || waiter.with_exclusive_access(|| ()));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(gate.queue_depth(), 1);

        handle.join().unwrap();
        waiting.join().unwrap();
        assert_eq!(gate.queue_depth(), 0);
    }

    #[test]
    fn test_global_gate_is_shared() {
        assert!(Arc::ptr_eq(&RuntimeGate::global(), &RuntimeGate::global()));
    }
}
