//! Single-flight gates for the model pipelines.
//!
//! Each pipeline kind owns one `InFlight`. A command claims it with
//! `try_acquire()` before its first await and holds the returned guard for the
//! whole run; dropping the guard (normal return, error, or unwinding) clears
//! the flag. A second claim while the first is held gets `None`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Which pipeline a gate protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Batch of test paper images → name/score rows.
    ScoreExtraction,
    /// One study question → structured advice.
    AdviceRequest,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScoreExtraction => write!(f, "Score extraction"),
            Self::AdviceRequest => write!(f, "Advice request"),
        }
    }
}

/// Snapshot of the running operation.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveOperation {
    pub kind: OperationKind,
    /// When the operation started (RFC 3339).
    pub started_at: String,
}

// ═══════════════════════════════════════════════════════════
// InFlight
// ═══════════════════════════════════════════════════════════

/// "Is a request currently running" flag with RAII release.
pub struct InFlight {
    busy: AtomicBool,
    current_op: Mutex<Option<ActiveOperation>>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            busy: AtomicBool::new(false),
            current_op: Mutex::new(None),
        })
    }

    /// Claim the gate without blocking. `None` when a run is already active.
    pub fn try_acquire(self: &Arc<Self>, kind: OperationKind) -> Option<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        if let Ok(mut current) = self.current_op.lock() {
            *current = Some(ActiveOperation {
                kind,
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }
        tracing::debug!(%kind, "Pipeline gate acquired");
        Some(InFlightGuard {
            gate: Arc::clone(self),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// What is running, if anything.
    pub fn current_operation(&self) -> Option<ActiveOperation> {
        self.current_op.lock().ok()?.clone()
    }

    fn release(&self) {
        if let Ok(mut current) = self.current_op.lock() {
            *current = None;
        }
        self.busy.store(false, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════
// InFlightGuard (RAII release)
// ═══════════════════════════════════════════════════════════

/// Held for the duration of one pipeline run. `'static`, so it can move into
/// a blocking task.
pub struct InFlightGuard {
    gate: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gate.release();
        tracing::debug!("Pipeline gate released");
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
