//! In-flight guards
//!
//! At most one request of each operation kind runs at a time. A second
//! call of the same kind fails fast instead of queueing.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Kinds of user-triggered remote operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Analyze,
    Compare,
    Explain,
    Batch,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Analyze => "Analysis",
            Operation::Compare => "Comparison",
            Operation::Explain => "Explanation",
            Operation::Batch => "Batch",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Busy flag for one operation kind
#[derive(Debug)]
pub struct InFlight {
    operation: Operation,
    busy: AtomicBool,
}

/// Holds an [`InFlight`] flag until dropped
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a InFlight,
}

impl InFlight {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            busy: AtomicBool::new(false),
        }
    }

    /// Mark the operation as running, or fail with [`Error::Busy`]
    pub fn try_acquire(&self) -> Result<InFlightGuard<'_>, Error> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::debug!(operation = %self.operation, "Rejected concurrent request");
                Error::Busy(self.operation)
            })?;
        Ok(InFlightGuard { flag: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}
