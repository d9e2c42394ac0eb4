//! Ordered shutdown callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::BoxError;

pub(crate) type ShutdownFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Outcome of [`Container::shutdown`](crate::Container::shutdown).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Callbacks that completed successfully, in the order they ran
    pub ran: Vec<String>,
    /// Callbacks that returned an error or panicked
    pub failed: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Shutdown callbacks, run once in registration order.
#[derive(Default)]
pub(crate) struct ShutdownBag {
    hooks: Vec<(String, ShutdownFn)>,
}

impl ShutdownBag {
    pub(crate) fn push(&mut self, name: String, f: ShutdownFn) {
        self.hooks.push((name, f));
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every callback FIFO. Errors and panics are logged and never stop
    /// the remaining callbacks.
    pub(crate) fn run_all(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        for (name, hook) in self.hooks.drain(..) {
            match catch_unwind(AssertUnwindSafe(hook)) {
                Ok(Ok(())) => {
                    tracing::debug!(hook = %name, "shutdown hook completed");
                    report.ran.push(name);
                }
                Ok(Err(error)) => {
                    tracing::error!(hook = %name, %error, "shutdown hook failed");
                    report.failed.push(name);
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(hook = %name, panic = %message, "shutdown hook panicked");
                    report.failed.push(name);
                }
            }
        }
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
