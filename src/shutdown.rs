//! Coordinated teardown of open sessions.
//!
//! Long-running tools open several sessions and need a single place to
//! close them all at exit. [`ShutdownRegistry`] holds registered
//! [`Shutdown`] handles and closes them in registration order; one
//! failing handle never prevents the rest from closing.

use crate::error::Result;
use log::{debug, error, trace};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

/// Anything that can release its resources at process teardown.
///
/// Implemented by [`Session`](crate::Session); applications can
/// implement it for their own composite resources.
pub trait Shutdown: Send {
    /// Release resources. Must be safe to call more than once.
    fn shutdown(&mut self) -> Result<()>;
}

/// An ordered collection of [`Shutdown`] handles.
#[derive(Default)]
pub struct ShutdownRegistry {
    handles: Mutex<Vec<Arc<Mutex<dyn Shutdown>>>>,
}

impl ShutdownRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ShutdownRegistry {
        static GLOBAL: Lazy<ShutdownRegistry> = Lazy::new(ShutdownRegistry::new);
        &GLOBAL
    }

    /// Add a handle. Handles are shut down in registration order.
    pub fn register(&self, handle: Arc<Mutex<dyn Shutdown>>) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.push(handle);
        trace!("shutdown handle registered ({} total)", handles.len());
    }

    /// Number of currently registered handles.
    pub fn len(&self) -> usize {
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check whether no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down every registered handle, in registration order.
    ///
    /// Failures are logged and skipped; the registry is drained either
    /// way. Returns how many handles shut down cleanly.
    pub fn close_all(&self) -> usize {
        let handles = {
            let mut guard = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        debug!("shutting down {} registered handle(s)", handles.len());

        let mut clean = 0;
        for handle in handles {
            let mut guard = handle.lock().unwrap_or_else(|e| e.into_inner());
            match guard.shutdown() {
                Ok(()) => clean += 1,
                Err(e) => error!("shutdown handle failed: {e}"),
            }
        }
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    struct Probe {
        closed: bool,
        fail: bool,
    }

    impl Shutdown for Probe {
        fn shutdown(&mut self) -> Result<()> {
            self.closed = true;
            if self.fail {
                Err(GraphError::storage("probe failure", None::<std::io::Error>))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_close_all_drains_in_order() {
        let registry = ShutdownRegistry::new();
        let first: Arc<Mutex<dyn Shutdown>> = Arc::new(Mutex::new(Probe {
            closed: false,
            fail: false,
        }));
        let second: Arc<Mutex<dyn Shutdown>> = Arc::new(Mutex::new(Probe {
            closed: false,
            fail: false,
        }));
        registry.register(Arc::clone(&first));
        registry.register(Arc::clone(&second));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failing_handle_does_not_block_others() {
        let registry = ShutdownRegistry::new();
        let failing: Arc<Mutex<dyn Shutdown>> = Arc::new(Mutex::new(Probe {
            closed: false,
            fail: true,
        }));
        let healthy = Arc::new(Mutex::new(Probe {
            closed: false,
            fail: false,
        }));
        registry.register(Arc::clone(&failing));
        registry.register(healthy.clone() as Arc<Mutex<dyn Shutdown>>);

        assert_eq!(registry.close_all(), 1);
        assert!(healthy.lock().unwrap().closed);
    }
}
