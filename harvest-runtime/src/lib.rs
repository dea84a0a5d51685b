//! Tokio runtime ownership for the `harvest` binary.
//!
//! A [`HarvestRuntime`] owns the worker pool and a single
//! [`CancellationToken`]. Pipeline runs observe the token at stage
//! boundaries, so cancelling it (for example on Ctrl‑C) stops a run after
//! the current stage has released its resources.
use anyhow::Result;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct HarvestHandle {
    inner: Handle,
    cancel: CancellationToken,
}

pub struct HarvestRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl HarvestRuntime {
    /// Build a multi‑threaded Tokio runtime.
    ///
    /// ```
    /// use harvest_runtime::HarvestRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = HarvestRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Obtain a cloned handle for spawning tasks and sharing cancellation.
    ///
    /// ```
    /// use harvest_runtime::HarvestRuntime;
    ///
    /// let runtime = HarvestRuntime::build("handle-example", Some(1)).unwrap();
    /// let handle = runtime.handle();
    /// assert!(!handle.cancellation().is_cancelled());
    /// ```
    pub fn handle(&self) -> HarvestHandle {
        HarvestHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    pub fn shutdown(self, graceful: std::time::Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl HarvestHandle {
    /// Spawn a future onto the shared runtime handle.
    ///
    /// ```
    /// use harvest_runtime::HarvestRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = HarvestRuntime::build("handle-doctest", Some(1)).unwrap();
    /// let handle = runtime.handle();
    /// let task = handle.spawn(async { 21 * 2 });
    /// let result = runtime.block_on(async move { task.await.unwrap() });
    /// assert_eq!(result, 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// Clone the shared cancellation token to coordinate shutdown.
    ///
    /// ```
    /// use harvest_runtime::HarvestRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = HarvestRuntime::build("cancel-example", Some(1)).unwrap();
    /// let cancel = runtime.handle().cancellation();
    /// cancel.cancel();
    /// assert!(cancel.is_cancelled());
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token when the process receives Ctrl‑C.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.inner.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        tracing::warn!("failed to listen for Ctrl-C: {e}");
                        return;
                    }
                    tracing::warn!("Ctrl-C received; cancelling after the current stage");
                    cancel.cancel();
                }
            }
        })
    }
}
