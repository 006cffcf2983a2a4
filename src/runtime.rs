use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

static TOKIO_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tokio-spider-blocking")
        .enable_all()
        .build()
        .expect("cannot build tokio runtime for vendor calls")
});

/// Drives a vendor future to completion on the shared runtime.
/// Must not be called from within an async context.
pub fn block_on<F: Future>(future: F) -> F::Output {
    TOKIO_RUNTIME.block_on(future)
}
