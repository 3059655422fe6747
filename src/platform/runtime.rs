use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};

static BACKGROUND_RUNTIME: LazyLock<Option<Runtime>> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("regression-background")
        .enable_all()
        .build()
        .ok()
});

/// Spawns `future` without waiting for it.
///
/// Uses the ambient tokio runtime when called from inside one, otherwise a
/// lazily started single-worker background runtime. Returns `false` if no
/// runtime could be found or built, in which case the future is dropped.
pub fn spawn_detached<F>(future: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
        return true;
    }

    match BACKGROUND_RUNTIME.as_ref() {
        Some(runtime) => {
            runtime.spawn(future);
            true
        }
        None => false,
    }
}

/// Asynchronously waits for the provided duration.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}
