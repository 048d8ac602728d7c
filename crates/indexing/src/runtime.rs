//! Background driving of detached work-set joins.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Runtime for joins detached outside any tokio runtime, built on first use.
fn detached_joins_runtime() -> &'static Runtime {
	static RUNTIME: OnceLock<Runtime> = OnceLock::new();
	RUNTIME.get_or_init(|| {
		Builder::new_multi_thread()
			.worker_threads(1)
			.enable_all()
			.thread_name("skein-indexing-join")
			.build()
			.expect("skein-indexing: cannot start the runtime for detached joins")
	})
}

/// Drives a join to completion in the background.
///
/// Uses the ambient tokio runtime when called from one, else a small shared
/// runtime owned by this crate.
pub(crate) fn spawn_join<F>(join: F) -> JoinHandle<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	match Handle::try_current() {
		Ok(handle) => {
			tracing::trace!(ambient = true, "indexing.join.spawn");
			handle.spawn(join)
		}
		Err(_) => {
			tracing::trace!(ambient = false, "indexing.join.spawn");
			detached_joins_runtime().spawn(join)
		}
	}
}
