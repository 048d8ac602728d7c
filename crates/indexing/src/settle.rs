//! Combinators that wait for futures to settle regardless of their outcome.
//!
//! Unlike a fail-fast join, nothing here short-circuits: every constituent is
//! driven to completion and every outcome is handed back to the caller, who
//! decides how to fold failures.

use std::future::Future;

use futures::FutureExt;
use futures::stream::{FuturesUnordered, Stream, StreamExt};

/// Yields `(index, output)` for each future in the order they settle.
///
/// `index` is the position of the future in `futures`.
pub fn settlements<F>(futures: impl IntoIterator<Item = F>) -> impl Stream<Item = (usize, F::Output)>
where
	F: Future,
{
	futures
		.into_iter()
		.enumerate()
		.map(|(index, future)| future.map(move |output| (index, output)))
		.collect::<FuturesUnordered<_>>()
}

/// Resolves once every future has settled, with outputs in input order.
pub fn settle_all<F>(futures: impl IntoIterator<Item = F>) -> impl Future<Output = Vec<F::Output>>
where
	F: Future,
{
	let pending = settlements(futures);
	async move {
		let mut settled: Vec<_> = pending.collect().await;
		settled.sort_unstable_by_key(|(index, _)| *index);
		settled.into_iter().map(|(_, output)| output).collect()
	}
}
