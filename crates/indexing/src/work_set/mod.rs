//! Ordered groups of work settled as one unit.
//!
//! A [`WorkSet`] submits its items in order, asks the orchestrator for the
//! trailing sequence step, and resolves its [`WorkSetCompletion`] once every
//! item future and the sequence future have settled. It blames no entity:
//! the terminal signal carries one failure at most.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::SequenceStep;
use crate::error::Error;
use crate::failure::Failure;
use crate::orchestrator::{Orchestrator, WorkFuture};
use crate::settle::settle_all;


/// Lifecycle of one work set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSetState {
	/// Not yet submitted nor failed.
	Created,
	/// Submitted; waiting for items and the sequence step to settle.
	Submitted,
	/// Every constituent settled successfully.
	Succeeded,
	/// Failed through a constituent, a synchronous rejection, or
	/// [`WorkSet::mark_as_failed`].
	Failed,
}

impl WorkSetState {
	/// Returns true once the terminal signal has been resolved.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Succeeded | Self::Failed)
	}
}

/// Terminal signal shared by a work set and its join.
///
/// The sender is taken on first resolution, so the signal resolves at most once.
struct Signal {
	inner: Mutex<SignalInner>,
}

struct SignalInner {
	state: WorkSetState,
	sender: Option<oneshot::Sender<Result<(), Failure>>>,
}

impl Signal {
	fn new() -> (Arc<Self>, WorkSetCompletion) {
		let (sender, receiver) = oneshot::channel();
		let signal = Arc::new(Self {
			inner: Mutex::new(SignalInner {
				state: WorkSetState::Created,
				sender: Some(sender),
			}),
		});
		(signal, WorkSetCompletion { receiver })
	}

	fn state(&self) -> WorkSetState {
		self.inner.lock().state
	}

	/// Moves `Created -> Submitted`. Returns false from any other state.
	fn begin_submission(&self) -> bool {
		let mut inner = self.inner.lock();
		if inner.state != WorkSetState::Created {
			return false;
		}
		inner.state = WorkSetState::Submitted;
		true
	}

	fn resolve(&self, outcome: Result<(), Failure>) -> bool {
		let mut inner = self.inner.lock();
		let Some(sender) = inner.sender.take() else {
			return false;
		};
		inner.state = if outcome.is_ok() { WorkSetState::Succeeded } else { WorkSetState::Failed };
		// The creator may have stopped observing; the state is still recorded.
		let _ = sender.send(outcome);
		true
	}
}

/// Ordered group of work submitted together with one trailing sequence step.
pub struct WorkSet<W> {
	items: Vec<W>,
	step: SequenceStep,
	signal: Arc<Signal>,
}

impl<W> WorkSet<W> {
	/// Creates a work set and the completion its creator observes.
	///
	/// Items are submitted in iteration order.
	pub fn new(items: impl IntoIterator<Item = W>, step: SequenceStep) -> (Self, WorkSetCompletion) {
		let (signal, completion) = Signal::new();
		let work_set = Self {
			items: items.into_iter().collect(),
			step,
			signal,
		};
		(work_set, completion)
	}

	/// Returns the number of items not yet submitted.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Returns true if no item is waiting for submission.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Returns the current lifecycle state.
	pub fn state(&self) -> WorkSetState {
		self.signal.state()
	}

	/// Submits every item, then the sequence step, to `orchestrator`.
	///
	/// The returned join resolves the completion once all constituents have
	/// settled; it must be polled, or [detached](WorkSetJoin::detach). A
	/// synchronous rejection from the orchestrator fails the completion right
	/// away and yields an already-finished join. Work submitted before the
	/// rejection is not rolled back.
	///
	/// Calling this on a work set that is not [`WorkSetState::Created`] does
	/// nothing.
	pub fn submit_to<O>(&mut self, orchestrator: &O) -> WorkSetJoin
	where
		O: Orchestrator<W> + ?Sized,
	{
		if !self.signal.begin_submission() {
			tracing::debug!(state = ?self.state(), "indexing.work_set.submit_ignored");
			return WorkSetJoin::finished();
		}

		let items = std::mem::take(&mut self.items);
		tracing::debug!(items = items.len(), step = ?self.step, "indexing.work_set.submit");
		match submit_all(orchestrator, items, self.step) {
			Ok((items, sequence)) => WorkSetJoin::new(join(items, sequence, Arc::clone(&self.signal)).boxed(), Arc::clone(&self.signal)),
			Err(failure) => {
				tracing::warn!(error = %failure, "indexing.work_set.rejected");
				self.signal.resolve(Err(failure));
				WorkSetJoin::finished()
			}
		}
	}

	/// Fails a work set that was never submitted, without contacting any
	/// orchestrator.
	///
	/// Returns false, and does nothing, if the work set was already submitted
	/// or failed.
	pub fn mark_as_failed(&mut self, failure: Failure) -> bool {
		if self.state() != WorkSetState::Created {
			tracing::debug!(state = ?self.state(), "indexing.work_set.mark_failed_ignored");
			return false;
		}
		tracing::debug!(error = %failure, "indexing.work_set.marked_failed");
		self.items.clear();
		self.signal.resolve(Err(failure))
	}
}

impl<W> std::fmt::Debug for WorkSet<W> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkSet")
			.field("items", &self.items.len())
			.field("step", &self.step)
			.field("state", &self.state())
			.finish()
	}
}

fn submit_all<W, O>(orchestrator: &O, items: Vec<W>, step: SequenceStep) -> Result<(Vec<WorkFuture>, WorkFuture), Failure>
where
	O: Orchestrator<W> + ?Sized,
{
	orchestrator.before_work_set()?;
	let mut futures = Vec::with_capacity(items.len());
	for item in items {
		futures.push(orchestrator.submit(item)?);
	}
	let sequence = orchestrator.after_work_set(step)?;
	Ok((futures, sequence))
}

/// Waits for items and sequence, then resolves the signal.
///
/// A failed sequence step wins; otherwise the first failed item in
/// submission order does.
async fn join(items: Vec<WorkFuture>, sequence: WorkFuture, signal: Arc<Signal>) {
	let item_count = items.len();
	let mut outcomes = settle_all(items.into_iter().chain(std::iter::once(sequence))).await;
	let sequence_outcome = outcomes.pop().unwrap_or(Ok(()));
	let failed_items = outcomes.iter().filter(|outcome| outcome.is_err()).count();
	let outcome = match sequence_outcome {
		Err(failure) => Err(failure),
		Ok(()) => match outcomes.into_iter().find_map(Result::err) {
			Some(failure) => Err(failure),
			None => Ok(()),
		},
	};
	tracing::debug!(items = item_count, failed_items, succeeded = outcome.is_ok(), "indexing.work_set.settled");
	signal.resolve(outcome);
}

/// Completion of a work set, resolved exactly once.
///
/// Resolves to [`Error::Abandoned`] if the work set is dropped before it is
/// submitted, or if its [`WorkSetJoin`] is dropped before it finishes.
#[must_use = "the completion is the only way to learn a work set's outcome"]
#[derive(Debug)]
pub struct WorkSetCompletion {
	receiver: oneshot::Receiver<Result<(), Failure>>,
}

impl Future for WorkSetCompletion {
	type Output = Result<(), Failure>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.receiver)
			.poll(cx)
			.map(|received| received.unwrap_or_else(|_| Err(Error::Abandoned.into())))
	}
}

/// Drives a submitted work set until it settles.
///
/// Dropping an unfinished join abandons the work set: its completion resolves
/// to [`Error::Abandoned`], whatever the constituents later do.
#[must_use = "a submitted work set only settles while its join is polled or detached"]
pub struct WorkSetJoin {
	inner: Option<BoxFuture<'static, ()>>,
	signal: Option<Arc<Signal>>,
}

impl WorkSetJoin {
	fn new(join: BoxFuture<'static, ()>, signal: Arc<Signal>) -> Self {
		Self {
			inner: Some(join),
			signal: Some(signal),
		}
	}

	fn finished() -> Self {
		Self { inner: None, signal: None }
	}

	/// Returns true once the join has nothing left to drive.
	pub fn is_finished(&self) -> bool {
		self.inner.is_none()
	}

	/// Drives the join in the background.
	pub fn detach(self) -> JoinHandle<()> {
		crate::runtime::spawn_join(self)
	}
}

impl Future for WorkSetJoin {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		let Some(join) = self.inner.as_mut() else {
			return Poll::Ready(());
		};
		match join.poll_unpin(cx) {
			Poll::Ready(()) => {
				self.inner = None;
				self.signal = None;
				Poll::Ready(())
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl Drop for WorkSetJoin {
	fn drop(&mut self) {
		if self.inner.take().is_none() {
			return;
		}
		let Some(signal) = self.signal.take() else {
			return;
		};
		if signal.resolve(Err(Error::Abandoned.into())) {
			tracing::debug!("indexing.work_set.abandoned");
		}
	}
}

impl std::fmt::Debug for WorkSetJoin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkSetJoin").field("finished", &self.is_finished()).finish()
	}
}
