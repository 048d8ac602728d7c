//! Scripted orchestrator for unit tests.

use std::collections::HashMap;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::SequenceStep;
use crate::error::Error;
use crate::failure::Failure;
use crate::orchestrator::{Orchestrator, WorkFuture};

/// Orchestrator interaction observed by [`ScriptedOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
	BeforeWorkSet,
	Submit(u32),
	AfterWorkSet(SequenceStep),
}

type Completer = oneshot::Sender<Result<(), Failure>>;

/// Orchestrator whose work only settles when the test says so.
#[derive(Default)]
pub(crate) struct ScriptedOrchestrator {
	calls: Mutex<Vec<Call>>,
	pending: Mutex<HashMap<u32, Completer>>,
	sequence: Mutex<Option<Completer>>,
	rejections: Mutex<HashMap<u32, Failure>>,
	reject_before: Mutex<Option<Failure>>,
	reject_sequence: Mutex<Option<Failure>>,
}

fn observe(receiver: oneshot::Receiver<Result<(), Failure>>) -> WorkFuture {
	async move { receiver.await.unwrap_or_else(|_| Err(Error::Abandoned.into())) }.boxed()
}

/// Routes `indexing.*` events to the test output; repeated calls are no-ops.
pub(crate) fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

impl ScriptedOrchestrator {
	pub(crate) fn new() -> Self {
		init_tracing();
		Self::default()
	}

	pub(crate) fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	/// Makes `submit(work)` fail synchronously.
	pub(crate) fn reject(&self, work: u32, failure: Failure) {
		self.rejections.lock().insert(work, failure);
	}

	pub(crate) fn reject_before_work_set(&self, failure: Failure) {
		*self.reject_before.lock() = Some(failure);
	}

	pub(crate) fn reject_sequence(&self, failure: Failure) {
		*self.reject_sequence.lock() = Some(failure);
	}

	pub(crate) fn succeed(&self, work: u32) {
		self.settle(work, Ok(()));
	}

	pub(crate) fn fail(&self, work: u32, failure: Failure) {
		self.settle(work, Err(failure));
	}

	pub(crate) fn settle_sequence(&self, outcome: Result<(), Failure>) {
		let sender = self.sequence.lock().take().expect("no sequence step pending");
		let _ = sender.send(outcome);
	}

	fn settle(&self, work: u32, outcome: Result<(), Failure>) {
		let sender = self.pending.lock().remove(&work).expect("work not pending");
		let _ = sender.send(outcome);
	}
}

impl Orchestrator<u32> for ScriptedOrchestrator {
	fn before_work_set(&self) -> Result<(), Failure> {
		self.calls.lock().push(Call::BeforeWorkSet);
		match self.reject_before.lock().take() {
			Some(failure) => Err(failure),
			None => Ok(()),
		}
	}

	fn submit(&self, work: u32) -> Result<WorkFuture, Failure> {
		self.calls.lock().push(Call::Submit(work));
		if let Some(failure) = self.rejections.lock().remove(&work) {
			return Err(failure);
		}
		let (sender, receiver) = oneshot::channel();
		self.pending.lock().insert(work, sender);
		Ok(observe(receiver))
	}

	fn after_work_set(&self, step: SequenceStep) -> Result<WorkFuture, Failure> {
		self.calls.lock().push(Call::AfterWorkSet(step));
		if let Some(failure) = self.reject_sequence.lock().take() {
			return Err(failure);
		}
		let (sender, receiver) = oneshot::channel();
		*self.sequence.lock() = Some(sender);
		Ok(observe(receiver))
	}
}
