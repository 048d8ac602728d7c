//! Completions arriving concurrently from many tokio worker threads.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use skein_indexing::{
	DefaultEntityReferenceFactory, EntityReference, Error, Failure, IndexingConfig, IndexingPlanExecution, Orchestrator, SequenceStep,
	SingleOperation, WorkFuture, WorkSet,
};
// Dependencies of the library and its unit tests that this target does not use.
use parking_lot as _;
use pretty_assertions as _;
use proptest as _;
use rstest as _;
use serde as _;
use thiserror as _;
use toml as _;
use tracing as _;

/// Unit of work for [`TaskOrchestrator`].
#[derive(Debug, Clone, Copy)]
enum Work {
	Succeed(u32),
	Fail(u32),
	Panic(u32),
}

/// Runs every unit of work as its own task on the ambient multi-thread runtime.
struct TaskOrchestrator;

impl TaskOrchestrator {
	fn spawn(work: Work) -> WorkFuture {
		let handle = tokio::spawn(async move {
			let id = match work {
				Work::Succeed(id) | Work::Fail(id) | Work::Panic(id) => id,
			};
			// Spread completions so that they interleave across worker threads.
			tokio::time::sleep(Duration::from_micros(u64::from(id % 7) * 50)).await;
			match work {
				Work::Succeed(_) => Ok(()),
				Work::Fail(id) => Err(Failure::msg(format!("work{id}"))),
				Work::Panic(id) => panic!("work{id} panicked"),
			}
		});
		handle
			.map(|joined| joined.unwrap_or_else(|err| Err(Failure::from_join_error(err))))
			.boxed()
	}
}

impl Orchestrator<Work> for TaskOrchestrator {
	fn submit(&self, work: Work) -> Result<WorkFuture, Failure> {
		Ok(Self::spawn(work))
	}

	fn after_work_set(&self, _step: SequenceStep) -> Result<WorkFuture, Failure> {
		Ok(Self::spawn(Work::Succeed(0)))
	}
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

fn chain_len(failure: &Failure) -> usize {
	1 + failure.suppressed().len()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_failures_are_never_lost() {
	init_tracing();
	let operations: Vec<_> = (0..512u32)
		.map(|id| {
			let work = if id % 3 == 0 { Work::Fail(id) } else { Work::Succeed(id) };
			SingleOperation::new("Book", id, work)
		})
		.collect();
	let expected: HashSet<_> = (0..512u32).filter(|id| id % 3 == 0).map(|id| EntityReference::new("Book", id)).collect();

	let report = IndexingPlanExecution::new(operations, Arc::new(TaskOrchestrator), Arc::new(DefaultEntityReferenceFactory))
		.execute()
		.await;

	let primary = report.throwable().expect("failures must be reported");
	assert_eq!(chain_len(primary), expected.len());
	assert_eq!(report.failing_entity_references(), &expected);

	let mut messages: Vec<String> = std::iter::once(primary.clone()).chain(primary.suppressed()).map(|f| f.to_string()).collect();
	messages.sort();
	messages.dedup();
	assert_eq!(messages.len(), expected.len(), "every failure appears exactly once");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_work_is_reported_as_failure() {
	init_tracing();
	let operations = vec![
		SingleOperation::new("Book", 1u32, Work::Succeed(1)),
		SingleOperation::new("Book", 2u32, Work::Panic(2)),
	];
	let report = IndexingPlanExecution::new(operations, Arc::new(TaskOrchestrator), Arc::new(DefaultEntityReferenceFactory))
		.execute()
		.await;

	let primary = report.throwable().expect("panic must be reported");
	assert!(matches!(primary.downcast_ref::<Error>(), Some(Error::Panicked(msg)) if msg.contains("work2")));
	let err = report.ensure_success().unwrap_err();
	assert!(err.to_string().contains("Book#2"), "got: {err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn detached_work_sets_settle_independently() {
	init_tracing();
	let step = IndexingConfig::from_toml_str("refresh = \"force\"").unwrap().sequence_step();
	let mut completions = Vec::new();
	for set in 0..32u32 {
		let items: Vec<_> = (0..16u32)
			.map(|i| {
				let id = set * 16 + i;
				if set % 4 == 0 && i == 5 { Work::Fail(id) } else { Work::Succeed(id) }
			})
			.collect();
		let (mut work_set, completion) = WorkSet::new(items, step);
		let _handle = work_set.submit_to(&TaskOrchestrator).detach();
		completions.push((set, completion));
	}

	for (set, completion) in completions {
		let outcome = tokio::time::timeout(Duration::from_secs(10), completion).await.expect("work set must settle");
		if set % 4 == 0 {
			let failure = outcome.unwrap_err();
			assert_eq!(failure.to_string(), format!("work{}", set * 16 + 5));
		} else {
			assert!(outcome.is_ok(), "work set {set} should succeed");
		}
	}
}
