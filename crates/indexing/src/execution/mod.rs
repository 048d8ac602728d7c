//! Execution of independent single-entity operations with per-entity blame.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};

use crate::orchestrator::{self, EntityReferenceFactory, Orchestrator};
use crate::report::{ExecutionReport, ExecutionReportBuilder};
use crate::settle::settlements;
use crate::work::SingleOperation;


/// Report future returned by [`IndexingPlanExecution::execute`]. Never fails.
pub type ExecutionFuture<R> = BoxFuture<'static, ExecutionReport<R>>;

/// Independent operations submitted one by one and reported on as a whole.
pub struct IndexingPlanExecution<W, O: ?Sized, F> {
	operations: Vec<SingleOperation<W>>,
	orchestrator: Arc<O>,
	factory: Arc<F>,
}

impl<W, O, F> IndexingPlanExecution<W, O, F>
where
	O: Orchestrator<W> + ?Sized,
	F: EntityReferenceFactory + 'static,
{
	/// Creates an execution of `operations`, in submission order.
	pub fn new(operations: impl IntoIterator<Item = SingleOperation<W>>, orchestrator: Arc<O>, factory: Arc<F>) -> Self {
		Self {
			operations: operations.into_iter().collect(),
			orchestrator,
			factory,
		}
	}

	/// Returns the number of operations.
	pub fn len(&self) -> usize {
		self.operations.len()
	}

	/// Returns true if there is nothing to execute.
	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	/// Submits every operation, then returns the future of the report.
	///
	/// All submissions happen before this returns. The report is built once
	/// every operation has settled; failures are folded into it in the order
	/// they are observed. A synchronous rejection counts as that operation
	/// failing.
	pub fn execute(self) -> ExecutionFuture<F::Reference> {
		let Self {
			operations,
			orchestrator,
			factory,
		} = self;

		let mut targets = Vec::with_capacity(operations.len());
		let mut pending = Vec::with_capacity(operations.len());
		for operation in operations {
			let (work, target) = operation.into_parts();
			let future = orchestrator.submit(work).unwrap_or_else(|failure| {
				tracing::warn!(type_name = target.type_name(), error = %failure, "indexing.execution.rejected");
				orchestrator::failed(failure)
			});
			targets.push(target);
			pending.push(future);
		}
		tracing::debug!(operations = targets.len(), "indexing.execution.submitted");

		let mut settled = settlements(pending);
		async move {
			let builder = ExecutionReportBuilder::new();
			let mut failed = 0usize;
			while let Some((index, outcome)) = settled.next().await {
				let Err(failure) = outcome else {
					tracing::trace!(index, "indexing.execution.succeeded");
					continue;
				};
				failed += 1;
				let target = &targets[index];
				tracing::trace!(index, type_name = target.type_name(), error = %failure, "indexing.execution.failed");
				let reference = factory.create_entity_reference(target.type_name(), target.identifier());
				if let Err(construction) = &reference {
					tracing::debug!(index, error = %construction, "indexing.execution.reference_failed");
				}
				builder.record(failure, reference);
			}

			let report = builder.build();
			tracing::debug!(
				operations = targets.len(),
				failed,
				failing_references = report.failing_entity_references().len(),
				"indexing.execution.report"
			);
			report
		}
		.boxed()
	}
}

impl<W, O: ?Sized, F> std::fmt::Debug for IndexingPlanExecution<W, O, F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexingPlanExecution").field("operations", &self.operations.len()).finish()
	}
}
