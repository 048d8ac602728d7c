//! Plans mixing single-entity operations with sequenced work.

use std::sync::Arc;

use futures::FutureExt;

use crate::config::SequenceStep;
use crate::execution::{ExecutionFuture, IndexingPlanExecution};
use crate::orchestrator::{EntityReferenceFactory, Orchestrator};
use crate::report::ExecutionReportBuilder;
use crate::work::{SingleOperation, WorkItem};
use crate::work_set::WorkSet;

/// Collects work items and executes them as one reported batch.
#[derive(Debug)]
pub struct IndexingPlan<W> {
	operations: Vec<SingleOperation<W>>,
	sequenced: Vec<W>,
}

impl<W> Default for IndexingPlan<W> {
	fn default() -> Self {
		Self::new()
	}
}

impl<W> IndexingPlan<W> {
	/// Creates an empty plan.
	pub fn new() -> Self {
		Self {
			operations: Vec::new(),
			sequenced: Vec::new(),
		}
	}

	/// Adds one item.
	pub fn push(&mut self, item: impl Into<WorkItem<W>>) {
		match item.into() {
			WorkItem::Single(operation) => self.operations.push(operation),
			WorkItem::Sequenced(work) => self.sequenced.push(work),
		}
	}

	/// Returns the number of items in the plan.
	pub fn len(&self) -> usize {
		self.operations.len() + self.sequenced.len()
	}

	/// Returns true if the plan has no items.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Submits the plan and returns the future of its report.
	///
	/// Single operations are submitted first, as one [`IndexingPlanExecution`];
	/// sequenced items follow as one [`WorkSet`] closed by `step`. A work-set
	/// failure is recorded in the report without naming any entity.
	pub fn execute_and_report<O, F>(self, orchestrator: Arc<O>, factory: Arc<F>, step: SequenceStep) -> ExecutionFuture<F::Reference>
	where
		O: Orchestrator<W> + ?Sized,
		F: EntityReferenceFactory + 'static,
	{
		let Self { operations, sequenced } = self;
		tracing::debug!(operations = operations.len(), sequenced = sequenced.len(), "indexing.plan.execute");

		let execution = IndexingPlanExecution::new(operations, Arc::clone(&orchestrator), factory).execute();
		let sequence = (!sequenced.is_empty()).then(|| {
			let (mut work_set, completion) = WorkSet::new(sequenced, step);
			(work_set.submit_to(&*orchestrator), completion)
		});

		async move {
			let builder = ExecutionReportBuilder::new();
			match sequence {
				Some((join, completion)) => {
					let (report, (), outcome) = futures::join!(execution, join, completion);
					builder.absorb(report);
					if let Err(failure) = outcome {
						builder.record_unattributed(failure);
					}
				}
				None => builder.absorb(execution.await),
			}
			builder.build()
		}
		.boxed()
	}
}

impl<W> Extend<WorkItem<W>> for IndexingPlan<W> {
	fn extend<I: IntoIterator<Item = WorkItem<W>>>(&mut self, items: I) {
		for item in items {
			self.push(item);
		}
	}
}
