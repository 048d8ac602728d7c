//! Aggregated outcome of a batch of independent operations.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::error::Error;
use crate::failure::Failure;

/// Outcome of executing a batch of independent operations.
///
/// `throwable` is absent iff no operation failed. Every failure observed while
/// building the report sits either in `throwable` or in its suppressed chain.
#[derive(Debug, Clone)]
pub struct ExecutionReport<R> {
	throwable: Option<Failure>,
	failing: HashSet<R>,
}

impl<R> ExecutionReport<R> {
	/// Returns a report with no failure.
	pub fn success() -> Self {
		Self {
			throwable: None,
			failing: HashSet::new(),
		}
	}

	/// Returns the primary failure, carrying every other one as suppressed.
	pub fn throwable(&self) -> Option<&Failure> {
		self.throwable.as_ref()
	}

	/// Returns references to the entities whose operation failed.
	///
	/// Entities whose reference could not be built are absent; their failure
	/// is still present in the suppressed chain of [`Self::throwable`].
	pub fn failing_entity_references(&self) -> &HashSet<R> {
		&self.failing
	}

	/// Returns true if no operation failed.
	pub fn is_success(&self) -> bool {
		self.throwable.is_none()
	}

	/// Splits the report into its primary failure and failing references.
	pub fn into_parts(self) -> (Option<Failure>, HashSet<R>) {
		(self.throwable, self.failing)
	}
}

impl<R> Default for ExecutionReport<R> {
	fn default() -> Self {
		Self::success()
	}
}

impl<R> ExecutionReport<R>
where
	R: Eq + Hash,
{
	/// Folds several reports into one.
	///
	/// The first failing report's primary stays primary; the other primaries
	/// are suppressed onto it.
	pub fn merge(reports: impl IntoIterator<Item = Self>) -> Self {
		let builder = ExecutionReportBuilder::new();
		for report in reports {
			builder.absorb(report);
		}
		builder.build()
	}
}

impl<R> ExecutionReport<R>
where
	R: fmt::Debug,
{
	/// Converts a failed report into [`Error::IndexingFailed`].
	pub fn ensure_success(&self) -> Result<(), Error> {
		let Some(throwable) = &self.throwable else {
			return Ok(());
		};
		let mut entities: Vec<String> = self.failing.iter().map(|reference| format!("{reference:?}")).collect();
		entities.sort_unstable();
		Err(Error::IndexingFailed {
			entities: entities.join(", "),
			source: throwable.clone(),
		})
	}
}

struct Accumulator<R> {
	primary: Option<Failure>,
	failing: HashSet<R>,
}

impl<R> Accumulator<R> {
	fn attach(&mut self, failure: Failure) {
		match &self.primary {
			Some(primary) => primary.add_suppressed(failure),
			None => self.primary = Some(failure),
		}
	}
}

/// Thread-safe accumulator for an [`ExecutionReport`].
///
/// Each call takes one lock, so the choice of primary and the append to its
/// suppressed chain happen atomically with respect to concurrent callers.
pub struct ExecutionReportBuilder<R> {
	state: Mutex<Accumulator<R>>,
}

impl<R> Default for ExecutionReportBuilder<R> {
	fn default() -> Self {
		Self::new()
	}
}

impl<R> ExecutionReportBuilder<R> {
	/// Creates a builder with nothing recorded.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(Accumulator {
				primary: None,
				failing: HashSet::new(),
			}),
		}
	}

	/// Records a failure no entity can be blamed for.
	pub fn record_unattributed(&self, failure: Failure) {
		self.state.lock().attach(failure);
	}

	/// Finishes the report.
	pub fn build(self) -> ExecutionReport<R> {
		let Accumulator { primary, failing } = self.state.into_inner();
		ExecutionReport {
			throwable: primary,
			failing,
		}
	}
}

impl<R> ExecutionReportBuilder<R>
where
	R: Eq + Hash,
{
	/// Records one failed operation.
	///
	/// `reference` is the outcome of building the failing entity's reference.
	/// When that itself failed, the construction failure is suppressed onto
	/// the primary and the entity is left out of the failing set.
	pub fn record(&self, failure: Failure, reference: Result<R, Failure>) {
		let mut state = self.state.lock();
		state.attach(failure);
		match reference {
			Ok(reference) => {
				state.failing.insert(reference);
			}
			Err(construction) => state.attach(construction),
		}
	}

	/// Merges a finished report into this one.
	pub fn absorb(&self, report: ExecutionReport<R>) {
		let (throwable, failing) = report.into_parts();
		let mut state = self.state.lock();
		if let Some(throwable) = throwable {
			state.attach(throwable);
		}
		state.failing.extend(failing);
	}
}

impl<R> fmt::Debug for ExecutionReportBuilder<R>
where
	R: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("ExecutionReportBuilder")
			.field("primary", &state.primary)
			.field("failing", &state.failing)
			.finish()
	}
}
