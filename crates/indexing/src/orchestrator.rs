//! Contracts consumed from the surrounding indexing engine.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::config::SequenceStep;
use crate::error::Error;
use crate::failure::Failure;
use crate::work::EntityId;

/// Completion signal of one unit of submitted work.
pub type WorkFuture = BoxFuture<'static, Result<(), Failure>>;

/// Returns a work future that has already succeeded.
pub fn completed() -> WorkFuture {
	futures::future::ready(Ok(())).boxed()
}

/// Returns a work future that has already failed with `failure`.
pub fn failed(failure: Failure) -> WorkFuture {
	futures::future::ready(Err(failure)).boxed()
}

/// Engine that accepts units of work and reports their completion.
///
/// Work is enqueued by the call to [`Orchestrator::submit`] itself; the
/// returned future only observes completion and must not be required to run
/// for the work to make progress. An `Err` return is a synchronous rejection.
pub trait Orchestrator<W>: Send + Sync {
	/// Hook invoked before the items of a work set are submitted.
	fn before_work_set(&self) -> Result<(), Failure> {
		Ok(())
	}

	/// Accepts one unit of work.
	fn submit(&self, work: W) -> Result<WorkFuture, Failure>;

	/// Runs the trailing step of a work set, e.g. a commit or refresh.
	fn after_work_set(&self, step: SequenceStep) -> Result<WorkFuture, Failure> {
		let _ = step;
		Ok(completed())
	}
}

impl<W, O> Orchestrator<W> for Arc<O>
where
	O: Orchestrator<W> + ?Sized,
{
	fn before_work_set(&self) -> Result<(), Failure> {
		(**self).before_work_set()
	}

	fn submit(&self, work: W) -> Result<WorkFuture, Failure> {
		(**self).submit(work)
	}

	fn after_work_set(&self, step: SequenceStep) -> Result<WorkFuture, Failure> {
		(**self).after_work_set(step)
	}
}

impl<W, O> Orchestrator<W> for &O
where
	O: Orchestrator<W> + ?Sized,
{
	fn before_work_set(&self) -> Result<(), Failure> {
		(**self).before_work_set()
	}

	fn submit(&self, work: W) -> Result<WorkFuture, Failure> {
		(**self).submit(work)
	}

	fn after_work_set(&self, step: SequenceStep) -> Result<WorkFuture, Failure> {
		(**self).after_work_set(step)
	}
}

/// Maps entity coordinates to references used when reporting failures.
pub trait EntityReferenceFactory: Send + Sync {
	/// Opaque, comparable reference to one entity.
	type Reference: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

	/// Builds the reference for `type_name#identifier`.
	fn create_entity_reference(&self, type_name: &str, identifier: Option<&EntityId>) -> Result<Self::Reference, Failure>;
}

/// Plain `type#id` entity reference.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityReference {
	type_name: String,
	id: EntityId,
}

impl EntityReference {
	/// Creates a reference.
	pub fn new(type_name: impl Into<String>, id: impl Into<EntityId>) -> Self {
		Self {
			type_name: type_name.into(),
			id: id.into(),
		}
	}

	/// Returns the entity type name.
	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	/// Returns the entity identifier.
	pub fn id(&self) -> &EntityId {
		&self.id
	}
}

impl fmt::Display for EntityReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.type_name, self.id)
	}
}

impl fmt::Debug for EntityReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

/// Factory producing [`EntityReference`] values.
///
/// Fails with [`Error::MissingIdentifier`] for operations without an identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntityReferenceFactory;

impl EntityReferenceFactory for DefaultEntityReferenceFactory {
	type Reference = EntityReference;

	fn create_entity_reference(&self, type_name: &str, identifier: Option<&EntityId>) -> Result<EntityReference, Failure> {
		let Some(id) = identifier else {
			return Err(Error::MissingIdentifier {
				type_name: type_name.to_string(),
			}
			.into());
		};
		Ok(EntityReference::new(type_name, id.clone()))
	}
}
