//! Work items handed to the orchestration core by the mapping layer.

use std::fmt;

/// Identifier of one indexed entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
	/// Returns the identifier text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for EntityId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&str> for EntityId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

macro_rules! entity_id_from_int {
	($($ty:ty),*) => {
		$(impl From<$ty> for EntityId {
			fn from(id: $ty) -> Self {
				Self(id.to_string())
			}
		})*
	};
}

entity_id_from_int!(i32, i64, u32, u64, usize);

/// One unit of work belonging to one entity.
///
/// The identifier may be absent, e.g. for delete-by-query work whose targets
/// are only known to the index engine.
#[derive(Debug, Clone)]
pub struct SingleOperation<W> {
	work: W,
	target: OperationTarget,
}

impl<W> SingleOperation<W> {
	/// Creates an operation on the entity `type_name#identifier`.
	pub fn new(type_name: impl Into<String>, identifier: impl Into<EntityId>, work: W) -> Self {
		Self {
			work,
			target: OperationTarget {
				type_name: type_name.into(),
				identifier: Some(identifier.into()),
			},
		}
	}

	/// Creates an operation whose entity identifier is not known.
	pub fn unidentified(type_name: impl Into<String>, work: W) -> Self {
		Self {
			work,
			target: OperationTarget {
				type_name: type_name.into(),
				identifier: None,
			},
		}
	}

	/// Returns the work handle sent to the orchestrator.
	pub fn work(&self) -> &W {
		&self.work
	}

	/// Returns the entity type name.
	pub fn type_name(&self) -> &str {
		&self.target.type_name
	}

	/// Returns the entity identifier, if known.
	pub fn identifier(&self) -> Option<&EntityId> {
		self.target.identifier.as_ref()
	}

	pub(crate) fn into_parts(self) -> (W, OperationTarget) {
		(self.work, self.target)
	}
}

/// Entity coordinates kept after an operation's work has been submitted.
#[derive(Debug, Clone)]
pub(crate) struct OperationTarget {
	type_name: String,
	identifier: Option<EntityId>,
}

impl OperationTarget {
	pub(crate) fn type_name(&self) -> &str {
		&self.type_name
	}

	pub(crate) fn identifier(&self) -> Option<&EntityId> {
		self.identifier.as_ref()
	}
}

/// A work item of either shape accepted by [`crate::IndexingPlan`].
#[derive(Debug, Clone)]
pub enum WorkItem<W> {
	/// Independent work attributed to one entity.
	Single(SingleOperation<W>),
	/// Work submitted as part of an ordered work set.
	Sequenced(W),
}

impl<W> WorkItem<W> {
	/// Returns the work handle.
	pub fn work(&self) -> &W {
		match self {
			Self::Single(operation) => operation.work(),
			Self::Sequenced(work) => work,
		}
	}

	/// Returns true for work-set items.
	pub fn is_sequenced(&self) -> bool {
		matches!(self, Self::Sequenced(_))
	}
}

impl<W> From<SingleOperation<W>> for WorkItem<W> {
	fn from(operation: SingleOperation<W>) -> Self {
		Self::Single(operation)
	}
}
