//! Error types originated by the orchestration core.

use thiserror::Error;

use crate::failure::Failure;

/// Failures raised by this crate itself rather than by an orchestrator.
#[derive(Debug, Error)]
pub enum Error {
	/// The producer of a terminal signal was dropped before resolving it.
	#[error("work set was dropped before it settled")]
	Abandoned,

	/// A task running indexing work panicked.
	#[error("indexing work panicked: {0}")]
	Panicked(String),

	/// A task running indexing work was cancelled.
	#[error("indexing work was cancelled")]
	Cancelled,

	/// An entity reference was requested for an operation without an identifier.
	#[error("cannot reference an entity of type '{type_name}' without an identifier")]
	MissingIdentifier {
		/// Entity type name of the operation.
		type_name: String,
	},

	/// A plan execution reported at least one failure.
	#[error("indexing failure: {source}. The following entities may not have been updated correctly in the index: [{entities}]")]
	IndexingFailed {
		/// Comma-separated failing entity references.
		entities: String,
		/// Primary failure of the execution, carrying the others as suppressed.
		source: Failure,
	},
}

/// Result type for operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing indexing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or mapping it onto the configuration.
	#[error("invalid indexing configuration: {0}")]
	Toml(#[from] toml::de::Error),
}
