//! Indexing configuration and the trailing sequence step it selects.

use serde::Deserialize;

use crate::error::ConfigError;

/// Whether the trailing sequence step forces a commit of written documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitStrategy {
	/// Commit once the work set's items have been applied.
	#[default]
	Force,
	/// Leave commits to the orchestrator's own schedule.
	None,
}

/// Whether the trailing sequence step forces a refresh of index readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshStrategy {
	/// Make written documents visible to searches right away.
	Force,
	/// Leave refreshes to the orchestrator's own schedule.
	#[default]
	None,
}

/// Parameters of the step an orchestrator runs after a work set's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SequenceStep {
	/// Commit policy for the step.
	pub commit: CommitStrategy,
	/// Refresh policy for the step.
	pub refresh: RefreshStrategy,
}

/// Indexing configuration, usually read from an `[indexing]`-style TOML table.
///
/// ```toml
/// commit = "force"
/// refresh = "none"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct IndexingConfig {
	/// Commit policy for work-set sequence steps.
	pub commit: CommitStrategy,
	/// Refresh policy for work-set sequence steps.
	pub refresh: RefreshStrategy,
}

impl IndexingConfig {
	/// Parses configuration from TOML text. Missing keys take their defaults.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Returns the sequence step this configuration selects.
	pub fn sequence_step(&self) -> SequenceStep {
		SequenceStep {
			commit: self.commit,
			refresh: self.refresh,
		}
	}
}
