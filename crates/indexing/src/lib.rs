//! Asynchronous indexing-work orchestration.
//!
//! This crate submits pending index mutations to an external [`Orchestrator`]
//! and folds their completions back into one outcome:
//! * [`WorkSet`]: an ordered group of work plus a trailing sequence step
//!   (commit, refresh), settled as a single success or failure.
//! * [`IndexingPlanExecution`]: independent single-entity operations whose
//!   failures are aggregated into an [`ExecutionReport`] naming every failing
//!   entity. The report future never fails.
//! * [`IndexingPlan`]: a mix of both, reported as one batch.
//!
//! Failures are [`Failure`] values. When several occur, the first one
//! observed becomes primary and the others are attached to it as suppressed
//! failures, so none is lost.
//!
//! Completion futures may resolve on any orchestrator thread; all shared
//! accumulation is lock-guarded. The only task the crate spawns is a detached
//! [`WorkSetJoin`], on the ambient tokio runtime when there is one.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod execution;
pub mod failure;
pub mod orchestrator;
pub mod plan;
pub mod report;
mod runtime;
pub mod settle;
pub mod work;
pub mod work_set;

#[cfg(test)]
mod testing;

pub use config::{CommitStrategy, IndexingConfig, RefreshStrategy, SequenceStep};
pub use error::{ConfigError, Error, Result};
pub use execution::{ExecutionFuture, IndexingPlanExecution};
pub use failure::Failure;
pub use orchestrator::{DefaultEntityReferenceFactory, EntityReference, EntityReferenceFactory, Orchestrator, WorkFuture};
pub use plan::IndexingPlan;
pub use report::{ExecutionReport, ExecutionReportBuilder};
pub use settle::{settle_all, settlements};
pub use work::{EntityId, SingleOperation, WorkItem};
pub use work_set::{WorkSet, WorkSetCompletion, WorkSetJoin, WorkSetState};
