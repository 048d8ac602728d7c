//! Shared failure values with suppressed-failure chains.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinError;

use crate::error::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// One failure of indexing work, shared by every holder of a clone.
///
/// Clones refer to the same failure: suppressed failures appended through one
/// clone are visible through all of them, and [`Failure::ptr_eq`] compares
/// identity rather than content.
#[derive(Clone)]
pub struct Failure {
	inner: Arc<FailureInner>,
}

struct FailureInner {
	error: BoxError,
	suppressed: Mutex<Vec<Failure>>,
}

impl Failure {
	/// Wraps an error into a new failure with an empty suppressed chain.
	pub fn new(error: impl Into<BoxError>) -> Self {
		Self {
			inner: Arc::new(FailureInner {
				error: error.into(),
				suppressed: Mutex::new(Vec::new()),
			}),
		}
	}

	/// Creates a failure carrying only a message.
	pub fn msg(message: impl fmt::Display) -> Self {
		Self::new(message.to_string())
	}

	/// Converts the outcome of a failed task join.
	///
	/// Panics keep their payload message when it is a string. Cancellation
	/// becomes [`Error::Cancelled`].
	pub fn from_join_error(err: JoinError) -> Self {
		if !err.is_panic() {
			return Error::Cancelled.into();
		}
		match err.try_into_panic() {
			Ok(payload) => Error::Panicked(panic_message(payload)).into(),
			Err(err) => Self::new(err),
		}
	}

	/// Returns the wrapped error.
	pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
		&*self.inner.error
	}

	/// Returns the wrapped error as `E` if it has that type.
	pub fn downcast_ref<E>(&self) -> Option<&E>
	where
		E: StdError + 'static,
	{
		self.inner.error.downcast_ref::<E>()
	}

	/// Attaches `other` to this failure's suppressed chain.
	///
	/// A failure is never suppressed onto itself and never appended twice.
	/// Longer cycles through other failures are kept, so no failure drops out
	/// of a chain; `Debug` output marks them as circular references.
	pub fn add_suppressed(&self, other: Failure) {
		if Self::ptr_eq(self, &other) {
			return;
		}
		let mut suppressed = self.inner.suppressed.lock();
		if suppressed.iter().any(|existing| Self::ptr_eq(existing, &other)) {
			return;
		}
		suppressed.push(other);
	}

	/// Returns a snapshot of the suppressed chain in attachment order.
	pub fn suppressed(&self) -> Vec<Failure> {
		self.inner.suppressed.lock().clone()
	}

	/// Returns true if both handles refer to the same failure.
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.inner, &b.inner)
	}
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	match payload.downcast::<String>() {
		Ok(message) => *message,
		Err(payload) => payload
			.downcast_ref::<&'static str>()
			.map_or_else(|| "non-string panic payload".to_string(), |message| (*message).to_string()),
	}
}

impl From<Error> for Failure {
	fn from(error: Error) -> Self {
		Self::new(error)
	}
}

impl fmt::Display for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.inner.error, f)
	}
}

impl fmt::Debug for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(
			&ChainDebug {
				failure: self,
				ancestors: Vec::new(),
			},
			f,
		)
	}
}

/// Debug view of one failure of a suppressed chain.
///
/// Chains may be cyclic when orchestrators hand back failures that already
/// suppress each other. A failure met again below itself is printed as a
/// circular reference instead of being descended into.
struct ChainDebug<'a> {
	failure: &'a Failure,
	ancestors: Vec<*const FailureInner>,
}

impl fmt::Debug for ChainDebug<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let ptr = Arc::as_ptr(&self.failure.inner);
		if self.ancestors.contains(&ptr) {
			return write!(f, "Failure(circular reference: {})", self.failure);
		}

		// Snapshot first: the lock must not be held while children are formatted.
		let suppressed = self.failure.suppressed();
		let mut ancestors = self.ancestors.clone();
		ancestors.push(ptr);
		let children: Vec<_> = suppressed
			.iter()
			.map(|failure| ChainDebug {
				failure,
				ancestors: ancestors.clone(),
			})
			.collect();
		f.debug_struct("Failure")
			.field("error", &self.failure.inner.error)
			.field("suppressed", &children)
			.finish()
	}
}

impl StdError for Failure {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.inner.error.source()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_the_suppressed_chain() {
		let primary = Failure::msg("work1");
		let observer = primary.clone();
		primary.add_suppressed(Failure::msg("work3"));

		let suppressed = observer.suppressed();
		assert_eq!(suppressed.len(), 1);
		assert_eq!(suppressed[0].to_string(), "work3");
		assert!(Failure::ptr_eq(&primary, &observer));
	}

	#[test]
	fn self_and_duplicate_suppression_are_ignored() {
		let primary = Failure::msg("primary");
		let other = Failure::msg("other");
		primary.add_suppressed(primary.clone());
		primary.add_suppressed(other.clone());
		primary.add_suppressed(other);
		assert_eq!(primary.suppressed().len(), 1);
	}

	#[test]
	fn equal_messages_are_distinct_failures() {
		let a = Failure::msg("same");
		let b = Failure::msg("same");
		a.add_suppressed(b.clone());
		assert!(!Failure::ptr_eq(&a, &b));
		assert_eq!(a.suppressed().len(), 1);
	}

	#[test]
	fn downcasts_to_crate_error() {
		let failure = Failure::from(Error::MissingIdentifier { type_name: "Book".into() });
		assert!(matches!(failure.downcast_ref::<Error>(), Some(Error::MissingIdentifier { type_name }) if type_name == "Book"));
		assert!(failure.downcast_ref::<std::io::Error>().is_none());
	}

	#[test]
	fn debug_of_mutually_suppressing_failures_terminates() {
		let bulk = Failure::msg("bulk");
		let item = Failure::msg("item");
		bulk.add_suppressed(item.clone());
		item.add_suppressed(bulk.clone());

		let rendered = format!("{item:?}");
		assert!(rendered.contains("circular reference: item"), "got: {rendered}");
		assert!(rendered.contains("\"bulk\""), "got: {rendered}");
		assert_eq!(item.suppressed().len(), 1);
	}

	#[tokio::test]
	async fn join_error_keeps_panic_message() {
		let handle = tokio::spawn(async { panic!("{}", String::from("boom-string")) });
		let failure = Failure::from_join_error(handle.await.unwrap_err());
		assert!(failure.to_string().contains("boom-string"), "got: {failure}");
	}

	#[tokio::test]
	async fn join_error_keeps_static_panic_message() {
		let handle = tokio::spawn(async { panic!("boom-str") });
		let failure = Failure::from_join_error(handle.await.unwrap_err());
		assert!(matches!(failure.downcast_ref::<Error>(), Some(Error::Panicked(msg)) if msg == "boom-str"));
	}

	#[tokio::test]
	async fn join_error_from_abort_is_cancellation() {
		let handle = tokio::spawn(async {
			tokio::time::sleep(std::time::Duration::from_secs(60)).await;
		});
		handle.abort();
		let failure = Failure::from_join_error(handle.await.unwrap_err());
		assert!(matches!(failure.downcast_ref::<Error>(), Some(Error::Cancelled)));
	}
}
