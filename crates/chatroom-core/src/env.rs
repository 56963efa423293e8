//! Environment abstraction for sender identity and wall-clock time.
//!
//! Decouples session logic from the calling context so tests can run with a
//! virtual clock and chosen identities while production reads the system
//! clock and process id.

/// Clock and identity provider consulted on every write.
///
/// # Invariants
///
/// - `wall_clock_secs()` never goes backwards within one execution context
/// - Methods are infallible; implementations resolve failures internally
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in whole seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> i64;

    /// Identity of the calling context, stamped as the message sender.
    fn sender_id(&self) -> i32;
}
