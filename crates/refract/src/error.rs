//! Error types for the reflection engine
//!
//! Two classes of failure exist:
//!
//! - **Programming errors**: kind mismatches, out-of-range indices, writes
//!   through non-settable handles, calls of non-function values. These are
//!   raised as panics whose payload is a [`ReflectError`], so a caller may
//!   `catch_unwind` and downcast the payload to inspect what went wrong.
//! - **Recoverable errors**: extracting host data out of a value
//!   ([`crate::FromValue`]) returns a [`ReflectResult`].
//!
//! Expected absence (field or method lookup by name, map lookup) is neither:
//! it is reported as the zero [`crate::Value`] or `None`.

use crate::container::ChannelError;
use crate::types::Kind;

/// Reflection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectError {
    /// Operation applied to a value or type of the wrong kind
    #[error("reflect: call of {method} on {}", kind_phrase(.kind))]
    KindMismatch {
        /// Operation name
        method: &'static str,
        /// Kind of the receiver (`Invalid` for the zero handle)
        kind: Kind,
    },

    /// Kind-conditional type query on a type of another kind
    #[error("reflect: {method} of invalid type {ty}")]
    InvalidTypeQuery {
        /// Query name
        method: &'static str,
        /// The queried type
        ty: String,
    },

    /// Write or address-of on a value without stable storage
    #[error("reflect: {method} using unaddressable value")]
    Unaddressable {
        /// Operation name
        method: &'static str,
    },

    /// Write or export of a value reached through an unexported field
    #[error("reflect: {method} using value obtained using unexported field")]
    Unexported {
        /// Operation name
        method: &'static str,
    },

    /// Index outside `[0, len)`
    #[error("reflect: {method}: index {index} out of range [0, {len})")]
    IndexOutOfRange {
        /// Operation name
        method: &'static str,
        /// Requested index
        index: usize,
        /// Number of elements
        len: usize,
    },

    /// Slice bounds, length or capacity outside the legal range
    #[error("reflect: {method}: {detail}")]
    Bounds {
        /// Operation name
        method: &'static str,
        /// Description of the violated bound
        detail: String,
    },

    /// Value cannot be assigned to the destination type
    #[error("reflect: {method}: value of type {from} is not assignable to type {to}")]
    NotAssignable {
        /// Operation name
        method: &'static str,
        /// Source type
        from: String,
        /// Destination type
        to: String,
    },

    /// Value cannot be converted to the requested type
    #[error("reflect: cannot convert value of type {from} to type {to}")]
    NotConvertible {
        /// Source type
        from: String,
        /// Destination type
        to: String,
    },

    /// Wrong number of arguments for a dynamic call
    #[error("reflect: {method} with {got} input arguments, expected {want}")]
    ArgumentCount {
        /// Operation name
        method: &'static str,
        /// Number of arguments supplied
        got: usize,
        /// Number of arguments required
        want: usize,
    },

    /// A dynamically implemented function returned the wrong number of results
    #[error("reflect: function of type {ty} returned {got} results, expected {want}")]
    ResultCount {
        /// Function type
        ty: String,
        /// Number of results returned
        got: usize,
        /// Number of results declared
        want: usize,
    },

    /// Call of a nil function value
    #[error("reflect: call of nil function")]
    NilFunction,

    /// Kind-dependent query on a declared but never defined named type
    #[error("reflect: use of incomplete type {0}")]
    IncompleteType(String),

    /// Channel misuse
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Any other contract violation
    #[error("reflect: {0}")]
    InvalidOperation(String),

    /// Host-side extraction into an incompatible Rust type
    #[error("reflect: cannot extract {expected} from {found} value")]
    ExtractMismatch {
        /// Rust type requested
        expected: &'static str,
        /// Type of the value
        found: String,
    },
}

/// Reflection result
pub type ReflectResult<T> = Result<T, ReflectError>;

fn kind_phrase(kind: &Kind) -> String {
    match kind {
        Kind::Invalid => "zero Value".to_string(),
        other => format!("{} Value", other),
    }
}

/// Raise a programming error.
///
/// The panic payload is the [`ReflectError`] itself.
#[cold]
#[track_caller]
pub(crate) fn raise(err: ReflectError) -> ! {
    tracing::trace!(error = %err, "reflect programming error");
    std::panic::panic_any(err)
}

/// Shorthand for [`ReflectError::InvalidOperation`]
#[cold]
#[track_caller]
pub(crate) fn invalid(message: impl Into<String>) -> ! {
    raise(ReflectError::InvalidOperation(message.into()))
}
