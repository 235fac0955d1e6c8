//! Refract: runtime type introspection and dynamic values
//!
//! This crate provides a reflection engine with Go's type system semantics:
//! - **Types**: interned type descriptors, named types with methods,
//!   promoted fields and methods, assignability and conversion rules
//!   (`types` module)
//! - **Values**: typed handles to independent or shared storage with
//!   addressability and export tracking (`value` module)
//! - **Containers**: slices, maps and channels (`container` module)
//! - **Calls**: dynamic calls, native function values and bound methods
//! - **Equality**: [`deep_equal`] over arbitrary, possibly cyclic values
//!
//! # Example
//!
//! ```rust,ignore
//! use refract::{Field, Type, Value};
//!
//! let point = Type::named(
//!     "geo",
//!     "Point",
//!     Type::struct_of(vec![Field::new("X", Type::int()), Field::new("Y", Type::int())]),
//! );
//! let p = Value::new_indirect(point).elem();
//! p.field_by_name("X").set_int(3);
//! assert_eq!(p.to_string(), "{3 0}");
//! ```
//!
//! Misuse (kind mismatches, writes through non-settable handles, bad
//! indices) panics with a [`ReflectError`] payload; see the `error` module.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Modules
// ============================================================================

/// Process-wide configuration: layout parameters
pub mod config;

/// Slices, maps and channels
pub mod container;

/// Recursive structural equality
mod deep_equal;

/// Error types
pub mod error;

/// Dynamic calls and method binding
mod invoke;

/// Type descriptors
pub mod types;

/// Value handles
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{Config, ConfigError, LayoutConfig};
pub use container::{copy, ChannelError, TryRecv};
pub use deep_equal::deep_equal;
pub use error::{ReflectError, ReflectResult};
pub use types::{
    cached_types, is_exported, ChanDir, Field, InterfaceMethod, Kind, Method, MethodDef, MethodFn, Receiver,
    StructField, Type,
};
pub use value::{Address, Complex, FromValue, NativeFn, PlainValue, Reflect, Value};
