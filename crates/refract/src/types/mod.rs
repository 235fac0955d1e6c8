//! Type descriptors
//!
//! This module provides the static half of reflection:
//! - [`Kind`] and [`ChanDir`] tags
//! - [`Type`] handles with identity equality, backed by a process-wide cache
//! - struct fields ([`Field`], [`StructField`]) with promoted-field lookup
//! - methods ([`MethodDef`], [`Method`]) and lazily built method sets
//! - assignability, convertibility and interface implementation

mod field;
mod kind;
mod layout;
mod method;
mod registry;
mod relation;
mod rtype;

pub use field::{is_exported, Field, StructField};
pub use kind::{ChanDir, Kind};
pub use method::{InterfaceMethod, Method, MethodDef, MethodFn, Receiver};
pub use registry::cached_types;
pub use rtype::Type;

pub(crate) use method::{MethodEntry, MethodSource};
