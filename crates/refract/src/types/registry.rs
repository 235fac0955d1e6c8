//! Process-wide cache of unnamed type descriptors
//!
//! Every unnamed shape (`[]int`, `map[string]bool`, `struct { a int }`, ...)
//! is derived once and leaked, so that structurally identical requests
//! return the identical descriptor and `==` on [`Type`] is type identity.
//! Named types bypass the cache: each declaration is distinct.

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::kind::{ChanDir, Kind};
use super::rtype::{Type, TypeData};

/// Structural identity of an unnamed type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
    Basic(Kind),
    Array(usize, Type),
    Chan(ChanDir, Type),
    Func {
        params: Vec<Type>,
        results: Vec<Type>,
        variadic: bool,
    },
    /// `(name, type, scope)` per method, sorted by name; scope is empty for
    /// exported methods
    Interface(Vec<(String, Type, String)>),
    Map(Type, Type),
    Pointer(Type),
    Slice(Type),
    /// `(name, type, embedded)` per field, in declaration order
    Struct(Vec<(String, Type, bool)>),
}

static CACHE: Lazy<DashMap<TypeKey, Type>> = Lazy::new(DashMap::new);

/// Return the descriptor for `key`, deriving it with `build` on first use.
///
/// `build` runs while the cache shard is locked and must not intern other
/// types; callers derive component types before calling this.
pub(crate) fn intern(key: TypeKey, build: impl FnOnce() -> TypeData) -> Type {
    if let Some(found) = CACHE.get(&key) {
        return *found;
    }
    let entry = CACHE.entry(key).or_insert_with(|| {
        let ty = Type::leak(build());
        tracing::debug!(ty = %ty, "derived type descriptor");
        ty
    });
    *entry
}

/// Number of unnamed descriptors derived so far
pub fn cached_types() -> usize {
    CACHE.len()
}
