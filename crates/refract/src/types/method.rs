//! Method declarations and method sets
//!
//! A named type declares methods with value or pointer receivers. The method
//! set of a type is computed lazily, once, and cached in its descriptor:
//!
//! - `T` has the value-receiver methods declared on `T`
//! - `*T` has every method declared on `T`
//! - a struct gains the methods of its embedded members from the shallowest
//!   depth at which a name occurs; a name occurring more than once at that
//!   depth (as a field or a method) is dropped
//! - members reached through an embedded pointer contribute pointer-receiver
//!   methods too; embedded interfaces contribute all their methods
//!
//! Enumeration reports exported methods only, except for interface types,
//! which report every method.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::field::is_exported;
use super::kind::Kind;
use super::rtype::Type;
use crate::error::{raise, ReflectError};
use crate::value::Value;

/// Native method body: receives the receiver and the arguments
pub type MethodFn = dyn Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync;

/// Receiver form of a declared method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// `func (t T) M()`
    Value,
    /// `func (t *T) M()`
    Pointer,
}

/// Method declared on a named type
#[derive(Clone)]
pub struct MethodDef {
    pub(crate) name: String,
    pub(crate) receiver: Receiver,
    pub(crate) ty: Type,
    pub(crate) body: Arc<MethodFn>,
}

impl MethodDef {
    /// Declare a method.
    ///
    /// `ty` is the function type without the receiver. The body receives the
    /// receiver (a `T` value or a `*T` pointer, per `receiver`) and the call
    /// arguments, and must return one value per result of `ty`.
    pub fn new<F>(name: impl Into<String>, receiver: Receiver, ty: Type, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            receiver,
            ty,
            body: Arc::new(body),
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receiver form
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Function type without the receiver
    pub fn ty(&self) -> Type {
        self.ty
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Method of an interface type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceMethod {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) scope: String,
}

impl InterfaceMethod {
    /// Interface method `name` with function type `ty`
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: String::new(),
        }
    }

    /// Attach the declaring scope to unexported methods
    pub(crate) fn scoped(mut self, scope: &str) -> Self {
        self.scope = if is_exported(&self.name) {
            String::new()
        } else {
            scope.to_string()
        };
        self
    }
}

/// Method descriptor
#[derive(Debug, Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Function type, receiver excluded
    pub ty: Type,
    /// Receiver type; `None` for interface methods
    pub receiver: Option<Type>,
    /// Whether the name is exported
    pub exported: bool,
    /// Declaring scope
    pub scope: String,
    /// Position in the owner's method set
    pub index: usize,
    /// Type whose method set this came from
    pub owner: Type,
    /// Method expression taking the receiver as its first argument;
    /// `None` for interface methods
    pub func: Option<Value>,
}

// ============================================================================
// Method tables
// ============================================================================

/// Where a method-set entry is implemented
#[derive(Clone)]
pub(crate) enum MethodSource {
    /// A declared method of `owner`
    Declared { owner: Type, def: Arc<MethodDef> },
    /// A method of interface `owner`, dispatched on the dynamic type
    Interface { owner: Type },
}

/// One member of a method set
#[derive(Clone)]
pub(crate) struct MethodEntry {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) exported: bool,
    pub(crate) scope: String,
    /// Embedded-field positions leading from the receiver to the member
    /// that implements the method
    pub(crate) path: Vec<usize>,
    pub(crate) source: MethodSource,
}

/// Cached method set of a type
pub(crate) struct MethodTable {
    /// Full method set sorted by name, unexported methods included
    pub(crate) entries: Vec<MethodEntry>,
    /// Positions in `entries` reported by enumeration
    pub(crate) visible: Vec<usize>,
}

impl MethodTable {
    /// Entry by name in the full method set
    pub(crate) fn find(&self, name: &str) -> Option<&MethodEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// The i'th enumerable entry
    pub(crate) fn visible_entry(&self, i: usize) -> Option<&MethodEntry> {
        self.visible.get(i).map(|&pos| &self.entries[pos])
    }

    /// Enumeration position of an enumerable entry named `name`
    pub(crate) fn visible_position(&self, name: &str) -> Option<usize> {
        self.visible.iter().position(|&pos| self.entries[pos].name == name)
    }

    fn build(ty: Type) -> Self {
        let entries = match ty.kind() {
            Kind::Interface => ty
                .interface_methods()
                .iter()
                .map(|m| MethodEntry {
                    name: m.name.clone(),
                    ty: m.ty,
                    exported: is_exported(&m.name),
                    scope: m.scope.clone(),
                    path: Vec::new(),
                    source: MethodSource::Interface { owner: ty },
                })
                .collect(),
            Kind::Pointer if !ty.is_named() => {
                let base = ty.elem();
                let eligible = if base.is_named() {
                    !matches!(base.kind(), Kind::Pointer | Kind::Interface)
                } else {
                    base.kind() == Kind::Struct
                };
                if eligible {
                    collect(base, true)
                } else {
                    Vec::new()
                }
            }
            Kind::Pointer => Vec::new(),
            kind if ty.is_named() || kind == Kind::Struct => collect(ty, false),
            _ => Vec::new(),
        };
        let visible = if ty.kind() == Kind::Interface {
            (0..entries.len()).collect()
        } else {
            entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.exported)
                .map(|(i, _)| i)
                .collect()
        };
        Self { entries, visible }
    }
}

fn declared_entry(owner: Type, def: &Arc<MethodDef>, path: Vec<usize>) -> MethodEntry {
    MethodEntry {
        name: def.name.clone(),
        ty: def.ty,
        exported: is_exported(&def.name),
        scope: owner.scope().to_string(),
        path,
        source: MethodSource::Declared {
            owner,
            def: def.clone(),
        },
    }
}

/// Occurrences of a name at one depth, with the method it would promote
/// if it occurs exactly once
#[derive(Default)]
struct Candidate {
    count: usize,
    entry: Option<MethodEntry>,
}

impl Candidate {
    fn note(&mut self, entry: Option<MethodEntry>) {
        self.count += 1;
        self.entry = if self.count == 1 { entry } else { None };
    }
}

/// Method set of `base` (or of `*base` when `addressable`)
fn collect(base: Type, addressable: bool) -> Vec<MethodEntry> {
    let mut found: BTreeMap<String, MethodEntry> = BTreeMap::new();
    let mut blocked: FxHashSet<String> = FxHashSet::default();

    for def in base.declared_methods() {
        blocked.insert(def.name.clone());
        if def.receiver == Receiver::Value || addressable {
            found.insert(def.name.clone(), declared_entry(base, def, Vec::new()));
        }
    }

    let mut level: Vec<(Type, Vec<usize>, bool)> = Vec::new();
    if base.kind() == Kind::Struct {
        for (i, field) in base.fields().iter().enumerate() {
            blocked.insert(field.name.clone());
            if field.embedded {
                level.push((field.ty, vec![i], addressable));
            }
        }
    }

    let mut visited: FxHashSet<Type> = FxHashSet::default();
    visited.insert(base);

    while !level.is_empty() {
        let mut names: FxHashMap<String, Candidate> = FxHashMap::default();
        let mut next = Vec::new();
        let mut seen_here = Vec::new();

        for (field_ty, path, reachable_addr) in level {
            let (member, through_ptr) = if field_ty.kind() == Kind::Pointer {
                (field_ty.elem(), true)
            } else {
                (field_ty, false)
            };
            if visited.contains(&member) {
                continue;
            }
            seen_here.push(member);
            let addressable = reachable_addr || through_ptr;

            if member.kind() == Kind::Interface {
                for entry in &member.method_table().entries {
                    names.entry(entry.name.clone()).or_default().note(Some(MethodEntry {
                        path: path.clone(),
                        source: MethodSource::Interface { owner: member },
                        ..entry.clone()
                    }));
                }
                continue;
            }

            for def in member.declared_methods() {
                let usable = def.receiver == Receiver::Value || addressable;
                let entry = usable.then(|| declared_entry(member, def, path.clone()));
                names.entry(def.name.clone()).or_default().note(entry);
            }
            if member.kind() == Kind::Struct {
                for (i, field) in member.fields().iter().enumerate() {
                    names.entry(field.name.clone()).or_default().note(None);
                    if field.embedded {
                        let mut inner = path.clone();
                        inner.push(i);
                        next.push((field.ty, inner, addressable));
                    }
                }
            }
        }

        for (name, candidate) in names {
            if !blocked.insert(name.clone()) {
                continue;
            }
            if candidate.count == 1 {
                if let Some(entry) = candidate.entry {
                    found.insert(name, entry);
                }
            }
        }
        visited.extend(seen_here);
        level = next;
    }

    found.into_values().collect()
}

// ============================================================================
// Type-level method queries
// ============================================================================

impl Type {
    pub(crate) fn method_table(self) -> &'static MethodTable {
        self.0.table.get_or_init(|| {
            let table = MethodTable::build(self);
            tracing::trace!(
                ty = %self,
                methods = table.entries.len(),
                visible = table.visible.len(),
                "built method table"
            );
            table
        })
    }

    /// Number of methods in the enumerable method set
    pub fn num_methods(self) -> usize {
        self.method_table().visible.len()
    }

    /// The i'th method in the enumerable method set, sorted by name
    pub fn method(self, i: usize) -> Method {
        let table = self.method_table();
        match table.visible_entry(i) {
            Some(entry) => self.describe(entry, i),
            None => raise(ReflectError::IndexOutOfRange {
                method: "Type::method",
                index: i,
                len: table.visible.len(),
            }),
        }
    }

    /// Method by name from the enumerable method set
    pub fn method_by_name(self, name: &str) -> Option<Method> {
        let table = self.method_table();
        let index = table.visible_position(name)?;
        table.visible_entry(index).map(|entry| self.describe(entry, index))
    }

    fn describe(self, entry: &MethodEntry, index: usize) -> Method {
        let is_interface = self.kind() == Kind::Interface;
        let func = (!is_interface).then(|| method_expression(self, entry));
        Method {
            name: entry.name.clone(),
            ty: entry.ty,
            receiver: (!is_interface).then_some(self),
            exported: entry.exported,
            scope: entry.scope.clone(),
            index,
            owner: self,
            func,
        }
    }
}

/// `T.M` as a function whose first parameter is the receiver
fn method_expression(recv: Type, entry: &MethodEntry) -> Value {
    let mut params = vec![recv];
    params.extend_from_slice(entry.ty.params());
    let ty = Type::func_of(params, entry.ty.results().to_vec(), entry.ty.is_variadic());
    let entry = entry.clone();
    Value::make_func(ty, move |args| {
        let (receiver, rest) = match args.split_first() {
            Some(split) => split,
            None => raise(ReflectError::ArgumentCount {
                method: "method expression",
                got: 0,
                want: 1,
            }),
        };
        crate::invoke::call_entry(receiver, &entry, rest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn noop(name: &str, receiver: Receiver) -> MethodDef {
        MethodDef::new(name, receiver, Type::func_of(vec![], vec![], false), |_, _| Vec::new())
    }

    #[test]
    fn test_value_and_pointer_sets() {
        let t = Type::declare("main", "T").define(
            Type::struct_of(vec![]),
            vec![noop("B", Receiver::Pointer), noop("A", Receiver::Value)],
        );
        assert_eq!(t.num_methods(), 1);
        assert_eq!(t.method(0).name, "A");
        let p = Type::pointer_to(t);
        assert_eq!(p.num_methods(), 2);
        assert_eq!(p.method(1).name, "B");
        assert_eq!(p.method(1).receiver, Some(p));
    }

    #[test]
    fn test_unexported_hidden_from_enumeration() {
        let t = Type::declare("main", "U").define(
            Type::int(),
            vec![noop("hidden", Receiver::Value), noop("Shown", Receiver::Value)],
        );
        assert_eq!(t.num_methods(), 1);
        assert!(t.method_by_name("hidden").is_none());
        assert!(t.method_table().find("hidden").is_some());
    }

    #[test]
    fn test_ambiguous_promotion_dropped() {
        let a = Type::declare("main", "A").define(Type::struct_of(vec![]), vec![noop("M", Receiver::Value)]);
        let b = Type::declare("main", "B").define(Type::struct_of(vec![]), vec![noop("M", Receiver::Value)]);
        let outer = Type::struct_of(vec![Field::embedded(a), Field::embedded(b)]);
        assert_eq!(outer.num_methods(), 0);
        assert!(outer.method_by_name("M").is_none());
    }

    #[test]
    fn test_pointer_methods_promoted_through_embedded_pointer() {
        let e = Type::declare("main", "E").define(Type::struct_of(vec![]), vec![noop("P", Receiver::Pointer)]);
        let by_value = Type::struct_of(vec![Field::embedded(e)]);
        let by_ptr = Type::struct_of(vec![Field::embedded(Type::pointer_to(e))]);
        assert_eq!(by_value.num_methods(), 0);
        assert_eq!(Type::pointer_to(by_value).num_methods(), 1);
        assert_eq!(by_ptr.num_methods(), 1);
        assert_eq!(by_ptr.method(0).name, "P");
    }

    #[test]
    fn test_interface_enumerates_unexported() {
        let sig = Type::func_of(vec![Type::string()], vec![Type::int()], false);
        let iface = Type::interface_of(
            "main",
            vec![
                InterfaceMethod::new("b", sig),
                InterfaceMethod::new("A", sig),
                InterfaceMethod::new("a", sig),
            ],
        );
        assert_eq!(iface.num_methods(), 3);
        let names: Vec<String> = (0..3).map(|i| iface.method(i).name).collect();
        assert_eq!(names, vec!["A", "a", "b"]);
        assert!(iface.method(0).receiver.is_none());
        assert!(iface.method(0).func.is_none());
        assert_eq!(iface.method(1).scope, "main");
    }
}
