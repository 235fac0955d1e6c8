//! Recursive structural equality

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::container::slice_elements;
use crate::types::Type;
use crate::value::{Data, PlaceId, Value};

/// Identity of a reference being compared
#[derive(Clone, PartialEq, Eq, Hash)]
enum Ref {
    Place(PlaceId),
    Map(usize),
}

/// Pairs of references under comparison on the current recursion path
type Visited = FxHashSet<(Ref, Ref, Type)>;

/// Whether `a` and `b` are deeply equal.
///
/// Values of different types are never equal. Two zero handles are equal;
/// a zero handle never equals a valid value. Non-nil functions are never
/// equal, a nil slice never equals an empty one and a nil map never equals
/// an empty one. Cyclic structures compare equal when the cycle is
/// revisited on the same pair of references.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    if !a.is_valid() || !b.is_valid() {
        return a.is_valid() == b.is_valid();
    }
    let ty = a.ty();
    if ty != b.ty() {
        return false;
    }
    let mut visited = Visited::default();
    equal(ty, &a.load(), &b.load(), &mut visited)
}

/// Compare the pair behind `key`, treating a revisit as equal
fn guarded(key: (Ref, Ref, Type), visited: &mut Visited, compare: impl FnOnce(&mut Visited) -> bool) -> bool {
    if !visited.insert(key.clone()) {
        return true;
    }
    let result = compare(visited);
    visited.remove(&key);
    result
}

fn equal(ty: Type, a: &Data, b: &Data, visited: &mut Visited) -> bool {
    match (a, b) {
        (Data::Bool(x), Data::Bool(y)) => x == y,
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Uint(x), Data::Uint(y)) => x == y,
        (Data::Float(x), Data::Float(y)) => x == y,
        (Data::Complex(x), Data::Complex(y)) => x.re == y.re && x.im == y.im,
        (Data::String(x), Data::String(y)) => x == y,
        (Data::Array(xs), Data::Array(ys)) => {
            let elem = ty.elem();
            xs.iter().zip(ys).all(|(x, y)| equal(elem, x, y, visited))
        }
        (Data::Struct(xs), Data::Struct(ys)) => ty
            .fields()
            .iter()
            .zip(xs.iter().zip(ys))
            .all(|(field, (x, y))| equal(field.ty, x, y, visited)),
        (Data::Slice(x), Data::Slice(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                if x.len != y.len {
                    return false;
                }
                let (px, py) = (x.element(0), y.element(0));
                if px.same(&py) {
                    return true;
                }
                let key = (Ref::Place(px.id()), Ref::Place(py.id()), ty);
                guarded(key, visited, |visited| {
                    let elem = ty.elem();
                    let (xs, ys) = (slice_elements(x), slice_elements(y));
                    xs.iter().zip(&ys).all(|(x, y)| equal(elem, x, y, visited))
                })
            }
            _ => false,
        },
        (Data::Map(x), Data::Map(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                if Arc::ptr_eq(x, y) {
                    return true;
                }
                if x.len() != y.len() {
                    return false;
                }
                let key = (
                    Ref::Map(Arc::as_ptr(x) as usize),
                    Ref::Map(Arc::as_ptr(y) as usize),
                    ty,
                );
                guarded(key, visited, |visited| {
                    let elem = ty.elem();
                    x.entries().iter().all(|(k, v)| match y.get(k) {
                        Some(w) => equal(elem, v, &w, visited),
                        None => false,
                    })
                })
            }
            _ => false,
        },
        (Data::Pointer(x), Data::Pointer(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                if x.same(y) {
                    return true;
                }
                let key = (Ref::Place(x.id()), Ref::Place(y.id()), ty);
                guarded(key, visited, |visited| equal(ty.elem(), &x.load(), &y.load(), visited))
            }
            _ => false,
        },
        (Data::Interface(x), Data::Interface(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => x.ty == y.ty && equal(x.ty, &x.data, &y.data, visited),
            _ => false,
        },
        (Data::Func(x), Data::Func(y)) => x.is_none() && y.is_none(),
        (Data::UnsafePointer(x), Data::UnsafePointer(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => x.same(y),
            _ => false,
        },
        (Data::Chan(x), Data::Chan(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn test_scalars_and_types() {
        assert!(deep_equal(&Value::of(1i64), &Value::of(1i64)));
        assert!(!deep_equal(&Value::of(1i64), &Value::of(1i32)));
        assert!(!deep_equal(&Value::of(f64::NAN), &Value::of(f64::NAN)));
        assert!(deep_equal(&Value::default(), &Value::default()));
        assert!(!deep_equal(&Value::default(), &Value::of(0i64)));
    }

    #[test]
    fn test_nil_versus_empty() {
        let ty = Type::slice_of(Type::int());
        let nil = Value::zero(ty);
        let empty = Value::make_slice(ty, 0, 0);
        assert!(!deep_equal(&nil, &empty));
        assert!(deep_equal(&nil, &Value::zero(ty)));

        let mty = Type::map_of(Type::string(), Type::int());
        assert!(!deep_equal(&Value::zero(mty), &Value::make_map(mty)));
        assert!(deep_equal(&Value::make_map(mty), &Value::make_map(mty)));
    }

    #[test]
    fn test_functions() {
        let ty = Type::func_of(vec![], vec![], false);
        let f = Value::make_func(ty, |_| Vec::new());
        assert!(deep_equal(&Value::zero(ty), &Value::zero(ty)));
        assert!(!deep_equal(&f, &f.clone()));
        assert!(!deep_equal(&f, &Value::zero(ty)));
    }

    #[test]
    fn test_cyclic_pointers_terminate() {
        let node = Type::declare("main", "Node");
        let ptr = Type::pointer_to(node);
        node.define(
            Type::struct_of(vec![Field::new("V", Type::int64()), Field::new("Next", ptr)]),
            Vec::new(),
        );
        let ring = |v: i64| {
            let p = Value::new_indirect(node);
            p.elem().field(0).set_int(v);
            p.elem().field(1).set(&p);
            p
        };
        assert!(deep_equal(&ring(1), &ring(1)));
        assert!(!deep_equal(&ring(1), &ring(2)));
    }
}
