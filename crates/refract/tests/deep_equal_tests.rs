//! Integration tests for deep equality

use std::collections::HashMap;

use refract::{deep_equal, Field, Type, Value};

fn node() -> Type {
    let node = Type::declare("graph", "Node");
    node.define(
        Type::struct_of(vec![
            Field::new("Name", Type::string()),
            Field::new("Edges", Type::slice_of(Type::pointer_to(node))),
        ]),
        Vec::new(),
    );
    node
}

// ============================================================================
// Composite values
// ============================================================================

mod composites {
    use super::*;

    #[test]
    fn test_slices_compare_elementwise() {
        assert!(deep_equal(&Value::of(vec![1i64, 2]), &Value::of(vec![1i64, 2])));
        assert!(!deep_equal(&Value::of(vec![1i64, 2]), &Value::of(vec![1i64])));
        assert!(!deep_equal(&Value::of(vec![1i64]), &Value::of(vec![1i32])));
    }

    #[test]
    fn test_maps_compare_entries() {
        let a: HashMap<String, i64> = [("x".to_string(), 1), ("y".to_string(), 2)].into_iter().collect();
        let b: HashMap<String, i64> = [("y".to_string(), 2), ("x".to_string(), 1)].into_iter().collect();
        let c: HashMap<String, i64> = [("x".to_string(), 1), ("z".to_string(), 2)].into_iter().collect();
        assert!(deep_equal(&Value::of(a.clone()), &Value::of(b)));
        assert!(!deep_equal(&Value::of(a), &Value::of(c)));
    }

    #[test]
    fn test_structs_and_pointers() {
        let t = Type::struct_of(vec![Field::new("A", Type::int64()), Field::new("b", Type::string())]);
        let x = Value::new_indirect(t);
        let y = Value::new_indirect(t);
        assert!(deep_equal(&x, &y));
        x.elem().field(0).set_int(1);
        assert!(!deep_equal(&x, &y));
        assert!(deep_equal(&x, &x.clone()));
        assert!(deep_equal(&x.elem(), &x.elem()));
    }

    #[test]
    fn test_interfaces_compare_dynamic_type() {
        let any = Type::empty_interface();
        let a = Value::of(1i64).convert(any);
        let b = Value::of(1i32).convert(any);
        assert!(!deep_equal(&a, &b));
        assert!(deep_equal(&a, &Value::of(1i64).convert(any)));
        assert!(deep_equal(&Value::zero(any), &Value::zero(any)));
    }

    #[test]
    fn test_slice_aliasing_same_backing() {
        let s = Value::of(vec![f64::NAN]);
        assert!(deep_equal(&s, &s.clone()));
        assert!(!deep_equal(&s.index(0), &s.index(0)));
    }
}

// ============================================================================
// Cycles
// ============================================================================

mod cycles {
    use super::*;

    fn cycle(ty: Type, names: [&str; 2]) -> Value {
        let a = Value::new_indirect(ty);
        let b = Value::new_indirect(ty);
        a.elem().field(0).set_string(names[0]);
        b.elem().field(0).set_string(names[1]);
        let edges = Type::slice_of(Type::pointer_to(ty));
        a.elem().field(1).set(&Value::zero(edges).append(&[b.clone()]));
        b.elem().field(1).set(&Value::zero(edges).append(&[a.clone()]));
        a
    }

    #[test]
    fn test_graph_cycles_terminate() {
        let ty = node();
        let x = cycle(ty, ["a", "b"]);
        assert!(deep_equal(&x, &cycle(ty, ["a", "b"])));
        assert!(!deep_equal(&x, &cycle(ty, ["a", "c"])));
        assert!(deep_equal(&x, &x.clone()));
        assert!(!deep_equal(&x, &cycle(node(), ["a", "b"])));
    }

    #[test]
    fn test_isomorphic_graphs_of_one_type() {
        let ty = node();
        let edges = Type::slice_of(Type::pointer_to(ty));
        let build = |name: &str| {
            let a = Value::new_indirect(ty);
            a.elem().field(0).set_string(name);
            a.elem().field(1).set(&Value::zero(edges).append(&[a.clone()]));
            a
        };
        assert!(deep_equal(&build("n"), &build("n")));
        assert!(!deep_equal(&build("n"), &build("m")));
    }

    #[test]
    fn test_cyclic_slice_of_interfaces() {
        let any = Type::empty_interface();
        let holder = Value::new_indirect(Type::slice_of(any)).elem();
        holder.set(&Value::make_slice(Type::slice_of(any), 1, 1));
        holder.index(0).set(&holder);
        assert!(deep_equal(&holder, &holder.clone()));
    }
}
