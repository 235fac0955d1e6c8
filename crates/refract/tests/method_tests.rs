//! Integration tests for method sets, method descriptors and bound methods

use std::panic::AssertUnwindSafe;

use refract::{Field, InterfaceMethod, MethodDef, ReflectError, Receiver, Type, Value};

fn expect_panic<R>(f: impl FnOnce() -> R) -> ReflectError {
    let payload = std::panic::catch_unwind(AssertUnwindSafe(f))
        .err()
        .expect("operation should raise");
    payload
        .downcast_ref::<ReflectError>()
        .cloned()
        .expect("payload should be a ReflectError")
}

fn unit_sig() -> Type {
    Type::func_of(vec![], vec![], false)
}

fn int_sig() -> Type {
    Type::func_of(vec![], vec![Type::int()], false)
}

/// `type numM int` with two exported pointer methods and one unexported
fn num_m() -> Type {
    Type::declare("main", "numM").define(
        Type::int(),
        vec![
            MethodDef::new("Get", Receiver::Pointer, int_sig(), |recv, _| vec![recv.elem().convert(Type::int())]),
            MethodDef::new("Reset", Receiver::Pointer, unit_sig(), |recv, _| {
                recv.elem().set_int(0);
                Vec::new()
            }),
            MethodDef::new("bump", Receiver::Pointer, unit_sig(), |_, _| Vec::new()),
        ],
    )
}

// ============================================================================
// Method sets
// ============================================================================

mod method_sets {
    use super::*;

    #[test]
    fn test_num_m_counts() {
        let t = num_m();
        assert_eq!(t.num_methods(), 0);
        assert_eq!(Type::pointer_to(t).num_methods(), 2);

        let iface = Type::interface_of(
            "main",
            vec![
                InterfaceMethod::new("Get", int_sig()),
                InterfaceMethod::new("bump", unit_sig()),
            ],
        );
        assert_eq!(iface.num_methods(), 2);
        assert!(Type::pointer_to(t).implements(iface));
        assert!(!t.implements(iface));
    }

    #[test]
    fn test_method_descriptor() {
        let p = Type::pointer_to(num_m());
        let get = p.method_by_name("Get").unwrap();
        assert_eq!(get.index, 0);
        assert_eq!(get.ty, int_sig());
        assert_eq!(get.receiver, Some(p));
        assert!(get.exported);
        assert_eq!(get.scope, "main");
        assert!(p.method_by_name("bump").is_none());

        let expr = get.func.unwrap();
        assert_eq!(expr.ty().num_params(), 1);
        assert_eq!(expr.ty().param(0), p);
    }

    #[test]
    fn test_method_expression_takes_receiver() {
        let t = num_m();
        let ptr = Value::new_indirect(t);
        ptr.elem().set_int(12);
        let get = Type::pointer_to(t).method_by_name("Get").unwrap().func.unwrap();
        let out = get.call(&[ptr]);
        assert_eq!(out[0].get_int(), 12);
    }

    #[test]
    fn test_method_index_out_of_range() {
        let err = expect_panic(|| num_m().method(0));
        assert!(matches!(err, ReflectError::IndexOutOfRange { len: 0, .. }));
    }

    #[test]
    fn test_ambiguous_method_not_found() {
        let a = Type::declare("main", "A").define(Type::struct_of(vec![]), vec![MethodDef::new(
            "Run",
            Receiver::Value,
            unit_sig(),
            |_, _| Vec::new(),
        )]);
        let b = Type::declare("main", "B").define(Type::struct_of(vec![]), vec![MethodDef::new(
            "Run",
            Receiver::Value,
            unit_sig(),
            |_, _| Vec::new(),
        )]);
        let outer = Type::struct_of(vec![Field::embedded(a), Field::embedded(b)]);
        assert!(outer.method_by_name("Run").is_none());
        assert!(!Value::zero(outer).method_by_name("Run").is_valid());
    }
}

// ============================================================================
// Bound methods
// ============================================================================

mod bound_methods {
    use super::*;

    #[test]
    fn test_bound_method_excludes_receiver() {
        let p = Value::new_indirect(num_m());
        p.elem().set_int(5);
        let get = p.method_by_name("Get");
        assert_eq!(get.ty(), int_sig());
        assert_eq!(get.call(&[])[0].get_int(), 5);

        p.method(1).call(&[]);
        assert_eq!(p.elem().get_int(), 0);
    }

    #[test]
    fn test_dispatch_through_interface_value() {
        let sig = Type::func_of(vec![], vec![Type::string()], false);
        let iface = Type::interface_of("", vec![InterfaceMethod::new("Speak", sig)]);
        let dog = Type::declare("zoo", "Dog").define(
            Type::struct_of(vec![]),
            vec![MethodDef::new("Speak", Receiver::Value, sig, |_, _| vec![Value::of("woof")])],
        );
        let holder = Value::new_indirect(iface).elem();
        holder.set(&Value::zero(dog));
        let out = holder.method_by_name("Speak").call(&[]);
        assert_eq!(out[0].get_string(), "woof");
    }

    #[test]
    fn test_promoted_through_embedded_interface() {
        let sig = Type::func_of(vec![], vec![Type::string()], false);
        let iface = Type::named(
            "main",
            "Speaker",
            Type::interface_of("", vec![InterfaceMethod::new("Speak", sig)]),
        );
        let cat = Type::declare("zoo", "Cat").define(
            Type::struct_of(vec![]),
            vec![MethodDef::new("Speak", Receiver::Value, sig, |_, _| vec![Value::of("meow")])],
        );
        let wrapper = Type::struct_of(vec![Field::embedded(iface)]);
        assert_eq!(wrapper.num_methods(), 1);

        let w = Value::new_indirect(wrapper).elem();
        w.field(0).set(&Value::zero(cat));
        assert_eq!(w.method_by_name("Speak").call(&[])[0].get_string(), "meow");
    }

    #[test]
    fn test_method_on_nil_interface_raises() {
        let iface = Type::interface_of("", vec![InterfaceMethod::new("M", unit_sig())]);
        let nil = Value::zero(iface);
        let err = expect_panic(|| nil.method(0));
        assert!(matches!(err, ReflectError::InvalidOperation(_)));
    }
}
