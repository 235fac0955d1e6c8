//! Integration tests for value handles
//!
//! Settability, export tracking, conversion, host extraction and rendering.

use std::panic::AssertUnwindSafe;

use refract::{Complex, Field, Kind, PlainValue, ReflectError, Type, Value};
use serde_json::json;

fn expect_panic<R>(f: impl FnOnce() -> R) -> ReflectError {
    let payload = std::panic::catch_unwind(AssertUnwindSafe(f))
        .err()
        .expect("operation should raise");
    payload
        .downcast_ref::<ReflectError>()
        .cloned()
        .expect("payload should be a ReflectError")
}

fn account() -> Type {
    Type::named(
        "bank",
        "Account",
        Type::struct_of(vec![
            Field::new("Owner", Type::string()),
            Field::new("Tags", Type::slice_of(Type::string())),
            Field::new("Balance", Type::int()),
            Field::new("pin", Type::int()),
        ]),
    )
}

// ============================================================================
// Settability
// ============================================================================

mod settability {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let v = Value::new_indirect(Type::int64()).elem();
        v.set(&Value::of(7i64));
        assert_eq!(v.get_int(), 7);
        v.set_int(-3);
        assert_eq!(v.get_int(), -3);
        assert_eq!(v.export_as::<i64>().unwrap(), -3);
    }

    #[test]
    fn test_host_values_are_not_settable() {
        let v = Value::of(3i64);
        assert!(!v.can_set());
        let err = expect_panic(|| v.set_int(4));
        assert!(matches!(err, ReflectError::Unaddressable { .. }));
    }

    #[test]
    fn test_set_requires_assignable_type() {
        let v = Value::new_indirect(Type::int()).elem();
        let err = expect_panic(|| v.set(&Value::of(1i32)));
        assert!(matches!(err, ReflectError::NotAssignable { .. }));
    }

    #[test]
    fn test_setter_kind_mismatch() {
        let v = Value::new_indirect(Type::string()).elem();
        let err = expect_panic(|| v.set_int(1));
        assert_eq!(
            err,
            ReflectError::KindMismatch {
                method: "Value::set_int",
                kind: Kind::String
            }
        );
    }

    #[test]
    fn test_writes_through_pointer_are_shared() {
        let p = Value::new_indirect(account());
        let q = p.clone();
        p.elem().field_by_name("Balance").set_int(100);
        assert_eq!(q.elem().field(2).get_int(), 100);
    }
}

// ============================================================================
// Unexported fields
// ============================================================================

mod unexported {
    use super::*;

    #[test]
    fn test_unexported_field_is_read_only() {
        let acct = Value::new_indirect(account()).elem();
        let pin = acct.field_by_name("pin");
        assert!(pin.can_address());
        assert!(!pin.can_set());
        assert!(!pin.can_interface());
        assert_eq!(pin.get_int(), 0);

        let err = expect_panic(|| pin.set_int(1234));
        assert!(matches!(err, ReflectError::Unexported { .. }));
        assert!(matches!(pin.export_as::<i64>(), Err(ReflectError::Unexported { .. })));
    }

    #[test]
    fn test_read_only_flag_is_sticky() {
        let inner = Type::struct_of(vec![Field::new("V", Type::int())]);
        let outer = Type::struct_of(vec![Field::new("hidden", inner)]);
        let v = Value::new_indirect(outer).elem().field(0).field(0);
        assert!(!v.can_set());
        let err = expect_panic(|| v.export());
        assert!(matches!(err, ReflectError::Unexported { .. }));
    }

    #[test]
    fn test_unexported_value_cannot_be_stored() {
        let acct = Value::new_indirect(account()).elem();
        let target = Value::new_indirect(Type::int()).elem();
        let err = expect_panic(|| target.set(&acct.field(3)));
        assert!(matches!(err, ReflectError::Unexported { .. }));
    }
}

// ============================================================================
// Export
// ============================================================================

mod export {
    use super::*;

    #[test]
    fn test_export_struct_to_json() {
        let acct = Value::new_indirect(account()).elem();
        acct.field(0).set_string("ada");
        acct.field(1).set(&Value::of(vec!["a".to_string(), "b".to_string()]));
        acct.field(2).set_int(42);

        let plain = acct.field(1).export();
        assert_eq!(
            plain,
            PlainValue::List(vec![PlainValue::String("a".into()), PlainValue::String("b".into())])
        );

        let exported_only = Type::struct_of(vec![
            Field::new("Owner", Type::string()),
            Field::new("Balance", Type::int()),
        ]);
        let v = Value::new_indirect(exported_only).elem();
        v.field(0).set_string("ada");
        v.field(1).set_int(42);
        let json = serde_json::to_value(v.export()).unwrap();
        assert_eq!(json, json!({ "Owner": "ada", "Balance": 42 }));
    }

    #[test]
    fn test_export_nil_references() {
        assert_eq!(Value::zero(Type::slice_of(Type::int())).export(), PlainValue::Nil);
        assert_eq!(Value::zero(Type::pointer_to(Type::int())).export(), PlainValue::Nil);
        let p = Value::new_indirect(Type::int());
        assert!(matches!(p.export(), PlainValue::Reference { kind: Kind::Pointer, .. }));
    }

    #[test]
    fn test_export_as_vec() {
        let v = Value::of(vec![1i64, 2, 3]);
        assert_eq!(v.export_as::<Vec<i64>>().unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            v.export_as::<String>(),
            Err(ReflectError::ExtractMismatch { expected: "String", .. })
        ));
        assert!(Value::default().export_as::<bool>().is_err());
    }
}

// ============================================================================
// Conversion
// ============================================================================

mod conversion {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(Value::of(3.9f64).convert(Type::int()).get_int(), 3);
        assert_eq!(Value::of(300i64).convert(Type::uint8()).get_uint(), 44);
        assert_eq!(Value::of(-1i64).convert(Type::uint16()).get_uint(), 0xffff);
        assert_eq!(Value::of(5u8).convert(Type::float64()).get_float(), 5.0);
        let c = Value::of(Complex::new(1.0, 2.0)).convert(Type::complex64());
        assert_eq!(c.ty(), Type::complex64());
        assert_eq!(c.get_complex(), Complex::new(1.0, 2.0));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(Value::of(65i64).convert(Type::string()).get_string(), "A");
        let bytes = Value::of("hey").convert(Type::slice_of(Type::uint8()));
        assert_eq!(bytes.get_bytes(), b"hey".to_vec());
        assert_eq!(bytes.convert(Type::string()).get_string(), "hey");
    }

    #[test]
    fn test_named_conversion_keeps_value() {
        let celsius = Type::named("main", "Celsius", Type::float64());
        let c = Value::of(21.5f64).convert(celsius);
        assert_eq!(c.ty(), celsius);
        assert_eq!(c.get_float(), 21.5);
        assert!(!c.can_set());
    }

    #[test]
    fn test_into_interface() {
        let boxed = Value::of(9i64).convert(Type::empty_interface());
        assert_eq!(boxed.kind(), Kind::Interface);
        assert_eq!(boxed.elem().ty(), Type::int64());
        assert_eq!(boxed.elem().get_int(), 9);
    }

    #[test]
    fn test_inconvertible_raises() {
        let err = expect_panic(|| Value::of("7").convert(Type::int()));
        assert_eq!(
            err,
            ReflectError::NotConvertible {
                from: "string".into(),
                to: "int".into()
            }
        );
    }

    #[test]
    fn test_overflow_checks() {
        let v = Value::of(0i8);
        assert!(v.overflow_int(200));
        assert!(!v.overflow_int(-128));
        assert!(Value::of(0u8).overflow_uint(256));
        assert!(Value::of(0f32).overflow_float(1e39));
        assert!(!Value::of(0f64).overflow_float(1e39));
    }
}

// ============================================================================
// Interfaces and rendering
// ============================================================================

mod interfaces {
    use super::*;

    #[test]
    fn test_interface_holds_dynamic_value() {
        let slot = Value::new_indirect(Type::empty_interface()).elem();
        assert!(slot.is_nil());
        slot.set(&Value::of("hello"));
        assert!(!slot.is_nil());
        assert_eq!(slot.elem().kind(), Kind::String);
        assert_eq!(slot.to_string(), "hello");

        slot.set(&Value::zero(Type::empty_interface()));
        assert!(slot.is_nil());
        assert!(!slot.elem().is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::of(3.5f64).to_string(), "3.5");
        assert_eq!(Value::of(1e21f64).to_string(), "1e+21");
        assert_eq!(Value::of(true).to_string(), "true");
        assert_eq!(Value::of([1u8, 2]).to_string(), "[1 2]");
        assert_eq!(Value::zero(Type::map_of(Type::int(), Type::int())).to_string(), "map[]");
        assert_eq!(Value::zero(Type::empty_interface()).to_string(), "<nil>");
    }

    #[test]
    fn test_zero_and_nil() {
        assert!(Value::zero(account()).is_zero());
        assert!(Value::zero(Type::chan_of(refract::ChanDir::Both, Type::int())).is_nil());
        let err = expect_panic(|| Value::of(1i64).is_nil());
        assert!(matches!(err, ReflectError::KindMismatch { kind: Kind::Int64, .. }));
    }
}
