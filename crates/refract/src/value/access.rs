//! Navigation and addressing: pointers, interfaces, struct fields,
//! addresses and assignment

use std::fmt;

use super::data::{Data, Place};
use super::flags::Flags;
use super::{corrupt, Slot, Value};
use crate::error::{invalid, raise, ReflectError};
use crate::types::{Kind, Type};

/// Opaque storage location of an addressable value.
///
/// Produced by [`Value::storage`] and accepted by [`Value::new_at`] to view
/// the same storage through another type with the same underlying type.
#[derive(Clone)]
pub struct Address {
    place: Place,
}

impl Address {
    /// Numeric address of the location
    pub fn addr(&self) -> usize {
        self.place.address()
    }

    /// Type of the data stored at the location
    pub fn ty(&self) -> Type {
        self.place.ty()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x}: {})", self.addr(), self.ty())
    }
}

impl Value {
    /// The value an Interface holds or a Pointer points to.
    ///
    /// Returns the zero handle for a nil interface or pointer. The pointee
    /// of a pointer is addressable.
    pub fn elem(&self) -> Value {
        let h = self.handle("Value::elem");
        match h.ty.kind() {
            Kind::Interface => {
                let boxed = self.read(|d| match d {
                    Data::Interface(b) => b.clone(),
                    _ => corrupt(),
                });
                match boxed {
                    Some(b) => Value::direct_flagged(b.ty, b.data, h.flags.ro()),
                    None => Value::default(),
                }
            }
            Kind::Pointer => match self.pointee() {
                Some(place) => Value::at(h.ty.elem(), place, h.flags.ro()),
                None => Value::default(),
            },
            kind => raise(ReflectError::KindMismatch {
                method: "Value::elem",
                kind,
            }),
        }
    }

    /// `v.elem()` for a Pointer, `v` itself otherwise
    pub fn indirect(&self) -> Value {
        if self.kind() == Kind::Pointer {
            self.elem()
        } else {
            self.clone()
        }
    }

    pub(crate) fn pointee(&self) -> Option<Place> {
        self.read(|d| match d {
            Data::Pointer(p) => p.clone(),
            _ => corrupt(),
        })
    }

    /// Number of fields of a Struct
    pub fn num_fields(&self) -> usize {
        self.expect_kind("Value::num_fields", Kind::Struct).ty.num_fields()
    }

    /// The i'th field of a Struct.
    ///
    /// The field is addressable iff the struct is; it is read-only if it is
    /// unexported.
    pub fn field(&self, i: usize) -> Value {
        let h = self.expect_kind("Value::field", Kind::Struct);
        let field = self.struct_field(i, "Value::field");
        let mut flags = h.flags.intersection(Flags::STICKY_RO | Flags::ADDR);
        if !field.exported {
            flags = flags
                | if field.embedded {
                    Flags::EMBED_RO
                } else {
                    Flags::STICKY_RO
                };
        }
        self.child(i, field.ty, flags)
    }

    /// Field access for method receiver navigation: no visibility flags
    /// are added, the receiver's own flags carry over
    pub(crate) fn field_raw(&self, i: usize) -> Value {
        let h = self.expect_kind("Value::field", Kind::Struct);
        let field = self.struct_field(i, "Value::field");
        self.child(i, field.ty, h.flags)
    }

    fn struct_field(&self, i: usize, method: &'static str) -> &'static crate::types::StructField {
        let fields = self.ty().fields();
        match fields.get(i) {
            Some(field) => field,
            None => raise(ReflectError::IndexOutOfRange {
                method,
                index: i,
                len: fields.len(),
            }),
        }
    }

    /// Element `i` of the aggregate as a value of type `ty`
    pub(crate) fn child(&self, i: usize, ty: Type, flags: Flags) -> Value {
        match &self.handle("Value::child").slot {
            Slot::At(place) => Value::at(ty, place.child(i), flags),
            Slot::Direct(Data::Struct(items)) | Slot::Direct(Data::Array(items)) => {
                Value::direct_flagged(ty, items[i].clone(), flags)
            }
            Slot::Direct(_) => corrupt(),
        }
    }

    /// Nested field reached by `index`, dereferencing embedded pointers.
    ///
    /// Raises when an embedded pointer on the way is nil.
    pub fn field_by_index(&self, index: &[usize]) -> Value {
        let mut v = self.clone();
        for (step, &i) in index.iter().enumerate() {
            if step > 0 && v.kind() == Kind::Pointer && v.ty().elem().kind() == Kind::Struct {
                if v.is_nil() {
                    invalid("indirection through nil pointer to embedded struct");
                }
                v = v.elem();
            }
            v = v.field(i);
        }
        v
    }

    /// Field by name, searching embedded structs; the zero handle if absent
    /// or ambiguous
    pub fn field_by_name(&self, name: &str) -> Value {
        let h = self.expect_kind("Value::field_by_name", Kind::Struct);
        match h.ty.field_by_name(name) {
            Some(field) => self.field_by_index(&field.index),
            None => Value::default(),
        }
    }

    /// First field whose name satisfies `pred`, breadth-first; the zero
    /// handle if absent or ambiguous
    pub fn field_by_predicate(&self, pred: impl Fn(&str) -> bool) -> Value {
        let h = self.expect_kind("Value::field_by_predicate", Kind::Struct);
        match h.ty.field_by_predicate(pred) {
            Some(field) => self.field_by_index(&field.index),
            None => Value::default(),
        }
    }

    /// Whether the value aliases stable storage
    pub fn can_address(&self) -> bool {
        self.handle("Value::can_address").flags.contains(Flags::ADDR)
    }

    /// Pointer to the value; raises unless addressable
    pub fn address(&self) -> Value {
        let h = self.handle("Value::address");
        match &h.slot {
            Slot::At(place) if h.flags.contains(Flags::ADDR) => Value::direct_flagged(
                Type::pointer_to(h.ty),
                Data::Pointer(Some(place.clone())),
                h.flags.intersection(Flags::RO),
            ),
            _ => raise(ReflectError::Unaddressable {
                method: "Value::address",
            }),
        }
    }

    /// Numeric address of an addressable value
    pub fn unsafe_addr(&self) -> usize {
        self.storage_place("Value::unsafe_addr").address()
    }

    /// Storage location of an addressable value
    pub fn storage(&self) -> Address {
        Address {
            place: self.storage_place("Value::storage").clone(),
        }
    }

    fn storage_place(&self, method: &'static str) -> &Place {
        let h = self.handle(method);
        match &h.slot {
            Slot::At(place) if h.flags.contains(Flags::ADDR) => place,
            _ => raise(ReflectError::Unaddressable { method }),
        }
    }

    /// Pointer of type `*ty` to caller-supplied storage.
    ///
    /// The storage must hold data of a type with the same underlying type
    /// as `ty`.
    pub fn new_at(ty: Type, address: &Address) -> Value {
        let stored = address.place.ty();
        if stored.underlying() != ty.underlying() {
            invalid(format!("new_at: storage of type {} cannot hold {}", stored, ty));
        }
        Value::direct(Type::pointer_to(ty), Data::Pointer(Some(address.place.clone())))
    }

    /// Whether the value can be changed with [`Value::set`] and the setters
    pub fn can_set(&self) -> bool {
        let flags = self.handle("Value::can_set").flags;
        flags.contains(Flags::ADDR) && !flags.intersects(Flags::RO)
    }

    /// Assign `x` to the value.
    ///
    /// Raises unless the value is settable, `x` is exported and `x`'s type
    /// is assignable to the value's type.
    pub fn set(&self, x: &Value) {
        const METHOD: &str = "Value::set";
        self.must_be_assignable(METHOD);
        x.must_be_exported(METHOD);
        let data = x.assign_to(METHOD, self.ty());
        self.store(METHOD, data);
    }

    /// Whether [`Value::export`] may be used: false for values reached
    /// through unexported fields
    pub fn can_interface(&self) -> bool {
        !self.handle("Value::can_interface").flags.intersects(Flags::RO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    fn point() -> Type {
        Type::named(
            "main",
            "point",
            Type::struct_of(vec![Field::new("X", Type::int()), Field::new("y", Type::int())]),
        )
    }

    #[test]
    fn test_field_flags() {
        let p = Value::new_indirect(point()).elem();
        assert!(p.field(0).can_set());
        assert!(p.field(1).can_address());
        assert!(!p.field(1).can_set());
        assert!(!p.field(1).can_interface());

        let copy = Value::zero(point());
        assert!(!copy.field(0).can_address());
        assert!(!copy.field(0).can_set());
    }

    #[test]
    fn test_address_round_trip() {
        let p = Value::new_indirect(Type::int());
        let v = p.elem();
        let q = v.address();
        assert_eq!(q.get_pointer(), p.get_pointer());
        assert_eq!(v.unsafe_addr(), p.get_pointer());
    }

    #[test]
    fn test_new_at_aliases_storage() {
        let celsius = Type::named("main", "Celsius", Type::float64());
        let f = Value::new_indirect(Type::float64()).elem();
        let c = Value::new_at(celsius, &f.storage()).elem();
        c.set_float(21.5);
        assert_eq!(f.get_float(), 21.5);
        assert_eq!(c.ty(), celsius);
    }

    #[test]
    fn test_indirect() {
        let p = Value::new_indirect(Type::int());
        assert_eq!(p.indirect().kind(), Kind::Int);
        let i = Value::zero(Type::int());
        assert_eq!(i.indirect().kind(), Kind::Int);
    }

    #[test]
    fn test_elem_of_nil_pointer_is_zero_handle() {
        let nil = Value::zero(Type::pointer_to(Type::int()));
        assert!(!nil.elem().is_valid());
    }
}
