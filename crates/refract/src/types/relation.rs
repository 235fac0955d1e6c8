//! Relations between types: implementation, assignability, convertibility
//! and comparability

use super::kind::{ChanDir, Kind};
use super::rtype::Type;
use crate::error::invalid;

impl Type {
    /// Whether the method set of this type contains every method of the
    /// interface `iface`, by name and signature.
    ///
    /// Unexported interface methods are only satisfied by methods declared
    /// in the interface's own scope. Raises if `iface` is not an interface.
    pub fn implements(self, iface: Type) -> bool {
        if iface.kind() != Kind::Interface {
            invalid(format!("non-interface type {} passed to Type::implements", iface));
        }
        let table = self.method_table();
        iface.interface_methods().iter().all(|wanted| {
            table.find(&wanted.name).is_some_and(|have| {
                have.ty == wanted.ty && (have.exported || have.scope == wanted.scope)
            })
        })
    }

    /// Whether a value of this type may be assigned to a location of type `to`
    pub fn assignable_to(self, to: Type) -> bool {
        if self == to {
            return true;
        }
        if to.kind() == Kind::Interface && self.implements(to) {
            return true;
        }
        if self.is_named() && to.is_named() {
            return false;
        }
        if self.kind() == Kind::Chan
            && to.kind() == Kind::Chan
            && self.chan_dir() == ChanDir::Both
            && self.elem() == to.elem()
        {
            return true;
        }
        self.kind() == to.kind() && self.underlying() == to.underlying()
    }

    /// Whether a value of this type may be converted to type `to`
    pub fn convertible_to(self, to: Type) -> bool {
        if self.assignable_to(to) || self.underlying() == to.underlying() {
            return true;
        }
        let (from_kind, to_kind) = (self.kind(), to.kind());
        if from_kind == Kind::Pointer
            && to_kind == Kind::Pointer
            && !self.is_named()
            && !to.is_named()
            && self.elem().underlying() == to.elem().underlying()
        {
            return true;
        }
        let real = |k: Kind| k.is_integer() || k.is_float();
        match (from_kind, to_kind) {
            (a, b) if real(a) && real(b) => true,
            (a, b) if a.is_complex() && b.is_complex() => true,
            (a, Kind::String) if a.is_integer() => true,
            (Kind::String, Kind::Slice) => is_byte_or_rune_slice(to),
            (Kind::Slice, Kind::String) => is_byte_or_rune_slice(self),
            (Kind::Pointer, Kind::UnsafePointer) => true,
            (Kind::UnsafePointer, Kind::Pointer | Kind::Uintptr) => true,
            _ => false,
        }
    }

    /// Whether values of this type support `==`: false when a slice, map or
    /// function is contained by value
    pub fn comparable(self) -> bool {
        match self.kind() {
            Kind::Slice | Kind::Map | Kind::Func => false,
            Kind::Array => self.elem().comparable(),
            Kind::Struct => self.fields().iter().all(|f| f.ty.comparable()),
            _ => true,
        }
    }
}

fn is_byte_or_rune_slice(ty: Type) -> bool {
    let elem = ty.elem();
    elem.scope().is_empty() && matches!(elem.kind(), Kind::Uint8 | Kind::Int32)
}
