//! Value handles
//!
//! A [`Value`] pairs a [`Type`] with storage and a set of flags. The storage
//! is either an independent copy (values built from host data, results of
//! calls, elements read out of maps) or a location inside shared storage
//! (anything reached by dereferencing a pointer or indexing a slice).
//!
//! # Settability
//!
//! Only values that alias shared storage are addressable. A value is
//! settable when it is addressable and was not reached through an
//! unexported struct field. The usual way to get a settable value is:
//!
//! ```ignore
//! let ptr = Value::new_indirect(Type::int());
//! let target = ptr.elem();
//! target.set_int(42);
//! ```
//!
//! The zero handle ([`Value::default`]) holds no value at all. It answers
//! [`Value::is_valid`] and [`Value::kind`]; every other operation on it is a
//! programming error.

mod access;
mod convert;
mod data;
mod flags;
mod format;
mod host;
mod scalar;

use std::fmt;

pub use access::Address;
pub use data::{Complex, NativeFn};
pub use host::{FromValue, PlainValue, Reflect};

pub(crate) use data::{Data, FuncRef, Place, PlaceId, SliceRef};
pub(crate) use flags::Flags;

use crate::error::{invalid, raise, ReflectError};
use crate::types::{Kind, Type};

/// Handle to a dynamically typed value
#[derive(Clone, Default)]
pub struct Value(pub(crate) Option<Handle>);

#[derive(Clone)]
pub(crate) struct Handle {
    pub(crate) ty: Type,
    pub(crate) slot: Slot,
    pub(crate) flags: Flags,
}

#[derive(Clone)]
pub(crate) enum Slot {
    /// Independent copy
    Direct(Data),
    /// Location in shared storage
    At(Place),
}

impl Value {
    /// Independent, non-addressable value
    pub(crate) fn direct(ty: Type, data: Data) -> Value {
        Self::direct_flagged(ty, data, Flags::NONE)
    }

    pub(crate) fn direct_flagged(ty: Type, data: Data, flags: Flags) -> Value {
        Value(Some(Handle {
            ty,
            slot: Slot::Direct(data),
            flags: flags.difference(Flags::ADDR),
        }))
    }

    /// Addressable value aliasing `place`
    pub(crate) fn at(ty: Type, place: Place, flags: Flags) -> Value {
        Value(Some(Handle {
            ty,
            slot: Slot::At(place),
            flags: flags | Flags::ADDR,
        }))
    }

    /// Whether this is a real value rather than the zero handle
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Kind of the value's type; [`Kind::Invalid`] for the zero handle
    pub fn kind(&self) -> Kind {
        match &self.0 {
            Some(h) => h.ty.kind(),
            None => Kind::Invalid,
        }
    }

    /// Type of the value
    pub fn ty(&self) -> Type {
        self.handle("Value::ty").ty
    }

    #[track_caller]
    pub(crate) fn handle(&self, method: &'static str) -> &Handle {
        match &self.0 {
            Some(h) => h,
            None => raise(ReflectError::KindMismatch {
                method,
                kind: Kind::Invalid,
            }),
        }
    }

    /// Handle of a value whose kind satisfies `accept`
    #[track_caller]
    pub(crate) fn expect(&self, method: &'static str, accept: impl Fn(Kind) -> bool) -> &Handle {
        let h = self.handle(method);
        let kind = h.ty.kind();
        if !accept(kind) {
            raise(ReflectError::KindMismatch { method, kind });
        }
        h
    }

    #[track_caller]
    pub(crate) fn expect_kind(&self, method: &'static str, kind: Kind) -> &Handle {
        self.expect(method, |k| k == kind)
    }

    pub(crate) fn flags(&self) -> Flags {
        self.0.as_ref().map_or(Flags::NONE, |h| h.flags)
    }

    /// Raise unless the value was reached only through exported fields
    #[track_caller]
    pub(crate) fn must_be_exported(&self, method: &'static str) {
        if self.handle(method).flags.intersects(Flags::RO) {
            raise(ReflectError::Unexported { method });
        }
    }

    /// Raise unless the value is settable
    #[track_caller]
    pub(crate) fn must_be_assignable(&self, method: &'static str) {
        let flags = self.handle(method).flags;
        if flags.intersects(Flags::RO) {
            raise(ReflectError::Unexported { method });
        }
        if !flags.contains(Flags::ADDR) {
            raise(ReflectError::Unaddressable { method });
        }
    }

    /// Run `f` on the value's data without copying it
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Data) -> R) -> R {
        match &self.handle("Value::read").slot {
            Slot::Direct(data) => f(data),
            Slot::At(place) => place.read(f),
        }
    }

    /// Copy of the value's data
    pub(crate) fn load(&self) -> Data {
        self.read(Data::clone)
    }

    /// Overwrite the value's storage; callers check settability first
    pub(crate) fn store(&self, method: &'static str, data: Data) {
        match &self.handle(method).slot {
            Slot::At(place) => place.store(data),
            Slot::Direct(_) => raise(ReflectError::Unaddressable { method }),
        }
    }

    /// Mutate the value's storage in place; callers check settability first
    pub(crate) fn modify<R>(&self, method: &'static str, f: impl FnOnce(&mut Data) -> R) -> R {
        match &self.handle(method).slot {
            Slot::At(place) => place.write(f),
            Slot::Direct(_) => raise(ReflectError::Unaddressable { method }),
        }
    }

    pub(crate) fn place(&self) -> Option<&Place> {
        match &self.0.as_ref()?.slot {
            Slot::At(place) => Some(place),
            Slot::Direct(_) => None,
        }
    }

    /// Take the data out, copying only when it lives in shared storage
    pub(crate) fn into_data(self) -> Data {
        match self.0 {
            Some(Handle {
                slot: Slot::Direct(data),
                ..
            }) => data,
            Some(Handle {
                slot: Slot::At(place),
                ..
            }) => place.load(),
            None => raise(ReflectError::KindMismatch {
                method: "Value::into_data",
                kind: Kind::Invalid,
            }),
        }
    }

    /// The zero value of `ty`; neither addressable nor settable
    pub fn zero(ty: Type) -> Value {
        Value::direct(ty, Data::zero(ty))
    }

    /// Pointer to freshly allocated zeroed storage of type `ty`
    pub fn new_indirect(ty: Type) -> Value {
        let place = Place::new(ty, Data::zero(ty));
        Value::direct(Type::pointer_to(ty), Data::Pointer(Some(place)))
    }
}

/// Storage that does not match the value's type
#[cold]
#[track_caller]
pub(crate) fn corrupt() -> ! {
    invalid("value storage does not match its type")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("Value(<invalid>)"),
            Some(h) => write!(f, "Value({}: {})", h.ty, self),
        }
    }
}
