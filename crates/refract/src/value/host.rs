//! Bridging between host Rust data and values
//!
//! - [`Reflect`] moves host data in: `Value::of(42i64)`, `Value::of(vec!["a"])`
//! - [`FromValue`] extracts host data back out, returning a [`ReflectResult`]
//! - [`PlainValue`] is a plain-data snapshot of any exportable value,
//!   serializable with serde

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::ser::{SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use super::data::{Complex, Data, Place, PlaceId, SliceRef};
use super::scalar::{float, integer, string_data};
use super::{corrupt, Value};
use crate::container::{slice_elements, MapObject};
use crate::error::{ReflectError, ReflectResult};
use crate::types::{Kind, Type};

// ============================================================================
// Host data in
// ============================================================================

/// Host types with a reflected counterpart
pub trait Reflect {
    /// The reflected type
    fn reflect_type() -> Type;

    /// An independent value holding a copy of `self`
    fn to_value(&self) -> Value;
}

macro_rules! reflect_scalar {
    ($($host:ty => $ty:ident, $make:ident($conv:ty)),* $(,)?) => {
        $(
            impl Reflect for $host {
                fn reflect_type() -> Type {
                    Type::$ty()
                }

                fn to_value(&self) -> Value {
                    let ty = Type::$ty();
                    Value::direct(ty, $make(ty, *self as $conv))
                }
            }
        )*
    };
}

// `integer` truncates to the type's width, which for `int` and `uint`
// follows the installed layout
reflect_scalar! {
    i8 => int8, integer(u64),
    i16 => int16, integer(u64),
    i32 => int32, integer(u64),
    i64 => int64, integer(u64),
    isize => int, integer(u64),
    u8 => uint8, integer(u64),
    u16 => uint16, integer(u64),
    u32 => uint32, integer(u64),
    u64 => uint64, integer(u64),
    usize => uint, integer(u64),
    f32 => float32, float(f64),
    f64 => float64, float(f64),
}

impl Reflect for bool {
    fn reflect_type() -> Type {
        Type::bool()
    }

    fn to_value(&self) -> Value {
        Value::direct(Type::bool(), Data::Bool(*self))
    }
}

impl Reflect for Complex {
    fn reflect_type() -> Type {
        Type::complex128()
    }

    fn to_value(&self) -> Value {
        Value::direct(Type::complex128(), Data::Complex(*self))
    }
}

impl Reflect for str {
    fn reflect_type() -> Type {
        Type::string()
    }

    fn to_value(&self) -> Value {
        Value::direct(Type::string(), string_data(self.as_bytes()))
    }
}

impl Reflect for String {
    fn reflect_type() -> Type {
        Type::string()
    }

    fn to_value(&self) -> Value {
        self.as_str().to_value()
    }
}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn reflect_type() -> Type {
        T::reflect_type()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect_type() -> Type {
        Type::slice_of(T::reflect_type())
    }

    fn to_value(&self) -> Value {
        let elem = T::reflect_type();
        let items: Vec<Data> = self.iter().map(|x| x.to_value().into_data()).collect();
        let len = items.len();
        let slice = SliceRef {
            array: Place::backing(elem, items),
            offset: 0,
            len,
            cap: len,
        };
        Value::direct(Self::reflect_type(), Data::Slice(Some(slice)))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn reflect_type() -> Type {
        Type::array_of(N, T::reflect_type())
    }

    fn to_value(&self) -> Value {
        let items = self.iter().map(|x| x.to_value().into_data()).collect();
        Value::direct(Self::reflect_type(), Data::Array(items))
    }
}

impl<K: Reflect, V: Reflect, S: BuildHasher> Reflect for HashMap<K, V, S> {
    fn reflect_type() -> Type {
        Type::map_of(K::reflect_type(), V::reflect_type())
    }

    fn to_value(&self) -> Value {
        let map = MapObject::default();
        for (k, v) in self {
            map.insert(k.to_value().into_data(), v.to_value().into_data());
        }
        Value::direct(Self::reflect_type(), Data::Map(Some(Arc::new(map))))
    }
}

impl Value {
    /// Independent, non-addressable value holding a copy of host data
    pub fn of<T: Reflect>(x: T) -> Value {
        x.to_value()
    }
}

// ============================================================================
// Host data out
// ============================================================================

/// Host types that can be extracted from a value
pub trait FromValue: Sized {
    /// Extract from `value`, failing on an incompatible kind
    fn from_value(value: &Value) -> ReflectResult<Self>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> ReflectResult<T> {
    let found = if value.is_valid() {
        value.ty().to_string()
    } else {
        "invalid".to_string()
    };
    Err(ReflectError::ExtractMismatch { expected, found })
}

impl FromValue for bool {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            Kind::Bool => Ok(value.get_bool()),
            _ => mismatch("bool", value),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            k if k.is_signed() => Ok(value.get_int()),
            _ => mismatch("i64", value),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            k if k.is_unsigned() => Ok(value.get_uint()),
            _ => mismatch("u64", value),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            k if k.is_float() => Ok(value.get_float()),
            _ => mismatch("f64", value),
        }
    }
}

impl FromValue for Complex {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            k if k.is_complex() => Ok(value.get_complex()),
            _ => mismatch("Complex", value),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            Kind::String => Ok(value.get_string()),
            _ => mismatch("String", value),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> ReflectResult<Self> {
        match value.kind() {
            Kind::Slice | Kind::Array => (0..value.len()).map(|i| T::from_value(&value.index(i))).collect(),
            _ => mismatch("Vec", value),
        }
    }
}

impl Value {
    /// Extract host data; fails for values reached through unexported
    /// fields and for incompatible kinds
    pub fn export_as<T: FromValue>(&self) -> ReflectResult<T> {
        if self.is_valid() && !self.can_interface() {
            return Err(ReflectError::Unexported {
                method: "Value::export_as",
            });
        }
        T::from_value(self)
    }

    /// Plain-data snapshot of the value.
    ///
    /// Raises for the zero handle and for values reached through unexported
    /// fields.
    pub fn export(&self) -> PlainValue {
        self.must_be_exported("Value::export");
        let h = self.handle("Value::export");
        let mut path = FxHashSet::default();
        self.read(|d| plain(h.ty, d, &mut path))
    }
}

// ============================================================================
// Plain data
// ============================================================================

/// Plain-data snapshot of a value
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    /// Nil reference or empty interface
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Float
    Float(f64),
    /// Complex number
    Complex(Complex),
    /// String (invalid UTF-8 replaced)
    String(String),
    /// Array or slice elements
    List(Vec<PlainValue>),
    /// Map entries, in no particular order
    Map(Vec<(PlainValue, PlainValue)>),
    /// Struct fields in declaration order
    Struct(Vec<(String, PlainValue)>),
    /// Non-nil pointer, channel or function, which is not followed
    Reference {
        /// Kind of the reference
        kind: Kind,
        /// Address it refers to
        address: usize,
    },
}

/// Identity of a container on the current export or print path
#[derive(Clone, PartialEq, Eq, Hash)]
pub(super) enum Visit {
    Slice(PlaceId),
    Map(usize),
}

impl Visit {
    /// Identity and address of a non-nil slice or map
    pub(super) fn of(data: &Data) -> Option<(Visit, usize)> {
        match data {
            Data::Slice(Some(s)) => Some((Visit::Slice(s.array.id()), s.element(0).address())),
            Data::Map(Some(m)) => {
                let address = Arc::as_ptr(m) as usize;
                Some((Visit::Map(address), address))
            }
            _ => None,
        }
    }
}

fn plain(ty: Type, data: &Data, path: &mut FxHashSet<Visit>) -> PlainValue {
    match data {
        Data::Bool(b) => PlainValue::Bool(*b),
        Data::Int(i) => PlainValue::Int(*i),
        Data::Uint(u) => PlainValue::Uint(*u),
        Data::Float(f) => PlainValue::Float(*f),
        Data::Complex(c) => PlainValue::Complex(*c),
        Data::String(s) => PlainValue::String(String::from_utf8_lossy(s).into_owned()),
        Data::Array(items) => {
            let elem = ty.elem();
            PlainValue::List(items.iter().map(|d| plain(elem, d, path)).collect())
        }
        Data::Struct(items) => PlainValue::Struct(
            ty.fields()
                .iter()
                .zip(items)
                .map(|(f, d)| (f.name.clone(), plain(f.ty, d, path)))
                .collect(),
        ),
        Data::Slice(None) | Data::Map(None) | Data::Interface(None) => PlainValue::Nil,
        Data::Slice(Some(s)) => {
            let visit = Visit::Slice(s.array.id());
            if !path.insert(visit.clone()) {
                return reference(ty, data);
            }
            let elem = ty.elem();
            let items = slice_elements(s);
            let out = PlainValue::List(items.iter().map(|d| plain(elem, d, path)).collect());
            path.remove(&visit);
            out
        }
        Data::Map(Some(m)) => {
            let visit = Visit::Map(Arc::as_ptr(m) as usize);
            if !path.insert(visit.clone()) {
                return reference(ty, data);
            }
            let (key, elem) = (ty.key(), ty.elem());
            let entries = m.entries();
            let out = PlainValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (plain(key, k, path), plain(elem, v, path)))
                    .collect(),
            );
            path.remove(&visit);
            out
        }
        Data::Interface(Some(b)) => plain(b.ty, &b.data, path),
        Data::Pointer(_) | Data::UnsafePointer(_) | Data::Func(_) | Data::Chan(_) => reference(ty, data),
    }
}

fn reference(ty: Type, data: &Data) -> PlainValue {
    let address = match data {
        Data::Pointer(p) | Data::UnsafePointer(p) => p.as_ref().map(Place::address),
        Data::Func(f) => f.as_ref().map(|f| f.address()),
        Data::Chan(c) => c.as_ref().map(|c| Arc::as_ptr(c) as usize),
        Data::Map(m) => m.as_ref().map(|m| Arc::as_ptr(m) as usize),
        Data::Slice(s) => s.as_ref().map(|s| s.element(0).address()),
        _ => corrupt(),
    };
    match address {
        Some(address) => PlainValue::Reference {
            kind: ty.kind(),
            address,
        },
        None => PlainValue::Nil,
    }
}

impl Serialize for PlainValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlainValue::Nil => serializer.serialize_unit(),
            PlainValue::Bool(b) => serializer.serialize_bool(*b),
            PlainValue::Int(i) => serializer.serialize_i64(*i),
            PlainValue::Uint(u) => serializer.serialize_u64(*u),
            PlainValue::Float(f) => serializer.serialize_f64(*f),
            PlainValue::Complex(c) => c.serialize(serializer),
            PlainValue::String(s) => serializer.serialize_str(s),
            PlainValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            PlainValue::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(&Entry(entry))?;
                }
                seq.end()
            }
            PlainValue::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            PlainValue::Reference { kind, address } => {
                serializer.serialize_str(&format!("<{} {:#x}>", kind, address))
            }
        }
    }
}

/// Map entry serialized as a `[key, value]` pair
struct Entry<'a>(&'a (PlainValue, PlainValue));

impl Serialize for Entry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.0 .0)?;
        tuple.serialize_element(&self.0 .1)?;
        tuple.end()
    }
}
