//! Map storage and map operations on values

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{invalid, raise, ReflectError};
use crate::types::{Kind, Type};
use crate::value::{corrupt, Data, PlaceId, Value};

/// Shared map storage
pub(crate) type MapRef = Arc<MapObject>;

/// Hash map keyed by the `==` identity of key data.
///
/// Each entry keeps the original key data next to the value so keys can be
/// listed back out.
#[derive(Default)]
pub(crate) struct MapObject {
    entries: RwLock<FxHashMap<MapKey, (Data, Data)>>,
}

/// Hashable image of key data.
///
/// Floats hash by bit pattern with `-0.0` folded into `0.0` and every NaN
/// folded into one canonical NaN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MapKey {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(u64),
    Complex(u64, u64),
    String(Arc<[u8]>),
    Seq(Vec<MapKey>),
    Ref(PlaceId),
    Chan(usize),
    Iface(Type, Box<MapKey>),
}

fn float_bits(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else if x.is_nan() {
        f64::NAN.to_bits()
    } else {
        x.to_bits()
    }
}

impl MapKey {
    pub(crate) fn of(data: &Data) -> MapKey {
        match data {
            Data::Bool(b) => MapKey::Bool(*b),
            Data::Int(i) => MapKey::Int(*i),
            Data::Uint(u) => MapKey::Uint(*u),
            Data::Float(x) => MapKey::Float(float_bits(*x)),
            Data::Complex(c) => MapKey::Complex(float_bits(c.re), float_bits(c.im)),
            Data::String(s) => MapKey::String(s.clone()),
            Data::Array(items) | Data::Struct(items) => MapKey::Seq(items.iter().map(MapKey::of).collect()),
            Data::Pointer(p) | Data::UnsafePointer(p) => p.as_ref().map_or(MapKey::Nil, |p| MapKey::Ref(p.id())),
            Data::Chan(c) => c.as_ref().map_or(MapKey::Nil, |c| MapKey::Chan(Arc::as_ptr(c) as usize)),
            Data::Interface(None) => MapKey::Nil,
            Data::Interface(Some(b)) => {
                if !b.ty.comparable() {
                    invalid(format!("hash of unhashable type {}", b.ty));
                }
                MapKey::Iface(b.ty, Box::new(MapKey::of(&b.data)))
            }
            Data::Slice(_) | Data::Map(_) | Data::Func(_) => invalid("hash of unhashable value"),
        }
    }
}

impl MapObject {
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn get(&self, key: &Data) -> Option<Data> {
        let hashed = MapKey::of(key);
        self.entries.read().get(&hashed).map(|(_, v)| v.clone())
    }

    pub(crate) fn insert(&self, key: Data, value: Data) {
        let hashed = MapKey::of(&key);
        self.entries.write().insert(hashed, (key, value));
    }

    pub(crate) fn remove(&self, key: &Data) {
        let hashed = MapKey::of(key);
        self.entries.write().remove(&hashed);
    }

    /// Snapshot of all entries, in no particular order
    pub(crate) fn entries(&self) -> Vec<(Data, Data)> {
        self.entries.read().values().cloned().collect()
    }

    pub(crate) fn keys(&self) -> Vec<Data> {
        self.entries.read().values().map(|(k, _)| k.clone()).collect()
    }
}

impl Value {
    /// New empty map of type `ty`
    pub fn make_map(ty: Type) -> Value {
        if ty.kind() != Kind::Map {
            raise(ReflectError::KindMismatch {
                method: "Value::make_map",
                kind: ty.kind(),
            });
        }
        Value::direct(ty, Data::Map(Some(Arc::new(MapObject::default()))))
    }

    fn map_ref(&self, method: &'static str) -> Option<MapRef> {
        self.expect_kind(method, Kind::Map);
        self.read(|d| match d {
            Data::Map(m) => m.clone(),
            _ => corrupt(),
        })
    }

    /// Value stored under `key`; the zero handle if absent or if the map is
    /// nil
    pub fn map_get(&self, key: &Value) -> Value {
        const METHOD: &str = "Value::map_get";
        let map = self.map_ref(METHOD);
        let ty = self.ty();
        key.must_be_exported(METHOD);
        let key = key.assign_to(METHOD, ty.key());
        let flags = self.flags().ro();
        match map.and_then(|m| m.get(&key)) {
            Some(data) => Value::direct_flagged(ty.elem(), data, flags),
            None => Value::default(),
        }
    }

    /// All keys, in no particular order; empty for a nil map
    pub fn map_keys(&self) -> Vec<Value> {
        const METHOD: &str = "Value::map_keys";
        let map = self.map_ref(METHOD);
        let key = self.ty().key();
        let flags = self.flags().ro();
        map.map(|m| m.keys())
            .unwrap_or_default()
            .into_iter()
            .map(|k| Value::direct_flagged(key, k, flags))
            .collect()
    }

    /// Store `elem` under `key`; the zero handle as `elem` deletes the key.
    ///
    /// Raises when storing into a nil map.
    pub fn map_set(&self, key: &Value, elem: &Value) {
        const METHOD: &str = "Value::map_set";
        self.must_be_exported(METHOD);
        let map = self.map_ref(METHOD);
        let ty = self.ty();
        key.must_be_exported(METHOD);
        let key = key.assign_to(METHOD, ty.key());
        if !elem.is_valid() {
            if let Some(map) = map {
                map.remove(&key);
            }
            return;
        }
        elem.must_be_exported(METHOD);
        let elem = elem.assign_to(METHOD, ty.elem());
        match map {
            Some(map) => map.insert(key, elem),
            None => invalid("assignment to entry in nil map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Complex;

    #[test]
    fn test_float_keys_fold_zero_and_nan() {
        assert_eq!(MapKey::of(&Data::Float(0.0)), MapKey::of(&Data::Float(-0.0)));
        assert_eq!(MapKey::of(&Data::Float(f64::NAN)), MapKey::of(&Data::Float(-f64::NAN)));
        assert_ne!(
            MapKey::of(&Data::Complex(Complex::new(1.0, 0.0))),
            MapKey::of(&Data::Complex(Complex::new(0.0, 1.0)))
        );
    }

    #[test]
    fn test_nil_map() {
        let ty = Type::map_of(Type::string(), Type::int());
        let nil = Value::zero(ty);
        assert!(!nil.map_get(&Value::of("a")).is_valid());
        assert!(nil.map_keys().is_empty());
        nil.map_set(&Value::of("a"), &Value::default());
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            nil.map_set(&Value::of("a"), &Value::of(1i64).convert(Type::int()))
        }))
        .unwrap_err();
        assert!(payload.downcast_ref::<ReflectError>().is_some());
    }

    #[test]
    fn test_delete_with_zero_handle() {
        let m = Value::make_map(Type::map_of(Type::int64(), Type::bool()));
        m.map_set(&Value::of(1i64), &Value::of(true));
        assert_eq!(m.len(), 1);
        m.map_set(&Value::of(1i64), &Value::default());
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn test_interface_keys() {
        let m = Value::make_map(Type::map_of(Type::empty_interface(), Type::int64()));
        m.map_set(&Value::of(1i64), &Value::of(10i64));
        m.map_set(&Value::of(1i32), &Value::of(20i64));
        assert_eq!(m.len(), 2);
        assert_eq!(m.map_get(&Value::of(1i32)).get_int(), 20);
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            m.map_set(&Value::of(vec![1i64]), &Value::of(0i64))
        }))
        .unwrap_err();
        assert!(payload.downcast_ref::<ReflectError>().is_some());
    }
}
