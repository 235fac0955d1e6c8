//! Storage behind value handles
//!
//! Aggregates (arrays and structs) are stored inline and copied on
//! assignment. Slices, maps, pointers, channels and functions are references
//! to shared storage. Shared storage is a [`Store`]: one lock-protected
//! [`Data`] tree, addressed by a [`Place`] (the store plus a path of element
//! or field positions into the tree).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::{ChanRef, MapRef};
use crate::error::invalid;
use crate::types::{Kind, Type};
use crate::value::Value;

/// A complex number; `complex64` values are stored widened
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Complex {
    /// Real part
    pub re: f64,
    /// Imaginary part
    pub im: f64,
}

impl Complex {
    /// `re + im*i`
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// Native function body behind a Func value
pub type NativeFn = dyn Fn(&[Value]) -> Vec<Value> + Send + Sync;

/// Raw value representation, interpreted through a [`Type`]
#[derive(Clone)]
pub(crate) enum Data {
    Bool(bool),
    /// All signed integer kinds, sign-extended
    Int(i64),
    /// All unsigned integer kinds, zero-extended
    Uint(u64),
    /// Both float kinds; `float32` values are always representable as f32
    Float(f64),
    Complex(Complex),
    /// Immutable bytes (not necessarily UTF-8)
    String(Arc<[u8]>),
    Array(Vec<Data>),
    Struct(Vec<Data>),
    Slice(Option<SliceRef>),
    Map(Option<MapRef>),
    Pointer(Option<Place>),
    Interface(Option<Box<Boxed>>),
    Func(Option<FuncRef>),
    Chan(Option<ChanRef>),
    UnsafePointer(Option<Place>),
}

/// Dynamic value held by an interface
#[derive(Clone)]
pub(crate) struct Boxed {
    pub(crate) ty: Type,
    pub(crate) data: Data,
}

/// Slice header
#[derive(Clone)]
pub(crate) struct SliceRef {
    /// The backing array store
    pub(crate) array: Place,
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) cap: usize,
}

impl SliceRef {
    /// Location of element `i` (relative to the slice start)
    pub(crate) fn element(&self, i: usize) -> Place {
        self.array.child(self.offset + i)
    }
}

/// Shared function body
#[derive(Clone)]
pub(crate) struct FuncRef(pub(crate) Arc<NativeFn>);

impl FuncRef {
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Data {
    /// Zero value of `ty`
    pub(crate) fn zero(ty: Type) -> Data {
        match ty.kind() {
            Kind::Bool => Data::Bool(false),
            k if k.is_signed() => Data::Int(0),
            k if k.is_unsigned() => Data::Uint(0),
            k if k.is_float() => Data::Float(0.0),
            k if k.is_complex() => Data::Complex(Complex::default()),
            Kind::String => Data::String(Arc::from(&[][..])),
            Kind::Array => Data::Array((0..ty.len()).map(|_| Data::zero(ty.elem())).collect()),
            Kind::Struct => Data::Struct(ty.fields().iter().map(|f| Data::zero(f.ty)).collect()),
            Kind::Slice => Data::Slice(None),
            Kind::Map => Data::Map(None),
            Kind::Pointer => Data::Pointer(None),
            Kind::Interface => Data::Interface(None),
            Kind::Func => Data::Func(None),
            Kind::Chan => Data::Chan(None),
            Kind::UnsafePointer => Data::UnsafePointer(None),
            other => invalid(format!("no zero value for kind {}", other)),
        }
    }

    /// Whether this is the zero value of its type
    pub(crate) fn is_zero(&self) -> bool {
        match self {
            Data::Bool(b) => !b,
            Data::Int(i) => *i == 0,
            Data::Uint(u) => *u == 0,
            Data::Float(f) => f.to_bits() == 0,
            Data::Complex(c) => c.re.to_bits() == 0 && c.im.to_bits() == 0,
            Data::String(s) => s.is_empty(),
            Data::Array(items) | Data::Struct(items) => items.iter().all(Data::is_zero),
            Data::Slice(s) => s.is_none(),
            Data::Map(m) => m.is_none(),
            Data::Pointer(p) | Data::UnsafePointer(p) => p.is_none(),
            Data::Interface(b) => b.is_none(),
            Data::Func(f) => f.is_none(),
            Data::Chan(c) => c.is_none(),
        }
    }

    /// Whether a nillable reference is nil
    pub(crate) fn is_nil_ref(&self) -> Option<bool> {
        match self {
            Data::Slice(s) => Some(s.is_none()),
            Data::Map(m) => Some(m.is_none()),
            Data::Pointer(p) | Data::UnsafePointer(p) => Some(p.is_none()),
            Data::Interface(b) => Some(b.is_none()),
            Data::Func(f) => Some(f.is_none()),
            Data::Chan(c) => Some(c.is_none()),
            _ => None,
        }
    }
}

// ============================================================================
// Shared storage
// ============================================================================

/// How the root of a store is typed
#[derive(Clone, Copy)]
pub(crate) enum StoreLayout {
    /// A single value of the given type
    Single(Type),
    /// A slice backing array of the given element type and any length
    Backing(Type),
}

/// A unit of shared, lock-protected storage
pub(crate) struct Store {
    layout: StoreLayout,
    data: RwLock<Data>,
}

/// Location inside a store
#[derive(Clone)]
pub(crate) struct Place {
    store: Arc<Store>,
    path: Vec<usize>,
}

/// Identity of a location, usable as a hash key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PlaceId(usize, Vec<usize>);

impl Place {
    /// Fresh storage holding `data` of type `ty`
    pub(crate) fn new(ty: Type, data: Data) -> Place {
        Place {
            store: Arc::new(Store {
                layout: StoreLayout::Single(ty),
                data: RwLock::new(data),
            }),
            path: Vec::new(),
        }
    }

    /// Fresh backing array for slices of `elem`
    pub(crate) fn backing(elem: Type, items: Vec<Data>) -> Place {
        Place {
            store: Arc::new(Store {
                layout: StoreLayout::Backing(elem),
                data: RwLock::new(Data::Array(items)),
            }),
            path: Vec::new(),
        }
    }

    /// Location of element or field `index` within this location
    pub(crate) fn child(&self, index: usize) -> Place {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(index);
        Place {
            store: self.store.clone(),
            path,
        }
    }

    /// Run `f` on the data at this location under the read lock.
    ///
    /// `f` must not touch other storage.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Data) -> R) -> R {
        let guard = self.store.data.read();
        f(walk(&guard, &self.path))
    }

    /// Run `f` on the data at this location under the write lock.
    ///
    /// `f` must not touch other storage.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Data) -> R) -> R {
        let mut guard = self.store.data.write();
        f(walk_mut(&mut guard, &self.path))
    }

    /// Copy of the data at this location
    pub(crate) fn load(&self) -> Data {
        self.read(Data::clone)
    }

    /// Overwrite the data at this location
    pub(crate) fn store(&self, data: Data) {
        self.write(|slot| *slot = data);
    }

    /// Static type of the data at this location
    pub(crate) fn ty(&self) -> Type {
        self.resolve().0
    }

    /// Address of this location: the store's allocation plus the layout
    /// offset of the path
    pub(crate) fn address(&self) -> usize {
        let base = Arc::as_ptr(&self.store) as *const u8 as usize;
        base + self.resolve().1
    }

    pub(crate) fn id(&self) -> PlaceId {
        PlaceId(Arc::as_ptr(&self.store) as *const u8 as usize, self.path.clone())
    }

    /// Whether both places name the same location
    pub(crate) fn same(&self, other: &Place) -> bool {
        Arc::ptr_eq(&self.store, &other.store) && self.path == other.path
    }

    fn resolve(&self) -> (Type, usize) {
        let mut path = self.path.iter();
        let (mut ty, mut offset) = match self.store.layout {
            StoreLayout::Single(ty) => (ty, 0),
            StoreLayout::Backing(elem) => match path.next() {
                Some(&i) => (elem, i * elem.size()),
                None => invalid("backing array has no static type"),
            },
        };
        for &i in path {
            match ty.kind() {
                Kind::Array => {
                    ty = ty.elem();
                    offset += i * ty.size();
                }
                Kind::Struct => {
                    let field = ty.field(i);
                    offset += field.offset;
                    ty = field.ty;
                }
                other => invalid(format!("storage path descends into {}", other)),
            }
        }
        (ty, offset)
    }
}

fn walk<'a>(mut data: &'a Data, path: &[usize]) -> &'a Data {
    for &i in path {
        data = match data {
            Data::Array(items) | Data::Struct(items) => &items[i],
            _ => invalid("storage path does not match value shape"),
        };
    }
    data
}

fn walk_mut<'a>(mut data: &'a mut Data, path: &[usize]) -> &'a mut Data {
    for &i in path {
        data = match data {
            Data::Array(items) | Data::Struct(items) => &mut items[i],
            _ => invalid("storage path does not match value shape"),
        };
    }
    data
}
