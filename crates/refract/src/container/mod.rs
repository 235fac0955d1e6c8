//! Container operations: arrays, slices, strings, maps and channels
//!
//! Length, capacity, indexing and slicing live here; map and channel
//! storage and their operations live in the submodules.

mod channel;
mod map;

pub use channel::{ChannelError, TryRecv};
pub(crate) use channel::ChanRef;
pub(crate) use map::{MapObject, MapRef};

use crate::error::{raise, ReflectError};
use crate::types::{Kind, Type};
use crate::value::{corrupt, Data, Flags, Place, SliceRef, Value};

/// Copy of the elements a slice header covers
pub(crate) fn slice_elements(s: &SliceRef) -> Vec<Data> {
    s.array.read(|d| match d {
        Data::Array(items) => items[s.offset..s.offset + s.len].to_vec(),
        _ => corrupt(),
    })
}

/// Non-nil slice over a fresh backing array holding exactly `items`
pub(crate) fn new_slice_data(elem: Type, items: Vec<Data>) -> Data {
    let len = items.len();
    Data::Slice(Some(SliceRef {
        array: Place::backing(elem, items),
        offset: 0,
        len,
        cap: len,
    }))
}

fn out_of_range(method: &'static str, index: usize, len: usize) -> ! {
    raise(ReflectError::IndexOutOfRange { method, index, len })
}

fn bounds(method: &'static str, detail: String) -> ! {
    raise(ReflectError::Bounds { method, detail })
}

impl Value {
    fn slice_header(&self) -> Option<SliceRef> {
        self.read(|d| match d {
            Data::Slice(s) => s.clone(),
            _ => corrupt(),
        })
    }

    fn string_bytes(&self) -> std::sync::Arc<[u8]> {
        self.read(|d| match d {
            Data::String(s) => s.clone(),
            _ => corrupt(),
        })
    }

    /// Number of elements of an Array, Chan, Map or Slice, or bytes of a
    /// String
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let h = self.expect("Value::len", |k| {
            matches!(k, Kind::Array | Kind::Chan | Kind::Map | Kind::Slice | Kind::String)
        });
        if h.ty.kind() == Kind::Array {
            return h.ty.len();
        }
        self.read(|d| match d {
            Data::Slice(s) => s.as_ref().map_or(0, |s| s.len),
            Data::Map(m) => m.as_ref().map_or(0, |m| m.len()),
            Data::Chan(c) => c.as_ref().map_or(0, |c| c.len()),
            Data::String(s) => s.len(),
            _ => corrupt(),
        })
    }

    /// Capacity of an Array, Chan or Slice
    pub fn cap(&self) -> usize {
        let h = self.expect("Value::cap", |k| matches!(k, Kind::Array | Kind::Chan | Kind::Slice));
        if h.ty.kind() == Kind::Array {
            return h.ty.len();
        }
        self.read(|d| match d {
            Data::Slice(s) => s.as_ref().map_or(0, |s| s.cap),
            Data::Chan(c) => c.as_ref().map_or(0, |c| c.capacity()),
            _ => corrupt(),
        })
    }

    /// Element `i` of an Array, Slice or String.
    ///
    /// Slice elements are always addressable; array elements are
    /// addressable iff the array is. Indexing a String yields a `uint8`.
    pub fn index(&self, i: usize) -> Value {
        const METHOD: &str = "Value::index";
        let h = self.expect(METHOD, |k| matches!(k, Kind::Array | Kind::Slice | Kind::String));
        let ro = h.flags.ro();
        match h.ty.kind() {
            Kind::Array => {
                let len = h.ty.len();
                if i >= len {
                    out_of_range(METHOD, i, len);
                }
                self.child(i, h.ty.elem(), ro)
            }
            Kind::Slice => match self.slice_header() {
                Some(s) if i < s.len => Value::at(h.ty.elem(), s.element(i), ro),
                s => out_of_range(METHOD, i, s.map_or(0, |s| s.len)),
            },
            _ => {
                let bytes = self.string_bytes();
                match bytes.get(i) {
                    Some(&b) => Value::direct_flagged(Type::uint8(), Data::Uint(b as u64), ro),
                    None => out_of_range(METHOD, i, bytes.len()),
                }
            }
        }
    }

    /// `v[i:j]` of an addressable Array, a Slice or a String
    pub fn slice(&self, i: usize, j: usize) -> Value {
        const METHOD: &str = "Value::slice";
        let h = self.expect(METHOD, |k| matches!(k, Kind::Array | Kind::Slice | Kind::String));
        if h.ty.kind() == Kind::String {
            let bytes = self.string_bytes();
            if i > j || j > bytes.len() {
                bounds(METHOD, format!("string slice index [{}:{}] out of range with length {}", i, j, bytes.len()));
            }
            return Value::direct_flagged(h.ty, Data::String(bytes[i..j].into()), h.flags.ro());
        }
        let (ty, base) = self.slice_base(METHOD);
        let cap = base.as_ref().map_or(0, |s| s.cap);
        if i > j || j > cap {
            bounds(METHOD, format!("slice index [{}:{}] out of range with capacity {}", i, j, cap));
        }
        self.resliced(ty, base, i, j - i, cap - i)
    }

    /// `v[i:j:k]` of an addressable Array or a Slice
    pub fn slice3(&self, i: usize, j: usize, k: usize) -> Value {
        const METHOD: &str = "Value::slice3";
        self.expect(METHOD, |k| matches!(k, Kind::Array | Kind::Slice));
        let (ty, base) = self.slice_base(METHOD);
        let cap = base.as_ref().map_or(0, |s| s.cap);
        if i > j || j > k || k > cap {
            bounds(METHOD, format!("slice index [{}:{}:{}] out of range with capacity {}", i, j, k, cap));
        }
        self.resliced(ty, base, i, j - i, k - i)
    }

    /// Result type and full-capacity header of the sliced operand
    fn slice_base(&self, method: &'static str) -> (Type, Option<SliceRef>) {
        let h = self.handle(method);
        if h.ty.kind() == Kind::Slice {
            return (h.ty, self.slice_header());
        }
        let place = match self.place() {
            Some(place) if h.flags.contains(Flags::ADDR) => place.clone(),
            _ => raise(ReflectError::Unaddressable { method }),
        };
        let len = h.ty.len();
        let header = SliceRef {
            array: place,
            offset: 0,
            len,
            cap: len,
        };
        (Type::slice_of(h.ty.elem()), Some(header))
    }

    fn resliced(&self, ty: Type, base: Option<SliceRef>, i: usize, len: usize, cap: usize) -> Value {
        let data = base.map(|s| SliceRef {
            array: s.array,
            offset: s.offset + i,
            len,
            cap,
        });
        Value::direct_flagged(ty, Data::Slice(data), self.flags().ro())
    }

    /// Set a settable Slice's length; `n` must not exceed its capacity
    pub fn set_len(&self, n: usize) {
        const METHOD: &str = "Value::set_len";
        self.must_be_assignable(METHOD);
        self.expect_kind(METHOD, Kind::Slice);
        self.modify(METHOD, |d| match d {
            Data::Slice(Some(s)) if n <= s.cap => s.len = n,
            Data::Slice(None) if n == 0 => {}
            Data::Slice(s) => {
                let cap = s.as_ref().map_or(0, |s| s.cap);
                bounds(METHOD, format!("length {} out of range [0, {}]", n, cap))
            }
            _ => corrupt(),
        });
    }

    /// Set a settable Slice's capacity; `n` must lie between its length and
    /// its current capacity
    pub fn set_cap(&self, n: usize) {
        const METHOD: &str = "Value::set_cap";
        self.must_be_assignable(METHOD);
        self.expect_kind(METHOD, Kind::Slice);
        self.modify(METHOD, |d| match d {
            Data::Slice(Some(s)) if s.len <= n && n <= s.cap => s.cap = n,
            Data::Slice(None) if n == 0 => {}
            Data::Slice(s) => {
                let (len, cap) = s.as_ref().map_or((0, 0), |s| (s.len, s.cap));
                bounds(METHOD, format!("capacity {} out of range [{}, {}]", n, len, cap))
            }
            _ => corrupt(),
        });
    }

    /// New slice of type `ty` with `len` zero elements and room for `cap`
    pub fn make_slice(ty: Type, len: usize, cap: usize) -> Value {
        const METHOD: &str = "Value::make_slice";
        if ty.kind() != Kind::Slice {
            raise(ReflectError::KindMismatch {
                method: METHOD,
                kind: ty.kind(),
            });
        }
        if len > cap {
            bounds(METHOD, format!("length {} exceeds capacity {}", len, cap));
        }
        let elem = ty.elem();
        let items = (0..cap).map(|_| Data::zero(elem)).collect();
        let header = SliceRef {
            array: Place::backing(elem, items),
            offset: 0,
            len,
            cap,
        };
        Value::direct(ty, Data::Slice(Some(header)))
    }

    /// Header covering `extra` more elements, reallocating when the
    /// capacity is exhausted; also returns the old length
    fn extend(&self, method: &'static str, extra: usize) -> (Option<SliceRef>, usize) {
        self.must_be_exported(method);
        let h = self.expect_kind(method, Kind::Slice);
        let header = self.slice_header();
        let (len, cap) = header.as_ref().map_or((0, 0), |s| (s.len, s.cap));
        let need = len + extra;
        if extra == 0 {
            return (header, len);
        }
        if let Some(s) = header.filter(|_| need <= cap) {
            return (Some(SliceRef { len: need, ..s }), len);
        }
        let elem = h.ty.elem();
        let grown = need.max(cap * 2);
        let mut items = self.slice_header().map(|s| slice_elements(&s)).unwrap_or_default();
        items.resize_with(grown, || Data::zero(elem));
        let header = SliceRef {
            array: Place::backing(elem, items),
            offset: 0,
            len: need,
            cap: grown,
        };
        (Some(header), len)
    }

    /// The slice with `xs` appended, like the `append` builtin
    pub fn append(&self, xs: &[Value]) -> Value {
        const METHOD: &str = "Value::append";
        let (header, n) = self.extend(METHOD, xs.len());
        let elem = self.ty().elem();
        if let Some(s) = &header {
            for (i, x) in xs.iter().enumerate() {
                Value::at(elem, s.element(n + i), Flags::NONE).set(x);
            }
        }
        Value::direct(self.ty(), Data::Slice(header))
    }

    /// The slice with the elements of slice `t` appended
    pub fn append_slice(&self, t: &Value) -> Value {
        const METHOD: &str = "Value::append_slice";
        let th = t.expect_kind(METHOD, Kind::Slice);
        t.must_be_exported(METHOD);
        let ty = self.expect_kind(METHOD, Kind::Slice).ty;
        if ty.elem() != th.ty.elem() {
            raise(ReflectError::NotAssignable {
                method: METHOD,
                from: th.ty.to_string(),
                to: ty.to_string(),
            });
        }
        let items = t.slice_header().map(|s| slice_elements(&s)).unwrap_or_default();
        let (header, n) = self.extend(METHOD, items.len());
        if let Some(s) = &header {
            s.array.write(|d| match d {
                Data::Array(dst) => {
                    for (i, item) in items.into_iter().enumerate() {
                        dst[s.offset + n + i] = item;
                    }
                }
                _ => corrupt(),
            });
        }
        Value::direct(ty, Data::Slice(header))
    }
}

/// Copy elements from `src` into `dst` until either is exhausted, returning
/// the number copied.
///
/// `dst` is a Slice or a settable Array; `src` is a Slice or Array with the
/// same element type, or a String when `dst` holds bytes.
pub fn copy(dst: &Value, src: &Value) -> usize {
    const METHOD: &str = "copy";
    let dh = dst.expect(METHOD, |k| matches!(k, Kind::Array | Kind::Slice));
    if dh.ty.kind() == Kind::Array {
        dst.must_be_assignable(METHOD);
    }
    dst.must_be_exported(METHOD);
    let elem = dh.ty.elem();

    let sh = src.handle(METHOD);
    let items: Vec<Data> = match sh.ty.kind() {
        Kind::String if elem.kind() == Kind::Uint8 => src
            .string_bytes()
            .iter()
            .map(|&b| Data::Uint(b as u64))
            .collect(),
        Kind::Array | Kind::Slice => {
            if sh.ty.elem() != elem {
                raise(ReflectError::NotAssignable {
                    method: METHOD,
                    from: sh.ty.to_string(),
                    to: dh.ty.to_string(),
                });
            }
            match src.load() {
                Data::Array(items) => items,
                Data::Slice(s) => s.map(|s| slice_elements(&s)).unwrap_or_default(),
                _ => corrupt(),
            }
        }
        kind => raise(ReflectError::KindMismatch { method: METHOD, kind }),
    };
    src.must_be_exported(METHOD);

    if dh.ty.kind() == Kind::Array {
        let n = items.len().min(dh.ty.len());
        dst.modify(METHOD, |d| match d {
            Data::Array(slots) => {
                for (slot, item) in slots.iter_mut().zip(items) {
                    *slot = item;
                }
            }
            _ => corrupt(),
        });
        return n;
    }
    let Some(s) = dst.slice_header() else {
        return 0;
    };
    let n = items.len().min(s.len);
    s.array.write(|d| match d {
        Data::Array(slots) => {
            for (i, item) in items.into_iter().take(n).enumerate() {
                slots[s.offset + i] = item;
            }
        }
        _ => corrupt(),
    });
    n
}
