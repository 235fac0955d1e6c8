//! Scalar getters, setters and overflow checks

use std::sync::Arc;

use super::data::{Complex, Data};
use super::{corrupt, Value};
use crate::container::{new_slice_data, slice_elements};
use crate::error::{raise, ReflectError};
use crate::types::{Kind, Type};

/// Integer data for type `to` from raw two's-complement bits, truncated to
/// the type's width
pub(crate) fn integer(to: Type, bits: u64) -> Data {
    let width = to.bits();
    if to.kind().is_signed() {
        let shift = 64 - width;
        Data::Int(((bits as i64) << shift) >> shift)
    } else if width == 64 {
        Data::Uint(bits)
    } else {
        Data::Uint(bits & ((1u64 << width) - 1))
    }
}

/// Float data for type `to`, rounded to single precision for `float32`
pub(crate) fn float(to: Type, x: f64) -> Data {
    if to.kind() == Kind::Float32 {
        Data::Float(x as f32 as f64)
    } else {
        Data::Float(x)
    }
}

/// Complex data for type `to`, rounded to single precision for `complex64`
pub(crate) fn complex(to: Type, c: Complex) -> Data {
    if to.kind() == Kind::Complex64 {
        Data::Complex(Complex::new(c.re as f32 as f64, c.im as f32 as f64))
    } else {
        Data::Complex(c)
    }
}

/// String data from bytes
pub(crate) fn string_data(bytes: &[u8]) -> Data {
    Data::String(Arc::from(bytes))
}

fn overflows_float32(x: f64) -> bool {
    let x = x.abs();
    (f32::MAX as f64) < x && x <= f64::MAX
}

impl Value {
    /// Value of a Bool
    pub fn get_bool(&self) -> bool {
        self.expect_kind("Value::get_bool", Kind::Bool);
        self.read(|d| match d {
            Data::Bool(b) => *b,
            _ => corrupt(),
        })
    }

    /// Value of a signed integer, widened to 64 bits
    pub fn get_int(&self) -> i64 {
        self.expect("Value::get_int", Kind::is_signed);
        self.read(|d| match d {
            Data::Int(i) => *i,
            _ => corrupt(),
        })
    }

    /// Value of an unsigned integer, widened to 64 bits
    pub fn get_uint(&self) -> u64 {
        self.expect("Value::get_uint", Kind::is_unsigned);
        self.read(|d| match d {
            Data::Uint(u) => *u,
            _ => corrupt(),
        })
    }

    /// Value of a float
    pub fn get_float(&self) -> f64 {
        self.expect("Value::get_float", Kind::is_float);
        self.read(|d| match d {
            Data::Float(f) => *f,
            _ => corrupt(),
        })
    }

    /// Value of a complex number
    pub fn get_complex(&self) -> Complex {
        self.expect("Value::get_complex", Kind::is_complex);
        self.read(|d| match d {
            Data::Complex(c) => *c,
            _ => corrupt(),
        })
    }

    /// Contents of a String; for any other kind, `<T Value>` where `T` is
    /// the type
    pub fn get_string(&self) -> String {
        let h = self.handle("Value::get_string");
        if h.ty.kind() != Kind::String {
            return format!("<{} Value>", h.ty);
        }
        self.read(|d| match d {
            Data::String(s) => String::from_utf8_lossy(s).into_owned(),
            _ => corrupt(),
        })
    }

    /// Contents of a byte slice, or of an addressable byte array
    pub fn get_bytes(&self) -> Vec<u8> {
        const METHOD: &str = "Value::get_bytes";
        let h = self.expect(METHOD, |k| matches!(k, Kind::Slice | Kind::Array));
        if h.ty.elem().kind() != Kind::Uint8 {
            raise(ReflectError::KindMismatch {
                method: METHOD,
                kind: h.ty.kind(),
            });
        }
        let items = match self.load() {
            Data::Slice(None) => Vec::new(),
            Data::Slice(Some(s)) => slice_elements(&s),
            Data::Array(items) => {
                if !self.can_address() {
                    raise(ReflectError::Unaddressable { method: METHOD });
                }
                items
            }
            _ => corrupt(),
        };
        items
            .into_iter()
            .map(|d| match d {
                Data::Uint(b) => b as u8,
                _ => corrupt(),
            })
            .collect()
    }

    /// Set a Bool
    pub fn set_bool(&self, x: bool) {
        self.must_be_assignable("Value::set_bool");
        self.expect_kind("Value::set_bool", Kind::Bool);
        self.store("Value::set_bool", Data::Bool(x));
    }

    /// Set a signed integer, truncating to the type's width
    pub fn set_int(&self, x: i64) {
        self.must_be_assignable("Value::set_int");
        let h = self.expect("Value::set_int", Kind::is_signed);
        self.store("Value::set_int", integer(h.ty, x as u64));
    }

    /// Set an unsigned integer, truncating to the type's width
    pub fn set_uint(&self, x: u64) {
        self.must_be_assignable("Value::set_uint");
        let h = self.expect("Value::set_uint", Kind::is_unsigned);
        self.store("Value::set_uint", integer(h.ty, x));
    }

    /// Set a float, rounding to the type's precision
    pub fn set_float(&self, x: f64) {
        self.must_be_assignable("Value::set_float");
        let h = self.expect("Value::set_float", Kind::is_float);
        self.store("Value::set_float", float(h.ty, x));
    }

    /// Set a complex number, rounding to the type's precision
    pub fn set_complex(&self, x: Complex) {
        self.must_be_assignable("Value::set_complex");
        let h = self.expect("Value::set_complex", Kind::is_complex);
        self.store("Value::set_complex", complex(h.ty, x));
    }

    /// Set a String
    pub fn set_string(&self, x: &str) {
        self.must_be_assignable("Value::set_string");
        self.expect_kind("Value::set_string", Kind::String);
        self.store("Value::set_string", string_data(x.as_bytes()));
    }

    /// Replace a byte slice with a fresh copy of `bytes`
    pub fn set_bytes(&self, bytes: &[u8]) {
        const METHOD: &str = "Value::set_bytes";
        self.must_be_assignable(METHOD);
        let h = self.expect_kind(METHOD, Kind::Slice);
        let elem = h.ty.elem();
        if elem.kind() != Kind::Uint8 {
            raise(ReflectError::KindMismatch {
                method: METHOD,
                kind: Kind::Slice,
            });
        }
        let items = bytes.iter().map(|&b| Data::Uint(b as u64)).collect();
        self.store(METHOD, new_slice_data(elem, items));
    }

    /// Underlying address of a reference value; zero when nil.
    ///
    /// For a slice this is the address of its first element (zero when it
    /// has no backing elements). For a function it is non-zero iff the
    /// function is non-nil.
    pub fn get_pointer(&self) -> usize {
        self.expect("Value::get_pointer", |k| {
            matches!(
                k,
                Kind::Chan | Kind::Func | Kind::Map | Kind::Pointer | Kind::Slice | Kind::UnsafePointer
            )
        });
        self.read(|d| match d {
            Data::Pointer(p) | Data::UnsafePointer(p) => p.as_ref().map_or(0, |p| p.address()),
            Data::Map(m) => m.as_ref().map_or(0, |m| Arc::as_ptr(m) as usize),
            Data::Chan(c) => c.as_ref().map_or(0, |c| Arc::as_ptr(c) as usize),
            Data::Func(f) => f.as_ref().map_or(0, |f| f.address()),
            Data::Slice(s) => match s {
                Some(s) if s.cap > 0 => s.element(0).address(),
                _ => 0,
            },
            _ => corrupt(),
        })
    }

    /// Whether `x` cannot be represented by this signed integer's type
    pub fn overflow_int(&self, x: i64) -> bool {
        let h = self.expect("Value::overflow_int", Kind::is_signed);
        let shift = 64 - h.ty.bits();
        x != (x << shift) >> shift
    }

    /// Whether `x` cannot be represented by this unsigned integer's type
    pub fn overflow_uint(&self, x: u64) -> bool {
        let h = self.expect("Value::overflow_uint", Kind::is_unsigned);
        let shift = 64 - h.ty.bits();
        x != (x << shift) >> shift
    }

    /// Whether `x` overflows this float's type; infinities never overflow
    pub fn overflow_float(&self, x: f64) -> bool {
        let h = self.expect("Value::overflow_float", Kind::is_float);
        h.ty.kind() == Kind::Float32 && overflows_float32(x)
    }

    /// Whether either part of `x` overflows this complex type's components
    pub fn overflow_complex(&self, x: Complex) -> bool {
        let h = self.expect("Value::overflow_complex", Kind::is_complex);
        h.ty.kind() == Kind::Complex64 && (overflows_float32(x.re) || overflows_float32(x.im))
    }

    /// Whether a Chan, Func, Interface, Map, Pointer, Slice or UnsafePointer
    /// is nil
    pub fn is_nil(&self) -> bool {
        self.expect("Value::is_nil", Kind::is_nillable);
        self.read(|d| d.is_nil_ref().unwrap_or_else(|| corrupt()))
    }

    /// Whether the value is the zero value of its type
    pub fn is_zero(&self) -> bool {
        self.handle("Value::is_zero");
        self.read(Data::is_zero)
    }
}
