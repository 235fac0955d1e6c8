//! Assignment and conversion between types

use super::data::{Boxed, Data};
use super::scalar::{complex, float, integer, string_data};
use super::{corrupt, Value};
use crate::container::{new_slice_data, slice_elements};
use crate::error::{raise, ReflectError};
use crate::types::{Kind, Type};

impl Value {
    /// Data of this value as stored in a location of type `dst`.
    ///
    /// Concrete values assigned to an interface type are boxed with their
    /// dynamic type.
    pub(crate) fn assign_to(&self, method: &'static str, dst: Type) -> Data {
        let src = self.handle(method).ty;
        if dst.kind() == Kind::Interface {
            if !src.implements(dst) {
                raise(ReflectError::NotAssignable {
                    method,
                    from: src.to_string(),
                    to: dst.to_string(),
                });
            }
            if src.kind() == Kind::Interface {
                return self.load();
            }
            return Data::Interface(Some(Box::new(Boxed {
                ty: src,
                data: self.load(),
            })));
        }
        if !src.assignable_to(dst) {
            raise(ReflectError::NotAssignable {
                method,
                from: src.to_string(),
                to: dst.to_string(),
            });
        }
        self.load()
    }

    /// The value converted to type `to`, following the language's
    /// conversion rules
    pub fn convert(&self, to: Type) -> Value {
        let h = self.handle("Value::convert");
        let from = h.ty;
        if !from.convertible_to(to) {
            raise(ReflectError::NotConvertible {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let flags = h.flags.ro();
        if to.kind() == Kind::Interface {
            return Value::direct_flagged(to, self.assign_to("Value::convert", to), flags);
        }
        let data = self.load();
        let out = match (from.kind(), to.kind()) {
            (f, t) if f.is_integer() && t.is_integer() => integer(to, raw_bits(&data)),
            (f, t) if f.is_integer() && t.is_float() => float(to, integer_as_f64(&data)),
            (f, t) if f.is_float() && t.is_signed() => integer(to, as_f64(&data) as i64 as u64),
            (f, t) if f.is_float() && t.is_unsigned() => integer(to, as_f64(&data) as u64),
            (f, t) if f.is_float() && t.is_float() => float(to, as_f64(&data)),
            (f, t) if f.is_complex() && t.is_complex() => match data {
                Data::Complex(c) => complex(to, c),
                _ => corrupt(),
            },
            (f, Kind::String) if f.is_integer() => {
                let c = rune(&data);
                string_data(c.encode_utf8(&mut [0; 4]).as_bytes())
            }
            (Kind::String, Kind::Slice) => string_to_slice(to, &data),
            (Kind::Slice, Kind::String) => slice_to_string(from, &data),
            (Kind::Pointer, Kind::UnsafePointer) | (Kind::UnsafePointer, Kind::Pointer) => {
                match data {
                    Data::Pointer(p) => Data::UnsafePointer(p),
                    Data::UnsafePointer(p) => Data::Pointer(p),
                    _ => corrupt(),
                }
            }
            (Kind::UnsafePointer, Kind::Uintptr) => match data {
                Data::UnsafePointer(p) => Data::Uint(p.map_or(0, |p| p.address()) as u64),
                _ => corrupt(),
            },
            _ => data,
        };
        Value::direct_flagged(to, out, flags)
    }
}

fn raw_bits(data: &Data) -> u64 {
    match data {
        Data::Int(i) => *i as u64,
        Data::Uint(u) => *u,
        _ => corrupt(),
    }
}

fn integer_as_f64(data: &Data) -> f64 {
    match data {
        Data::Int(i) => *i as f64,
        Data::Uint(u) => *u as f64,
        _ => corrupt(),
    }
}

fn as_f64(data: &Data) -> f64 {
    match data {
        Data::Float(f) => *f,
        _ => corrupt(),
    }
}

/// Code point of an integer, U+FFFD when out of range
fn rune(data: &Data) -> char {
    let code = match data {
        Data::Int(i) => u32::try_from(*i).ok(),
        Data::Uint(u) => u32::try_from(*u).ok(),
        _ => corrupt(),
    };
    code.and_then(char::from_u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn string_to_slice(to: Type, data: &Data) -> Data {
    let Data::String(bytes) = data else { corrupt() };
    let elem = to.elem();
    let items = if elem.kind() == Kind::Uint8 {
        bytes.iter().map(|&b| Data::Uint(b as u64)).collect()
    } else {
        String::from_utf8_lossy(bytes)
            .chars()
            .map(|c| Data::Int(c as i64))
            .collect()
    };
    new_slice_data(elem, items)
}

fn slice_to_string(from: Type, data: &Data) -> Data {
    let Data::Slice(slice) = data else { corrupt() };
    let items = slice.as_ref().map(slice_elements).unwrap_or_default();
    if from.elem().kind() == Kind::Uint8 {
        let bytes: Vec<u8> = items
            .iter()
            .map(|d| match d {
                Data::Uint(b) => *b as u8,
                _ => corrupt(),
            })
            .collect();
        string_data(&bytes)
    } else {
        let text: String = items.iter().map(rune).collect();
        string_data(text.as_bytes())
    }
}
