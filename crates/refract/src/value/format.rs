//! Textual rendering of values in the `%v` style

use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::data::{Complex, Data};
use super::host::Visit;
use super::Value;
use crate::container::slice_elements;
use crate::types::{Kind, Type};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("<invalid reflect.Value>"),
            Some(h) => {
                let data = self.load();
                write_value(f, h.ty, &data, 0, &mut FxHashSet::default())
            }
        }
    }
}

/// Slices and maps already on `path` print as their address
fn write_value(
    out: &mut impl Write,
    ty: Type,
    data: &Data,
    depth: usize,
    path: &mut FxHashSet<Visit>,
) -> fmt::Result {
    let Some((visit, address)) = Visit::of(data) else {
        return write_data(out, ty, data, depth, path);
    };
    if !path.insert(visit.clone()) {
        return write_address(out, Some(address));
    }
    let result = write_data(out, ty, data, depth, path);
    path.remove(&visit);
    result
}

fn write_data(
    out: &mut impl Write,
    ty: Type,
    data: &Data,
    depth: usize,
    path: &mut FxHashSet<Visit>,
) -> fmt::Result {
    match data {
        Data::Bool(b) => write!(out, "{}", b),
        Data::Int(i) => write!(out, "{}", i),
        Data::Uint(u) => write!(out, "{}", u),
        Data::Float(x) => out.write_str(&float_text(*x, ty.kind() == Kind::Float32)),
        Data::Complex(c) => out.write_str(&complex_text(*c, ty.kind() == Kind::Complex64)),
        Data::String(s) => out.write_str(&String::from_utf8_lossy(s)),
        Data::Array(items) => write_list(out, ty.elem(), items, depth, path),
        Data::Slice(None) => out.write_str("[]"),
        Data::Slice(Some(s)) => write_list(out, ty.elem(), &slice_elements(s), depth, path),
        Data::Struct(items) => {
            out.write_char('{')?;
            for (i, (field, item)) in ty.fields().iter().zip(items).enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_value(out, field.ty, item, depth + 1, path)?;
            }
            out.write_char('}')
        }
        Data::Map(None) => out.write_str("map[]"),
        Data::Map(Some(m)) => {
            let mut entries = m.entries();
            entries.sort_by(|a, b| order(&a.0, &b.0));
            let (key, elem) = (ty.key(), ty.elem());
            out.write_str("map[")?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_value(out, key, k, depth + 1, path)?;
                out.write_char(':')?;
                write_value(out, elem, v, depth + 1, path)?;
            }
            out.write_char(']')
        }
        Data::Interface(None) => out.write_str("<nil>"),
        Data::Interface(Some(b)) => write_value(out, b.ty, &b.data, depth + 1, path),
        Data::Pointer(Some(p))
            if depth == 0
                && matches!(ty.elem().kind(), Kind::Struct | Kind::Array | Kind::Slice | Kind::Map) =>
        {
            out.write_char('&')?;
            write_value(out, ty.elem(), &p.load(), depth + 1, path)
        }
        Data::Pointer(p) | Data::UnsafePointer(p) => write_address(out, p.as_ref().map(|p| p.address())),
        Data::Func(f) => write_address(out, f.as_ref().map(|f| f.address())),
        Data::Chan(c) => write_address(out, c.as_ref().map(|c| Arc::as_ptr(c) as usize)),
    }
}

fn write_list(
    out: &mut impl Write,
    elem: Type,
    items: &[Data],
    depth: usize,
    path: &mut FxHashSet<Visit>,
) -> fmt::Result {
    out.write_char('[')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write_value(out, elem, item, depth + 1, path)?;
    }
    out.write_char(']')
}

fn write_address(out: &mut impl Write, address: Option<usize>) -> fmt::Result {
    match address {
        Some(a) => write!(out, "{:#x}", a),
        None => out.write_str("<nil>"),
    }
}

/// Map key order for printing: numbers numerically, strings bytewise, the
/// rest by their printed form
fn order(a: &Data, b: &Data) -> Ordering {
    match (a, b) {
        (Data::Bool(x), Data::Bool(y)) => x.cmp(y),
        (Data::Int(x), Data::Int(y)) => x.cmp(y),
        (Data::Uint(x), Data::Uint(y)) => x.cmp(y),
        (Data::Float(x), Data::Float(y)) => x.total_cmp(y),
        (Data::String(x), Data::String(y)) => x.cmp(y),
        (Data::Complex(x), Data::Complex(y)) => x.re.total_cmp(&y.re).then(x.im.total_cmp(&y.im)),
        _ => fallback_text(a).cmp(&fallback_text(b)),
    }
}

fn fallback_text(data: &Data) -> String {
    let mut text = String::new();
    let _ = write_key(&mut text, data);
    text
}

/// Untyped rendering used only for ordering keys of mixed shapes
fn write_key(out: &mut String, data: &Data) -> fmt::Result {
    match data {
        Data::Interface(Some(b)) => write_value(out, b.ty, &b.data, 1, &mut FxHashSet::default()),
        Data::Pointer(p) | Data::UnsafePointer(p) => write_address(out, p.as_ref().map(|p| p.address())),
        Data::Chan(c) => write_address(out, c.as_ref().map(|c| Arc::as_ptr(c) as usize)),
        Data::Array(items) | Data::Struct(items) => {
            for item in items {
                write_key(out, item)?;
                out.write_char(' ')?;
            }
            Ok(())
        }
        Data::Bool(b) => write!(out, "{}", b),
        Data::Int(i) => write!(out, "{}", i),
        Data::Uint(u) => write!(out, "{}", u),
        Data::Float(x) => write!(out, "{}", x),
        Data::Complex(c) => write!(out, "{}{}", c.re, c.im),
        Data::String(s) => out.write_str(&String::from_utf8_lossy(s)),
        _ => out.write_str("<nil>"),
    }
}

/// Shortest representation that round-trips, in exponent form when the
/// decimal exponent is below -4 or at least 21
pub(crate) fn float_text(x: f64, single: bool) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let (plain, sci) = if single {
        let y = x as f32;
        (format!("{}", y), format!("{:e}", y))
    } else {
        (format!("{}", x), format!("{:e}", x))
    };
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return plain;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..21).contains(&exp) {
        plain
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}

fn complex_text(c: Complex, single: bool) -> String {
    let re = float_text(c.re, single);
    let im = float_text(c.im, single);
    let sign = if im.starts_with(['+', '-']) { "" } else { "+" };
    format!("({}{}{}i)", re, sign, im)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn test_float_text() {
        assert_eq!(float_text(3.0, false), "3");
        assert_eq!(float_text(0.1, false), "0.1");
        assert_eq!(float_text(1e21, false), "1e+21");
        assert_eq!(float_text(1e20, false), "100000000000000000000");
        assert_eq!(float_text(1.5e-7, false), "1.5e-07");
        assert_eq!(float_text(0.0001, false), "0.0001");
        assert_eq!(float_text(0.1f32 as f64, true), "0.1");
        assert_eq!(float_text(f64::NAN, false), "NaN");
        assert_eq!(float_text(f64::NEG_INFINITY, false), "-Inf");
    }

    #[test]
    fn test_complex_text() {
        assert_eq!(complex_text(Complex::new(1.0, 2.0), false), "(1+2i)");
        assert_eq!(complex_text(Complex::new(1.0, -2.5), false), "(1-2.5i)");
        assert_eq!(complex_text(Complex::new(0.0, f64::INFINITY), false), "(0+Infi)");
    }

    #[test]
    fn test_display_composites() {
        assert_eq!(Value::of(vec![1i64, 2, 3]).to_string(), "[1 2 3]");
        assert_eq!(Value::zero(Type::slice_of(Type::int())).to_string(), "[]");
        let s = Type::struct_of(vec![Field::new("A", Type::int()), Field::new("B", Type::string())]);
        assert_eq!(Value::zero(s).to_string(), "{0 }");
        let p = Value::new_indirect(s);
        assert_eq!(p.to_string(), "&{0 }");
        assert_eq!(Value::zero(Type::pointer_to(Type::int())).to_string(), "<nil>");
        assert!(Value::new_indirect(Type::int()).to_string().starts_with("0x"));
        assert_eq!(Value::default().to_string(), "<invalid reflect.Value>");
    }

    #[test]
    fn test_display_map_sorted() {
        let m = Value::make_map(Type::map_of(Type::string(), Type::int()));
        m.map_set(&Value::of("b"), &Value::of(2i64).convert(Type::int()));
        m.map_set(&Value::of("a"), &Value::of(1i64).convert(Type::int()));
        assert_eq!(m.to_string(), "map[a:1 b:2]");
    }

    #[test]
    fn test_display_self_referential() {
        let any = Type::empty_interface();
        let holder = Value::new_indirect(Type::slice_of(any)).elem();
        holder.set(&Value::make_slice(Type::slice_of(any), 1, 1));
        holder.index(0).set(&holder);
        let text = holder.to_string();
        assert!(text.starts_with("[0x") && text.ends_with(']'), "{}", text);
        assert!(format!("{:?}", holder).contains("[0x"));

        let m = Value::make_map(Type::map_of(Type::string(), any));
        m.map_set(&Value::of("self"), &m);
        let text = m.to_string();
        assert!(text.starts_with("map[self:0x") && text.ends_with(']'), "{}", text);
    }

    #[test]
    fn test_display_shared_not_cyclic() {
        let inner = Value::of(vec![1i64]);
        let outer = Value::make_slice(Type::slice_of(inner.ty()), 2, 2);
        outer.index(0).set(&inner);
        outer.index(1).set(&inner);
        assert_eq!(outer.to_string(), "[[1] [1]]");
    }
}
