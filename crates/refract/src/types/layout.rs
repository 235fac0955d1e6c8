//! Size, alignment and field offset computation
//!
//! Layout follows the classic C-like model: scalars are naturally aligned,
//! reference kinds are one machine word, and struct fields are placed in
//! declaration order at the next offset satisfying their alignment. The word
//! size comes from [`crate::config::LayoutConfig`].

use super::kind::Kind;
use super::rtype::Type;
use crate::config;
use crate::error::invalid;

/// Size and alignment in bytes
pub(crate) type SizeAlign = (usize, usize);

/// Round `offset` up to a multiple of `align`
pub(crate) fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        return offset;
    }
    (offset + align - 1) / align * align
}

fn word() -> usize {
    config::current().layout.word_size()
}

/// Layout of a predeclared kind
pub(crate) fn basic(kind: Kind) -> SizeAlign {
    let layout = config::current().layout;
    let w = layout.word_size();
    let wide = layout.wide_align();
    match kind {
        Kind::Bool | Kind::Int8 | Kind::Uint8 => (1, 1),
        Kind::Int16 | Kind::Uint16 => (2, 2),
        Kind::Int32 | Kind::Uint32 | Kind::Float32 => (4, 4),
        Kind::Int64 | Kind::Uint64 | Kind::Float64 => (8, wide),
        Kind::Int | Kind::Uint | Kind::Uintptr | Kind::UnsafePointer => (w, w),
        Kind::Complex64 => (8, 4),
        Kind::Complex128 => (16, wide),
        Kind::String => (2 * w, w),
        other => invalid(format!("{} is not a predeclared kind", other)),
    }
}

/// Layout of a single-word reference (pointer, map, chan, func)
pub(crate) fn reference() -> SizeAlign {
    let w = word();
    (w, w)
}

/// Layout of a slice header (data pointer, length, capacity)
pub(crate) fn slice_header() -> SizeAlign {
    let w = word();
    (3 * w, w)
}

/// Layout of an interface header (type word, data word)
pub(crate) fn interface_header() -> SizeAlign {
    let w = word();
    (2 * w, w)
}

/// Layout of `[len]elem`
pub(crate) fn array(elem: Type, len: usize) -> SizeAlign {
    let size = elem.size().checked_mul(len).unwrap_or_else(|| {
        invalid(format!("array type [{}]{} too large", len, elem))
    });
    (size, elem.align())
}

/// Offsets of struct fields and the struct's own layout.
///
/// A trailing zero-size field gets one byte of padding so that taking its
/// address never points past the end of the struct.
pub(crate) fn structure(fields: &[Type]) -> (Vec<usize>, SizeAlign) {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut offset = 0;
    let mut align = 1;
    for ty in fields {
        let field_align = ty.align();
        offset = align_up(offset, field_align);
        offsets.push(offset);
        offset += ty.size();
        align = align.max(field_align);
    }
    if let Some(last) = fields.last() {
        if last.size() == 0 && offset > 0 {
            offset += 1;
        }
    }
    (offsets, (align_up(offset, align), align))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(9, 4), 12);
        assert_eq!(align_up(5, 1), 5);
    }

    #[test]
    fn test_basic_layout_64() {
        assert_eq!(basic(Kind::Bool), (1, 1));
        assert_eq!(basic(Kind::Int), (8, 8));
        assert_eq!(basic(Kind::Complex64), (8, 4));
        assert_eq!(basic(Kind::Complex128), (16, 8));
        assert_eq!(basic(Kind::String), (16, 8));
        assert_eq!(slice_header(), (24, 8));
        assert_eq!(interface_header(), (16, 8));
    }

    #[test]
    fn test_struct_offsets() {
        let (offsets, (size, align)) = structure(&[Type::int(), Type::string(), Type::float32()]);
        assert_eq!(offsets, vec![0, 8, 24]);
        assert_eq!((size, align), (32, 8));

        let (offsets, (size, _)) = structure(&[Type::uint8(), Type::int32(), Type::uint8()]);
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(size, 12);
    }

    #[test]
    fn test_trailing_zero_size_field_is_padded() {
        let empty = Type::struct_of(Vec::new());
        assert_eq!(empty.size(), 0);
        let (_, (size, _)) = structure(&[Type::int64(), empty]);
        assert_eq!(size, 16);
        let (_, (size, _)) = structure(&[empty]);
        assert_eq!(size, 0);
    }
}
