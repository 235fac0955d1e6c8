//! Type descriptors
//!
//! A [`Type`] is a `Copy` handle to an immutable descriptor that lives for
//! the rest of the process. Unnamed shapes are interned by
//! [`super::registry`], named types are created one at a time with
//! [`Type::declare`] and completed with [`Type::define`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

use super::field::{Field, StructField};
use super::kind::{ChanDir, Kind};
use super::layout::{self, SizeAlign};
use super::method::{InterfaceMethod, MethodDef, MethodTable, Receiver};
use super::registry::{self, TypeKey};
use crate::error::{invalid, raise, ReflectError};
use crate::value::Reflect;

// ============================================================================
// Descriptor storage
// ============================================================================

/// Handle to a type descriptor.
///
/// Equality and hashing are by descriptor identity.
#[derive(Clone, Copy)]
pub struct Type(pub(crate) &'static TypeData);

/// Descriptor body shared by named and unnamed types
pub(crate) struct TypeData {
    pub(crate) name: Option<String>,
    pub(crate) scope: String,
    pub(crate) repr: String,
    pub(crate) def: OnceCell<TypeDef>,
    pub(crate) table: OnceCell<MethodTable>,
}

/// Shape of a complete type
pub(crate) struct TypeDef {
    pub(crate) kind: Kind,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) shape: Shape,
    /// Underlying type of a named type; `None` when the type is its own
    /// underlying type
    pub(crate) underlying: Option<Type>,
    /// Declared methods, sorted by name
    pub(crate) declared: Vec<Arc<MethodDef>>,
}

/// Kind-specific part of a descriptor
#[derive(Clone)]
pub(crate) enum Shape {
    Basic,
    Array { elem: Type, len: usize },
    Chan { dir: ChanDir, elem: Type },
    Func { params: Vec<Type>, results: Vec<Type>, variadic: bool },
    Interface { methods: Vec<InterfaceMethod> },
    Map { key: Type, elem: Type },
    Pointer { elem: Type },
    Slice { elem: Type },
    Struct { fields: Vec<StructField> },
}

impl TypeData {
    fn unnamed(repr: String, def: TypeDef) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(def);
        Self {
            name: None,
            scope: String::new(),
            repr,
            def: cell,
            table: OnceCell::new(),
        }
    }
}

impl TypeDef {
    fn new(kind: Kind, (size, align): SizeAlign, shape: Shape) -> Self {
        Self {
            kind,
            size,
            align,
            shape,
            underlying: None,
            declared: Vec::new(),
        }
    }
}

static ERROR: Lazy<Type> = Lazy::new(|| {
    let sig = Type::func_of(Vec::new(), vec![Type::string()], false);
    let iface = Type::interface_of("", vec![InterfaceMethod::new("Error", sig)]);
    Type::declare("", "error").define(iface, Vec::new())
});

macro_rules! predeclared {
    ($($name:literal $method:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("The predeclared `", $name, "` type")]
            pub fn $method() -> Type {
                Type::of_kind(Kind::$kind)
            }
        )*
    };
}

// ============================================================================
// Construction
// ============================================================================

impl Type {
    pub(crate) fn leak(data: TypeData) -> Type {
        Type(Box::leak(Box::new(data)))
    }

    /// Descriptor of a complete type; raises for declared-but-undefined types
    #[track_caller]
    pub(crate) fn def(self) -> &'static TypeDef {
        match self.0.def.get() {
            Some(def) => def,
            None => raise(ReflectError::IncompleteType(self.0.repr.clone())),
        }
    }

    #[track_caller]
    pub(crate) fn mismatch(self, method: &'static str) -> ! {
        raise(ReflectError::InvalidTypeQuery {
            method,
            ty: self.to_string(),
        })
    }

    /// The predeclared type of a basic kind
    pub fn of_kind(kind: Kind) -> Type {
        if !kind.is_basic() {
            invalid(format!("{} is not a predeclared kind", kind));
        }
        registry::intern(TypeKey::Basic(kind), || {
            let (name, repr) = match kind {
                Kind::UnsafePointer => ("Pointer", "unsafe.Pointer"),
                other => (other.name(), other.name()),
            };
            let def = TypeDef::new(kind, layout::basic(kind), Shape::Basic);
            let mut data = TypeData::unnamed(repr.to_string(), def);
            data.name = Some(name.to_string());
            data
        })
    }

    predeclared! {
        "bool" bool => Bool,
        "int" int => Int,
        "int8" int8 => Int8,
        "int16" int16 => Int16,
        "int32" int32 => Int32,
        "int64" int64 => Int64,
        "uint" uint => Uint,
        "uint8" uint8 => Uint8,
        "uint16" uint16 => Uint16,
        "uint32" uint32 => Uint32,
        "uint64" uint64 => Uint64,
        "uintptr" uintptr => Uintptr,
        "float32" float32 => Float32,
        "float64" float64 => Float64,
        "complex64" complex64 => Complex64,
        "complex128" complex128 => Complex128,
        "string" string => String,
        "unsafe.Pointer" unsafe_pointer => UnsafePointer,
    }

    /// The predeclared `error` interface, `interface { Error() string }`
    pub fn error() -> Type {
        *ERROR
    }

    /// `interface {}`
    pub fn empty_interface() -> Type {
        Self::interface_of("", Vec::new())
    }

    /// The type mirrored by a host Rust type
    pub fn of<T: Reflect + ?Sized>() -> Type {
        T::reflect_type()
    }

    /// `*elem`
    pub fn pointer_to(elem: Type) -> Type {
        registry::intern(TypeKey::Pointer(elem), || {
            let def = TypeDef::new(Kind::Pointer, layout::reference(), Shape::Pointer { elem });
            TypeData::unnamed(format!("*{}", elem), def)
        })
    }

    /// `[]elem`
    pub fn slice_of(elem: Type) -> Type {
        registry::intern(TypeKey::Slice(elem), || {
            let def = TypeDef::new(Kind::Slice, layout::slice_header(), Shape::Slice { elem });
            TypeData::unnamed(format!("[]{}", elem), def)
        })
    }

    /// `[len]elem`
    pub fn array_of(len: usize, elem: Type) -> Type {
        let size_align = layout::array(elem, len);
        registry::intern(TypeKey::Array(len, elem), || {
            let def = TypeDef::new(Kind::Array, size_align, Shape::Array { elem, len });
            TypeData::unnamed(format!("[{}]{}", len, elem), def)
        })
    }

    /// `map[key]elem`; the key type must be comparable
    pub fn map_of(key: Type, elem: Type) -> Type {
        if !key.comparable() {
            invalid(format!("invalid key type {}", key));
        }
        registry::intern(TypeKey::Map(key, elem), || {
            let def = TypeDef::new(Kind::Map, layout::reference(), Shape::Map { key, elem });
            TypeData::unnamed(format!("map[{}]{}", key, elem), def)
        })
    }

    /// Channel of `elem` in direction `dir`
    pub fn chan_of(dir: ChanDir, elem: Type) -> Type {
        let nested_recv = elem.0.def.get().is_some_and(|d| {
            matches!(d.shape, Shape::Chan { dir: ChanDir::Recv, .. }) && elem.0.name.is_none()
        });
        registry::intern(TypeKey::Chan(dir, elem), || {
            let repr = match dir {
                ChanDir::Both if nested_recv => format!("chan ({})", elem),
                other => format!("{} {}", other, elem),
            };
            let def = TypeDef::new(Kind::Chan, layout::reference(), Shape::Chan { dir, elem });
            TypeData::unnamed(repr, def)
        })
    }

    /// Function type; a variadic function's final parameter must be a slice
    pub fn func_of(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Type {
        if variadic && params.last().map_or(true, |p| p.kind() != Kind::Slice) {
            invalid("variadic function must have a final slice parameter");
        }
        let repr = func_repr("func", &params, &results, variadic);
        let key = TypeKey::Func {
            params: params.clone(),
            results: results.clone(),
            variadic,
        };
        registry::intern(key, move || {
            let shape = Shape::Func {
                params,
                results,
                variadic,
            };
            TypeData::unnamed(repr, TypeDef::new(Kind::Func, layout::reference(), shape))
        })
    }

    /// Struct type with the given fields in declaration order
    pub fn struct_of(fields: Vec<Field>) -> Type {
        for (i, field) in fields.iter().enumerate() {
            if field.name != "_" && fields[..i].iter().any(|f| f.name == field.name) {
                invalid(format!("struct_of: duplicate field {}", field.name));
            }
        }
        let types: Vec<Type> = fields.iter().map(|f| f.ty).collect();
        let (offsets, size_align) = layout::structure(&types);
        let key = TypeKey::Struct(
            fields
                .iter()
                .map(|f| (f.name.clone(), f.ty, f.embedded))
                .collect(),
        );
        let repr = if fields.is_empty() {
            "struct {}".to_string()
        } else {
            let parts: Vec<String> = fields
                .iter()
                .map(|f| {
                    if f.embedded {
                        f.ty.to_string()
                    } else {
                        format!("{} {}", f.name, f.ty)
                    }
                })
                .collect();
            format!("struct {{ {} }}", parts.join("; "))
        };
        registry::intern(key, move || {
            let fields = fields
                .into_iter()
                .zip(offsets)
                .enumerate()
                .map(|(i, (f, offset))| StructField::declared(f, offset, i))
                .collect();
            let def = TypeDef::new(Kind::Struct, size_align, Shape::Struct { fields });
            TypeData::unnamed(repr, def)
        })
    }

    /// Interface type declared in `scope`.
    ///
    /// The scope only matters for unexported methods, which are satisfied
    /// solely by methods declared in the same scope.
    pub fn interface_of(scope: &str, methods: Vec<InterfaceMethod>) -> Type {
        let mut methods: Vec<InterfaceMethod> = methods
            .into_iter()
            .map(|m| m.scoped(scope))
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = methods.windows(2).find(|w| w[0].name == w[1].name) {
            invalid(format!("interface_of: duplicate method {}", pair[0].name));
        }
        if let Some(m) = methods.iter().find(|m| m.ty.kind() != Kind::Func) {
            invalid(format!("interface_of: method {} has non-func type {}", m.name, m.ty));
        }
        let key = TypeKey::Interface(
            methods
                .iter()
                .map(|m| (m.name.clone(), m.ty, m.scope.clone()))
                .collect(),
        );
        let repr = if methods.is_empty() {
            "interface {}".to_string()
        } else {
            let parts: Vec<String> = methods
                .iter()
                .map(|m| format!("{}{}", m.name, signature(m.ty)))
                .collect();
            format!("interface {{ {} }}", parts.join("; "))
        };
        registry::intern(key, move || {
            let def = TypeDef::new(Kind::Interface, layout::interface_header(), Shape::Interface { methods });
            TypeData::unnamed(repr, def)
        })
    }

    /// Declare a named type in `scope`.
    ///
    /// The type is incomplete until [`Type::define`] is called; until then it
    /// may only be used as a pointer or slice element, which is how
    /// self-referential types are built.
    pub fn declare(scope: &str, name: &str) -> Type {
        let repr = match scope.rsplit('/').next() {
            Some(last) if !last.is_empty() => format!("{}.{}", last, name),
            _ => name.to_string(),
        };
        Type::leak(TypeData {
            name: Some(name.to_string()),
            scope: scope.to_string(),
            repr,
            def: OnceCell::new(),
            table: OnceCell::new(),
        })
    }

    /// Complete a declared type with its underlying type and methods.
    ///
    /// Raises if the type is unnamed, already defined, or the methods are
    /// not valid for the underlying kind.
    pub fn define(self, underlying: Type, methods: Vec<MethodDef>) -> Type {
        if self.0.name.is_none() {
            invalid(format!("define on unnamed type {}", self));
        }
        let base = underlying.underlying();
        let base_def = base.def();
        if !methods.is_empty() && matches!(base_def.kind, Kind::Interface | Kind::Pointer) {
            invalid(format!("invalid receiver type {}: {} types cannot declare methods", self, base_def.kind));
        }
        let mut declared: Vec<Arc<MethodDef>> = methods.into_iter().map(Arc::new).collect();
        declared.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in declared.windows(2) {
            if pair[0].name == pair[1].name {
                invalid(format!("method {}.{} redeclared", self, pair[0].name));
            }
        }
        for method in &declared {
            if method.ty.kind() != Kind::Func {
                invalid(format!("method {}.{} has non-func type {}", self, method.name, method.ty));
            }
            if let Shape::Struct { fields } = &base_def.shape {
                if fields.iter().any(|f| f.name == method.name) {
                    invalid(format!("field and method with the same name {}", method.name));
                }
            }
        }
        let pointer_methods = declared.iter().filter(|m| m.receiver == Receiver::Pointer).count();
        let def = TypeDef {
            kind: base_def.kind,
            size: base_def.size,
            align: base_def.align,
            shape: base_def.shape.clone(),
            underlying: Some(base),
            declared,
        };
        if self.0.def.set(def).is_err() {
            invalid(format!("type {} already defined", self));
        }
        tracing::debug!(
            ty = %self,
            underlying = %base,
            methods = self.def().declared.len(),
            pointer_methods,
            "defined named type"
        );
        self
    }

    /// Declare and define a named type without methods
    pub fn named(scope: &str, name: &str, underlying: Type) -> Type {
        Self::declare(scope, name).define(underlying, Vec::new())
    }
}

fn signature(func: Type) -> String {
    match &func.def().shape {
        Shape::Func {
            params,
            results,
            variadic,
        } => func_repr("", params, results, *variadic),
        _ => func.mismatch("signature"),
    }
}

fn func_repr(prefix: &str, params: &[Type], results: &[Type], variadic: bool) -> String {
    let mut out = String::from(prefix);
    out.push('(');
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if variadic && i + 1 == params.len() {
            out.push_str("...");
            out.push_str(&param.elem().to_string());
        } else {
            out.push_str(&param.to_string());
        }
    }
    out.push(')');
    match results {
        [] => {}
        [single] => {
            out.push(' ');
            out.push_str(&single.to_string());
        }
        many => {
            let parts: Vec<String> = many.iter().map(Type::to_string).collect();
            out.push_str(&format!(" ({})", parts.join(", ")));
        }
    }
    out
}

// ============================================================================
// Attributes
// ============================================================================

#[allow(clippy::len_without_is_empty)]
impl Type {
    /// Kind of the type
    pub fn kind(self) -> Kind {
        self.def().kind
    }

    /// Name of a named type, empty for unnamed types
    pub fn name(self) -> &'static str {
        self.0.name.as_deref().unwrap_or("")
    }

    /// Declaring scope (package path); empty for predeclared and unnamed types
    pub fn scope(self) -> &'static str {
        &self.0.scope
    }

    /// Whether the type has a name
    pub fn is_named(self) -> bool {
        self.0.name.is_some()
    }

    /// Whether the type has been defined
    pub fn is_complete(self) -> bool {
        self.0.def.get().is_some()
    }

    /// Size in bytes
    pub fn size(self) -> usize {
        self.def().size
    }

    /// Alignment in bytes
    pub fn align(self) -> usize {
        self.def().align
    }

    /// Alignment when used as a struct field
    pub fn field_align(self) -> usize {
        self.def().align
    }

    /// Underlying type: the type itself for unnamed and predeclared types
    pub fn underlying(self) -> Type {
        self.def().underlying.unwrap_or(self)
    }

    /// Width in bits of a numeric type
    pub fn bits(self) -> usize {
        if !self.kind().is_numeric() {
            self.mismatch("Type::bits");
        }
        self.size() * 8
    }

    /// Length of an array type
    pub fn len(self) -> usize {
        match self.def().shape {
            Shape::Array { len, .. } => len,
            _ => self.mismatch("Type::len"),
        }
    }

    /// Element type of an Array, Chan, Map, Pointer or Slice type
    pub fn elem(self) -> Type {
        match self.def().shape {
            Shape::Array { elem, .. }
            | Shape::Chan { elem, .. }
            | Shape::Map { elem, .. }
            | Shape::Pointer { elem }
            | Shape::Slice { elem } => elem,
            _ => self.mismatch("Type::elem"),
        }
    }

    /// Key type of a Map type
    pub fn key(self) -> Type {
        match self.def().shape {
            Shape::Map { key, .. } => key,
            _ => self.mismatch("Type::key"),
        }
    }

    /// Direction of a Chan type
    pub fn chan_dir(self) -> ChanDir {
        match self.def().shape {
            Shape::Chan { dir, .. } => dir,
            _ => self.mismatch("Type::chan_dir"),
        }
    }

    /// Parameter types of a Func type
    pub fn params(self) -> &'static [Type] {
        match &self.def().shape {
            Shape::Func { params, .. } => params,
            _ => self.mismatch("Type::params"),
        }
    }

    /// Result types of a Func type
    pub fn results(self) -> &'static [Type] {
        match &self.def().shape {
            Shape::Func { results, .. } => results,
            _ => self.mismatch("Type::results"),
        }
    }

    /// Number of parameters of a Func type
    pub fn num_params(self) -> usize {
        self.params().len()
    }

    /// The i'th parameter type of a Func type
    pub fn param(self, i: usize) -> Type {
        let params = self.params();
        match params.get(i) {
            Some(ty) => *ty,
            None => raise(ReflectError::IndexOutOfRange {
                method: "Type::param",
                index: i,
                len: params.len(),
            }),
        }
    }

    /// Number of results of a Func type
    pub fn num_results(self) -> usize {
        self.results().len()
    }

    /// The i'th result type of a Func type
    pub fn result(self, i: usize) -> Type {
        let results = self.results();
        match results.get(i) {
            Some(ty) => *ty,
            None => raise(ReflectError::IndexOutOfRange {
                method: "Type::result",
                index: i,
                len: results.len(),
            }),
        }
    }

    /// Whether a Func type's final parameter is variadic
    pub fn is_variadic(self) -> bool {
        match self.def().shape {
            Shape::Func { variadic, .. } => variadic,
            _ => self.mismatch("Type::is_variadic"),
        }
    }

    /// Fields of a Struct type
    pub fn fields(self) -> &'static [StructField] {
        match &self.def().shape {
            Shape::Struct { fields } => fields,
            _ => self.mismatch("Type::fields"),
        }
    }

    /// Number of fields of a Struct type
    pub fn num_fields(self) -> usize {
        self.fields().len()
    }

    /// The i'th field of a Struct type
    pub fn field(self, i: usize) -> &'static StructField {
        let fields = self.fields();
        match fields.get(i) {
            Some(field) => field,
            None => raise(ReflectError::IndexOutOfRange {
                method: "Type::field",
                index: i,
                len: fields.len(),
            }),
        }
    }

    pub(crate) fn interface_methods(self) -> &'static [InterfaceMethod] {
        match &self.def().shape {
            Shape::Interface { methods } => methods,
            _ => self.mismatch("Type::interface_methods"),
        }
    }

    /// Methods declared directly on a named type
    pub(crate) fn declared_methods(self) -> &'static [Arc<MethodDef>] {
        match self.0.def.get() {
            Some(def) => &def.declared,
            None => &[],
        }
    }
}

// ============================================================================
// Trait impls
// ============================================================================

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 as *const TypeData as usize).hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.repr)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predeclared_names() {
        assert_eq!(Type::int().name(), "int");
        assert_eq!(Type::int().scope(), "");
        assert_eq!(Type::unsafe_pointer().to_string(), "unsafe.Pointer");
        assert_eq!(Type::error().to_string(), "error");
        assert_eq!(Type::error().kind(), Kind::Interface);
    }

    #[test]
    fn test_composite_strings() {
        assert_eq!(Type::slice_of(Type::int()).to_string(), "[]int");
        assert_eq!(Type::array_of(3, Type::int()).to_string(), "[3]int");
        assert_eq!(Type::map_of(Type::int(), Type::string()).to_string(), "map[int]string");
        assert_eq!(Type::chan_of(ChanDir::Send, Type::string()).to_string(), "chan<- string");
        assert_eq!(
            Type::chan_of(ChanDir::Both, Type::chan_of(ChanDir::Recv, Type::int())).to_string(),
            "chan (<-chan int)"
        );
        let f = Type::func_of(
            vec![Type::int(), Type::string()],
            vec![Type::float32(), Type::error()],
            false,
        );
        assert_eq!(f.to_string(), "func(int, string) (float32, error)");
        let v = Type::func_of(vec![Type::slice_of(Type::int())], vec![Type::int()], true);
        assert_eq!(v.to_string(), "func(...int) int");
    }

    #[test]
    fn test_named_repr_uses_last_scope_segment() {
        let t = Type::named("example.com/pkg/main", "alignS", Type::int());
        assert_eq!(t.to_string(), "main.alignS");
        assert_eq!(t.name(), "alignS");
        assert_eq!(t.scope(), "example.com/pkg/main");
    }

    #[test]
    fn test_declarations_are_distinct() {
        let a = Type::named("main", "T", Type::int());
        let b = Type::named("main", "T", Type::int());
        assert_ne!(a, b);
        assert_eq!(a.underlying(), b.underlying());
    }

    #[test]
    fn test_self_referential_type() {
        let node = Type::declare("main", "Node");
        let ptr = Type::pointer_to(node);
        node.define(Type::struct_of(vec![Field::new("next", ptr)]), Vec::new());
        assert_eq!(node.field(0).ty.elem(), node);
        assert_eq!(node.size(), 8);
    }

    #[test]
    fn test_incomplete_type_query_raises() {
        let t = Type::declare("main", "Later");
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.kind())).unwrap_err();
        assert!(matches!(
            payload.downcast_ref::<ReflectError>(),
            Some(ReflectError::IncompleteType(_))
        ));
    }

    #[test]
    fn test_kind_conditional_query_raises() {
        let payload = std::panic::catch_unwind(|| Type::int().elem()).unwrap_err();
        let err = payload.downcast_ref::<ReflectError>().unwrap();
        assert_eq!(err.to_string(), "reflect: Type::elem of invalid type int");
    }
}
