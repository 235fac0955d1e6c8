//! Struct fields and promoted-field lookup

use rustc_hash::{FxHashMap, FxHashSet};

use super::kind::Kind;
use super::rtype::Type;
use crate::error::{raise, ReflectError};

/// Whether an identifier is exported (starts with an upper-case letter)
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Field declaration for [`Type::struct_of`]
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) ty: Type,
    pub(crate) embedded: bool,
}

impl Field {
    /// A named field
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
        }
    }

    /// An embedded field of a named type or a pointer to one.
    ///
    /// The field name is the type name.
    pub fn embedded(ty: Type) -> Self {
        let base = match ty.0.def.get() {
            Some(def) if def.kind == Kind::Pointer && ty.0.name.is_none() => ty.elem(),
            _ => ty,
        };
        if !base.is_named() {
            crate::error::invalid(format!("embedded field type {} must be named", ty));
        }
        Self {
            name: base.name().to_string(),
            ty,
            embedded: true,
        }
    }
}

/// Descriptor of a struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Field name (the type name for embedded fields)
    pub name: String,
    /// Field type
    pub ty: Type,
    /// Byte offset within the immediately enclosing struct
    pub offset: usize,
    /// Whether the field is embedded
    pub embedded: bool,
    /// Whether the field name is exported
    pub exported: bool,
    /// Positions leading to the field from the struct it was looked up on
    pub index: Vec<usize>,
}

impl StructField {
    pub(crate) fn declared(field: Field, offset: usize, position: usize) -> Self {
        let exported = is_exported(&field.name);
        Self {
            name: field.name,
            ty: field.ty,
            offset,
            embedded: field.embedded,
            exported,
            index: vec![position],
        }
    }
}

/// Struct type reached through an embedded field, looking through a pointer
fn embedded_struct(field: &StructField) -> Option<Type> {
    if !field.embedded {
        return None;
    }
    let ty = if field.ty.kind() == Kind::Pointer {
        field.ty.elem()
    } else {
        field.ty
    };
    (ty.kind() == Kind::Struct).then_some(ty)
}

impl Type {
    /// Nested field reached by following `index` through embedded structs
    pub fn field_by_index(self, index: &[usize]) -> StructField {
        let Some((&first, rest)) = index.split_first() else {
            raise(ReflectError::InvalidOperation("Type::field_by_index: empty index".into()));
        };
        let mut field = self.field(first);
        for &i in rest {
            let mut ty = field.ty;
            if ty.kind() == Kind::Pointer && ty.elem().kind() == Kind::Struct {
                ty = ty.elem();
            }
            field = ty.field(i);
        }
        StructField {
            index: index.to_vec(),
            ..field.clone()
        }
    }

    /// Field with the given name, searching embedded structs breadth-first.
    ///
    /// `None` when absent or ambiguous at the shallowest depth it appears.
    pub fn field_by_name(self, name: &str) -> Option<StructField> {
        let fields = self.fields();
        if let Some(field) = fields.iter().find(|f| f.name == name) {
            return Some(field.clone());
        }
        if !fields.iter().any(|f| f.embedded) {
            return None;
        }
        self.search_fields(|candidate| candidate == name)
    }

    /// First field whose name satisfies `pred`, breadth-first, with the same
    /// ambiguity rule as [`Type::field_by_name`]
    pub fn field_by_predicate(self, pred: impl Fn(&str) -> bool) -> Option<StructField> {
        self.fields();
        self.search_fields(pred)
    }

    fn search_fields(self, matches: impl Fn(&str) -> bool) -> Option<StructField> {
        // Multiplicity of each struct type queued for the current and next
        // depth; a type reached twice at one depth makes its fields ambiguous.
        let mut count: FxHashMap<Type, usize>;
        let mut next_count: FxHashMap<Type, usize> = FxHashMap::default();
        let mut current: Vec<(Type, Vec<usize>)>;
        let mut next: Vec<(Type, Vec<usize>)> = vec![(self, Vec::new())];
        let mut visited: FxHashSet<Type> = FxHashSet::default();

        while !next.is_empty() {
            current = std::mem::take(&mut next);
            count = std::mem::take(&mut next_count);
            let mut result: Option<StructField> = None;

            for (st, path) in &current {
                if !visited.insert(*st) {
                    continue;
                }
                let multiplicity = count.get(st).copied().unwrap_or(0);
                for (i, field) in st.fields().iter().enumerate() {
                    if matches(&field.name) {
                        if multiplicity > 1 || result.is_some() {
                            return None;
                        }
                        let mut index = path.clone();
                        index.push(i);
                        result = Some(StructField {
                            index,
                            ..field.clone()
                        });
                        continue;
                    }
                    if result.is_some() {
                        continue;
                    }
                    let Some(inner) = embedded_struct(field) else {
                        continue;
                    };
                    if let Some(seen) = next_count.get_mut(&inner) {
                        *seen = 2;
                        continue;
                    }
                    next_count.insert(inner, if multiplicity > 1 { 2 } else { 1 });
                    let mut index = path.clone();
                    index.push(i);
                    next.push((inner, index));
                }
            }
            if result.is_some() {
                return result;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_struct(name: &str, fields: Vec<Field>) -> Type {
        Type::named("main", name, Type::struct_of(fields))
    }

    #[test]
    fn test_exported() {
        assert!(is_exported("Name"));
        assert!(!is_exported("name"));
        assert!(!is_exported("_x"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_embedded_field_name() {
        let inner = named_struct("Inner", vec![Field::new("X", Type::int())]);
        assert_eq!(Field::embedded(inner).name, "Inner");
        assert_eq!(Field::embedded(Type::pointer_to(inner)).name, "Inner");
    }

    #[test]
    fn test_promoted_field_path() {
        let inner = named_struct("Inner", vec![Field::new("a", Type::int()), Field::new("X", Type::int())]);
        let outer = Type::struct_of(vec![Field::new("n", Type::bool()), Field::embedded(Type::pointer_to(inner))]);
        let x = outer.field_by_name("X").unwrap();
        assert_eq!(x.index, vec![1, 1]);
        assert_eq!(x.offset, 8);
        assert_eq!(outer.field_by_index(&[1, 1]).name, "X");
    }

    #[test]
    fn test_ambiguous_at_same_depth() {
        let a = named_struct("A", vec![Field::new("X", Type::int())]);
        let b = named_struct("B", vec![Field::new("X", Type::int())]);
        let outer = Type::struct_of(vec![Field::embedded(a), Field::embedded(b)]);
        assert!(outer.field_by_name("X").is_none());
        assert!(outer.field_by_predicate(|n| n == "X").is_none());
    }

    #[test]
    fn test_shallower_field_wins() {
        let deep = named_struct("Deep", vec![Field::new("X", Type::string())]);
        let mid = named_struct("Mid", vec![Field::embedded(deep)]);
        let other = named_struct("Other", vec![Field::new("X", Type::int())]);
        let outer = Type::struct_of(vec![Field::embedded(mid), Field::embedded(other)]);
        let x = outer.field_by_name("X").unwrap();
        assert_eq!(x.ty, Type::int());
        assert_eq!(x.index, vec![1, 0]);
    }

    #[test]
    fn test_same_type_embedded_twice_is_ambiguous() {
        let leaf = named_struct("Leaf", vec![Field::new("V", Type::int())]);
        let left = named_struct("Left", vec![Field::embedded(leaf)]);
        let right = named_struct("Right", vec![Field::embedded(leaf)]);
        let outer = Type::struct_of(vec![Field::embedded(left), Field::embedded(right)]);
        assert!(outer.field_by_name("V").is_none());
    }

    #[test]
    fn test_predicate_first_match() {
        let t = Type::struct_of(vec![Field::new("alpha", Type::int()), Field::new("beta", Type::int())]);
        assert_eq!(t.field_by_predicate(|n| n.starts_with('b')).unwrap().name, "beta");
        assert!(t.field_by_predicate(|n| n.len() > 10).is_none());
    }
}
