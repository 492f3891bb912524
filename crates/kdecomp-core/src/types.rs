//! The JVM type model.
//!
//! A [`VarType`] is what descriptors and generic signatures parse into:
//! a primitive, a (possibly parameterized) class type, or a type variable,
//! with an array dimension on top. Class names are kept in internal form
//! (`java/util/Map$Entry`); [`VarType::display`] turns them into source form.

use std::collections::BTreeMap;
use std::fmt;

/// `java/lang/Object`, the universal supertype.
pub const OBJECT: &str = "java/lang/Object";

// ============================================================================
// Primitive Types
// ============================================================================

/// JVM primitive types plus `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
}

impl Primitive {
    pub fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'B' => Primitive::Byte,
            'C' => Primitive::Char,
            'D' => Primitive::Double,
            'F' => Primitive::Float,
            'I' => Primitive::Int,
            'J' => Primitive::Long,
            'S' => Primitive::Short,
            'Z' => Primitive::Boolean,
            'V' => Primitive::Void,
            _ => return None,
        })
    }

    pub fn descriptor(self) -> char {
        match self {
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Double => 'D',
            Primitive::Float => 'F',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Short => 'S',
            Primitive::Boolean => 'Z',
            Primitive::Void => 'V',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Double => "double",
            Primitive::Float => "float",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Short => "short",
            Primitive::Boolean => "boolean",
            Primitive::Void => "void",
        }
    }

    /// The literal a field of this type holds before initialization.
    pub fn default_literal(self) -> &'static str {
        match self {
            Primitive::Byte | Primitive::Short | Primitive::Int => "0",
            Primitive::Long => "0L",
            Primitive::Float => "0.0f",
            Primitive::Double => "0.0",
            Primitive::Char => "'\\u0000'",
            Primitive::Boolean => "false",
            Primitive::Void => "",
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// The element part of a type, ignoring array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(Primitive),
    /// A class type in internal form with its type arguments.
    Class { name: String, args: Vec<TypeArg> },
    /// A type variable such as `T`.
    Variable(String),
}

/// A type argument inside `<...>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    /// `*` / `?`
    Wildcard,
    Exact(VarType),
    /// `? extends T`
    Extends(VarType),
    /// `? super T`
    Super(VarType),
}

/// A JVM type: element kind plus array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarType {
    pub kind: TypeKind,
    pub array_dim: u8,
}

/// Type-variable name to type.
pub type Substitution = BTreeMap<String, VarType>;

impl VarType {
    pub fn primitive(p: Primitive) -> Self {
        VarType {
            kind: TypeKind::Primitive(p),
            array_dim: 0,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        VarType {
            kind: TypeKind::Class {
                name: name.into(),
                args: Vec::new(),
            },
            array_dim: 0,
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeArg>) -> Self {
        VarType {
            kind: TypeKind::Class {
                name: name.into(),
                args,
            },
            array_dim: 0,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        VarType {
            kind: TypeKind::Variable(name.into()),
            array_dim: 0,
        }
    }

    pub fn object() -> Self {
        VarType::class(OBJECT)
    }

    #[must_use]
    pub fn array_of(mut self, extra_dims: u8) -> Self {
        self.array_dim = self.array_dim.saturating_add(extra_dims);
        self
    }

    /// The element type of an array, or `None` for non-arrays.
    pub fn element(&self) -> Option<VarType> {
        (self.array_dim > 0).then(|| VarType {
            kind: self.kind.clone(),
            array_dim: self.array_dim - 1,
        })
    }

    pub fn is_void(&self) -> bool {
        self.array_dim == 0 && self.kind == TypeKind::Primitive(Primitive::Void)
    }

    pub fn is_object(&self) -> bool {
        self.array_dim == 0 && matches!(&self.kind, TypeKind::Class { name, .. } if name == OBJECT)
    }

    /// Internal class name when this is a non-array class type.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Class { name, .. } if self.array_dim == 0 => Some(name),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[TypeArg] {
        match &self.kind {
            TypeKind::Class { args, .. } => args,
            _ => &[],
        }
    }

    pub fn variable_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Variable(name) if self.array_dim == 0 => Some(name),
            _ => None,
        }
    }

    /// Erased JVM descriptor. Type variables erase to `Object`.
    pub fn descriptor(&self) -> String {
        let mut out = "[".repeat(self.array_dim as usize);
        match &self.kind {
            TypeKind::Primitive(p) => out.push(p.descriptor()),
            TypeKind::Class { name, .. } => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            TypeKind::Variable(_) => {
                out.push('L');
                out.push_str(OBJECT);
                out.push(';');
            }
        }
        out
    }

    /// Replace type variables throughout this type, including inside
    /// parameterized arguments. Variables without a mapping are kept.
    pub fn substitute(&self, map: &Substitution) -> VarType {
        let kind = match &self.kind {
            TypeKind::Variable(name) => match map.get(name) {
                Some(replacement) => {
                    return replacement.clone().array_of(self.array_dim);
                }
                None => self.kind.clone(),
            },
            TypeKind::Class { name, args } => TypeKind::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            TypeKind::Primitive(_) => self.kind.clone(),
        };
        VarType {
            kind,
            array_dim: self.array_dim,
        }
    }

    /// Visit every class name referenced by this type.
    pub fn for_each_class(&self, f: &mut dyn FnMut(&str)) {
        if let TypeKind::Class { name, args } = &self.kind {
            f(name);
            for arg in args {
                if let Some(inner) = arg.bound() {
                    inner.for_each_class(f);
                }
            }
        }
    }

    /// Source-form rendering using the default [`SimpleNames`] naming.
    pub fn display(&self) -> String {
        self.display_with(&SimpleNames)
    }

    /// Source-form rendering with a caller-supplied class naming policy.
    pub fn display_with(&self, names: &dyn TypeNaming) -> String {
        let mut out = match &self.kind {
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::Variable(name) => name.clone(),
            TypeKind::Class { name, args } => {
                let mut s = names.class_name(name);
                if !args.is_empty() {
                    s.push('<');
                    let rendered: Vec<String> = args.iter().map(|a| a.display_with(names)).collect();
                    s.push_str(&rendered.join(", "));
                    s.push('>');
                }
                s
            }
        };
        for _ in 0..self.array_dim {
            out.push_str("[]");
        }
        out
    }
}

impl TypeArg {
    pub fn bound(&self) -> Option<&VarType> {
        match self {
            TypeArg::Wildcard => None,
            TypeArg::Exact(t) | TypeArg::Extends(t) | TypeArg::Super(t) => Some(t),
        }
    }

    pub fn substitute(&self, map: &Substitution) -> TypeArg {
        match self {
            TypeArg::Wildcard => TypeArg::Wildcard,
            TypeArg::Exact(t) => TypeArg::Exact(t.substitute(map)),
            TypeArg::Extends(t) => TypeArg::Extends(t.substitute(map)),
            TypeArg::Super(t) => TypeArg::Super(t.substitute(map)),
        }
    }

    pub fn display_with(&self, names: &dyn TypeNaming) -> String {
        match self {
            TypeArg::Wildcard => "?".to_string(),
            TypeArg::Exact(t) => t.display_with(names),
            TypeArg::Extends(t) => format!("? extends {}", t.display_with(names)),
            TypeArg::Super(t) => format!("? super {}", t.display_with(names)),
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

// ============================================================================
// Naming
// ============================================================================

/// How class names appear in emitted text.
pub trait TypeNaming {
    fn class_name(&self, internal: &str) -> String;
}

/// Last path segment with `$` turned into `.` (`java/util/Map$Entry` → `Map.Entry`).
pub struct SimpleNames;

impl TypeNaming for SimpleNames {
    fn class_name(&self, internal: &str) -> String {
        simple_name(internal).replace('$', ".")
    }
}

/// Fully qualified dotted names (`java/util/Map$Entry` → `java.util.Map.Entry`).
pub struct QualifiedNames;

impl TypeNaming for QualifiedNames {
    fn class_name(&self, internal: &str) -> String {
        internal.replace(['/', '$'], ".")
    }
}

/// Last `/`-separated segment of an internal name.
pub fn simple_name(internal: &str) -> &str {
    internal.rsplit('/').next().unwrap_or(internal)
}

/// Package part of an internal name, empty for the default package.
pub fn package_name(internal: &str) -> &str {
    internal.rfind('/').map_or("", |i| &internal[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(arg: VarType) -> VarType {
        VarType::generic("java/util/List", vec![TypeArg::Exact(arg)])
    }

    #[test]
    fn display_uses_simple_names() {
        let t = VarType::generic(
            "java/util/Map",
            vec![
                TypeArg::Exact(VarType::class("java/lang/String")),
                TypeArg::Extends(VarType::variable("T")),
            ],
        );
        assert_eq!(t.display(), "Map<String, ? extends T>");
        assert_eq!(VarType::class("java/util/Map$Entry").display(), "Map.Entry");
        assert_eq!(
            VarType::primitive(Primitive::Int).array_of(2).display(),
            "int[][]"
        );
    }

    #[test]
    fn descriptor_erases_variables() {
        assert_eq!(VarType::variable("T").descriptor(), "Ljava/lang/Object;");
        assert_eq!(list_of(VarType::variable("T")).descriptor(), "Ljava/util/List;");
        assert_eq!(
            VarType::primitive(Primitive::Long).array_of(1).descriptor(),
            "[J"
        );
    }

    #[test]
    fn substitution_is_deep() {
        let mut map = Substitution::new();
        map.insert("T".to_string(), VarType::class("java/lang/String"));
        let t = list_of(VarType::variable("T"));
        assert_eq!(t.substitute(&map), list_of(VarType::class("java/lang/String")));
        let arr = VarType::variable("T").array_of(1).substitute(&map);
        assert_eq!(arr.display(), "String[]");
        let untouched = VarType::variable("U").substitute(&map);
        assert_eq!(untouched, VarType::variable("U"));
    }

    #[test]
    fn name_helpers() {
        assert_eq!(simple_name("a/b/C$D"), "C$D");
        assert_eq!(package_name("a/b/C"), "a/b");
        assert_eq!(package_name("C"), "");
        assert_eq!(QualifiedNames.class_name("a/b/C$D"), "a.b.C.D");
    }

    #[test]
    fn element_of_array() {
        let t = VarType::class("java/lang/String").array_of(1);
        assert_eq!(t.element(), Some(VarType::class("java/lang/String")));
        assert_eq!(VarType::object().element(), None);
        assert!(VarType::object().is_object());
    }
}
