// Go type descriptors for the wrapped package.
//
// Types are compared structurally: two descriptors are the same type when
// their shapes are equal. Named types refer to their underlying type through
// the package's `TypeTable`, which lets recursive definitions be expressed
// without infinite descriptors.

use std::collections::HashMap;
use std::fmt::{self, Write};

// ---------------------------------------------------------------------------
// Basic kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    /// Alias of uint8.
    Byte,
    /// Alias of int32.
    Rune,
}

const BASIC_NAMES: &[(BasicKind, &str)] = &[
    (BasicKind::Bool, "bool"),
    (BasicKind::Int, "int"),
    (BasicKind::Int8, "int8"),
    (BasicKind::Int16, "int16"),
    (BasicKind::Int32, "int32"),
    (BasicKind::Int64, "int64"),
    (BasicKind::Uint, "uint"),
    (BasicKind::Uint8, "uint8"),
    (BasicKind::Uint16, "uint16"),
    (BasicKind::Uint32, "uint32"),
    (BasicKind::Uint64, "uint64"),
    (BasicKind::Uintptr, "uintptr"),
    (BasicKind::Float32, "float32"),
    (BasicKind::Float64, "float64"),
    (BasicKind::Complex64, "complex64"),
    (BasicKind::Complex128, "complex128"),
    (BasicKind::String, "string"),
    (BasicKind::Byte, "byte"),
    (BasicKind::Rune, "rune"),
];

impl BasicKind {
    pub fn from_name(name: &str) -> Option<Self> {
        BASIC_NAMES.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
    }

    /// Go spelling of the kind.
    pub fn name(self) -> &'static str {
        BASIC_NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("invalid")
    }

    /// Canonical representative: `byte` is `uint8` and `rune` is `int32`.
    pub fn normalize(self) -> Self {
        match self {
            BasicKind::Byte => BasicKind::Uint8,
            BasicKind::Rune => BasicKind::Int32,
            k => k,
        }
    }

    /// 64-bit and pointer-sized integers have no R representation.
    pub fn is_unsupported_integer(self) -> bool {
        matches!(self, BasicKind::Int64 | BasicKind::Uint64 | BasicKind::Uintptr)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self.normalize(),
            BasicKind::Uint | BasicKind::Uint8 | BasicKind::Uint16 | BasicKind::Uint32
        )
    }
}

// ---------------------------------------------------------------------------
// Type descriptors
// ---------------------------------------------------------------------------

/// A reference to a defined type, identified by package path and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Named {
    pub path: String,
    pub name: String,
}

impl Named {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Named { path: path.into(), name: name.into() }
    }

    /// Fully qualified name, "path.Name".
    pub fn qualified(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.path, self.name)
        }
    }

    /// Identifier the generated file uses for this type's package.
    pub fn package_name(&self) -> String {
        package_ident(&self.path)
    }
}

/// A Go identifier for the package at `path`, used as its import alias.
///
/// A trailing major version element (`/v2`) is skipped, the element is cut at
/// its first dot (`yaml.v2`) and other characters that cannot appear in an
/// identifier become underscores.
pub fn package_ident(path: &str) -> String {
    let mut elems = path.rsplit('/');
    let mut last = elems.next().unwrap_or(path);
    let is_major = |e: &str| {
        e.len() > 1 && e.starts_with('v') && e[1..].bytes().all(|b| b.is_ascii_digit())
    };
    if is_major(last) {
        if let Some(prev) = elems.next() {
            last = prev;
        }
    }
    let base = last.split('.').next().unwrap_or(last);
    let mut ident: String =
        base.chars().map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// A struct field. `external` is the name used on the R side, taken from the
/// `rgo` key of the field's struct tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub tag: String,
    pub external: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field { name: name.into(), ty, tag: String::new(), external: None }
    }

    /// Field with a raw Go struct tag; the external name is parsed from it.
    pub fn tagged(name: impl Into<String>, ty: Type, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let external = tag_lookup(&tag, "rgo").filter(|s| !s.is_empty());
        Field { name: name.into(), ty, tag, external }
    }

    /// Name of the list element holding this field on the R side.
    pub fn target_name(&self) -> &str {
        self.external.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    Pointer(Box<Type>),
    Array { elem: Box<Type>, len: u64 },
    Slice(Box<Type>),
    Map { key: Box<Type>, elem: Box<Type> },
    Struct(Vec<Field>),
    Named(Named),
    /// The predeclared error interface.
    Error,
    /// A parameter or result list. A traversal root, never registered.
    Tuple(Vec<Type>),
    Chan(Box<Type>),
    Func { params: Vec<Type>, results: Vec<Type> },
    /// Any interface other than error.
    Interface(Option<String>),
}

impl Type {
    pub fn basic(kind: BasicKind) -> Self {
        Type::Basic(kind)
    }

    pub fn string() -> Self {
        Type::Basic(BasicKind::String)
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn slice(elem: Type) -> Self {
        Type::Slice(Box::new(elem))
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Type::Array { elem: Box::new(elem), len }
    }

    pub fn map(key: Type, elem: Type) -> Self {
        Type::Map { key: Box::new(key), elem: Box::new(elem) }
    }

    pub fn named(path: impl Into<String>, name: impl Into<String>) -> Self {
        Type::Named(Named::new(path, name))
    }

    /// Rewrite aliased basic kinds to their canonical kind. Named types are
    /// left untouched; their identity is their name.
    pub fn normalize(&self) -> Type {
        match self {
            Type::Basic(k) => Type::Basic(k.normalize()),
            Type::Pointer(e) => Type::pointer(e.normalize()),
            Type::Array { elem, len } => Type::array(elem.normalize(), *len),
            Type::Slice(e) => Type::slice(e.normalize()),
            Type::Map { key, elem } => Type::map(key.normalize(), elem.normalize()),
            Type::Struct(fields) => Type::Struct(
                fields
                    .iter()
                    .map(|f| Field { ty: f.ty.normalize(), ..f.clone() })
                    .collect(),
            ),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(Type::normalize).collect()),
            Type::Named(_)
            | Type::Error
            | Type::Chan(_)
            | Type::Func { .. }
            | Type::Interface(_) => self.clone(),
        }
    }

    /// Whether a value of this type can be nil.
    pub fn can_be_nil(&self, table: &TypeTable) -> bool {
        matches!(
            table.underlying(self),
            Some(Type::Map { .. } | Type::Pointer(_) | Type::Slice(_) | Type::Error)
        )
    }

    /// Go type syntax qualified by package name, as written in generated
    /// source that imports the package.
    pub fn go_name(&self) -> String {
        let mut s = String::new();
        self.render(&mut s, Qualifier::PackageName(None));
        s
    }

    /// Like `go_name`, but types declared in the package at `path` are
    /// qualified by `name`, which need not match the last path element.
    pub fn go_name_in(&self, path: &str, name: &str) -> String {
        let mut s = String::new();
        self.render(&mut s, Qualifier::PackageName(Some((path, name))));
        s
    }

    fn render(&self, out: &mut String, q: Qualifier<'_>) {
        match self {
            Type::Basic(k) => out.push_str(k.name()),
            Type::Pointer(e) => {
                out.push('*');
                e.render(out, q);
            }
            Type::Array { elem, len } => {
                let _ = write!(out, "[{len}]");
                elem.render(out, q);
            }
            Type::Slice(e) => {
                out.push_str("[]");
                e.render(out, q);
            }
            Type::Map { key, elem } => {
                out.push_str("map[");
                key.render(out, q);
                out.push(']');
                elem.render(out, q);
            }
            Type::Struct(fields) => {
                out.push_str("struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    out.push_str(&f.name);
                    out.push(' ');
                    f.ty.render(out, q);
                    if !f.tag.is_empty() {
                        out.push(' ');
                        out.push_str(&quote(&f.tag));
                    }
                }
                out.push('}');
            }
            Type::Named(n) => match q {
                Qualifier::Path => out.push_str(&n.qualified()),
                Qualifier::PackageName(local) => {
                    if !n.path.is_empty() {
                        match local {
                            Some((path, name)) if n.path == path => out.push_str(name),
                            _ => out.push_str(&n.package_name()),
                        }
                        out.push('.');
                    }
                    out.push_str(&n.name);
                }
            },
            Type::Error => out.push_str("error"),
            Type::Tuple(elems) => {
                out.push('(');
                render_list(out, elems, q);
                out.push(')');
            }
            Type::Chan(e) => {
                out.push_str("chan ");
                e.render(out, q);
            }
            Type::Func { params, results } => {
                out.push_str("func(");
                render_list(out, params, q);
                out.push(')');
                match results.len() {
                    0 => {}
                    1 => {
                        out.push(' ');
                        results[0].render(out, q);
                    }
                    _ => {
                        out.push_str(" (");
                        render_list(out, results, q);
                        out.push(')');
                    }
                }
            }
            Type::Interface(Some(name)) => out.push_str(name),
            Type::Interface(None) => out.push_str("interface{}"),
        }
    }
}

#[derive(Clone, Copy)]
enum Qualifier<'a> {
    Path,
    /// Package name qualification, with an optional (path, name) override.
    PackageName(Option<(&'a str, &'a str)>),
}

fn render_list(out: &mut String, elems: &[Type], q: Qualifier<'_>) {
    for (i, e) in elems.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        e.render(out, q);
    }
}

/// Full Go type syntax with package paths, used for diagnostics and mangling.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.render(&mut s, Qualifier::Path);
        f.write_str(&s)
    }
}

/// Go interpreted string literal for `s`. Control and non-printing
/// characters use Go's `\x`, `\u` and `\U` escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}') => {
                if (c as u32) <= 0xffff {
                    let _ = write!(out, "\\u{:04x}", c as u32);
                } else {
                    let _ = write!(out, "\\U{:08x}", c as u32);
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Look up `key` in a conventional Go struct tag (`key:"value" other:"x"`).
pub fn tag_lookup(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag.trim_start();
    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let name = &rest[..colon];
        if name.is_empty() || name.contains(|c: char| c == ' ' || c == '"') {
            return None;
        }
        let value = rest[colon + 1..].strip_prefix('"')?;
        let mut escaped = false;
        let mut end = None;
        for (i, c) in value.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    end = Some(i);
                    break;
                }
                _ => escaped = false,
            }
        }
        let end = end?;
        if name == key {
            return Some(value[..end].replace("\\\"", "\"").replace("\\\\", "\\"));
        }
        rest = value[end + 1..].trim_start();
    }
    None
}

// ---------------------------------------------------------------------------
// Type table
// ---------------------------------------------------------------------------

/// Underlying types of the named types reachable from a package, keyed by
/// qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<String, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, named: &Named, underlying: Type) {
        self.types.insert(named.qualified(), underlying);
    }

    pub fn contains(&self, named: &Named) -> bool {
        self.types.contains_key(&named.qualified())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Underlying type of `ty`: named types are resolved through the table,
    /// any other type is its own underlying type. `None` for an unknown or
    /// cyclic chain of named types.
    pub fn underlying<'a>(&'a self, ty: &'a Type) -> Option<&'a Type> {
        let mut cur = ty;
        for _ in 0..=self.types.len() {
            match cur {
                Type::Named(n) => cur = self.types.get(&n.qualified())?,
                other => return Some(other),
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Functions and packages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub variadic: bool,
    /// Receiver type of a method.
    pub recv: Option<String>,
}

impl Function {
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn is_method(&self) -> bool {
        self.recv.is_some()
    }

    pub fn param_tuple(&self) -> Type {
        Type::Tuple(self.params.iter().map(|p| p.ty.clone()).collect())
    }

    pub fn result_tuple(&self) -> Type {
        Type::Tuple(self.results.iter().map(|p| p.ty.clone()).collect())
    }

    /// Parameter names usable as identifiers in generated shims. Blank and
    /// missing names are replaced by their position.
    pub fn arg_names(&self) -> Vec<String> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| match p.name.as_str() {
                "" | "_" => format!("p{i}"),
                name => name.to_string(),
            })
            .collect()
    }
}

/// A loaded Go package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub types: TypeTable,
    pub funcs: Vec<Function>,
}
