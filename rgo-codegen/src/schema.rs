// Package type information read from the external loader's JSON output.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{GenerateError, GenerateResult};
use crate::types::{BasicKind, Field, Function, Named, Package, Param, Type, TypeTable};

#[derive(Debug, Deserialize)]
pub struct Input {
    pub packages: Vec<PackageDecl>,
}

#[derive(Debug, Deserialize)]
pub struct PackageDecl {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub funcs: Vec<FuncDecl>,
}

/// A defined type. `path` defaults to the declaring package.
#[derive(Debug, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    pub underlying: TypeExpr,
}

#[derive(Debug, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    #[serde(default)]
    pub recv: Option<String>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub results: Vec<ParamDecl>,
}

#[derive(Debug, Deserialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeExpr {
    Basic {
        name: String,
    },
    Pointer {
        elem: Box<TypeExpr>,
    },
    Array {
        elem: Box<TypeExpr>,
        len: u64,
    },
    Slice {
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        elem: Box<TypeExpr>,
    },
    Struct {
        #[serde(default)]
        fields: Vec<FieldDecl>,
    },
    Named {
        name: String,
        #[serde(default)]
        path: Option<String>,
    },
    Error,
    Chan {
        elem: Box<TypeExpr>,
    },
    Func {
        #[serde(default)]
        params: Vec<TypeExpr>,
        #[serde(default)]
        results: Vec<TypeExpr>,
    },
    Interface {
        #[serde(default)]
        name: Option<String>,
    },
}

impl TypeExpr {
    /// Resolve to a type descriptor. Unqualified named types belong to
    /// `pkg_path`; struct tags are parsed here, once.
    pub fn to_type(&self, pkg_path: &str) -> GenerateResult<Type> {
        let conv = |e: &TypeExpr| e.to_type(pkg_path);
        let ty = match self {
            TypeExpr::Basic { name } => Type::Basic(
                BasicKind::from_name(name)
                    .ok_or_else(|| GenerateError::Package(format!("unknown basic type {name}")))?,
            ),
            TypeExpr::Pointer { elem } => Type::pointer(conv(elem)?),
            TypeExpr::Array { elem, len } => Type::array(conv(elem)?, *len),
            TypeExpr::Slice { elem } => Type::slice(conv(elem)?),
            TypeExpr::Map { key, elem } => Type::map(conv(key)?, conv(elem)?),
            TypeExpr::Struct { fields } => Type::Struct(
                fields
                    .iter()
                    .map(|f| Ok(Field::tagged(f.name.clone(), conv(&f.ty)?, f.tag.clone())))
                    .collect::<GenerateResult<_>>()?,
            ),
            TypeExpr::Named { name, path } => {
                Type::named(path.as_deref().unwrap_or(pkg_path), name.clone())
            }
            TypeExpr::Error => Type::Error,
            TypeExpr::Chan { elem } => Type::Chan(Box::new(conv(elem)?)),
            TypeExpr::Func { params, results } => Type::Func {
                params: params.iter().map(conv).collect::<GenerateResult<_>>()?,
                results: results.iter().map(conv).collect::<GenerateResult<_>>()?,
            },
            TypeExpr::Interface { name } => Type::Interface(name.clone()),
        };
        Ok(ty)
    }
}

impl PackageDecl {
    pub fn into_package(self) -> GenerateResult<Package> {
        let mut types = TypeTable::new();
        for decl in &self.types {
            let named = Named::new(decl.path.as_deref().unwrap_or(&self.path), decl.name.clone());
            types.insert(&named, decl.underlying.to_type(&self.path)?);
        }
        let params = |decls: &[ParamDecl]| -> GenerateResult<Vec<Param>> {
            decls
                .iter()
                .map(|p| Ok(Param { name: p.name.clone(), ty: p.ty.to_type(&self.path)? }))
                .collect()
        };
        let funcs = self
            .funcs
            .iter()
            .map(|f| {
                Ok(Function {
                    name: f.name.clone(),
                    params: params(&f.params)?,
                    results: params(&f.results)?,
                    variadic: f.variadic,
                    recv: f.recv.clone(),
                })
            })
            .collect::<GenerateResult<Vec<_>>>()?;
        Ok(Package { path: self.path, name: self.name, types, funcs })
    }
}

/// Parse loader output and select the package at `pkg_path`.
pub fn parse_package(json: &str, source: &Path, pkg_path: &str) -> GenerateResult<Package> {
    if pkg_path.ends_with("...") {
        return Err(GenerateError::Package("invalid use of ... suffix".into()));
    }
    let input: Input = serde_json::from_str(json)
        .map_err(|source_err| GenerateError::Parse { path: source.to_path_buf(), source: source_err })?;
    let mut found: Vec<PackageDecl> =
        input.packages.into_iter().filter(|p| p.path == pkg_path).collect();
    match found.len() {
        0 => Err(GenerateError::Package("no package analysed".into())),
        1 => found.remove(0).into_package(),
        _ => Err(GenerateError::Package("more than one package analysed".into())),
    }
}

/// Read loader output from `path` and select the package at `pkg_path`.
pub fn load_package(path: &Path, pkg_path: &str) -> GenerateResult<Package> {
    let json = fs::read_to_string(path)
        .map_err(|source| GenerateError::Read { path: path.to_path_buf(), source })?;
    parse_package(&json, path, pkg_path)
}
