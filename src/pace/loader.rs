//! Boundary to the host's module system. The pipeline only asks for what a
//! `load` or `from ... import` needs; where modules come from is up to the
//! host.

use std::fmt;

use crate::common::*;
use crate::pace::ast::Style;
use crate::pace::eval::{ForeignFn, Value};
use crate::pace::types::BType;

/// A host function offered by a module.
#[derive(Clone)]
pub struct ForeignDecl {
    pub name: String,
    pub style: Style,
    pub sig: Vec<BType>,
    pub ret: BType,
    pub func: ForeignFn,
}

impl fmt::Debug for ForeignDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sig: Vec<String> = self.sig.iter().map(|t| t.to_string()).collect();
        write!(f, "ForeignDecl({}: ({})->{}, {})", self.name, sig.join(","), self.ret, self.style)
    }
}

/// A type atom offered by a module, optionally below an existing atom.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub parent: Option<String>,
}

/// Everything a parse-time import declares.
#[derive(Debug, Clone, Default)]
pub struct SymbolImports {
    pub functions: Vec<ForeignDecl>,
    pub types: Vec<TypeDecl>,
    pub values: Vec<(String, BType)>,
}

/// Resolves module paths. An empty `names` list asks for every symbol of the
/// module. Errors are plain messages, the caller attaches the source span.
pub trait ModuleLoader: Debug {
    fn load_modules(&mut self, paths: &[String]) -> Result<(), String>;
    fn import_symbols(&mut self, path: &str, names: &[String]) -> Result<SymbolImports, String>;
    fn import_values(&mut self, path: &str, names: &[String]) -> Result<Vec<(String, Value)>, String>;
}

/// Loader for hosts without modules: every load fails.
#[derive(Debug, Default)]
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn load_modules(&mut self, paths: &[String]) -> Result<(), String> {
        match paths.first() {
            Some(path) => Err(format!("cannot load '{}': no modules are available", path)),
            None => Ok(()),
        }
    }

    fn import_symbols(&mut self, path: &str, _names: &[String]) -> Result<SymbolImports, String> {
        Err(format!("cannot import from '{}': no modules are available", path))
    }

    fn import_values(&mut self, path: &str, _names: &[String]) -> Result<Vec<(String, Value)>, String> {
        Err(format!("cannot import from '{}': no modules are available", path))
    }
}

/// A module registered by the host.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
    functions: Vec<ForeignDecl>,
    types: Vec<TypeDecl>,
    values: Vec<(String, Value)>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: &str, style: Style, sig: Vec<BType>, ret: BType, func: ForeignFn) -> Self {
        self.functions.push(ForeignDecl { name: name.to_string(), style, sig, ret, func });
        self
    }

    pub fn with_type(mut self, name: &str, parent: Option<&str>) -> Self {
        self.types.push(TypeDecl { name: name.to_string(), parent: parent.map(|p| p.to_string()) });
        self
    }

    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.values.push((name.to_string(), value));
        self
    }

    fn has_symbol(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
            || self.types.iter().any(|t| t.name == name)
            || self.values.iter().any(|(n, _)| n == name)
    }
}

/// Loader serving modules the host registered up front.
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    modules: HashMap<String, ModuleDef>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, path: &str, module: ModuleDef) -> Self {
        self.modules.insert(path.to_string(), module);
        self
    }

    fn module(&self, path: &str, names: &[String]) -> Result<&ModuleDef, String> {
        let module = self.modules.get(path).ok_or_else(|| format!("module '{}' cannot be found", path))?;
        if let Some(missing) = names.iter().find(|name| !module.has_symbol(name)) {
            return Err(format!("module '{}' has no symbol '{}'", path, missing));
        }
        Ok(module)
    }
}

fn wanted(names: &[String], name: &str) -> bool {
    names.is_empty() || names.iter().any(|n| n == name)
}

impl ModuleLoader for InMemoryLoader {
    fn load_modules(&mut self, paths: &[String]) -> Result<(), String> {
        match paths.iter().find(|path| !self.modules.contains_key(*path)) {
            Some(path) => Err(format!("module '{}' cannot be found", path)),
            None => Ok(()),
        }
    }

    fn import_symbols(&mut self, path: &str, names: &[String]) -> Result<SymbolImports, String> {
        let module = self.module(path, names)?;
        Ok(SymbolImports {
            functions: module.functions.iter().filter(|f| wanted(names, &f.name)).cloned().collect(),
            types: module.types.iter().filter(|t| wanted(names, &t.name)).cloned().collect(),
            values: module.values.iter()
                .filter(|(n, _)| wanted(names, n))
                .map(|(n, v)| (n.clone(), v.btype()))
                .collect(),
        })
    }

    fn import_values(&mut self, path: &str, names: &[String]) -> Result<Vec<(String, Value)>, String> {
        let module = self.module(path, names)?;
        Ok(module.values.iter().filter(|(n, _)| wanted(names, n)).cloned().collect())
    }
}
