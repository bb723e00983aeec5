//! Scope metadata for every name the parser sees.
//!
//! Tables form a tree: the global and contextual tables stand alone, every
//! module gets its own table and every function or block literal gets a child
//! table of the table it was written in. A block is lexically transparent:
//! only its parameters live in its own table, every other local name it binds
//! or reads belongs to the first enclosing non-block table.
//!
//! Values and functions are kept apart. Functions are looked up by walking the
//! lexical chain outwards up to the module, values are looked up in the single
//! table their scope sigil selects. Every function name also has one calling
//! style for the whole unit, kept in a registry so that a name cannot be used
//! as a binary operator in one place and a unary one in another.
//!
//! User functions whose signature is not fully known yet cannot join an
//! overload. They are queued as pending and promoted once inference has
//! filled in their types.

use std::ops::{Index, IndexMut};

use crate::collections::{DequeSet, VecSet};
use crate::common::*;
use crate::pace::arena::Arena;
use crate::pace::ast::{NodeId, Style, TableId};
use crate::pace::input_source::{CoreError, ErrorKind, SrcSpan};
use crate::pace::tokens::Scope;
use crate::pace::types::BType;

use super::overload::{Family, FnImpl, Implementation, Overload, PendingOverload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Global,
    Context,
    Module,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct ValueMeta {
    pub btype: BType,
    pub span: SrcSpan,
    pub is_param: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub style: Style,
    pub span: SrcSpan,
    /// Set for a parameter that is called inside the body.
    pub is_param: bool,
    pub overloads: BTreeMap<usize, Overload>,
}

#[derive(Debug)]
pub struct SymbolTable {
    pub this: TableId,
    pub kind: TableKind,
    /// Module name for module tables, the bound name for function tables
    /// (empty for anonymous ones). Used in stack traces.
    pub name: String,
    pub lexical_parent: Option<TableId>,
    /// Owning module table. `None` for the global and contextual tables.
    pub module: Option<TableId>,
    /// True for function and block bodies without a declared parameter list,
    /// single letter names read there become implicit parameters.
    pub catches_implicit: bool,
    pub implicit_params: VecSet<String>,
    values: HashMap<String, ValueMeta>,
    functions: HashMap<String, FunctionMeta>,
    types: HashMap<String, BType>,
}

impl SymbolTable {
    fn new(this: TableId, kind: TableKind, name: &str, lexical_parent: Option<TableId>, module: Option<TableId>) -> Self {
        Self {
            this,
            kind,
            name: name.to_string(),
            lexical_parent,
            module,
            catches_implicit: false,
            implicit_params: VecSet::new(),
            values: HashMap::new(),
            functions: HashMap::new(),
            types: HashMap::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&ValueMeta> {
        self.values.get(name)
    }
}

/// Every symbol table of a compilation unit plus the unit wide registries.
#[derive(Debug)]
pub struct Symbols {
    tables: Arena<SymbolTable>,
    pub global: TableId,
    pub context: TableId,
    styles: HashMap<String, Style>,
    pending: DequeSet<PendingOverload>,
}

impl Index<TableId> for Symbols {
    type Output = SymbolTable;
    fn index(&self, index: TableId) -> &Self::Output {
        &self.tables[index]
    }
}

impl IndexMut<TableId> for Symbols {
    fn index_mut(&mut self, index: TableId) -> &mut Self::Output {
        &mut self.tables[index]
    }
}

impl Symbols {
    pub fn new() -> Self {
        let mut tables = Arena::new();
        let global = tables.alloc_with_id(|id| SymbolTable::new(id, TableKind::Global, "__global", None, None));
        let context = tables.alloc_with_id(|id| SymbolTable::new(id, TableKind::Context, "_context", None, None));
        Self { tables, global, context, styles: HashMap::new(), pending: DequeSet::new() }
    }

    pub fn new_module(&mut self, name: &str) -> TableId {
        self.tables.alloc_with_id(|id| SymbolTable::new(id, TableKind::Module, name, None, Some(id)))
    }

    /// Creates the table of a function or block body written in `parent`.
    pub fn new_child(&mut self, parent: TableId, kind: TableKind, catches_implicit: bool) -> TableId {
        debug_assert!(kind == TableKind::Function || kind == TableKind::Block);
        let module = self.tables[parent].module;
        let id = self.tables.alloc_with_id(|id| SymbolTable::new(id, kind, "", Some(parent), module));
        self.tables[id].catches_implicit = catches_implicit;
        id
    }

    pub fn module_of(&self, table: TableId) -> Option<TableId> {
        self.tables[table].module
    }

    /// First table from `table` outwards that is not a block.
    pub fn enclosing_non_block(&self, table: TableId) -> TableId {
        let mut current = table;
        while self.tables[current].kind == TableKind::Block {
            match self.tables[current].lexical_parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Table that owns a local value `name` as seen from `table`. Blocks only
    /// own their parameters.
    fn local_home(&self, table: TableId, name: &str) -> TableId {
        let mut current = table;
        loop {
            let t = &self.tables[current];
            if t.kind != TableKind::Block || t.values.get(name).map(|v| v.is_param).unwrap_or(false) {
                return current;
            }
            match t.lexical_parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Table a scope sigil selects, as seen from `table`.
    pub fn scope_table(&self, table: TableId, scope: Scope) -> Option<TableId> {
        match scope {
            Scope::Local => Some(table),
            Scope::Parent => self.tables[self.enclosing_non_block(table)].lexical_parent,
            Scope::Module => self.tables[table].module,
            Scope::Context => Some(self.context),
            Scope::Global => Some(self.global),
        }
    }

    /// Resolves a value read. Returns the owning table.
    pub fn value_meta_for_get(&self, table: TableId, name: &str, scope: Scope) -> Option<(TableId, &ValueMeta)> {
        let base = self.scope_table(table, scope)?;
        let home = match scope {
            Scope::Local | Scope::Parent => self.local_home(base, name),
            _ => base,
        };
        self.tables[home].values.get(name).map(|meta| (home, meta))
    }

    /// Tables a function read searches: the lexical chain outwards from
    /// `table`, then the contextual table.
    fn function_chain(&self, table: TableId) -> impl Iterator<Item = TableId> + '_ {
        let context = self.context;
        std::iter::successors(Some(table), move |id| self.tables[*id].lexical_parent)
            .chain(std::iter::once(context).filter(move |_| table != context))
    }

    /// Resolves a function name along the lexical chain, falling back to
    /// contextual functions.
    pub fn function_meta_for_get(&self, table: TableId, name: &str) -> Option<(TableId, &FunctionMeta)> {
        self.function_chain(table)
            .find_map(|id| self.tables[id].functions.get(name).map(|meta| (id, meta)))
    }

    /// Resolves a function bound with the contextual sigil.
    pub fn context_function_meta(&self, name: &str) -> Option<(TableId, &FunctionMeta)> {
        self.tables[self.context].functions.get(name).map(|meta| (self.context, meta))
    }

    /// Table a binding with the given scope lands in, or an error for scopes
    /// that cannot be written from here.
    fn binding_home(&self, table: TableId, name: &str, scope: Scope, span: SrcSpan) -> Result<TableId, CoreError> {
        match scope {
            Scope::Local => Ok(self.local_home(table, name)),
            Scope::Context => Ok(self.context),
            Scope::Global => Ok(self.global),
            Scope::Parent | Scope::Module => Err(CoreError::new(
                ErrorKind::ScopeAccess, span,
                format!("cannot bind '{}{}': the {} scope is read-only from here",
                    scope.sigil(), name, if scope == Scope::Parent { "parent" } else { "module" })
            )),
        }
    }

    /// Declares (or re-declares) a value. A contextual or global value whose
    /// type is still to be inferred is declared as `any`.
    pub fn def_value_meta(
        &mut self, table: TableId, name: &str, btype: BType, scope: Scope, span: SrcSpan
    ) -> Result<TableId, CoreError> {
        let home = self.binding_home(table, name, scope, span)?;
        let btype = match scope {
            Scope::Context | Scope::Global => btype.or_any(),
            _ => btype,
        };

        let target = &mut self.tables[home];
        if let Some(function) = target.functions.get(name) {
            return Err(CoreError::new(
                ErrorKind::ScopeAccess, span,
                format!("'{}' is bound to a function in this scope, it cannot be rebound to a value", name)
            ).with_info(function.span, "the function was bound here"));
        }

        match target.values.get_mut(name) {
            Some(existing) => {
                if types_conflict(&existing.btype, &btype) {
                    return Err(CoreError::new(
                        ErrorKind::IncompatibleTypes, span,
                        format!("'{}' was declared as {}, it cannot be redeclared as {}", name, existing.btype, btype)
                    ).with_info(existing.span, "the earlier declaration is here"));
                }
                if !existing.btype.is_known() && btype.is_known() {
                    existing.btype = btype;
                }
            },
            None => {
                target.values.insert(name.to_string(), ValueMeta { btype, span, is_param: false });
            },
        }
        Ok(home)
    }

    /// Declares a function name in the table selected by `scope`. Rebinding
    /// an existing function name with the same style is allowed and adds
    /// overloads to it.
    pub fn def_function_meta(
        &mut self, table: TableId, name: &str, style: Style, scope: Scope, span: SrcSpan
    ) -> Result<TableId, CoreError> {
        if scope == Scope::Global {
            return Err(CoreError::new(
                ErrorKind::ScopeAccess, span,
                format!("cannot bind function '__{}': functions cannot live in the global scope", name)
            ));
        }
        let home = self.binding_home(table, name, scope, span)?;
        self.register_style(name, style, span)?;

        let target = &mut self.tables[home];
        if let Some(value) = target.values.get(name) {
            return Err(CoreError::new(
                ErrorKind::ScopeAccess, span,
                format!("'{}' is bound to a value in this scope, it cannot be rebound to a function", name)
            ).with_info(value.span, "the value was bound here"));
        }
        target.functions.entry(name.to_string()).or_insert_with(|| FunctionMeta {
            style,
            span,
            is_param: false,
            overloads: BTreeMap::new(),
        });
        Ok(home)
    }

    /// Declares a named type in the table of `table`.
    pub fn def_type_meta(&mut self, table: TableId, name: &str, btype: BType, span: SrcSpan) -> Result<(), CoreError> {
        let target = &mut self.tables[table];
        match target.types.get(name) {
            Some(existing) if existing != &btype => Err(CoreError::new(
                ErrorKind::IncompatibleTypes, span,
                format!("type '{}' is already defined as {}", name, existing)
            )),
            _ => {
                target.types.insert(name.to_string(), btype);
                Ok(())
            },
        }
    }

    fn register_style(&mut self, name: &str, style: Style, span: SrcSpan) -> Result<(), CoreError> {
        match self.styles.get(name) {
            Some(existing) if *existing != style => Err(CoreError::new(
                ErrorKind::ScopeAccess, span,
                format!("'{}' is used as a {} function elsewhere, it cannot be bound as {}", name, existing, style)
            )),
            Some(_) => Ok(()),
            None => {
                self.styles.insert(name.to_string(), style);
                Ok(())
            },
        }
    }

    /// Registers a parameter of a function or block body.
    pub fn def_param(&mut self, table: TableId, name: &str, btype: BType, span: SrcSpan) -> Result<(), CoreError> {
        let target = &mut self.tables[table];
        if let Some(existing) = target.values.get(name) {
            return Err(CoreError::new(
                ErrorKind::ScopeAccess, span, format!("parameter '{}' is declared twice", name)
            ).with_info(existing.span, "the first declaration is here"));
        }
        target.values.insert(name.to_string(), ValueMeta { btype, span, is_param: true });
        Ok(())
    }

    /// Records a single letter name read in a body without declared
    /// parameters. Returns false if it was already known.
    pub fn def_implicit_param(&mut self, table: TableId, name: &str, span: SrcSpan) -> bool {
        let target = &mut self.tables[table];
        if !target.implicit_params.push(name.to_string()) {
            return false;
        }
        target.values.insert(name.to_string(), ValueMeta { btype: BType::Tbi, span, is_param: true });
        true
    }

    /// A parameter that turns out to be called is moved from the values to
    /// the functions of its table.
    pub fn promote_param_to_function(&mut self, table: TableId, name: &str) {
        let target = &mut self.tables[table];
        if let Some(meta) = target.values.remove(name) {
            target.functions.insert(name.to_string(), FunctionMeta {
                style: Style::Nullary,
                span: meta.span,
                is_param: true,
                overloads: BTreeMap::new(),
            });
        }
    }

    /// Adds an implementation to the function `name` of `home`. User
    /// functions whose signature is not fully known are queued instead.
    pub fn bind_function(&mut self, home: TableId, name: &str, implementation: Implementation, span: SrcSpan) -> Result<(), CoreError> {
        let arity = implementation.sig.len();
        let fully_known = implementation.sig.iter().all(|t| t.is_known()) && implementation.ret.is_known();
        if !fully_known {
            if let FnImpl::User(func) = implementation.target {
                self.pending.push_back(PendingOverload { table: home, name: name.to_string(), arity, func });
                return Ok(());
            }
            return Err(CoreError::internal(span, format!("foreign function '{}' has an unresolved signature", name)));
        }

        let meta = self.tables[home].functions.get_mut(name)
            .ok_or_else(|| CoreError::internal(span, format!("binding implementation of undeclared function '{}'", name)))?;
        meta.overloads.entry(arity)
            .or_insert_with(|| Overload::new(name, arity))
            .insert(implementation);
        Ok(())
    }

    /// Moves a pending user function into its overload with its now known
    /// signature.
    pub fn promote(&mut self, pending: &PendingOverload, sig: Vec<BType>, ret: BType) -> Result<(), CoreError> {
        let meta = self.tables[pending.table].functions.get_mut(&pending.name)
            .ok_or_else(|| CoreError::internal(
                SrcSpan::default(), format!("promoting undeclared function '{}'", pending.name)
            ))?;
        meta.overloads.entry(pending.arity)
            .or_insert_with(|| Overload::new(&pending.name, pending.arity))
            .insert(Implementation { sig, ret, target: FnImpl::User(pending.func) });
        Ok(())
    }

    pub fn pop_pending(&mut self) -> Option<PendingOverload> {
        self.pending.pop_front()
    }

    /// Puts back a pending function that could not be resolved yet.
    pub fn requeue(&mut self, pending: PendingOverload) {
        self.pending.push_back(pending);
    }

    pub fn is_pending(&self, name: &str, arity: usize) -> bool {
        self.pending.any(|p| p.name == name && p.arity == arity)
    }

    /// Nearest table along the function chain with implementations for
    /// `name` at `arity`.
    pub fn find_overload(&self, table: TableId, name: &str, arity: usize) -> Option<&Overload> {
        self.function_chain(table).find_map(|id| {
            self.tables[id].functions.get(name)
                .and_then(|meta| meta.overloads.get(&arity))
                .filter(|overload| !overload.is_empty())
        })
    }

    /// Gathers every visible arity of `name` into one family. Inner tables
    /// shadow outer ones per arity.
    pub fn family(&self, table: TableId, name: &str) -> Option<Family> {
        let mut overloads = BTreeMap::new();
        for id in self.function_chain(table) {
            if let Some(meta) = self.tables[id].functions.get(name) {
                for (arity, overload) in meta.overloads.iter() {
                    if !overload.is_empty() && !overloads.contains_key(arity) {
                        overloads.insert(*arity, overload.clone());
                    }
                }
            }
        }
        if overloads.is_empty() {
            None
        } else {
            Some(Family { name: name.to_string(), scope: table, overloads })
        }
    }

    /// Copies every function of `source` into `target`. Used to put the
    /// prelude in front of each module.
    pub fn install_functions(&mut self, source: TableId, target: TableId) -> Result<(), CoreError> {
        let functions: Vec<(String, FunctionMeta)> = self.tables[source].functions.iter()
            .map(|(name, meta)| (name.clone(), meta.clone()))
            .collect();
        for (name, meta) in functions {
            self.register_style(&name, meta.style, meta.span)?;
            self.tables[target].functions.insert(name, meta);
        }
        Ok(())
    }
}

/// Two declared types conflict when both are fully known, neither is `any`
/// and they differ.
fn types_conflict(existing: &BType, new: &BType) -> bool {
    existing.is_known() && new.is_known()
        && *existing != BType::Any && *new != BType::Any
        && existing != new
}
