//! The pipeline from a lexed token stream to a value: grouping, phrase
//! parsing against the symbol tables and execution. Everything a run
//! accumulates lives in one `CompilationUnit`.

pub mod arena;
pub mod ast;
mod ast_printer;
pub mod eval;
pub mod group;
pub mod inference;
pub mod input_source;
pub mod library;
pub mod loader;
pub mod parser;
pub mod tokens;
pub mod types;

#[cfg(test)]
mod tests;

use crate::common::*;
use crate::logging::DummyLogger;

use ast::{Heap, NodeId, TableId};
use eval::{Interpreter, Value};
use group::{GroupBuilder, Snippet};
use inference::{DynamicInference, TypeInference};
use input_source::{CoreError, InputSource};
use loader::{ModuleLoader, NoModules};
use parser::symbol_table::Symbols;
use parser::PhraseParser;
use tokens::TokenStream;
use types::TypeLattice;

/// Runtime configuration of a compilation unit.
#[derive(Debug, Clone)]
pub struct PaceOptions {
    /// Module name used when the token stream has no file name.
    pub filename: String,
    /// Maximum nesting of groups.
    pub max_depth: usize,
    /// Maximum number of nested function calls.
    pub max_call_depth: usize,
}

impl Default for PaceOptions {
    fn default() -> Self {
        Self { filename: "main".to_string(), max_depth: 128, max_call_depth: 256 }
    }
}

impl PaceOptions {
    pub fn with_filename<S: ToString>(mut self, filename: S) -> Self {
        self.filename = filename.to_string();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

/// Result of a run: the rendered node of every phrase that was parsed, the
/// value of the last phrase and the first error, if any.
#[derive(Debug, Default)]
pub struct PaceOutcome {
    pub report: Vec<String>,
    pub value: Option<Value>,
    pub error: Option<CoreError>,
    pub module: Option<TableId>,
    pub body: Vec<NodeId>,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorSummary {
    pub kind: String,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Serializable view of an outcome.
#[derive(Debug, serde::Serialize)]
pub struct PaceSummary {
    pub report: Vec<String>,
    pub value: Option<String>,
    pub error: Option<ErrorSummary>,
}

impl PaceOutcome {
    pub fn summary(&self) -> PaceSummary {
        PaceSummary {
            report: self.report.clone(),
            value: self.value.as_ref().map(|v| v.to_string()),
            error: self.error.as_ref().map(|e| ErrorSummary {
                kind: e.kind.to_string(),
                message: e.message().to_string(),
                line: e.span().begin.line,
                column: e.span().begin.column,
            }),
        }
    }

    /// Error report including the offending source lines, when the stream
    /// carried its source text.
    pub fn render_error(&self, tokens: &TokenStream) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match &tokens.source {
            Some(source) => error.render(&InputSource::new(tokens.filename.clone(), source)),
            None => error.to_string(),
        })
    }
}

/// Everything one run accumulates: nodes, symbol tables, the type lattice
/// and the host hooks.
#[derive(Debug)]
pub struct CompilationUnit {
    pub id: UnitId,
    pub options: PaceOptions,
    pub heap: Heap,
    pub symbols: Symbols,
    pub lattice: TypeLattice,
    pub(crate) inference: Box<dyn TypeInference>,
    pub(crate) loader: Box<dyn ModuleLoader>,
    pub(crate) logger: Box<dyn Logger>,
    prelude: Option<TableId>,
}

impl CompilationUnit {
    pub fn new(options: PaceOptions) -> Self {
        Self {
            id: 0,
            options,
            heap: Heap::new(),
            symbols: Symbols::new(),
            lattice: TypeLattice::new(),
            inference: Box::new(DynamicInference),
            loader: Box::new(NoModules),
            logger: Box::new(DummyLogger),
            prelude: None,
        }
    }

    pub fn with_id(mut self, id: UnitId) -> Self {
        self.id = id;
        self
    }

    pub fn with_loader<L: ModuleLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn with_inference<I: TypeInference + 'static>(mut self, inference: I) -> Self {
        self.inference = Box::new(inference);
        self
    }

    fn prelude(&mut self) -> Result<TableId, CoreError> {
        if let Some(table) = self.prelude {
            return Ok(table);
        }
        let table = library::install_prelude(&mut self.symbols)?;
        self.prelude = Some(table);
        Ok(table)
    }

    /// Creates a module table with the prelude in it.
    pub fn new_module_table(&mut self, name: &str) -> Result<TableId, CoreError> {
        let prelude = self.prelude()?;
        let table = self.symbols.new_module(name);
        self.symbols.install_functions(prelude, table)?;
        Ok(table)
    }

    pub fn group(&mut self, tokens: &TokenStream) -> Result<Snippet, CoreError> {
        GroupBuilder::new(self.options.max_depth, &mut *self.logger).build(tokens)
    }

    /// Hands every pending function to the inference hook. Functions it
    /// cannot resolve stay pending.
    pub fn infer_pending(&mut self) -> Result<(), CoreError> {
        let mut deferred = Vec::new();
        while let Some(pending) = self.symbols.pop_pending() {
            let func = self.heap.as_function(pending.func).ok_or_else(|| CoreError::internal(
                self.heap[pending.func].span, format!("pending '{}' is not a function literal", pending.name)
            ))?;
            match self.inference.infer_signature(func, &self.lattice) {
                Some((sig, ret)) => {
                    self.symbols.promote(&pending, sig, ret)?;
                    log!(self.logger, "promoted '{}' with {} argument(s)", pending.name, pending.arity);
                },
                None => deferred.push(pending),
            }
        }
        for pending in deferred {
            self.symbols.requeue(pending);
        }
        Ok(())
    }

    /// Groups, parses and runs a token stream as a new module.
    pub fn pace(&mut self, tokens: &TokenStream) -> PaceOutcome {
        let mut outcome = PaceOutcome::default();
        if let Err(error) = self.pace_into(tokens, &mut outcome) {
            log!(self.logger, "run of '{}' failed with {}", tokens.filename, error.kind);
            outcome.error = Some(error);
        }
        outcome
    }

    fn pace_into(&mut self, tokens: &TokenStream, outcome: &mut PaceOutcome) -> Result<(), CoreError> {
        let snippet = self.group(tokens)?;
        let name = if tokens.filename.is_empty() { self.options.filename.clone() } else { tokens.filename.clone() };
        let module = self.new_module_table(&name)?;
        outcome.module = Some(module);

        let parsed = PhraseParser::new(self).parse_module(&snippet, module, &mut outcome.body);
        outcome.report = outcome.body.iter().map(|id| self.heap.render(*id)).collect();
        parsed?;

        let value = Interpreter::new(self).run(&outcome.body)?;
        outcome.value = Some(value);
        Ok(())
    }
}

/// Runs a token stream with default options and no modules.
pub fn pace(tokens: &TokenStream) -> PaceOutcome {
    CompilationUnit::new(PaceOptions::default()).pace(tokens)
}
