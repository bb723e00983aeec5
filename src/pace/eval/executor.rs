use crate::common::*;
use crate::pace::ast::*;
use crate::pace::input_source::{CoreError, ErrorKind, SrcSpan};
use crate::pace::loader::ModuleLoader;
use crate::pace::parser::overload::{describe, FnImpl, Implementation, Overload, Selection};
use crate::pace::parser::symbol_table::Symbols;
use crate::pace::parser::RETURN_VARIABLE;
use crate::pace::tokens::Scope;
use crate::pace::types::{BType, TypeLattice};
use crate::pace::CompilationUnit;

use super::error::{EvalFrame, ForeignError};
use super::value::{FrameRef, Value};

macro_rules! debug_log {
    ($format:literal) => {
        enabled_debug_print!(true, "exec", $format);
    };
    ($format:literal, $($args:expr),*) => {
        enabled_debug_print!(true, "exec", $format, $($args),*);
    };
}

/// Activation record of a function or block call. `lexical` points at the
/// frame the callee's free names resolve in.
#[derive(Debug)]
struct Frame {
    table: TableId,
    locals: HashMap<String, Value>,
    lexical: Option<FrameRef>,
    serial: u64,
    line: u32,
}

/// Executes typed nodes. Values of the module, contextual and global scopes
/// live in per-table stores, values of function bodies in frames.
pub struct Interpreter<'u> {
    heap: &'u Heap,
    symbols: &'u Symbols,
    lattice: &'u TypeLattice,
    loader: &'u mut dyn ModuleLoader,
    logger: &'u mut dyn Logger,
    max_call_depth: usize,
    frames: Vec<Frame>,
    next_serial: u64,
    table_values: HashMap<TableId, HashMap<String, Value>>,
    // Span of the call currently running a foreign function
    call_span: SrcSpan,
}

impl<'u> Interpreter<'u> {
    pub fn new(unit: &'u mut CompilationUnit) -> Self {
        Self {
            heap: &unit.heap,
            symbols: &unit.symbols,
            lattice: &unit.lattice,
            loader: &mut *unit.loader,
            logger: &mut *unit.logger,
            max_call_depth: unit.options.max_call_depth,
            frames: Vec::new(),
            next_serial: 0,
            table_values: HashMap::new(),
            call_span: SrcSpan::default(),
        }
    }

    /// Runs the top level nodes of a module in order. The value of the last
    /// one is the result.
    pub fn run(&mut self, body: &[NodeId]) -> Result<Value, CoreError> {
        let result = self.run_body(body)?;
        log!(self.logger, "executed {} phrase(s), result {}", body.len(), result);
        Ok(result)
    }

    fn run_body(&mut self, body: &[NodeId]) -> Result<Value, CoreError> {
        let mut last = Value::Null;
        for id in body {
            let line = self.heap[*id].span.begin.line;
            if let Some(frame) = self.frames.last_mut() {
                frame.line = line;
            }
            last = self.eval(*id)?;
        }
        Ok(last)
    }

    pub fn eval(&mut self, id: NodeId) -> Result<Value, CoreError> {
        let heap = self.heap;
        let node = &heap[id];
        match &node.kind {
            TcKind::Apply { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(*arg)?);
                }
                match &heap[*func].kind {
                    TcKind::GetOverload { name, arity, scope } => {
                        let overload = self.find_overload(name, *arity, *scope, node.span)?;
                        let implementation = self.select(overload, name, &values, node.span)?;
                        self.invoke(name, implementation, values, node.span)
                    },
                    _ => {
                        let callee = self.eval(*func)?;
                        self.call_value_at(callee, values, node.span)
                    },
                }
            },
            TcKind::Func(func) | TcKind::Block(func) => Ok(Value::Closure {
                node: id,
                arity: func.arg_names.len(),
                lexical: self.current_frame(),
            }),
            TcKind::BindFn { func, .. } => {
                let lexical = self.current_frame();
                let arity = heap.as_function(*func).map(|f| f.arg_names.len()).unwrap_or(0);
                Ok(Value::Closure { node: *func, arity, lexical })
            },
            TcKind::BindVal { scope, name, target, value } => {
                let value = self.eval(*value)?;
                self.store(*scope, name, *target, value.clone());
                Ok(value)
            },
            TcKind::GetVal { scope, name, path, target } => {
                let mut value = self.lookup(*scope, name, *target).cloned().ok_or_else(|| CoreError::new(
                    ErrorKind::UnknownName, node.span,
                    format!("'{}{}' has no value at this point", scope.sigil(), name)
                ))?;
                for attribute in path {
                    value = match value.field(attribute) {
                        Some(field) => field.clone(),
                        None => return Err(CoreError::new(
                            ErrorKind::Runtime, node.span,
                            format!("a value of type {} has no field '{}'", value.btype(), attribute)
                        )),
                    };
                }
                Ok(value)
            },
            TcKind::GetOverload { name, scope, .. } | TcKind::GetFamily { name, scope } => {
                match self.symbols.family(*scope, name) {
                    Some(family) => Ok(Value::Family(Rc::new(family))),
                    None => Err(CoreError::new(
                        ErrorKind::UnknownOverload, node.span,
                        format!("'{}' has no implementations to refer to", name)
                    )),
                }
            },
            TcKind::LitScalar(scalar) => Ok(match scalar {
                Scalar::Null => Value::Null,
                Scalar::Bool(v) => Value::Bool(*v),
                Scalar::Int(v) => Value::Int(*v),
                Scalar::Num(v) => Value::Num(*v),
                Scalar::Text(v) => Value::Text(v.clone()),
            }),
            TcKind::LitTuple(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(*element)?);
                }
                Ok(Value::Tuple(values))
            },
            TcKind::LitStruct(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    values.push((name.clone(), self.eval(*field)?));
                }
                Ok(Value::Struct(values))
            },
            TcKind::Load(_) | TcKind::VoidPhrase => Ok(Value::Null),
            TcKind::FromImport { path, names } => {
                let values = self.loader.import_values(path, names)
                    .map_err(|message| CoreError::new(ErrorKind::ModuleImport, node.span, message))?;
                for (name, value) in values {
                    let target = self.symbols.value_meta_for_get(node.table, &name, Scope::Local)
                        .map(|(target, _)| target)
                        .unwrap_or(node.table);
                    self.store(Scope::Local, &name, target, value);
                }
                Ok(Value::Null)
            },
        }
    }

    fn current_frame(&self) -> Option<FrameRef> {
        self.frames.last().map(|frame| FrameRef { index: self.frames.len() - 1, serial: frame.serial })
    }

    fn is_live(&self, frame_ref: FrameRef) -> bool {
        self.frames.get(frame_ref.index).map(|f| f.serial == frame_ref.serial).unwrap_or(false)
    }

    /// Frame holding the locals of `table`, found by following the lexical
    /// links from the innermost frame.
    fn frame_for(&self, table: TableId) -> Option<usize> {
        let mut current = self.frames.len().checked_sub(1)?;
        loop {
            let frame = &self.frames[current];
            if frame.table == table {
                return Some(current);
            }
            match frame.lexical {
                Some(frame_ref) if self.is_live(frame_ref) => current = frame_ref.index,
                _ => return None,
            }
        }
    }

    /// Live frame of the table a bound function was written in. Every
    /// activation of the enclosing function binds its own helpers, so this is
    /// resolved per call and not when the binding runs.
    fn defining_frame(&self, func_id: NodeId) -> Option<FrameRef> {
        let func = self.heap.as_function(func_id)?;
        let parent = self.symbols[func.scope].lexical_parent?;
        self.frame_for(parent).map(|index| FrameRef { index, serial: self.frames[index].serial })
    }

    fn lookup(&self, scope: Scope, name: &str, target: TableId) -> Option<&Value> {
        if let Scope::Local | Scope::Parent = scope {
            if let Some(idx) = self.frame_for(target) {
                return self.frames[idx].locals.get(name);
            }
        }
        self.table_values.get(&target).and_then(|values| values.get(name))
    }

    fn store(&mut self, scope: Scope, name: &str, target: TableId, value: Value) {
        if let Scope::Local | Scope::Parent = scope {
            if let Some(idx) = self.frame_for(target) {
                self.frames[idx].locals.insert(name.to_string(), value);
                return;
            }
        }
        self.table_values.entry(target).or_insert_with(HashMap::new).insert(name.to_string(), value);
    }

    fn find_overload(&self, name: &str, arity: usize, scope: TableId, span: SrcSpan) -> Result<&'u Overload, CoreError> {
        let symbols: &'u Symbols = self.symbols;
        match symbols.find_overload(scope, name, arity) {
            Some(overload) => Ok(overload),
            None if symbols.is_pending(name, arity) => Err(CoreError::new(
                ErrorKind::UnknownOverload, span,
                format!("'{}' with {} argument(s) is still waiting for type inference", name, arity)
            )),
            None => Err(CoreError::new(
                ErrorKind::UnknownOverload, span,
                format!("no overload of '{}' takes {} argument(s)", name, arity)
            )),
        }
    }

    fn select(&self, overload: &Overload, name: &str, args: &[Value], span: SrcSpan) -> Result<Implementation, CoreError> {
        let arg_types: Vec<BType> = args.iter().map(|v| v.btype()).collect();
        let describe_args = || arg_types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(",");
        match overload.select(self.lattice, &arg_types) {
            Selection::Found(implementation) => Ok(implementation.clone()),
            Selection::Ambiguous(candidates) => Err(CoreError::new(
                ErrorKind::AmbiguousOverload, span,
                format!("call of '{}' with ({}) is ambiguous between {}", name, describe_args(), describe(candidates.into_iter()))
            )),
            Selection::NoFit => Err(CoreError::new(
                ErrorKind::UnknownOverload, span,
                format!("no overload of '{}' accepts ({}), candidates are {}", name, describe_args(), overload.describe_signatures())
            )),
        }
    }

    fn invoke(&mut self, name: &str, implementation: Implementation, args: Vec<Value>, span: SrcSpan) -> Result<Value, CoreError> {
        debug_log!("call '{}' with {} argument(s)", name, args.len());
        let result = match implementation.target {
            FnImpl::Foreign(func) => {
                let previous = std::mem::replace(&mut self.call_span, span);
                let result = func(self, args);
                self.call_span = previous;
                result.map_err(|err| match err {
                    ForeignError::Failed(message) => CoreError::new(
                        ErrorKind::Runtime, span, format!("'{}' failed: {}", name, message)
                    ),
                    ForeignError::Propagated(err) => err,
                })?
            },
            FnImpl::User(func) => {
                let lexical = self.defining_frame(func);
                self.call_function(func, lexical, args, span)?
            },
        };
        self.check_result(name, result, &implementation.ret, span)
    }

    /// Validates a result against a constrained return type. Integers are
    /// widened when a number is declared.
    fn check_result(&self, name: &str, value: Value, ret: &BType, span: SrcSpan) -> Result<Value, CoreError> {
        if !ret.is_constrained() {
            return Ok(value);
        }
        let actual = value.btype();
        if !self.lattice.fits_within(&actual, ret) {
            return Err(CoreError::new(
                ErrorKind::IncompatibleTypes, span,
                format!("'{}' returned a value of type {} where {} was declared", name, actual, ret)
            ));
        }
        match value {
            Value::Int(v) if *ret == BType::num() => Ok(Value::Num(v as f64)),
            value => Ok(value),
        }
    }

    fn call_function(&mut self, func_id: NodeId, lexical: Option<FrameRef>, args: Vec<Value>, span: SrcSpan) -> Result<Value, CoreError> {
        let heap = self.heap;
        let func = heap.as_function(func_id)
            .ok_or_else(|| CoreError::internal(span, "callee is not a function literal"))?;
        if args.len() != func.arg_names.len() {
            return Err(CoreError::new(
                ErrorKind::UnknownOverload, span,
                format!("function takes {} argument(s) but was called with {}", func.arg_names.len(), args.len())
            ));
        }
        if self.frames.len() >= self.max_call_depth {
            return Err(CoreError::new(
                ErrorKind::Runtime, span,
                format!("call depth exceeds the limit of {}", self.max_call_depth)
            ).with_frames(self.trace()));
        }
        if let Some(frame_ref) = lexical {
            if !self.is_live(frame_ref) {
                return Err(CoreError::new(
                    ErrorKind::Runtime, span,
                    "function called after the frame it was created in has returned"
                ));
            }
        }

        self.next_serial += 1;
        self.frames.push(Frame {
            table: func.scope,
            locals: func.arg_names.iter().cloned().zip(args).collect(),
            lexical,
            serial: self.next_serial,
            line: span.begin.line,
        });

        let result = match self.run_body(&func.body) {
            Ok(last) => {
                let returned = self.frames.last().and_then(|f| f.locals.get(RETURN_VARIABLE)).cloned();
                Ok(returned.unwrap_or(last))
            },
            Err(err) => Err(err.with_frames(self.trace())),
        };
        self.frames.pop();
        result
    }

    fn call_value_at(&mut self, callee: Value, args: Vec<Value>, span: SrcSpan) -> Result<Value, CoreError> {
        match callee {
            Value::Closure { node, lexical, .. } => self.call_function(node, lexical, args, span),
            Value::Family(family) => {
                let overload = family.overload(args.len()).ok_or_else(|| CoreError::new(
                    ErrorKind::UnknownOverload, span,
                    format!("no overload of '{}' takes {} argument(s)", family.name, args.len())
                ))?;
                let implementation = self.select(overload, &family.name, &args, span)?;
                self.invoke(&family.name, implementation, args, span)
            },
            other => Err(CoreError::new(
                ErrorKind::Runtime, span,
                format!("a value of type {} cannot be called", other.btype())
            )),
        }
    }

    /// Calls a closure or family from a foreign function.
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, CoreError> {
        let span = self.call_span;
        self.call_value_at(callee, args, span)
    }

    /// True for callables that take no arguments.
    pub fn is_thunk(&self, value: &Value) -> bool {
        match value {
            Value::Closure { arity, .. } => *arity == 0,
            Value::Family(family) => family.overload(0).is_some(),
            _ => false,
        }
    }

    fn trace(&self) -> Vec<EvalFrame> {
        self.frames.iter().map(|frame| {
            let module_name = self.symbols.module_of(frame.table)
                .map(|module| self.symbols[module].name.clone())
                .unwrap_or_default();
            let procedure = self.symbols[self.symbols.enclosing_non_block(frame.table)].name.clone();
            EvalFrame { line: frame.line, module_name, procedure }
        }).collect()
    }
}
