//! Phrase parsing: one typed node per phrase, names resolved against the
//! symbol tables while walking the phrase from left to right.

pub mod overload;
pub mod symbol_table;

use crate::common::*;
use crate::pace::ast::*;
use crate::pace::group::*;
use crate::pace::input_source::{CoreError, ErrorKind, SrcSpan};
use crate::pace::loader::SymbolImports;
use crate::pace::tokens::{Scope, Token, TokenTag};
use crate::pace::types::BType;
use crate::pace::CompilationUnit;

use overload::{FnImpl, Implementation};
use symbol_table::TableKind;

macro_rules! debug_log {
    ($format:literal) => {
        enabled_debug_print!(false, "parser", $format);
    };
    ($format:literal, $($args:expr),*) => {
        enabled_debug_print!(false, "parser", $format, $($args),*);
    };
}

/// Name under which a function body can set its result explicitly.
pub const RETURN_VARIABLE: &str = "return";

/// Ordering key of implicit parameters: `A < a < B < b < ...`.
pub fn implicit_param_key(name: &str) -> u32 {
    match name.chars().next() {
        Some(c) if c.is_ascii_lowercase() => 2 * (c as u32 - 'a' as u32 + 1),
        Some(c) if c.is_ascii_uppercase() => 2 * (c as u32 - 'A' as u32) + 1,
        _ => u32::MAX,
    }
}

fn is_implicit_candidate(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Splits `p.x.y` into the value name and its attribute path.
fn split_path(text: &str) -> (&str, Vec<String>) {
    let mut parts = text.split('.');
    let name = parts.next().unwrap_or(text);
    (name, parts.map(|p| p.to_string()).collect())
}

fn sentence_error<S: ToString>(span: SrcSpan, message: S) -> CoreError {
    CoreError::new(ErrorKind::Sentence, span, message)
}

enum Callable<'g> {
    Function(&'g FuncLiteral),
    Block(&'g BlockLiteral),
}

pub struct PhraseParser<'u> {
    unit: &'u mut CompilationUnit,
}

impl<'u> PhraseParser<'u> {
    pub fn new(unit: &'u mut CompilationUnit) -> Self {
        Self { unit }
    }

    /// Parses the top level phrases of a module into `body`, which keeps the
    /// phrases parsed before an error. Pending functions are handed to
    /// inference after every phrase.
    pub fn parse_module(&mut self, snippet: &Snippet, table: TableId, body: &mut Vec<NodeId>) -> Result<(), CoreError> {
        for phrase in &snippet.phrases {
            let node = self.parse_phrase(phrase, table)?;
            body.push(node);
            self.unit.infer_pending()?;
        }
        log!(self.unit.logger, "parsed {} phrase(s) into {} node(s)", body.len(), self.unit.heap.len());
        Ok(())
    }

    fn parse_body(&mut self, phrases: &[Phrase], table: TableId) -> Result<Vec<NodeId>, CoreError> {
        phrases.iter()
            .filter(|p| !p.is_empty())
            .map(|p| self.parse_phrase(p, table))
            .collect()
    }

    fn alloc(&mut self, table: TableId, span: SrcSpan, out_type: BType, kind: TcKind) -> NodeId {
        self.unit.heap.alloc_node(|this| TcNode { this, span, table, out_type, kind })
    }

    fn out_type(&self, id: NodeId) -> BType {
        self.unit.heap[id].out_type.clone()
    }

    pub fn parse_phrase(&mut self, phrase: &Phrase, table: TableId) -> Result<NodeId, CoreError> {
        let span = phrase.span();
        if phrase.is_empty() {
            return Ok(self.alloc(table, span, BType::null(), TcKind::VoidPhrase));
        }
        if let Some(Item::Token(token)) = phrase.items.first() {
            if let TokenTag::AssignLeft(scope) = token.tag {
                return self.parse_assignment(token, scope, &phrase.items[1..], table, span);
            }
        }
        self.parse_expression(&phrase.items, table, span)
    }

    fn parse_assignment(
        &mut self, token: &Token, scope: Scope, rhs: &[Item], table: TableId, span: SrcSpan
    ) -> Result<NodeId, CoreError> {
        if rhs.is_empty() {
            return Err(sentence_error(token.span, format!("nothing to bind to '{}{}'", scope.sigil(), token.text)));
        }
        if token.text.contains('.') {
            return Err(sentence_error(token.span, format!("cannot bind to the attribute path '{}'", token.text)));
        }

        if rhs.len() == 1 {
            let callable = match &rhs[0] {
                Item::Group(Group::FuncOrStruct(FuncOrStruct { content: FuncOrStructContent::Function(literal), span, .. })) => {
                    Some((Callable::Function(literal), *span))
                },
                Item::Group(Group::Block(block)) => Some((Callable::Block(block), block.span)),
                _ => None,
            };
            if let Some((callable, literal_span)) = callable {
                return self.parse_function_binding(&token.text, scope, callable, literal_span, table, span);
            }
        }

        let rhs_span = rhs[0].span().merge(rhs[rhs.len() - 1].span());
        let value = self.parse_expression(rhs, table, rhs_span)?;
        self.bind_value(&token.text, scope, value, table, span)
    }

    fn bind_value(&mut self, name: &str, scope: Scope, value: NodeId, table: TableId, span: SrcSpan) -> Result<NodeId, CoreError> {
        let btype = self.out_type(value);
        let target = self.unit.symbols.def_value_meta(table, name, btype.clone(), scope, span)?;
        debug_log!("bind value '{}{}' in {:?}", scope.sigil(), name, target);
        Ok(self.alloc(table, span, btype, TcKind::BindVal { scope, name: name.to_string(), target, value }))
    }

    fn parse_function_binding(
        &mut self, name: &str, scope: Scope, callable: Callable, literal_span: SrcSpan, table: TableId, span: SrcSpan
    ) -> Result<NodeId, CoreError> {
        let (func, home) = self.parse_callable(callable, literal_span, table, Some((name, scope)))?;
        let home = home.ok_or_else(|| CoreError::internal(span, format!("function '{}' was bound without a table", name)))?;
        let (sig, ret, style) = match self.unit.heap.as_function(func) {
            Some(f) => (f.arg_types.clone(), f.ret_type.clone(), f.style),
            None => return Err(CoreError::internal(span, "binding a node that is not a function literal")),
        };

        self.unit.symbols.bind_function(home, name, Implementation { sig, ret, target: FnImpl::User(func) }, span)?;
        log!(self.unit.logger, "bound {} function '{}{}' at {}", style, scope.sigil(), name, span.begin);

        let out_type = self.out_type(func);
        Ok(self.alloc(table, span, out_type, TcKind::BindFn { scope, name: name.to_string(), target: home, func }))
    }

    /// Builds a function or block literal. When the literal is being bound,
    /// its name is declared as early as its style is known so the body can
    /// call itself. Returns the literal and the table the name was declared
    /// in.
    fn parse_callable(
        &mut self, callable: Callable, span: SrcSpan, table: TableId, binding: Option<(&str, Scope)>
    ) -> Result<(NodeId, Option<TableId>), CoreError> {
        let (kind, params, ret_tag, body) = match callable {
            Callable::Function(f) => (TableKind::Function, f.params.as_ref(), f.ret_type.as_ref(), &f.body),
            Callable::Block(b) => (TableKind::Block, None, None, &b.body),
        };
        let child = self.unit.symbols.new_child(table, kind, params.is_none());
        if let Some((name, _)) = binding {
            self.unit.symbols[child].name = name.to_string();
        }

        let mut arg_names = Vec::new();
        let mut arg_types = Vec::new();
        if let Some(params) = params {
            for param in params {
                let btype = match &param.type_tag {
                    Some(tag) => self.parse_type(tag)?,
                    None => BType::Tbi,
                };
                self.unit.symbols.def_param(child, &param.name.text, btype.clone(), param.name.span)?;
                arg_names.push(param.name.text.clone());
                arg_types.push(btype);
            }
        }
        let ret_type = match ret_tag {
            Some(tag) => self.parse_type(tag)?,
            None => BType::Tbi,
        };

        let mut home = None;
        if let (Some((name, scope)), Some(params)) = (binding, params) {
            home = Some(self.unit.symbols.def_function_meta(table, name, Style::from_arity(params.len()), scope, span)?);
        }

        let body = self.parse_body(body, child)?;

        if params.is_none() {
            let mut implicit: Vec<String> = self.unit.symbols[child].implicit_params.iter().cloned().collect();
            implicit.sort_by_key(|name| implicit_param_key(name));
            arg_types = vec![BType::Tbi; implicit.len()];
            arg_names = implicit;
        }
        let style = Style::from_arity(arg_names.len());
        if let (Some((name, scope)), None) = (binding, home) {
            home = Some(self.unit.symbols.def_function_meta(table, name, style, scope, span)?);
        }

        let out_type = BType::Fn { args: arg_types.clone(), ret: Box::new(ret_type.clone()) };
        let func = FuncNode { arg_names, arg_types, ret_type, body, style, scope: child };
        let kind = match kind {
            TableKind::Block => TcKind::Block(func),
            _ => TcKind::Func(func),
        };
        Ok((self.alloc(table, span, out_type, kind), home))
    }

    fn parse_type(&self, tag: &TypeTag) -> Result<BType, CoreError> {
        self.unit.lattice.parse(&tag.text)
            .map_err(|message| CoreError::new(ErrorKind::UnknownName, tag.span, message))
    }

    fn parse_expression(&mut self, items: &[Item], table: TableId, span: SrcSpan) -> Result<NodeId, CoreError> {
        let mut current: Option<NodeId> = None;
        let mut idx = 0;
        while idx < items.len() {
            let item = &items[idx];
            idx += 1;
            match item {
                Item::Token(token) => match token.tag {
                    TokenTag::Name(_) | TokenTag::SymbolicName => {
                        current = Some(self.parse_name(token, current, items, &mut idx, table)?);
                    },
                    TokenTag::Int | TokenTag::Num | TokenTag::Text => {
                        let literal = self.parse_literal(token, table)?;
                        current = Some(self.follow_value(current, literal, items, &mut idx, table)?);
                    },
                    TokenTag::AssignRight(scope) => {
                        let value = current.ok_or_else(|| sentence_error(
                            token.span, format!("':{}{}' needs a value on its left", scope.sigil(), token.text)
                        ))?;
                        current = Some(self.bind_value(&token.text, scope, value, table, token.span)?);
                    },
                    TokenTag::AssignLeft(_) => {
                        return Err(sentence_error(token.span, format!("'{}:' can only start a phrase", token.text)));
                    },
                    _ => {
                        return Err(sentence_error(token.span, format!("unexpected '{}' in a phrase", token.render())));
                    },
                },
                Item::Group(group) => match group {
                    Group::TypeTag(tag) => {
                        let value = current.ok_or_else(|| sentence_error(tag.span, "a type tag needs a value on its left"))?;
                        self.annotate(value, tag)?;
                    },
                    Group::Load(load) => {
                        if current.is_some() {
                            return Err(sentence_error(load.span, "'load' must start a phrase"));
                        }
                        current = Some(self.parse_load(load, table)?);
                    },
                    Group::FromImport(import) => {
                        if current.is_some() {
                            return Err(sentence_error(import.span, "'from' must start a phrase"));
                        }
                        current = Some(self.parse_from_import(import, table)?);
                    },
                    Group::TupleOrParen(tuple) if current.is_some() => {
                        return Err(sentence_error(
                            tuple.span, "a value cannot be applied to a tuple, only functions can be called"
                        ));
                    },
                    _ => {
                        let value = self.parse_group_value(group, table)?;
                        current = Some(self.follow_value(current, value, items, &mut idx, table)?);
                    },
                },
            }
        }

        match current {
            Some(node) => Ok(node),
            None => Ok(self.alloc(table, span, BType::null(), TcKind::VoidPhrase)),
        }
    }

    fn parse_literal(&mut self, token: &Token, table: TableId) -> Result<NodeId, CoreError> {
        let scalar = match token.tag {
            TokenTag::Int => Scalar::Int(token.text.parse::<i64>().map_err(|_| CoreError::new(
                ErrorKind::Lex, token.span, format!("invalid integer literal '{}'", token.text)
            ))?),
            TokenTag::Num => Scalar::Num(token.text.parse::<f64>().map_err(|_| CoreError::new(
                ErrorKind::Lex, token.span, format!("invalid number literal '{}'", token.text)
            ))?),
            _ => Scalar::Text(token.text.clone()),
        };
        let btype = scalar.btype();
        Ok(self.alloc(table, token.span, btype, TcKind::LitScalar(scalar)))
    }

    /// Resolves a name token. Local values shadow functions, unknown single
    /// letters in a catching body become implicit parameters. A contextual
    /// sigil reads contextual values first, then contextual functions.
    fn parse_name(
        &mut self, token: &Token, lhs: Option<NodeId>, items: &[Item], idx: &mut usize, table: TableId
    ) -> Result<NodeId, CoreError> {
        let scope = match token.tag {
            TokenTag::Name(scope) => scope,
            _ => Scope::Local,
        };
        let (name, path) = split_path(&token.text);
        let not_bound = || CoreError::new(
            ErrorKind::UnknownName, token.span,
            format!("'{}{}' is not bound in that scope", scope.sigil(), name)
        );

        if token.tag != TokenTag::SymbolicName {
            let found = self.unit.symbols.value_meta_for_get(table, name, scope)
                .map(|(target, meta)| (target, meta.btype.clone()));
            if let Some((target, btype)) = found {
                let btype = if path.is_empty() { btype } else { BType::Tbi };
                let node = self.alloc(table, token.span, btype, TcKind::GetVal {
                    scope, name: name.to_string(), path, target,
                });
                return self.follow_value(lhs, node, items, idx, table);
            }
            // Only the contextual scope holds functions besides the lexical chain
            if scope != Scope::Local && (scope != Scope::Context || !path.is_empty()) {
                return Err(not_bound());
            }
        }

        if !path.is_empty() {
            return Err(CoreError::new(ErrorKind::UnknownName, token.span, format!("unknown value '{}'", name)));
        }

        let function = match scope {
            Scope::Context => self.unit.symbols.context_function_meta(name),
            _ => self.unit.symbols.function_meta_for_get(table, name),
        }.map(|(home, meta)| (home, meta.style, meta.is_param));
        if let Some((home, style, is_param)) = function {
            if is_param {
                let node = self.alloc(table, token.span, BType::Tbi, TcKind::GetVal {
                    scope: Scope::Local, name: name.to_string(), path: Vec::new(), target: home,
                });
                return match (lhs, self.next_tuple(items, *idx)) {
                    (None, Some(tuple)) => {
                        *idx += 1;
                        let args = self.prefix_args(tuple, table)?;
                        Ok(self.alloc(table, token.span.merge(tuple.span), BType::Tbi, TcKind::Apply { func: node, args }))
                    },
                    _ => self.follow_value(lhs, node, items, idx, table),
                };
            }
            return self.build_application(lhs, token, name, style, home, items, idx, table);
        }
        if scope == Scope::Context {
            return Err(not_bound());
        }

        if scope == Scope::Local && self.unit.symbols[table].catches_implicit && is_implicit_candidate(name) {
            self.unit.symbols.def_implicit_param(table, name, token.span);
            debug_log!("implicit parameter '{}' in {:?}", name, table);
            let node = self.alloc(table, token.span, BType::Tbi, TcKind::GetVal {
                scope: Scope::Local, name: name.to_string(), path: Vec::new(), target: table,
            });
            return self.follow_value(lhs, node, items, idx, table);
        }

        Err(CoreError::new(ErrorKind::UnknownName, token.span, format!("unknown name '{}'", name)))
    }

    fn next_tuple<'i>(&self, items: &'i [Item], idx: usize) -> Option<&'i TupleOrParen> {
        match items.get(idx) {
            Some(Item::Group(Group::TupleOrParen(tuple))) => Some(tuple),
            _ => None,
        }
    }

    /// A value was produced. It may not follow another value; an implicit
    /// parameter followed by a tuple is a call through that parameter.
    fn follow_value(
        &mut self, lhs: Option<NodeId>, value: NodeId, items: &[Item], idx: &mut usize, table: TableId
    ) -> Result<NodeId, CoreError> {
        if let Some(lhs) = lhs {
            let span = self.unit.heap[lhs].span.merge(self.unit.heap[value].span);
            return Err(sentence_error(span, "a value cannot be applied to another value"));
        }

        let implicit = match &self.unit.heap[value].kind {
            TcKind::GetVal { scope: Scope::Local, name, path, target } if path.is_empty() => {
                let owner = &self.unit.symbols[*target];
                if owner.implicit_params.contains(name) && owner.value(name).is_some() {
                    Some((*target, name.clone()))
                } else {
                    None
                }
            },
            _ => None,
        };

        if let (Some((owner, name)), Some(tuple)) = (implicit, self.next_tuple(items, *idx)) {
            *idx += 1;
            self.unit.symbols.promote_param_to_function(owner, &name);
            let args = self.prefix_args(tuple, table)?;
            let span = self.unit.heap[value].span.merge(tuple.span);
            return Ok(self.alloc(table, span, BType::Tbi, TcKind::Apply { func: value, args }));
        }
        Ok(value)
    }

    fn build_application(
        &mut self, lhs: Option<NodeId>, token: &Token, name: &str, style: Style, home: TableId,
        items: &[Item], idx: &mut usize, table: TableId,
    ) -> Result<NodeId, CoreError> {
        let next_tuple = self.next_tuple(items, *idx);
        let lhs = match lhs {
            Some(lhs) => lhs,
            None => {
                return match next_tuple {
                    Some(tuple) => {
                        *idx += 1;
                        let args = self.prefix_args(tuple, table)?;
                        let span = token.span.merge(tuple.span);
                        Ok(self.apply_overload(name, home, args, table, span))
                    },
                    None => Ok(self.alloc(table, token.span, BType::Tbi, TcKind::GetFamily {
                        name: name.to_string(), scope: table,
                    })),
                };
            },
        };

        let lhs_span = self.unit.heap[lhs].span;
        if style == Style::Nullary {
            return Err(sentence_error(
                token.span, format!("'{}' takes no value on its left, call it as '{}(...)'", name, name)
            ));
        }

        match next_tuple.map(|t| (t, t.shape)) {
            Some((tuple, TupleShape::Partial(1))) => {
                *idx += 1;
                let args = self.merge_partial(tuple, lhs, table)?;
                let span = lhs_span.merge(tuple.span);
                return Ok(self.apply_overload(name, home, args, table, span));
            },
            Some((tuple, TupleShape::Partial(_))) => {
                return Err(sentence_error(
                    tuple.span, "a partial after a piped value must have exactly one empty slot"
                ));
            },
            Some((tuple, _)) if style == Style::Unary => {
                return Err(sentence_error(
                    token.span.merge(tuple.span),
                    format!("'value {}(...)' is not allowed, use '{}(value, ...)' or a partial '{}(, ...)'", name, name, name)
                ));
            },
            _ => {},
        }

        let mut args = vec![lhs];
        let mut span = lhs_span.merge(token.span);
        for _ in 0..style.num_following() {
            match self.parse_atom(items, idx, table)? {
                Some(arg) => {
                    span = span.merge(self.unit.heap[arg].span);
                    args.push(arg);
                },
                None => {
                    return Err(sentence_error(
                        token.span,
                        format!("'{}' expects {} argument(s) after it", name, style.num_following())
                    ));
                },
            }
        }
        Ok(self.apply_overload(name, home, args, table, span))
    }

    fn apply_overload(&mut self, name: &str, home: TableId, args: Vec<NodeId>, table: TableId, span: SrcSpan) -> NodeId {
        let callee = self.alloc(table, span, BType::Tbi, TcKind::GetOverload {
            name: name.to_string(), arity: args.len(), scope: home,
        });
        self.alloc(table, span, BType::Tbi, TcKind::Apply { func: callee, args })
    }

    /// One argument following a piped binary or ternary name.
    fn parse_atom(&mut self, items: &[Item], idx: &mut usize, table: TableId) -> Result<Option<NodeId>, CoreError> {
        let item = match items.get(*idx) {
            Some(item) => item,
            None => return Ok(None),
        };
        match item {
            Item::Token(token) => match token.tag {
                TokenTag::Int | TokenTag::Num | TokenTag::Text => {
                    *idx += 1;
                    self.parse_literal(token, table).map(Some)
                },
                TokenTag::Name(_) | TokenTag::SymbolicName => {
                    *idx += 1;
                    self.parse_name(token, None, items, idx, table).map(Some)
                },
                _ => Ok(None),
            },
            Item::Group(group) => match group {
                Group::TupleOrParen(tuple) if tuple.shape.is_partial() => Ok(None),
                Group::TypeTag(_) | Group::Load(_) | Group::FromImport(_) => Ok(None),
                _ => {
                    *idx += 1;
                    self.parse_group_value(group, table).map(Some)
                },
            },
        }
    }

    fn slot_value(&mut self, slot: &Slot, table: TableId, span: SrcSpan) -> Result<NodeId, CoreError> {
        match slot.as_slice() {
            [phrase] => self.parse_phrase(phrase, table),
            _ => Err(sentence_error(span, "every slot of a tuple must hold exactly one phrase")),
        }
    }

    /// Arguments of a call written as `name(...)`. A partial contributes its
    /// filled slots only.
    fn prefix_args(&mut self, tuple: &TupleOrParen, table: TableId) -> Result<Vec<NodeId>, CoreError> {
        match tuple.shape {
            TupleShape::Null => Ok(Vec::new()),
            TupleShape::Grid => Err(sentence_error(tuple.span, "a grid cannot be used as an argument list")),
            _ => tuple.slots().iter()
                .filter(|slot| !slot.is_empty())
                .map(|slot| self.slot_value(slot, table, tuple.span))
                .collect(),
        }
    }

    /// Arguments of a one-slot partial following a piped value, the value
    /// fills the empty slot.
    fn merge_partial(&mut self, tuple: &TupleOrParen, lhs: NodeId, table: TableId) -> Result<Vec<NodeId>, CoreError> {
        let mut args = Vec::with_capacity(tuple.slots().len());
        for slot in tuple.slots() {
            if slot.is_empty() {
                args.push(lhs);
            } else {
                args.push(self.slot_value(slot, table, tuple.span)?);
            }
        }
        Ok(args)
    }

    fn parse_group_value(&mut self, group: &Group, table: TableId) -> Result<NodeId, CoreError> {
        match group {
            Group::TupleOrParen(tuple) => self.parse_tuple(tuple, table),
            Group::FuncOrStruct(func) => match &func.content {
                FuncOrStructContent::Function(literal) => {
                    Ok(self.parse_callable(Callable::Function(literal), func.span, table, None)?.0)
                },
                FuncOrStructContent::Struct(fields) => self.parse_struct(fields, table, func.span),
            },
            Group::Block(block) => Ok(self.parse_callable(Callable::Block(block), block.span, table, None)?.0),
            Group::Frame(frame) => self.parse_frame(frame, table),
            other => Err(sentence_error(other.span(), format!("a {} cannot be used as a value", other.kind()))),
        }
    }

    fn parse_tuple(&mut self, tuple: &TupleOrParen, table: TableId) -> Result<NodeId, CoreError> {
        match tuple.shape {
            TupleShape::Null => Ok(self.alloc(table, tuple.span, BType::null(), TcKind::LitScalar(Scalar::Null))),
            TupleShape::Paren => {
                let slot = tuple.slots().first().map(|s| s.as_slice()).unwrap_or(&[]);
                match slot {
                    [phrase] => self.parse_phrase(phrase, table),
                    _ => Err(sentence_error(tuple.span, "a parenthesis must hold exactly one phrase")),
                }
            },
            TupleShape::Tuple => {
                let mut elements = Vec::with_capacity(tuple.slots().len());
                for slot in tuple.slots() {
                    elements.push(self.slot_value(slot, table, tuple.span)?);
                }
                Ok(self.tuple_literal(elements, table, tuple.span))
            },
            TupleShape::Partial(_) => Err(sentence_error(
                tuple.span, "a partial tuple can only follow a function name"
            )),
            TupleShape::Grid => {
                let mut rows = Vec::with_capacity(tuple.rows.len());
                for row in &tuple.rows {
                    let mut elements = Vec::with_capacity(row.len());
                    for slot in row {
                        elements.push(self.slot_value(slot, table, tuple.span)?);
                    }
                    rows.push(self.tuple_literal(elements, table, tuple.span));
                }
                Ok(self.tuple_literal(rows, table, tuple.span))
            },
        }
    }

    fn tuple_literal(&mut self, elements: Vec<NodeId>, table: TableId, span: SrcSpan) -> NodeId {
        let btype = BType::Tuple(elements.iter().map(|e| self.out_type(*e)).collect());
        self.alloc(table, span, btype, TcKind::LitTuple(elements))
    }

    fn struct_literal(&mut self, fields: Vec<(String, NodeId)>, table: TableId, span: SrcSpan) -> NodeId {
        let btype = BType::Struct(fields.iter().map(|(name, id)| (name.clone(), self.out_type(*id))).collect());
        self.alloc(table, span, btype, TcKind::LitStruct(fields))
    }

    fn parse_struct(&mut self, fields: &[Phrase], table: TableId, span: SrcSpan) -> Result<NodeId, CoreError> {
        let mut parsed: Vec<(String, NodeId)> = Vec::with_capacity(fields.len());
        for field in fields.iter().filter(|f| !f.is_empty()) {
            let name = match field.assignment() {
                Some(token) => token.text.clone(),
                None => return Err(sentence_error(field.span(), "struct fields must be written as 'name: value'")),
            };
            if parsed.iter().any(|(existing, _)| *existing == name) {
                return Err(sentence_error(field.span(), format!("field '{}' appears twice", name)));
            }
            let value = self.parse_expression(&field.items[1..], table, field.span())?;
            parsed.push((name, value));
        }
        Ok(self.struct_literal(parsed, table, span))
    }

    /// `([a, b] 1, 2; 3, 4)` is a tuple holding one struct per row.
    fn parse_frame(&mut self, frame: &FrameLiteral, table: TableId) -> Result<NodeId, CoreError> {
        let mut rows = Vec::with_capacity(frame.rows.len());
        for row in &frame.rows {
            if row.len() != frame.keys.len() {
                return Err(sentence_error(
                    frame.span, format!("frame row has {} value(s) for {} key(s)", row.len(), frame.keys.len())
                ));
            }
            let mut fields = Vec::with_capacity(row.len());
            for (key, slot) in frame.keys.iter().zip(row.iter()) {
                fields.push((key.text.clone(), self.slot_value(slot, table, frame.span)?));
            }
            rows.push(self.struct_literal(fields, table, frame.span));
        }
        Ok(self.tuple_literal(rows, table, frame.span))
    }

    fn annotate(&mut self, value: NodeId, tag: &TypeTag) -> Result<(), CoreError> {
        let declared = self.parse_type(tag)?;
        let current = self.out_type(value);
        if current.is_known() && !self.unit.lattice.fits_within(&current, &declared) {
            return Err(CoreError::new(
                ErrorKind::IncompatibleTypes, tag.span,
                format!("a value of type {} does not fit {}", current, declared)
            ));
        }
        self.unit.heap[value].out_type = declared;
        Ok(())
    }

    fn parse_load(&mut self, load: &LoadList, table: TableId) -> Result<NodeId, CoreError> {
        let paths: Vec<String> = load.paths.iter().map(|p| p.text.clone()).collect();
        self.unit.loader.load_modules(&paths)
            .map_err(|message| CoreError::new(ErrorKind::ModuleImport, load.span, message))?;
        for path in &paths {
            let imports = self.unit.loader.import_symbols(path, &[])
                .map_err(|message| CoreError::new(ErrorKind::ModuleImport, load.span, message))?;
            // Values only become available through 'from ... import'
            let imports = SymbolImports { values: Vec::new(), ..imports };
            self.declare_imports(imports, table, load.span)?;
        }
        log!(self.unit.logger, "loaded module(s) {}", paths.join(", "));
        Ok(self.alloc(table, load.span, BType::null(), TcKind::Load(paths)))
    }

    fn parse_from_import(&mut self, import: &FromImport, table: TableId) -> Result<NodeId, CoreError> {
        let path = import.path.text.clone();
        let names: Vec<String> = import.names.iter().map(|n| n.text.clone()).collect();
        self.unit.loader.load_modules(std::slice::from_ref(&path))
            .map_err(|message| CoreError::new(ErrorKind::ModuleImport, import.path.span, message))?;
        let imports = self.unit.loader.import_symbols(&path, &names)
            .map_err(|message| CoreError::new(ErrorKind::ModuleImport, import.span, message))?;
        self.declare_imports(imports, table, import.span)?;
        log!(self.unit.logger, "imported {} from '{}'", names.join(", "), path);
        Ok(self.alloc(table, import.span, BType::null(), TcKind::FromImport { path, names }))
    }

    fn declare_imports(&mut self, imports: SymbolImports, table: TableId, span: SrcSpan) -> Result<(), CoreError> {
        for decl in imports.types {
            self.unit.lattice.declare_atom(&decl.name, decl.parent.as_deref())
                .map_err(|message| CoreError::new(ErrorKind::ModuleImport, span, message))?;
            let global = self.unit.symbols.global;
            self.unit.symbols.def_type_meta(global, &decl.name, BType::atom(&decl.name), span)?;
        }
        for decl in imports.functions {
            let home = self.unit.symbols.def_function_meta(table, &decl.name, decl.style, Scope::Local, span)?;
            self.unit.symbols.bind_function(home, &decl.name, Implementation {
                sig: decl.sig,
                ret: decl.ret,
                target: FnImpl::Foreign(decl.func),
            }, span)?;
        }
        for (name, btype) in imports.values {
            self.unit.symbols.def_value_meta(table, &name, btype, Scope::Local, span)?;
        }
        Ok(())
    }
}
