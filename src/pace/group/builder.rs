use std::mem;

use crate::common::*;
use crate::pace::input_source::{CoreError, ErrorKind, SrcSpan};
use crate::pace::tokens::{Scope, Token, TokenStream, TokenTag};

use super::*;

/// A line break only continues a phrase when the next line is indented at
/// least this much deeper than the line the phrase started on.
pub const MIN_CONTINUATION_INDENT: u32 = 1;

macro_rules! debug_log {
    ($format:literal) => {
        enabled_debug_print!(false, "group", $format);
    };
    ($format:literal, $($args:expr),*) => {
        enabled_debug_print!(false, "group", $format, $($args),*);
    };
}

/// Separator bookkeeping shared by every group kind: phrases make up slots
/// (split by commas), slots make up rows (split by semicolons).
#[derive(Debug, Default)]
struct PhraseGrid {
    rows: Vec<Row>,
    row: Row,
    slot: Slot,
    phrase: Phrase,
    has_comma: bool,
    row_has_comma: bool,
    has_semicolon: bool,
}

impl PhraseGrid {
    fn push_item(&mut self, item: Item, indent: u32) {
        if self.phrase.is_empty() {
            self.phrase.indent = indent;
        }
        self.phrase.items.push(item);
    }

    fn end_phrase(&mut self) {
        let phrase = mem::take(&mut self.phrase);
        if !phrase.is_empty() {
            self.slot.push(phrase);
        }
    }

    fn end_slot(&mut self) {
        self.end_phrase();
        self.row.push(mem::take(&mut self.slot));
        self.has_comma = true;
        self.row_has_comma = true;
    }

    fn end_row(&mut self) {
        self.end_phrase();
        if !self.slot.is_empty() || self.row_has_comma {
            self.row.push(mem::take(&mut self.slot));
        }
        self.rows.push(mem::take(&mut self.row));
        self.row_has_comma = false;
        self.has_semicolon = true;
    }

    fn finish(&mut self) -> Vec<Row> {
        self.end_phrase();
        if self.row_has_comma || !self.slot.is_empty() {
            self.row.push(mem::take(&mut self.slot));
        }
        if !self.row.is_empty() || self.rows.is_empty() {
            self.rows.push(mem::take(&mut self.row));
        }
        mem::take(&mut self.rows)
    }

    fn is_continuation(&self, line_break: &Token) -> bool {
        !self.phrase.is_empty() && line_break.indent >= self.phrase.indent + MIN_CONTINUATION_INDENT
    }
}

#[derive(Debug)]
enum OpenState {
    Snippet,
    TupleOrParen,
    Func {
        doubled: bool,
        // `Some` for `{[`, together with whether a name is expected next
        params: Option<Vec<Param>>,
        params_open: bool,
        expect_name: bool,
        await_ret: bool,
        ret_type: Option<TypeTag>,
    },
    Block,
    Frame { keys: Vec<Token>, keys_open: bool, expect_key: bool },
    Load { paths: Vec<Token>, expect_path: bool },
    FromImport { path: Option<Token>, names: Vec<Token>, saw_import: bool, expect_name: bool },
    KeywordCall { keywords: Vec<Token>, parts: Vec<Phrase>, lead_indent: u32 },
    TypeTag { text: String },
}

#[derive(Debug)]
struct OpenGroup {
    state: OpenState,
    opener: Option<Token>,
    grid: PhraseGrid,
}

impl OpenGroup {
    fn new(state: OpenState, opener: Option<Token>) -> Self {
        Self { state, opener, grid: PhraseGrid::default() }
    }

    fn kind(&self) -> GroupKind {
        match self.state {
            OpenState::Snippet => GroupKind::Snippet,
            OpenState::TupleOrParen => GroupKind::TupleOrParen,
            OpenState::Func { .. } => GroupKind::FuncOrStruct,
            OpenState::Block => GroupKind::Block,
            OpenState::Frame { .. } => GroupKind::Frame,
            OpenState::Load { .. } => GroupKind::Load,
            OpenState::FromImport { .. } => GroupKind::FromImport,
            OpenState::KeywordCall { .. } => GroupKind::KeywordCall,
            OpenState::TypeTag { .. } => GroupKind::TypeTag,
        }
    }

    fn opener_span(&self) -> SrcSpan {
        self.opener.as_ref().map(|t| t.span).unwrap_or_default()
    }

    fn opener_indent(&self) -> u32 {
        self.opener.as_ref().map(|t| t.indent).unwrap_or(0)
    }

    fn opener_text(&self) -> String {
        self.opener.as_ref().map(|t| t.render()).unwrap_or_default()
    }

    fn expected_closer(&self) -> Option<TokenTag> {
        match &self.state {
            OpenState::TupleOrParen => Some(TokenTag::RParen),
            OpenState::Block => Some(TokenTag::RBracket),
            OpenState::Func { params_open: true, .. } => Some(TokenTag::RBracket),
            OpenState::Func { doubled: true, .. } => Some(TokenTag::RBraceBrace),
            OpenState::Func { .. } => Some(TokenTag::RBrace),
            OpenState::Frame { keys_open: true, .. } => Some(TokenTag::RBracket),
            OpenState::Frame { .. } => Some(TokenTag::RParen),
            _ => None,
        }
    }
}

/// Where an incoming token goes, decided before mutating the stack.
enum Route {
    TypeTag,
    ImportList,
    CloseAuto,
    KeywordPart,
    Ignore,
    Param,
    FrameKey,
    EndRetType,
    Generic,
}

fn ends_import_list(tag: TokenTag) -> bool {
    match tag {
        TokenTag::Dot | TokenTag::LineBreak | TokenTag::Semicolon => true,
        tag => tag.is_closer(),
    }
}

fn grouping_error<S: ToString>(span: SrcSpan, message: S) -> CoreError {
    CoreError::new(ErrorKind::Grouping, span, message)
}

/// Stack machine turning a token stream into a `Snippet`. The top of the stack
/// is the innermost open group, every token is handed to it.
pub struct GroupBuilder<'l> {
    stack: Vec<OpenGroup>,
    max_depth: usize,
    logger: &'l mut dyn Logger,
}

impl<'l> GroupBuilder<'l> {
    pub fn new(max_depth: usize, logger: &'l mut dyn Logger) -> Self {
        Self { stack: Vec::with_capacity(32), max_depth, logger }
    }

    pub fn build(&mut self, stream: &TokenStream) -> Result<Snippet, CoreError> {
        self.stack.clear();
        self.stack.push(OpenGroup::new(OpenState::Snippet, None));

        for token in stream.tokens.iter() {
            self.consume(token.clone())?;
        }

        let snippet = self.finish()?;
        log!(self.logger, "grouped '{}' into {} phrase(s)", stream.filename, snippet.phrases.len());
        Ok(snippet)
    }

    fn top(&mut self) -> Result<&mut OpenGroup, CoreError> {
        match self.stack.last_mut() {
            Some(top) => Ok(top),
            None => Err(CoreError::internal(SrcSpan::default(), "group stack is empty")),
        }
    }

    fn consume(&mut self, token: Token) -> Result<(), CoreError> {
        loop {
            let route = {
                let top = self.top()?;
                match &top.state {
                    OpenState::TypeTag { .. } => Route::TypeTag,
                    OpenState::Load { .. } | OpenState::FromImport { .. } => {
                        if ends_import_list(token.tag) { Route::CloseAuto } else { Route::ImportList }
                    },
                    OpenState::KeywordCall { lead_indent, .. } => match token.tag {
                        TokenTag::Keyword => Route::KeywordPart,
                        TokenTag::LineBreak if token.indent >= *lead_indent + MIN_CONTINUATION_INDENT => Route::Ignore,
                        TokenTag::Dot | TokenTag::LineBreak | TokenTag::Comma | TokenTag::Semicolon => Route::CloseAuto,
                        tag if tag.is_closer() => Route::CloseAuto,
                        _ => Route::Generic,
                    },
                    OpenState::Func { params_open: true, .. } => Route::Param,
                    OpenState::Func { await_ret: true, .. } => {
                        if token.tag == TokenTag::LTypeTag { Route::Generic } else { Route::EndRetType }
                    },
                    OpenState::Frame { keys_open: true, .. } => Route::FrameKey,
                    _ => Route::Generic,
                }
            };

            match route {
                Route::TypeTag => return self.consume_type_tag(token),
                Route::ImportList => return self.consume_import_token(token),
                Route::CloseAuto => {
                    self.close_auto_group()?;
                    // The terminating token belongs to the parent as well
                    continue;
                },
                Route::KeywordPart => return self.continue_keyword_call(token),
                Route::Ignore => return Ok(()),
                Route::Param => return self.consume_param(token),
                Route::FrameKey => return self.consume_frame_key(token),
                Route::EndRetType => {
                    if let OpenState::Func { await_ret, .. } = &mut self.top()?.state {
                        *await_ret = false;
                    }
                    return self.consume_generic(token);
                },
                Route::Generic => return self.consume_generic(token),
            }
        }
    }

    fn consume_generic(&mut self, token: Token) -> Result<(), CoreError> {
        if token.tag.is_opener() {
            return self.open_group(token);
        }
        if token.tag.is_closer() {
            return self.close_group(token);
        }

        match token.tag {
            TokenTag::Dot => self.top()?.grid.end_phrase(),
            TokenTag::LineBreak => {
                let top = self.top()?;
                if !top.grid.is_continuation(&token) {
                    top.grid.end_phrase();
                }
            },
            TokenTag::Comma => self.consume_comma(token)?,
            TokenTag::Semicolon => self.consume_semicolon(token)?,
            TokenTag::Keyword => self.start_keyword_call(token)?,
            TokenTag::Load | TokenTag::From => {
                if !self.top()?.grid.phrase.is_empty() {
                    return Err(grouping_error(token.span, format!("'{}' must start a phrase", token.text)));
                }
                let state = if token.tag == TokenTag::Load {
                    OpenState::Load { paths: Vec::new(), expect_path: true }
                } else {
                    OpenState::FromImport { path: None, names: Vec::new(), saw_import: false, expect_name: false }
                };
                self.push_group(state, token)?;
            },
            TokenTag::Import => {
                return Err(grouping_error(token.span, "'import' without a preceding 'from'"));
            },
            _ => {
                let indent = token.indent;
                self.top()?.grid.push_item(Item::Token(token), indent);
            },
        }

        Ok(())
    }

    fn push_group(&mut self, state: OpenState, opener: Token) -> Result<(), CoreError> {
        if self.stack.len() >= self.max_depth {
            return Err(grouping_error(
                opener.span, format!("groups are nested too deeply (the limit is {})", self.max_depth)
            ));
        }
        debug_log!("open {:?} at {}", opener.tag, opener.span.begin);
        self.stack.push(OpenGroup::new(state, Some(opener)));
        Ok(())
    }

    fn open_group(&mut self, token: Token) -> Result<(), CoreError> {
        let state = match token.tag {
            TokenTag::LParen => OpenState::TupleOrParen,
            TokenTag::LBracket => OpenState::Block,
            TokenTag::LBrace | TokenTag::LBraceBrace | TokenTag::LBraceBracket => {
                let declares_params = token.tag == TokenTag::LBraceBracket;
                OpenState::Func {
                    doubled: token.tag == TokenTag::LBraceBrace,
                    params: if declares_params { Some(Vec::new()) } else { None },
                    params_open: declares_params,
                    expect_name: declares_params,
                    await_ret: false,
                    ret_type: None,
                }
            },
            TokenTag::LParenBracket => OpenState::Frame { keys: Vec::new(), keys_open: true, expect_key: true },
            TokenTag::LTypeTag => OpenState::TypeTag { text: String::new() },
            _ => return Err(CoreError::internal(token.span, "opening a group on a non-opener token")),
        };
        self.push_group(state, token)
    }

    fn close_group(&mut self, token: Token) -> Result<(), CoreError> {
        if self.stack.len() <= 1 {
            return Err(grouping_error(
                token.span, format!("unexpected '{}' without a matching opener", token.render())
            ));
        }

        {
            let top = self.top()?;
            let expected = match top.expected_closer() {
                Some(expected) => expected,
                None => return Err(CoreError::internal(token.span, "closing a group that has no closer")),
            };
            if token.tag != expected {
                let expected_text = expected.token_chars().unwrap_or("?");
                return Err(grouping_error(
                    token.span,
                    format!("expected '{}' to close the {}, found '{}'", expected_text, top.kind(), token.render())
                ).with_info(top.opener_span(), format!("the {} was opened here with '{}'", top.kind(), top.opener_text())));
            }

            // Closing a parameter or key list keeps the group open
            match &mut top.state {
                OpenState::Func { params_open, expect_name, params, await_ret, .. } if *params_open => {
                    let num_params = params.as_ref().map_or(0, |p| p.len());
                    if *expect_name && num_params != 0 {
                        return Err(grouping_error(token.span, "malformed parameter list: expected a name after ','"));
                    }
                    *params_open = false;
                    *await_ret = true;
                    return Ok(());
                },
                OpenState::Frame { keys_open, keys, expect_key } if *keys_open => {
                    if keys.is_empty() || *expect_key {
                        return Err(grouping_error(token.span, "malformed frame key list: expected a key name"));
                    }
                    *keys_open = false;
                    return Ok(());
                },
                _ => {},
            }
        }

        let open = match self.stack.pop() {
            Some(open) => open,
            None => return Err(CoreError::internal(token.span, "group stack is empty")),
        };
        let indent = open.opener_indent();
        let group = Self::finalize(open, &token)?;
        self.accept_child(group, indent)
    }

    fn accept_child(&mut self, group: Group, indent: u32) -> Result<(), CoreError> {
        let OpenGroup { state, grid, .. } = self.top()?;
        match (state, group) {
            (OpenState::Func { params: Some(params), params_open: true, .. }, Group::TypeTag(tag)) => {
                match params.last_mut() {
                    Some(param) if param.type_tag.is_none() => param.type_tag = Some(tag),
                    _ => return Err(grouping_error(tag.span, "malformed parameter list: type without a parameter")),
                }
            },
            (OpenState::Func { await_ret, ret_type, .. }, Group::TypeTag(tag)) if *await_ret => {
                *ret_type = Some(tag);
                *await_ret = false;
            },
            (_, group) => grid.push_item(Item::Group(group), indent),
        }
        Ok(())
    }

    fn consume_comma(&mut self, token: Token) -> Result<(), CoreError> {
        let top = self.top()?;
        match &top.state {
            OpenState::TupleOrParen | OpenState::Frame { .. } => top.grid.end_slot(),
            OpenState::Func { doubled: false, params: None, .. } => {
                top.grid.end_phrase();
                let slot = &top.grid.slot;
                if slot.len() != 1 || !slot[0].is_field() {
                    return Err(grouping_error(
                        token.span, "a ',' inside '{...}' must follow exactly one 'name: value' field"
                    ));
                }
                top.grid.end_slot();
            },
            _ => {
                return Err(grouping_error(token.span, format!("illegal separator ',' in {}", top.kind())));
            },
        }
        Ok(())
    }

    fn consume_semicolon(&mut self, token: Token) -> Result<(), CoreError> {
        let top = self.top()?;
        match &top.state {
            OpenState::TupleOrParen | OpenState::Frame { .. } => top.grid.end_row(),
            _ => {
                return Err(grouping_error(token.span, format!("illegal separator ';' in {}", top.kind())));
            },
        }
        Ok(())
    }

    fn consume_param(&mut self, token: Token) -> Result<(), CoreError> {
        if token.tag.is_closer() {
            return self.close_group(token);
        }
        if token.tag == TokenTag::LineBreak {
            return Ok(());
        }

        let mut opens_type = false;
        if let OpenState::Func { params: Some(params), expect_name, .. } = &mut self.top()?.state {
            match token.tag {
                TokenTag::Name(Scope::Local) if *expect_name && !token.text.contains('.') => {
                    params.push(Param { name: token, type_tag: None });
                    *expect_name = false;
                    return Ok(());
                },
                TokenTag::Comma if !*expect_name => {
                    *expect_name = true;
                    return Ok(());
                },
                TokenTag::LTypeTag if !*expect_name => opens_type = true,
                _ => {},
            }
        }

        if opens_type {
            return self.open_group(token);
        }
        Err(grouping_error(token.span, format!("malformed parameter list: unexpected '{}'", token.render())))
    }

    fn consume_frame_key(&mut self, token: Token) -> Result<(), CoreError> {
        if token.tag.is_closer() {
            return self.close_group(token);
        }
        if token.tag == TokenTag::LineBreak {
            return Ok(());
        }

        if let OpenState::Frame { keys, expect_key, .. } = &mut self.top()?.state {
            match token.tag {
                TokenTag::Name(Scope::Local) if *expect_key => {
                    keys.push(token);
                    *expect_key = false;
                    return Ok(());
                },
                TokenTag::Comma if !*expect_key => {
                    *expect_key = true;
                    return Ok(());
                },
                _ => {},
            }
        }
        Err(grouping_error(token.span, format!("malformed frame key list: unexpected '{}'", token.render())))
    }

    fn consume_type_tag(&mut self, token: Token) -> Result<(), CoreError> {
        match token.tag {
            TokenTag::SymbolicName if token.text == ">" => {
                let open = match self.stack.pop() {
                    Some(open) => open,
                    None => return Err(CoreError::internal(token.span, "group stack is empty")),
                };
                let indent = open.opener_indent();
                let span = open.opener_span().merge(token.span);
                let text = match open.state {
                    OpenState::TypeTag { text } => text,
                    _ => return Err(CoreError::internal(token.span, "type tag state expected")),
                };
                if text.is_empty() {
                    return Err(grouping_error(span, "empty type tag"));
                }
                self.accept_child(Group::TypeTag(TypeTag { text, span }), indent)
            },
            TokenTag::LineBreak | TokenTag::Dot => {
                let top = self.top()?;
                Err(grouping_error(top.opener_span(), "unterminated type tag, expected '>'"))
            },
            _ => {
                if let OpenState::TypeTag { text } = &mut self.top()?.state {
                    text.push_str(&token.render());
                }
                Ok(())
            },
        }
    }

    fn consume_import_token(&mut self, token: Token) -> Result<(), CoreError> {
        let top = self.top()?;
        let kind = top.kind();
        let accepted = match &mut top.state {
            OpenState::Load { paths, expect_path } => match token.tag {
                TokenTag::Name(Scope::Local) if *expect_path => {
                    paths.push(token.clone());
                    *expect_path = false;
                    true
                },
                TokenTag::Comma if !*expect_path => {
                    *expect_path = true;
                    true
                },
                _ => false,
            },
            OpenState::FromImport { path, names, saw_import, expect_name } => match token.tag {
                TokenTag::Name(Scope::Local) if path.is_none() => {
                    *path = Some(token.clone());
                    true
                },
                TokenTag::Import if path.is_some() && !*saw_import => {
                    *saw_import = true;
                    *expect_name = true;
                    true
                },
                TokenTag::Name(Scope::Local) if *saw_import && *expect_name => {
                    names.push(token.clone());
                    *expect_name = false;
                    true
                },
                TokenTag::Comma if *saw_import && !*expect_name => {
                    *expect_name = true;
                    true
                },
                _ => false,
            },
            _ => false,
        };

        if accepted {
            Ok(())
        } else {
            Err(grouping_error(token.span, format!("malformed {}: unexpected '{}'", kind, token.render())))
        }
    }

    fn start_keyword_call(&mut self, keyword: Token) -> Result<(), CoreError> {
        let top = self.top()?;
        let phrase = &mut top.grid.phrase;
        let num_assignments = phrase.items.iter()
            .take_while(|item| match item {
                Item::Token(Token { tag: TokenTag::AssignLeft(_), .. }) => true,
                _ => false,
            })
            .count();
        let receiver_items = phrase.items.split_off(num_assignments);
        if receiver_items.is_empty() {
            return Err(grouping_error(
                keyword.span, format!("keyword '{}' needs a value in front of it", keyword.text)
            ));
        }
        let lead_indent = phrase.indent;
        let receiver = Phrase { items: receiver_items, indent: lead_indent };

        debug_log!("keyword call starting with '{}'", keyword.text);
        self.push_group(
            OpenState::KeywordCall { keywords: vec![keyword.clone()], parts: vec![receiver], lead_indent },
            keyword,
        )
    }

    fn continue_keyword_call(&mut self, keyword: Token) -> Result<(), CoreError> {
        let top = self.top()?;
        let part = mem::take(&mut top.grid.phrase);
        if let OpenState::KeywordCall { keywords, parts, .. } = &mut top.state {
            if part.is_empty() {
                let previous = keywords.last().map(|k| k.text.clone()).unwrap_or_default();
                return Err(grouping_error(
                    keyword.span, format!("keyword '{}' is missing its argument", previous)
                ));
            }
            parts.push(part);
            keywords.push(keyword);
        }
        Ok(())
    }

    /// Closes a group that ends with its phrase instead of with a bracket.
    fn close_auto_group(&mut self) -> Result<(), CoreError> {
        let mut open = match self.stack.pop() {
            Some(open) => open,
            None => return Err(CoreError::internal(SrcSpan::default(), "group stack is empty")),
        };
        let opener_span = open.opener_span();
        let indent = open.opener_indent();

        match open.state {
            OpenState::KeywordCall { keywords, mut parts, lead_indent } => {
                let last = mem::take(&mut open.grid.phrase);
                if last.is_empty() {
                    let keyword = keywords.last().map(|k| k.text.clone()).unwrap_or_default();
                    return Err(grouping_error(
                        opener_span, format!("keyword '{}' is missing its argument", keyword)
                    ));
                }
                parts.push(last);
                self.substitute_keyword_call(keywords, parts, lead_indent)
            },
            OpenState::Load { paths, expect_path } => {
                if paths.is_empty() || expect_path {
                    return Err(grouping_error(opener_span, "unterminated load, expected a module path"));
                }
                let span = paths.iter().fold(opener_span, |span, p| span.merge(p.span));
                self.accept_child(Group::Load(LoadList { paths, span }), indent)
            },
            OpenState::FromImport { path, names, saw_import, expect_name } => {
                let path = match path {
                    Some(path) if saw_import && !expect_name && !names.is_empty() => path,
                    _ => return Err(grouping_error(
                        opener_span, "unterminated from-import, expected 'from path import name, ...'"
                    )),
                };
                let span = names.iter().fold(opener_span.merge(path.span), |span, n| span.merge(n.span));
                self.accept_child(Group::FromImport(FromImport { path, names, span }), indent)
            },
            _ => Err(CoreError::internal(opener_span, "auto-closing a bracketed group")),
        }
    }

    /// Replaces `a kw1: b kw2: c` with `kw1:kw2:(a, b, c)` in the parent's
    /// current phrase.
    fn substitute_keyword_call(&mut self, keywords: Vec<Token>, parts: Vec<Phrase>, lead_indent: u32) -> Result<(), CoreError> {
        let name: String = keywords.iter().map(|k| k.text.as_str()).collect();
        let name_span = keywords.iter().fold(keywords[0].span, |span, k| span.merge(k.span));
        let span = parts.iter().fold(name_span, |span, p| span.merge(p.span()));
        debug_log!("rewrote keyword call into '{}' with {} argument(s)", name, parts.len());

        let name_token = Token::synthetic(TokenTag::Name(Scope::Local), name, name_span, lead_indent);
        let args = TupleOrParen {
            shape: TupleShape::classify(false, true, 0, parts.len()),
            rows: vec![parts.into_iter().map(|p| vec![p]).collect()],
            span,
        };

        let grid = &mut self.top()?.grid;
        grid.push_item(Item::Token(name_token), lead_indent);
        grid.push_item(Item::Group(Group::TupleOrParen(args)), lead_indent);
        Ok(())
    }

    fn finalize(mut open: OpenGroup, closer: &Token) -> Result<Group, CoreError> {
        let span = open.opener_span().merge(closer.span);
        let has_semicolon = open.grid.has_semicolon;
        let has_comma = open.grid.has_comma;
        let mut rows = open.grid.finish();

        match open.state {
            OpenState::TupleOrParen => {
                let num_empty = rows.iter().flat_map(|r| r.iter()).filter(|s| s.is_empty()).count();
                let num_phrases = rows.iter().flat_map(|r| r.iter()).map(|s| s.len()).sum();
                let shape = TupleShape::classify(has_semicolon, has_comma, num_empty, num_phrases);
                if shape == TupleShape::Grid {
                    rows.retain(|row| !row.is_empty());
                    if num_empty != 0 {
                        return Err(grouping_error(span, "grid rows cannot contain empty slots"));
                    }
                }
                Ok(Group::TupleOrParen(TupleOrParen { shape, rows, span }))
            },
            OpenState::Func { doubled, params, ret_type, .. } => {
                let slots = rows.into_iter().next().unwrap_or_default();
                let content = if has_comma {
                    let last_idx = slots.len() - 1;
                    let mut fields = Vec::with_capacity(slots.len());
                    for (slot_idx, mut slot) in slots.into_iter().enumerate() {
                        if slot.is_empty() && slot_idx == last_idx {
                            continue;
                        }
                        if slot.len() != 1 || !slot[0].is_field() {
                            let slot_span = slot.first().map(|p| p.span()).unwrap_or(span);
                            return Err(grouping_error(slot_span, "struct fields must each be a single 'name: value'"));
                        }
                        fields.push(slot.remove(0));
                    }
                    FuncOrStructContent::Struct(fields)
                } else {
                    FuncOrStructContent::Function(FuncLiteral {
                        params,
                        ret_type,
                        body: slots.into_iter().flatten().collect(),
                    })
                };
                Ok(Group::FuncOrStruct(FuncOrStruct { doubled, content, span }))
            },
            OpenState::Block => {
                let body = rows.into_iter().flatten().flatten().collect();
                Ok(Group::Block(BlockLiteral { body, span }))
            },
            OpenState::Frame { keys, .. } => {
                rows.retain(|row| !row.is_empty());
                for row in rows.iter() {
                    let row_span = row.iter().flat_map(|s| s.iter()).fold(None, |acc: Option<SrcSpan>, p| {
                        Some(acc.map_or(p.span(), |s| s.merge(p.span())))
                    }).unwrap_or(span);
                    if row.len() != keys.len() {
                        return Err(grouping_error(
                            row_span, format!("frame row has {} value(s) for {} key(s)", row.len(), keys.len())
                        ));
                    }
                    if row.iter().any(|slot| slot.len() != 1) {
                        return Err(grouping_error(row_span, "every frame cell must hold exactly one phrase"));
                    }
                }
                Ok(Group::Frame(FrameLiteral { keys, rows, span }))
            },
            _ => Err(CoreError::internal(span, "finalizing a group without brackets")),
        }
    }

    fn finish(&mut self) -> Result<Snippet, CoreError> {
        loop {
            let top = self.top()?;
            match top.kind() {
                GroupKind::Snippet => break,
                GroupKind::KeywordCall | GroupKind::Load | GroupKind::FromImport => self.close_auto_group()?,
                GroupKind::TypeTag => {
                    return Err(grouping_error(top.opener_span(), "unterminated type tag, expected '>'"));
                },
                kind => {
                    return Err(grouping_error(
                        top.opener_span(), format!("the {} opened with '{}' is never closed", kind, top.opener_text())
                    ));
                },
            }
        }

        let mut root = match self.stack.pop() {
            Some(root) => root,
            None => return Err(CoreError::internal(SrcSpan::default(), "group stack is empty")),
        };
        let phrases: Vec<Phrase> = root.grid.finish().into_iter().flatten().flatten().collect();
        let span = match (phrases.first(), phrases.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => SrcSpan::default(),
        };
        Ok(Snippet { phrases, span })
    }
}
