use crate::pace::{
    ast::*,
    group::*,
    inference::DeferredInference,
    input_source::*,
    loader::InMemoryLoader,
    tokens::*,
    CompilationUnit, PaceOptions, PaceOutcome,
};
use crate::pace::eval::Value;
use crate::logging::VecLogger;

//------------------------------------------------------------------------------
// Test tokenizer
//------------------------------------------------------------------------------

const SYMBOL_CHARS: &str = "+-*/<>=!&|%^~?";

fn is_name_start(c: Option<char>) -> bool {
    c.map_or(false, |c| c.is_alphabetic())
}

/// Stand-in for the lexer, just enough to write tests as source text. Panics
/// on anything it does not understand.
struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    // Indentation of the line currently being read
    indent: u32,
    tokens: Vec<Token>,
    brackets: Vec<TokenTag>,
    // Index of the `]` closing the last parameter or key list
    list_closed_at: Option<usize>,
}

impl Tokenizer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            indent: 0,
            tokens: Vec::new(),
            brackets: Vec::new(),
            list_closed_at: None,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> InputPosition {
        InputPosition::new(self.line, self.column)
    }

    fn push(&mut self, tag: TokenTag, text: String, begin: InputPosition) {
        let span = SrcSpan::from_positions(begin, self.position());
        self.tokens.push(Token::new(tag, text, span, self.indent));
    }

    fn at_phrase_start(&self) -> bool {
        match self.tokens.len() {
            0 => true,
            len => self.starts_phrase_after(len - 1),
        }
    }

    /// Whether a phrase starts right after the token at `idx`. A line break
    /// only starts one when the next line is not indented deeper, or when the
    /// line before it ended at a phrase start anyway.
    fn starts_phrase_after(&self, idx: usize) -> bool {
        use TokenTag as TT;
        let token = &self.tokens[idx];
        match token.tag {
            TT::Dot | TT::Comma | TT::Semicolon |
            TT::LParen | TT::LBracket | TT::LBrace | TT::LBraceBrace => true,
            TT::RBracket => self.list_closed_at == Some(idx),
            TT::LineBreak => match idx.checked_sub(1) {
                None => true,
                Some(before) => {
                    self.starts_phrase_after(before)
                        || token.indent < self.tokens[before].indent + MIN_CONTINUATION_INDENT
                },
            },
            _ => false,
        }
    }

    /// Skips indentation and blank lines. Returns the indentation of the next
    /// line with content, `None` at the end of the input.
    fn measure_indent(&mut self) -> Option<u32> {
        loop {
            let mut indent = 0;
            while let Some(c) = self.peek(0) {
                if c != ' ' && c != '\t' {
                    break;
                }
                self.advance();
                indent += 1;
            }
            match self.peek(0) {
                Some('\n') => { self.advance(); },
                Some(_) => return Some(indent),
                None => return None,
            }
        }
    }

    fn run(mut self) -> Vec<Token> {
        if let Some(indent) = self.measure_indent() {
            self.indent = indent;
        }

        while let Some(c) = self.peek(0) {
            let begin = self.position();
            match c {
                '\n' => self.line_break(begin),
                ' ' | '\t' | '\r' => { self.advance(); },
                '"' => self.text(begin),
                '0'..='9' => self.number(begin),
                '.' => self.dot_or_sigil(begin),
                '_' => self.name(begin),
                ':' => self.assign_right(begin),
                '(' | '[' | '{' => self.opener(begin),
                ')' | ']' | '}' => self.closer(begin),
                ',' => {
                    self.advance();
                    self.push(TokenTag::Comma, ",".to_string(), begin);
                },
                ';' => {
                    self.advance();
                    self.push(TokenTag::Semicolon, ";".to_string(), begin);
                },
                c if c.is_alphabetic() => self.name(begin),
                c if SYMBOL_CHARS.contains(c) => self.symbolic(begin),
                other => panic!("test tokenizer: unexpected character '{}' at {}", other, begin),
            }
        }
        self.tokens
    }

    fn line_break(&mut self, begin: InputPosition) {
        self.advance();
        if let Some(indent) = self.measure_indent() {
            self.indent = indent;
            if !self.tokens.is_empty() {
                let span = SrcSpan::from_positions(begin, begin);
                self.tokens.push(Token::new(TokenTag::LineBreak, "\n", span, indent));
            }
        }
    }

    fn text(&mut self, begin: InputPosition) {
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) => text.push(c),
                None => panic!("test tokenizer: unterminated text starting at {}", begin),
            }
        }
        self.push(TokenTag::Text, text, begin);
    }

    fn number(&mut self, begin: InputPosition) {
        let mut text = String::new();
        let mut tag = TokenTag::Int;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '.' && tag == TokenTag::Int && self.peek(1).map_or(false, |d| d.is_ascii_digit()) {
                tag = TokenTag::Num;
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.push(tag, text, begin);
    }

    fn name_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else if c == '.' && !text.is_empty() && is_name_start(self.peek(1)) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    /// Reads a scope sigil, if any, in front of a name.
    fn sigil(&mut self) -> Scope {
        match (self.peek(0), self.peek(1), self.peek(2)) {
            (Some('_'), Some('_'), c) if is_name_start(c) => { self.advance(); self.advance(); Scope::Global },
            (Some('_'), c, _) if is_name_start(c) => { self.advance(); Scope::Context },
            (Some('.'), Some('.'), c) if is_name_start(c) => { self.advance(); self.advance(); Scope::Module },
            (Some('.'), c, _) if is_name_start(c) => { self.advance(); Scope::Parent },
            _ => Scope::Local,
        }
    }

    fn name(&mut self, begin: InputPosition) {
        let scope = self.sigil();
        let text = self.name_text();
        if text.is_empty() {
            panic!("test tokenizer: expected a name at {}", begin);
        }

        if self.peek(0) == Some(':') {
            self.advance();
            if self.at_phrase_start() {
                self.push(TokenTag::AssignLeft(scope), text, begin);
            } else {
                self.push(TokenTag::Keyword, format!("{}:", text), begin);
            }
            return;
        }

        let tag = match (scope, text.as_str()) {
            (Scope::Local, "load") => TokenTag::Load,
            (Scope::Local, "from") => TokenTag::From,
            (Scope::Local, "import") => TokenTag::Import,
            _ => TokenTag::Name(scope),
        };
        self.push(tag, text, begin);
    }

    fn dot_or_sigil(&mut self, begin: InputPosition) {
        let follows_value = self.pos.checked_sub(1)
            .and_then(|prev| self.chars.get(prev))
            .map_or(false, |c| c.is_alphanumeric() || ")]}\"".contains(*c));
        let starts_name = is_name_start(self.peek(1))
            || (self.peek(1) == Some('.') && is_name_start(self.peek(2)));
        if !follows_value && starts_name {
            self.name(begin);
        } else {
            self.advance();
            self.push(TokenTag::Dot, ".".to_string(), begin);
        }
    }

    fn assign_right(&mut self, begin: InputPosition) {
        self.advance();
        let scope = self.sigil();
        let text = self.name_text();
        if text.is_empty() {
            panic!("test tokenizer: expected a name after ':' at {}", begin);
        }
        self.push(TokenTag::AssignRight(scope), text, begin);
    }

    fn symbolic(&mut self, begin: InputPosition) {
        if self.peek(0) == Some('<') && self.peek(1) == Some(':') {
            self.advance();
            self.advance();
            self.push(TokenTag::LTypeTag, "<:".to_string(), begin);
            return;
        }
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if !SYMBOL_CHARS.contains(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.push(TokenTag::SymbolicName, text, begin);
    }

    fn opener(&mut self, begin: InputPosition) {
        let first = self.advance();
        let tag = match (first, self.peek(0)) {
            (Some('('), Some('[')) => { self.advance(); TokenTag::LParenBracket },
            (Some('('), _) => TokenTag::LParen,
            (Some('{'), Some('{')) => { self.advance(); TokenTag::LBraceBrace },
            (Some('{'), Some('[')) => { self.advance(); TokenTag::LBraceBracket },
            (Some('{'), _) => TokenTag::LBrace,
            _ => TokenTag::LBracket,
        };
        self.brackets.push(tag);
        let text = tag.token_chars().unwrap_or("").to_string();
        self.push(tag, text, begin);
    }

    fn closer(&mut self, begin: InputPosition) {
        let first = self.advance();
        let open = self.brackets.pop();
        let tag = match first {
            Some(')') => TokenTag::RParen,
            Some(']') => {
                // A closed parameter or key list leaves its group open
                match open {
                    Some(TokenTag::LBraceBracket) => {
                        self.brackets.push(TokenTag::LBrace);
                        self.list_closed_at = Some(self.tokens.len());
                    },
                    Some(TokenTag::LParenBracket) => self.brackets.push(TokenTag::LParen),
                    _ => {},
                }
                TokenTag::RBracket
            },
            _ => {
                if open == Some(TokenTag::LBraceBrace) && self.peek(0) == Some('}') {
                    self.advance();
                    TokenTag::RBraceBrace
                } else {
                    TokenTag::RBrace
                }
            },
        };
        let text = tag.token_chars().unwrap_or("").to_string();
        self.push(tag, text, begin);
    }
}

pub(crate) fn tokenize(filename: &str, source: &str) -> TokenStream {
    TokenStream::new(filename, Tokenizer::new(source).run()).with_source(source)
}

/// Line and column of the first occurrence of `pattern` in `source`.
fn find_position(source: &str, pattern: &str) -> Option<InputPosition> {
    let offset = source.find(pattern)?;
    let before = &source[..offset];
    let line = before.matches('\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    let column = before[line_start..].chars().count() as u32 + 1;
    Some(InputPosition::new(line, column))
}

//------------------------------------------------------------------------------
// Interface for grouping and running
//------------------------------------------------------------------------------

pub(crate) struct Tester {
    test_name: String,
    sources: Vec<String>,
    options: PaceOptions,
    loader: Option<InMemoryLoader>,
    deferred_inference: bool,
}

impl Tester {
    /// Constructs a new tester. Multiple sources are joined into a single
    /// module, one after the other.
    pub(crate) fn new<S: ToString>(test_name: S) -> Self {
        Self {
            test_name: test_name.to_string(),
            sources: Vec::new(),
            options: PaceOptions::default(),
            loader: None,
            deferred_inference: false,
        }
    }

    /// Utility for quick tests that run a single source and expect it to
    /// succeed.
    pub(crate) fn new_single_source_expect_ok<T: ToString, S: ToString>(test_name: T, source: S) -> RunOkTester {
        Self::new(test_name)
            .with_source(source)
            .run()
            .expect_ok()
    }

    /// Utility for quick tests that run a single source and expect it to
    /// fail.
    pub(crate) fn new_single_source_expect_err<T: ToString, S: ToString>(test_name: T, source: S) -> ErrTester {
        Self::new(test_name)
            .with_source(source)
            .run()
            .expect_err()
    }

    pub(crate) fn with_source<S: ToString>(mut self, source: S) -> Self {
        self.sources.push(source.to_string());
        self
    }

    pub(crate) fn with_options(mut self, options: PaceOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn with_loader(mut self, loader: InMemoryLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Leaves every function without a fully declared signature pending.
    pub(crate) fn with_deferred_inference(mut self) -> Self {
        self.deferred_inference = true;
        self
    }

    fn source(&self) -> String {
        self.sources.join("\n")
    }

    fn unit(self) -> (String, String, CompilationUnit) {
        let source = self.source();
        let mut unit = CompilationUnit::new(self.options).with_logger(VecLogger::new(0));
        if let Some(loader) = self.loader {
            unit = unit.with_loader(loader);
        }
        if self.deferred_inference {
            unit = unit.with_inference(DeferredInference);
        }
        (self.test_name, source, unit)
    }

    /// Only groups the sources.
    pub(crate) fn group(self) -> TesterResult<GroupOkTester> {
        let (test_name, source, mut unit) = self.unit();
        let tokens = tokenize("main", &source);
        let result = match unit.group(&tokens) {
            Ok(snippet) => Ok(GroupOkTester { test_name: test_name.clone(), snippet }),
            Err(error) => Err(ErrTester { test_name: test_name.clone(), source, error, report: Vec::new() }),
        };
        TesterResult { test_name, result }
    }

    /// Groups, parses and executes the sources.
    pub(crate) fn run(self) -> TesterResult<RunOkTester> {
        let (test_name, source, mut unit) = self.unit();
        let tokens = tokenize("main", &source);
        let mut outcome = unit.pace(&tokens);
        let result = match outcome.error.take() {
            Some(error) => Err(ErrTester {
                test_name: test_name.clone(),
                source,
                error,
                report: std::mem::take(&mut outcome.report),
            }),
            None => Ok(RunOkTester { test_name: test_name.clone(), unit, outcome }),
        };
        TesterResult { test_name, result }
    }
}

pub(crate) struct TesterResult<T> {
    test_name: String,
    result: Result<T, ErrTester>,
}

impl<T> TesterResult<T> {
    pub(crate) fn expect_ok(self) -> T {
        match self.result {
            Ok(ok) => ok,
            Err(err) => {
                println!("DEBUG: Full error:\n{}", err.error.render(&InputSource::new("main".to_string(), &err.source)));
                assert!(
                    false,
                    "[{}] Expected the run to succeed, but it failed with {}",
                    self.test_name, err.assert_postfix()
                );
                unreachable!();
            },
        }
    }

    pub(crate) fn expect_err(self) -> ErrTester {
        match self.result {
            Ok(_) => {
                assert!(false, "[{}] Expected the run to fail, but it succeeded", self.test_name);
                unreachable!();
            },
            Err(err) => err,
        }
    }
}

//------------------------------------------------------------------------------
// Utilities for successful grouping
//------------------------------------------------------------------------------

pub(crate) struct GroupOkTester {
    test_name: String,
    snippet: Snippet,
}

impl GroupOkTester {
    pub(crate) fn assert_num_phrases(self, num: usize) -> Self {
        assert_eq!(
            num, self.snippet.phrases.len(),
            "[{}] Expected {} phrases, but found {} in '{}'",
            self.test_name, num, self.snippet.phrases.len(), self.snippet.render()
        );
        self
    }

    pub(crate) fn assert_render(self, expected: &str) -> Self {
        let rendered = self.snippet.render();
        assert_eq!(
            expected, rendered,
            "[{}] Expected the snippet to render as '{}', but got '{}'",
            self.test_name, expected, rendered
        );
        self
    }

    pub(crate) fn for_phrase<F: Fn(PhraseTester)>(self, idx: usize, f: F) -> Self {
        assert!(
            idx < self.snippet.phrases.len(),
            "[{}] Phrase {} does not exist, the snippet has {} phrases",
            self.test_name, idx, self.snippet.phrases.len()
        );
        f(PhraseTester { test_name: &self.test_name, phrase: &self.snippet.phrases[idx] });
        self
    }
}

pub(crate) struct PhraseTester<'a> {
    test_name: &'a str,
    phrase: &'a Phrase,
}

impl<'a> PhraseTester<'a> {
    pub(crate) fn assert_num_items(self, num: usize) -> Self {
        assert_eq!(
            num, self.phrase.items.len(),
            "[{}] Expected {} items, but found {} for {}",
            self.test_name, num, self.phrase.items.len(), self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_render(self, expected: &str) -> Self {
        let rendered = self.phrase.render();
        assert_eq!(
            expected, rendered,
            "[{}] Expected the phrase to render as '{}', but got '{}'",
            self.test_name, expected, rendered
        );
        self
    }

    pub(crate) fn for_group<F: Fn(GroupTester)>(self, idx: usize, f: F) -> Self {
        match self.phrase.items.get(idx) {
            Some(Item::Group(group)) => f(GroupTester { test_name: self.test_name, group }),
            _ => {
                assert!(false, "[{}] Item {} is not a group for {}", self.test_name, idx, self.assert_postfix());
                unreachable!();
            },
        }
        self
    }

    fn assert_postfix(&self) -> String {
        format!("Phrase{{ {} }}", self.phrase.render())
    }
}

pub(crate) struct GroupTester<'a> {
    test_name: &'a str,
    group: &'a Group,
}

impl<'a> GroupTester<'a> {
    pub(crate) fn assert_kind(self, kind: GroupKind) -> Self {
        assert_eq!(
            kind, self.group.kind(),
            "[{}] Expected a {}, but found a {} for {}",
            self.test_name, kind, self.group.kind(), self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_shape(self, shape: TupleShape) -> Self {
        let found = self.group.as_tuple().map(|t| t.shape);
        assert_eq!(
            Some(shape), found,
            "[{}] Expected shape {:?}, but found {:?} for {}",
            self.test_name, shape, found, self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_struct(self, num_fields: usize) -> Self {
        let found = match self.group {
            Group::FuncOrStruct(FuncOrStruct { content: FuncOrStructContent::Struct(fields), .. }) => Some(fields.len()),
            _ => None,
        };
        assert_eq!(
            Some(num_fields), found,
            "[{}] Expected a struct with {} fields for {}",
            self.test_name, num_fields, self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_function(self, declared_style: Option<Style>) -> Self {
        match self.group {
            Group::FuncOrStruct(FuncOrStruct { content: FuncOrStructContent::Function(literal), .. }) => {
                assert_eq!(
                    declared_style, literal.declared_style(),
                    "[{}] Expected declared style {:?}, but found {:?} for {}",
                    self.test_name, declared_style, literal.declared_style(), self.assert_postfix()
                );
            },
            _ => {
                assert!(false, "[{}] Expected a function literal for {}", self.test_name, self.assert_postfix());
            },
        }
        self
    }

    pub(crate) fn assert_render(self, expected: &str) -> Self {
        let rendered = self.group.render();
        assert_eq!(
            expected, rendered,
            "[{}] Expected the group to render as '{}', but got '{}'",
            self.test_name, expected, rendered
        );
        self
    }

    /// Groups the rendering again and checks the shape survives.
    pub(crate) fn assert_stable_render(self) -> Self {
        let rendered = self.group.render();
        let mut unit = CompilationUnit::new(PaceOptions::default());
        let regrouped = unit.group(&tokenize("render", &rendered));
        let regrouped = match &regrouped {
            Ok(snippet) => snippet.phrases.first().and_then(|p| p.items.first()).and_then(|i| i.as_group()),
            Err(err) => {
                assert!(false, "[{}] Grouping the rendering '{}' failed with {}", self.test_name, rendered, err);
                unreachable!();
            },
        };
        fn shape(group: Option<&Group>) -> Option<(GroupKind, Option<TupleShape>)> {
            group.map(|g| (g.kind(), g.as_tuple().map(|t| t.shape)))
        }
        assert_eq!(
            shape(Some(self.group)), shape(regrouped),
            "[{}] Grouping the rendering '{}' changed its shape",
            self.test_name, rendered
        );
        self
    }

    fn assert_postfix(&self) -> String {
        format!("Group{{ kind: {}, source: {} }}", self.group.kind(), self.group.render())
    }
}

//------------------------------------------------------------------------------
// Utilities for successful runs
//------------------------------------------------------------------------------

pub(crate) struct RunOkTester {
    test_name: String,
    unit: CompilationUnit,
    outcome: PaceOutcome,
}

impl RunOkTester {
    pub(crate) fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    pub(crate) fn outcome(&self) -> &PaceOutcome {
        &self.outcome
    }

    pub(crate) fn assert_value(self, expected: Value) -> Self {
        assert_eq!(
            Some(&expected), self.outcome.value.as_ref(),
            "[{}] Expected the value {}, but got {}",
            self.test_name, expected, self.value_postfix()
        );
        self
    }

    /// Compares the displayed value, convenient for tuples and structs.
    pub(crate) fn assert_value_str(self, expected: &str) -> Self {
        let found = self.value_postfix();
        assert_eq!(
            expected, found,
            "[{}] Expected the value {}, but got {}",
            self.test_name, expected, found
        );
        self
    }

    pub(crate) fn assert_num_phrases(self, num: usize) -> Self {
        assert_eq!(
            num, self.outcome.report.len(),
            "[{}] Expected {} phrases, but found {}: {:?}",
            self.test_name, num, self.outcome.report.len(), self.outcome.report
        );
        self
    }

    pub(crate) fn for_phrase<F: Fn(NodeTester)>(self, idx: usize, f: F) -> Self {
        assert!(
            idx < self.outcome.body.len(),
            "[{}] Phrase {} does not exist, the module has {} phrases",
            self.test_name, idx, self.outcome.body.len()
        );
        f(NodeTester { test_name: &self.test_name, heap: &self.unit.heap, id: self.outcome.body[idx] });
        self
    }

    /// Finds the top level binding of function `name`.
    pub(crate) fn for_function<F: Fn(FunctionTester)>(self, name: &str, f: F) -> Self {
        let heap = &self.unit.heap;
        let found = self.outcome.body.iter().find_map(|id| match &heap[*id].kind {
            TcKind::BindFn { name: bound, func, .. } if bound == name => heap.as_function(*func),
            _ => None,
        });
        match found {
            Some(func) => f(FunctionTester { test_name: &self.test_name, name, func }),
            None => {
                assert!(false, "[{}] Failed to find a binding of function '{}'", self.test_name, name);
                unreachable!();
            },
        }
        self
    }

    fn value_postfix(&self) -> String {
        match &self.outcome.value {
            Some(value) => value.to_string(),
            None => "no value".to_string(),
        }
    }
}

pub(crate) struct NodeTester<'a> {
    test_name: &'a str,
    heap: &'a Heap,
    id: NodeId,
}

impl<'a> NodeTester<'a> {
    pub(crate) fn assert_render(self, expected: &str) -> Self {
        let rendered = self.heap.render(self.id);
        assert_eq!(
            expected, rendered,
            "[{}] Expected the node to render as '{}', but got '{}'",
            self.test_name, expected, rendered
        );
        self
    }

    pub(crate) fn assert_render_has(self, fragment: &str) -> Self {
        let rendered = self.heap.render(self.id);
        assert!(
            rendered.contains(fragment),
            "[{}] Expected the node to contain '{}', but got '{}'",
            self.test_name, fragment, rendered
        );
        self
    }

    pub(crate) fn assert_out_type(self, expected: &str) -> Self {
        let found = self.heap[self.id].out_type.to_string();
        assert_eq!(
            expected, found,
            "[{}] Expected output type '{}', but got '{}' for {}",
            self.test_name, expected, found, self.heap.render(self.id)
        );
        self
    }
}

pub(crate) struct FunctionTester<'a> {
    test_name: &'a str,
    name: &'a str,
    func: &'a FuncNode,
}

impl<'a> FunctionTester<'a> {
    pub(crate) fn assert_arg_names(self, expected: &[&str]) -> Self {
        assert_eq!(
            expected, self.func.arg_names.as_slice(),
            "[{}] Unexpected parameters for {}",
            self.test_name, self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_arg_types(self, expected: &[&str]) -> Self {
        let found: Vec<String> = self.func.arg_types.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            expected, found.as_slice(),
            "[{}] Unexpected parameter types for {}",
            self.test_name, self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_style(self, style: Style) -> Self {
        assert_eq!(
            style, self.func.style,
            "[{}] Expected style {}, but found {} for {}",
            self.test_name, style, self.func.style, self.assert_postfix()
        );
        self
    }

    fn assert_postfix(&self) -> String {
        format!("Function{{ name: {}, params: [{}] }}", self.name, self.func.arg_names.join(", "))
    }
}

//------------------------------------------------------------------------------
// Utilities for failed runs
//------------------------------------------------------------------------------

pub(crate) struct ErrTester {
    test_name: String,
    source: String,
    error: CoreError,
    report: Vec<String>,
}

impl ErrTester {
    pub(crate) fn error(&self) -> &CoreError {
        &self.error
    }

    pub(crate) fn assert_kind(self, kind: ErrorKind) -> Self {
        assert_eq!(
            kind, self.error.kind,
            "[{}] Expected a {}, but got {}",
            self.test_name, kind, self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_num(self, num: usize) -> Self {
        assert_eq!(
            num, self.error.statements.len(),
            "[{}] expected error to consist of '{}' parts, but encountered '{}' for {}",
            self.test_name, num, self.error.statements.len(), self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_msg_has(self, idx: usize, msg: &str) -> Self {
        assert!(
            self.error.statements[idx].message.contains(msg),
            "[{}] expected error statement {}'s message to contain '{}' for {}",
            self.test_name, idx, msg, self.assert_postfix()
        );
        self
    }

    /// Seeks the first occurrence of the pattern in the source, then checks
    /// that the statement starts at that position.
    pub(crate) fn assert_occurs_at(self, idx: usize, pattern: &str) -> Self {
        let expected = find_position(&self.source, pattern);
        assert!(
            expected.is_some(),
            "[{}] incorrect occurs_at: '{}' could not be found in the source for {}",
            self.test_name, pattern, self.assert_postfix()
        );
        let found = self.error.statements[idx].span.begin;
        assert_eq!(
            expected, Some(found),
            "[{}] Expected error to occur at {:?}, but found it at {} for {}",
            self.test_name, expected, found, self.assert_postfix()
        );
        self
    }

    /// Number of phrases that were parsed before the error.
    pub(crate) fn assert_num_parsed(self, num: usize) -> Self {
        assert_eq!(
            num, self.report.len(),
            "[{}] Expected {} parsed phrases, but found {}: {:?}",
            self.test_name, num, self.report.len(), self.report
        );
        self
    }

    pub(crate) fn assert_num_frames(self, num: usize) -> Self {
        assert_eq!(
            num, self.error.frames.len(),
            "[{}] Expected {} stack frames, but found {} for {}",
            self.test_name, num, self.error.frames.len(), self.assert_postfix()
        );
        self
    }

    pub(crate) fn assert_frame_has(self, idx: usize, text: &str) -> Self {
        let frame = self.error.frames.get(idx).map(|f| f.to_string()).unwrap_or_default();
        assert!(
            frame.contains(text),
            "[{}] Expected stack frame {} to contain '{}' for {}",
            self.test_name, idx, text, self.assert_postfix()
        );
        self
    }

    fn assert_postfix(&self) -> String {
        let mut v = String::new();
        v.push_str("error: [");
        for (idx, stmt) in self.error.statements.iter().enumerate() {
            if idx != 0 {
                v.push_str(", ");
            }
            v.push_str(&format!("{{ at: {}, message: {} }}", stmt.span.begin, stmt.message));
        }
        v.push(']');
        v
    }
}
