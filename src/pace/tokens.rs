use super::input_source::SrcSpan;

/// Scope level a name refers to. Written as a sigil in front of the name:
/// `x` local, `.x` lexical parent, `..x` module, `_x` contextual and `__x`
/// global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Scope {
    Local,
    Parent,
    Module,
    Context,
    Global,
}

impl Scope {
    pub fn sigil(&self) -> &'static str {
        match self {
            Scope::Local => "",
            Scope::Parent => ".",
            Scope::Module => "..",
            Scope::Context => "_",
            Scope::Global => "__",
        }
    }
}

/// Kind of token handed over by the lexer. Name-like tokens carry the scope
/// sigil in the tag, their text is the bare name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTag {
    Name(Scope),        // value or function name, may contain `.attr` paths
    SymbolicName,       // operator-like name: `+`, `==`, `>`
    AssignLeft(Scope),  // `x:` starting a phrase
    AssignRight(Scope), // `:x` following a value
    Keyword,            // `ifTrue:` within a phrase, text keeps the colon
    Int,
    Num,
    Text,               // text without the quotes
    // Openers
    LParen,             // (
    LBracket,           // [
    LBrace,             // {
    LBraceBrace,        // {{
    LBraceBracket,      // {[
    LParenBracket,      // ([
    LTypeTag,           // <:
    // Closers
    RParen,             // )
    RBracket,           // ]
    RBrace,             // }
    RBraceBrace,        // }}
    // Separators
    Dot,
    LineBreak,
    Comma,
    Semicolon,
    // Module keywords
    Load,
    From,
    Import,
}

impl TokenTag {
    pub fn is_opener(&self) -> bool {
        use TokenTag as TT;
        match self {
            TT::LParen | TT::LBracket | TT::LBrace | TT::LBraceBrace |
            TT::LBraceBracket | TT::LParenBracket | TT::LTypeTag => true,
            _ => false,
        }
    }

    pub fn is_closer(&self) -> bool {
        use TokenTag as TT;
        match self {
            TT::RParen | TT::RBracket | TT::RBrace | TT::RBraceBrace => true,
            _ => false,
        }
    }

    /// Characters of fixed-text tokens, used when rendering groups back to
    /// source.
    pub fn token_chars(&self) -> Option<&'static str> {
        use TokenTag as TT;
        let chars = match self {
            TT::LParen => "(",
            TT::LBracket => "[",
            TT::LBrace => "{",
            TT::LBraceBrace => "{{",
            TT::LBraceBracket => "{[",
            TT::LParenBracket => "([",
            TT::LTypeTag => "<:",
            TT::RParen => ")",
            TT::RBracket => "]",
            TT::RBrace => "}",
            TT::RBraceBrace => "}}",
            TT::Dot => ".",
            TT::LineBreak => "\n",
            TT::Comma => ",",
            TT::Semicolon => ";",
            TT::Load => "load",
            TT::From => "from",
            TT::Import => "import",
            _ => return None,
        };
        Some(chars)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tag: TokenTag,
    pub text: String,
    pub span: SrcSpan,
    /// Indentation of the line the token starts on. For a `LineBreak` this is
    /// the indentation of the next non-blank line.
    pub indent: u32,
}

impl Token {
    pub fn new<S: ToString>(tag: TokenTag, text: S, span: SrcSpan, indent: u32) -> Self {
        Self { tag, text: text.to_string(), span, indent }
    }

    /// A token made up by the grouping stage, e.g. the function name of a
    /// rewritten keyword call.
    pub fn synthetic<S: ToString>(tag: TokenTag, text: S, span: SrcSpan, indent: u32) -> Self {
        Self::new(tag, text, span, indent)
    }

    /// Source text of the token including its sigil or punctuation.
    pub fn render(&self) -> String {
        use TokenTag as TT;
        match self.tag {
            TT::Name(scope) => format!("{}{}", scope.sigil(), self.text),
            TT::AssignLeft(scope) => format!("{}{}:", scope.sigil(), self.text),
            TT::AssignRight(scope) => format!(":{}{}", scope.sigil(), self.text),
            TT::Text => format!("\"{}\"", self.text),
            TT::SymbolicName | TT::Keyword | TT::Int | TT::Num => self.text.clone(),
            tag => tag.token_chars().unwrap_or("").to_string(),
        }
    }
}

/// The lexer's output: everything the pipeline consumes.
#[derive(Debug, Clone)]
pub struct TokenStream {
    pub filename: String,
    pub tokens: Vec<Token>,
    /// Source text, only used to print context around errors.
    pub source: Option<String>,
}

impl TokenStream {
    pub fn new<S: ToString>(filename: S, tokens: Vec<Token>) -> Self {
        Self { filename: filename.to_string(), tokens, source: None }
    }

    pub fn with_source<S: ToString>(mut self, source: S) -> Self {
        self.source = Some(source.to_string());
        self
    }
}
