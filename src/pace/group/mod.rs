//! Grouping: turns the flat token stream into a tree of nested groups made up
//! of phrases. Nothing is resolved here, names are still plain tokens.

mod builder;
mod render;

use std::fmt;

use super::input_source::SrcSpan;
use super::tokens::{Scope, Token, TokenTag};
use super::ast::Style;

pub use builder::{GroupBuilder, MIN_CONTINUATION_INDENT};

/// Element of a phrase.
#[derive(Debug, Clone)]
pub enum Item {
    Token(Token),
    Group(Group),
}

impl Item {
    pub fn span(&self) -> SrcSpan {
        match self {
            Item::Token(token) => token.span,
            Item::Group(group) => group.span(),
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Item::Group(group) => Some(group),
            Item::Token(_) => None,
        }
    }
}

/// A run of items between separators. `indent` is the indentation of the line
/// the phrase started on.
#[derive(Debug, Clone, Default)]
pub struct Phrase {
    pub items: Vec<Item>,
    pub indent: u32,
}

impl Phrase {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn span(&self) -> SrcSpan {
        match (self.items.first(), self.items.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => SrcSpan::default(),
        }
    }

    /// The leading `name:` token, if the phrase is a left-assignment.
    pub fn assignment(&self) -> Option<&Token> {
        match self.items.first() {
            Some(Item::Token(token)) => match token.tag {
                TokenTag::AssignLeft(_) => Some(token),
                _ => None,
            },
            _ => None,
        }
    }

    /// True if the phrase is a `name: value` struct field.
    pub fn is_field(&self) -> bool {
        match self.assignment() {
            Some(token) => token.tag == TokenTag::AssignLeft(Scope::Local) && self.items.len() > 1,
            None => false,
        }
    }
}

/// Comma separated slots of a single row. An empty slot is an empty `Vec`.
pub type Slot = Vec<Phrase>;
pub type Row = Vec<Slot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Snippet,
    TupleOrParen,
    FuncOrStruct,
    Block,
    Frame,
    Load,
    FromImport,
    KeywordCall,
    TypeTag,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupKind::Snippet => "snippet",
            GroupKind::TupleOrParen => "tuple or parenthesis",
            GroupKind::FuncOrStruct => "function or struct",
            GroupKind::Block => "block",
            GroupKind::Frame => "frame literal",
            GroupKind::Load => "load list",
            GroupKind::FromImport => "from-import",
            GroupKind::KeywordCall => "keyword call",
            GroupKind::TypeTag => "type tag",
        };
        f.write_str(name)
    }
}

/// Shape of a parenthesised group, decided by its separators alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleShape {
    /// `()`
    Null,
    /// `(a)`, a plain parenthesis
    Paren,
    /// `(a, b, c)`, every slot filled
    Tuple,
    /// `(, a)` and friends, the number of empty slots
    Partial(usize),
    /// `(a, b; c, d)`
    Grid,
}

impl TupleShape {
    pub fn classify(has_semicolon: bool, has_comma: bool, num_empty_slots: usize, num_phrases: usize) -> TupleShape {
        if has_semicolon {
            TupleShape::Grid
        } else if !has_comma {
            if num_phrases == 0 { TupleShape::Null } else { TupleShape::Paren }
        } else if num_empty_slots == 0 {
            TupleShape::Tuple
        } else {
            TupleShape::Partial(num_empty_slots)
        }
    }

    pub fn is_partial(&self) -> bool {
        match self {
            TupleShape::Partial(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snippet {
    pub phrases: Vec<Phrase>,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct TupleOrParen {
    pub shape: TupleShape,
    pub rows: Vec<Row>,
    pub span: SrcSpan,
}

impl TupleOrParen {
    /// Slots of a non-grid group.
    pub fn slots(&self) -> &[Slot] {
        match self.rows.first() {
            Some(row) => row,
            None => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Token,
    pub type_tag: Option<TypeTag>,
}

#[derive(Debug, Clone)]
pub struct FuncLiteral {
    /// `Some` when the parameters were declared with `{[...] ...}`.
    pub params: Option<Vec<Param>>,
    pub ret_type: Option<TypeTag>,
    pub body: Vec<Phrase>,
}

impl FuncLiteral {
    /// Style implied by the declared parameters. Implicit parameters are only
    /// known once the body has been parsed.
    pub fn declared_style(&self) -> Option<Style> {
        self.params.as_ref().map(|params| Style::from_arity(params.len()))
    }
}

#[derive(Debug, Clone)]
pub enum FuncOrStructContent {
    Struct(Vec<Phrase>),
    Function(FuncLiteral),
}

#[derive(Debug, Clone)]
pub struct FuncOrStruct {
    pub doubled: bool,
    pub content: FuncOrStructContent,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct BlockLiteral {
    pub body: Vec<Phrase>,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct FrameLiteral {
    pub keys: Vec<Token>,
    pub rows: Vec<Row>,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct LoadList {
    pub paths: Vec<Token>,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct FromImport {
    pub path: Token,
    pub names: Vec<Token>,
    pub span: SrcSpan,
}

#[derive(Debug, Clone)]
pub struct TypeTag {
    pub text: String,
    pub span: SrcSpan,
}

/// A finished group. Keyword calls never show up here: they are rewritten
/// into a name followed by a tuple before their parent sees them.
#[derive(Debug, Clone)]
pub enum Group {
    TupleOrParen(TupleOrParen),
    FuncOrStruct(FuncOrStruct),
    Block(BlockLiteral),
    Frame(FrameLiteral),
    Load(LoadList),
    FromImport(FromImport),
    TypeTag(TypeTag),
}

impl Group {
    pub fn kind(&self) -> GroupKind {
        match self {
            Group::TupleOrParen(_) => GroupKind::TupleOrParen,
            Group::FuncOrStruct(_) => GroupKind::FuncOrStruct,
            Group::Block(_) => GroupKind::Block,
            Group::Frame(_) => GroupKind::Frame,
            Group::Load(_) => GroupKind::Load,
            Group::FromImport(_) => GroupKind::FromImport,
            Group::TypeTag(_) => GroupKind::TypeTag,
        }
    }

    pub fn span(&self) -> SrcSpan {
        match self {
            Group::TupleOrParen(g) => g.span,
            Group::FuncOrStruct(g) => g.span,
            Group::Block(g) => g.span,
            Group::Frame(g) => g.span,
            Group::Load(g) => g.span,
            Group::FromImport(g) => g.span,
            Group::TypeTag(g) => g.span,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleOrParen> {
        match self {
            Group::TupleOrParen(g) => Some(g),
            _ => None,
        }
    }
}
