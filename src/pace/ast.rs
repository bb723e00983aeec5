use std::fmt;
use std::ops::{Index, IndexMut};

use super::arena::{Arena, Id};
use super::input_source::SrcSpan;
use super::parser::symbol_table::SymbolTable;
use super::tokens::Scope;
use super::types::BType;

/// Helper macro that defines a type alias for a node ID together with the
/// indexing and allocation functions on the `Heap`.
macro_rules! define_aliased_ast_id {
    ($name:ident, $parent:ty, index($indexed_type:ty, $indexed_arena:ident), alloc($fn_name:ident)) => {
        pub type $name = $parent;

        impl Index<$name> for Heap {
            type Output = $indexed_type;
            fn index(&self, index: $name) -> &Self::Output {
                &self.$indexed_arena[index]
            }
        }

        impl IndexMut<$name> for Heap {
            fn index_mut(&mut self, index: $name) -> &mut Self::Output {
                &mut self.$indexed_arena[index]
            }
        }

        impl Heap {
            pub fn $fn_name(&mut self, f: impl FnOnce($name) -> $indexed_type) -> $name {
                self.$indexed_arena.alloc_with_id(|id| f(id))
            }
        }
    };
}

define_aliased_ast_id!(NodeId, Id<TcNode>, index(TcNode, nodes), alloc(alloc_node));

/// Symbol tables live in their own arena, see `Symbols`.
pub type TableId = Id<SymbolTable>;

/// Owns every typed node of a compilation unit.
#[derive(Debug)]
pub struct Heap {
    pub(crate) nodes: Arena<TcNode>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap { nodes: Arena::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn as_function(&self, id: NodeId) -> Option<&FuncNode> {
        match &self[id].kind {
            TcKind::Func(func) | TcKind::Block(func) => Some(func),
            _ => None,
        }
    }
}

/// How a function takes its arguments when it is used without a prefix
/// argument tuple: nothing piped (prefix only), the value on its left, or the
/// value on its left plus one or two following arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Style {
    Nullary,
    Unary,
    Binary,
    Ternary,
}

impl Style {
    pub fn from_arity(arity: usize) -> Style {
        match arity {
            1 => Style::Unary,
            2 => Style::Binary,
            3 => Style::Ternary,
            _ => Style::Nullary,
        }
    }

    /// Arguments taken after the name when a left-hand value is piped in.
    pub fn num_following(&self) -> usize {
        match self {
            Style::Nullary | Style::Unary => 0,
            Style::Binary => 1,
            Style::Ternary => 2,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Style::Nullary => "nullary",
            Style::Unary => "unary",
            Style::Binary => "binary",
            Style::Ternary => "ternary",
        })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Text(String),
}

impl Scalar {
    pub fn btype(&self) -> BType {
        match self {
            Scalar::Null => BType::null(),
            Scalar::Bool(_) => BType::bool(),
            Scalar::Int(_) => BType::int(),
            Scalar::Num(_) => BType::num(),
            Scalar::Text(_) => BType::txt(),
        }
    }
}

/// Function or block literal. `scope` is the table of the body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FuncNode {
    pub arg_names: Vec<String>,
    pub arg_types: Vec<BType>,
    pub ret_type: BType,
    pub body: Vec<NodeId>,
    pub style: Style,
    pub scope: TableId,
}

/// Typed node. `target` fields name the table the parser resolved a value
/// name to, `scope` on calls names the nearest table defining the function.
#[derive(Debug, Clone, serde::Serialize)]
pub enum TcKind {
    Apply { func: NodeId, args: Vec<NodeId> },
    Func(FuncNode),
    Block(FuncNode),
    BindVal { scope: Scope, name: String, target: TableId, value: NodeId },
    GetVal { scope: Scope, name: String, path: Vec<String>, target: TableId },
    BindFn { scope: Scope, name: String, target: TableId, func: NodeId },
    GetOverload { name: String, arity: usize, scope: TableId },
    GetFamily { name: String, scope: TableId },
    LitScalar(Scalar),
    LitTuple(Vec<NodeId>),
    LitStruct(Vec<(String, NodeId)>),
    Load(Vec<String>),
    FromImport { path: String, names: Vec<String> },
    VoidPhrase,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TcNode {
    pub this: NodeId,
    pub span: SrcSpan,
    /// Table owning the node.
    pub table: TableId,
    /// Output type, `Tbi` until inference fills it in.
    pub out_type: BType,
    pub kind: TcKind,
}
