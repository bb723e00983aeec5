use std::fmt;

use crate::common::*;
use crate::pace::ast::NodeId;
use crate::pace::parser::overload::Family;
use crate::pace::types::BType;

/// Reference to a live frame of the interpreter. The serial tells a frame
/// apart from a later frame reusing the same stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef {
    pub(crate) index: usize,
    pub(crate) serial: u64,
}

/// Runtime value. Values are copied around, closures and families are the
/// only values that refer back into the unit.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Text(String),
    Tuple(Vec<Value>),
    Struct(Vec<(String, Value)>),
    /// Function or block literal together with the frame its free names
    /// resolve in.
    Closure { node: NodeId, arity: usize, lexical: Option<FrameRef> },
    Family(Rc<Family>),
}

macro_rules! impl_value_unpack {
    ($func_name:ident, $variant_name:path, $return_type:ty) => {
        impl Value {
            pub fn $func_name(&self) -> Option<$return_type> {
                match self {
                    $variant_name(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_value_unpack!(as_bool, Value::Bool, bool);
impl_value_unpack!(as_int, Value::Int, i64);

impl Value {
    /// Numeric view of the value, integers widen to numbers.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Closure { .. } | Value::Family(_) => true,
            _ => false,
        }
    }

    /// Type used for overload selection.
    pub fn btype(&self) -> BType {
        match self {
            Value::Null => BType::null(),
            Value::Bool(_) => BType::bool(),
            Value::Int(_) => BType::int(),
            Value::Num(_) => BType::num(),
            Value::Text(_) => BType::txt(),
            Value::Tuple(values) => BType::Tuple(values.iter().map(|v| v.btype()).collect()),
            Value::Struct(fields) => BType::Struct(fields.iter().map(|(n, v)| (n.clone(), v.btype())).collect()),
            Value::Closure { arity, .. } => BType::callable(*arity),
            Value::Family(family) => match family.arities().as_slice() {
                [arity] => BType::callable(*arity),
                _ => BType::Any,
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value as V;
        match (self, other) {
            (V::Null, V::Null) => true,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::Int(a), V::Int(b)) => a == b,
            (V::Int(_), V::Num(_)) | (V::Num(_), V::Int(_)) | (V::Num(_), V::Num(_)) => self.as_num() == other.as_num(),
            (V::Text(a), V::Text(b)) => a == b,
            (V::Tuple(a), V::Tuple(b)) => a == b,
            (V::Struct(a), V::Struct(b)) => a == b,
            (V::Closure { node: a, lexical: la, .. }, V::Closure { node: b, lexical: lb, .. }) => a == b && la == lb,
            (V::Family(a), V::Family(b)) => a.name == b.name && a.scope == b.scope,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Num(v) => write!(f, "{:?}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Tuple(values) => {
                f.write_str("(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            },
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            },
            Value::Closure { arity, .. } => write!(f, "<function/{}>", arity),
            Value::Family(family) => write!(f, "<family {}>", family.name),
        }
    }
}
