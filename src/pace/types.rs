use std::fmt;

use crate::common::*;

/// Names of the atoms every lattice knows about.
pub const INT: &str = "int";
pub const NUM: &str = "num";
pub const TXT: &str = "txt";
pub const BOOL: &str = "bool";
pub const NULL: &str = "null";

lazy_static::lazy_static! {
    /// Builtin atom hierarchy, child to parent.
    static ref BUILTIN_ATOM_PARENTS: HashMap<&'static str, Option<&'static str>> = hashmap! {
        INT => Some(NUM),
        NUM => None,
        TXT => None,
        BOOL => None,
        NULL => None,
    };
}

/// A type expression. `Tbi` marks a slot that is still to be inferred, it
/// never fits anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BType {
    Tbi,
    Any,
    Atom(String),
    Union(Vec<BType>),
    Intersection(Vec<BType>),
    Tuple(Vec<BType>),
    Struct(Vec<(String, BType)>),
    Fn { args: Vec<BType>, ret: Box<BType> },
    SchemaVar(String),
    Recursive(String),
}

impl BType {
    pub fn atom(name: &str) -> BType {
        BType::Atom(name.to_string())
    }
    pub fn int() -> BType {
        Self::atom(INT)
    }
    pub fn num() -> BType {
        Self::atom(NUM)
    }
    pub fn txt() -> BType {
        Self::atom(TXT)
    }
    pub fn bool() -> BType {
        Self::atom(BOOL)
    }
    pub fn null() -> BType {
        Self::atom(NULL)
    }

    /// Type of a callable of the given arity whose slots are unconstrained.
    pub fn callable(arity: usize) -> BType {
        BType::Fn { args: vec![BType::Any; arity], ret: Box::new(BType::Any) }
    }

    /// True if no part of the type is still to be inferred.
    pub fn is_known(&self) -> bool {
        match self {
            BType::Tbi => false,
            BType::Union(ts) | BType::Intersection(ts) | BType::Tuple(ts) => ts.iter().all(|t| t.is_known()),
            BType::Struct(fields) => fields.iter().all(|(_, t)| t.is_known()),
            BType::Fn { args, ret } => args.iter().all(|t| t.is_known()) && ret.is_known(),
            _ => true,
        }
    }

    /// Replaces every `Tbi` slot with `Any`.
    pub fn or_any(&self) -> BType {
        match self {
            BType::Tbi => BType::Any,
            BType::Union(ts) => BType::Union(ts.iter().map(|t| t.or_any()).collect()),
            BType::Intersection(ts) => BType::Intersection(ts.iter().map(|t| t.or_any()).collect()),
            BType::Tuple(ts) => BType::Tuple(ts.iter().map(|t| t.or_any()).collect()),
            BType::Struct(fields) => BType::Struct(fields.iter().map(|(n, t)| (n.clone(), t.or_any())).collect()),
            BType::Fn { args, ret } => BType::Fn {
                args: args.iter().map(|t| t.or_any()).collect(),
                ret: Box::new(ret.or_any()),
            },
            other => other.clone(),
        }
    }

    /// True if the type constrains a value at all.
    pub fn is_constrained(&self) -> bool {
        match self {
            BType::Any | BType::Tbi | BType::SchemaVar(_) => false,
            _ => true,
        }
    }
}

impl fmt::Display for BType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_joined(f: &mut fmt::Formatter<'_>, types: &[BType], sep: &str) -> fmt::Result {
            for (idx, t) in types.iter().enumerate() {
                if idx != 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", t)?;
            }
            Ok(())
        }

        match self {
            BType::Tbi => f.write_str("TBI"),
            BType::Any => f.write_str("any"),
            BType::Atom(name) | BType::SchemaVar(name) | BType::Recursive(name) => f.write_str(name),
            BType::Union(ts) => write_joined(f, ts, "+"),
            BType::Intersection(ts) => write_joined(f, ts, "&"),
            BType::Tuple(ts) => {
                f.write_str("(")?;
                write_joined(f, ts, "*")?;
                f.write_str(")")
            },
            BType::Struct(fields) => {
                f.write_str("{")?;
                for (idx, (name, t)) in fields.iter().enumerate() {
                    if idx != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}:{}", name, t)?;
                }
                f.write_str("}")
            },
            BType::Fn { args, ret } => {
                f.write_str("(")?;
                write_joined(f, args, "*")?;
                write!(f, ")->{}", ret)
            },
        }
    }
}

/// The type service: subtyping between types and parsing of type
/// annotations. Atoms form a forest, a child fits within its ancestors.
#[derive(Debug)]
pub struct TypeLattice {
    parents: HashMap<String, Option<String>>,
}

impl TypeLattice {
    pub fn new() -> Self {
        let parents = BUILTIN_ATOM_PARENTS.iter()
            .map(|(child, parent)| (child.to_string(), parent.map(|p| p.to_string())))
            .collect();
        Self { parents }
    }

    /// Declares a new atom, optionally below an existing one.
    pub fn declare_atom(&mut self, name: &str, parent: Option<&str>) -> Result<(), String> {
        if let Some(parent) = parent {
            if !self.parents.contains_key(parent) {
                return Err(format!("unknown parent type '{}' for '{}'", parent, name));
            }
        }
        self.parents.insert(name.to_string(), parent.map(|p| p.to_string()));
        Ok(())
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    fn atom_fits(&self, child: &str, parent: &str) -> bool {
        let mut current = Some(child);
        while let Some(name) = current {
            if name == parent {
                return true;
            }
            current = self.parents.get(name).and_then(|p| p.as_deref());
        }
        false
    }

    pub fn fits_within(&self, a: &BType, b: &BType) -> bool {
        use BType as T;
        match (a, b) {
            (T::Tbi, _) | (_, T::Tbi) => false,
            (_, T::Any) => true,
            (T::Any, _) => false,
            (_, T::SchemaVar(_)) => true,
            (T::Union(xs), _) => xs.iter().all(|x| self.fits_within(x, b)),
            (_, T::Union(ys)) => ys.iter().any(|y| self.fits_within(a, y)),
            (_, T::Intersection(ys)) => ys.iter().all(|y| self.fits_within(a, y)),
            (T::Intersection(xs), _) => xs.iter().any(|x| self.fits_within(x, b)),
            (T::Atom(x), T::Atom(y)) => self.atom_fits(x, y),
            (T::Tuple(xs), T::Tuple(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| self.fits_within(x, y))
            },
            (T::Struct(xs), T::Struct(ys)) => ys.iter().all(|(name, y)| {
                xs.iter().any(|(other, x)| other == name && self.fits_within(x, y))
            }),
            (T::Fn { args: a_args, ret: a_ret }, T::Fn { args: b_args, ret: b_ret }) => {
                a_args.len() == b_args.len()
                    && b_args.iter().zip(a_args.iter()).all(|(b_arg, a_arg)| self.fits_within(b_arg, a_arg))
                    && self.fits_within(a_ret, b_ret)
            },
            (T::Recursive(x), T::Recursive(y)) => x == y,
            _ => false,
        }
    }

    /// Signature `a` is at least as specific as `b` when every slot of `a`
    /// fits within the matching slot of `b`.
    pub fn signature_fits(&self, a: &[BType], b: &[BType]) -> bool {
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.fits_within(x, y))
    }

    /// Parses a type annotation. Unions bind loosest (`+`), then
    /// intersections (`&`), then tuples (`*`).
    pub fn parse(&self, text: &str) -> Result<BType, String> {
        let tokens = tokenize_type(text)?;
        let mut parser = TypeParser { tokens: &tokens, pos: 0, lattice: self };
        let parsed = parser.parse_union()?;
        if parser.pos != tokens.len() {
            return Err(format!("unexpected '{}' in type '{}'", tokens[parser.pos], text));
        }
        Ok(parsed)
    }
}

fn tokenize_type(text: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_alphanumeric() || c == '_' {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
            }
            tokens.push(name);
        } else if "+&*()".contains(c) {
            tokens.push(c.to_string());
            chars.next();
        } else {
            return Err(format!("unexpected character '{}' in type '{}'", c, text));
        }
    }
    if tokens.is_empty() {
        return Err("empty type".to_string());
    }
    Ok(tokens)
}

struct TypeParser<'a> {
    tokens: &'a [String],
    pos: usize,
    lattice: &'a TypeLattice,
}

impl<'a> TypeParser<'a> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.as_str())
    }

    fn parse_infix(&mut self, op: &str, next: fn(&mut Self) -> Result<BType, String>, wrap: fn(Vec<BType>) -> BType) -> Result<BType, String> {
        let first = next(self)?;
        let mut members = vec![first];
        while self.peek() == Some(op) {
            self.pos += 1;
            members.push(next(self)?);
        }
        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(wrap(members))
        }
    }

    fn parse_union(&mut self) -> Result<BType, String> {
        self.parse_infix("+", Self::parse_intersection, BType::Union)
    }

    fn parse_intersection(&mut self) -> Result<BType, String> {
        self.parse_infix("&", Self::parse_tuple, BType::Intersection)
    }

    fn parse_tuple(&mut self) -> Result<BType, String> {
        self.parse_infix("*", Self::parse_primary, BType::Tuple)
    }

    fn parse_primary(&mut self) -> Result<BType, String> {
        let token = match self.peek() {
            Some(token) => token.to_string(),
            None => return Err("type ends unexpectedly".to_string()),
        };
        self.pos += 1;
        if token == "(" {
            let inner = self.parse_union()?;
            if self.peek() != Some(")") {
                return Err("expected ')' in type".to_string());
            }
            self.pos += 1;
            return Ok(inner);
        }
        if token == "any" {
            return Ok(BType::Any);
        }
        if is_schema_var(&token) {
            return Ok(BType::SchemaVar(token));
        }
        if token.chars().next().map_or(false, |c| c.is_ascii_alphabetic()) {
            if !self.lattice.has_atom(&token) {
                return Err(format!("unknown type '{}'", token));
            }
            return Ok(BType::Atom(token));
        }
        Err(format!("unexpected '{}' in type", token))
    }
}

/// `T` followed by one or more digits.
fn is_schema_var(name: &str) -> bool {
    name.len() > 1 && name.starts_with('T') && name[1..].chars().all(|c| c.is_ascii_digit())
}
