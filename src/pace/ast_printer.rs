use std::fmt::Write;

use super::ast::*;

/// Writes typed nodes in a compact single-line notation, e.g.
/// `Apply(GetOverload(+,2),[GetVal(x),Literal(1)])`.
pub struct TcWriter<'h> {
    heap: &'h Heap,
    buffer: String,
}

impl<'h> TcWriter<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self { heap, buffer: String::with_capacity(256) }
    }

    pub fn write(mut self, id: NodeId) -> String {
        self.write_node(id);
        self.buffer
    }

    fn write_list(&mut self, ids: &[NodeId]) {
        self.buffer.push('[');
        for (idx, id) in ids.iter().enumerate() {
            if idx != 0 {
                self.buffer.push(',');
            }
            self.write_node(*id);
        }
        self.buffer.push(']');
    }

    fn write_function(&mut self, label: &str, func: &FuncNode) {
        let types: Vec<String> = func.arg_types.iter().map(|t| t.to_string()).collect();
        let _ = write!(
            self.buffer, "{}([{}],[{}],{},", label, func.arg_names.join(","), types.join(","), func.ret_type
        );
        self.write_list(&func.body);
        let _ = write!(self.buffer, ",{})", func.style);
    }

    fn write_node(&mut self, id: NodeId) {
        let heap = self.heap;
        match &heap[id].kind {
            TcKind::Apply { func, args } => {
                self.buffer.push_str("Apply(");
                self.write_node(*func);
                self.buffer.push(',');
                self.write_list(args);
                self.buffer.push(')');
            },
            TcKind::Func(func) => self.write_function("Func", func),
            TcKind::Block(func) => self.write_function("Block", func),
            TcKind::BindVal { scope, name, value, .. } => {
                let _ = write!(self.buffer, "BindVal({}{},", scope.sigil(), name);
                self.write_node(*value);
                self.buffer.push(')');
            },
            TcKind::GetVal { scope, name, path, .. } => {
                let _ = write!(self.buffer, "GetVal({}{}", scope.sigil(), name);
                for attr in path {
                    let _ = write!(self.buffer, ".{}", attr);
                }
                self.buffer.push(')');
            },
            TcKind::BindFn { scope, name, func, .. } => {
                let _ = write!(self.buffer, "BindFn({}{},", scope.sigil(), name);
                self.write_node(*func);
                self.buffer.push(')');
            },
            TcKind::GetOverload { name, arity, .. } => {
                let _ = write!(self.buffer, "GetOverload({},{})", name, arity);
            },
            TcKind::GetFamily { name, .. } => {
                let _ = write!(self.buffer, "GetFamily({})", name);
            },
            TcKind::LitScalar(scalar) => {
                let _ = match scalar {
                    Scalar::Null => write!(self.buffer, "Literal(null)"),
                    Scalar::Bool(v) => write!(self.buffer, "Literal({})", v),
                    Scalar::Int(v) => write!(self.buffer, "Literal({})", v),
                    Scalar::Num(v) => write!(self.buffer, "Literal({:?})", v),
                    Scalar::Text(v) => write!(self.buffer, "Literal({:?})", v),
                };
            },
            TcKind::LitTuple(elements) => {
                self.buffer.push_str("LiteralTuple(");
                self.write_list(elements);
                self.buffer.push(')');
            },
            TcKind::LitStruct(fields) => {
                self.buffer.push_str("LiteralStruct({");
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx != 0 {
                        self.buffer.push(',');
                    }
                    let _ = write!(self.buffer, "{}:", name);
                    self.write_node(*value);
                }
                self.buffer.push_str("})");
            },
            TcKind::Load(paths) => {
                let _ = write!(self.buffer, "Load([{}])", paths.join(","));
            },
            TcKind::FromImport { path, names } => {
                let _ = write!(self.buffer, "FromImport({},[{}])", path, names.join(","));
            },
            TcKind::VoidPhrase => self.buffer.push_str("VoidPhrase"),
        }
    }
}

impl Heap {
    pub fn render(&self, id: NodeId) -> String {
        TcWriter::new(self).write(id)
    }
}
