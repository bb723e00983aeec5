use std::fmt;

/// Call frame recorded in an error raised during execution.
#[derive(Debug, Clone)]
pub struct EvalFrame {
    pub line: u32,
    pub module_name: String,
    pub procedure: String, // bound function name, empty for anonymous ones
}

impl fmt::Display for EvalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let procedure = if self.procedure.is_empty() { "<anonymous>" } else { &self.procedure };
        if self.module_name.is_empty() {
            write!(f, "function {}:{}", procedure, self.line)
        } else {
            write!(f, "function {}:{}:{}", self.module_name, procedure, self.line)
        }
    }
}

/// Failure of a host function. `Failed` carries a plain message, `Propagated`
/// passes on an error raised by a call back into the interpreter.
#[derive(Debug, derive_more::From)]
pub enum ForeignError {
    Failed(String),
    Propagated(crate::pace::input_source::CoreError),
}
