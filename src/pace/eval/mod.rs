/// eval
///
/// Tree-walking interpreter over the typed nodes. Execution is eager and
/// single pass: the arguments of a call are evaluated from left to right
/// before the callee is resolved, the callee's overload is then picked by the
/// runtime types of those arguments.
///
/// Every call of a user function or block pushes a frame holding its
/// parameters and locals. A frame also links to the frame its literal was
/// evaluated in, names a body does not own are looked up by following those
/// links. Values that belong to a module, the contextual scope or the global
/// scope are kept in one store per table instead of in a frame.
///
/// Host functions get mutable access to the interpreter so that control flow
/// helpers can call the zero-argument blocks they are handed.

mod error;
mod executor;
mod value;

pub use error::{EvalFrame, ForeignError};
pub use executor::Interpreter;
pub use value::{FrameRef, Value};

/// Signature of a function implemented by the host.
pub type ForeignFn = fn(&mut Interpreter<'_>, Vec<Value>) -> Result<Value, ForeignError>;
