#[macro_use]
mod macros;

mod collections;
mod common;
pub mod logging;
pub mod pace;

pub use pace::{pace, CompilationUnit, PaceOptions, PaceOutcome};
pub use pace::eval::Value;
pub use pace::input_source::{CoreError, ErrorKind};
pub use pace::tokens::{Token, TokenStream, TokenTag, Scope};
