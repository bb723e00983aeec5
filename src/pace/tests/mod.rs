/**
 * pace/tests
 *
 * Tests running source text through the whole pipeline: grouping, phrase
 * parsing and execution. Sources are turned into tokens by a small tokenizer
 * in `utils.rs` that only knows what these tests need.
 *
 * Tests of a single data structure live next to that structure instead.
 */

mod utils;
mod grouping;
mod parser_scopes;

pub(crate) use utils::{Tester, tokenize}; // the testing harness
pub(crate) use crate::pace::eval::Value;
