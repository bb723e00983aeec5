///////////////////// PRELUDE /////////////////////

pub(crate) use core::fmt::Debug;
pub(crate) use maplit::hashmap;
pub(crate) use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    rc::Rc,
};

pub(crate) use crate::logging::Logger;

/// Identifies a `CompilationUnit` in log output.
pub type UnitId = u32;
