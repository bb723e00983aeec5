mod sets;

pub use sets::{DequeSet, VecSet};
