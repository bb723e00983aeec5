use crate::common::*;
use crate::pace::ast::FuncNode;
use crate::pace::types::{BType, TypeLattice};

/// Hook filling in the still unknown argument and return types of a user
/// function so it can join its overload. Returning `None` leaves the
/// function pending.
pub trait TypeInference: Debug {
    fn infer_signature(&mut self, func: &FuncNode, lattice: &TypeLattice) -> Option<(Vec<BType>, BType)>;
}

/// Inference for dynamically typed programs: every unknown slot accepts
/// anything.
#[derive(Debug, Default)]
pub struct DynamicInference;

impl TypeInference for DynamicInference {
    fn infer_signature(&mut self, func: &FuncNode, _lattice: &TypeLattice) -> Option<(Vec<BType>, BType)> {
        let sig = func.arg_types.iter().map(|t| t.or_any()).collect();
        Some((sig, func.ret_type.or_any()))
    }
}

/// Inference that never resolves anything. Functions without fully declared
/// signatures stay pending.
#[derive(Debug, Default)]
pub struct DeferredInference;

impl TypeInference for DeferredInference {
    fn infer_signature(&mut self, _func: &FuncNode, _lattice: &TypeLattice) -> Option<(Vec<BType>, BType)> {
        None
    }
}
