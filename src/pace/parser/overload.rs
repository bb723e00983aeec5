use std::fmt;

use crate::common::*;
use crate::pace::ast::{NodeId, TableId};
use crate::pace::eval::ForeignFn;
use crate::pace::types::{BType, TypeLattice};

/// What runs when an implementation is selected.
#[derive(Clone, Copy)]
pub enum FnImpl {
    /// Function or block literal in the node heap.
    User(NodeId),
    Foreign(ForeignFn),
}

impl fmt::Debug for FnImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FnImpl::User(id) => write!(f, "User({:?})", id),
            FnImpl::Foreign(_) => f.write_str("Foreign"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Implementation {
    pub sig: Vec<BType>,
    pub ret: BType,
    pub target: FnImpl,
}

/// Outcome of picking an implementation for a list of argument types.
#[derive(Debug)]
pub enum Selection<'a> {
    Found(&'a Implementation),
    Ambiguous(Vec<&'a Implementation>),
    NoFit,
}

/// All implementations of one name at one arity, keyed by their argument
/// types.
#[derive(Debug, Clone)]
pub struct Overload {
    pub name: String,
    pub arity: usize,
    pub impls: Vec<Implementation>,
}

impl Overload {
    pub fn new(name: &str, arity: usize) -> Self {
        Self { name: name.to_string(), arity, impls: Vec::new() }
    }

    /// Adds an implementation. An implementation with the same signature is
    /// replaced, the latest binding wins.
    pub fn insert(&mut self, implementation: Implementation) {
        debug_assert_eq!(implementation.sig.len(), self.arity);
        match self.impls.iter_mut().find(|i| i.sig == implementation.sig) {
            Some(existing) => *existing = implementation,
            None => self.impls.push(implementation),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.impls.is_empty()
    }

    /// An exact signature match wins. Otherwise the candidate that fits and
    /// is at least as specific as every other fitting candidate is chosen.
    pub fn select(&self, lattice: &TypeLattice, arg_types: &[BType]) -> Selection {
        if let Some(exact) = self.impls.iter().find(|i| i.sig.as_slice() == arg_types) {
            return Selection::Found(exact);
        }

        let fitting: Vec<&Implementation> = self.impls.iter()
            .filter(|i| lattice.signature_fits(arg_types, &i.sig))
            .collect();
        if fitting.is_empty() {
            return Selection::NoFit;
        }

        let most_specific: Vec<&Implementation> = fitting.iter()
            .filter(|candidate| fitting.iter().all(|other| lattice.signature_fits(&candidate.sig, &other.sig)))
            .copied()
            .collect();
        if most_specific.len() == 1 {
            Selection::Found(most_specific[0])
        } else {
            Selection::Ambiguous(fitting)
        }
    }

    pub fn describe_signatures(&self) -> String {
        describe(self.impls.iter())
    }
}

pub fn describe<'a, I: Iterator<Item = &'a Implementation>>(impls: I) -> String {
    impls.map(|i| {
        let args: Vec<String> = i.sig.iter().map(|t| t.to_string()).collect();
        format!("({})", args.join(","))
    }).collect::<Vec<_>>().join(", ")
}

/// Every arity of one name gathered into one dispatchable unit, as seen from
/// a particular table.
#[derive(Debug, Clone)]
pub struct Family {
    pub name: String,
    pub scope: TableId,
    pub overloads: BTreeMap<usize, Overload>,
}

impl Family {
    pub fn overload(&self, arity: usize) -> Option<&Overload> {
        self.overloads.get(&arity).filter(|o| !o.is_empty())
    }

    pub fn arities(&self) -> Vec<usize> {
        self.overloads.iter().filter(|(_, o)| !o.is_empty()).map(|(a, _)| *a).collect()
    }
}

/// A user function waiting for its argument or return types before it can
/// join its overload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverload {
    pub table: TableId,
    pub name: String,
    pub arity: usize,
    pub func: NodeId,
}
