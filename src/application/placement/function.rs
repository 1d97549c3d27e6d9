//! Executable placement sources.
//!
//! A placement function looks at the shapes that no declarative rule placed and
//! proposes targets for some of them. It never mutates the candidate list; the
//! strategy applies the proposals and removes the shapes it placed.

use crate::domain::{order::PlacementTarget, shape::Shape};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Index into the candidate slice the function was given.
    pub candidate: usize,
    pub target: PlacementTarget,
}

impl Proposal {
    pub fn new(candidate: usize, target: PlacementTarget) -> Self {
        Self { candidate, target }
    }
}

pub trait PlacementFunction: Send + Sync {
    fn name(&self) -> &str;

    fn propose(&self, root: &Shape, candidates: &[Shape]) -> Vec<Proposal>;
}

/// Adapter turning a closure into a [`PlacementFunction`].
pub struct FnPlacement<F> {
    name: String,
    propose: F,
}

impl<F> FnPlacement<F>
where
    F: Fn(&Shape, &[Shape]) -> Vec<Proposal> + Send + Sync,
{
    pub fn new(name: impl Into<String>, propose: F) -> Self {
        Self {
            name: name.into(),
            propose,
        }
    }
}

impl<F> PlacementFunction for FnPlacement<F>
where
    F: Fn(&Shape, &[Shape]) -> Vec<Proposal> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&self, root: &Shape, candidates: &[Shape]) -> Vec<Proposal> {
        (self.propose)(root, candidates)
    }
}
