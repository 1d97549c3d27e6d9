//! Shape placement: rule sets, first-match evaluation, and the strategy that
//! builds the zone tree.

pub mod function;
pub mod matcher;
pub mod rules;
pub mod strategy;

pub use function::{FnPlacement, PlacementFunction, Proposal};
pub use matcher::{DecisionOrigin, PlacementDecision, match_zone};
pub use rules::{PatternRule, Predicate, RuleError, RuleFile, RuleSet, ShorthandRule};
pub use strategy::PlacementStrategy;
