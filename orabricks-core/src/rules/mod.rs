// Rule system
// - rule.rs: Rule, Matcher and RuleList data types
// - pipeline.rs: the standard ordered rule list and rule names
// - engine.rs: RuleEngine, runs a RuleList over a buffer
// - datatypes.rs, functions.rs, operators.rs, objects.rs: built-in transforms

pub mod datatypes;
pub mod engine;
pub mod functions;
pub mod objects;
pub mod operators;
pub mod pipeline;
pub mod rule;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::RuleEngine;
pub use pipeline::*;
pub use rule::{MatchScope, Matcher, Rule, RuleList, RuleMatch, Transform, TransformFn};
