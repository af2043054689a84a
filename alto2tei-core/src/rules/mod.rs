// Rewrite rules - ordered regex substitutions over a whole document string
// - engine.rs: RewriteRule / RuleSet compilation and application
// - pre.rs: default rules for the intermediate markup
// - post.rs: default rules for the final TEI document

pub mod engine;
pub mod post;
pub mod pre;

pub use engine::{apply, RewriteRule, RuleSet, MAX_REPEAT_PASSES};
