// Content sensitivity classifier - keyword tables plus matching passes.
// Following the same pattern as the moderation module.

pub mod keyword_tables;
pub mod sensitivity_classifier;

pub use keyword_tables::*;
pub use sensitivity_classifier::*;
