// Core moderation module - decision engine, manual actions, approval sweep.
// Following the same pattern as the classifier module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
