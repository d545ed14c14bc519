//! Grounding prompt rendering for ragbot.
//!
//! The answer composer hands retrieved passages and the user's question to a
//! [`GroundingTemplate`], which renders them through Handlebars into the
//! single prompt sent to the language model.

pub mod builder;
pub mod template;

// Re-export main types
pub use builder::{GroundingInput, GroundingTemplate};
pub use template::{load_template, DEFAULT_GROUNDING_TEMPLATE};
