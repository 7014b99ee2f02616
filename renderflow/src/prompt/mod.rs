//! Prompt composition.
//!
//! Builds the reference-image ordering and instruction text for the three
//! request kinds: single-product render, scene establishment or relocation,
//! and free-form edit. Composition is pure: identical inputs always yield
//! identical requests.

mod angles;
mod composer;

pub use angles::angle_description;
pub use composer::PromptComposer;
