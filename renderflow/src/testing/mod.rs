//! Testing utilities for render runs.
//!
//! This module provides:
//! - A scripted, recording image generator
//! - Image and work item fixtures

mod fixtures;
mod mocks;

pub use fixtures::{
    confirmed_product, product_photo, rendered_image, staged_product, store_with, tiny_png,
    TINY_PNG,
};
pub use mocks::{MockImageGenerator, MockOutcome};
