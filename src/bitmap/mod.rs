//! Bitmap module: pixel storage exchanged between producer and controller.
//!
//! This module contains:
//! - [`Rgb`]: True-color pixel representation
//! - [`Resolution`]: A fixed `{width, height}` pair
//! - [`Bitmap`]: An owned, non-clonable pixel grid

mod pixel;
#[allow(clippy::module_inception)]
mod bitmap;

pub use bitmap::{Bitmap, Resolution};
pub use pixel::Rgb;
