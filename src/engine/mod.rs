//! Engine module - build and interpretation
//!
//! - `compiler`: one-shot build of the user's source
//! - `diagnostics`: first-error extraction from compiler output
//! - `classifier`: exit status + stderr to failure category

pub mod classifier;
pub mod compiler;
pub mod diagnostics;
