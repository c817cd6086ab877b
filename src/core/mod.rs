pub mod fixture;
pub mod verdict;

pub use fixture::{discover, Fixture};
pub use verdict::{FailReason, Verdict};
