//! # dtt-testgen
//!
//! Turns a file's diff into a prompt, and a model's answer into test code.
//!
//! The prompt asks the model to answer with [`NO_TEST_NEEDED`] when the
//! change has nothing worth testing. That is a soft contract: anything
//! other than the sentinel is treated as code.

mod generator;
mod prompts;
mod response;

pub use generator::{GenerationError, TestGenerator};
pub use prompts::{PromptError, TestPrompts, DEFAULT_MAX_DIFF_BYTES, DEFAULT_TEST_FRAMEWORK};
pub use response::{clean_response, is_sentinel, GeneratedTest, TestBody};

/// Reserved answer meaning "no test should be generated for this change"
pub const NO_TEST_NEEDED: &str = "NO_TEST_NEEDED";
