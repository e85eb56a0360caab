// file: src/validation/mod.rs
// description: input validation module exports
// reference: internal module structure

pub mod input;

pub use input::{
    BatchValidation, FileInspection, InputValidator, ValidationCheck, ValidationOutcome,
    log_outcome,
};
