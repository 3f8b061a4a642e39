//! Tests for the interpreter
//!
//! Organized by feature area

mod helpers;
mod if_tests;
mod program_tests;
