//! Output emitters. Each writes into the output directory and nothing else.
pub mod json;
pub mod script;
