// src/lib.rs — Library root for citemeter

pub mod cli;
pub mod engine;
pub mod eval;
pub mod infra;
