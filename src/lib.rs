pub mod cli;
pub mod config;
pub mod engine;
pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod parser;
