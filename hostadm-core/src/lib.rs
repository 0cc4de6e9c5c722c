pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod output;
pub mod scripts;
pub mod shell;
