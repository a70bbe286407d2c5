pub mod cli;
pub mod commands;
pub mod mixture;

pub use commands::run;
