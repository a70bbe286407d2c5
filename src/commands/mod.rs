pub mod assign;
pub mod fit;
pub mod resume;
pub mod shared;

use crate::cli::{Cli, Command};
use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fit(args) => fit::run(args),
        Command::Resume(args) => resume::run(args),
        Command::Assign(args) => assign::run(args),
    }
}
