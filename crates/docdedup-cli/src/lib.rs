#![warn(missing_docs)]

//! docdedup command-line front end

pub mod cli;

pub use cli::{Cli, Command};
