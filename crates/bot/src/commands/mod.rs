//! Operator commands: parsing, dispatch and reply texts.

mod parse;
pub mod replies;
mod router;

pub use parse::{Command, ParseError, command_name};
pub use router::{CommandRouter, Incoming, Reply};
