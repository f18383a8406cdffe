//! CLI commands

mod deliver;
mod init;
mod validate;

pub use deliver::DeliverCommand;
pub use init::InitCommand;
pub use validate::{ValidateCommand, ValidationFailed};
