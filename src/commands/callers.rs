//! List the recognized variant callers.

use anyhow::Result;
use clap::Parser;

use vcall_lib::registry::{is_built_in, CallerId};

use crate::commands::command::Command;

/// List recognized variant callers and whether each has a built-in adapter.
#[derive(Debug, Parser)]
#[command(name = "callers", about = "List recognized variant callers")]
pub struct Callers;

impl Command for Callers {
    fn execute(&self) -> Result<()> {
        for id in CallerId::ALL {
            let status = if is_built_in(id) { "built-in" } else { "external" };
            println!("{:<16} {status}", id.name());
        }
        Ok(())
    }
}
