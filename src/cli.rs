//! CLI domain: parse, route and output only.
//! No generation logic lives here; route dispatches to the library services.

mod output;
mod parse;
mod route;

pub use output::{failure_json, map_error, LogSink};
pub use parse::{Cli, Commands};
pub use route::RunContext;
