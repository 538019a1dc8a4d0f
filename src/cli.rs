//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use presentation::{
    format_latest_json, format_latest_text, format_plan_json, format_plan_text, format_run_report,
    format_script_report,
};
pub use route::{resolve_plan, GenerateOverrides, RunContext, ScriptOverrides};
