//! Route check: what the dashboard would show for a path.

use clap::Args;
use serde::Serialize;

use logiflow_auth::RouteTable;
use logiflow_auth::gate::Navigation;
use logiflow_core::error::AppError;

use super::Context;
use crate::output::{self, OutputFormat};

/// Arguments for `route`
#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Dashboard path, e.g. `/gerente`
    pub path: String,
    /// Location remembered by an earlier login redirect
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Debug, Serialize)]
struct RouteOutcome<'a> {
    path: &'a str,
    action: &'static str,
    target: Option<String>,
    from: Option<String>,
}

/// Execute `route`
pub fn execute(args: &RouteArgs, ctx: &Context, format: OutputFormat) -> Result<(), AppError> {
    let navigation = RouteTable::dashboard().resolve(&ctx.session.state(), &args.path, args.from.as_deref());
    let outcome = match navigation {
        Navigation::Loading => RouteOutcome {
            path: &args.path,
            action: "loading",
            target: None,
            from: None,
        },
        Navigation::Render(page) => RouteOutcome {
            path: &args.path,
            action: "render",
            target: Some(page),
            from: None,
        },
        Navigation::Redirect { to, from } => RouteOutcome {
            path: &args.path,
            action: "redirect",
            target: Some(to),
            from,
        },
    };
    output::print_item(&outcome, format);
    Ok(())
}
