//! # Table Subcommand
//!
//! Prints the lifecycle edge table, optionally filtered to one kind.

use anyhow::{bail, Result};
use clap::Args;

use covenant_state::table::EDGES;
use covenant_state::{Edge, ObligationKind};

/// Arguments for `covenant table`.
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Only edges of this kind (bill, subscription, policy, claim,
    /// contract, verification).
    #[arg(long)]
    pub kind: Option<String>,

    /// Emit JSON instead of aligned text.
    #[arg(long)]
    pub json: bool,
}

/// Parse a kind name.
pub fn parse_kind(name: &str) -> Result<ObligationKind> {
    match ObligationKind::ALL.iter().find(|k| k.as_str() == name) {
        Some(kind) => Ok(*kind),
        None => bail!(
            "unknown kind `{name}`, expected one of: {}",
            ObligationKind::ALL.map(|k| k.as_str()).join(", ")
        ),
    }
}

/// Edges selected by `kind`, in table order.
pub fn select(kind: Option<ObligationKind>) -> Vec<&'static Edge> {
    EDGES
        .iter()
        .filter(|e| kind.map_or(true, |k| e.kind == k))
        .collect()
}

/// One line per edge: `kind  from --action--> to  [roles]`.
pub fn render_text(edges: &[&Edge]) -> String {
    let from_width = edges.iter().map(|e| e.from.as_str().len()).max().unwrap_or(0);
    let action_width = edges.iter().map(|e| e.action.as_str().len()).max().unwrap_or(0);
    let mut out = String::new();
    for e in edges {
        let roles: Vec<&str> = e.roles.iter().map(|r| r.as_str()).collect();
        out.push_str(&format!(
            "{:<12} {:<fw$} --{:<aw$}--> {:<18} [{}]\n",
            e.kind.as_str(),
            e.from.as_str(),
            e.action.as_str(),
            e.to.as_str(),
            roles.join(", "),
            fw = from_width,
            aw = action_width,
        ));
    }
    out
}

/// Execute `covenant table`.
pub fn run_table(args: &TableArgs) -> Result<u8> {
    let kind = args.kind.as_deref().map(parse_kind).transpose()?;
    let edges = select(kind);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&edges)?);
    } else {
        print!("{}", render_text(&edges));
    }
    Ok(0)
}
