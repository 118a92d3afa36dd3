use std::fs;
use std::io::Read as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use niwa_core::command::{CommandSurface, Operation};
use niwa_core::conflict::Resolution;
use niwa_core::storage::engine::Engine;

use crate::render;

/// The full CLI surface, one variant per `niwa-core` operation plus the
/// housekeeping commands (`init`, `status`, `agents`, `whoami`, `check`).
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the store's implicit root node if it doesn't already exist.
    /// `path` is the directory to initialize (holding the `.niwa` store
    /// directory), defaulting to the current directory.
    Init { path: Option<String> },

    /// Add a new node under `parent` (or top-level if omitted).
    Add {
        title: String,
        /// Initial content. Falls back to `--file`, then `--stdin`, then empty.
        content: Option<String>,
        #[clap(long)]
        parent: Option<String>,
        #[clap(long)]
        agent: Option<String>,
        #[clap(long)]
        file: Option<PathBuf>,
        #[clap(long)]
        stdin: bool,
    },

    /// Read a node's latest content, recording a read receipt for `agent`.
    Read {
        node_id: String,
        #[clap(long)]
        agent: Option<String>,
    },

    /// Read a node's latest content without recording a read receipt.
    Peek { node_id: String },

    /// Write new content to a node, rejected unless `agent` has read it since
    /// the last committed write.
    Edit {
        node_id: String,
        content: Option<String>,
        #[clap(long)]
        agent: Option<String>,
        #[clap(long)]
        file: Option<PathBuf>,
        #[clap(long)]
        stdin: bool,
        #[clap(long)]
        summary: Option<String>,
    },

    /// Rename a node, appending a new version with unchanged content.
    #[clap(alias = "rename")]
    Title {
        node_id: String,
        title: String,
        #[clap(long)]
        agent: Option<String>,
    },

    /// Resolve the pending conflict `agent` is party to (or the sole one on
    /// the node) with one of the fixed resolution actions.
    Resolve {
        node_id: String,
        #[clap(value_enum)]
        action: ResolveAction,
        /// Required content for `merge`. Falls back to `--file`, `--stdin`.
        content: Option<String>,
        #[clap(long)]
        agent: Option<String>,
        #[clap(long)]
        file: Option<PathBuf>,
        #[clap(long)]
        stdin: bool,
    },

    /// List pending conflicts, optionally filtered to one node.
    Conflicts { node_id: Option<String> },

    /// List every version recorded for a node.
    History { node_id: String },

    /// Line diff between two versions of a node. Defaults to the latest two.
    Diff {
        node_id: String,
        from: Option<u64>,
        to: Option<u64>,
    },

    /// Print the whole tree in pre-order.
    Tree,

    /// Export the tree as a single markdown document.
    Export,

    /// Case-insensitive substring search over node titles and content.
    Search { query: String },

    /// Load a markdown document into the tree, one node per heading.
    Load {
        path: PathBuf,
        #[clap(long)]
        agent: Option<String>,
    },

    /// Report storage engine status (key count, size, disk usage).
    Status,

    /// List every agent that has touched the store.
    Agents,

    /// Print the effective agent identifier for this invocation.
    Whoami {
        #[clap(long)]
        agent: Option<String>,
    },

    /// Verify structural invariants (acyclicity, depth, sibling uniqueness,
    /// version density, causal linkage) against the current store.
    Check,
}

/// Mirrors `niwa_core::conflict::Resolution` so clap can derive parsing
/// without pulling a CLI dependency into `niwa-core`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[clap(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveAction {
    AcceptYours,
    AcceptTheirs,
    Merge,
}

impl From<ResolveAction> for Resolution {
    fn from(a: ResolveAction) -> Self {
        match a {
            ResolveAction::AcceptYours => Resolution::AcceptYours,
            ResolveAction::AcceptTheirs => Resolution::AcceptTheirs,
            ResolveAction::Merge => Resolution::Merge,
        }
    }
}

/// Resolves an agent identifier: explicit flag, then `NIWA_AGENT`, then the
/// configured default, erroring out if none apply.
fn resolve_agent(explicit: Option<String>, default_agent: &Option<String>) -> Result<String> {
    explicit
        .or_else(|| std::env::var("NIWA_AGENT").ok())
        .or_else(|| default_agent.clone())
        .context("no agent specified: pass --agent, set NIWA_AGENT, or configure default_agent")
}

/// Content-source resolution order: explicit positional argument, then
/// `--file`, then `--stdin`, then an empty string.
fn resolve_content(explicit: Option<String>, file: Option<PathBuf>, stdin: bool) -> Result<String> {
    if let Some(content) = explicit {
        return Ok(content);
    }
    if let Some(path) = file {
        return fs::read_to_string(&path)
            .with_context(|| format!("reading content from {}", path.display()));
    }
    if stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading content from stdin")?;
        return Ok(buf);
    }
    Ok(String::new())
}

/// Translates a parsed `Command` into a `niwa_core::command::Operation`,
/// runs it through `CommandSurface`, and prints the rendered result.
pub fn run<E: Engine>(
    surface: &mut CommandSurface<E>,
    command: Command,
    default_agent: &Option<String>,
) -> Result<()> {
    let op = match command {
        Command::Init { .. } => Operation::Init,

        Command::Add { title, content, parent, agent, file, stdin } => Operation::Add {
            title,
            parent_id: parent,
            content: resolve_content(content, file, stdin)?,
            author: resolve_agent(agent, default_agent)?,
        },

        Command::Read { node_id, agent } => {
            Operation::Read { node_id, author: resolve_agent(agent, default_agent)? }
        }

        Command::Peek { node_id } => Operation::Peek { node_id },

        Command::Edit { node_id, content, agent, file, stdin, summary } => Operation::Edit {
            node_id,
            content: resolve_content(content, file, stdin)?,
            author: resolve_agent(agent, default_agent)?,
            summary,
        },

        Command::Title { node_id, title, agent } => {
            Operation::Rename { node_id, title, author: resolve_agent(agent, default_agent)? }
        }

        Command::Resolve { node_id, action, content, agent, file, stdin } => {
            let author = resolve_agent(agent, default_agent)?;
            let merged_content = match action {
                ResolveAction::Merge => Some(resolve_content(content, file, stdin)?),
                _ => None,
            };
            Operation::Resolve { node_id, author, action: action.into(), merged_content }
        }

        Command::Conflicts { node_id } => Operation::Conflicts { node_id },

        Command::History { node_id } => Operation::History { node_id },

        Command::Diff { node_id, from, to } => Operation::Diff { node_id, from, to },

        Command::Tree => Operation::Tree,

        Command::Export => Operation::Export,

        Command::Search { query } => Operation::Search { query },

        Command::Load { path, agent } => {
            let markdown = fs::read_to_string(&path)
                .with_context(|| format!("reading markdown document {}", path.display()))?;
            Operation::Load { markdown, author: resolve_agent(agent, default_agent)? }
        }

        Command::Status => Operation::Status,

        Command::Agents => Operation::Agents,

        Command::Whoami { agent } => Operation::Whoami { author: resolve_agent(agent, default_agent)? },

        Command::Check => Operation::Check,
    };

    let result = surface.dispatch(op)?;
    render::print(&result);
    Ok(())
}
