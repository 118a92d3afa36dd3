use colored::Colorize;

use niwa_core::command::OperationResult;
use niwa_core::diff::DiffLine;

/// Renders an `OperationResult` to stdout. The core never flattens
/// structured data to strings, so every shape is matched explicitly here.
pub fn print(result: &OperationResult) {
    match result {
        OperationResult::Initialized => println!("INITIALIZED"),

        OperationResult::Added { node_id } => println!("NODE_ID: {}", node_id),

        OperationResult::Read { node_id, content, version } => {
            println!("READ SUCCESSFULLY");
            println!("NODE_ID: {}", node_id);
            println!("VERSION: {}", version);
            println!("---");
            println!("{}", content);
        }

        OperationResult::Peeked { node_id, content, version } => {
            println!("NODE_ID: {}", node_id);
            println!("VERSION: {}", version);
            println!("---");
            println!("{}", content);
        }

        OperationResult::Edited { node_id, version } => {
            println!("EDIT SUCCESSFUL");
            println!("NODE_ID: {}", node_id);
            println!("VERSION: {}", version);
        }

        OperationResult::Renamed { node_id, version } => {
            println!("RENAME SUCCESSFUL");
            println!("NODE_ID: {}", node_id);
            println!("VERSION: {}", version);
        }

        OperationResult::Resolved { node_id, version } => {
            println!("RESOLVED");
            println!("NODE_ID: {}", node_id);
            println!("VERSION: {}", version);
        }

        OperationResult::Conflicts(conflicts) => {
            if conflicts.is_empty() {
                println!("no pending conflicts");
            }
            for c in conflicts {
                println!(
                    "{} on {} ({}): their v{} vs your base v{}",
                    c.conflict_id.bold(),
                    c.node_id,
                    c.losing_author,
                    c.winning_version,
                    c.losing_base_version
                );
            }
        }

        OperationResult::History(versions) => {
            for v in versions {
                println!(
                    "v{} by {} at {}{}",
                    v.version,
                    v.author,
                    v.timestamp.to_rfc3339(),
                    v.summary.as_deref().map(|s| format!(" - {}", s)).unwrap_or_default()
                );
            }
        }

        OperationResult::Diff(lines) => {
            for line in lines {
                match line {
                    DiffLine::Context(s) => println!("  {}", s),
                    DiffLine::Added(s) => println!("{}", format!("+ {}", s).green()),
                    DiffLine::Removed(s) => println!("{}", format!("- {}", s).red()),
                }
            }
        }

        OperationResult::Tree(entries) => {
            for e in entries {
                println!("{}{} [{}] (v{})", "  ".repeat(e.depth as usize), e.title, e.node_id, e.current_version);
            }
        }

        OperationResult::Exported(markdown) => println!("{}", markdown),

        OperationResult::SearchResults(ids) => {
            if ids.is_empty() {
                println!("no matches");
            }
            for id in ids {
                println!("{}", id);
            }
        }

        OperationResult::Loaded(ids) => {
            println!("LOADED {} node(s)", ids.len());
            for id in ids {
                println!("{}", id);
            }
        }

        OperationResult::Status(status) => {
            println!("engine: {}", status.name);
            println!("keys: {}", status.keys);
            println!("size: {} bytes", status.size);
            println!("disk: {} bytes", status.total_disk_size);
        }

        OperationResult::Agents(agents) => {
            for a in agents {
                println!("{} (last seen {})", a.agent_id, a.last_seen.to_rfc3339());
            }
        }

        OperationResult::Whoami(agent) => println!("{}", agent),

        OperationResult::Check(report) => {
            if report.ok {
                println!("{}", "OK".green());
            } else {
                println!("{}", "FAILED".red());
                for v in &report.violations {
                    println!("  - {}", v);
                }
            }
        }
    }
}
