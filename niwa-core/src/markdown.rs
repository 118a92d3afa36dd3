use chrono::{DateTime, Utc};

use crate::error::{CResult, Error};
use crate::storage::engine::Engine;
use crate::store::Store;
use crate::tree;
use crate::version;

/// One heading block parsed out of a markdown document, before it becomes
/// a stored `Node`. `parent` indexes back into the same `Vec`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedNode {
    pub depth: u32,
    pub title: String,
    pub content: String,
    pub parent: Option<usize>,
}

fn match_heading(line: &str) -> Option<(u32, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    Some((hashes as u32, title.to_string()))
}

fn trim_blank_lines<'a>(lines: &[&'a str]) -> &'a [&'a str] {
    let mut start = 0;
    let mut end = lines.len();
    while start < end && lines[start].trim().is_empty() {
        start += 1;
    }
    while end > start && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    &lines[start..end]
}

/// Parses a markdown document into a flat, pre-order list of heading
/// blocks. A depth jump greater than +1 attaches the node to the closest
/// ancestor of lesser depth still on the stack (so `H1` -> `H3` parents
/// under the `H1` if no `H2` intervened); a heading at depth > 1 with no
/// such ancestor fails with `OrphanedHeading`.
pub fn parse(markdown: &str) -> CResult<Vec<ParsedNode>> {
    let mut nodes: Vec<ParsedNode> = Vec::new();
    let mut stack: Vec<(u32, usize)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut buffer: Vec<&str> = Vec::new();

    let flush = |nodes: &mut Vec<ParsedNode>, current: Option<usize>, buffer: &mut Vec<&str>| {
        if let Some(idx) = current {
            nodes[idx].content = trim_blank_lines(buffer).join("\n");
        }
        buffer.clear();
    };

    for line in markdown.split('\n') {
        if let Some((depth, title)) = match_heading(line) {
            flush(&mut nodes, current, &mut buffer);

            while let Some(&(top_depth, _)) = stack.last() {
                if top_depth >= depth {
                    stack.pop();
                } else {
                    break;
                }
            }

            if depth > 1 && stack.is_empty() {
                return Err(Error::OrphanedHeading(title));
            }

            let parent = stack.last().map(|&(_, idx)| idx);
            let idx = nodes.len();
            nodes.push(ParsedNode { depth, title, content: String::new(), parent });
            stack.push((depth, idx));
            current = Some(idx);
        } else {
            buffer.push(line);
        }
    }
    flush(&mut nodes, current, &mut buffer);

    Ok(nodes)
}

/// Parses `markdown` and creates a node (plus its initial version) for
/// every heading block found, preserving parent/child relationships.
/// Returns the newly created node ids in the same pre-order as `parse`.
pub fn load_into<E: Engine>(
    store: &Store<E>,
    markdown: &str,
    author: &str,
    now: DateTime<Utc>,
) -> CResult<Vec<String>> {
    let parsed = parse(markdown)?;

    let mut txn = store.begin();
    tree::ensure_root(&mut txn, now)?;

    let mut ids: Vec<String> = Vec::with_capacity(parsed.len());
    for node in &parsed {
        let parent_id = match node.parent {
            Some(i) => ids[i].clone(),
            None => tree::ROOT_ID.to_string(),
        };
        let id = tree::create(&mut txn, &node.title, Some(&parent_id), &node.content, author, now)?;
        ids.push(id);
    }

    txn.commit()?;
    Ok(ids)
}

/// Serializes the whole tree (excluding the implicit root, which has no
/// heading of its own) back into canonical markdown, pre-order.
pub fn serialize<E: Engine>(store: &Store<E>) -> CResult<String> {
    let entries = tree::traverse(store)?;
    let mut out = String::new();

    for entry in entries {
        if entry.node_id == tree::ROOT_ID {
            continue;
        }
        out.push_str(&"#".repeat(entry.depth as usize));
        out.push(' ');
        out.push_str(&entry.title);
        out.push_str("\n\n");

        let latest = version::latest(store, &entry.node_id)?;
        out.push_str(&latest.content);
        out.push_str("\n\n");
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::Memory;

    #[test]
    fn parses_flat_headings() {
        let nodes = parse("# A\n\ntext\n\n## B\n\nmore\n").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], ParsedNode { depth: 1, title: "A".into(), content: "text".into(), parent: None });
        assert_eq!(
            nodes[1],
            ParsedNode { depth: 2, title: "B".into(), content: "more".into(), parent: Some(0) }
        );
    }

    #[test]
    fn depth_jump_attaches_to_nearest_ancestor() {
        let nodes = parse("# A\n\n### C\n\nbody\n").unwrap();
        assert_eq!(nodes[1].parent, Some(0));
    }

    #[test]
    fn orphaned_heading_without_ancestor_fails() {
        let err = parse("### C\n\nbody\n").unwrap_err();
        assert!(matches!(err, Error::OrphanedHeading(_)));
    }

    #[test]
    fn internal_blank_lines_preserved_but_not_edges() {
        let nodes = parse("# A\n\n\nfirst\n\nsecond\n\n\n").unwrap();
        assert_eq!(nodes[0].content, "first\n\nsecond");
    }

    #[test]
    fn round_trip_is_idempotent_after_one_pass() {
        let store = Store::new(Memory::new()).unwrap();
        let md = "# A\n\ntext\n\n## B\n\nmore\n";
        load_into(&store, md, "a1", Utc::now()).unwrap();
        let once = serialize(&store).unwrap();

        let store2 = Store::new(Memory::new()).unwrap();
        load_into(&store2, &once, "a1", Utc::now()).unwrap();
        let twice = serialize(&store2).unwrap();

        assert_eq!(once, twice);
    }
}
