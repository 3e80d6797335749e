// ABOUTME: Filesystem tree reconciliation shared by task snapshots and the UI
// ABOUTME: Converts flat path listings and provider-native nested listings into one canonical tree

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical hierarchical tree node used for display and snapshotting
///
/// `children` is present (possibly empty) if and only if the node is a
/// directory. File nodes never carry a `children` field on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemNode {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileSystemNode>>,
}

/// One row of a flat directory listing, parent relationship encoded by path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatEntry {
    pub path: String,
    pub parent_path: Option<String>,
    pub is_directory: bool,
}

/// Entry kind reported by the sandbox provider's file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Provider-native nested listing entry, decoded at the adapter boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ProviderEntry>>,
}

/// Build a canonical tree from a flat listing with explicit parent paths.
///
/// Entries are sorted by path before processing. A child's path is always
/// a strict superstring of its parent's path followed by `/name`, so the
/// sort guarantees every parent is visited before any of its children,
/// making the output deterministic for any input permutation. An entry
/// whose `parent_path` matches no other entry falls back to the root
/// level rather than being dropped.
pub fn build_tree(entries: &[FlatEntry]) -> Vec<FileSystemNode> {
    let mut sorted: Vec<&FlatEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    // Arena of nodes addressed by index; children recorded as indices
    // until the whole listing has been visited.
    let mut arena: Vec<(FileSystemNode, Vec<usize>)> = Vec::with_capacity(sorted.len());
    let mut by_path: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());
    let mut roots: Vec<usize> = Vec::new();

    for entry in sorted {
        let name = entry
            .path
            .rsplit('/')
            .next()
            .unwrap_or(entry.path.as_str())
            .to_string();

        let idx = arena.len();
        arena.push((
            FileSystemNode {
                name,
                path: entry.path.clone(),
                is_directory: entry.is_directory,
                children: if entry.is_directory {
                    Some(Vec::new())
                } else {
                    None
                },
            },
            Vec::new(),
        ));
        by_path.insert(entry.path.as_str(), idx);

        match entry.parent_path.as_deref() {
            Some(parent) => match by_path.get(parent) {
                Some(&parent_idx) => arena[parent_idx].1.push(idx),
                // Orphaned parent reference: surface the entry at the root
                None => roots.push(idx),
            },
            None => roots.push(idx),
        }
    }

    roots
        .iter()
        .map(|&idx| materialize(&arena, idx))
        .collect()
}

fn materialize(arena: &[(FileSystemNode, Vec<usize>)], idx: usize) -> FileSystemNode {
    let (node, child_indices) = &arena[idx];
    let mut node = node.clone();
    if node.is_directory {
        node.children = Some(
            child_indices
                .iter()
                .map(|&child| materialize(arena, child))
                .collect(),
        );
    }
    node
}

/// Mirror a provider-native nested listing into the canonical tree shape.
///
/// `excluded_prefixes` prunes subtrees from the input listing before any
/// recursion happens, so descendants of a filtered directory are never
/// visited. A directory entry without a `children` field is an empty
/// directory, not an error.
pub fn map_provider_entries(
    entries: &[ProviderEntry],
    excluded_prefixes: &[&str],
) -> Vec<FileSystemNode> {
    entries
        .iter()
        .filter(|entry| {
            !excluded_prefixes
                .iter()
                .any(|prefix| entry.path.starts_with(prefix))
        })
        .map(|entry| map_entry(entry, excluded_prefixes))
        .collect()
}

fn map_entry(entry: &ProviderEntry, excluded_prefixes: &[&str]) -> FileSystemNode {
    let is_directory = entry.kind == EntryKind::Dir;
    FileSystemNode {
        name: entry.name.clone(),
        path: entry.path.clone(),
        is_directory,
        children: if is_directory {
            Some(map_provider_entries(
                entry.children.as_deref().unwrap_or(&[]),
                excluded_prefixes,
            ))
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flat(path: &str, parent: Option<&str>, is_directory: bool) -> FlatEntry {
        FlatEntry {
            path: path.to_string(),
            parent_path: parent.map(String::from),
            is_directory,
        }
    }

    fn edges(nodes: &[FileSystemNode], out: &mut Vec<(String, String)>) {
        for node in nodes {
            if let Some(children) = &node.children {
                for child in children {
                    out.push((node.path.clone(), child.path.clone()));
                }
                edges(children, out);
            }
        }
    }

    #[test]
    fn test_nests_children_under_parents() {
        let entries = vec![
            flat("/app", None, true),
            flat("/app/src", Some("/app"), true),
            flat("/app/src/main.py", Some("/app/src"), false),
            flat("/app/README.md", Some("/app"), false),
        ];

        let tree = build_tree(&entries);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/app");

        let children = tree[0].children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path, "/app/README.md");
        assert_eq!(children[1].path, "/app/src");
        assert_eq!(
            children[1].children.as_ref().unwrap()[0].path,
            "/app/src/main.py"
        );
    }

    #[test]
    fn test_order_independent() {
        let forward = vec![
            flat("/a", None, true),
            flat("/a/b", Some("/a"), true),
            flat("/a/b/c.txt", Some("/a/b"), false),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let mut forward_edges = Vec::new();
        let mut reversed_edges = Vec::new();
        edges(&build_tree(&forward), &mut forward_edges);
        edges(&build_tree(&reversed), &mut reversed_edges);

        assert_eq!(forward_edges, reversed_edges);
    }

    #[test]
    fn test_child_before_parent_in_input_still_nests() {
        let entries = vec![
            flat("/a/b", Some("/a"), false),
            flat("/a", None, true),
        ];

        let tree = build_tree(&entries);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/a");
        assert_eq!(tree[0].children.as_ref().unwrap()[0].path, "/a/b");
    }

    #[test]
    fn test_orphaned_parent_falls_back_to_root() {
        let entries = vec![
            flat("/a", None, true),
            flat("/missing/child.txt", Some("/missing"), false),
        ];

        let tree = build_tree(&entries);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().any(|n| n.path == "/missing/child.txt"));
    }

    #[test]
    fn test_file_nodes_have_no_children_field() {
        let entries = vec![
            flat("/dir", None, true),
            flat("/dir/file.txt", Some("/dir"), false),
        ];

        let tree = build_tree(&entries);
        assert_eq!(tree[0].children.as_ref().unwrap()[0].children, None);

        let json = serde_json::to_value(&tree[0].children.as_ref().unwrap()[0]).unwrap();
        assert!(json.get("children").is_none());
        assert_eq!(json.get("isDirectory").unwrap(), false);
    }

    #[test]
    fn test_empty_directory_keeps_empty_children() {
        let entries = vec![flat("/empty", None, true)];

        let tree = build_tree(&entries);
        assert_eq!(tree[0].children, Some(vec![]));
    }

    fn provider(name: &str, path: &str, kind: EntryKind) -> ProviderEntry {
        ProviderEntry {
            name: name.to_string(),
            path: path.to_string(),
            kind,
            children: None,
        }
    }

    #[test]
    fn test_maps_nested_provider_listing() {
        let listing = vec![ProviderEntry {
            children: Some(vec![
                provider("main.py", "/app/main.py", EntryKind::File),
                provider("lib", "/app/lib", EntryKind::Dir),
            ]),
            ..provider("app", "/app", EntryKind::Dir)
        }];

        let tree = map_provider_entries(&listing, &[]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_directory);

        let children = tree[0].children.as_ref().unwrap();
        assert_eq!(children[0].path, "/app/main.py");
        assert_eq!(children[0].children, None);
        // Directory without a children field is an empty directory
        assert_eq!(children[1].children, Some(vec![]));
    }

    #[test]
    fn test_prefix_filter_prunes_input_subtree() {
        let listing = vec![
            ProviderEntry {
                children: Some(vec![provider(
                    "left-pad",
                    "/node_modules/left-pad",
                    EntryKind::Dir,
                )]),
                ..provider("node_modules", "/node_modules", EntryKind::Dir)
            },
            provider("index.js", "/index.js", EntryKind::File),
        ];

        let tree = map_provider_entries(&listing, &["/node_modules"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "/index.js");
    }
}
