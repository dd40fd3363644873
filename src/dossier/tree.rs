//! Folder-structure rendering.
//!
//! Paths are inserted segment by segment into a trie whose children are kept
//! in a `BTreeMap`, so rendering never depends on insertion order and
//! inserting a path twice changes nothing. Rendering walks the trie with an
//! explicit stack instead of recursion; depth is bounded by the longest path.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::Peekable;

use crate::models::PathEntry;

/// Rendered in place of a tree when there are no paths at all.
pub const EMPTY_TREE: &str = "(empty repository)";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, segment: &str) -> Option<&TreeNode> {
        self.children.get(segment)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTree {
    root: TreeNode,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    pub fn from_entries(entries: &[PathEntry]) -> Self {
        Self::from_paths(entries.iter().map(|e| e.path.as_str()))
    }

    /// Insert a `/`-separated path. Empty segments (leading, trailing or
    /// doubled slashes) are ignored.
    pub fn insert(&mut self, path: &str) {
        let mut node = &mut self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_leaf()
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn render(&self) -> String {
        if self.is_empty() {
            return EMPTY_TREE.to_string();
        }

        let mut lines = Vec::new();
        let mut stack: Vec<(Peekable<btree_map::Iter<'_, String, TreeNode>>, String)> =
            vec![(self.root.children.iter().peekable(), String::new())];

        while let Some((siblings, prefix)) = stack.last_mut() {
            let Some((name, node)) = siblings.next() else {
                stack.pop();
                continue;
            };
            let is_last = siblings.peek().is_none();
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            lines.push(format!("{prefix}{connector}{name}"));

            if !node.is_leaf() {
                let child_prefix = format!("{prefix}{}", if is_last { BLANK } else { PIPE });
                stack.push((node.children.iter().peekable(), child_prefix));
            }
        }

        lines.join("\n")
    }
}

/// Render a flat path list as an indented tree.
pub fn render_paths<S: AsRef<str>>(paths: &[S]) -> String {
    PathTree::from_paths(paths).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nested_children_in_order_with_terminal_connector() {
        let rendered = render_paths(&["a/b.ts", "a/c.ts", "d.ts"]);
        assert_eq!(
            rendered,
            "├── a\n│   ├── b.ts\n│   └── c.ts\n└── d.ts"
        );
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let paths = ["src/lib.rs", "Cargo.toml", "src/git/mod.rs", "README.md", "src/git/tree.rs", "tests/a.rs"];
        let expected = render_paths(&paths);

        let mut reversed = paths.to_vec();
        reversed.reverse();
        assert_eq!(render_paths(&reversed), expected);

        let rotated: Vec<&str> = paths[3..].iter().chain(paths[..3].iter()).copied().collect();
        assert_eq!(render_paths(&rotated), expected);
    }

    #[test]
    fn duplicate_insertion_is_idempotent() {
        let once = PathTree::from_paths(["a/b/c.txt", "a/d.txt"]);
        let twice = PathTree::from_paths(["a/b/c.txt", "a/d.txt", "a/b/c.txt", "a/b", "a"]);
        assert_eq!(once, twice);
        assert_eq!(once.render(), twice.render());
    }

    #[test]
    fn ancestor_prefixes_follow_each_ancestors_last_child_status() {
        let rendered = render_paths(&["a/x/deep.rs", "a/y.rs", "b/z.rs"]);
        assert_eq!(
            rendered,
            [
                "├── a",
                "│   ├── x",
                "│   │   └── deep.rs",
                "│   └── y.rs",
                "└── b",
                "    └── z.rs",
            ]
            .join("\n")
        );
    }

    #[test]
    fn empty_listing_renders_marker() {
        let empty: [&str; 0] = [];
        assert_eq!(render_paths(&empty), EMPTY_TREE);
        assert_eq!(render_paths(&["", "/"]), EMPTY_TREE);
    }

    #[test]
    fn stray_slashes_are_ignored() {
        let tree = PathTree::from_paths(["/src//main.rs/"]);
        let src = tree.root().child("src").unwrap();
        assert_eq!(src.child_names().collect::<Vec<_>>(), vec!["main.rs"]);
    }

    #[test]
    fn entries_include_directories() {
        let entries = vec![PathEntry::dir("docs"), PathEntry::file("docs/guide.md", Some(12))];
        assert_eq!(PathTree::from_entries(&entries).render(), "└── docs\n    └── guide.md");
    }
}
