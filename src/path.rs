use std::fmt;

/// Relative path inside a storage tree, used as the join key when matching
/// nodes across accounts.
///
/// Stored as name segments rather than a string so that joining and depth
/// calculations never have to re-parse separators. The root of a tree is the
/// empty segment list and displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a user-supplied path like `folder/subfolder`.
    ///
    /// Leading/trailing slashes and empty segments are dropped, so `/a//b/`
    /// and `a/b` are the same path.
    pub fn parse(s: &str) -> Self {
        let segments = s
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final name segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Containing path, or `None` for the root.
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_separators() {
        assert_eq!(TreePath::parse("/a//b/"), TreePath::parse("a/b"));
        assert_eq!(TreePath::parse("a/b").depth(), 2);
    }

    #[test]
    fn parse_empty_is_root() {
        assert!(TreePath::parse("").is_root());
        assert!(TreePath::parse("/").is_root());
        assert_eq!(TreePath::root().to_string(), "/");
    }

    #[test]
    fn join_appends_segment() {
        let docs = TreePath::parse("docs");
        let report = docs.join("report.txt");
        assert_eq!(report.to_string(), "docs/report.txt");
        assert_eq!(report.name(), Some("report.txt"));
    }

    #[test]
    fn parent_walks_up_to_root() {
        let path = TreePath::parse("a/b/c");
        assert_eq!(path.parent(), Some(TreePath::parse("a/b")));
        assert_eq!(TreePath::parse("a").parent(), Some(TreePath::root()));
        assert_eq!(TreePath::root().parent(), None);
    }

    #[test]
    fn ordering_is_parent_first() {
        let mut paths = vec![
            TreePath::parse("b"),
            TreePath::parse("a/z"),
            TreePath::parse("a"),
        ];
        paths.sort();
        assert_eq!(paths[0], TreePath::parse("a"));
        assert_eq!(paths[1], TreePath::parse("a/z"));
    }
}
