use crate::error::Result;
use crate::model::Node;
use crate::path::TreePath;
use crate::tree::matcher::MatchResult;
use crate::tree::Tree;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Export a tree as XML, nested elements mirroring the folder hierarchy and
/// metadata as attributes.
pub fn tree_to_xml(tree: &Tree) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("tree");
    let root_path = tree.root_path().to_string();
    root.push_attribute(("root", root_path.as_str()));
    writer.write_event(Event::Start(root))?;

    let mut nodes: Vec<&Node> = tree.nodes().iter().collect();
    nodes.sort_by(|a, b| a.path.cmp(&b.path));

    // Open folder elements are tracked by path so each node closes the
    // elements it is not inside of before being written.
    let mut open: Vec<TreePath> = Vec::new();
    for node in nodes {
        let parent = node.path.parent().unwrap_or_else(TreePath::root);
        while open.last().is_some_and(|top| *top != parent) {
            open.pop();
            writer.write_event(Event::End(BytesEnd::new("folder")))?;
        }

        let tag = if node.is_folder() { "folder" } else { "file" };
        let mut elem = BytesStart::new(tag);
        elem.push_attribute(("id", node.id.as_str()));
        elem.push_attribute(("name", node.name.as_str()));
        if let Some(owner) = &node.owner {
            elem.push_attribute(("owner", owner.email.as_str()));
        }
        if let Some(modified) = node.modified_time {
            elem.push_attribute(("modified", modified.to_rfc3339().as_str()));
        }
        if let Some(modifier) = &node.last_modified_by {
            elem.push_attribute(("modifiedBy", modifier.email.as_str()));
        }

        if node.is_folder() {
            writer.write_event(Event::Start(elem))?;
            open.push(node.path.clone());
        } else {
            writer.write_event(Event::Empty(elem))?;
        }
    }

    while open.pop().is_some() {
        writer.write_event(Event::End(BytesEnd::new("folder")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("tree")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Export a match result as XML: one section per outcome category, one
/// element per node with its path and id.
pub fn match_result_to_xml(result: &MatchResult) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("matchResult")))?;

    {
        let mut matched = BytesStart::new("matched");
        let count = result.matched.len().to_string();
        matched.push_attribute(("count", count.as_str()));
        writer.write_event(Event::Start(matched))?;
        for pair in &result.matched {
            let mut elem = BytesStart::new("pair");
            let path = pair.source.path.to_string();
            elem.push_attribute(("path", path.as_str()));
            elem.push_attribute(("sourceId", pair.source.id.as_str()));
            elem.push_attribute(("destId", pair.dest.id.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("matched")))?;
    }

    let sections: [(&str, &[Node]); 4] = [
        ("missing", &result.missing),
        ("unexpected", &result.unexpected),
        ("duplicatesSource", &result.duplicates_source),
        ("duplicatesDest", &result.duplicates_dest),
    ];
    for (tag, nodes) in sections {
        let mut section = BytesStart::new(tag);
        let count = nodes.len().to_string();
        section.push_attribute(("count", count.as_str()));
        writer.write_event(Event::Start(section))?;
        for node in nodes {
            let mut elem = BytesStart::new("node");
            let path = node.path.to_string();
            elem.push_attribute(("path", path.as_str()));
            elem.push_attribute(("id", node.id.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }

    writer.write_event(Event::End(BytesEnd::new("matchResult")))?;
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, Principal};
    use crate::tree::matcher::match_trees;
    use chrono::{TimeZone, Utc};

    fn node(id: &str, path: &str, kind: NodeKind) -> Node {
        let path = TreePath::parse(path);
        Node {
            id: id.to_string(),
            name: path.name().unwrap_or("").to_string(),
            path,
            kind,
            owner: Some(Principal::new("alice@old.example")),
            last_modified_by: None,
            modified_time: Some(Utc.with_ymd_and_hms(2019, 4, 2, 9, 30, 0).unwrap()),
            created_time: None,
            permissions: Vec::new(),
        }
    }

    #[test]
    fn tree_export_nests_files_inside_folders() {
        let tree = Tree::from_nodes(
            TreePath::root(),
            vec![
                node("d1", "docs", NodeKind::Folder),
                node("f1", "docs/report.txt", NodeKind::File),
                node("f2", "top.txt", NodeKind::File),
            ],
        );

        let xml = tree_to_xml(&tree).unwrap();
        assert!(xml.contains(r#"<tree root="/">"#));
        let folder = xml.find(r#"<folder id="d1""#).unwrap();
        let file = xml.find(r#"<file id="f1""#).unwrap();
        let close = xml.find("</folder>").unwrap();
        assert!(folder < file && file < close);
        assert!(xml.contains(r#"owner="alice@old.example""#));
    }

    #[test]
    fn match_export_carries_counts() {
        let source = Tree::from_nodes(
            TreePath::root(),
            vec![
                node("s1", "a.txt", NodeKind::File),
                node("s2", "gone.txt", NodeKind::File),
            ],
        );
        let dest = Tree::from_nodes(TreePath::root(), vec![node("d1", "a.txt", NodeKind::File)]);

        let xml = match_result_to_xml(&match_trees(&source, &dest)).unwrap();
        assert!(xml.contains(r#"<matched count="1">"#));
        assert!(xml.contains(r#"<missing count="1">"#));
        assert!(xml.contains(r#"<pair path="a.txt" sourceId="s1" destId="d1"/>"#));
    }
}
