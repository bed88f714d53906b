use std::fmt::Write;

use cardstore_container::{AttrValue, Dataset, Group, Node, FORMAT_VERSION, MAGIC};

/// One line naming the on-disk format, so nobody mistakes it for HDF5.
pub fn format_note() -> String {
    format!(
        "format: {} v{FORMAT_VERSION} (bincode snapshot of an HDF5-style tree, not readable by HDF5 tools)",
        String::from_utf8_lossy(MAGIC)
    )
}

/// Indented tree of `root`: groups with their attributes, datasets with
/// dtype and shape. Children below `max_depth` are summarized as a count.
pub fn render_tree(root: &Group, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    render_group(&mut out, root, 0, max_depth);
    out
}

fn render_group(out: &mut String, group: &Group, depth: usize, max_depth: Option<usize>) {
    let indent = "  ".repeat(depth + 1);
    if max_depth.is_some_and(|max| depth >= max) {
        if !group.is_empty() {
            let _ = writeln!(out, "{indent}… {} children", group.len());
        }
        return;
    }
    for (name, node) in group.children() {
        match node {
            Node::Group(child) => {
                let _ = writeln!(out, "{indent}{name}/{}", attrs_suffix(child));
                render_group(out, child, depth + 1, max_depth);
            }
            Node::Dataset(ds) => {
                let _ = writeln!(out, "{indent}{name}  {}", describe_dataset(ds));
            }
        }
    }
}

fn attrs_suffix(group: &Group) -> String {
    let attrs: Vec<String> = group
        .attrs()
        .map(|(name, value)| match value {
            AttrValue::Int(v) => format!("{name}={v}"),
            AttrValue::Float(v) => format!("{name}={v}"),
            AttrValue::Str(v) => format!("{name}={v}"),
        })
        .collect();
    if attrs.is_empty() {
        String::new()
    } else {
        format!("  [{}]", attrs.join(", "))
    }
}

fn describe_dataset(ds: &Dataset) -> String {
    if ds.is_null() {
        return "null".to_string();
    }
    if ds.is_scalar() {
        return format!("{} scalar", ds.dtype().name());
    }
    let dims: Vec<String> = ds.shape().iter().map(usize::to_string).collect();
    format!("{}[{}]", ds.dtype().name(), dims.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstore_container::ArrayData;

    fn sample() -> Group {
        let mut root = Group::new();
        let nodes = root.create_group("nodes").unwrap();
        let grid = nodes.create_group("GRID").unwrap();
        grid.set_attr("layout", "columnar");
        grid.create_dataset("keys", Dataset::array(ArrayData::Int(vec![1, 2])))
            .unwrap();
        root.create_dataset("flag", Dataset::scalar_bool(true)).unwrap();
        root.create_dataset("gap", Dataset::null()).unwrap();
        root
    }

    #[test]
    fn tree_lists_groups_attrs_and_shapes() {
        let text = render_tree(&sample(), None);
        assert_eq!(
            text,
            "  flag  bool scalar\n  gap  null\n  nodes/\n    GRID/  [layout=columnar]\n      keys  int64[2]\n"
        );
    }

    #[test]
    fn format_note_names_the_container() {
        let note = format_note();
        assert!(note.starts_with("format: CSH5 v1 "));
        assert!(note.contains("not readable by HDF5 tools"));
    }

    #[test]
    fn depth_limit_summarizes_children() {
        let text = render_tree(&sample(), Some(1));
        assert!(text.contains("  nodes/\n    … 1 children\n"));
        assert!(!text.contains("keys"));
    }
}
