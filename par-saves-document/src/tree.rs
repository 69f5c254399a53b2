//! Traversal over a [`DocumentTree`].
//!
//! Reads never mutate and stop at the first missing or non-object
//! intermediate node. Writes create any missing intermediate objects and
//! silently replace scalars that sit where an object is needed.

use crate::{DocumentTree, PropertyPath, Value};

/// Look up the value at `path`.
///
/// Returns `None` if any intermediate segment is absent or is not an
/// object, or if the final segment is absent.
pub fn read_path<'a>(tree: &'a DocumentTree, path: &PropertyPath) -> Option<&'a Value> {
    let (parents, last) = path.split_last();
    let mut node = tree;
    for segment in parents {
        node = node.get(segment)?.as_object()?;
    }
    node.get(last)
}

/// Store `value` at `path`, creating intermediate objects as needed.
///
/// Returns the value previously stored at the final segment, if any.
pub fn write_path_creating(
    tree: &mut DocumentTree,
    path: &PropertyPath,
    value: Value,
) -> Option<Value> {
    let (parents, last) = path.split_last();
    write_below(tree, parents, last, value)
}

fn write_below(
    node: &mut DocumentTree,
    parents: &[String],
    last: &str,
    value: Value,
) -> Option<Value> {
    let Some((segment, rest)) = parents.split_first() else {
        return node.insert(last.to_string(), value);
    };
    let slot = node
        .entry(segment.clone())
        .or_insert_with(|| Value::Object(DocumentTree::new()));
    if let Value::Object(child) = slot {
        return write_below(child, rest, last, value);
    }

    log::debug!("Replacing non-object value at segment '{segment}' with an object");
    let mut child = DocumentTree::new();
    let previous = write_below(&mut child, rest, last, value);
    *slot = Value::Object(child);
    previous
}

/// Remove the value at `path` without creating anything.
///
/// Returns the removed value, or `None` if the path did not resolve.
pub fn remove_path(tree: &mut DocumentTree, path: &PropertyPath) -> Option<Value> {
    let (parents, last) = path.split_last();
    let mut node = tree;
    for segment in parents {
        node = node.get_mut(segment)?.as_object_mut()?;
    }
    node.remove(last)
}
