//! Read-only view of a platform accessibility tree.
//!
//! Lookups are structural (name, control type, depth). Elements that vanish
//! while being inspected are treated as absent rather than as faults, so a
//! search either finds a live element, returns `Ok(None)`, or fails because
//! the tree itself could not be reached.

use crate::error::Result;
use std::collections::VecDeque;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    List,
    ListItem,
    Menu,
    Pane,
    Text,
    ToolBar,
    Window,
    Other(i32),
}

pub trait UiNode: Clone {
    fn name(&self) -> Result<String>;
    fn control_kind(&self) -> Result<ControlKind>;
    fn is_enabled(&self) -> Result<bool>;
    fn children(&self) -> Result<Vec<Self>>;
}

pub trait UiTree {
    type Node: UiNode;

    fn root(&self) -> Result<Self::Node>;
}

/// Matches on control type (if given) and exact name.
pub fn is_named<N: UiNode>(node: &N, kind: Option<ControlKind>, name: &str) -> bool {
    if let Some(kind) = kind {
        if !matches!(node.control_kind(), Ok(k) if k == kind) {
            return false;
        }
    }
    matches!(node.name(), Ok(n) if n == name)
}

pub fn name_contains<N: UiNode>(node: &N, needle: &str) -> bool {
    matches!(node.name(), Ok(n) if n.contains(needle))
}

/// First direct child satisfying `pred`.
pub fn find_child<N: UiNode>(parent: &N, pred: impl Fn(&N) -> bool) -> Result<Option<N>> {
    Ok(parent.children()?.into_iter().find(|c| pred(c)))
}

/// Breadth-first search of the descendants of `parent`, `max_depth` levels deep
/// (1 = direct children only).
pub fn find_descendant<N: UiNode>(
    parent: &N,
    max_depth: usize,
    pred: impl Fn(&N) -> bool,
) -> Result<Option<N>> {
    let mut queue: VecDeque<(N, usize)> = VecDeque::new();
    for child in parent.children()? {
        queue.push_back((child, 1));
    }

    while let Some((node, depth)) = queue.pop_front() {
        if pred(&node) {
            return Ok(Some(node));
        }
        if depth < max_depth {
            match node.children() {
                Ok(children) => queue.extend(children.into_iter().map(|c| (c, depth + 1))),
                Err(e) => trace!("skipping subtree at depth {}: {}", depth, e),
            }
        }
    }
    Ok(None)
}

/// First element exactly `depth` levels below `parent` satisfying `pred`.
pub fn find_at_depth<N: UiNode>(
    parent: &N,
    depth: usize,
    pred: impl Fn(&N) -> bool,
) -> Result<Option<N>> {
    let mut level = vec![parent.clone()];
    for d in 0..depth {
        let mut next = Vec::new();
        for node in &level {
            match node.children() {
                Ok(children) => next.extend(children),
                Err(e) if d == 0 => return Err(e),
                Err(e) => trace!("skipping subtree at depth {}: {}", d, e),
            }
        }
        level = next;
    }
    Ok(level.into_iter().find(|n| pred(n)))
}

/// Names of `node` and its descendants (depth-first, `max_depth` levels), joined by spaces.
pub fn subtree_text<N: UiNode>(node: &N, max_depth: usize) -> String {
    fn walk<N: UiNode>(node: &N, depth: usize, max_depth: usize, out: &mut Vec<String>) {
        if let Ok(name) = node.name() {
            if !name.is_empty() {
                out.push(name);
            }
        }
        if depth < max_depth {
            if let Ok(children) = node.children() {
                for child in &children {
                    walk(child, depth + 1, max_depth, out);
                }
            }
        }
    }

    let mut parts = Vec::new();
    walk(node, 0, max_depth, &mut parts);
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNode;

    fn sample() -> FakeNode {
        FakeNode::new(ControlKind::Pane, "root").with_children(vec![
            FakeNode::new(ControlKind::Pane, "a").with_children(vec![FakeNode::new(
                ControlKind::Pane,
                "a1",
            )
            .with_children(vec![FakeNode::new(ControlKind::Button, "deep")])]),
            FakeNode::new(ControlKind::Window, "b"),
        ])
    }

    #[test]
    fn test_find_child() {
        let root = sample();
        let b = find_child(&root, |n| is_named(n, Some(ControlKind::Window), "b")).unwrap();
        assert!(b.is_some());
        let missing = find_child(&root, |n| is_named(n, None, "a1")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_find_descendant_respects_depth() {
        let root = sample();
        assert!(find_descendant(&root, 2, |n| is_named(n, None, "deep"))
            .unwrap()
            .is_none());
        assert!(find_descendant(&root, 3, |n| is_named(n, None, "deep"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_find_at_depth() {
        let root = sample();
        assert!(find_at_depth(&root, 2, |n| name_contains(n, "a1"))
            .unwrap()
            .is_some());
        assert!(find_at_depth(&root, 1, |n| name_contains(n, "a1"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_vanished_children_are_skipped() {
        let broken = FakeNode::new(ControlKind::Pane, "gone");
        broken.set_broken(true);
        let root = FakeNode::new(ControlKind::Pane, "root").with_children(vec![
            broken,
            FakeNode::new(ControlKind::Pane, "ok")
                .with_children(vec![FakeNode::new(ControlKind::Text, "target")]),
        ]);
        let found = find_descendant(&root, 2, |n| is_named(n, None, "target")).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_subtree_text() {
        let node = FakeNode::new(ControlKind::Button, "输入指示器")
            .with_children(vec![FakeNode::new(ControlKind::Text, "中")]);
        assert_eq!(subtree_text(&node, 2), "输入指示器 中");
    }
}
