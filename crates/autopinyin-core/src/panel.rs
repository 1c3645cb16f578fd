//! Candidate window of the Microsoft Pinyin IME, read through the accessibility tree.

use crate::accessibility::{find_child, find_descendant, is_named, ControlKind, UiNode, UiTree};
use crate::candidate::CandidateListProvider;
use crate::config::UiNames;
use crate::error::{Error, Result};
use crate::types::{Candidate, PageState};
use tracing::{debug, trace};

/// The input experience window sits at most this deep under the root.
const INPUT_EXPERIENCE_DEPTH: usize = 2;

struct PanelHandles<N> {
    list: N,
    previous: Option<N>,
    next: Option<N>,
}

pub struct CandidatePanel<T: UiTree> {
    tree: T,
    names: UiNames,
    handles: Option<PanelHandles<T::Node>>,
}

impl<T: UiTree> CandidatePanel<T> {
    pub fn new(tree: T, names: UiNames) -> Self {
        Self {
            tree,
            names,
            handles: None,
        }
    }

    fn discover(&self) -> Result<PanelHandles<T::Node>> {
        let names = &self.names;
        let root = self.tree.root()?;
        let window = find_descendant(&root, INPUT_EXPERIENCE_DEPTH, |n| {
            is_named(n, Some(ControlKind::Window), &names.input_experience)
        })?
        .ok_or(Error::CandidatePanelNotFound)?;
        let menu = find_child(&window, |n| {
            is_named(n, Some(ControlKind::Menu), &names.candidate_menu)
        })?
        .ok_or(Error::CandidatePanelNotFound)?;
        let list = find_child(&menu, |n| {
            is_named(n, Some(ControlKind::List), &names.candidate_list)
        })?
        .ok_or(Error::CandidatePanelNotFound)?;

        let previous = find_child(&list, |n| {
            is_named(n, Some(ControlKind::Button), &names.previous_page)
        })?;
        let next = find_child(&list, |n| {
            is_named(n, Some(ControlKind::Button), &names.next_page)
        })?;
        Ok(PanelHandles {
            list,
            previous,
            next,
        })
    }

    fn handles(&self) -> Result<&PanelHandles<T::Node>> {
        self.handles.as_ref().ok_or(Error::CandidatePanelNotFound)
    }

    fn read_candidates(&self) -> Result<Vec<Candidate>> {
        let list = &self.handles()?.list;
        let mut out = Vec::new();
        for child in list.children()? {
            if child.control_kind()? != ControlKind::ListItem {
                continue;
            }
            out.push(Candidate {
                index: out.len() + 1,
                text: child.name()?,
            });
        }
        Ok(out)
    }

    fn read_page_state(&self) -> Result<PageState> {
        let handles = self.handles()?;
        let enabled = |button: &Option<T::Node>| -> Result<bool> {
            match button {
                Some(b) => b.is_enabled(),
                None => Ok(false),
            }
        };
        Ok(PageState {
            has_previous: enabled(&handles.previous)?,
            has_next: enabled(&handles.next)?,
        })
    }
}

impl<T: UiTree> CandidateListProvider for CandidatePanel<T> {
    fn acquire(&mut self) -> Result<()> {
        if let Some(handles) = &self.handles {
            if handles.list.name().is_ok() {
                return Ok(());
            }
            debug!("Cached candidate list is stale");
            self.handles = None;
        }
        let handles = self.discover()?;
        trace!(
            "Candidate list found (previous: {}, next: {})",
            handles.previous.is_some(),
            handles.next.is_some()
        );
        self.handles = Some(handles);
        Ok(())
    }

    fn candidates(&mut self) -> Result<Vec<Candidate>> {
        let res = self.read_candidates();
        if res.is_err() {
            self.handles = None;
        }
        res
    }

    fn page_state(&mut self) -> Result<PageState> {
        let res = self.read_page_state();
        if res.is_err() {
            self.handles = None;
        }
        res
    }

    fn invalidate(&mut self) {
        self.handles = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNode, FakeTree};

    struct Fixture {
        tree: FakeTree,
        list: FakeNode,
        previous: FakeNode,
        next: FakeNode,
    }

    fn fixture(items: &[&str]) -> Fixture {
        let previous = FakeNode::new(ControlKind::Button, "上一页");
        let next = FakeNode::new(ControlKind::Button, "下一页");
        previous.set_enabled(false);
        let mut children: Vec<FakeNode> = items
            .iter()
            .map(|t| FakeNode::new(ControlKind::ListItem, t))
            .collect();
        children.push(previous.clone());
        children.push(next.clone());
        let list = FakeNode::new(ControlKind::List, "候选项面板").with_children(children);
        let tree = FakeTree::new(FakeNode::new(ControlKind::Pane, "桌面").with_children(vec![
            FakeNode::new(ControlKind::Pane, "").with_children(vec![FakeNode::new(
                ControlKind::Window,
                "Windows 输入体验",
            )
            .with_children(vec![FakeNode::new(ControlKind::Menu, "Microsoft 候选项 UI")
                .with_children(vec![list.clone()])])]),
        ]));
        Fixture {
            tree,
            list,
            previous,
            next,
        }
    }

    #[test]
    fn test_reads_list_items_in_order() {
        let f = fixture(&["你", "你们", "好"]);
        let mut panel = CandidatePanel::new(f.tree.clone(), UiNames::default());
        panel.acquire().expect("acquire");
        let texts: Vec<(usize, String)> = panel
            .candidates()
            .unwrap()
            .into_iter()
            .map(|c| (c.index, c.text))
            .collect();
        assert_eq!(
            texts,
            vec![(1, "你".into()), (2, "你们".into()), (3, "好".into())]
        );
    }

    #[test]
    fn test_page_state_follows_buttons() {
        let f = fixture(&["你"]);
        let mut panel = CandidatePanel::new(f.tree.clone(), UiNames::default());
        panel.acquire().expect("acquire");
        assert_eq!(
            panel.page_state().unwrap(),
            PageState {
                has_previous: false,
                has_next: true
            }
        );

        f.previous.set_enabled(true);
        f.next.set_enabled(false);
        assert_eq!(
            panel.page_state().unwrap(),
            PageState {
                has_previous: true,
                has_next: false
            }
        );
    }

    #[test]
    fn test_missing_window() {
        let tree = FakeTree::new(FakeNode::new(ControlKind::Pane, "桌面"));
        let mut panel = CandidatePanel::new(tree, UiNames::default());
        assert!(matches!(panel.acquire(), Err(Error::CandidatePanelNotFound)));
        assert!(matches!(panel.candidates(), Err(Error::CandidatePanelNotFound)));
    }

    #[test]
    fn test_stale_list_is_reacquired() {
        let f = fixture(&["你"]);
        let mut panel = CandidatePanel::new(f.tree.clone(), UiNames::default());
        panel.acquire().expect("acquire");

        f.list.set_broken(true);
        assert!(panel.candidates().is_err());
        // The failed read dropped the handles; the list is still broken.
        assert!(matches!(panel.acquire(), Err(Error::CandidatePanelNotFound)));

        f.list.set_broken(false);
        panel.acquire().expect("reacquire");
        assert_eq!(panel.candidates().unwrap().len(), 1);
    }
}
