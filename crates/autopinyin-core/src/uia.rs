//! Windows UI Automation implementation of the accessibility traits.

use crate::accessibility::{ControlKind, UiNode, UiTree};
use crate::error::{Error, Result};
use std::rc::Rc;
use tracing::debug;
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
};
use windows::Win32::UI::Accessibility::{
    CUIAutomation, IUIAutomation, IUIAutomationCondition, IUIAutomationElement, TreeScope_Children,
};

fn uia_error(e: windows::core::Error) -> Error {
    Error::Accessibility(e.to_string())
}

fn control_kind(id: i32) -> ControlKind {
    match id {
        50000 => ControlKind::Button,
        50007 => ControlKind::ListItem,
        50008 => ControlKind::List,
        50009 => ControlKind::Menu,
        50020 => ControlKind::Text,
        50021 => ControlKind::ToolBar,
        50032 => ControlKind::Window,
        50033 => ControlKind::Pane,
        other => ControlKind::Other(other),
    }
}

struct Context {
    automation: IUIAutomation,
    all: IUIAutomationCondition,
}

/// Desktop tree. Bound to the thread that created it.
#[derive(Clone)]
pub struct UiaTree {
    ctx: Rc<Context>,
}

impl UiaTree {
    pub fn new() -> Result<Self> {
        // Already initialised with another apartment model is fine for our calls.
        let _ = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        let automation: IUIAutomation =
            unsafe { CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER) }
                .map_err(uia_error)?;
        let all = unsafe { automation.CreateTrueCondition() }.map_err(uia_error)?;
        debug!("UI Automation ready");
        Ok(Self {
            ctx: Rc::new(Context { automation, all }),
        })
    }
}

impl UiTree for UiaTree {
    type Node = UiaNode;

    fn root(&self) -> Result<UiaNode> {
        let element = unsafe { self.ctx.automation.GetRootElement() }.map_err(uia_error)?;
        Ok(UiaNode {
            element,
            ctx: self.ctx.clone(),
        })
    }
}

#[derive(Clone)]
pub struct UiaNode {
    element: IUIAutomationElement,
    ctx: Rc<Context>,
}

impl UiNode for UiaNode {
    fn name(&self) -> Result<String> {
        let name = unsafe { self.element.CurrentName() }.map_err(uia_error)?;
        Ok(name.to_string())
    }

    fn control_kind(&self) -> Result<ControlKind> {
        let id = unsafe { self.element.CurrentControlType() }.map_err(uia_error)?;
        Ok(control_kind(id.0))
    }

    fn is_enabled(&self) -> Result<bool> {
        let enabled = unsafe { self.element.CurrentIsEnabled() }.map_err(uia_error)?;
        Ok(enabled.as_bool())
    }

    fn children(&self) -> Result<Vec<Self>> {
        let found = unsafe { self.element.FindAll(TreeScope_Children, &self.ctx.all) };
        let array = match found {
            Ok(array) => array,
            // A null array with a success code means no children.
            Err(e) if e.code().is_ok() => return Ok(Vec::new()),
            Err(e) => return Err(uia_error(e)),
        };

        let len = unsafe { array.Length() }.map_err(uia_error)?;
        let mut out = Vec::with_capacity(len.max(0) as usize);
        for i in 0..len {
            let element = unsafe { array.GetElement(i) }.map_err(uia_error)?;
            out.push(UiaNode {
                element,
                ctx: self.ctx.clone(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_kind_ids() {
        assert_eq!(control_kind(50000), ControlKind::Button);
        assert_eq!(control_kind(50007), ControlKind::ListItem);
        assert_eq!(control_kind(50032), ControlKind::Window);
        assert_eq!(control_kind(50025), ControlKind::Other(50025));
    }
}
