use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::width::text_extent;

/// Identifier used to look surfaces up inside a host region.
pub type SurfaceId = String;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: String, child: String },
}

struct SurfaceNode {
    id: Option<SurfaceId>,
    parent: RefCell<Weak<SurfaceNode>>,
    children: RefCell<Vec<Surface>>,
    content: RefCell<String>,
    preferred: Cell<Option<Size>>,
    frame: Cell<Rect>,
}

/// Retained node of a rendered region.
///
/// Handles are cheap clones of one shared node and compare by identity.
/// Children are owned by their parent; the parent link is weak so a
/// detached subtree is released once its last handle drops.
#[derive(Clone)]
pub struct Surface {
    node: Rc<SurfaceNode>,
}

impl Surface {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_id(id: impl Into<SurfaceId>) -> Self {
        Self::build(Some(id.into()))
    }

    /// Leaf surface whose preferred size is the extent of `content`.
    pub fn text(id: impl Into<SurfaceId>, content: impl Into<String>) -> Self {
        let surface = Self::with_id(id);
        surface.set_content(content);
        surface
    }

    fn build(id: Option<SurfaceId>) -> Self {
        Self {
            node: Rc::new(SurfaceNode {
                id,
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                content: RefCell::new(String::new()),
                preferred: Cell::new(None),
                frame: Cell::new(Rect::default()),
            }),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.node.id.as_deref()
    }

    pub fn ptr_eq(&self, other: &Surface) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub fn parent(&self) -> Option<Surface> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|node| Surface { node })
    }

    pub fn children(&self) -> Vec<Surface> {
        self.node.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.node.children.borrow().len()
    }

    /// Append `child`, moving it out of any previous parent first.
    pub fn add_child(&self, child: &Surface) -> Result<(), SurfaceError> {
        if self.is_descendant_of(child) {
            return Err(SurfaceError::Cycle {
                parent: self.to_string(),
                child: child.to_string(),
            });
        }
        child.detach();
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.children.borrow_mut().push(child.clone());
        Ok(())
    }

    /// Remove a direct child. Returns `false` if `child` is not one.
    pub fn remove_child(&self, child: &Surface) -> bool {
        let removed = {
            let mut children = self.node.children.borrow_mut();
            let before = children.len();
            children.retain(|existing| !existing.ptr_eq(child));
            children.len() != before
        };
        if removed {
            *child.node.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Remove this surface from its parent, if it has one.
    pub fn detach(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => false,
        }
    }

    /// Depth-first search of this surface and its descendants.
    pub fn find_by_id(&self, id: &str) -> Option<Surface> {
        let mut stack = vec![self.clone()];
        while let Some(surface) = stack.pop() {
            if surface.id() == Some(id) {
                return Some(surface);
            }
            let children = surface.node.children.borrow();
            stack.extend(children.iter().rev().cloned());
        }
        None
    }

    /// True if `ancestor` is this surface or one of its ancestors.
    pub fn is_descendant_of(&self, ancestor: &Surface) -> bool {
        let mut current = Some(self.clone());
        while let Some(surface) = current {
            if surface.ptr_eq(ancestor) {
                return true;
            }
            current = surface.parent();
        }
        false
    }

    pub fn content(&self) -> String {
        self.node.content.borrow().clone()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        *self.node.content.borrow_mut() = content.into();
    }

    pub fn set_preferred_size(&self, size: Size) {
        self.node.preferred.set(Some(size));
    }

    /// Explicit preferred size, falling back to the extent of the text content.
    pub fn preferred_size(&self) -> Size {
        self.node
            .preferred
            .get()
            .unwrap_or_else(|| text_extent(&self.node.content.borrow()))
    }

    pub fn frame(&self) -> Rect {
        self.node.frame.get()
    }

    pub fn set_frame(&self, frame: Rect) {
        self.node.frame.set(frame);
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Surface {}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "surface `{id}`"),
            None => write!(f, "surface@{:p}", Rc::as_ptr(&self.node)),
        }
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.node.id)
            .field("children", &self.child_count())
            .field("frame", &self.frame())
            .finish()
    }
}
