//! Transient overlay state: modals, row popovers and outside-press dismissal
//!
//! A component has one [`OverlaySlot`]. Opening a modal or a popover replaces
//! whatever was open before, so two overlays of one component are never
//! visible together.
//!
//! Popovers close when the pointer is pressed outside their bounds. The
//! listener for that is a [`PointerSubscription`] owned by the popover
//! variant of the slot; it is registered on open and unregistered when the
//! slot changes, so no listener outlives its popover.

use ratatui::layout::Rect;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::ui::rect_contains;

#[derive(Debug, Default)]
struct Listener {
    bounds: Option<Rect>,
    pressed_outside: bool,
}

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Fans pointer presses out to the currently registered listeners
#[derive(Debug, Clone, Default)]
pub struct PointerHub {
    state: Rc<RefCell<HubState>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> PointerSubscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(id, Listener::default());
        PointerSubscription {
            id,
            hub: Rc::downgrade(&self.state),
        }
    }

    /// Record a press at a terminal cell
    pub fn dispatch_press(&self, column: u16, row: u16) {
        for listener in self.state.borrow_mut().listeners.values_mut() {
            // Not drawn yet, nothing to be outside of
            if let Some(bounds) = listener.bounds {
                if !rect_contains(bounds, column, row) {
                    listener.pressed_outside = true;
                }
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

/// Registration of one outside-press listener; unregisters on drop
#[derive(Debug)]
pub struct PointerSubscription {
    id: u64,
    hub: Weak<RefCell<HubState>>,
}

impl PointerSubscription {
    pub fn set_bounds(&self, bounds: Rect) {
        if let Some(state) = self.hub.upgrade() {
            if let Some(listener) = state.borrow_mut().listeners.get_mut(&self.id) {
                listener.bounds = Some(bounds);
            }
        }
    }

    pub fn bounds(&self) -> Option<Rect> {
        let state = self.hub.upgrade()?;
        let state = state.borrow();
        state.listeners.get(&self.id)?.bounds
    }

    /// Whether a press landed outside since the last call
    pub fn take_outside_press(&self) -> bool {
        let Some(state) = self.hub.upgrade() else {
            return false;
        };
        let mut state = state.borrow_mut();
        match state.listeners.get_mut(&self.id) {
            Some(listener) => std::mem::take(&mut listener.pressed_outside),
            None => false,
        }
    }
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            state.borrow_mut().listeners.remove(&self.id);
        }
    }
}

/// The one overlay a component may show at a time
#[derive(Debug)]
pub enum OverlaySlot<K> {
    Closed,
    Modal,
    Popover {
        key: K,
        subscription: PointerSubscription,
    },
}

impl<K> Default for OverlaySlot<K> {
    fn default() -> Self {
        OverlaySlot::Closed
    }
}

impl<K: Copy + PartialEq> OverlaySlot<K> {
    pub fn open_modal(&mut self) {
        *self = OverlaySlot::Modal;
    }

    pub fn open_popover(&mut self, key: K, hub: &PointerHub) {
        // Drop the old subscription before registering the new one
        *self = OverlaySlot::Closed;
        *self = OverlaySlot::Popover {
            key,
            subscription: hub.subscribe(),
        };
    }

    /// Open the popover for `key`, or close it if it is the one already open
    pub fn toggle_popover(&mut self, key: K, hub: &PointerHub) {
        if self.popover_key() == Some(key) {
            self.close();
        } else {
            self.open_popover(key, hub);
        }
    }

    pub fn close(&mut self) {
        *self = OverlaySlot::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, OverlaySlot::Closed)
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self, OverlaySlot::Modal)
    }

    pub fn popover_key(&self) -> Option<K> {
        match self {
            OverlaySlot::Popover { key, .. } => Some(*key),
            _ => None,
        }
    }

    pub fn set_popover_bounds(&self, bounds: Rect) {
        if let OverlaySlot::Popover { subscription, .. } = self {
            subscription.set_bounds(bounds);
        }
    }

    pub fn popover_bounds(&self) -> Option<Rect> {
        match self {
            OverlaySlot::Popover { subscription, .. } => subscription.bounds(),
            _ => None,
        }
    }

    /// Close the popover if a press landed outside it. Returns true if closed.
    pub fn dismiss_on_outside_press(&mut self) -> bool {
        let outside = match self {
            OverlaySlot::Popover { subscription, .. } => subscription.take_outside_press(),
            _ => false,
        };
        if outside {
            self.close();
        }
        outside
    }
}

/// Where a press landed relative to an open modal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPress {
    /// Inside the dialog; handled there and not passed to the backdrop
    Content,
    /// On the dimmed area around the dialog; closes the modal
    Backdrop,
}

/// Remembers where a modal dialog was last drawn
#[derive(Debug, Default, Clone, Copy)]
pub struct ModalFrame {
    content: Option<Rect>,
}

impl ModalFrame {
    pub fn set_content_area(&mut self, area: Rect) {
        self.content = Some(area);
    }

    pub fn classify(&self, column: u16, row: u16) -> ModalPress {
        match self.content {
            Some(area) if rect_contains(area, column, row) => ModalPress::Content,
            _ => ModalPress::Backdrop,
        }
    }
}
