//! The capability a packer needs from the things it lays out

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::types::{Rect, Size};

/// Handle of an item registered with a [`Packer`](super::Packer).
///
/// Ids increase monotonically and are never reused, so a stale id fails
/// lookups instead of silently naming a newer item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type NotificationQueue = Rc<RefCell<VecDeque<ItemId>>>;

/// Lets an item tell its packer that its preferred size may have changed.
///
/// Notifications are only queued; the packer picks them up at the start of its
/// next allocation, so notifying from inside [`LayoutItem::apply_geometry`] is
/// safe and simply schedules another rebuild.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    id: ItemId,
    queue: Weak<RefCell<VecDeque<ItemId>>>,
}

impl ChangeNotifier {
    pub(crate) fn new(id: ItemId, queue: &NotificationQueue) -> Self {
        Self {
            id,
            queue: Rc::downgrade(queue),
        }
    }

    /// Id of the item this notifier reports for
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Queue a change notification. Does nothing once the packer is gone.
    pub fn notify(&self) {
        if let Some(queue) = self.queue.upgrade() {
            trace!(item = %self.id, "change notification queued");
            queue.borrow_mut().push_back(self.id);
        }
    }
}

/// Something a packer can size and position
pub trait LayoutItem {
    /// `(minimum, natural)` size
    fn preferred_size(&self) -> (Size, Size);

    /// Receive the geometry computed by the last resolve
    fn apply_geometry(&mut self, rect: Rect);

    /// Called once when the item is registered
    fn attached(&mut self, _id: ItemId, _notifier: ChangeNotifier) {}
}
