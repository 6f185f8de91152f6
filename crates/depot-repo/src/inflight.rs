//! Content handed between concurrent requests of a remote that does not
//! store artifacts locally.
//!
//! A request joins the slot of its path before queueing on the path lock.
//! Whoever ends up fetching fills the slot; requests that were queued behind
//! it read the bytes instead of asking the origin again. The slot is removed
//! when the last ticket is dropped, so nothing outlives the burst of
//! requests that shared it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use depot_types::{RepoPath, RepoResource};

#[derive(Default)]
struct Slot {
    content: Option<(RepoResource, Bytes)>,
    holders: usize,
}

type SlotMap = Mutex<HashMap<RepoPath, Slot>>;

/// Per-path content slots owned by one remote repository.
#[derive(Default)]
pub struct ContentSlots {
    slots: Arc<SlotMap>,
}

impl ContentSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket on the slot of `path`, creating the slot if needed.
    pub fn join(&self, path: &RepoPath) -> SlotTicket {
        let mut slots = self.slots.lock().expect("lock poisoned");
        slots.entry(path.clone()).or_default().holders += 1;
        SlotTicket {
            slots: Arc::clone(&self.slots),
            path: path.clone(),
        }
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ContentSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSlots").field("slots", &self.len()).finish()
    }
}

/// Membership in one path's slot. Dropping the last ticket removes the slot.
pub struct SlotTicket {
    slots: Arc<SlotMap>,
    path: RepoPath,
}

impl SlotTicket {
    pub fn path(&self) -> &RepoPath {
        &self.path
    }

    /// Resource and bytes placed in the slot by another holder, if any.
    pub fn content(&self) -> Option<(RepoResource, Bytes)> {
        let slots = self.slots.lock().expect("lock poisoned");
        slots.get(&self.path).and_then(|slot| slot.content.clone())
    }

    pub fn fill(&self, resource: RepoResource, content: Bytes) {
        let mut slots = self.slots.lock().expect("lock poisoned");
        if let Some(slot) = slots.get_mut(&self.path) {
            slot.content = Some((resource, content));
        }
    }
}

impl Drop for SlotTicket {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().expect("lock poisoned");
        if let Some(slot) = slots.get_mut(&self.path) {
            slot.holders -= 1;
            if slot.holders == 0 {
                slots.remove(&self.path);
            }
        }
    }
}

impl fmt::Debug for SlotTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTicket").field("path", &self.path).finish()
    }
}
