/// Match records owned by the hub.
///
/// A match is forming while it waits for players and committed once full. Only a
/// forming match has removable slots; a committed one is frozen behind its multiplexer.
use std::sync::Arc;

use uuid::Uuid;

use crate::server::relay::Multiplexer;
use crate::server::session::Session;

/// Ordered slots of a forming match.
///
/// Slot order is the seating order the backend receives in the roster, so removals
/// keep the survivors' relative order.
#[derive(Debug, Default)]
pub struct SlotList {
    slots: Vec<Arc<Session>>,
}

impl SlotList {
    pub fn with_capacity(size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(size),
        }
    }

    pub fn push(&mut self, session: Arc<Session>) {
        self.slots.push(session);
    }

    /// Removes the slot at `index`, shifting later slots down by one.
    pub fn remove(&mut self, index: usize) -> Option<Arc<Session>> {
        (index < self.slots.len()).then(|| self.slots.remove(index))
    }

    pub fn position_of(&self, session_id: Uuid) -> Option<usize> {
        self.iter().position(|s| s.id() == session_id)
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.position_of(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.slots.iter()
    }

    pub fn into_vec(self) -> Vec<Arc<Session>> {
        self.slots
    }
}

/// A match still waiting for players.
#[derive(Debug)]
pub struct FormingMatch {
    pub id: Uuid,
    pub size: usize,
    pub slots: SlotList,
}

impl FormingMatch {
    pub fn new(size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            size,
            slots: SlotList::with_capacity(size),
        }
    }

    pub fn filled(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.filled() == self.size
    }
}

/// A match whose composition is frozen and whose traffic goes through a multiplexer.
pub struct CommittedMatch {
    pub id: Uuid,
    pub size: usize,
    /// Session ids of the slots.
    pub players: Vec<Uuid>,
    pub multiplexer: Arc<Multiplexer>,
}
