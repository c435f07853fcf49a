//! Selected-marker set, in selection order.

use serde::{Deserialize, Serialize};

use crate::marker::MarkerId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    ids: Vec<MarkerId>,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &MarkerId) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    /// Flips membership; returns true when the marker is now selected.
    pub fn toggle(&mut self, id: &MarkerId) -> bool {
        if let Some(pos) = self.ids.iter().position(|i| i == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id.clone());
            true
        }
    }

    /// Replaces the selection with the given ids, keeping their order.
    pub fn select_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = MarkerId>,
    {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn remove(&mut self, id: &MarkerId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|i| i != id);
        self.ids.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerId> {
        self.ids.iter()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<MarkerId> {
        self.ids.clone()
    }
}
