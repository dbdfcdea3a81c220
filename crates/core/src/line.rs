//! FIFO waiting line of requester ids for one bench.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Ordered, duplicate-free queue of requester ids.
///
/// Insertion order is arrival order. Serializes as a plain JSON array so it
/// can live inside a cache record unchanged; duplicates in stored input are
/// dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DbId>", into = "Vec<DbId>")]
pub struct Line {
    users: Vec<DbId>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already waiting. Returns `true` if appended.
    pub fn add(&mut self, id: DbId) -> bool {
        if self.has(id) {
            return false;
        }
        self.users.push(id);
        true
    }

    pub fn has(&self, id: DbId) -> bool {
        self.users.contains(&id)
    }

    /// Drop every occurrence of `id`. Returns `true` if anything was removed.
    pub fn remove(&mut self, id: DbId) -> bool {
        let before = self.users.len();
        self.users.retain(|&u| u != id);
        self.users.len() != before
    }

    pub fn size(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Remove and return the head of the line.
    pub fn pop_front(&mut self) -> Option<DbId> {
        if self.users.is_empty() {
            None
        } else {
            Some(self.users.remove(0))
        }
    }

    pub fn as_slice(&self) -> &[DbId] {
        &self.users
    }
}

impl From<Vec<DbId>> for Line {
    /// Build a line from stored ids, keeping the first occurrence of each.
    fn from(ids: Vec<DbId>) -> Self {
        let mut line = Line::new();
        for id in ids {
            line.add(id);
        }
        line
    }
}

impl From<Line> for Vec<DbId> {
    fn from(line: Line) -> Self {
        line.users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_appends_in_arrival_order() {
        let mut line = Line::new();
        assert!(line.add(3));
        assert!(line.add(1));
        assert!(line.add(2));
        assert_eq!(line.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn add_existing_is_noop() {
        let mut line = Line::new();
        line.add(5);
        line.add(6);
        assert!(!line.add(5));
        assert_eq!(line.as_slice(), &[5, 6]);
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut line = Line::from(vec![1, 2, 3, 4]);
        assert!(line.remove(2));
        assert_eq!(line.as_slice(), &[1, 3, 4]);
        assert!(!line.remove(42));
        assert_eq!(line.size(), 3);
    }

    #[test]
    fn pop_front_returns_head_then_none() {
        let mut line = Line::from(vec![7, 8]);
        assert_eq!(line.pop_front(), Some(7));
        assert_eq!(line.pop_front(), Some(8));
        assert_eq!(line.pop_front(), None);
        assert!(line.is_empty());
    }

    #[test]
    fn from_vec_drops_duplicates() {
        let line = Line::from(vec![4, 4, 9, 4]);
        assert_eq!(line.as_slice(), &[4, 9]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let line = Line::from(vec![1, 2]);
        assert_eq!(serde_json::to_string(&line).unwrap(), "[1,2]");
        let back: Line = serde_json::from_str("[2,1]").unwrap();
        assert_eq!(back.as_slice(), &[2, 1]);
    }

    #[test]
    fn deserializing_drops_repeated_ids() {
        let line: Line = serde_json::from_str("[2,2,3,2]").unwrap();
        assert_eq!(line.as_slice(), &[2, 3]);
    }
}
