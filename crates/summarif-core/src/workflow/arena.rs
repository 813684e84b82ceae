//! Document storage keyed by id with generation counters.
//!
//! Every insertion gets a fresh generation. Work started on a document keeps
//! a [`Ticket`] and writes its result back only if the slot still holds the
//! same generation, so results for deleted (or deleted and re-added)
//! documents are dropped.

use std::collections::HashMap;

use crate::document::Document;

/// Identifies one incarnation of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub generation: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    document: Document,
}

#[derive(Debug, Default)]
pub struct DocumentArena {
    slots: HashMap<String, Slot>,
    next_generation: u64,
}

impl DocumentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document. Returns `None` if the id is already live.
    pub fn insert(&mut self, document: Document) -> Option<Ticket> {
        if self.slots.contains_key(&document.id) {
            return None;
        }
        self.next_generation += 1;
        let ticket = Ticket {
            id: document.id.clone(),
            generation: self.next_generation,
        };
        self.slots.insert(
            document.id.clone(),
            Slot {
                generation: ticket.generation,
                document,
            },
        );
        Some(ticket)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.slots.get(id).map(|s| &s.document)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.slots.get_mut(id).map(|s| &mut s.document)
    }

    /// Current ticket for a live document.
    pub fn ticket(&self, id: &str) -> Option<Ticket> {
        self.slots.get(id).map(|s| Ticket {
            id: id.to_string(),
            generation: s.generation,
        })
    }

    /// The document for `ticket`, if that incarnation is still live.
    pub fn resolve_mut(&mut self, ticket: &Ticket) -> Option<&mut Document> {
        self.slots
            .get_mut(&ticket.id)
            .filter(|s| s.generation == ticket.generation)
            .map(|s| &mut s.document)
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        self.slots.remove(id).map(|s| s.document)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Documents ordered newest first.
    pub fn newest_first(&self) -> Vec<&Document> {
        let mut slots: Vec<&Slot> = self.slots.values().collect();
        slots.sort_by(|a, b| b.generation.cmp(&a.generation));
        slots.into_iter().map(|s| &s.document).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.slots.values().map(|s| &s.document)
    }
}
