use acervo_core::models::{Document, DocumentId};

/// Ordered set of selected document ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<DocumentId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flip membership. Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: DocumentId) -> bool {
        if self.contains(id) {
            self.deselect(id);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn select(&mut self, id: DocumentId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn deselect(&mut self, id: DocumentId) {
        self.ids.retain(|selected| *selected != id);
    }

    /// Add every visible document, keeping earlier selections first.
    pub fn select_all_visible(&mut self, visible: &[Document]) {
        for doc in visible {
            self.select(doc.id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Frozen copy handed to batch operations
    pub fn snapshot(&self) -> Vec<DocumentId> {
        self.ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_toggle_and_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut selection = Selection::new();
        assert!(selection.toggle(b));
        selection.select(a);
        selection.select(b);
        assert_eq!(selection.snapshot(), vec![b, a]);
        assert!(!selection.toggle(b));
        selection.select(c);
        assert_eq!(selection.snapshot(), vec![a, c]);
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let id = Uuid::new_v4();
        let mut selection = Selection::new();
        selection.select(id);
        let frozen = selection.snapshot();
        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(frozen, vec![id]);
    }
}
