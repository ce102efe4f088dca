use acervo_core::models::SourceFile;

/// Drag-and-drop target state. Only tracks whether a drag is hovering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropZone {
    active: bool,
}

impl DropZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A drag entered the zone.
    pub fn enter(&mut self) {
        self.active = true;
    }

    /// A drag left the zone without dropping.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Files were dropped. Hands them on for enqueueing.
    pub fn drop_files(&mut self, files: Vec<SourceFile>) -> Vec<SourceFile> {
        self.active = false;
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_zone_flag() {
        let mut zone = DropZone::new();
        assert!(!zone.is_active());
        zone.enter();
        zone.enter();
        assert!(zone.is_active());
        zone.cancel();
        assert!(!zone.is_active());

        zone.enter();
        let files = zone.drop_files(vec![SourceFile::new("a.pdf", "application/pdf", Vec::new())]);
        assert_eq!(files.len(), 1);
        assert!(!zone.is_active());
    }
}
