use planar_common::EntityId;

/// Ordered set of selected objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    items: Vec<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.items
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Apply a primary-button press.
    ///
    /// `hovered` is the object under the pointer and whether it can be selected.
    /// Pressing over nothing clears the selection; pressing over a non-selectable
    /// object leaves it untouched. With `shift` the hovered object is toggled,
    /// otherwise it becomes the only selected object.
    pub fn press(&mut self, hovered: Option<(EntityId, bool)>, shift: bool) {
        match hovered {
            None => self.items.clear(),
            Some((_, false)) => {}
            Some((id, true)) if shift => {
                if let Some(pos) = self.items.iter().position(|s| *s == id) {
                    self.items.remove(pos);
                } else {
                    self.items.push(id);
                }
            }
            Some((id, true)) => {
                self.items.clear();
                self.items.push(id);
            }
        }
    }

    /// Drop an object that no longer exists.
    pub fn forget(&mut self, id: EntityId) {
        self.items.retain(|s| *s != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_replaces_selection() {
        let (a, b) = (EntityId::new(), EntityId::new());
        let mut sel = Selection::new();
        sel.press(Some((a, true)), false);
        sel.press(Some((b, true)), false);
        assert_eq!(sel.as_slice(), &[b]);
    }

    #[test]
    fn shift_press_toggles() {
        let (a, b) = (EntityId::new(), EntityId::new());
        let mut sel = Selection::new();
        sel.press(Some((a, true)), false);
        sel.press(Some((b, true)), true);
        assert_eq!(sel.as_slice(), &[a, b]);
        sel.press(Some((a, true)), true);
        assert_eq!(sel.as_slice(), &[b]);
    }

    #[test]
    fn press_over_nothing_clears() {
        let mut sel = Selection::new();
        sel.press(Some((EntityId::new(), true)), false);
        sel.press(None, false);
        assert!(sel.is_empty());
    }

    #[test]
    fn unselectable_objects_are_ignored() {
        let a = EntityId::new();
        let mut sel = Selection::new();
        sel.press(Some((a, true)), false);
        sel.press(Some((EntityId::new(), false)), false);
        assert_eq!(sel.as_slice(), &[a]);
    }

    #[test]
    fn forget_removes_entry() {
        let a = EntityId::new();
        let mut sel = Selection::new();
        sel.press(Some((a, true)), false);
        sel.forget(a);
        assert!(!sel.contains(a));
    }
}
