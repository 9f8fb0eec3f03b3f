use super::EntityId;

/// Paint order of the scene's entities: first drawn first, last on top.
///
/// Each id appears at most once. Promotion removes and re-appends, so the
/// length never changes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrawOrder {
    ids: Vec<EntityId>,
}

impl DrawOrder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: EntityId) {
        debug_assert!(!self.ids.contains(&id));
        self.ids.push(id);
    }

    /// Moves `id` to the top. Returns false if `id` is not present.
    pub fn promote(&mut self, id: EntityId) -> bool {
        let Some(i) = self.ids.iter().position(|e| *e == id) else {
            return false;
        };
        if i + 1 != self.ids.len() {
            let id = self.ids.remove(i);
            self.ids.push(id);
        }
        true
    }

    /// Removes `id`. Returns false if `id` is not present.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(i) = self.ids.iter().position(|e| *e == id) else {
            return false;
        };
        self.ids.remove(i);
        true
    }

    #[inline]
    pub fn top(&self) -> Option<EntityId> {
        self.ids.last().copied()
    }

    /// Bottom to top.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(ids: &[u32]) -> DrawOrder {
        let mut o = DrawOrder::new();
        for id in ids {
            o.push(EntityId(*id));
        }
        o
    }

    fn ids(o: &DrawOrder) -> Vec<u32> {
        o.iter().map(|e| e.0).collect()
    }

    #[test]
    fn promote_moves_to_end() {
        let mut o = order(&[1, 2, 3]);
        assert!(o.promote(EntityId(1)));
        assert_eq!(ids(&o), [2, 3, 1]);
        assert_eq!(o.top(), Some(EntityId(1)));
    }

    #[test]
    fn promote_top_is_idempotent() {
        let mut o = order(&[1, 2, 3]);
        assert!(o.promote(EntityId(3)));
        assert!(o.promote(EntityId(3)));
        assert_eq!(ids(&o), [1, 2, 3]);
    }

    #[test]
    fn promote_unknown_is_noop() {
        let mut o = order(&[1, 2]);
        assert!(!o.promote(EntityId(9)));
        assert_eq!(o.len(), 2);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let mut o = order(&[1, 2, 3]);
        assert!(o.remove(EntityId(2)));
        assert!(!o.remove(EntityId(2)));
        assert_eq!(ids(&o), [1, 3]);
    }
}
