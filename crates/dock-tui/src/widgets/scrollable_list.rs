//! Selection and scroll state for a list that is replaced wholesale on every
//! refresh (poll results, library reloads).

pub struct ScrollableList<T> {
    items: Vec<T>,
    selected: usize,
    scroll_offset: usize,
}

impl<T> Default for ScrollableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }
}

impl<T> ScrollableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Replaces the items. The selection follows the previously selected
    /// item by `key` when it is still present, else clamps to the new length.
    pub fn set_items<K, F>(&mut self, items: Vec<T>, key: F)
    where
        K: PartialEq,
        F: Fn(&T) -> K,
    {
        let previous = self.items.get(self.selected).map(&key);
        self.items = items;
        if let Some(prev) = previous {
            if let Some(pos) = self.items.iter().position(|i| key(i) == prev) {
                self.selected = pos;
                return;
            }
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        self.scroll_offset = self.scroll_offset.min(self.selected);
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.items.len() - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// `(index, item)` pairs for a viewport of `height` rows. Call
    /// [`ensure_visible`](Self::ensure_visible) first.
    pub fn visible_items(&self, height: usize) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(height)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_follows_key_across_refresh() {
        let mut list = ScrollableList::new();
        list.set_items(vec!["a", "b", "c"], |s| *s);
        list.select_down(1);
        assert_eq!(list.selected_item(), Some(&"b"));

        list.set_items(vec!["z", "c", "b"], |s| *s);
        assert_eq!(list.selected_item(), Some(&"b"));

        list.set_items(vec!["x"], |s| *s);
        assert_eq!(list.selected_item(), Some(&"x"), "missing key clamps");

        list.set_items(Vec::new(), |s| *s);
        assert_eq!(list.selected_item(), None);
        list.select_down(3);
        assert_eq!(list.selected_index(), 0);
    }

    #[test]
    fn viewport_scrolls_with_selection() {
        let mut list = ScrollableList::new();
        list.set_items((0..10).collect(), |n: &i32| *n);
        list.select_down(6);
        list.ensure_visible(4);
        let shown: Vec<_> = list.visible_items(4).map(|(_, n)| *n).collect();
        assert_eq!(shown, vec![3, 4, 5, 6]);

        list.select_first();
        list.ensure_visible(4);
        assert_eq!(list.visible_items(4).next().map(|(i, _)| i), Some(0));
    }
}
