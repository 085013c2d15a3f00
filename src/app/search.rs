//! Incremental search over every tab, hidden queries included.

use super::mode::Tab;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub text: String,
    /// Indices into the candidate list, in candidate order.
    pub matches: Vec<usize>,
    /// Highlighted position within `matches`.
    pub selected: usize,
}

/// Indices of the candidates whose name or description contains `text`,
/// ignoring case. An empty `text` matches everything.
pub fn filter_candidates(candidates: &[Tab], text: &str) -> Vec<usize> {
    let needle = text.to_lowercase();
    candidates
        .iter()
        .enumerate()
        .filter(|(_, tab)| {
            needle.is_empty()
                || tab.name().to_lowercase().contains(&needle)
                || tab.description().to_lowercase().contains(&needle)
        })
        .map(|(i, _)| i)
        .collect()
}

impl SearchState {
    pub fn new(candidates: &[Tab]) -> Self {
        Self {
            text: String::new(),
            matches: filter_candidates(candidates, ""),
            selected: 0,
        }
    }

    fn refilter(&mut self, candidates: &[Tab]) {
        self.matches = filter_candidates(candidates, &self.text);
        if self.selected >= self.matches.len() {
            self.selected = 0;
        }
    }

    pub fn push_char(&mut self, c: char, candidates: &[Tab]) {
        self.text.push(c);
        self.refilter(candidates);
    }

    pub fn pop_char(&mut self, candidates: &[Tab]) {
        self.text.pop();
        self.refilter(candidates);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.matches.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Candidate index of the highlighted match.
    pub fn highlighted(&self) -> Option<usize> {
        self.matches.get(self.selected).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SavedQuery;

    fn candidates() -> Vec<Tab> {
        vec![
            Tab::Home,
            Tab::Active,
            Tab::Query(SavedQuery::new("Locks", "Blocking lock chains", "SELECT 1", Some(1))),
            Tab::Query(SavedQuery::new("Stats", "Table statistics", "SELECT 2", None)),
            Tab::Query(SavedQuery::new("Vacuum", "Autovacuum progress on TABLES", "SELECT 3", None)),
        ]
    }

    #[test]
    fn empty_text_matches_everything() {
        let c = candidates();
        assert_eq!(filter_candidates(&c, ""), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn matches_name_or_description_ignoring_case() {
        let c = candidates();
        assert_eq!(filter_candidates(&c, "LOCK"), vec![2]);
        assert_eq!(filter_candidates(&c, "table"), vec![3, 4]);
        assert_eq!(filter_candidates(&c, "backend"), vec![1]);
        assert!(filter_candidates(&c, "nothing here").is_empty());
    }

    #[test]
    fn typing_and_backspace_refilter() {
        let c = candidates();
        let mut s = SearchState::new(&c);
        s.push_char('s', &c);
        s.push_char('t', &c);
        s.push_char('a', &c);
        assert_eq!(s.matches, vec![3]);
        s.pop_char(&c);
        s.pop_char(&c);
        assert_eq!(s.text, "s");
        assert!(s.matches.len() > 1);
    }

    #[test]
    fn highlight_is_clamped_without_wraparound() {
        let c = candidates();
        let mut s = SearchState::new(&c);
        s.select_prev();
        assert_eq!(s.selected, 0);
        for _ in 0..10 {
            s.select_next();
        }
        assert_eq!(s.selected, 4);
        assert_eq!(s.highlighted(), Some(4));
    }

    #[test]
    fn highlight_resets_when_matches_shrink() {
        let c = candidates();
        let mut s = SearchState::new(&c);
        s.select_next();
        s.select_next();
        s.select_next();
        s.push_char('l', &c);
        s.push_char('o', &c);
        s.push_char('c', &c);
        assert_eq!(s.selected, 0);
        assert_eq!(s.highlighted(), Some(2));
    }

    #[test]
    fn no_matches_has_no_highlight() {
        let c = candidates();
        let mut s = SearchState::new(&c);
        s.push_char('z', &c);
        s.push_char('z', &c);
        assert_eq!(s.highlighted(), None);
    }
}
