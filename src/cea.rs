//! Pipeline step S2: turn a stream of NFD code points into a stream of
//! collation elements, resolving contractions (contiguous and
//! discontiguous), expansions, and derived weights for unassigned code
//! points, and applying the table's variable-weighting policy.

use std::collections::VecDeque;

use crate::data::derived_ces;
use crate::normalize::ccc;
use crate::table::TableData;
use crate::weights::CollationElement;
use crate::VariableWeighting;

/// A lazy sequence of collation elements for one input. The generator is
/// cooperative: each call to `next` produces one element, pulling from the
/// underlying code-point iterator only as far as contraction matching
/// requires.
pub struct CollationElements<'t, I: Iterator<Item = u32>> {
    input: I,
    table: &'t TableData,
    weighting: VariableWeighting,
    // Code points pulled from the input but not yet consumed by a match
    pending: VecDeque<u32>,
    // Elements produced by the last match, not yet handed out
    out: VecDeque<CollationElement>,
    // Set while the most recent primary was a variable; governs how
    // ignorables after it are weighted
    last_variable: bool,
    starter_counts: Option<Vec<u16>>,
}

impl<'t, I: Iterator<Item = u32>> CollationElements<'t, I> {
    pub(crate) fn new(input: I, table: &'t TableData, weighting: VariableWeighting) -> Self {
        Self {
            input,
            table,
            weighting,
            pending: VecDeque::new(),
            out: VecDeque::new(),
            last_variable: false,
            starter_counts: None,
        }
    }

    /// Record, for each matched key, how many collation elements it
    /// produced. The collation-search layer consumes this side channel.
    #[must_use]
    pub fn with_starter_counts(mut self) -> Self {
        self.starter_counts = Some(Vec::new());
        self
    }

    /// The per-starter element counts recorded so far, if enabled.
    pub fn starter_counts(&self) -> Option<&[u16]> {
        self.starter_counts.as_deref()
    }

    // Make sure at least `n` code points are buffered; reports how many
    // actually are
    fn ensure_pending(&mut self, n: usize) -> usize {
        while self.pending.len() < n {
            match self.input.next() {
                Some(cp) => self.pending.push_back(cp),
                None => break,
            }
        }
        self.pending.len()
    }

    fn is_variable(&self, ce: CollationElement) -> bool {
        ce.l1 != 0 && self.table.variable_low <= ce.l1 && ce.l1 < self.table.variable_high
    }

    fn weighted(&mut self, ce: CollationElement) -> CollationElement {
        match self.weighting {
            VariableWeighting::NonIgnorable => ce,
            VariableWeighting::Blanked => {
                if self.is_variable(ce) {
                    self.last_variable = true;
                    CollationElement::default()
                } else if ce.l1 == 0 && (self.last_variable || ce.completely_ignorable()) {
                    CollationElement::default()
                } else {
                    self.last_variable = false;
                    ce
                }
            }
            VariableWeighting::Shifted | VariableWeighting::ShiftedTrimmed => {
                if ce.completely_ignorable() {
                    CollationElement::default()
                } else if self.is_variable(ce) {
                    self.last_variable = true;
                    CollationElement {
                        l1: 0,
                        l2: 0,
                        l3: 0,
                        l4: ce.l1,
                    }
                } else if ce.l1 == 0 && self.last_variable {
                    CollationElement::default()
                } else {
                    self.last_variable = false;
                    CollationElement {
                        l4: 0xFFFF_FFFF,
                        ..ce
                    }
                }
            }
        }
    }

    fn record_count(&mut self, n: usize) {
        if let Some(counts) = &mut self.starter_counts {
            counts.push(n.min(usize::from(u16::MAX)) as u16);
        }
    }

    // Find the longest trie key starting at the front of the buffer, then
    // try to lengthen it with discontiguous non-starters per the UCA
    // blocking rule, and queue its elements
    fn produce(&mut self) -> bool {
        if self.ensure_pending(1) == 0 {
            return false;
        }

        // Contiguous walk: remember the deepest node that carried a value
        let table = self.table;
        let trie = &table.trie;
        let mut node = crate::trie::CollationTrie::ROOT;
        let mut best: Option<(usize, u32)> = None;
        let mut depth = 0;

        loop {
            if self.ensure_pending(depth + 1) <= depth {
                break;
            }
            match trie.step(node, self.pending[depth]) {
                Some(next) => {
                    node = next;
                    depth += 1;
                    if trie.value(next).is_some() {
                        best = Some((depth, next));
                    }
                }
                None => break,
            }
        }

        let Some((mut matched, mut key_node)) = best else {
            // Unlisted code point: synthesize implicit weights. The lead
            // byte still goes through the reorder maps, since derived
            // elements are not part of the rewritten pool.
            let cp = self.pending.pop_front().unwrap();
            for mut ce in derived_ces(cp) {
                ce.l1 = crate::weights::replace_lead_byte(ce.l1, table.lead_byte_for(ce));
                let w = self.weighted(ce);
                self.out.push_back(w);
            }
            self.record_count(2);
            return true;
        };

        // Discontiguous extension: a following non-starter may continue the
        // key if no skipped mark blocks it (equal or higher combining class)
        let mut i = matched;
        let mut max_ccc = 0u8;

        loop {
            if self.ensure_pending(i + 1) <= i {
                break;
            }
            let cp = self.pending[i];
            let cc = ccc(cp);
            if cc == 0 {
                break;
            }
            if cc > max_ccc {
                if let Some(next) = trie.step(key_node, cp) {
                    if trie.value(next).is_some() {
                        key_node = next;
                        let _ = self.pending.remove(i);
                        continue;
                    }
                }
            }
            max_ccc = cc;
            i += 1;
        }

        let range = trie.value(key_node).unwrap();
        self.pending.drain(..matched);
        matched = range.len();

        for idx in range.first..range.last {
            let ce = table.pool[usize::from(idx)];
            let w = self.weighted(ce);
            self.out.push_back(w);
        }
        self.record_count(matched);
        true
    }
}

impl<I: Iterator<Item = u32>> Iterator for CollationElements<'_, I> {
    type Item = CollationElement;

    fn next(&mut self) -> Option<CollationElement> {
        loop {
            if let Some(ce) = self.out.pop_front() {
                return Some(ce);
            }
            if !self.produce() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::default_table;

    fn ces(cps: &[u32], weighting: VariableWeighting) -> Vec<CollationElement> {
        let table = default_table();
        CollationElements::new(cps.iter().copied(), table.data(), weighting).collect()
    }

    #[test]
    fn contraction_beats_singles() {
        // Cyrillic short i in decomposed form is a contraction
        let contracted = ces(&[0x0438, 0x0306], VariableWeighting::NonIgnorable);
        assert_eq!(contracted.len(), 1);

        let parts = ces(&[0x0438], VariableWeighting::NonIgnorable);
        assert_ne!(contracted[0].l1, parts[0].l1);
    }

    #[test]
    fn discontiguous_contraction_skips_lower_ccc_marks() {
        // A grave-below (ccc 220) sits between the base and the breve
        // (ccc 230); the contraction must still fire, and the skipped mark
        // must surface afterwards
        let out = ces(&[0x0438, 0x0316, 0x0306], VariableWeighting::NonIgnorable);
        let contracted = ces(&[0x0438, 0x0306], VariableWeighting::NonIgnorable);

        assert_eq!(out[0].l1, contracted[0].l1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].l1, 0);
        assert_ne!(out[1].l2, 0);
    }

    #[test]
    fn blocked_extension_stays_contiguous() {
        // Two ccc-230 marks: the second cannot reach past the first
        let out = ces(&[0x0438, 0x0301, 0x0306], VariableWeighting::NonIgnorable);
        let plain = ces(&[0x0438], VariableWeighting::NonIgnorable);
        assert_eq!(out[0].l1, plain[0].l1);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn unassigned_get_two_derived_elements() {
        let out = ces(&[0x3402], VariableWeighting::NonIgnorable);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].lead_byte(), 0x0E);
        assert_eq!(out[1].lead_byte(), 0x0F);
    }

    #[test]
    fn shifted_moves_variables_to_l4() {
        let out = ces(&[0x0020, 0x0061], VariableWeighting::Shifted);
        // Space: primary through tertiary zeroed, old primary in l4
        assert_eq!(out[0].l1, 0);
        assert_eq!(out[0].l4, 0x0318_0000);
        // Letter: untouched except for the high quaternary
        assert_ne!(out[1].l1, 0);
        assert_eq!(out[1].l4, 0xFFFF_FFFF);
    }

    #[test]
    fn ignorable_after_variable_is_dropped_when_shifted() {
        // Mark after a space: zeroed entirely
        let out = ces(&[0x0020, 0x0301], VariableWeighting::Shifted);
        assert!(out[1].completely_ignorable());

        // Same mark after a letter: kept
        let out = ces(&[0x0061, 0x0301], VariableWeighting::Shifted);
        assert!(!out[1].completely_ignorable());
    }

    #[test]
    fn starter_counts_track_expansions() {
        let table = default_table();
        let input = vec![0x0061, 0x3402];
        let mut elements = CollationElements::new(
            input.into_iter(),
            table.data(),
            VariableWeighting::NonIgnorable,
        )
        .with_starter_counts();
        let _: Vec<_> = elements.by_ref().collect();
        assert_eq!(elements.starter_counts(), Some(&[1u16, 2][..]));
    }
}
