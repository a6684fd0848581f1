//! The tailoring engine. Consumes the parser's event stream and mutates a
//! clone of the default table — trie, CE pool, and an order-keeping temp
//! table — so that the sealed result realizes the requested order while
//! preserving the UCA well-formedness conditions.

use log::{debug, trace};
use tinyvec::TinyVec;

use crate::cea::CollationElements;
use crate::data::{
    derived_ces, FIRST_IMPLICIT_CP, FIRST_PRIMARY_IGNORABLE_CP, FIRST_REGULAR_CP,
    FIRST_TERTIARY_IGNORABLE_CP, FIRST_TRAILING_CP, FIRST_VARIABLE_CP, IMPLICIT_FINAL_LEAD,
    LAST_PRIMARY_IGNORABLE_CP, LAST_REGULAR_CP, LAST_TERTIARY_IGNORABLE_CP, LAST_VARIABLE_CP,
    REORDER_GROUPS, SECONDARY_IGNORABLE_CE,
};
use crate::parse::{
    expand_reorder, parse_rules, LogicalPosition, ResetTarget, RuleEvent, LOGICAL_POSITION_COUNT,
};
use crate::sort_key::{ce_seq_less, ce_seq_less_eq};
use crate::table::{
    build_default_data, identity_reorders, NonsimpleReorder, Table, TableData, TableSettings,
};
use crate::trie::{CeRange, CollationTrie};
use crate::weights::{
    increment_ce, replace_lead_byte, well_formed_1, well_formed_1_seq, well_formed_2,
    well_formed_2_seq, CollationElement, Strength, TailoringState, CASE_CLEAR_MASK, CASE_MASK,
    COMMON_SEC, COMMON_TER, LEAD_MASK, LOWER_CASE_BITS, UPPER_CASE_BITS,
};
use crate::{Diagnostic, Error, VariableWeighting};

pub type CeSeq = TinyVec<[CollationElement; 4]>;

#[derive(Clone, Debug)]
struct TempEntry {
    cps: Vec<u32>,
    ces: CeSeq,
    tailored: bool,
}

fn seq_of(ces: &[CollationElement]) -> CeSeq {
    ces.iter().copied().collect()
}

fn lower_bound(temp: &[TempEntry], ces: &[CollationElement]) -> usize {
    temp.partition_point(|e| ce_seq_less(&e.ces, ces))
}

fn upper_bound(temp: &[TempEntry], ces: &[CollationElement]) -> usize {
    temp.partition_point(|e| !ce_seq_less(ces, &e.ces))
}

// The last element whose strength is at least as great as `strength` (i.e.
// primary counts for a secondary relation, and so on)
fn last_ce_at_least_strength(ces: &[CollationElement], strength: Strength) -> Option<usize> {
    ces.iter().rposition(|ce| ce.strength() <= strength)
}

/// Drives one tailoring build: owns the working table data, the temp table,
/// the logical positions, and the WF2 maxima. Sealed exactly once.
pub struct Builder {
    data: TableData,
    temp: Vec<TempEntry>,
    logical: Vec<CeSeq>,
    state: TailoringState,
    settings: TableSettings,
    // Reorder results are recorded here and applied to the pool at seal
    // time, so the whole build works in original lead-byte space
    simple_reorders: [u8; 256],
    nonsimple_reorders: Vec<NonsimpleReorder>,
    anchor: Option<(ResetTarget, bool)>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let data = build_default_data();

        let mut temp: Vec<TempEntry> = data
            .trie
            .iter()
            .map(|(cps, range)| TempEntry {
                ces: seq_of(data.ces(range)),
                cps,
                tailored: false,
            })
            .collect();
        temp.sort_by(|a, b| {
            if ce_seq_less(&a.ces, &b.ces) {
                std::cmp::Ordering::Less
            } else if ce_seq_less(&b.ces, &a.ces) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let mut state = TailoringState {
            last_secondary_in_primary: COMMON_SEC,
            last_tertiary_in_secondary: COMMON_TER,
        };
        for &ce in &data.pool {
            match ce.strength() {
                Strength::Primary => {
                    state.last_secondary_in_primary = state.last_secondary_in_primary.max(ce.l2);
                }
                Strength::Secondary => {
                    if ce.l3 & CASE_CLEAR_MASK > state.last_tertiary_in_secondary & CASE_CLEAR_MASK
                    {
                        state.last_tertiary_in_secondary = ce.l3;
                    }
                }
                _ => {}
            }
        }

        let logical = init_logical_positions(&data);

        Self {
            data,
            temp,
            logical,
            state,
            settings: TableSettings::default(),
            simple_reorders: identity_reorders(),
            nonsimple_reorders: Vec::new(),
            anchor: None,
        }
    }

    pub fn apply(&mut self, event: RuleEvent) -> Result<(), Error> {
        match event {
            RuleEvent::Reset { target, before } => {
                self.anchor = Some((target, before));
            }
            RuleEvent::Relation {
                strength,
                cps,
                prefix,
                extension,
            } => {
                let (target, before) = self.anchor.clone().ok_or_else(|| Error::Parse {
                    offset: 0,
                    message: "relation before any reset".to_owned(),
                })?;
                self.modify(
                    &target,
                    before,
                    strength,
                    &cps,
                    prefix.as_deref(),
                    extension.as_deref(),
                )?;
                self.anchor = Some((ResetTarget::Sequence(cps), false));
            }
            RuleEvent::Strength(s) => self.settings.strength = Some(s),
            RuleEvent::VariableWeighting(w) => self.settings.weighting = Some(w),
            RuleEvent::L2Order(o) => self.settings.l2_order = Some(o),
            RuleEvent::CaseLevel(c) => self.settings.case_level = Some(c),
            RuleEvent::CaseFirst(f) => self.settings.case_first = Some(f),
            RuleEvent::Suppress(cps) => {
                for cp in cps {
                    self.suppress(cp);
                }
            }
            RuleEvent::Reorder(names) => self.reorder(&names)?,
        }
        Ok(())
    }

    fn get_ces(&self, cps: &[u32]) -> CeSeq {
        CollationElements::new(
            cps.iter().copied(),
            &self.data,
            VariableWeighting::NonIgnorable,
        )
        .collect()
    }

    #[allow(clippy::too_many_lines)]
    fn modify(
        &mut self,
        target: &ResetTarget,
        before: bool,
        strength: Strength,
        cps: &[u32],
        prefix: Option<&[u32]>,
        extension: Option<&[u32]>,
    ) -> Result<(), Error> {
        let mut reset_ces: CeSeq = match target {
            ResetTarget::Logical(lp) => self.logical[*lp as usize].clone(),
            ResetTarget::Sequence(seq) => self.get_ces(seq),
        };

        debug!(
            "relation: anchor {target:?} (before={before}) {strength:?} {cps:04X?} \
             anchor ces {reset_ces:X?}"
        );

        let initial_relation_ces = self.get_ces(cps);

        let mut relation: Vec<u32> = cps.to_vec();
        if let Some(p) = prefix {
            relation.extend_from_slice(p);
        }

        if before {
            // Keep only the last CE at the relation's strength; then back up
            // through the temp table to the previous entry distinct at that
            // strength, and anchor there instead
            let found = last_ce_at_least_strength(&reset_ces, strength);
            let ce = match found {
                Some(i) => reset_ces[i],
                None => CollationElement::default(),
            };
            reset_ces.clear();
            reset_ces.push(ce);

            let mut it = lower_bound(&self.temp, &reset_ces);
            let mut prev = None;
            while it > 0 {
                it -= 1;
                let curr = self.temp[it].ces.first().copied().unwrap_or_default();
                if curr.l1 != ce.l1
                    || (strength >= Strength::Secondary && curr.l2 != ce.l2)
                    || (strength >= Strength::Tertiary
                        && curr.l3 & CASE_CLEAR_MASK != ce.l3 & CASE_CLEAR_MASK)
                {
                    prev = Some(it);
                    break;
                }
            }
            let prev = prev.ok_or(Error::BeforeUnanchorable)?;
            reset_ces = self.temp[prev].ces.clone();

            // A "before" on the first-variable symbol must not escape the
            // variable region: pin the lead byte back
            if *target == ResetTarget::Logical(LogicalPosition::FirstVariable) {
                let lead = self.logical[LogicalPosition::FirstVariable as usize][0].lead_byte();
                reset_ces[0].l1 = replace_lead_byte(reset_ces[0].l1, lead);
            }
            debug!("before: anchor moved to {reset_ces:X?}");
        }

        adjust_case_bits(&initial_relation_ces, &mut reset_ces);

        if let Some(ext) = extension {
            let ext_ces = self.get_ces(ext);
            reset_ces.extend(ext_ces);
        }

        // The insert happens at or before this point; entries at or after it
        // may have to move to make room
        let mut target_idx = upper_bound(&self.temp, &reset_ces);

        if strength != Strength::Identical {
            if bump_ces(&mut reset_ces, strength, &self.state)? {
                target_idx = upper_bound(&self.temp, &reset_ces);
            }

            if !well_formed_1_seq(&reset_ces) {
                return Err(Error::WellFormedness(format!(
                    "rule for {cps:04X?} cannot satisfy WF1"
                )));
            }
            if !well_formed_2_seq(&reset_ces, &self.state) {
                return Err(Error::WellFormedness(format!(
                    "rule for {cps:04X?} cannot satisfy WF2"
                )));
            }

            self.update_key_ces(&reset_ces);

            // Re-bump subsequent entries until strict order is restored,
            // but never past the end of the containing reorder group
            if target_idx < self.temp.len() && !ce_seq_less(&reset_ces, &self.temp[target_idx].ces)
            {
                let end = self.bump_region_end(&reset_ces);
                let mut i = target_idx;
                let mut prev_ces = reset_ces.clone();
                loop {
                    let mut element = self.temp[i].clone();
                    while !ce_seq_less(&prev_ces, &element.ces) {
                        increment_ce(&mut element.ces[0], strength, false)?;
                    }
                    element.tailored = true;
                    self.add_tailoring(&element.cps, &element.ces)?;
                    if !well_formed_1_seq(&element.ces)
                        || !well_formed_2_seq(&element.ces, &self.state)
                    {
                        return Err(Error::WellFormedness(format!(
                            "re-bumped entry {:04X?} violates well-formedness",
                            element.cps
                        )));
                    }
                    self.update_key_ces(&element.ces);
                    prev_ces = element.ces.clone();
                    self.temp[i] = element;
                    i += 1;
                    if i >= end || ce_seq_less(&prev_ces, &self.temp[i].ces) {
                        break;
                    }
                }
            }
        }

        // Remove the previous instance of the relation, if any
        if self.data.trie.contains(&relation) {
            let relation_ces = self.get_ces(&relation);
            let mut remove_idx = lower_bound(&self.temp, &relation_ces);
            if remove_idx >= self.temp.len() || self.temp[remove_idx].cps != relation {
                remove_idx = self
                    .temp
                    .iter()
                    .position(|e| e.cps == relation)
                    .unwrap_or(self.temp.len());
            }
            if remove_idx < self.temp.len() && self.temp[remove_idx].cps == relation {
                if remove_idx < target_idx {
                    target_idx -= 1;
                }
                self.temp.remove(remove_idx);
            }
        }

        self.add_tailoring(&relation, &reset_ces)?;
        self.temp.insert(
            target_idx,
            TempEntry {
                cps: relation,
                ces: reset_ces,
                tailored: true,
            },
        );

        Ok(())
    }

    // Append the CEs to the pool and upsert the trie entry
    fn add_tailoring(&mut self, cps: &[u32], ces: &[CollationElement]) -> Result<(), Error> {
        if self.data.pool.len() + ces.len() >= usize::from(u16::MAX) {
            return Err(Error::TailoringOverflow);
        }
        let first = self.data.pool.len() as u16;
        self.data.pool.extend_from_slice(ces);
        let last = self.data.pool.len() as u16;
        self.data.trie.insert_or_assign(cps, CeRange { first, last });
        trace!("tailoring {cps:04X?} -> {ces:X?}");
        Ok(())
    }

    // Push the logical positions and the WF2 maxima along with every new
    // CE sequence entering the table
    fn update_key_ces(&mut self, ces: &[CollationElement]) {
        let Some(&head) = ces.first() else { return };

        match head.strength() {
            Strength::Primary => {
                let fv = LogicalPosition::FirstVariable as usize;
                let lv = LogicalPosition::LastVariable as usize;
                let fr = LogicalPosition::FirstRegular as usize;
                let lr = LogicalPosition::LastRegular as usize;

                if ce_seq_less(ces, &self.logical[fv]) {
                    if head.lead_byte() == self.logical[fv][0].lead_byte() {
                        self.logical[fv] = seq_of(ces);
                    }
                } else if ce_seq_less(&self.logical[lv], ces)
                    && ce_seq_less(ces, &self.logical[fr])
                {
                    if head.lead_byte() == self.logical[lv][0].lead_byte() {
                        self.logical[lv] = seq_of(ces);
                    } else {
                        self.logical[fr] = seq_of(ces);
                    }
                } else if ce_seq_less(&self.logical[lr], ces) {
                    self.logical[lr] = seq_of(ces);
                }
            }
            Strength::Secondary => {
                let fp = LogicalPosition::FirstPrimaryIgnorable as usize;
                let lp = LogicalPosition::LastPrimaryIgnorable as usize;
                if ce_seq_less(ces, &self.logical[fp]) {
                    self.logical[fp] = seq_of(ces);
                } else if ce_seq_less(&self.logical[lp], ces) {
                    self.logical[lp] = seq_of(ces);
                }
            }
            Strength::Tertiary => {
                let fs = LogicalPosition::FirstSecondaryIgnorable as usize;
                let ls = LogicalPosition::LastSecondaryIgnorable as usize;
                if ce_seq_less(ces, &self.logical[fs]) {
                    self.logical[fs] = seq_of(ces);
                } else if ce_seq_less(&self.logical[ls], ces) {
                    self.logical[ls] = seq_of(ces);
                }
            }
            Strength::Quaternary => {
                let ft = LogicalPosition::FirstTertiaryIgnorable as usize;
                let lt = LogicalPosition::LastTertiaryIgnorable as usize;
                if ce_seq_less(ces, &self.logical[ft]) {
                    self.logical[ft] = seq_of(ces);
                } else if ce_seq_less(&self.logical[lt], ces) {
                    self.logical[lt] = seq_of(ces);
                }
            }
            Strength::Identical => {}
        }

        for &ce in ces {
            match ce.strength() {
                Strength::Primary => {
                    self.state.last_secondary_in_primary =
                        self.state.last_secondary_in_primary.max(ce.l2);
                }
                Strength::Secondary => {
                    if ce.l3 & CASE_CLEAR_MASK
                        > self.state.last_tertiary_in_secondary & CASE_CLEAR_MASK
                    {
                        self.state.last_tertiary_in_secondary = ce.l3;
                    }
                }
                _ => {}
            }
        }
    }

    // The temp-table index past which re-bumping must not spill: the end of
    // the reorder group containing `ces` (in the default group layout)
    fn bump_region_end(&self, ces: &[CollationElement]) -> usize {
        let first_group = seq_of(&[REORDER_GROUPS[0].first]);
        if ce_seq_less(ces, &first_group) {
            return lower_bound(&self.temp, &first_group);
        }

        for group in REORDER_GROUPS {
            let first = seq_of(&[group.first]);
            let last = seq_of(&[group.last]);
            if ce_seq_less_eq(&first, ces) && ce_seq_less_eq(ces, &last) {
                return lower_bound(&self.temp, &last);
            }
        }

        self.temp.len()
    }

    // Drop every contraction starting at `cp`; the single-code-point entry
    // stays
    fn suppress(&mut self, cp: u32) {
        if let Some(node) = self.data.trie.step(CollationTrie::ROOT, cp) {
            for next in self.data.trie.next_key_elements(node) {
                self.data.trie.erase_subtree(&[cp, next]);
            }
            debug!("suppressed contractions starting at {cp:04X}");
        }
    }

    // Walk the groups in the requested order, assigning lead bytes;
    // adjacent compressible groups that fit may share one
    fn reorder(&mut self, names: &[String]) -> Result<(), Error> {
        let groups = expand_reorder(names)?;

        let mut simple = identity_reorders();
        let mut nonsimple: Vec<NonsimpleReorder> = Vec::new();

        let mut curr_lead = (REORDER_GROUPS[0].first.l1 >> 24) - 1;
        let mut prev_compressible = false;
        let mut prev_first = CollationElement::new(0xFFFF_FFFF, 0, 0);
        let mut prev_last = CollationElement::new(0xFFFF_FFFF, 0, 0);
        let mut first = true;

        for group in groups {
            let compress = group.compressible
                && prev_compressible
                && compressible(prev_first, prev_last, group.first);

            if !compress || first {
                curr_lead += 1;
            }
            if curr_lead > u32::from(IMPLICIT_FINAL_LEAD) {
                return Err(Error::ReorderOverflow);
            }
            debug!(
                "reorder: group {} -> lead 0x{curr_lead:02X} (compress={compress})",
                group.name
            );

            if !compress && group.simple {
                let group_first = group.first.l1 >> 24;
                let group_end = group.last.l1 >> 24;
                let mut byte = group_first;
                while byte < group_end && byte < u32::from(IMPLICIT_FINAL_LEAD) {
                    simple[byte as usize] = curr_lead as u8;
                    curr_lead += 1;
                    byte += 1;
                }
                curr_lead -= 1;
            } else {
                nonsimple.push(NonsimpleReorder {
                    first: group.first,
                    last: group.last,
                    lead: curr_lead as u8,
                });
            }

            prev_compressible = group.compressible;
            prev_first = group.first;
            prev_last = group.last;
            first = false;
        }

        self.simple_reorders = simple;
        self.nonsimple_reorders = nonsimple;
        Ok(())
    }

    /// Apply the recorded reorders to the whole pool, fix the variable
    /// range, record the settings, and freeze the table.
    pub fn seal(mut self) -> Table {
        self.data.simple_reorders = self.simple_reorders;
        self.data.nonsimple_reorders = self.nonsimple_reorders;

        let rewritten: Vec<CollationElement> = self
            .data
            .pool
            .iter()
            .map(|&ce| CollationElement {
                l1: if ce.l1 == 0 {
                    0
                } else {
                    replace_lead_byte(ce.l1, self.data.lead_byte_for(ce))
                },
                ..ce
            })
            .collect();
        self.data.pool = rewritten;

        let fv = self.logical[LogicalPosition::FirstVariable as usize][0];
        let lv = self.logical[LogicalPosition::LastVariable as usize][0];
        let low_lead = self.data.lead_byte_for(fv);
        let high_lead = self.data.lead_byte_for(lv);
        self.data.variable_low = u32::from(low_lead) << 24;
        self.data.variable_high = match high_lead {
            0xFF => u32::MAX,
            b => (u32::from(b) + 1) << 24,
        };

        self.data.settings = self.settings;
        Table::new(self.data)
    }

    #[cfg(test)]
    pub(crate) fn temp_table_in_order(&self) -> bool {
        self.temp
            .windows(2)
            .all(|w| ce_seq_less_eq(&w[0].ces, &w[1].ces))
    }

    #[cfg(test)]
    pub(crate) fn well_formed(&self) -> bool {
        // WF2 is only meaningful for elements the tailoring itself placed;
        // the default marks sit exactly at the initial maxima
        self.temp.iter().all(|e| {
            well_formed_1_seq(&e.ces)
                && (!e.tailored || well_formed_2_seq(&e.ces, &self.state))
        })
    }
}

fn init_logical_positions(data: &TableData) -> Vec<CeSeq> {
    let lookup = |cp: u32| -> CeSeq {
        let range = data
            .trie
            .find(&[cp])
            .expect("logical-position anchor missing from the default data");
        seq_of(data.ces(range))
    };

    let mut logical = vec![CeSeq::default(); LOGICAL_POSITION_COUNT];
    logical[LogicalPosition::FirstTertiaryIgnorable as usize] =
        lookup(FIRST_TERTIARY_IGNORABLE_CP);
    logical[LogicalPosition::LastTertiaryIgnorable as usize] = lookup(LAST_TERTIARY_IGNORABLE_CP);
    logical[LogicalPosition::FirstSecondaryIgnorable as usize] = seq_of(&[SECONDARY_IGNORABLE_CE]);
    logical[LogicalPosition::LastSecondaryIgnorable as usize] = seq_of(&[SECONDARY_IGNORABLE_CE]);
    logical[LogicalPosition::FirstPrimaryIgnorable as usize] = lookup(FIRST_PRIMARY_IGNORABLE_CP);
    logical[LogicalPosition::LastPrimaryIgnorable as usize] = lookup(LAST_PRIMARY_IGNORABLE_CP);
    logical[LogicalPosition::FirstVariable as usize] = lookup(FIRST_VARIABLE_CP);
    logical[LogicalPosition::LastVariable as usize] = lookup(LAST_VARIABLE_CP);
    logical[LogicalPosition::FirstRegular as usize] = lookup(FIRST_REGULAR_CP);
    logical[LogicalPosition::LastRegular as usize] = lookup(LAST_REGULAR_CP);
    logical[LogicalPosition::FirstImplicit as usize] = seq_of(&derived_ces(FIRST_IMPLICIT_CP));
    logical[LogicalPosition::FirstTrailing as usize] = lookup(FIRST_TRAILING_CP);
    logical
}

// "Find the last collation element whose strength is at least as great as
// the strength of the operator. [...] Increment the collation element
// weight corresponding to the strength." Returns whether anything beyond
// the plain increment happened, in which case the caller re-searches the
// insertion point.
fn bump_ces(
    ces: &mut CeSeq,
    strength: Strength,
    state: &TailoringState,
) -> Result<bool, Error> {
    match last_ce_at_least_strength(ces, strength) {
        Some(i) => ces.truncate(i + 1),
        None => {
            ces.clear();
            ces.push(CollationElement::default());
        }
    }
    let last = ces.len() - 1;

    increment_ce(&mut ces[last], strength, true)?;

    let mut adjusted = false;
    let ce = &mut ces[last];

    if !well_formed_2(*ce, state) {
        match ce.strength() {
            Strength::Secondary => ce.l2 = state.last_secondary_in_primary,
            Strength::Tertiary => ce.l3 = state.last_tertiary_in_secondary,
            _ => {}
        }
        increment_ce(ce, strength, true)?;
        adjusted = true;
    }

    if !well_formed_1(*ce) {
        if ce.l1 != 0 {
            if ce.l2 == 0 {
                ce.l2 = COMMON_SEC;
            }
            if ce.l3 & CASE_CLEAR_MASK == 0 {
                ce.l3 = ce.l3 & CASE_MASK | COMMON_TER;
            }
        }
        if ce.l2 != 0 && ce.l3 & CASE_CLEAR_MASK == 0 {
            ce.l3 = ce.l3 & CASE_MASK | COMMON_TER;
        }
        adjusted = true;
    }

    Ok(adjusted)
}

// Case-bit donation per UTS #35 "Case_Tailored": the relation's primary
// case bits are distributed over the anchor's primaries, with any surplus
// folded into a single classifier on the last one
fn adjust_case_bits(initial_relation_ces: &[CollationElement], reset_ces: &mut CeSeq) {
    let bits: Vec<u16> = initial_relation_ces
        .iter()
        .filter(|ce| ce.l1 != 0)
        .map(|ce| ce.l3 & CASE_MASK)
        .collect();

    let n = bits.len();
    let m = reset_ces
        .iter()
        .filter(|ce| ce.strength() == Strength::Primary)
        .count();

    let mut it = bits.iter().copied();
    if n <= m {
        for i in 0..m {
            let ce = &mut reset_ces[i];
            if ce.l1 != 0 {
                ce.l3 &= CASE_CLEAR_MASK;
                if let Some(b) = it.next() {
                    ce.l3 |= b;
                }
            }
        }
    } else {
        let mut consumed = 0;
        for i in 0..m {
            let ce = &mut reset_ces[i];
            if ce.l1 != 0 {
                ce.l3 &= CASE_CLEAR_MASK;
                if i + 1 < m {
                    if let Some(b) = it.next() {
                        ce.l3 |= b;
                        consumed += 1;
                    }
                } else {
                    let rest = &bits[consumed..];
                    if rest.iter().all(|&b| b == UPPER_CASE_BITS) {
                        ce.l3 |= UPPER_CASE_BITS;
                    } else if rest.iter().all(|&b| b == LOWER_CASE_BITS) {
                        ce.l3 |= LOWER_CASE_BITS;
                    } else {
                        ce.l3 |= crate::weights::MIXED_CASE_BITS;
                    }
                }
            }
        }
    }

    for ce in reset_ces.iter_mut() {
        match ce.strength() {
            Strength::Secondary => ce.l3 &= CASE_CLEAR_MASK,
            Strength::Tertiary => {
                ce.l3 &= CASE_CLEAR_MASK;
                ce.l3 |= UPPER_CASE_BITS;
            }
            Strength::Quaternary => {
                ce.l3 &= CASE_CLEAR_MASK;
                ce.l3 |= LOWER_CASE_BITS;
            }
            _ => {}
        }
    }
}

fn compressible(
    prev_first: CollationElement,
    prev_last: CollationElement,
    curr_first: CollationElement,
) -> bool {
    // The end of the previous group must stay in the lead byte where that
    // group started
    if prev_first.l1 & LEAD_MASK != prev_last.l1 & LEAD_MASK {
        return false;
    }
    let mut prev_last = prev_last;
    let mut curr_first = curr_first;
    prev_last.l1 &= !LEAD_MASK;
    curr_first.l1 &= !LEAD_MASK;
    prev_last <= curr_first
}

/// Parse `rules` and run the full build.
pub fn build(rules: &str, warn: &mut dyn FnMut(Diagnostic)) -> Result<Table, Error> {
    let events = parse_rules(rules, warn)?;

    let mut builder = Builder::new();
    for event in events {
        builder.apply(event)?;
    }
    Ok(builder.seal())
}
