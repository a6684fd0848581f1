//! Pipeline step S3: turn a finite collation-element sequence into sort-key
//! bytes. Lexicographic comparison of two keys built at the same settings
//! equals level-by-level weight comparison of the inputs.
//!
//! Weights are emitted as big-endian bytes with trailing zeros stripped;
//! every nonzero weight in the system is a solid byte prefix, which keeps
//! the variable-length form order-preserving. At the secondary and tertiary
//! levels, runs of the common weight collapse into run markers in the band
//! below the common byte, meeting in the middle so that a capped run
//! followed by a larger weight still compares correctly against a longer
//! run at the end of the level.

use crate::weights::{
    CollationElement, Strength, CASE_CLEAR_MASK, CASE_MASK, COMMON_SEC, COMMON_TER,
    LOWER_CASE_BITS, MIXED_CASE_BITS, UPPER_CASE_BITS,
};
use crate::{CaseFirst, L2Order};

pub(crate) struct KeyParams {
    pub strength: Strength,
    pub l2_order: L2Order,
    pub case_level: bool,
    pub case_first: CaseFirst,
    pub trim_quaternary: bool,
}

impl KeyParams {
    // The relation used for every ordering query inside the tailoring
    // engine: quaternary strength, forward secondaries, case bits retained
    fn for_less() -> Self {
        Self {
            strength: Strength::Quaternary,
            l2_order: L2Order::Forward,
            case_level: false,
            case_first: CaseFirst::Off,
            trim_quaternary: false,
        }
    }
}

const LEVEL_SEPARATOR: u8 = 0x00;

// Run-marker band for common-weight compression, below the common byte
const MARKER_BOT: u8 = 0x01;
const MARKER_TOP: u8 = 0x05;
const MARKER_CAP: u8 = 2;

fn emit_16(w: u16, out: &mut Vec<u8>) {
    debug_assert!(w >= 0x0100, "level weight without a solid high byte");
    out.push((w >> 8) as u8);
    if w & 0xFF != 0 {
        out.push(w as u8);
    }
}

fn emit_32(w: u32, out: &mut Vec<u8>) {
    if w == 0 {
        return;
    }
    out.push((w >> 24) as u8);
    if w & 0x00FF_FFFF == 0 {
        return;
    }
    out.push((w >> 16) as u8);
    if w & 0xFFFF == 0 {
        return;
    }
    out.push((w >> 8) as u8);
    if w & 0xFF != 0 {
        out.push(w as u8);
    }
}

// Emit one 16-bit level with common-weight run compression. `values` holds
// only the nonzero weights of the level, in emission order.
fn emit_level_16(values: &[u16], common: u16, out: &mut Vec<u8>) {
    let mut run = 0usize;

    for &v in values {
        if v == common {
            run += 1;
            continue;
        }
        // Run followed by a larger weight: descend from the top of the band
        while run > usize::from(MARKER_CAP) {
            out.push(MARKER_TOP - MARKER_CAP);
            run -= usize::from(MARKER_CAP);
        }
        if run > 0 {
            out.push(MARKER_TOP - run as u8);
            run = 0;
        }
        debug_assert!(v > common, "no level weight sorts below the common weight");
        emit_16(v, out);
    }

    // Run at the end of the level: ascend from the bottom of the band, since
    // the separator sorts below everything
    while run > usize::from(MARKER_CAP) {
        out.push(MARKER_BOT + MARKER_CAP);
        run -= usize::from(MARKER_CAP);
    }
    if run > 0 {
        out.push(MARKER_BOT + run as u8);
    }
}

fn flip_case(bits: u16) -> u16 {
    match bits {
        LOWER_CASE_BITS => UPPER_CASE_BITS,
        UPPER_CASE_BITS => LOWER_CASE_BITS,
        _ => MIXED_CASE_BITS,
    }
}

fn case_byte(bits: u16, case_first: CaseFirst) -> u8 {
    let effective = if case_first == CaseFirst::Upper {
        flip_case(bits)
    } else {
        bits
    };
    match effective {
        LOWER_CASE_BITS => 0x02,
        MIXED_CASE_BITS => 0x04,
        _ => 0x06,
    }
}

/// Build the sort key for `ces`. When the identical level is requested, the
/// NFD code points themselves terminate the key.
pub(crate) fn build_sort_key(
    ces: &[CollationElement],
    nfd: Option<&[u32]>,
    params: &KeyParams,
    out: &mut Vec<u8>,
) {
    // Primary
    for ce in ces {
        emit_32(ce.l1, out);
    }

    // Secondary
    if params.strength >= Strength::Secondary {
        out.push(LEVEL_SEPARATOR);

        let mut secondaries: Vec<u16> = Vec::with_capacity(ces.len());
        match params.l2_order {
            L2Order::Forward => {
                secondaries.extend(ces.iter().filter(|ce| ce.l2 != 0).map(|ce| ce.l2));
            }
            L2Order::Backward => {
                // Reverse within each run headed by a primary element
                let mut run_start = 0;
                let flush = |run: &[CollationElement], secondaries: &mut Vec<u16>| {
                    secondaries.extend(run.iter().rev().filter(|ce| ce.l2 != 0).map(|ce| ce.l2));
                };
                for (i, ce) in ces.iter().enumerate() {
                    if ce.l1 != 0 && i > run_start {
                        flush(&ces[run_start..i], &mut secondaries);
                        run_start = i;
                    }
                }
                flush(&ces[run_start..], &mut secondaries);
            }
        }
        emit_level_16(&secondaries, COMMON_SEC, out);
    }

    // Case sub-level, between the secondary and tertiary levels
    if params.case_level && params.strength >= Strength::Tertiary {
        out.push(LEVEL_SEPARATOR);
        for ce in ces {
            if ce.l3 != 0 {
                out.push(case_byte(ce.l3 & CASE_MASK, params.case_first));
            }
        }
    }

    // Tertiary
    if params.strength >= Strength::Tertiary {
        out.push(LEVEL_SEPARATOR);

        let tertiaries: Vec<u16> = ces
            .iter()
            .filter_map(|ce| {
                let payload = ce.l3 & CASE_CLEAR_MASK;
                if ce.l3 == 0 {
                    return None;
                }
                let v = if params.case_level {
                    payload
                } else if params.case_first == CaseFirst::Upper {
                    flip_case(ce.l3 & CASE_MASK) | payload
                } else {
                    ce.l3
                };
                Some(v)
            })
            .collect();
        emit_level_16(&tertiaries, COMMON_TER, out);
    }

    // Quaternary
    if params.strength >= Strength::Quaternary {
        out.push(LEVEL_SEPARATOR);

        let mut quaternaries: Vec<u32> =
            ces.iter().filter(|ce| ce.l4 != 0).map(|ce| ce.l4).collect();
        if params.trim_quaternary {
            while quaternaries.last() == Some(&0xFFFF_FFFF) {
                quaternaries.pop();
            }
        }
        for q in quaternaries {
            emit_32(q, out);
        }
    }

    // Identical
    if params.strength == Strength::Identical {
        if let Some(nfd) = nfd {
            out.push(LEVEL_SEPARATOR);
            for &cp in nfd {
                out.extend_from_slice(&cp.to_be_bytes());
            }
        }
    }
}

/// The "less" relation on CE sequences: lexicographic order of quaternary-
/// strength keys with forward secondaries and case bits retained. Table
/// positions during tailoring always reflect this order.
pub(crate) fn ce_seq_less(lhs: &[CollationElement], rhs: &[CollationElement]) -> bool {
    let params = KeyParams::for_less();

    let mut lhs_bytes = Vec::with_capacity(lhs.len() * 8);
    let mut rhs_bytes = Vec::with_capacity(rhs.len() * 8);
    build_sort_key(lhs, None, &params, &mut lhs_bytes);
    build_sort_key(rhs, None, &params, &mut rhs_bytes);

    lhs_bytes < rhs_bytes
}

pub(crate) fn ce_seq_less_eq(lhs: &[CollationElement], rhs: &[CollationElement]) -> bool {
    !ce_seq_less(rhs, lhs)
}
