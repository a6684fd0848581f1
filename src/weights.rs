use serde::{Deserialize, Serialize};

use crate::Error;

/// One collation element: the four weights emitted for one or more code
/// points. The top byte of `l1` is the lead byte, which identifies the
/// reorder group; the top two bits of `l3` hold the case bits.
#[derive(
    Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub struct CollationElement {
    /// Primary weight
    pub l1: u32,
    /// Secondary weight
    pub l2: u16,
    /// Tertiary weight, including the case bits
    pub l3: u16,
    /// Quaternary weight (filled in by variable weighting; zero in tables)
    pub l4: u32,
}

/// The strength of a comparison, or of a single collation element. Ordered
/// from primary (strongest) to identical.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
pub enum Strength {
    /// Base letters only
    Primary,
    /// Accents and other secondary distinctions
    Secondary,
    /// Case and variant distinctions
    #[default]
    Tertiary,
    /// Variable-weight (punctuation) distinctions
    Quaternary,
    /// Code-point order as the final tiebreaker
    Identical,
}

// Case bits live in the top two bits of l3
pub const CASE_MASK: u16 = 0xC000;
pub const LOWER_CASE_BITS: u16 = 0x0000;
pub const MIXED_CASE_BITS: u16 = 0x4000;
pub const UPPER_CASE_BITS: u16 = 0x8000;
pub const CASE_CLEAR_MASK: u16 = 0x3FFF;

// The common weights; tailoring fills these in when a bump leaves a lower
// level empty
pub const COMMON_SEC: u16 = 0x0500;
pub const COMMON_TER: u16 = 0x0500;

pub const LEAD_MASK: u32 = 0xFF00_0000;

/// Running maxima that enforce UCA well-formedness condition 2 during a
/// tailoring build. Both values only ever rise.
#[derive(Copy, Clone, Debug)]
pub struct TailoringState {
    pub last_secondary_in_primary: u16,
    pub last_tertiary_in_secondary: u16,
}

impl CollationElement {
    /// An element with the given first three weights and a zero quaternary,
    /// the shape every table element has before variable weighting runs.
    pub const fn new(l1: u32, l2: u16, l3: u16) -> Self {
        Self { l1, l2, l3, l4: 0 }
    }

    /// Whether all four weights are zero.
    pub fn completely_ignorable(self) -> bool {
        self.l1 == 0 && self.l2 == 0 && self.l3 == 0 && self.l4 == 0
    }

    /// The highest level at which this element carries a nonzero weight. A
    /// completely ignorable element reports `Identical`.
    pub fn strength(self) -> Strength {
        if self.l1 != 0 {
            Strength::Primary
        } else if self.l2 != 0 {
            Strength::Secondary
        } else if self.l3 & CASE_CLEAR_MASK != 0 {
            Strength::Tertiary
        } else if self.l4 != 0 {
            Strength::Quaternary
        } else {
            Strength::Identical
        }
    }

    /// The top byte of the primary weight, which identifies the reorder
    /// group the element belongs to.
    pub fn lead_byte(self) -> u8 {
        (self.l1 >> 24) as u8
    }
}

pub fn replace_lead_byte(l1: u32, lead: u8) -> u32 {
    (l1 & !LEAD_MASK) | (u32::from(lead) << 24)
}

// Find the most significant zero byte and set it to 1; this keeps sort keys
// as short as possible. A primary's lead byte is never touched. If no byte
// is free, add 1 and make sure the carry stays below the lead byte.
pub fn increment_32(w: u32, is_primary: bool) -> Result<u32, Error> {
    if !is_primary && w & 0xFF00_0000 == 0 {
        return Ok(w + 0x0100_0000);
    }
    if w & 0x00FF_0000 == 0 {
        return Ok(w + 0x0001_0000);
    }
    if w & 0x0000_FF00 == 0 {
        return Ok(w + 0x0000_0100);
    }
    if w & 0x0000_00FF == 0 {
        return Ok(w + 1);
    }

    let bumped = w.checked_add(1).ok_or(Error::TailoringOverflow)?;
    if is_primary && bumped & LEAD_MASK != w & LEAD_MASK {
        return Err(Error::TailoringOverflow);
    }
    Ok(bumped)
}

fn increment_secondary(w: u16) -> Result<u16, Error> {
    let bumped = if w & 0xFF00 != 0 {
        w.checked_add(1)
    } else {
        w.checked_add(0x0100)
    };
    bumped.ok_or(Error::TailoringOverflow)
}

// The tertiary payload tops out at 0x3F in its high byte; anything above
// that would spill into the case bits.
fn increment_tertiary(w: u16) -> Result<u16, Error> {
    let bumped = if ((w & 0x3F00) + 0x0100) & CASE_MASK == 0 {
        w + 0x0100
    } else {
        w.checked_add(1).ok_or(Error::TailoringOverflow)?
    };
    if bumped & CASE_MASK != w & CASE_MASK {
        return Err(Error::TailoringOverflow);
    }
    Ok(bumped)
}

/// Increment `ce` at the given strength. On the initial bump of a relation,
/// the levels below the incremented one are reset to the common weights.
pub fn increment_ce(
    ce: &mut CollationElement,
    strength: Strength,
    initial_bump: bool,
) -> Result<(), Error> {
    match strength {
        Strength::Primary => {
            ce.l1 = increment_32(ce.l1, true)?;
            if initial_bump {
                ce.l2 = COMMON_SEC;
                ce.l3 = COMMON_TER;
            }
        }
        Strength::Secondary => {
            ce.l2 = increment_secondary(ce.l2)?;
            if initial_bump {
                ce.l3 = COMMON_TER;
            }
        }
        Strength::Tertiary => {
            ce.l3 = increment_tertiary(ce.l3)?;
        }
        Strength::Quaternary => {
            ce.l4 = increment_32(ce.l4, false)?;
        }
        Strength::Identical => {}
    }
    Ok(())
}

/// WF1: a nonzero weight at some level requires nonzero weights at every
/// higher level (a primary must carry a secondary and a tertiary, and so on).
pub fn well_formed_1(ce: CollationElement) -> bool {
    let mut higher_level_zero = ce.l3 & CASE_CLEAR_MASK == 0;
    if ce.l2 != 0 {
        if higher_level_zero {
            return false;
        }
    } else {
        higher_level_zero = true;
    }
    if ce.l1 != 0 && higher_level_zero {
        return false;
    }
    true
}

/// WF2: a secondary weight standing on its own must exceed every secondary
/// ever seen inside a primary element; likewise one level down.
pub fn well_formed_2(ce: CollationElement, state: &TailoringState) -> bool {
    match ce.strength() {
        Strength::Secondary => ce.l2 > state.last_secondary_in_primary,
        Strength::Tertiary => {
            ce.l3 & CASE_CLEAR_MASK > state.last_tertiary_in_secondary & CASE_CLEAR_MASK
        }
        _ => true,
    }
}

pub fn well_formed_1_seq(ces: &[CollationElement]) -> bool {
    ces.iter().all(|&ce| well_formed_1(ce))
}

pub fn well_formed_2_seq(ces: &[CollationElement], state: &TailoringState) -> bool {
    ces.iter().all(|&ce| well_formed_2(ce, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_byte_first() {
        // A fresh two-byte primary grows downward, byte by byte
        assert_eq!(increment_32(0x0820_0000, true).unwrap(), 0x0820_0100);
        assert_eq!(increment_32(0x0820_0100, true).unwrap(), 0x0820_0101);
        assert_eq!(increment_32(0x0820_0101, true).unwrap(), 0x0820_0102);
    }

    #[test]
    fn primary_lead_byte_is_sacred() {
        assert!(increment_32(0x08FF_FFFF, true).is_err());
        // A non-primary may carry into its top byte
        assert_eq!(increment_32(0x00FF_FFFF, false).unwrap(), 0x01FF_FFFF);
    }

    #[test]
    fn tertiary_increment_respects_case_bits() {
        let mut ce = CollationElement::new(0x0820_0000, COMMON_SEC, 0x8500);
        increment_ce(&mut ce, Strength::Tertiary, true).unwrap();
        assert_eq!(ce.l3, 0x8600);

        // Payload saturated in the high byte: fall back to the low byte
        let mut ce = CollationElement::new(0x0820_0000, COMMON_SEC, 0x3F00);
        increment_ce(&mut ce, Strength::Tertiary, true).unwrap();
        assert_eq!(ce.l3, 0x3F01);
    }

    #[test]
    fn strength_classification() {
        assert_eq!(
            CollationElement::new(0x0820_0000, COMMON_SEC, COMMON_TER).strength(),
            Strength::Primary
        );
        assert_eq!(
            CollationElement::new(0, 0x0C00, COMMON_TER).strength(),
            Strength::Secondary
        );
        assert_eq!(
            CollationElement::new(0, 0, 0x3E00).strength(),
            Strength::Tertiary
        );
        assert_eq!(CollationElement::default().strength(), Strength::Identical);
    }

    #[test]
    fn wf1_catches_gaps() {
        // Primary with no tertiary
        assert!(!well_formed_1(CollationElement::new(
            0x0820_0000,
            COMMON_SEC,
            0
        )));
        // Secondary-only element is fine
        assert!(well_formed_1(CollationElement::new(0, 0x0C00, COMMON_TER)));
        // Primary with no secondary but a tertiary
        assert!(!well_formed_1(CollationElement::new(
            0x0820_0000,
            0,
            COMMON_TER
        )));
    }
}
