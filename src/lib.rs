//! A tailorable implementation of the Unicode Collation Algorithm. The
//! default table converts code points into collation elements and then into
//! byte-comparable sort keys; CLDR-style tailoring rules can be compiled
//! into new tables that realize a modified order. Tables are immutable
//! value handles: cloning is O(1), and they are freely shared across
//! threads.
//!
//! ```
//! use ucol::{compare, default_table, CollationOptions};
//!
//! let table = default_table();
//! let mut words = vec!["Tone", "tone", "ton"];
//! words.sort_by(|a, b| compare(a, b, &table, CollationOptions::default()));
//! assert_eq!(words, vec!["ton", "tone", "Tone"]);
//! ```

#![warn(clippy::pedantic, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

mod cea;
mod data;
mod normalize;
mod parse;
mod sort_key;
mod table;
mod tailor;
mod trie;
mod weights;

pub use cea::CollationElements;
pub use table::Table;
pub use weights::{CollationElement, Strength};

use sort_key::{build_sort_key, KeyParams};

/// The policy governing how variable-weight (punctuation and symbol)
/// elements participate in the ordering.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum VariableWeighting {
    /// Variables keep their weights and compare like any other element
    NonIgnorable,
    /// Variables and the ignorables following them are zeroed at all levels
    Blanked,
    /// Variables move their primary into the quaternary level
    #[default]
    Shifted,
    /// Like `Shifted`, but trailing high quaternaries are trimmed from keys
    ShiftedTrimmed,
}

/// The direction in which secondary weights are compared.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum L2Order {
    /// Normal, left-to-right secondaries
    #[default]
    Forward,
    /// French-style: secondaries reversed within each primary run
    Backward,
}

/// Whether one case is forced to sort before the other at the tertiary
/// level.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum CaseFirst {
    /// Use the tertiary weights as they stand (lowercase first)
    #[default]
    Off,
    /// Uppercase sorts before lowercase
    Upper,
    /// Lowercase sorts before uppercase (the default order, made explicit)
    Lower,
}

/// Options for building sort keys and comparing strings. Settings recorded
/// by a tailoring override the corresponding fields here.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct CollationOptions {
    /// The depth of the comparison
    pub strength: Strength,
    /// How variable-weight elements participate
    pub weighting: VariableWeighting,
    /// Secondary-level direction
    pub l2_order: L2Order,
    /// Whether to emit a dedicated case sub-level between the secondary and
    /// tertiary levels
    pub case_level: bool,
    /// Case-first preference
    pub case_first: CaseFirst,
}

/// A parser warning surfaced through [`tailor_with_diagnostics`].
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Byte offset into the rules source
    pub offset: usize,
    /// Human-readable description
    pub message: String,
}

/// Everything that can go wrong while building a table. The sort-key path
/// itself is infallible once a table is sealed.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// The rules source could not be parsed.
    #[error("parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset into the rules source
        offset: usize,
        /// What went wrong
        message: String,
    },

    /// An increment would have changed a primary lead byte, or the CE pool
    /// outgrew its 16-bit offsets.
    #[error("tailoring overflow: a weight cannot be incremented further")]
    TailoringOverflow,

    /// A rule could not be implemented without violating UCA
    /// well-formedness condition 1 or 2.
    #[error("well-formedness violation: {0}")]
    WellFormedness(String),

    /// `[before n]` was requested but no earlier entry exists at the
    /// required strength.
    #[error("no entry exists before the requested position")]
    BeforeUnanchorable,

    /// A `[reorder ...]` directive ran past the implicit-weight lead byte.
    #[error("reorder would run past the implicit-weights lead byte")]
    ReorderOverflow,

    /// A serialized table failed validation.
    #[error("invalid table data: {0}")]
    InvalidTable(String),
}

/// The default collation table, built once from the precompiled data and
/// shared from then on.
#[must_use]
pub fn default_table() -> Table {
    table::default_table()
}

/// Compile CLDR-style tailoring rules into a new table. Parser warnings go
/// to the `log` facade; use [`tailor_with_diagnostics`] to capture them.
///
/// ```
/// let phonebook = ucol::tailor("&ae <<< \u{00E4}").unwrap();
/// let cmp = ucol::compare("\u{00E4}", "ae", &phonebook, ucol::CollationOptions::default());
/// assert_eq!(cmp, std::cmp::Ordering::Greater);
/// ```
///
/// # Errors
///
/// [`Error::Parse`] for malformed rules; [`Error::TailoringOverflow`],
/// [`Error::WellFormedness`], [`Error::BeforeUnanchorable`], or
/// [`Error::ReorderOverflow`] when a rule cannot be realized.
pub fn tailor(rules: &str) -> Result<Table, Error> {
    tailor::build(rules, &mut |d: Diagnostic| {
        log::warn!("tailoring rules, offset {}: {}", d.offset, d.message);
    })
}

/// Like [`tailor`], but parser warnings are delivered to `warn`.
///
/// # Errors
///
/// Same as [`tailor`].
pub fn tailor_with_diagnostics(
    rules: &str,
    mut warn: impl FnMut(Diagnostic),
) -> Result<Table, Error> {
    tailor::build(rules, &mut warn)
}

// Table-level settings win over the caller's options
fn resolve(table: &Table, opts: CollationOptions) -> CollationOptions {
    let s = &table.data().settings;
    CollationOptions {
        strength: s.strength.unwrap_or(opts.strength),
        weighting: s.weighting.unwrap_or(opts.weighting),
        l2_order: s.l2_order.unwrap_or(opts.l2_order),
        case_level: s.case_level.unwrap_or(opts.case_level),
        case_first: s.case_first.unwrap_or(opts.case_first),
    }
}

/// Lazily generate collation elements for `code_points`, which must already
/// be in NFD. Invalid code points should have been replaced upstream; the
/// generator itself never fails.
pub fn collation_elements_of(
    code_points: Vec<u32>,
    table: &Table,
    weighting: VariableWeighting,
) -> CollationElements<'_, std::vec::IntoIter<u32>> {
    CollationElements::new(code_points.into_iter(), table.data(), weighting)
}

/// The collation elements for `text`, after normalization. `weighting`
/// selects the variable-weighting policy; a policy recorded in the table
/// wins.
pub fn collation_elements<T: AsRef<[u8]> + ?Sized>(
    text: &T,
    table: &Table,
    weighting: VariableWeighting,
) -> Vec<CollationElement> {
    let weighting = table.data().settings.weighting.unwrap_or(weighting);
    let mut cps = normalize::decode(text.as_ref());
    normalize::make_nfd(&mut cps);
    CollationElements::new(cps.into_iter(), table.data(), weighting).collect()
}

fn sort_key_of_cps(mut cps: Vec<u32>, table: &Table, resolved: CollationOptions) -> Vec<u8> {
    normalize::make_nfd(&mut cps);
    let ces: Vec<CollationElement> =
        CollationElements::new(cps.iter().copied(), table.data(), resolved.weighting).collect();

    let params = KeyParams {
        strength: resolved.strength,
        l2_order: resolved.l2_order,
        case_level: resolved.case_level,
        case_first: resolved.case_first,
        trim_quaternary: resolved.weighting == VariableWeighting::ShiftedTrimmed,
    };

    let mut out = Vec::with_capacity(ces.len() * 6);
    build_sort_key(&ces, Some(&cps), &params, &mut out);
    out
}

/// Build the sort key for `text` against `table`. Lexicographic comparison
/// of two keys built with the same table and options equals
/// [`compare`] on the original strings.
pub fn sort_key<T: AsRef<[u8]> + ?Sized>(
    text: &T,
    table: &Table,
    options: CollationOptions,
) -> Vec<u8> {
    let cps = normalize::decode(text.as_ref());
    sort_key_of_cps(cps, table, resolve(table, options))
}

/// Compare two strings per the table and options. Equivalent to comparing
/// the sort keys, with early outs for equal input.
pub fn compare<T: AsRef<[u8]> + ?Sized>(
    a: &T,
    b: &T,
    table: &Table,
    options: CollationOptions,
) -> Ordering {
    if a.as_ref() == b.as_ref() {
        return Ordering::Equal;
    }

    let mut a_cps = normalize::decode(a.as_ref());
    let mut b_cps = normalize::decode(b.as_ref());
    normalize::make_nfd(&mut a_cps);
    normalize::make_nfd(&mut b_cps);

    // Canonically equivalent input produces identical keys at any strength
    if a_cps == b_cps {
        return Ordering::Equal;
    }

    let resolved = resolve(table, options);
    let a_key = sort_key_of_cps(a_cps, table, resolved);
    let b_key = sort_key_of_cps(b_cps, table, resolved);

    a_key.cmp(&b_key)
}
