//! The immutable collation table: a cheap-clone handle over the CE pool,
//! the trie, and the reorder maps, plus the persisted container format.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::data::{DEFAULT_ENTRIES, REORDER_GROUPS};
use crate::trie::{CeRange, CollationTrie};
use crate::weights::{CollationElement, Strength};
use crate::{CaseFirst, Error, L2Order, VariableWeighting};

/// A reorder range for a group that shares its lead byte with another; such
/// ranges are matched by value rather than by lead byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonsimpleReorder {
    pub first: CollationElement,
    pub last: CollationElement,
    pub lead: u8,
}

/// Table-wide settings recorded by a tailoring; unset fields defer to the
/// caller's options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSettings {
    pub strength: Option<Strength>,
    pub weighting: Option<VariableWeighting>,
    pub l2_order: Option<L2Order>,
    pub case_level: Option<bool>,
    pub case_first: Option<CaseFirst>,
}

#[derive(Clone, Debug)]
pub struct TableData {
    pub pool: Vec<CollationElement>,
    pub trie: CollationTrie,
    pub nonsimple_reorders: Vec<NonsimpleReorder>,
    pub simple_reorders: [u8; 256],
    // Half-open primary-weight range of the variable region
    pub variable_low: u32,
    pub variable_high: u32,
    pub settings: TableSettings,
}

pub fn identity_reorders() -> [u8; 256] {
    let mut map = [0u8; 256];
    for (i, slot) in map.iter_mut().enumerate() {
        *slot = i as u8;
    }
    map
}

impl TableData {
    /// The lead byte a collation element ends up with: a matching non-simple
    /// range wins, otherwise the 256-entry byte map decides.
    pub fn lead_byte_for(&self, ce: CollationElement) -> u8 {
        for reorder in &self.nonsimple_reorders {
            if reorder.first <= ce && ce < reorder.last {
                return reorder.lead;
            }
        }
        self.simple_reorders[usize::from(ce.lead_byte())]
    }

    pub fn ces(&self, range: CeRange) -> &[CollationElement] {
        &self.pool[usize::from(range.first)..usize::from(range.last)]
    }
}

/// An immutable collation table. `Table` is a value handle to shared data:
/// cloning is O(1), and a sealed table never changes. Build one with
/// [`crate::default_table`] or [`crate::tailor`].
#[derive(Clone, Debug)]
pub struct Table {
    data: Arc<TableData>,
}

impl Table {
    pub(crate) fn new(data: TableData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub(crate) fn data(&self) -> &TableData {
        &self.data
    }

    /// Serialize this table: magic `b"UCOLv1\0"`, then length-prefixed
    /// little-endian sections for the settings, the CE pool, the trie
    /// entries, the reorder maps, and the variable range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTable`] if a section fails to encode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);

        write_section(&mut out, &self.data.settings)?;
        write_section(&mut out, &self.data.pool)?;

        let entries: Vec<(Vec<u32>, CeRange)> = self.data.trie.iter().collect();
        write_section(&mut out, &entries)?;

        write_section(&mut out, &self.data.nonsimple_reorders)?;
        write_section(&mut out, &self.data.simple_reorders.to_vec())?;
        write_section(&mut out, &(self.data.variable_low, self.data.variable_high))?;

        Ok(out)
    }

    /// Deserialize a table previously written by [`Table::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTable`] on a bad magic, truncated sections,
    /// or out-of-range offsets.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidTable("bad magic".into()));
        }
        let mut cursor = Cursor::new(&bytes[MAGIC.len()..]);

        let settings: TableSettings = read_section(&mut cursor)?;
        let pool: Vec<CollationElement> = read_section(&mut cursor)?;
        let entries: Vec<(Vec<u32>, CeRange)> = read_section(&mut cursor)?;
        let nonsimple_reorders: Vec<NonsimpleReorder> = read_section(&mut cursor)?;
        let simple: Vec<u8> = read_section(&mut cursor)?;
        let (variable_low, variable_high): (u32, u32) = read_section(&mut cursor)?;

        let simple_reorders: [u8; 256] = simple
            .try_into()
            .map_err(|_| Error::InvalidTable("reorder byte map must have 256 entries".into()))?;

        let mut trie = CollationTrie::new();
        for (key, range) in entries {
            if key.is_empty() {
                return Err(Error::InvalidTable("empty trie key".into()));
            }
            if usize::from(range.last) > pool.len() || range.first > range.last {
                return Err(Error::InvalidTable("trie range outside the CE pool".into()));
            }
            for &cp in &key {
                if cp > 0x10_FFFF || (0xD800..=0xDFFF).contains(&cp) {
                    return Err(Error::InvalidTable(format!(
                        "invalid code point 0x{cp:X} in trie key"
                    )));
                }
            }
            trie.insert_or_assign(&key, range);
        }

        Ok(Self::new(TableData {
            pool,
            trie,
            nonsimple_reorders,
            simple_reorders,
            variable_low,
            variable_high,
            settings,
        }))
    }
}

const MAGIC: &[u8] = b"UCOLv1\0";

fn write_section<T: Serialize>(out: &mut Vec<u8>, value: &T) -> Result<(), Error> {
    let payload =
        bincode::serialize(value).map_err(|e| Error::InvalidTable(format!("encode: {e}")))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::InvalidTable("section too large".into()))?;
    out.write_u32::<LittleEndian>(len)
        .map_err(|e| Error::InvalidTable(format!("encode: {e}")))?;
    out.extend_from_slice(&payload);
    Ok(())
}

fn read_section<T: for<'de> Deserialize<'de>>(cursor: &mut Cursor<&[u8]>) -> Result<T, Error> {
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::InvalidTable("truncated section header".into()))?;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if u64::from(len) > remaining {
        return Err(Error::InvalidTable("section length past end of input".into()));
    }
    let mut payload = vec![0u8; len as usize];
    cursor
        .read_exact(&mut payload)
        .map_err(|_| Error::InvalidTable("truncated section".into()))?;
    bincode::deserialize(&payload).map_err(|e| Error::InvalidTable(format!("decode: {e}")))
}

// The default table is built once from the precompiled entries and shared
// from then on
static DEFAULT: Lazy<Table> = Lazy::new(|| Table::new(build_default_data()));

pub fn default_table() -> Table {
    DEFAULT.clone()
}

pub fn build_default_data() -> TableData {
    let mut pool = Vec::new();
    let mut trie = CollationTrie::new();

    for (cps, ces) in DEFAULT_ENTRIES {
        let first = pool.len() as u16;
        pool.extend_from_slice(ces);
        let last = pool.len() as u16;
        trie.insert_or_assign(cps, CeRange { first, last });
    }
    debug_assert!(pool.len() < usize::from(u16::MAX));

    // space through currency make up the variable region
    let variable_low = REORDER_GROUPS[0].first.l1;
    let variable_high = REORDER_GROUPS[3].last.l1;

    TableData {
        pool,
        trie,
        nonsimple_reorders: Vec::new(),
        simple_reorders: identity_reorders(),
        variable_low,
        variable_high,
        settings: TableSettings::default(),
    }
}
