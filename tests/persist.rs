use std::cmp::Ordering;

use ucol::{compare, default_table, sort_key, tailor, CollationOptions, Strength, Table};

const SAMPLES: &[&str] = &[
    "Tone",
    "ton",
    "Größe",
    "Grossist",
    "\u{00E4}",
    "ae",
    "x",
    "a",
    "0",
    "de ath",
    "\u{0E41}\u{0107}",
    "\u{09CB}",
    "\u{0439}\u{0316}",
    "\u{3402}",
];

fn behaves_identically(a: &Table, b: &Table) {
    let options = CollationOptions {
        strength: Strength::Identical,
        ..CollationOptions::default()
    };
    for x in SAMPLES {
        assert_eq!(sort_key(x, a, options), sort_key(x, b, options), "key mismatch for {x:?}");
        for y in SAMPLES {
            assert_eq!(compare(x, y, a, options), compare(x, y, b, options));
        }
    }
}

#[test]
fn magic_header_is_present() {
    let bytes = default_table().to_bytes().unwrap();
    assert!(bytes.starts_with(b"UCOLv1\0"));
}

#[test]
fn default_table_round_trips() {
    let table = default_table();
    let restored = Table::from_bytes(&table.to_bytes().unwrap()).unwrap();
    behaves_identically(&table, &restored);
}

#[test]
fn tailored_table_round_trips() {
    let table = tailor(
        "[strength 3]\n[caseFirst upper]\n[reorder digit Latn]\n&ae <<< \u{00E4}\n&[before 1] a < x",
    )
    .unwrap();
    let restored = Table::from_bytes(&table.to_bytes().unwrap()).unwrap();
    behaves_identically(&table, &restored);

    // The recorded settings survive too
    assert_eq!(
        compare("A", "a", &restored, CollationOptions::default()),
        Ordering::Less
    );
}

#[test]
fn truncated_payloads_are_rejected() {
    let bytes = default_table().to_bytes().unwrap();

    assert!(Table::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    assert!(Table::from_bytes(&bytes[..8]).is_err());
    assert!(Table::from_bytes(b"").is_err());
}

#[test]
fn corrupted_sections_are_rejected() {
    let mut bytes = default_table().to_bytes().unwrap();

    // Inflate the first section length past the end of the buffer
    let magic_len = b"UCOLv1\0".len();
    bytes[magic_len..magic_len + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(Table::from_bytes(&bytes).is_err());
}
