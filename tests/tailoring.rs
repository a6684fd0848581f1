use std::cmp::Ordering;

use ucol::{
    collation_elements, compare, default_table, sort_key, tailor, tailor_with_diagnostics,
    CollationOptions, Error, Strength, VariableWeighting,
};

fn opts(strength: Strength) -> CollationOptions {
    CollationOptions {
        strength,
        ..CollationOptions::default()
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Code points with explicit default weights, for exhaustiveness checks
const SINGLES: &[&str] = &[
    "\t", "\n", " ", "\u{00A0}", "-", "'", ",", ";", ":", "!", "?", ".", "(", ")", "[", "]",
    "_", "/", "+", "<", "=", ">", "|", "~", "&", "#", "%", "*", "@", "$", "\u{00A2}",
    "\u{00A3}", "\u{00A5}", "\u{20AC}", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a",
    "A", "b", "B", "c", "C", "d", "D", "e", "E", "f", "F", "g", "G", "h", "H", "i", "I", "j",
    "J", "k", "K", "l", "L", "m", "M", "n", "N", "o", "O", "p", "P", "q", "Q", "r", "R", "s",
    "S", "\u{00DF}", "t", "T", "u", "U", "v", "V", "w", "W", "x", "X", "y", "Y", "z", "Z",
    "\u{03B1}", "\u{0391}", "\u{03B2}", "\u{03B3}", "\u{03B4}", "\u{03B5}", "\u{0430}",
    "\u{0431}", "\u{0432}", "\u{0433}", "\u{0434}", "\u{0435}", "\u{0436}", "\u{0437}",
    "\u{0438}", "\u{0439}", "\u{043A}", "\u{0E01}", "\u{0E02}", "\u{0E03}", "\u{0E04}",
    "\u{0E05}", "\u{0E30}", "\u{0E32}", "\u{0E40}", "\u{0E41}", "\u{0E43}", "\u{0E44}",
    "\u{0985}", "\u{0995}", "\u{09BE}", "\u{09C7}", "\u{09CB}", "\u{09CC}", "\u{09D7}",
    "\u{2F00}", "\u{4E00}", "\u{4E8C}", "\u{4E09}",
];

#[test]
fn german_phonebook_umlaut() {
    init_logging();
    let table = tailor("&ae <<< \u{00E4}").unwrap();

    assert_eq!(
        compare("\u{00E4}", "ae", &table, opts(Strength::Tertiary)),
        Ordering::Greater
    );
    assert_eq!(
        compare("\u{00E4}", "ae", &table, opts(Strength::Primary)),
        Ordering::Equal
    );

    // The tailored contraction must not disturb surrounding order
    assert_eq!(
        compare("ad", "\u{00E4}", &table, opts(Strength::Primary)),
        Ordering::Less
    );
    assert_eq!(
        compare("\u{00E4}", "af", &table, opts(Strength::Primary)),
        Ordering::Less
    );
}

#[test]
fn relation_chain_monotonicity() {
    init_logging();
    let table = tailor("&b < y << u <<< i = o").unwrap();

    // Each operator binds at exactly its strength
    assert_eq!(compare("b", "y", &table, opts(Strength::Primary)), Ordering::Less);

    assert_eq!(compare("y", "u", &table, opts(Strength::Primary)), Ordering::Equal);
    assert_eq!(compare("y", "u", &table, opts(Strength::Secondary)), Ordering::Less);

    assert_eq!(compare("u", "i", &table, opts(Strength::Secondary)), Ordering::Equal);
    assert_eq!(compare("u", "i", &table, opts(Strength::Tertiary)), Ordering::Less);

    assert_eq!(compare("i", "o", &table, opts(Strength::Tertiary)), Ordering::Equal);
}

#[test]
fn quaternary_relation() {
    init_logging();
    let table = tailor("&a <<<< x").unwrap();
    let options = CollationOptions {
        strength: Strength::Quaternary,
        weighting: VariableWeighting::NonIgnorable,
        ..CollationOptions::default()
    };

    assert_eq!(
        compare("a", "x", &table, CollationOptions {
            strength: Strength::Tertiary,
            weighting: VariableWeighting::NonIgnorable,
            ..CollationOptions::default()
        }),
        Ordering::Equal
    );
    assert_eq!(compare("a", "x", &table, options), Ordering::Less);
}

#[test]
fn reorder_moves_whole_groups() {
    init_logging();

    // By default Greek sorts after Latin; pulling Grek to the front flips
    // every cross-group pair
    let table = default_table();
    assert_eq!(
        compare("\u{03B1}", "a", &table, opts(Strength::Primary)),
        Ordering::Greater
    );

    let table = tailor("[reorder Grek]").unwrap();
    assert_eq!(
        compare("\u{03B1}", "a", &table, opts(Strength::Primary)),
        Ordering::Less
    );
    // Greek even precedes the whitespace group now; compare with variables
    // non-ignorable so the space actually participates
    let non_ignorable = CollationOptions {
        strength: Strength::Primary,
        weighting: VariableWeighting::NonIgnorable,
        ..CollationOptions::default()
    };
    assert_eq!(
        compare("\u{03B1}", " ", &table, non_ignorable),
        Ordering::Less
    );
}

#[test]
fn reorder_digit_latin_soundness() {
    init_logging();
    let table = tailor("[reorder digit Latn]").unwrap();

    // Property: every digit primary sorts below every Latin primary
    let digits = ["0", "1", "5", "9"];
    let latin = ["a", "A", "m", "\u{00DF}", "z", "Z"];
    for d in digits {
        for l in latin {
            assert_eq!(
                compare(d, l, &table, opts(Strength::Primary)),
                Ordering::Less,
                "{d} should precede {l}"
            );
        }
    }

    // Unmentioned groups keep their relative order after the mentioned ones
    assert_eq!(
        compare("\u{03B1}", "\u{0430}", &table, opts(Strength::Primary)),
        Ordering::Less
    );
    // Variables survive the move
    assert_eq!(
        compare("de ath", "death", &table, CollationOptions::default()),
        Ordering::Equal
    );
}

#[test]
fn reorder_compressible_scripts_share_a_lead_byte() {
    init_logging();
    // Thai and Beng are adjacent, compressible, and fit in one lead byte;
    // reordering them to the front keeps them ordered and compact
    let table = tailor("[reorder Thai Beng]").unwrap();

    assert_eq!(
        compare("\u{0E01}", "\u{0985}", &table, opts(Strength::Primary)),
        Ordering::Less
    );
    let non_ignorable = CollationOptions {
        strength: Strength::Primary,
        weighting: VariableWeighting::NonIgnorable,
        ..CollationOptions::default()
    };
    assert_eq!(
        compare("\u{0985}", " ", &table, non_ignorable),
        Ordering::Less
    );
}

#[test]
fn before_primary_places_immediately_before_anchor() {
    init_logging();
    let table = tailor("&[before 1] a < x").unwrap();
    let o = opts(Strength::Primary);

    assert_eq!(compare("x", "a", &table, o), Ordering::Less);
    assert_eq!(compare("9", "x", &table, o), Ordering::Less);

    // Nothing in the default repertoire lands strictly between x and a
    for z in SINGLES {
        let after_x = compare("x", z, &table, o);
        let before_a = compare(*z, "a", &table, o);
        assert!(
            !(after_x == Ordering::Less && before_a == Ordering::Less),
            "{z:?} sorts strictly between x and a"
        );
    }
}

#[test]
fn before_secondary_lands_between_marks() {
    init_logging();
    // Anchoring before é at the secondary level turns w into a
    // primary-ignorable weight between the grave and acute accents
    let table = tailor("&[before 2] \u{00E9} << w").unwrap();

    assert_eq!(
        compare("e\u{0300}", "ew", &table, opts(Strength::Secondary)),
        Ordering::Less
    );
    assert_eq!(
        compare("ew", "\u{00E9}", &table, opts(Strength::Secondary)),
        Ordering::Less
    );
    assert_eq!(
        compare("e", "ew", &table, opts(Strength::Primary)),
        Ordering::Equal
    );
}

#[test]
fn suppress_contractions_unbundles_keys() {
    init_logging();
    let plain = default_table();
    let table = tailor("[suppressContractions [\u{09C7}]]").unwrap();

    // The vowel sign O decomposes to E + AA; with the contraction gone it
    // yields the two component elements
    let before = collation_elements("\u{09CB}", &plain, VariableWeighting::NonIgnorable);
    let after = collation_elements("\u{09CB}", &table, VariableWeighting::NonIgnorable);
    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 2);

    assert_ne!(
        sort_key("\u{09CB}", &plain, CollationOptions::default()),
        sort_key("\u{09CB}", &table, CollationOptions::default())
    );

    // The single-code-point entry survives
    assert_eq!(
        compare("\u{09C7}", "\u{09C7}", &table, CollationOptions::default()),
        Ordering::Equal
    );
    let e_alone_before = collation_elements("\u{09C7}", &plain, VariableWeighting::NonIgnorable);
    let e_alone_after = collation_elements("\u{09C7}", &table, VariableWeighting::NonIgnorable);
    assert_eq!(e_alone_before, e_alone_after);
}

#[test]
fn tailored_contraction_can_be_longer_than_default_keys() {
    init_logging();
    // A three-code-point contraction through the tailoring path
    let table = tailor("&z < ch < chh").unwrap();
    let o = opts(Strength::Primary);

    assert_eq!(compare("z", "ch", &table, o), Ordering::Less);
    assert_eq!(compare("ch", "chh", &table, o), Ordering::Less);
    assert_eq!(compare("chh", "d", &table, o), Ordering::Greater);
    // 'c' alone is untouched
    assert_eq!(compare("c", "d", &table, o), Ordering::Less);
}

#[test]
fn settings_recorded_by_rules_override_options() {
    init_logging();
    let table = tailor("[strength 2]\n[backwards 2]\n&a<b").unwrap();

    // Tertiary request is clamped to the recorded secondary strength
    assert_eq!(
        compare("tone", "Tone", &table, opts(Strength::Tertiary)),
        Ordering::Equal
    );
}

#[test]
fn case_first_upper_setting() {
    init_logging();
    let table = tailor("[caseFirst upper]\n&a<b").unwrap();
    assert_eq!(
        compare("Tone", "tone", &table, opts(Strength::Tertiary)),
        Ordering::Less
    );
}

#[test]
fn logical_position_resets() {
    init_logging();

    // A new letter after the last regular entry
    let table = tailor("&[last regular] < q").unwrap();
    assert_eq!(
        compare("\u{4E09}", "q", &table, opts(Strength::Primary)),
        Ordering::Less
    );
    // But still before the implicit region
    assert_eq!(
        compare("q", "\u{3400}", &table, opts(Strength::Primary)),
        Ordering::Less
    );

    // A new variable after the last one
    let table = tailor("&[last variable] < v").unwrap();
    let shifted = CollationOptions {
        strength: Strength::Tertiary,
        weighting: VariableWeighting::Shifted,
        ..CollationOptions::default()
    };
    assert_eq!(compare("ave", "a v e", &table, shifted), Ordering::Equal);
}

#[test]
fn extension_appends_ces() {
    init_logging();
    let table = tailor("&k < q / h").unwrap();
    let o = opts(Strength::Primary);

    // q now carries k's bumped element plus h's
    assert_eq!(compare("q", "kh", &table, o), Ordering::Greater);
    assert_eq!(compare("q", "kk", &table, o), Ordering::Less);
}

#[test]
fn parse_errors_are_reported_with_position() {
    init_logging();
    match tailor("&a <") {
        Err(Error::Parse { .. }) => {}
        other => panic!("expected a parse error, got {other:?}"),
    }
    match tailor("< a") {
        Err(Error::Parse { .. }) => {}
        other => panic!("expected a parse error, got {other:?}"),
    }
    match tailor("[reorder Klingon]") {
        Err(Error::Parse { .. }) => {}
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn unknown_options_surface_as_diagnostics() {
    init_logging();
    let mut warnings = Vec::new();
    let table = tailor_with_diagnostics("[maxVariable punct]\n&a<b", |d| warnings.push(d));
    assert!(table.is_ok());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("maxVariable"));
}

#[test]
fn before_on_the_bottom_of_the_table_fails() {
    init_logging();
    assert!(matches!(
        tailor("&[before 1] [first tertiary ignorable] < x"),
        Err(Error::BeforeUnanchorable)
    ));
}

#[test]
fn tailored_tables_share_nothing_with_the_default() {
    init_logging();
    let plain = default_table();
    let tailored = tailor("&a < q").unwrap();

    // The default still sees q in its old place
    assert_eq!(
        compare("q", "b", &plain, opts(Strength::Primary)),
        Ordering::Greater
    );
    assert_eq!(
        compare("q", "b", &tailored, opts(Strength::Primary)),
        Ordering::Less
    );
}
