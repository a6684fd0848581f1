use bstr::ByteSlice;
use unicode_canonical_combining_class::get_canonical_combining_class_u32 as get_ccc;
use unicode_normalization::{is_nfd_quick, IsNormalized, UnicodeNormalization};

// Decode possibly-invalid UTF-8 into code points; bstr substitutes U+FFFD
// for anything broken, which is all the input validation the key path needs
pub fn decode(input: &[u8]) -> Vec<u32> {
    input.chars().map(|c| c as u32).collect()
}

fn to_char(cp: u32) -> char {
    char::from_u32(cp).unwrap_or('\u{FFFD}')
}

/// Normalize to NFD in place. Most real input is already decomposed, so try
/// the quick check before paying for a full pass.
pub fn make_nfd(cps: &mut Vec<u32>) {
    if is_nfd_quick(cps.iter().map(|&cp| to_char(cp))) == IsNormalized::Yes {
        return;
    }

    *cps = cps
        .iter()
        .map(|&cp| to_char(cp))
        .nfd()
        .map(|c| c as u32)
        .collect();
}

pub fn ccc(cp: u32) -> u8 {
    get_ccc(cp) as u8
}
