//! Parser for CLDR-style tailoring rules. The engine never sees raw text:
//! this module turns a rules source into a stream of typed events (resets,
//! relations, settings, suppressions, reorders), with every code-point
//! sequence already NFD-normalized.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{map, opt, recognize, value},
    multi::{many0_count, many1},
    sequence::{delimited, preceded},
    IResult,
};
use rustc_hash::FxHashMap;

use crate::normalize::make_nfd;
use crate::weights::Strength;
use crate::{CaseFirst, Diagnostic, Error, L2Order, VariableWeighting};

/// A symbolic reset target whose collation elements depend on the current
/// state of the table being built.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LogicalPosition {
    FirstTertiaryIgnorable,
    LastTertiaryIgnorable,
    FirstSecondaryIgnorable,
    LastSecondaryIgnorable,
    FirstPrimaryIgnorable,
    LastPrimaryIgnorable,
    FirstVariable,
    LastVariable,
    FirstRegular,
    LastRegular,
    FirstImplicit,
    FirstTrailing,
}

pub const LOGICAL_POSITION_COUNT: usize = 12;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResetTarget {
    Sequence(Vec<u32>),
    Logical(LogicalPosition),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RuleEvent {
    Reset {
        target: ResetTarget,
        before: bool,
    },
    Relation {
        strength: Strength,
        cps: Vec<u32>,
        prefix: Option<Vec<u32>>,
        extension: Option<Vec<u32>>,
    },
    Strength(Strength),
    VariableWeighting(VariableWeighting),
    L2Order(L2Order),
    CaseLevel(bool),
    CaseFirst(CaseFirst),
    Suppress(Vec<u32>),
    Reorder(Vec<String>),
}

// Whitespace and `#` line comments separate every token
fn ws(i: &str) -> IResult<&str, &str> {
    recognize(many0_count(alt((
        multispace1,
        recognize(preceded(char('#'), not_line_ending)),
    ))))(i)
}

fn is_raw_char(c: char) -> bool {
    !c.is_whitespace() && !"&<=#[]|/'*".contains(c)
}

fn quoted(i: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('\'')(i)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some('\'') => {
                if chars.next() == Some('\'') {
                    out.push('\'');
                    rest = &rest[2..];
                } else {
                    return Ok((&rest[1..], out));
                }
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    i,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }
}

// A code-point sequence: raw runs and quoted segments, NFD-normalized
fn text_seq(i: &str) -> IResult<&str, Vec<u32>> {
    let (rest, parts) = many1(alt((map(take_while1(is_raw_char), str::to_owned), quoted)))(i)?;

    let mut cps: Vec<u32> = parts
        .iter()
        .flat_map(|s| s.chars())
        .map(|c| c as u32)
        .collect();
    make_nfd(&mut cps);
    Ok((rest, cps))
}

fn identifier(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-')(i)
}

fn strength_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("strength")(i)?;
    let (i, _) = ws(i)?;
    let (i, s) = alt((
        value(Strength::Primary, char('1')),
        value(Strength::Secondary, char('2')),
        value(Strength::Tertiary, char('3')),
        value(Strength::Quaternary, char('4')),
        value(Strength::Identical, char('I')),
    ))(i)?;
    Ok((i, RuleEvent::Strength(s)))
}

fn alternate_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("alternate")(i)?;
    let (i, _) = ws(i)?;
    let (i, w) = alt((
        value(VariableWeighting::NonIgnorable, tag("non-ignorable")),
        value(VariableWeighting::ShiftedTrimmed, tag("shifted-trimmed")),
        value(VariableWeighting::Shifted, tag("shifted")),
        value(VariableWeighting::Blanked, tag("blanked")),
    ))(i)?;
    Ok((i, RuleEvent::VariableWeighting(w)))
}

fn backwards_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("backwards")(i)?;
    let (i, _) = ws(i)?;
    let (i, _) = char('2')(i)?;
    Ok((i, RuleEvent::L2Order(L2Order::Backward)))
}

fn case_level_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("caseLevel")(i)?;
    let (i, _) = ws(i)?;
    let (i, on) = alt((value(true, tag("on")), value(false, tag("off"))))(i)?;
    Ok((i, RuleEvent::CaseLevel(on)))
}

fn case_first_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("caseFirst")(i)?;
    let (i, _) = ws(i)?;
    let (i, cf) = alt((
        value(CaseFirst::Upper, tag("upper")),
        value(CaseFirst::Lower, tag("lower")),
        value(CaseFirst::Off, tag("off")),
    ))(i)?;
    Ok((i, RuleEvent::CaseFirst(cf)))
}

fn reorder_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("reorder")(i)?;
    let (i, names) = many1(preceded(ws, map(identifier, str::to_owned)))(i)?;
    Ok((i, RuleEvent::Reorder(names)))
}

fn suppress_setting(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = tag("suppressContractions")(i)?;
    let (i, _) = ws(i)?;
    let (i, seqs) = delimited(char('['), many1(preceded(ws, text_seq)), preceded(ws, char(']')))(i)?;
    Ok((i, RuleEvent::Suppress(seqs.concat())))
}

fn setting(i: &str) -> IResult<&str, RuleEvent> {
    delimited(
        char('['),
        preceded(
            ws,
            alt((
                strength_setting,
                alternate_setting,
                backwards_setting,
                case_level_setting,
                case_first_setting,
                reorder_setting,
                suppress_setting,
            )),
        ),
        preceded(ws, char(']')),
    )(i)
}

fn logical_position(i: &str) -> IResult<&str, LogicalPosition> {
    let (i, _) = char('[')(i)?;
    let (i, _) = ws(i)?;
    let (i, first) = alt((value(true, tag("first")), value(false, tag("last"))))(i)?;
    let (i, _) = ws(i)?;
    let (i, pos) = alt((
        map(tag("tertiary ignorable"), move |_| {
            if first {
                LogicalPosition::FirstTertiaryIgnorable
            } else {
                LogicalPosition::LastTertiaryIgnorable
            }
        }),
        map(tag("secondary ignorable"), move |_| {
            if first {
                LogicalPosition::FirstSecondaryIgnorable
            } else {
                LogicalPosition::LastSecondaryIgnorable
            }
        }),
        map(tag("primary ignorable"), move |_| {
            if first {
                LogicalPosition::FirstPrimaryIgnorable
            } else {
                LogicalPosition::LastPrimaryIgnorable
            }
        }),
        map(tag("variable"), move |_| {
            if first {
                LogicalPosition::FirstVariable
            } else {
                LogicalPosition::LastVariable
            }
        }),
        map(tag("regular"), move |_| {
            if first {
                LogicalPosition::FirstRegular
            } else {
                LogicalPosition::LastRegular
            }
        }),
        map(tag("implicit"), move |_| LogicalPosition::FirstImplicit),
        map(tag("trailing"), move |_| LogicalPosition::FirstTrailing),
    ))(i)?;
    let (i, _) = ws(i)?;
    let (i, _) = char(']')(i)?;
    Ok((i, pos))
}

fn before_marker(i: &str) -> IResult<&str, ()> {
    let (i, _) = char('[')(i)?;
    let (i, _) = ws(i)?;
    let (i, _) = tag("before")(i)?;
    let (i, _) = ws(i)?;
    let (i, _) = alt((char('1'), char('2'), char('3')))(i)?;
    let (i, _) = ws(i)?;
    let (i, _) = char(']')(i)?;
    Ok((i, ()))
}

fn reset(i: &str) -> IResult<&str, RuleEvent> {
    let (i, _) = char('&')(i)?;
    let (i, _) = ws(i)?;
    let (i, before) = opt(before_marker)(i)?;
    let (i, _) = ws(i)?;
    let (i, target) = alt((
        map(logical_position, ResetTarget::Logical),
        map(text_seq, ResetTarget::Sequence),
    ))(i)?;
    Ok((
        i,
        RuleEvent::Reset {
            target,
            before: before.is_some(),
        },
    ))
}

fn relation(i: &str) -> IResult<&str, RuleEvent> {
    let (i, strength) = alt((
        value(Strength::Quaternary, tag("<<<<")),
        value(Strength::Tertiary, tag("<<<")),
        value(Strength::Secondary, tag("<<")),
        value(Strength::Primary, tag("<")),
        value(Strength::Identical, tag("=")),
    ))(i)?;
    let (i, _) = ws(i)?;
    let (i, seq1) = text_seq(i)?;
    let (i, _) = ws(i)?;
    let (i, seq2) = opt(preceded(char('|'), preceded(ws, text_seq)))(i)?;
    let (i, _) = ws(i)?;
    let (i, extension) = opt(preceded(char('/'), preceded(ws, text_seq)))(i)?;

    let (prefix, cps) = match seq2 {
        Some(cps) => (Some(seq1), cps),
        None => (None, seq1),
    };

    Ok((
        i,
        RuleEvent::Relation {
            strength,
            cps,
            prefix,
            extension,
        },
    ))
}

// Skip an unrecognized bracketed option, accounting for nested brackets
fn skip_bracketed(i: &str) -> IResult<&str, &str> {
    let (rest, _) = char('[')(i)?;
    let mut depth = 1usize;
    let mut end = None;
    for (pos, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(pos);
                    break;
                }
            }
            _ => {}
        }
    }
    match end {
        Some(pos) => Ok((&rest[pos + 1..], &rest[..pos])),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Char,
        ))),
    }
}

/// Parse a whole rules source into events, reporting unknown-but-wellformed
/// options through `warn` instead of failing.
pub fn parse_rules(
    src: &str,
    warn: &mut dyn FnMut(Diagnostic),
) -> Result<Vec<RuleEvent>, Error> {
    let mut events = Vec::new();
    let mut rest = src;

    loop {
        let (after_ws, _) = ws(rest).map_err(|_| parse_error(src, rest, "bad whitespace"))?;
        rest = after_ws;
        if rest.is_empty() {
            break;
        }

        let result = match rest.chars().next() {
            Some('&') => reset(rest),
            Some('<' | '=') => relation(rest),
            Some('[') => match setting(rest) {
                Ok(ok) => Ok(ok),
                Err(_) => {
                    let (after, inner) =
                        skip_bracketed(rest).map_err(|_| parse_error(src, rest, "unterminated option"))?;
                    warn(Diagnostic {
                        offset: src.len() - rest.len(),
                        message: format!("ignoring unsupported option [{inner}]"),
                    });
                    rest = after;
                    continue;
                }
            },
            _ => return Err(parse_error(src, rest, "expected a reset, relation, or option")),
        };

        match result {
            Ok((after, event)) => {
                events.push(event);
                rest = after;
            }
            Err(_) => return Err(parse_error(src, rest, "malformed rule")),
        }
    }

    Ok(events)
}

fn parse_error(src: &str, rest: &str, message: &str) -> Error {
    Error::Parse {
        offset: src.len() - rest.len(),
        message: message.to_owned(),
    }
}

/// Resolve `[reorder ...]` names against the default groups: the mentioned
/// groups come first, in the order given, then the remaining groups in
/// default order.
pub fn expand_reorder(names: &[String]) -> Result<Vec<&'static crate::data::ReorderGroup>, Error> {
    let by_name: FxHashMap<&str, &'static crate::data::ReorderGroup> = crate::data::REORDER_GROUPS
        .iter()
        .map(|g| (g.name, g))
        .collect();

    let mut expanded = Vec::with_capacity(crate::data::REORDER_GROUPS.len());
    for name in names {
        let group = by_name.get(name.as_str()).copied().ok_or_else(|| Error::Parse {
            offset: 0,
            message: format!("unknown reorder group '{name}'"),
        })?;
        if expanded.iter().any(|g: &&crate::data::ReorderGroup| g.name == group.name) {
            return Err(Error::Parse {
                offset: 0,
                message: format!("reorder group '{name}' listed twice"),
            });
        }
        expanded.push(group);
    }
    for group in crate::data::REORDER_GROUPS {
        if !expanded.iter().any(|g| g.name == group.name) {
            expanded.push(group);
        }
    }
    Ok(expanded)
}
