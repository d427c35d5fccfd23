// SPDX-License-Identifier: Apache-2.0

/// Well-formedness of a declared language tag: a two- or three-letter
/// primary subtag followed by alphanumeric subtags of one to eight
/// characters. Registry validity is deliberately not checked; the
/// data only needs structurally sound tags.
#[must_use]
pub fn tag_is_well_formed(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let Some(primary) = subtags.next() else {
        return false;
    };
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    subtags.all(|s| {
        (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
    })
}
