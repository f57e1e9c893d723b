//! PICTURE clause sizing and field classification.

use regex::Regex;
use std::sync::LazyLock;

use copybook_schema_core::FieldKind;

use crate::tokenizer::TokenLine;

// SAFETY: compile-time constant, validated by tests.
static REPEAT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("static regex must compile"));

/// Storage encoding of an elementary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One byte per character or digit.
    #[default]
    Display,
    /// `COMP` / `BINARY`: two or four byte binary integer.
    PackedBinary,
    /// `COMP-3` / `PACKED-DECIMAL`: two digits per byte plus a sign nibble.
    PackedDecimal,
}

impl Encoding {
    /// Maps a usage token to its encoding.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "COMP" | "COMP-4" | "COMP-5" | "BINARY" | "COMPUTATIONAL" | "COMPUTATIONAL-4"
            | "COMPUTATIONAL-5" => Some(Self::PackedBinary),
            "COMP-3" | "COMPUTATIONAL-3" | "PACKED-DECIMAL" => Some(Self::PackedDecimal),
            _ => None,
        }
    }

    /// First usage token on the line, `Display` when there is none.
    pub fn of_line(line: &TokenLine) -> Self {
        line.tokens
            .iter()
            .skip(2)
            .find_map(|token| Self::from_token(token))
            .unwrap_or_default()
    }
}

/// A PICTURE clause with the encoding found on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picture<'a> {
    pub clause: &'a str,
    pub encoding: Encoding,
}

impl<'a> Picture<'a> {
    pub fn new(clause: &'a str, encoding: Encoding) -> Self {
        Self { clause, encoding }
    }

    /// Reads the `PIC`/`PICTURE [IS] clause` and usage of a token-line.
    pub fn of_line(line: &'a TokenLine) -> Option<Self> {
        let keyword = line.position("PIC").or_else(|| line.position("PICTURE"))?;
        let mut operand = keyword + 1;
        if line
            .tokens
            .get(operand)
            .is_some_and(|token| token.eq_ignore_ascii_case("IS"))
        {
            operand += 1;
        }
        let clause = line.tokens.get(operand)?;
        Some(Self::new(clause, Encoding::of_line(line)))
    }

    /// Byte length under this picture's encoding; `None` when the repeat
    /// counts do not fit in `usize`.
    pub fn size(&self) -> Option<usize> {
        picture_size(self.clause, self.encoding)
    }

    /// Semantic kind of the item.
    pub fn kind(&self) -> FieldKind {
        classify(self.clause, self.encoding)
    }
}

/// Number of character or digit positions a clause describes.
///
/// The clause is split on the implied decimal point `V`; a segment holding
/// parenthesized repeat counts contributes their sum, any other segment its
/// character length. Returns `None` when a count does not parse or the sum
/// overflows.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::picture::display_length;
///
/// assert_eq!(display_length("9(5)V99"), Some(7));
/// assert_eq!(display_length("S9(7)"), Some(7));
/// assert_eq!(display_length("XXX"), Some(3));
/// assert_eq!(display_length("X(18446744073709551615)X(1)"), None);
/// ```
pub fn display_length(clause: &str) -> Option<usize> {
    clause.split(['V', 'v']).try_fold(0usize, |total, segment| {
        let digits = if segment.contains('(') {
            REPEAT_COUNT
                .captures_iter(segment)
                .try_fold(0usize, |sum, caps| sum.checked_add(caps[1].parse().ok()?))?
        } else {
            segment.chars().count()
        };
        total.checked_add(digits)
    })
}

/// Byte length of an elementary item.
///
/// Binary items take 2 bytes below 5 digits and 4 bytes otherwise; packed
/// decimal items take `digits / 2 + 1` bytes.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::picture::{Encoding, picture_size};
///
/// assert_eq!(picture_size("X(10)", Encoding::Display), Some(10));
/// assert_eq!(picture_size("9(7)", Encoding::PackedDecimal), Some(4));
/// assert_eq!(picture_size("9(3)", Encoding::PackedBinary), Some(2));
/// assert_eq!(picture_size("9(9)", Encoding::PackedBinary), Some(4));
/// ```
pub fn picture_size(clause: &str, encoding: Encoding) -> Option<usize> {
    let digits = display_length(clause)?;
    Some(match encoding {
        Encoding::Display => digits,
        Encoding::PackedBinary if digits < 5 => 2,
        Encoding::PackedBinary => 4,
        Encoding::PackedDecimal => digits / 2 + 1,
    })
}

/// Classifies an elementary item.
///
/// The encoding is checked before the clause shape: any binary or packed
/// item is `Binary`, even with a numeric picture.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::FieldKind;
/// use copybook_schema_layout::picture::{Encoding, classify};
///
/// assert_eq!(classify("X(10)", Encoding::Display), FieldKind::String);
/// assert_eq!(classify("9(5)", Encoding::Display), FieldKind::Number);
/// assert_eq!(classify("9(5)", Encoding::PackedDecimal), FieldKind::Binary);
/// ```
pub fn classify(clause: &str, encoding: Encoding) -> FieldKind {
    if encoding != Encoding::Display {
        FieldKind::Binary
    } else if clause.contains('9') {
        FieldKind::Number
    } else {
        FieldKind::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tokens: &[&str]) -> TokenLine {
        TokenLine::new(1, tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_packed_decimal_sizes() {
        for (digits, expected) in [(1, 1), (2, 2), (3, 2), (7, 4), (8, 5), (15, 8)] {
            let clause = format!("9({digits})");
            assert_eq!(
                picture_size(&clause, Encoding::PackedDecimal),
                Some(expected),
                "{clause}"
            );
        }
    }

    #[test]
    fn test_packed_binary_two_tier() {
        assert_eq!(picture_size("9(4)", Encoding::PackedBinary), Some(2));
        assert_eq!(picture_size("9(5)", Encoding::PackedBinary), Some(4));
        assert_eq!(picture_size("S9(18)", Encoding::PackedBinary), Some(4));
    }

    #[test]
    fn test_display_length_sums_repeat_groups() {
        assert_eq!(display_length("X(3)X(2)"), Some(5));
        assert_eq!(display_length("S9(5)V9(2)"), Some(7));
        assert_eq!(display_length("99V99"), Some(4));
    }

    #[test]
    fn test_oversized_repeat_counts_have_no_size() {
        let max = usize::MAX;
        assert_eq!(display_length(&format!("X({max})")), Some(max));
        assert_eq!(display_length(&format!("X({max})X(1)")), None);
        assert_eq!(display_length(&format!("9({max})V9")), None);
        assert_eq!(display_length("X(99999999999999999999999)"), None);
        assert_eq!(picture_size(&format!("9({max})9(2)"), Encoding::PackedDecimal), None);
    }

    #[test]
    fn test_encoding_tokens() {
        assert_eq!(Encoding::from_token("comp-3"), Some(Encoding::PackedDecimal));
        assert_eq!(Encoding::from_token("BINARY"), Some(Encoding::PackedBinary));
        assert_eq!(Encoding::from_token("DISPLAY"), None);
    }

    #[test]
    fn test_picture_of_line_reads_clause_and_usage() {
        let pic = line(&["05", "AMT", "PIC", "S9(7)V99", "USAGE", "COMP-3"]);
        let picture = Picture::of_line(&pic).unwrap();
        assert_eq!(picture.clause, "S9(7)V99");
        assert_eq!(picture.encoding, Encoding::PackedDecimal);
        assert_eq!(picture.size(), Some(5));
        assert_eq!(picture.kind(), FieldKind::Binary);

        let long_form = line(&["05", "NAME", "PICTURE", "IS", "X(20)"]);
        assert_eq!(Picture::of_line(&long_form).unwrap().clause, "X(20)");

        assert!(Picture::of_line(&line(&["05", "BAD", "PIC"])).is_none());
    }

    #[test]
    fn test_encoding_precedes_clause_shape() {
        assert_eq!(classify("X(4)", Encoding::PackedBinary), FieldKind::Binary);
    }
}
