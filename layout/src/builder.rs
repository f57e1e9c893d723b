//! Recursive layout builder.
//!
//! Walks the flat token-line sequence and produces the nested field tree.
//! Each line is classified into a [`LineShape`]; handlers for structural
//! shapes recurse over the index range of the line's subordinate items (the
//! following lines with a strictly greater level number) and the scan resumes
//! after that range.
//!
//! Offsets are half-open: a running cursor holds the first free byte of the
//! enclosing structure, every non-redefining node starts at the cursor and
//! advances it by its length, and redefining nodes are anchored at their
//! target's start instead.
//!
//! Offset arithmetic is checked. A line whose size or end does not fit in
//! `usize` produces no node, as does an OCCURS table beyond [`MAX_OCCURS`]
//! repetitions or [`MAX_TABLE_FIELDS`] materialized fields.

use std::ops::Range;

use tracing::debug;

use copybook_schema_core::{FieldNode, RecordSchema};

use crate::diagnostics::{DiagnosticKind, LayoutDiagnostics};
use crate::picture::Picture;
use crate::redefines::{DepthFirstLookup, FieldLookup};
use crate::tokenizer::TokenLine;

/// Level number of condition names.
pub const CONDITION_LEVEL: u8 = 88;

/// Largest OCCURS count that is expanded.
pub const MAX_OCCURS: usize = 65_535;

/// Most field nodes one table may materialize across all its repetitions.
pub const MAX_TABLE_FIELDS: usize = 1_000_000;

/// Shape of one token-line, listed in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape<'a> {
    /// Level 88: skipped.
    ConditionName,
    /// `REDEFINES` without a picture: a group overlay.
    GroupRedefine { target: &'a str },
    /// `REDEFINES` with a picture: an elementary overlay.
    FieldRedefine {
        target: &'a str,
        picture: Picture<'a>,
        size: usize,
    },
    /// Elementary item.
    Field { picture: Picture<'a>, size: usize },
    /// Repeated group.
    OccursGroup { occurs: usize },
    /// Plain group; becomes a node only if it has subordinate items.
    Group,
    /// Anything else, including pictures too large to size: no node, no
    /// offset change.
    Unrecognized,
}

impl<'a> LineShape<'a> {
    /// Classifies a token-line.
    ///
    /// # Examples
    ///
    /// ```
    /// use copybook_schema_layout::builder::LineShape;
    /// use copybook_schema_layout::tokenizer::tokenize;
    ///
    /// let lines = tokenize("05 B REDEFINES A PIC 9(4).\n88 FLAG VALUE 'Y'.\nCOPY X.", 0);
    /// assert!(matches!(LineShape::classify(&lines[0]), LineShape::FieldRedefine { target: "A", .. }));
    /// assert_eq!(LineShape::classify(&lines[1]), LineShape::ConditionName);
    /// assert_eq!(LineShape::classify(&lines[2]), LineShape::Unrecognized);
    /// ```
    pub fn classify(line: &'a TokenLine) -> Self {
        let Some(level) = line.level() else {
            return Self::Unrecognized;
        };
        if level == CONDITION_LEVEL {
            return Self::ConditionName;
        }

        let has_pic_keyword = line.has_keyword("PIC") || line.has_keyword("PICTURE");
        let picture =
            Picture::of_line(line).and_then(|picture| Some((picture, picture.size()?)));

        if line.has_keyword("REDEFINES") {
            let Some(target) = line.after("REDEFINES") else {
                return Self::Unrecognized;
            };
            return match picture {
                Some((picture, size)) => Self::FieldRedefine {
                    target,
                    picture,
                    size,
                },
                None if has_pic_keyword => Self::Unrecognized,
                None => Self::GroupRedefine { target },
            };
        }

        if let Some((picture, size)) = picture {
            return Self::Field { picture, size };
        }
        if has_pic_keyword {
            return Self::Unrecognized;
        }

        if line.has_keyword("OCCURS") {
            return occurs_count(line).map_or(Self::Unrecognized, |occurs| Self::OccursGroup {
                occurs,
            });
        }

        Self::Group
    }

    fn has_subordinates(self) -> bool {
        matches!(
            self,
            Self::GroupRedefine { .. } | Self::OccursGroup { .. } | Self::Group
        )
    }
}

/// Repetition count of an OCCURS clause; `OCCURS m TO n` yields `n`.
fn occurs_count(line: &TokenLine) -> Option<usize> {
    let at = line.position("OCCURS")?;
    let count = line.tokens.get(at + 1)?.parse().ok()?;
    match line.tokens.get(at + 2) {
        Some(token) if token.eq_ignore_ascii_case("TO") => line.tokens.get(at + 3)?.parse().ok(),
        _ => Some(count),
    }
}

/// Fields built from a range of token-lines, with the byte range they cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub fields: Vec<FieldNode>,
    pub start: usize,
    /// Exclusive end: the cursor after the last non-redefining field.
    pub end: usize,
}

impl Layout {
    pub fn length(&self) -> usize {
        self.end - self.start
    }

    pub fn into_record(self) -> RecordSchema {
        let length = self.length();
        RecordSchema {
            data: self.fields,
            start: self.start,
            length,
        }
    }
}

/// Builds field trees from token-lines.
///
/// Generic over the [`FieldLookup`] used to anchor REDEFINES items.
pub struct LayoutBuilder<'a, L = DepthFirstLookup> {
    lines: &'a [TokenLine],
    lookup: L,
    diagnostics: LayoutDiagnostics,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(lines: &'a [TokenLine]) -> Self {
        Self::with_lookup(lines, DepthFirstLookup)
    }
}

impl<'a, L: FieldLookup> LayoutBuilder<'a, L> {
    pub fn with_lookup(lines: &'a [TokenLine], lookup: L) -> Self {
        Self {
            lines,
            lookup,
            diagnostics: LayoutDiagnostics::default(),
        }
    }

    /// Builds every line, starting at byte `start`.
    pub fn build(&mut self, start: usize) -> Layout {
        self.build_range(0..self.lines.len(), start)
    }

    pub fn diagnostics(&self) -> &LayoutDiagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> LayoutDiagnostics {
        self.diagnostics
    }

    /// End of the subordinate range of the line at `index`, bounded by
    /// `limit`.
    fn subordinate_end(&self, index: usize, limit: usize) -> usize {
        let Some(level) = self.lines[index].level() else {
            return index + 1;
        };
        let mut end = index + 1;
        while end < limit && self.lines[end].level().is_some_and(|next| next > level) {
            end += 1;
        }
        end
    }

    fn build_range(&mut self, range: Range<usize>, start: usize) -> Layout {
        let lines = self.lines;
        let mut fields: Vec<FieldNode> = Vec::new();
        let mut cursor = start;
        let mut index = range.start;

        while index < range.end {
            let line = &lines[index];
            let shape = LineShape::classify(line);
            let next = if shape.has_subordinates() {
                self.subordinate_end(index, range.end)
            } else {
                index + 1
            };
            let body = index + 1..next;
            let name = line.source_name();

            let node = match shape {
                LineShape::ConditionName => {
                    self.diagnostics
                        .push(line.line, DiagnosticKind::ConditionNameSkipped, line.text());
                    None
                }
                LineShape::GroupRedefine { target } => {
                    let anchor = self.resolve(&fields, target, line);
                    let overlay = self.build_range(body, anchor);
                    cursor = cursor.max(overlay.end);
                    let length = overlay.length();
                    Some(FieldNode::group(name, overlay.fields, anchor, length).with_redefines(target))
                }
                LineShape::FieldRedefine {
                    target,
                    picture,
                    size,
                } => {
                    let anchor = self.resolve(&fields, target, line);
                    if anchor.checked_add(size).is_some() {
                        Some(
                            FieldNode::elementary(name, picture.kind(), anchor, size)
                                .with_redefines(target),
                        )
                    } else {
                        self.out_of_range(line);
                        None
                    }
                }
                LineShape::Field { picture, size } => match cursor.checked_add(size) {
                    Some(end) => {
                        if line.has_keyword("OCCURS") {
                            self.diagnostics.push(
                                line.line,
                                DiagnosticKind::ElementaryOccursIgnored,
                                line.text(),
                            );
                        }
                        let field = FieldNode::elementary(name, picture.kind(), cursor, size);
                        cursor = end;
                        Some(field)
                    }
                    None => {
                        self.out_of_range(line);
                        None
                    }
                },
                LineShape::OccursGroup { occurs } => {
                    let table = self.build_table(line, body, occurs, cursor);
                    if let Some(list) = &table {
                        cursor = list.end();
                    }
                    table
                }
                LineShape::Group if body.is_empty() => {
                    debug!(line = line.line, text = %line.text(), "Group without subordinate items");
                    self.diagnostics
                        .push(line.line, DiagnosticKind::EmptyGroup, line.text());
                    None
                }
                LineShape::Group => {
                    let layout = self.build_range(body, cursor);
                    let length = layout.length();
                    let group = FieldNode::group(name, layout.fields, cursor, length);
                    cursor = layout.end;
                    Some(group)
                }
                LineShape::Unrecognized => {
                    debug!(line = line.line, text = %line.text(), "Unrecognized copybook line");
                    self.diagnostics
                        .push(line.line, DiagnosticKind::UnrecognizedLine, line.text());
                    None
                }
            };

            if let Some(node) = node {
                fields.push(node);
            }
            index = next;
        }

        Layout {
            fields,
            start,
            end: cursor,
        }
    }

    /// Expands an OCCURS group at `start`, one rebuild of `body` per
    /// repetition.
    ///
    /// The first repetition is built alone to bound the rest: the table is
    /// skipped when its count, total length or field count is out of range.
    /// Diagnostics are kept from the first repetition only.
    fn build_table(
        &mut self,
        line: &TokenLine,
        body: Range<usize>,
        occurs: usize,
        start: usize,
    ) -> Option<FieldNode> {
        let name = line.source_name();
        if occurs > MAX_OCCURS {
            self.out_of_range(line);
            return None;
        }

        let mark = self.diagnostics.len();
        let first = self.build_range(body.clone(), start);
        let width = first.length();
        let fields_per_rep: usize = first.fields.iter().map(FieldNode::node_count).sum();
        let fits = width
            .checked_mul(occurs)
            .and_then(|total| start.checked_add(total))
            .is_some();
        if !fits || fields_per_rep.saturating_mul(occurs) > MAX_TABLE_FIELDS {
            self.diagnostics.truncate(mark);
            self.out_of_range(line);
            return None;
        }
        if occurs == 0 {
            self.diagnostics.truncate(mark);
            return Some(FieldNode::list(name, Vec::new(), start, 0));
        }

        let mut rep_start = first.end;
        let mut repetitions = vec![first.fields];
        for _ in 1..occurs {
            let mark = self.diagnostics.len();
            let layout = self.build_range(body.clone(), rep_start);
            self.diagnostics.truncate(mark);
            rep_start = layout.end;
            repetitions.push(layout.fields);
        }
        Some(FieldNode::list(name, repetitions, start, rep_start - start))
    }

    fn out_of_range(&mut self, line: &TokenLine) {
        debug!(line = line.line, text = %line.text(), "Size or offset out of range");
        self.diagnostics
            .push(line.line, DiagnosticKind::SizeOutOfRange, line.text());
    }

    /// Start of a REDEFINES target within `scope`, or 0 when unresolved.
    fn resolve(&mut self, scope: &[FieldNode], target: &str, line: &TokenLine) -> usize {
        match self.lookup.find_start(scope, target) {
            Some(start) => start,
            None => {
                debug!(line = line.line, redefines = target, "Unresolved REDEFINES target");
                self.diagnostics
                    .push(line.line, DiagnosticKind::UnresolvedRedefinition, target);
                0
            }
        }
    }
}

/// Builds `lines` starting at byte `start` with the default lookup.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::builder::build_layout;
/// use copybook_schema_layout::tokenizer::tokenize;
///
/// let lines = tokenize("05 A PIC X(4).\n05 B PIC 9(2).", 0);
/// let layout = build_layout(&lines, 10);
/// assert_eq!(layout.fields[1].start, 14);
/// assert_eq!((layout.start, layout.end), (10, 16));
/// ```
pub fn build_layout(lines: &[TokenLine], start: usize) -> Layout {
    LayoutBuilder::new(lines).build(start)
}
