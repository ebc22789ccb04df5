/// Core domain types for postfixer bindings, edits, and completion output.
use std::ops::Range;

use serde::Serialize;

use crate::signature::TypeSignature;

/// What kind of type a binding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// An array of some element type.
    Array,
    /// A capture of a wildcard; has no name of its own.
    Capture,
    /// A class (or an unknown reference type).
    Class,
    /// An interface.
    Interface,
    /// A primitive keyword type.
    Primitive,
    /// A wildcard type argument.
    Wildcard,
}

/// Immutable snapshot of a resolved type, built once per lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBinding {
    /// Bounds of a capture or wildcard, in declaration order.
    pub bounds: Vec<TypeSignature>,
    /// Declared interfaces, ordered and deduplicated.
    pub interfaces: Vec<TypeSignature>,
    /// Shape of the type.
    pub kind: BindingKind,
    /// Qualified name including type arguments; empty for captures.
    pub qualified_name: String,
    /// The signature this binding was built from.
    pub signature: TypeSignature,
    /// Declared (or implied) superclass.
    pub superclass: Option<TypeSignature>,
}

impl SymbolBinding {
    /// Whether this binding is an array type.
    pub fn is_array(&self) -> bool {
        return self.kind == BindingKind::Array;
    }

    /// Whether this binding is a primitive type.
    pub fn is_primitive(&self) -> bool {
        return self.kind == BindingKind::Primitive;
    }
}

/// What a name node refers to, as attached by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A method; the return type is absent when it could not be determined.
    Method {
        /// Declared return type after receiver substitution.
        return_type: Option<TypeSignature>,
    },
    /// A type name such as `System` in `System.out`.
    Type(TypeSignature),
    /// A local, parameter, or field, with its declared type.
    Variable(TypeSignature),
}

/// A replacement of a byte range of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Text inserted in place of the range.
    pub new_text: String,
    /// Byte offsets replaced; empty for insertions.
    pub range: Range<usize>,
}

impl TextEdit {
    /// Insert `text` at `offset` without replacing anything.
    pub fn insert(offset: usize, text: String) -> Self {
        return Self { new_text: text, range: offset..offset };
    }
}

/// Zero-based line and UTF-16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// UTF-16 code units from the start of the line.
    pub character: u32,
    /// Zero-based line number.
    pub line: u32,
}

/// A span expressed both as byte offsets and as positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    /// End byte offset (exclusive).
    pub end: usize,
    /// End position (exclusive).
    pub end_position: Position,
    /// Start byte offset.
    pub start: usize,
    /// Start position.
    pub start_position: Position,
}

/// An edit as exposed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutput {
    /// Replacement text.
    pub new_text: String,
    /// Span replaced.
    pub range: SourceRange,
}

/// One resolved template, ready for the completion sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    /// Edits applied alongside the insertion: the removal of the replaced
    /// expression first, then imports and new declarations.
    pub additional_edits: Vec<EditOutput>,
    /// Template description.
    pub detail: String,
    /// Insert text with tab-stops stripped, for display.
    pub documentation: String,
    /// Snippet text to insert at the cursor.
    pub insert_text: String,
    /// Always `"snippet"`.
    pub kind: &'static str,
    /// Template name.
    pub label: String,
    /// Placeholders and every offset they occupy.
    pub placeholders: Vec<PlaceholderOutput>,
    /// Span of the text the snippet covers (expression, dot, and typed prefix).
    pub replace_range: SourceRange,
    /// Sort key placing snippets after other completions.
    pub sort_text: &'static str,
}

/// Where one placeholder ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderOutput {
    /// Placeholder name.
    pub name: String,
    /// Offsets inside the insert text, then absolute document offsets of
    /// occurrences written by additional edits.
    pub offsets: Vec<PlaceholderOffset>,
    /// Names of the placeholders derived from this one, which an editor
    /// re-resolves when the user picks a different value here.
    pub slaves: Vec<String>,
    /// Whether the value is the only sensible choice.
    pub unambiguous: bool,
    /// Resolved value.
    pub value: String,
}

/// An occurrence of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "in", content = "offset", rename_all = "snake_case")]
pub enum PlaceholderOffset {
    /// Offset relative to the start of the insert text.
    Buffer(usize),
    /// Absolute document offset, written by an additional edit.
    Document(usize),
}

/// Converts byte offsets into line/UTF-16 positions and back.
pub struct LineIndex {
    line_starts: Vec<usize>,
    text: String,
}

impl LineIndex {
    /// Index the line starts of `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i.saturating_add(1));
            }
        }
        return Self { line_starts, text: text.to_string() };
    }

    /// Position of a byte offset; offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|start| return *start <= offset).saturating_sub(1);
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        let prefix = self.text.get(start..offset).unwrap_or("");
        let character = prefix.encode_utf16().count();
        return Position {
            character: u32::try_from(character).unwrap_or(u32::MAX),
            line: u32::try_from(line).unwrap_or(u32::MAX),
        };
    }

    /// Byte offset of a line/UTF-16 column, or `None` if it is outside the text.
    pub fn offset(&self, line: u32, character: u32) -> Option<usize> {
        let start = *self.line_starts.get(usize::try_from(line).ok()?)?;
        let end = self.line_starts.get(usize::try_from(line).ok()?.saturating_add(1)).copied().unwrap_or(self.text.len());
        let line_text = self.text.get(start..end)?;
        let wanted = usize::try_from(character).ok()?;
        let mut units = 0_usize;
        for (i, c) in line_text.char_indices() {
            if units >= wanted {
                return Some(start.saturating_add(i));
            }
            units = units.saturating_add(c.len_utf16());
        }
        return (units >= wanted).then_some(end);
    }

    /// Build a range from byte offsets.
    pub fn range(&self, range: &Range<usize>) -> SourceRange {
        return SourceRange {
            end: range.end,
            end_position: self.position(range.end),
            start: range.start,
            start_position: self.position(range.start),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_count_utf16_units() {
        let index = LineIndex::new("ab\n\tä𝄞x\n");
        assert_eq!(index.position(0), Position { character: 0, line: 0 });
        assert_eq!(index.position(3), Position { character: 0, line: 1 });
        // tab (1) + ä (1) + 𝄞 (2)
        assert_eq!(index.position(10), Position { character: 4, line: 1 });
    }

    #[test]
    fn offsets_invert_positions() {
        let text = "package a;\n\tclass B {}\n";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(1, 1), Some(12));
        assert_eq!(index.position(12), Position { character: 1, line: 1 });
        assert_eq!(index.offset(7, 0), None);
    }
}
