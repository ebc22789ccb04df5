//! CLI commands for postfixer: complete, templates, inspect.

use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::context::PostfixContext;
use crate::error;
use crate::frontend::{self, Analysis, Trigger};
use crate::resolver;
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{CompletionItem, LineIndex, Position};

/// Where the user's cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Zero-based line and UTF-16 column.
    LineColumn {
        /// UTF-16 code units from the start of the line.
        column: u32,
        /// Zero-based line number.
        line: u32,
    },
    /// Byte offset into the file.
    Offset(usize),
}

/// How `complete` reports its items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompleteOptions {
    /// Print a JSON array instead of markdown.
    pub json: bool,
    /// Skip placeholder resolution and insert the raw snippet form.
    pub lazy: bool,
}

/// Run one completion request and print every applicable template.
///
/// # Errors
///
/// Returns errors from reading or analyzing the file, `InvalidPosition` when
/// no `.prefix` ends at the cursor, or `Dependency` for a broken template.
pub fn complete(config: &Config, file: &Path, cursor: Cursor, options: CompleteOptions) -> Result<(), error::Error> {
    let items = completion_items(config, file, cursor, options.lazy)?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        eprintln!("No postfix templates apply here.");
        return Ok(());
    }
    for item in &items {
        print_item(item);
    }
    return Ok(());
}

/// Completion items for one request.
///
/// # Errors
///
/// Same as [`complete`].
pub fn completion_items(config: &Config, file: &Path, cursor: Cursor, lazy: bool) -> Result<Vec<CompletionItem>, error::Error> {
    let source = read_source(config, file)?;
    let trigger = locate_trigger(file, &source, cursor)?;
    let analysis = analyze(config, file, &source, &trigger)?;
    let context = PostfixContext::new(&analysis, &trigger);
    let items = resolver::complete(&context, &config.registry(), lazy)?;
    debug!(file = %file.display(), count = items.len(), "completion finished");
    return Ok(items);
}

/// Print the node search around the cursor.
///
/// # Errors
///
/// Returns errors from reading or analyzing the file, or `InvalidPosition`
/// when no `.prefix` ends at the cursor.
pub fn inspect(config: &Config, file: &Path, cursor: Cursor) -> Result<(), error::Error> {
    let source = read_source(config, file)?;
    let trigger = locate_trigger(file, &source, cursor)?;
    let analysis = analyze(config, file, &source, &trigger)?;
    let context = PostfixContext::new(&analysis, &trigger);
    let tree = context.tree();
    let lines = LineIndex::new(&source);

    println!("prefix:     `{}`", trigger.prefix);
    println!("dot:        {}", format_position(lines.position(trigger.dot)));
    let Some(selection) = context.selection() else {
        println!("selection:  none (the cursor is not inside a member declaration)");
        return Ok(());
    };
    println!("completion: {}", describe_node(tree, &lines, selection.completion));
    match selection.parent {
        Some(parent) => println!("parent:     {}", describe_node(tree, &lines, parent)),
        None => println!("parent:     none"),
    }
    println!("selected:   {}", describe_node(tree, &lines, selection.selected));
    println!("type:       {}", context.inner_type());
    let in_scope: Vec<String> = tree
        .declarations
        .visible(trigger.dot)
        .map(|d| return format!("{} ({})", d.name, d.kind.label()))
        .collect();
    println!("in scope:   {}", in_scope.join(", "));
    let names: Vec<String> = config
        .registry()
        .templates()
        .iter()
        .filter(|t| return context.can_evaluate(t))
        .map(|t| return t.name.clone())
        .collect();
    println!("templates:  {}", names.join(", "));
    return Ok(());
}

/// List the template registry.
///
/// # Errors
///
/// Returns `Error::Json` if JSON serialization fails.
pub fn templates(config: &Config, json: bool) -> Result<(), error::Error> {
    let registry = config.registry();
    if json {
        println!("{}", serde_json::to_string_pretty(registry.templates())?);
        return Ok(());
    }
    let width = registry.templates().iter().map(|t| return t.name.len()).max().unwrap_or(0);
    for template in registry.templates() {
        println!("{:<width$}  {}", template.name, template.description);
    }
    return Ok(());
}

// ── Request plumbing ──────────────────────────────────────────────────

/// Read a source file, enforcing the configured size limit.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the file is missing, `Error::FileTooLarge`
/// above the limit, or `Error::Io` if reading fails.
fn read_source(config: &Config, file: &Path) -> Result<String, error::Error> {
    let metadata = std::fs::metadata(file).map_err(|_err| return error::Error::FileNotFound { path: file.to_path_buf() })?;
    let max_bytes = config.max_file_size();
    if metadata.len() > max_bytes {
        return Err(error::Error::FileTooLarge { file: file.to_path_buf(), max_bytes, size_bytes: metadata.len() });
    }
    return Ok(std::fs::read_to_string(file)?);
}

/// The postfix trigger ending at `cursor`.
///
/// # Errors
///
/// Returns `Error::InvalidPosition` if the cursor is outside the file or no
/// `.prefix` ends there.
fn locate_trigger(file: &Path, source: &str, cursor: Cursor) -> Result<Trigger, error::Error> {
    let invalid = |reason: String| return error::Error::InvalidPosition { file: file.to_path_buf(), reason };
    let offset = match cursor {
        Cursor::Offset(offset) => offset,
        Cursor::LineColumn { column, line } => LineIndex::new(source)
            .offset(line, column)
            .ok_or_else(|| return invalid(format!("line {line}, column {column} is outside the file")))?,
    };
    if offset > source.len() || !source.is_char_boundary(offset) {
        return Err(invalid(format!("offset {offset} is not a character boundary inside the file")));
    }
    return frontend::find_trigger(source, offset)
        .ok_or_else(|| return invalid(format!("no `.` followed by an identifier prefix ends at offset {offset}")));
}

/// Analyze `source` with the catalog extended by the configuration.
///
/// # Errors
///
/// Propagates catalog and front-end errors.
fn analyze(config: &Config, file: &Path, source: &str, trigger: &Trigger) -> Result<Analysis, error::Error> {
    let catalog = config.catalog()?;
    return frontend::analyze(file, source, Some(trigger), &catalog);
}

// ── Output ────────────────────────────────────────────────────────────

fn print_item(item: &CompletionItem) {
    println!("## {}", item.label);
    println!();
    println!("{}", item.detail);
    println!();
    for line in item.insert_text.lines() {
        println!("    {line}");
    }
    println!();
    for edit in &item.additional_edits {
        println!(
            "- {}..{} {:?}",
            format_position(edit.range.start_position),
            format_position(edit.range.end_position),
            edit.new_text
        );
    }
    println!();
}

fn format_position(position: Position) -> String {
    return format!("{}:{}", position.line, position.character);
}

fn describe_node(tree: &SyntaxTree, lines: &LineIndex, id: NodeId) -> String {
    let node = &tree[id];
    let text = tree.text(id);
    let shown: String = text.lines().next().unwrap_or("").chars().take(60).collect();
    let recovered = if node.recovered { " (recovered)" } else { "" };
    return format!(
        "{:?} {}..{} `{shown}`{recovered}",
        node.kind,
        format_position(lines.position(node.start)),
        format_position(lines.position(node.end()))
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const SOURCE: &str = "package p;\nclass T {\n\tvoid m(String[] a) {\n\t\ta.for\n\t}\n}\n";

    fn write_fixture(dir: &Path, source: &str) -> PathBuf {
        let path = dir.join("T.java");
        std::fs::write(&path, source).unwrap();
        return path;
    }

    #[test]
    fn line_and_column_find_the_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_fixture(dir.path(), SOURCE);
        let trigger = locate_trigger(&file, SOURCE, Cursor::LineColumn { column: 7, line: 3 }).unwrap();
        assert_eq!(trigger.prefix, "for");
        assert_eq!(trigger.cursor, SOURCE.find("a.for").unwrap() + 5);
    }

    #[test]
    fn positions_without_a_trigger_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_fixture(dir.path(), SOURCE);
        let err = locate_trigger(&file, SOURCE, Cursor::Offset(3)).unwrap_err();
        assert!(matches!(err, error::Error::InvalidPosition { .. }));
        let err = locate_trigger(&file, SOURCE, Cursor::LineColumn { column: 0, line: 40 }).unwrap_err();
        assert!(matches!(err, error::Error::InvalidPosition { .. }));
        let err = locate_trigger(&file, SOURCE, Cursor::Offset(SOURCE.len() + 1)).unwrap_err();
        assert!(matches!(err, error::Error::InvalidPosition { .. }));
    }

    #[test]
    fn oversized_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_fixture(dir.path(), SOURCE);
        let config = Config::parse("max_file_size = 8").unwrap();
        let err = read_source(&config, &file).unwrap_err();
        assert!(matches!(err, error::Error::FileTooLarge { max_bytes: 8, .. }));
    }

    #[test]
    fn missing_files_are_reported() {
        let err = read_source(&Config::default(), Path::new("/nonexistent/T.java")).unwrap_err();
        assert!(matches!(err, error::Error::FileNotFound { .. }));
    }

    #[test]
    fn completion_items_for_an_array_loop() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_fixture(dir.path(), SOURCE);
        let cursor = Cursor::Offset(SOURCE.find("a.for").unwrap() + 5);
        let items = completion_items(&Config::default(), &file, cursor, false).unwrap();
        let labels: Vec<&str> = items.iter().map(|i| return i.label.as_str()).collect();
        assert_eq!(labels, vec!["for", "fori", "forr"]);
        let first = items.first().unwrap();
        assert_eq!(first.insert_text, "for (String ${1:a2} : a) {\n\t${0}\n}");
        assert_eq!(first.additional_edits.len(), 1);
    }

    #[test]
    fn disabled_templates_are_not_offered() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_fixture(dir.path(), SOURCE);
        let config = Config::parse("disabled = [\"fori\"]").unwrap();
        let cursor = Cursor::Offset(SOURCE.find("a.for").unwrap() + 5);
        let items = completion_items(&config, &file, cursor, true).unwrap();
        let labels: Vec<&str> = items.iter().map(|i| return i.label.as_str()).collect();
        assert_eq!(labels, vec!["for", "forr"]);
        assert!(items.iter().all(|i| return i.placeholders.is_empty()));
    }
}
