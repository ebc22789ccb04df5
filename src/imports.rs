//! Shortening qualified type names and recording the imports that requires.
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ImportError;
use crate::syntax::UnitFacts;
use crate::types::TextEdit;

/// Maximal runs of qualified-identifier characters.
static CLASS_NAME: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"[a-zA-Z0-9$_.]+").expect("valid regex"));

/// Brackets every placeholder token. Private-use, so it never occurs in a signature.
const TOKEN_SEPARATOR: char = '\u{E000}';

/// First of the private-use characters standing in for the digits of a token index.
const TOKEN_DIGIT_BASE: u32 = 0xE010;

/// Package whose types never need an import.
const IMPLICIT_PACKAGE: &str = "java.lang";

/// Something that can make a qualified type name usable by its short form.
pub trait ImportCollaborator {
    /// Short name to write for `name`, possibly recording an import edit.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::InvalidName` if `name` is not a dotted identifier.
    fn import(&mut self, name: &str) -> Result<String, ImportError>;
}

/// Import bookkeeping for one template evaluation in one compilation unit.
pub struct ImportRewriter<'a> {
    added: Vec<String>,
    cache: HashMap<String, String>,
    edits: Vec<TextEdit>,
    unit: &'a UnitFacts,
}

impl<'a> ImportRewriter<'a> {
    /// A rewriter with no pending imports.
    pub fn new(unit: &'a UnitFacts) -> Self {
        return Self { added: Vec::new(), cache: HashMap::new(), edits: Vec::new(), unit };
    }

    /// Import edits recorded since the last call, in order.
    pub fn take_edits(&mut self) -> Vec<TextEdit> {
        return std::mem::take(&mut self.edits);
    }

    fn is_visible(&self, name: &str, package: &str) -> bool {
        return package == IMPLICIT_PACKAGE
            || self.unit.package.as_deref() == Some(package)
            || self.unit.single_imports.iter().any(|i| return i == name)
            || self.unit.on_demand_imports.iter().any(|p| return p == package)
            || self.unit.declared_types.iter().any(|(_, q)| return q == name)
            || self.added.iter().any(|a| return a == name);
    }

    fn collides(&self, name: &str, simple: &str) -> bool {
        let clashes = |other: &String| return other != name && other.rsplit('.').next() == Some(simple);
        return self.unit.single_imports.iter().any(clashes)
            || self.added.iter().any(clashes)
            || self.unit.declared_types.iter().any(|(s, q)| return s == simple && q != name);
    }
}

impl ImportCollaborator for ImportRewriter<'_> {
    fn import(&mut self, name: &str) -> Result<String, ImportError> {
        if !name.split('.').all(is_identifier) {
            return Err(ImportError::InvalidName { name: name.to_string() });
        }
        let Some((package, simple)) = name.rsplit_once('.') else {
            return Ok(name.to_string());
        };
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }

        let short = if self.is_visible(name, package) {
            simple.to_string()
        } else if self.collides(name, simple) {
            name.to_string()
        } else {
            let separator = if self.added.is_empty() { self.unit.import_separator.as_str() } else { "" };
            self.edits.push(TextEdit::insert(self.unit.import_offset, format!("{separator}import {name};\n")));
            self.added.push(name.to_string());
            simple.to_string()
        };
        self.cache.insert(name.to_string(), short.clone());
        return Ok(short);
    }
}

/// Replace every qualified name in `signature` by the short form the
/// collaborator gives for it.
///
/// Names are swapped for placeholder tokens longest first, so a name that is
/// a suffix of a longer one (`b.c.Foo` in `a.b.c.Foo`) is never matched inside
/// it. Names the collaborator rejects are kept as written.
pub fn shorten_qualified_names(signature: &str, collaborator: &mut dyn ImportCollaborator) -> String {
    let mut seen = HashSet::new();
    let mut names: Vec<&str> = CLASS_NAME
        .find_iter(signature)
        .map(|m| return m.as_str())
        .filter(|name| return seen.insert(*name))
        .collect();
    names.sort_by_key(|name| return std::cmp::Reverse(name.len()));

    let mut working = signature.to_string();
    let mut shortened = Vec::with_capacity(names.len());
    for (rank, name) in names.iter().enumerate() {
        working = working.replace(name, &token(rank));
        let short = collaborator.import(name).unwrap_or_else(|err| {
            debug!(name, %err, "keeping qualified name");
            return (*name).to_string();
        });
        shortened.push(short);
    }
    for (rank, short) in shortened.iter().enumerate() {
        working = working.replace(&token(rank), short);
    }
    return working;
}

fn token(rank: usize) -> String {
    let digits: String = rank
        .to_string()
        .chars()
        .filter_map(|d| return d.to_digit(10).and_then(|v| return char::from_u32(TOKEN_DIGIT_BASE.saturating_add(v))))
        .collect();
    return format!("{TOKEN_SEPARATOR}{digits}{TOKEN_SEPARATOR}");
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    return chars.next().is_some_and(|c| return c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| return c.is_alphanumeric() || c == '_' || c == '$');
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Collaborator answering from a fixed table and recording every call.
    struct Table {
        calls: Vec<String>,
        map: HashMap<String, String>,
    }

    impl ImportCollaborator for Table {
        fn import(&mut self, name: &str) -> Result<String, ImportError> {
            self.calls.push(name.to_string());
            return Ok(self.map.get(name).cloned().unwrap_or_else(|| return name.to_string()));
        }
    }

    fn table(pairs: &[(&str, &str)]) -> Table {
        return Table {
            calls: Vec::new(),
            map: pairs.iter().map(|(k, v)| return ((*k).to_string(), (*v).to_string())).collect(),
        };
    }

    fn unit() -> UnitFacts {
        return UnitFacts {
            declared_types: vec![("Test".to_string(), "org.sample.Test".to_string())],
            import_offset: 20,
            import_separator: "\n".to_string(),
            on_demand_imports: vec!["java.io".to_string()],
            package: Some("org.sample".to_string()),
            single_imports: vec!["java.util.Collections".to_string(), "java.awt.List".to_string()],
        };
    }

    #[test]
    fn nested_suffix_names_do_not_alias() {
        let mut collaborator = table(&[("a.b.c.Foo", "Foo"), ("b.c.Foo", "Foo2")]);
        assert_eq!(shorten_qualified_names("a.b.c.Foo<b.c.Foo>", &mut collaborator), "Foo<Foo2>");
        assert_eq!(shorten_qualified_names("b.c.Foo<a.b.c.Foo>", &mut collaborator), "Foo2<Foo>");
    }

    #[test]
    fn repeated_names_are_imported_once() {
        let mut collaborator = table(&[("java.lang.String", "String")]);
        let out = shorten_qualified_names("java.util.Map<java.lang.String,java.lang.String>", &mut collaborator);
        assert_eq!(out, "java.util.Map<String,String>");
        assert_eq!(collaborator.calls.iter().filter(|c| return *c == "java.lang.String").count(), 1);
    }

    #[test]
    fn rejected_names_stay_qualified() {
        let uni = unit();
        let mut rewriter = ImportRewriter::new(&uni);
        assert_eq!(shorten_qualified_names("java.util.Map<x..y>", &mut rewriter), "Map<x..y>");
    }

    #[test]
    fn visible_names_need_no_edit() {
        let uni = unit();
        let mut rewriter = ImportRewriter::new(&uni);
        assert_eq!(rewriter.import("java.lang.String").unwrap(), "String");
        assert_eq!(rewriter.import("org.sample.Other").unwrap(), "Other");
        assert_eq!(rewriter.import("java.util.Collections").unwrap(), "Collections");
        assert_eq!(rewriter.import("java.io.File").unwrap(), "File");
        assert_eq!(rewriter.import("int").unwrap(), "int");
        assert!(rewriter.take_edits().is_empty());
    }

    #[test]
    fn new_imports_record_one_edit_each() {
        let uni = unit();
        let mut rewriter = ImportRewriter::new(&uni);
        assert_eq!(rewriter.import("java.util.Map").unwrap(), "Map");
        assert_eq!(rewriter.import("java.util.Map").unwrap(), "Map");
        assert_eq!(rewriter.import("java.util.Set").unwrap(), "Set");
        let edits = rewriter.take_edits();
        assert_eq!(
            edits,
            vec![
                TextEdit::insert(20, "\nimport java.util.Map;\n".to_string()),
                TextEdit::insert(20, "import java.util.Set;\n".to_string()),
            ]
        );
    }

    #[test]
    fn colliding_simple_names_stay_qualified() {
        let uni = unit();
        let mut rewriter = ImportRewriter::new(&uni);
        assert_eq!(rewriter.import("java.util.List").unwrap(), "java.util.List");
        assert_eq!(rewriter.import("com.acme.Test").unwrap(), "com.acme.Test");
        assert!(rewriter.take_edits().is_empty());
    }

    #[test]
    fn malformed_names_are_rejected() {
        let uni = unit();
        let mut rewriter = ImportRewriter::new(&uni);
        assert!(matches!(rewriter.import("java..util"), Err(ImportError::InvalidName { .. })));
        assert!(matches!(rewriter.import("1abc.Foo"), Err(ImportError::InvalidName { .. })));
    }

    fn segment() -> impl Strategy<Value = String> {
        return "[a-e][a-e0-9]{0,3}";
    }

    fn qualified() -> impl Strategy<Value = String> {
        return prop::collection::vec(segment(), 1..4).prop_map(|parts| return parts.join("."));
    }

    proptest! {
        /// Each distinct name maps to a unique short form; the result must be
        /// exactly the per-name substitution regardless of nesting order.
        #[test]
        fn substitution_matches_per_name_mapping(names in prop::collection::vec(qualified(), 1..5)) {
            let mut distinct: Vec<String> = Vec::new();
            for name in &names {
                if !distinct.contains(name) {
                    distinct.push(name.clone());
                }
            }
            let shorts: Vec<(String, String)> = distinct.iter().enumerate().map(|(i, n)| return (n.clone(), format!("S{i}"))).collect();
            let pairs: Vec<(&str, &str)> = shorts.iter().map(|(n, s)| return (n.as_str(), s.as_str())).collect();

            let signature = format!("{}<{}>", names[0], names[1..].join(","));
            let expected = {
                let short = |n: &String| return shorts.iter().find(|(q, _)| return q == n).map(|(_, s)| return s.clone()).unwrap();
                let args: Vec<String> = names[1..].iter().map(short).collect();
                format!("{}<{}>", short(&names[0]), args.join(","))
            };
            let mut collaborator = table(&pairs);
            prop_assert_eq!(shorten_qualified_names(&signature, &mut collaborator), expected);
        }
    }
}
