/// Tree-sitter grammar resolution by file extension.
use std::path::Path;

use tree_sitter::{Language, Parser, Tree};

use crate::error::Error;

/// Map a file extension to its tree-sitter language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for anything but `.java`.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        "java" => Ok(tree_sitter_java::LANGUAGE.into()),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}

/// Parse source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_source(file_path: &Path, source: &str, language: &Language) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn java_is_supported() {
        assert!(language_for_path(&PathBuf::from("src/Main.java")).is_ok());
    }

    #[test]
    fn other_extensions_are_rejected() {
        let err = language_for_path(&PathBuf::from("main.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { ext } if ext == "rs"));
    }

    #[test]
    fn parses_java() {
        let path = PathBuf::from("A.java");
        let language = language_for_path(&path).unwrap();
        let tree = parse_source(&path, "class A { void m() { int x = 1; } }", &language).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }
}
