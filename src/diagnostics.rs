use crate::config::CONFIG_FILE;
use crate::error::{DependencyError, Error};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as markdown with bold headings and print it to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::Dependency { source, template } => render_dependency(template, source),
        Error::FileTooLarge { file, max_bytes, size_bytes } => render_file_too_large(file, *size_bytes, *max_bytes),
        Error::InvalidPosition { file, reason } => render_invalid_position(file, reason),
        Error::InvalidSignature { input, reason } => render_invalid_signature(input, reason),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        _ => render_generic(e),
    };
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Output

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `{CONFIG_FILE}` against the documented schema.
"),
        _ => format!("\
# Error

{e}
"),
    };
}

fn render_dependency(template: &str, source: &DependencyError) -> String {
    let detail = match source {
        DependencyError::CycleDetected { master, slave } => {
            format!("Placeholder `{master}` would derive its value from `{slave}`, which already derives from `{master}`.")
        },
        DependencyError::DuplicateMaster { existing, master, slave } => {
            format!("Placeholder `{slave}` derives from `{existing}` and cannot also derive from `{master}`.")
        },
    };
    return format!("\
# Error: Broken Template `{template}`

{detail}

## Fix

Make every placeholder reference at most one other placeholder, without loops,
or disable the template in `{CONFIG_FILE}`:

    disabled = [\"{template}\"]
");
}

fn render_file_too_large(file: &std::path::Path, size_bytes: u64, max_bytes: u64) -> String {
    return format!("\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).

## Fix

Raise the limit in `{CONFIG_FILE}`:

    max_file_size = {size_bytes}
", file.display());
}

fn render_invalid_position(file: &std::path::Path, reason: &str) -> String {
    return format!("\
# Error: Invalid Position

No postfix completion at the requested position in `{}`: {reason}

## Fix

Point `--offset` (or `--line`/`--column`) just after `.<prefix>`, for example
right after `list.for`.
", file.display());
}

fn render_invalid_signature(input: &str, reason: &str) -> String {
    return format!("\
# Error: Invalid Type Signature

`{input}`: {reason}

## Fix

Signatures are qualified names with optional type arguments and array
suffixes, such as `java.util.List<java.lang.String>[]`.
");
}

fn render_unsupported_language(ext: &str) -> String {
    return format!(
        "\
# Error: Unsupported Language

No grammar for `.{ext}` files.

## Supported extensions

- `.java`
"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn too_large_suggests_the_config_key() {
        let out = render_error(&Error::FileTooLarge { file: PathBuf::from("Big.java"), max_bytes: 10, size_bytes: 20 });
        assert!(out.starts_with("# Error: File Too Large"));
        assert!(out.contains("max_file_size = 20"));
    }

    #[test]
    fn dependency_errors_name_the_template() {
        let out = render_error(&Error::Dependency {
            source: DependencyError::CycleDetected { master: "a".to_string(), slave: "b".to_string() },
            template: "loop".to_string(),
        });
        assert!(out.contains("Broken Template `loop`"));
        assert!(out.contains("disabled = [\"loop\"]"));
    }

    #[test]
    fn unsupported_language_lists_java() {
        let out = render_error(&Error::UnsupportedLanguage { ext: "py".to_string() });
        assert!(out.contains("`.py`"));
        assert!(out.contains("`.java`"));
    }

    #[test]
    fn other_errors_render_their_message() {
        let out = render_error(&Error::FileNotFound { path: PathBuf::from("Missing.java") });
        assert!(out.contains("`Missing.java` does not exist."));
    }
}
