/// Crate-level error types for postfixer diagnostics.
use std::path::PathBuf;

/// All errors in postfixer carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, position, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A template catalog defect: placeholder dependencies are malformed.
    #[error("template `{template}`: {source}")]
    Dependency {
        /// The dependency graph violation.
        source: DependencyError,
        /// Name of the template whose placeholders form the bad graph.
        template: String,
    },

    /// A referenced source file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Source file exceeds the configured size limit.
    #[error("file too large ({size_bytes} bytes, max {max_bytes}): {}", file.display())]
    FileTooLarge {
        /// File that exceeded the size limit.
        file: PathBuf,
        /// Maximum allowed file size in bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        size_bytes: u64,
    },

    /// The requested cursor position does not exist in the file.
    #[error("invalid position in {}: {reason}", file.display())]
    InvalidPosition {
        /// File the position was requested in.
        file: PathBuf,
        /// Why the position was rejected.
        reason: String,
    },

    /// A type signature string does not follow the signature grammar.
    #[error("invalid type signature `{input}`: {reason}")]
    InvalidSignature {
        /// The offending signature text.
        input: String,
        /// Description of the grammar violation.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of completion output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}

/// Violations of the master/slave placeholder forest. These indicate a defect
/// in a template definition and are never recovered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    /// Linking `master -> slave` would close a loop in the master chain.
    #[error("placeholder `{slave}` is already a master of `{master}`")]
    CycleDetected {
        /// Placeholder that was about to become a master.
        master: String,
        /// Placeholder that was about to become a slave.
        slave: String,
    },

    /// The slave already derives its value from another placeholder.
    #[error("placeholder `{slave}` already has master `{existing}`, cannot add `{master}`")]
    DuplicateMaster {
        /// The master already recorded for the slave.
        existing: String,
        /// The master that was rejected.
        master: String,
        /// Placeholder with two masters.
        slave: String,
    },
}

/// Failures while evaluating a single template into a buffer. The driver
/// skips the template and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The affected source region lies outside the document.
    #[error("bad location {offset}..{end} in a document of {len} bytes")]
    BadLocation {
        /// End of the requested region.
        end: usize,
        /// Document length in bytes.
        len: usize,
        /// Start of the requested region.
        offset: usize,
    },

    /// The pattern text does not follow the placeholder syntax.
    #[error("malformed pattern at byte {position}: {reason}")]
    MalformedPattern {
        /// Byte position in the pattern where parsing stopped.
        position: usize,
        /// Description of the syntax violation.
        reason: String,
    },
}

/// The import collaborator could not shorten a name. Callers keep the
/// fully-qualified name instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// The name is not a well-formed dotted identifier.
    #[error("not a qualified type name: `{name}`")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
}
