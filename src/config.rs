use std::path::Path;

use crate::catalog::{TypeCatalog, TypeDecl};
use crate::error::Error;
use crate::template::{Template, TemplateRegistry};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".postfixer.toml";

/// Default limit on the size of a source file, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Project configuration loaded from `.postfixer.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Built-in template names that are never offered.
    disabled: Vec<String>,
    /// Largest source file accepted, in bytes.
    max_file_size: u64,
    /// Extra templates appended after the built-ins.
    templates: Vec<Template>,
    /// Extra catalog declarations.
    types: Vec<TypeDecl>,
}

/// Raw TOML structure for `.postfixer.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PostfixerTomlConfig {
    #[serde(default)]
    disabled: Vec<String>,
    #[serde(default)]
    max_file_size: Option<u64>,
    #[serde(default)]
    templates: Vec<Template>,
    #[serde(default)]
    types: Vec<TypeDecl>,
}

impl Default for Config {
    fn default() -> Self {
        return Self { disabled: Vec::new(), max_file_size: DEFAULT_MAX_FILE_SIZE, templates: Vec::new(), types: Vec::new() };
    }
}

impl Config {
    /// Load `.postfixer.toml` from `root`, or `explicit` when given.
    ///
    /// A missing default file yields the defaults. A file that exists but is
    /// malformed is an error; an explicit path that does not exist is too.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` for a missing explicit path, `Error::Io`
    /// if reading fails, or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        let path = explicit.map_or_else(|| return root.join(CONFIG_FILE), Path::to_path_buf);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit.is_some() {
                    return Err(Error::FileNotFound { path });
                }
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
        };
        tracing::debug!(path = %path.display(), "loaded config");
        return Self::parse(&content);
    }

    /// Parse config text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the text is not a valid config document.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: PostfixerTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            disabled: raw.disabled,
            max_file_size: raw.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            templates: raw.templates,
            types: raw.types,
        });
    }

    /// Largest source file accepted, in bytes.
    pub const fn max_file_size(&self) -> u64 {
        return self.max_file_size;
    }

    /// Built-in templates minus the disabled ones, then the configured ones.
    pub fn registry(&self) -> TemplateRegistry {
        return TemplateRegistry::builtin().without(&self.disabled).with(&self.templates);
    }

    /// The built-in JDK catalog extended with the configured declarations.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSignature` if a configured declaration does not
    /// parse.
    pub fn catalog(&self) -> Result<TypeCatalog, Error> {
        let mut catalog = TypeCatalog::builtin()?;
        catalog.extend(self.types.clone())?;
        return Ok(catalog);
    }
}
