//! Encoded type signatures: grammar, rendering, substitution, and the
//! element-type projection used by iteration templates.
//!
//! Grammar (whitespace between tokens is insignificant):
//!
//! ```text
//! sig      := "capture-of" sig | wildcard | base ("[" "]")*
//! wildcard := "?" [("extends" | "super") sig]
//! base     := PRIMITIVE | NAME ["<" [sig ("," sig)*] ">"]
//! ```
use std::collections::HashMap;
use std::fmt;

use crate::error::Error;

/// Keywords that denote primitive types. `void` only appears as a return type.
pub const PRIMITIVES: [&str; 9] =
    ["boolean", "byte", "char", "double", "float", "int", "long", "short", "void"];

/// The universal root of the reference type hierarchy.
pub const ROOT_TYPE: &str = "java.lang.Object";

/// Upper-bounded wildcard marker stripped before projecting element types.
const EXTENDS_WILDCARD: &str = "? extends ";

/// One array dimension.
const ARRAY_MARKER: &str = "[]";

/// Keyword introducing a capture of a wildcard.
const CAPTURE_KEYWORD: &str = "capture-of";

/// A parsed type signature. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// One array dimension over an element type.
    Array(Box<TypeSignature>),
    /// A compiler-introduced capture of a wildcard.
    Capture(Box<TypeSignature>),
    /// A class, interface, or type variable, with type arguments if generic.
    Class {
        /// Type arguments in declaration order; empty for raw or non-generic types.
        arguments: Vec<TypeSignature>,
        /// Qualified (or, for type variables, simple) name.
        name: String,
    },
    /// A primitive keyword such as `int`.
    Primitive(String),
    /// `?`, `? extends B`, or `? super B`.
    Wildcard {
        /// Bound type, `None` for the unbounded wildcard.
        bound: Option<Box<TypeSignature>>,
        /// `true` for `extends`, `false` for `super`.
        upper: bool,
    },
}

impl TypeSignature {
    /// Parse an encoded signature string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSignature` if the text does not follow the grammar
    /// or has unbalanced generic brackets.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut cursor = Cursor { chars: text.chars().collect(), pos: 0, input: text };
        let signature = cursor.signature()?;
        cursor.skip_whitespace();
        if cursor.peek().is_some() {
            return Err(cursor.fail("trailing characters"));
        }
        return Ok(signature);
    }

    /// A non-generic class type.
    pub fn class(name: &str) -> Self {
        return Self::Class { arguments: Vec::new(), name: name.to_string() };
    }

    /// The root reference type.
    pub fn root() -> Self {
        return Self::class(ROOT_TYPE);
    }

    /// The element type if this is an array.
    pub fn element(&self) -> Option<&Self> {
        return match self {
            Self::Array(element) => Some(element),
            _ => None,
        };
    }

    /// Erased name: type arguments dropped, array markers kept.
    pub fn erasure(&self) -> String {
        return match self {
            Self::Array(element) => format!("{}{ARRAY_MARKER}", element.erasure()),
            Self::Capture(inner) => inner.erasure(),
            Self::Class { name, .. } => name.clone(),
            Self::Primitive(name) => name.clone(),
            Self::Wildcard { bound: Some(bound), upper: true } => bound.erasure(),
            Self::Wildcard { .. } => ROOT_TYPE.to_string(),
        };
    }

    /// Replace every argument-less class named in `bindings` by its bound value.
    /// Used to instantiate declared supertypes and return types over type parameters.
    pub fn substitute(&self, bindings: &HashMap<String, Self>) -> Self {
        return match self {
            Self::Array(element) => Self::Array(Box::new(element.substitute(bindings))),
            Self::Capture(inner) => Self::Capture(Box::new(inner.substitute(bindings))),
            Self::Class { arguments, name } if arguments.is_empty() => {
                bindings.get(name).cloned().unwrap_or_else(|| return self.clone())
            },
            Self::Class { arguments, name } => Self::Class {
                arguments: arguments.iter().map(|a| return a.substitute(bindings)).collect(),
                name: name.clone(),
            },
            Self::Primitive(_) => self.clone(),
            Self::Wildcard { bound, upper } => Self::Wildcard {
                bound: bound.as_ref().map(|b| return Box::new(b.substitute(bindings))),
                upper: *upper,
            },
        };
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Array(element) => write!(f, "{element}{ARRAY_MARKER}"),
            Self::Capture(inner) => write!(f, "{CAPTURE_KEYWORD} {inner}"),
            Self::Class { arguments, name } if arguments.is_empty() => f.write_str(name),
            Self::Class { arguments, name } => {
                let rendered: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{name}<{}>", rendered.join(","))
            },
            Self::Primitive(name) => f.write_str(name),
            Self::Wildcard { bound: None, .. } => f.write_str("?"),
            Self::Wildcard { bound: Some(bound), upper: true } => write!(f, "? extends {bound}"),
            Self::Wildcard { bound: Some(bound), upper: false } => write!(f, "? super {bound}"),
        };
    }
}

/// The last dot-separated segment of a qualified name.
pub fn simple_name(qualified: &str) -> &str {
    return qualified.rsplit('.').next().unwrap_or(qualified);
}

/// Whether `name` is a primitive keyword.
pub fn is_primitive(name: &str) -> bool {
    return PRIMITIVES.contains(&name);
}

/// Project the type an iteration over `signature` yields.
///
/// Strips a leading `? extends ` marker, then unwraps exactly one trailing
/// array dimension if present. Otherwise, for a generic instantiation, returns
/// the text between the first `<` and the last `>`, cut at the first comma
/// when that text holds no nested generics. Anything else is returned as is.
/// The array check runs first so `List<String>[]` yields `List<String>`.
pub fn project_element_type(signature: &str) -> String {
    let stripped = signature.strip_prefix(EXTENDS_WILDCARD).unwrap_or(signature);

    if let Some(element) = stripped.strip_suffix(ARRAY_MARKER) {
        return element.to_string();
    }

    if stripped.ends_with('>')
        && let (Some(open), Some(close)) = (stripped.find('<'), stripped.rfind('>'))
        && let Some(candidate) = stripped.get(open.saturating_add(1)..close)
    {
        if !candidate.contains('<')
            && let Some((first, _rest)) = candidate.split_once(',')
        {
            return first.to_string();
        }
        return candidate.to_string();
    }

    return stripped.to_string();
}

/// Recursive-descent state over the signature text.
struct Cursor<'a> {
    chars: Vec<char>,
    input: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        return self.chars.get(self.pos).copied();
    }

    fn bump(&mut self) {
        self.pos = self.pos.saturating_add(1);
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn fail(&self, reason: &str) -> Error {
        return Error::InvalidSignature {
            input: self.input.to_string(),
            reason: format!("{reason} at character {}", self.pos),
        };
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        self.skip_whitespace();
        if self.peek() != Some(expected) {
            return Err(self.fail(&format!("expected `{expected}`")));
        }
        self.bump();
        return Ok(());
    }

    /// Consume `keyword` if it is the next word.
    fn keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos.saturating_add(keyword.chars().count());
        let Some(window) = self.chars.get(self.pos..end) else {
            return false;
        };
        let boundary = self.chars.get(end).is_none_or(|c| return !is_name_char(*c));
        if boundary && window.iter().copied().eq(keyword.chars()) {
            self.pos = end;
            return true;
        }
        return false;
    }

    fn name(&mut self) -> String {
        self.skip_whitespace();
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| return is_name_char(*c)) {
            name.push(c);
            self.bump();
        }
        return name;
    }

    fn signature(&mut self) -> Result<TypeSignature, Error> {
        if self.keyword(CAPTURE_KEYWORD) {
            let inner = self.signature()?;
            return Ok(TypeSignature::Capture(Box::new(inner)));
        }

        self.skip_whitespace();
        if self.peek() == Some('?') {
            self.bump();
            let upper = if self.keyword("extends") {
                true
            } else if self.keyword("super") {
                false
            } else {
                return Ok(TypeSignature::Wildcard { bound: None, upper: true });
            };
            let bound = self.signature()?;
            return Ok(TypeSignature::Wildcard { bound: Some(Box::new(bound)), upper });
        }

        let mut signature = self.base()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some('[') {
                break;
            }
            self.bump();
            self.expect(']')?;
            signature = TypeSignature::Array(Box::new(signature));
        }
        return Ok(signature);
    }

    fn base(&mut self) -> Result<TypeSignature, Error> {
        let name = self.name();
        if name.is_empty() {
            return Err(self.fail("expected a type name"));
        }
        if is_primitive(&name) {
            return Ok(TypeSignature::Primitive(name));
        }

        let mut arguments = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('<') {
            self.bump();
            self.skip_whitespace();
            if self.peek() == Some('>') {
                // Diamond: arguments are inferred elsewhere.
                self.bump();
                return Ok(TypeSignature::Class { arguments, name });
            }
            loop {
                arguments.push(self.signature()?);
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => self.bump(),
                    Some('>') => {
                        self.bump();
                        break;
                    },
                    _ => return Err(self.fail("unbalanced type arguments")),
                }
            }
        }
        return Ok(TypeSignature::Class { arguments, name });
    }
}

/// Characters allowed in a qualified identifier.
fn is_name_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_' || c == '$' || c == '.';
}
