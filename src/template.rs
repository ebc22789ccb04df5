//! Template definitions, the built-in postfix set, and pattern parsing.
//!
//! Pattern syntax: `$$` is a literal `$`; `${name}`, `${name:type}` and
//! `${name:type(p1, p2)}` are placeholders; `${}` is an empty placeholder.
//! A placeholder without a type has its name as type. Occurrences sharing a
//! name are one placeholder.
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Context id of postfix templates.
pub const POSTFIX_CONTEXT: &str = "postfix";

/// A named, parameterized text pattern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    /// Context-type tag; only `postfix` templates are offered after a dot.
    #[serde(default = "postfix_context")]
    pub context: String,
    /// Human-readable description shown as completion detail.
    pub description: String,
    /// Name the user types after the dot.
    pub name: String,
    /// Pattern text.
    pub pattern: String,
}

fn postfix_context() -> String {
    return POSTFIX_CONTEXT.to_string();
}

impl Template {
    fn builtin(name: &str, description: &str, pattern: &str) -> Self {
        return Self {
            context: postfix_context(),
            description: description.to_string(),
            name: name.to_string(),
            pattern: pattern.to_string(),
        };
    }
}

/// Ordered, immutable set of templates.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// The built-in postfix templates.
    pub fn builtin() -> Self {
        let templates = vec![
            Template::builtin("cast", "Casts the expression to a new type", "(($${1})${inner_expression})$${0}"),
            Template::builtin("else", "Creates a negated if statement", "if (!${i:inner_expression(boolean)}) {\n\t$${0}\n}"),
            Template::builtin(
                "field",
                "Assigns the expression to a new field",
                "$${1:${n:newField(i)}} = ${i:inner_expression(java.lang.Object)};$${0}",
            ),
            Template::builtin(
                "for",
                "Creates a for statement",
                "for (${type:newActualType(i)} $${1:${n:newName(i)}} : ${i:inner_expression(java.util.Collection,array)}) {\n\t$${0}\n}",
            ),
            Template::builtin(
                "fori",
                "Creates a for statement which iterates over an array",
                "for (int $${1:${index}} = 0; $${1:${index}} < ${i:inner_expression(array)}.length; $${1:${index}}++) {\n\t$${0}\n}",
            ),
            Template::builtin(
                "forr",
                "Creates a for statement which iterates over an array in reverse order",
                "for (int $${1:${index}} = ${i:inner_expression(array)}.length - 1; $${1:${index}} >= 0; $${1:${index}}--) {\n\t$${0}\n}",
            ),
            Template::builtin("if", "Creates a if statement", "if (${i:inner_expression(boolean)}) {\n\t$${0}\n}"),
            Template::builtin(
                "nnull",
                "Creates an if statement and checks if the expression does not resolve to null",
                "if (${i:inner_expression(java.lang.Object,array)} != null) {\n\t$${0}\n}",
            ),
            Template::builtin(
                "null",
                "Creates an if statement which checks if expression resolves to null",
                "if (${i:inner_expression(java.lang.Object,array)} == null) {\n\t$${0}\n}",
            ),
            Template::builtin(
                "sysout",
                "Sends the affected object to a System.out.println(..) call",
                "System.out.println(${i:inner_expression(java.lang.Object)}${});$${0}",
            ),
            Template::builtin("throw", "Throws the given Exception", "throw ${true:inner_expression(java.lang.Throwable)};"),
            Template::builtin(
                "var",
                "Creates a new variable",
                "${field:newType(inner_expression)} $${1:${var:newName(inner_expression)}} = ${inner_expression};$${0}",
            ),
            Template::builtin("while", "Creates a while loop", "while (${i:inner_expression(boolean)}) {\n\t$${0}\n}"),
        ];
        return Self { templates };
    }

    /// Drop templates by name.
    #[must_use]
    pub fn without(mut self, disabled: &[String]) -> Self {
        self.templates.retain(|t| return !disabled.contains(&t.name));
        return self;
    }

    /// Append templates after the existing ones.
    #[must_use]
    pub fn with(mut self, extra: &[Template]) -> Self {
        self.templates.extend_from_slice(extra);
        return self;
    }

    /// Every template, in registration order.
    pub fn templates(&self) -> &[Template] {
        return &self.templates;
    }
}

// ── Pattern parsing ──────────────────────────────────────────────────────

/// One distinct placeholder of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Resolver kind, e.g. `inner_expression` or `newName`.
    pub kind: String,
    /// Placeholder name.
    pub name: String,
    /// Parameters given in parentheses.
    pub params: Vec<String>,
}

/// A piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text with `$$` already unescaped.
    Text(String),
    /// An occurrence of the placeholder at this index of `TemplatePattern::variables`.
    Variable(usize),
}

/// A pattern split into literal text and placeholder occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePattern {
    /// Text and placeholder occurrences in order.
    pub segments: Vec<Segment>,
    /// Distinct placeholders in order of first appearance.
    pub variables: Vec<VariableSpec>,
}

/// Text produced by substituting placeholder values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPattern {
    /// Byte offsets of every occurrence, per placeholder.
    pub offsets: Vec<Vec<usize>>,
    /// Final text.
    pub text: String,
}

impl TemplatePattern {
    /// Substitute `values` (one per placeholder, by index).
    pub fn render(&self, values: &[String]) -> RenderedPattern {
        let mut text = String::new();
        let mut offsets = vec![Vec::new(); self.variables.len()];
        for segment in &self.segments {
            match segment {
                Segment::Text(literal) => text.push_str(literal),
                Segment::Variable(index) => {
                    if let Some(slot) = offsets.get_mut(*index) {
                        slot.push(text.len());
                    }
                    text.push_str(values.get(*index).map_or("", String::as_str));
                },
            }
        }
        return RenderedPattern { offsets, text };
    }
}

/// Parse a pattern into segments and distinct placeholders.
///
/// # Errors
///
/// Returns `TemplateError::MalformedPattern` for a lone `$`, an unterminated
/// `${`, an invalid placeholder body, or a placeholder declared twice with
/// different types.
pub fn parse_pattern(pattern: &str) -> Result<TemplatePattern, TemplateError> {
    let mut segments = Vec::new();
    let mut variables: Vec<VariableSpec> = Vec::new();
    let mut text = String::new();
    let mut position = 0;

    while let Some(found) = pattern.get(position..).and_then(|rest| return rest.find('$')) {
        let dollar = position.saturating_add(found);
        text.push_str(pattern.get(position..dollar).unwrap_or(""));
        let after = pattern.get(dollar.saturating_add(1)..).unwrap_or("");

        if after.starts_with('$') {
            text.push('$');
            position = dollar.saturating_add(2);
            continue;
        }
        if !after.starts_with('{') {
            return Err(malformed(dollar, "`$` must start a placeholder or be escaped as `$$`"));
        }
        let Some(close) = after.find('}') else {
            return Err(malformed(dollar, "unterminated placeholder"));
        };
        let body = after.get(1..close).unwrap_or("");
        let (spec, explicit) = parse_variable(body, dollar)?;

        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        let index = match variables.iter().position(|v| return v.name == spec.name) {
            Some(existing) => {
                if explicit && let Some(declared) = variables.get_mut(existing) {
                    if declared.kind != declared.name && (declared.kind != spec.kind || declared.params != spec.params) {
                        return Err(malformed(dollar, &format!("placeholder `{}` declared with different types", spec.name)));
                    }
                    *declared = spec;
                }
                existing
            },
            None => {
                variables.push(spec);
                variables.len().saturating_sub(1)
            },
        };
        segments.push(Segment::Variable(index));
        position = dollar.saturating_add(close).saturating_add(2);
    }
    text.push_str(pattern.get(position..).unwrap_or(""));
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    return Ok(TemplatePattern { segments, variables });
}

/// Parse `name[:type[(params)]]`; the flag tells whether a type was written.
fn parse_variable(body: &str, position: usize) -> Result<(VariableSpec, bool), TemplateError> {
    let (name, rest) = match body.split_once(':') {
        Some((name, rest)) => (name.trim(), Some(rest.trim())),
        None => (body.trim(), None),
    };
    if !name.chars().all(|c| return c.is_alphanumeric() || c == '_') {
        return Err(malformed(position, &format!("invalid placeholder name `{name}`")));
    }
    let Some(rest) = rest else {
        return Ok((VariableSpec { kind: name.to_string(), name: name.to_string(), params: Vec::new() }, false));
    };

    let (kind, params) = match rest.split_once('(') {
        Some((kind, args)) => {
            let Some(args) = args.trim_end().strip_suffix(')') else {
                return Err(malformed(position, "unterminated parameter list"));
            };
            let params = args
                .split(',')
                .map(|p| return p.trim().trim_matches('\'').to_string())
                .filter(|p| return !p.is_empty())
                .collect();
            (kind.trim(), params)
        },
        None => (rest, Vec::new()),
    };
    let valid_kind = kind.chars().next().is_some_and(|c| return c.is_alphanumeric() || c == '_')
        && kind.chars().all(|c| return c.is_alphanumeric() || c == '_' || c == '.');
    if !valid_kind {
        return Err(malformed(position, &format!("invalid placeholder type `{kind}`")));
    }
    return Ok((VariableSpec { kind: kind.to_string(), name: name.to_string(), params }, true));
}

fn malformed(position: usize, reason: &str) -> TemplateError {
    return TemplateError::MalformedPattern { position, reason: reason.to_string() };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, kind: &str, params: &[&str]) -> VariableSpec {
        return VariableSpec {
            kind: kind.to_string(),
            name: name.to_string(),
            params: params.iter().map(ToString::to_string).collect(),
        };
    }

    #[test]
    fn parses_typed_placeholders_with_params() {
        let pattern = parse_pattern("if (${i:inner_expression(java.lang.Object, array)} != null) {}").unwrap();
        assert_eq!(pattern.variables, vec![spec("i", "inner_expression", &["java.lang.Object", "array"])]);
        assert_eq!(pattern.segments.len(), 3);
    }

    #[test]
    fn escaped_dollars_wrap_nested_placeholders() {
        let pattern = parse_pattern("$${1:${n:newName(i)}} = ${i:inner_expression(java.lang.Object)};$${0}").unwrap();
        let names: Vec<&str> = pattern.variables.iter().map(|v| return v.name.as_str()).collect();
        assert_eq!(names, vec!["n", "i"]);
        let rendered = pattern.render(&["a2".to_string(), "a".to_string()]);
        assert_eq!(rendered.text, "${1:a2} = a;${0}");
        assert_eq!(rendered.offsets, vec![vec![4], vec![10]]);
    }

    #[test]
    fn repeated_names_share_one_placeholder() {
        let pattern = parse_pattern("${index} < ${i:inner_expression(array)}.length; ${index}++").unwrap();
        assert_eq!(pattern.variables, vec![spec("index", "index", &[]), spec("i", "inner_expression", &["array"])]);
        let rendered = pattern.render(&["k".to_string(), "xs".to_string()]);
        assert_eq!(rendered.text, "k < xs.length; k++");
        assert_eq!(rendered.offsets[0], vec![0, 15]);
    }

    #[test]
    fn untyped_occurrence_reuses_typed_declaration() {
        let pattern = parse_pattern("${i:inner_expression(boolean)} ${i}").unwrap();
        assert_eq!(pattern.variables, vec![spec("i", "inner_expression", &["boolean"])]);
    }

    #[test]
    fn empty_placeholder_is_allowed() {
        let pattern = parse_pattern("println(${i:inner_expression(java.lang.Object)}${});").unwrap();
        assert_eq!(pattern.variables[1], spec("", "", &[]));
        let rendered = pattern.render(&["x".to_string(), String::new()]);
        assert_eq!(rendered.text, "println(x);");
    }

    #[test]
    fn lone_dollar_is_malformed() {
        let err = parse_pattern("cost $5").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedPattern { position: 5, .. }));
    }

    #[test]
    fn unterminated_placeholder_is_malformed() {
        assert!(parse_pattern("${i:inner_expression(").is_err());
    }

    #[test]
    fn conflicting_types_are_malformed() {
        assert!(parse_pattern("${x:newName(i)} ${x:newType(i)}").is_err());
    }

    #[test]
    fn every_builtin_pattern_parses() {
        for template in TemplateRegistry::builtin().templates() {
            assert!(parse_pattern(&template.pattern).is_ok(), "{} failed to parse", template.name);
            assert_eq!(template.context, POSTFIX_CONTEXT);
        }
    }

    #[test]
    fn registry_drops_and_appends() {
        let extra = Template {
            context: POSTFIX_CONTEXT.to_string(),
            description: "Wraps in Optional".to_string(),
            name: "opt".to_string(),
            pattern: "java.util.Optional.ofNullable(${i:inner_expression(java.lang.Object)})".to_string(),
        };
        let registry = TemplateRegistry::builtin().without(&["sysout".to_string()]).with(&[extra]);
        let names: Vec<&str> = registry.templates().iter().map(|t| return t.name.as_str()).collect();
        assert!(!names.contains(&"sysout"));
        assert_eq!(names.last(), Some(&"opt"));
    }
}
