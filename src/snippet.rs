//! Text-level conversions between template patterns and editor snippets.
use std::sync::LazyLock;

use regex::Regex;

/// `$${N:${var}rest}`, a tab-stop whose default is a nested placeholder.
static NESTED_TAB_STOP: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\$\$\{(\d):\$\{(.*?)\}(.*?)\}").expect("valid regex"));

/// `${N|a,b|}`, a choice tab-stop.
static CHOICE_TAB_STOP: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"\$\{\d\|(.*?),.*?\}").expect("valid regex"));

/// `${N}` or `${N:text}`.
static TAB_STOP: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"\$\{\d:?(.*?)\}").expect("valid regex"));

/// Snippet form of an unevaluated pattern: nested tab-stop defaults are
/// flattened to their placeholder names and `$$` becomes `$`.
pub fn template_to_snippet(pattern: &str) -> String {
    let flattened = NESTED_TAB_STOP.replace_all(pattern, "$${$1:$2$3}");
    return flattened.replace("$$", "$");
}

/// Snippet text with tab-stops replaced by their defaults, for display.
pub fn beautify(snippet: &str) -> String {
    let choices = CHOICE_TAB_STOP.replace_all(snippet, "$1");
    return TAB_STOP.replace_all(&choices, "$1").into_owned();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateRegistry;

    fn pattern(name: &str) -> String {
        let registry = TemplateRegistry::builtin();
        return registry.templates().iter().find(|t| return t.name == name).unwrap().pattern.clone();
    }

    #[test]
    fn lazy_cast_keeps_the_placeholder_name() {
        assert_eq!(template_to_snippet(&pattern("cast")), "((${1})${inner_expression})${0}");
    }

    #[test]
    fn lazy_var_flattens_nested_defaults() {
        assert_eq!(
            template_to_snippet(&pattern("var")),
            "${field:newType(inner_expression)} ${1:var:newName(inner_expression)} = ${inner_expression};${0}"
        );
    }

    #[test]
    fn beautify_strips_tab_stops() {
        assert_eq!(beautify("for (String ${1:a2} : a) {\n\t${0}\n}"), "for (String a2 : a) {\n\t\n}");
        assert_eq!(beautify("((${1})a)${0}"), "(()a)");
        assert_eq!(beautify("pick ${1|one,two|}"), "pick one");
    }
}
