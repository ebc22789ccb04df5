//! Template resolution driver.
//!
//! Filters the registry down to the templates applicable at the cursor,
//! resolves each template's placeholders in dependency order, and assembles
//! the insert text together with the edits it needs elsewhere in the file.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::context::{NO_VALUE, PostfixContext};
use crate::dependency::VariableId;
use crate::error::{DependencyError, Error, TemplateError};
use crate::imports::{ImportRewriter, shorten_qualified_names};
use crate::naming;
use crate::signature::{ROOT_TYPE, project_element_type};
use crate::snippet;
use crate::template::{Template, TemplateRegistry, parse_pattern};
use crate::types::{CompletionItem, EditOutput, LineIndex, PlaceholderOffset, PlaceholderOutput, TextEdit};
use crate::variables::{Resolution, VariableArena};

/// Sort key placing snippets after every other completion.
const SNIPPET_SORT_TEXT: &str = "999999999";

/// Completion item kind reported for templates.
const SNIPPET_KIND: &str = "snippet";

/// Side-effect edits registered while evaluating templates, per template name.
#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    edits: BTreeMap<String, Vec<TextEdit>>,
}

impl PendingEdits {
    /// Append an edit for `template`.
    pub fn register(&mut self, template: &str, edit: TextEdit) {
        self.edits.entry(template.to_string()).or_default().push(edit);
    }

    /// Remove and return every edit registered for `template`, in order.
    pub fn take(&mut self, template: &str) -> Vec<TextEdit> {
        return self.edits.remove(template).unwrap_or_default();
    }
}

/// A template with every placeholder resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Edits elsewhere in the document (imports, new fields), in registration order.
    pub edits: Vec<TextEdit>,
    /// Placeholder values and the offsets they ended up at.
    pub placeholders: Vec<PlaceholderOutput>,
    /// Final snippet text.
    pub text: String,
}

/// Why one template evaluation stopped.
#[derive(Debug, thiserror::Error)]
enum EvaluationError {
    /// The placeholder graph is malformed; never recovered.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    /// The template cannot be evaluated here; only this template is skipped.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Resolve every applicable template at the context's cursor.
///
/// With `lazy`, placeholders are not resolved and the insert text is the
/// snippet form of the raw pattern.
///
/// # Errors
///
/// Returns `Error::Dependency` when a template's placeholders form a cycle or
/// give a placeholder two masters.
pub fn complete(context: &PostfixContext<'_>, registry: &TemplateRegistry, lazy: bool) -> Result<Vec<CompletionItem>, Error> {
    let lines = LineIndex::new(&context.tree().source);
    let mut pending = PendingEdits::default();
    let mut items = Vec::new();

    for template in registry.templates() {
        if !context.can_evaluate(template) {
            debug!(template = %template.name, "not applicable");
            continue;
        }
        let item = if lazy { lazy_item(template, context, &lines) } else { resolved_item(template, context, &lines, &mut pending)? };
        match item {
            Some(item) => items.push(item),
            None => debug!(template = %template.name, "template skipped"),
        }
    }
    return Ok(items);
}

/// Resolve one template's placeholders and render it.
///
/// Returns `Ok(None)` when the template is blank or cannot be evaluated at
/// this position.
///
/// # Errors
///
/// Returns `Error::Dependency` for a malformed placeholder graph.
pub fn resolve_template(
    template: &Template,
    context: &PostfixContext<'_>,
    pending: &mut PendingEdits,
) -> Result<Option<Evaluation>, Error> {
    return match evaluate(template, context, pending) {
        Ok(evaluation) => Ok(evaluation),
        Err(EvaluationError::Template(err)) => {
            warn!(template = %template.name, %err, "template discarded");
            Ok(None)
        },
        Err(EvaluationError::Dependency(source)) => Err(Error::Dependency { source, template: template.name.clone() }),
    };
}

fn resolved_item(
    template: &Template,
    context: &PostfixContext<'_>,
    lines: &LineIndex,
    pending: &mut PendingEdits,
) -> Result<Option<CompletionItem>, Error> {
    let Some(evaluation) = resolve_template(template, context, pending)? else {
        return Ok(None);
    };
    let Some(replace) = replace_range(template, context) else {
        return Ok(None);
    };
    let mut additional_edits = vec![EditOutput { new_text: String::new(), range: lines.range(&replace) }];
    additional_edits.extend(evaluation.edits.iter().map(|edit| {
        return EditOutput { new_text: edit.new_text.clone(), range: lines.range(&edit.range) };
    }));
    return Ok(Some(CompletionItem {
        additional_edits,
        detail: template.description.clone(),
        documentation: snippet::beautify(&evaluation.text),
        insert_text: evaluation.text,
        kind: SNIPPET_KIND,
        label: template.name.clone(),
        placeholders: evaluation.placeholders,
        replace_range: lines.range(&replace),
        sort_text: SNIPPET_SORT_TEXT,
    }));
}

fn lazy_item(template: &Template, context: &PostfixContext<'_>, lines: &LineIndex) -> Option<CompletionItem> {
    if template.pattern.trim().is_empty() {
        return None;
    }
    let replace = replace_range(template, context)?;
    let insert_text = snippet::template_to_snippet(&template.pattern);
    return Some(CompletionItem {
        additional_edits: vec![EditOutput { new_text: String::new(), range: lines.range(&replace) }],
        detail: template.description.clone(),
        documentation: snippet::beautify(&insert_text),
        insert_text,
        kind: SNIPPET_KIND,
        label: template.name.clone(),
        placeholders: Vec::new(),
        replace_range: lines.range(&replace),
        sort_text: SNIPPET_SORT_TEXT,
    });
}

/// Span the snippet replaces; `None` (with a warning) when it is not in the document.
fn replace_range(template: &Template, context: &PostfixContext<'_>) -> Option<std::ops::Range<usize>> {
    return match context.replace_range() {
        Ok(range) => Some(range),
        Err(err) => {
            warn!(template = %template.name, %err, "template discarded");
            None
        },
    };
}

fn evaluate(
    template: &Template,
    context: &PostfixContext<'_>,
    pending: &mut PendingEdits,
) -> Result<Option<Evaluation>, EvaluationError> {
    if template.pattern.trim().is_empty() {
        return Ok(None);
    }
    let pattern = parse_pattern(&template.pattern)?;
    let mut evaluator = Evaluator {
        arena: VariableArena::new(&pattern.variables),
        attempted: HashSet::new(),
        context,
        imports: ImportRewriter::new(context.unit()),
        pending,
        taken: context.visible_names(),
        template: &template.name,
    };
    for id in evaluator.arena.ids() {
        evaluator.resolve(id)?;
    }

    let rendered = pattern.render(&evaluator.arena.values());
    let placeholders = evaluator
        .arena
        .ids()
        .filter_map(|id| {
            let variable = evaluator.arena.get(id)?;
            let resolution = evaluator.arena.resolution(id);
            let buffer = rendered.offsets.get(id.0).into_iter().flatten().map(|o| return PlaceholderOffset::Buffer(*o));
            let document = variable.document_offsets.iter().map(|o| return PlaceholderOffset::Document(*o));
            let slaves = evaluator
                .arena
                .graph()
                .slaves_of(id)
                .filter_map(|slave| return evaluator.arena.get(slave).map(|v| return v.name.clone()))
                .collect();
            return Some(PlaceholderOutput {
                name: variable.name.clone(),
                offsets: buffer.chain(document).collect(),
                slaves,
                unambiguous: resolution.is_some_and(|r| return r.unambiguous),
                value: resolution.map_or_else(|| return variable.name.clone(), |r| return r.value.clone()),
            });
        })
        .collect();
    let edits = evaluator.pending.take(&template.name);
    return Ok(Some(Evaluation { edits, placeholders, text: rendered.text }));
}

/// Placeholder resolution state of one template evaluation.
struct Evaluator<'e, 'a> {
    arena: VariableArena,
    attempted: HashSet<VariableId>,
    context: &'e PostfixContext<'a>,
    imports: ImportRewriter<'e>,
    pending: &'e mut PendingEdits,
    taken: BTreeSet<String>,
    template: &'e str,
}

impl Evaluator<'_, '_> {
    /// Resolve `id`, resolving the placeholder it references first.
    fn resolve(&mut self, id: VariableId) -> Result<(), EvaluationError> {
        if self.arena.is_resolved(id) || !self.attempted.insert(id) {
            return Ok(());
        }
        let Some(variable) = self.arena.get(id) else {
            return Ok(());
        };
        let kind = variable.kind.clone();
        let params = variable.params.clone();

        let resolution = match kind.as_str() {
            "inner_expression" => Some(self.inner_expression(&params)?),
            "newType" => self.master_type(id, params.first())?.map(|ty| return self.shortened(&ty)),
            "newActualType" => self.master_type(id, params.first())?.map(|ty| return self.shortened(&element_type(&ty))),
            "newName" => self.master_type(id, params.first())?.map(|ty| return self.new_name(&ty)),
            "newField" => match self.master_type(id, params.first())? {
                Some(ty) => self.new_field(id, &ty),
                None => None,
            },
            "index" => Some(self.index()),
            "cursor" => Some(Resolution { type_name: None, unambiguous: true, value: String::new() }),
            "dollar" => Some(Resolution { type_name: None, unambiguous: true, value: "$".to_string() }),
            _ => None,
        };
        for edit in self.imports.take_edits() {
            self.pending.register(self.template, edit);
        }

        let resolution = resolution.unwrap_or_else(|| {
            debug!(template = self.template, kind = %kind, "placeholder left to the catch-all");
            let name = self.arena.get(id).map(|v| return v.name.clone()).unwrap_or_default();
            return Resolution { type_name: None, unambiguous: false, value: name };
        });
        self.arena.resolve(id, resolution);
        return Ok(());
    }

    fn inner_expression(&self, params: &[String]) -> Result<Resolution, TemplateError> {
        if params.iter().any(|p| return p == NO_VALUE) {
            return Ok(Resolution { type_name: None, unambiguous: true, value: String::new() });
        }
        return Ok(Resolution {
            type_name: Some(self.context.inner_type()),
            unambiguous: true,
            value: self.context.affected_text()?.to_string(),
        });
    }

    /// Qualified type a placeholder derives from.
    ///
    /// With no reference this is the root type. A reference links `id` as a
    /// slave of the referenced placeholder; `None` means that placeholder did
    /// not resolve to a typed value.
    fn master_type(&mut self, id: VariableId, reference: Option<&String>) -> Result<Option<String>, EvaluationError> {
        let Some(master) = reference.and_then(|name| return self.arena.find(name)) else {
            return Ok(Some(ROOT_TYPE.to_string()));
        };
        self.arena.add_dependency(master, id)?;
        self.resolve(master)?;
        return Ok(self.arena.resolution(master).and_then(|r| return r.type_name.clone()));
    }

    fn shortened(&mut self, qualified: &str) -> Resolution {
        return Resolution {
            type_name: Some(qualified.to_string()),
            unambiguous: true,
            value: shorten_qualified_names(qualified, &mut self.imports),
        };
    }

    fn new_name(&mut self, type_name: &str) -> Resolution {
        let name = self.fresh_name(type_name);
        return Resolution { type_name: Some(type_name.to_string()), unambiguous: false, value: name };
    }

    fn fresh_name(&mut self, type_name: &str) -> String {
        let base = match self.context.selected() {
            Some(node) => naming::base_name(self.context.tree(), node, type_name),
            None => naming::base_name_of_type(type_name),
        };
        let name = naming::unique_name(&base, &self.taken);
        self.taken.insert(name.clone());
        return name;
    }

    fn index(&mut self) -> Resolution {
        let derived = self.context.selected().map(|node| {
            return naming::base_name(self.context.tree(), node, &self.context.inner_type());
        });
        let name = naming::index_name(derived.as_deref(), &self.taken);
        self.taken.insert(name.clone());
        return Resolution { type_name: Some("int".to_string()), unambiguous: false, value: name };
    }

    /// Declare a private field for the value and point the placeholder at its name.
    fn new_field(&mut self, id: VariableId, type_name: &str) -> Option<Resolution> {
        let insertion = self.context.field_insertion()?;
        let short_type = shorten_qualified_names(type_name, &mut self.imports);
        for edit in self.imports.take_edits() {
            self.pending.register(self.template, edit);
        }
        let name = self.fresh_name(type_name);
        let modifiers = if insertion.is_static { "private static" } else { "private" };
        let head = format!("\n{}{modifiers} {short_type} ", insertion.indent);
        self.arena.register_document_offset(id, insertion.offset.saturating_add(head.len()));
        self.pending.register(self.template, TextEdit::insert(insertion.offset, format!("{head}{name};")));
        return Some(Resolution { type_name: Some(type_name.to_string()), unambiguous: false, value: name });
    }
}

/// Element type of an iterable, with wildcards resolved to something declarable.
/// Types that project to themselves (raw or non-generic) iterate as the root type.
fn element_type(iterable: &str) -> String {
    let projected = project_element_type(iterable);
    if projected == iterable.strip_prefix("? extends ").unwrap_or(iterable) {
        return ROOT_TYPE.to_string();
    }
    if let Some(bound) = projected.strip_prefix("? extends ") {
        return bound.to_string();
    }
    if projected == "?" || projected.starts_with("? super ") {
        return ROOT_TYPE.to_string();
    }
    return projected;
}
