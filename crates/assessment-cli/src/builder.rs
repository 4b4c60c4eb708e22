//! Interactive editing shell over an [`AssessmentBuilder`].

use std::str::FromStr;

use assessment_runtime::{AssessmentBuilder, BuilderError, DraftStore, SaveStatus};
use assessment_spec::{
    Condition, Operator, QuestionPatch, QuestionSpec, QuestionType, SectionPatch, TemplateKind,
    ValidationErrors, ValidationRules, build_render_payload, render_text,
};

use crate::{
    CliResult, Context, mark_required, prompt_bool, prompt_line, prompt_non_empty,
    prompt_optional, prompt_optional_f64, prompt_optional_usize, prompt_setting, split_list,
};

const HELP: &str = "\
Commands (numbers are 1-based):
  show                 list sections and the active section's questions
  select N             make section N active
  add-section          append a section and make it active
  rename               change the active section's title
  describe             change the active section's description
  delete-section       delete the active section
  add TYPE             add a question (single_choice, multi_choice, short_text,
                       long_text, numeric, file_upload)
  edit N               edit question N
  delete N             delete question N
  move FROM TO         move a question within the active section
  conditions N         manage question N's display conditions
  template SLUG        replace every section with a role template
  preview              render the form with cached responses
  save                 save to the assessment API
  quit                 leave the editor (the local draft is kept)";

/// One command typed at the editor prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Help,
    Show,
    Select(usize),
    AddSection,
    Rename,
    Describe,
    DeleteSection,
    AddQuestion(QuestionType),
    EditQuestion(usize),
    DeleteQuestion(usize),
    Move { from: usize, to: usize },
    Conditions(usize),
    Template(TemplateKind),
    Preview,
    Save,
    Quit,
}

impl FromStr for EditAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut words = value.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let args = words.collect::<Vec<_>>();
        let action = match (command.as_str(), args.as_slice()) {
            ("help" | "?", []) => EditAction::Help,
            ("show" | "ls", []) => EditAction::Show,
            ("select", [n]) => EditAction::Select(position(n)?),
            ("add-section", []) => EditAction::AddSection,
            ("rename", []) => EditAction::Rename,
            ("describe", []) => EditAction::Describe,
            ("delete-section", []) => EditAction::DeleteSection,
            ("add", [kind]) => EditAction::AddQuestion(QuestionType::from_str(kind)?),
            ("edit", [n]) => EditAction::EditQuestion(position(n)?),
            ("delete", [n]) => EditAction::DeleteQuestion(position(n)?),
            ("move", [from, to]) => EditAction::Move {
                from: position(from)?,
                to: position(to)?,
            },
            ("conditions", [n]) => EditAction::Conditions(position(n)?),
            ("template", [slug]) => {
                let kind = TemplateKind::from_str(slug).map_err(|err| err.to_string())?;
                EditAction::Template(kind)
            }
            ("preview", []) => EditAction::Preview,
            ("save", []) => EditAction::Save,
            ("quit" | "exit", []) => EditAction::Quit,
            _ => return Err(format!("unknown command '{}'; type help", value.trim())),
        };
        Ok(action)
    }
}

/// Sub-commands of the condition editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionAction {
    Add,
    Edit(usize),
    Remove(usize),
    Done,
}

impl FromStr for ConditionAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let words = value.split_whitespace().collect::<Vec<_>>();
        match words.as_slice() {
            ["add"] => Ok(ConditionAction::Add),
            ["edit", n] => Ok(ConditionAction::Edit(position(n)?)),
            ["remove", n] => Ok(ConditionAction::Remove(position(n)?)),
            [] | ["done"] => Ok(ConditionAction::Done),
            _ => Err(format!("unknown condition command '{}'", value.trim())),
        }
    }
}

// 1-based on screen, 0-based in the builder.
fn position(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .ok()
        .and_then(|value| value.checked_sub(1))
        .ok_or_else(|| format!("'{}' is not a position (1, 2, ...)", raw))
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run_edit(mut builder: AssessmentBuilder, ctx: &Context) -> CliResult<()> {
    println!("Editing assessment for job {}", builder.job_id());
    print_overview(&builder);
    loop {
        let line = prompt_line("Action (help for commands)", None)?;
        if line.trim().is_empty() {
            continue;
        }
        let action = match line.parse::<EditAction>() {
            Ok(action) => action,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        if let Flow::Quit = apply(&mut builder, action, ctx).await? {
            break;
        }
    }
    println!(
        "Draft kept at {} (save status: {})",
        ctx.drafts.sections_path(builder.job_id()).display(),
        builder.status().as_str()
    );
    Ok(())
}

async fn apply(
    builder: &mut AssessmentBuilder,
    action: EditAction,
    ctx: &Context,
) -> CliResult<Flow> {
    let Some(section_id) = builder.active_section().map(|section| section.id.clone()) else {
        return Err("the assessment has no sections".into());
    };
    match action {
        EditAction::Help => {
            println!("{}", HELP);
            return Ok(Flow::Continue);
        }
        EditAction::Show => {}
        EditAction::Select(index) => match builder.sections().get(index) {
            Some(section) => {
                let id = section.id.clone();
                report(builder.select_section(&id));
            }
            None => println!("There is no section {}.", index + 1),
        },
        EditAction::AddSection => {
            builder.add_section();
        }
        EditAction::Rename => {
            let current = builder.active_section().map(|section| section.title.clone());
            let title = prompt_non_empty(&mark_required("Section title"), current.as_deref())?;
            report(builder.update_section(&section_id, SectionPatch::title(title)));
        }
        EditAction::Describe => {
            let description = prompt_optional("Section description (blank to clear)")?;
            report(builder.update_section(
                &section_id,
                SectionPatch::description(description.unwrap_or_default()),
            ));
        }
        EditAction::DeleteSection => {
            report(builder.delete_section(&section_id));
        }
        EditAction::AddQuestion(kind) => {
            if let Some(question_id) = report(builder.add_question(&section_id, kind)) {
                edit_question(builder, &section_id, &question_id)?;
            }
        }
        EditAction::EditQuestion(index) => {
            if let Some(question_id) = question_at(builder, index) {
                edit_question(builder, &section_id, &question_id)?;
            }
        }
        EditAction::DeleteQuestion(index) => {
            if let Some(question_id) = question_at(builder, index) {
                report(builder.delete_question(&section_id, &question_id));
            }
        }
        EditAction::Move { from, to } => {
            report(builder.move_question(&section_id, from, to));
        }
        EditAction::Conditions(index) => {
            if let Some(question_id) = question_at(builder, index) {
                edit_conditions(builder, &section_id, &question_id)?;
            }
        }
        EditAction::Template(kind) => {
            let prompt = format!("Replace every section with the '{}' template?", kind.title());
            if prompt_bool(&prompt, false)? {
                builder.apply_template(kind);
            }
        }
        EditAction::Preview => {
            let responses = ctx
                .drafts
                .load_responses(builder.job_id())?
                .unwrap_or_default();
            let payload =
                build_render_payload(&builder.form(), &responses, &ValidationErrors::new());
            println!("{}", render_text(&payload));
            return Ok(Flow::Continue);
        }
        EditAction::Save => {
            if let Err(err) = ctx.require_online("save") {
                println!("{}", err);
                return Ok(Flow::Continue);
            }
            match builder.save().await {
                Ok(_) => println!("Saved."),
                Err(err) if err.is_transient() => {
                    println!("Save failed: {}. Your draft is kept; try save again.", err)
                }
                Err(err) => println!("Save failed: {}", err),
            }
            return Ok(Flow::Continue);
        }
        EditAction::Quit => {
            if ctx.online && builder.status() != &SaveStatus::Saved {
                println!("Unsaved changes stay in the local draft only.");
            }
            return Ok(Flow::Quit);
        }
    }
    print_overview(builder);
    Ok(Flow::Continue)
}

fn report<T>(result: Result<T, BuilderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            println!("Cannot do that: {}", err);
            None
        }
    }
}

fn question_at(builder: &AssessmentBuilder, index: usize) -> Option<String> {
    let question = builder
        .active_section()
        .and_then(|section| section.questions.get(index))
        .map(|question| question.id.clone());
    if question.is_none() {
        println!("There is no question {} in this section.", index + 1);
    }
    question
}

fn current_question(
    builder: &AssessmentBuilder,
    section_id: &str,
    question_id: &str,
) -> Option<QuestionSpec> {
    builder
        .sections()
        .iter()
        .find(|section| section.id == section_id)
        .and_then(|section| section.question(question_id))
        .cloned()
}

fn edit_question(
    builder: &mut AssessmentBuilder,
    section_id: &str,
    question_id: &str,
) -> CliResult<()> {
    let Some(question) = current_question(builder, section_id, question_id) else {
        return Ok(());
    };
    println!("Editing {} question", question.kind.label());
    let text = prompt_non_empty(&mark_required("Question text"), Some(question.text.as_str()))?;
    let required = prompt_bool("Required", question.required)?;
    let mut patch = QuestionPatch {
        text: Some(text),
        required: Some(required),
        validation: prompt_validation(&question)?,
        ..QuestionPatch::default()
    };
    if question.kind.is_choice() {
        let current = question.options.join(", ");
        let raw = prompt_line(
            "Options (comma separated)",
            (!current.is_empty()).then_some(current.as_str()),
        )?;
        let options = split_list(&raw);
        if options.is_empty() {
            println!("Choice questions need at least one option; keeping the current list.");
        } else {
            patch.options = Some(options);
        }
    }
    report(builder.update_question(section_id, question_id, patch));
    Ok(())
}

/// Prompts for each rule of the question's type, offering the current value as default.
/// Returns `None` when nothing changed.
fn prompt_validation(question: &QuestionSpec) -> CliResult<Option<ValidationRules>> {
    let current = &question.validation;
    let mut rules = current.clone();
    match question.kind {
        QuestionType::Numeric => {
            rules.min = prompt_optional_f64("Minimum value", current.min)?;
            rules.max = prompt_optional_f64("Maximum value", current.max)?;
        }
        QuestionType::ShortText | QuestionType::LongText => {
            rules.max_length =
                prompt_optional_usize("Maximum length in characters", current.max_length)?;
        }
        QuestionType::FileUpload => {
            rules.max_size = prompt_optional_f64("Maximum size in MB", current.max_size)?;
            let listed = current
                .allowed_extensions
                .as_ref()
                .filter(|allowed| !allowed.is_empty())
                .map(|allowed| allowed.iter().cloned().collect::<Vec<_>>().join(", "));
            let extensions = prompt_setting("Allowed extensions, comma separated", listed)?;
            rules.allowed_extensions =
                ValidationRules::file(None, split_list(&extensions.unwrap_or_default()))
                    .allowed_extensions;
        }
        QuestionType::SingleChoice | QuestionType::MultiChoice | QuestionType::Unsupported => {}
    }
    Ok((rules != *current).then_some(rules))
}

fn edit_conditions(
    builder: &mut AssessmentBuilder,
    section_id: &str,
    question_id: &str,
) -> CliResult<()> {
    loop {
        let Some(question) = current_question(builder, section_id, question_id) else {
            return Ok(());
        };
        let form = builder.form();
        println!("Conditions for '{}' (all must hold):", question.text);
        if question.conditions.is_empty() {
            println!("  (none; always shown)");
        }
        for (index, condition) in question.conditions.iter().enumerate() {
            let source = form
                .question(&condition.question_id)
                .map(|source| source.text.as_str())
                .unwrap_or("<deleted question>");
            println!(
                "  {}) {} {} '{}'",
                index + 1,
                source,
                condition.operator,
                condition.value
            );
        }

        let raw = prompt_line("Condition action (add, edit N, remove N, done)", Some("done"))?;
        let action = match raw.parse::<ConditionAction>() {
            Ok(action) => action,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        match action {
            ConditionAction::Done => return Ok(()),
            ConditionAction::Add => {
                let sources = builder.eligible_sources(section_id, question_id);
                if sources.is_empty() {
                    println!("Only earlier questions can gate this one, and there are none.");
                    continue;
                }
                for (index, source) in sources.iter().enumerate() {
                    println!("  {}) {} ({})", index + 1, source.text, source.section_title);
                }
                let choice = prompt_non_empty("Depends on question number", Some("1"))?;
                let Some(source) = position(&choice)
                    .ok()
                    .and_then(|index| sources.get(index))
                else {
                    println!("There is no question {}.", choice);
                    continue;
                };
                let operator = prompt_operator(Operator::Eq)?;
                let value = prompt_line("Value to compare with", None)?;
                if let Some(index) = report(builder.add_condition(
                    section_id,
                    question_id,
                    &source.question_id,
                )) {
                    report(builder.update_condition(
                        section_id,
                        question_id,
                        index,
                        Condition::with(&source.question_id, operator, value),
                    ));
                }
            }
            ConditionAction::Edit(index) => {
                let Some(existing) = question.conditions.get(index) else {
                    println!("There is no condition {}.", index + 1);
                    continue;
                };
                let operator = prompt_operator(existing.operator)?;
                let value = prompt_line("Value to compare with", Some(existing.value.as_str()))?;
                report(builder.update_condition(
                    section_id,
                    question_id,
                    index,
                    Condition::with(&existing.question_id, operator, value),
                ));
            }
            ConditionAction::Remove(index) => {
                report(builder.remove_condition(section_id, question_id, index));
            }
        }
    }
}

fn prompt_operator(default: Operator) -> CliResult<Operator> {
    loop {
        let raw = prompt_line("Operator (=, !=, >, <)", Some(default.symbol()))?;
        match Operator::from_str(&raw) {
            Ok(operator) => return Ok(operator),
            Err(err) => println!("{}", err),
        }
    }
}

fn print_overview(builder: &AssessmentBuilder) {
    let active = builder.active_section().map(|section| section.id.as_str());
    println!("Sections (save status: {}):", builder.status().as_str());
    for (index, section) in builder.sections().iter().enumerate() {
        let marker = if Some(section.id.as_str()) == active { "*" } else { " " };
        println!(
            "{} {}. {} ({} questions)",
            marker,
            index + 1,
            section.title,
            section.questions.len()
        );
    }
    let Some(section) = builder.active_section() else {
        return;
    };
    if section.questions.is_empty() {
        println!("'{}' has no questions yet; try `add short_text`.", section.title);
        return;
    }
    println!("Questions in '{}':", section.title);
    for (index, question) in section.questions.iter().enumerate() {
        let mut entry = format!("  {}. [{}] {}", index + 1, question.kind.label(), question.text);
        if question.required {
            entry.push_str(" *");
        }
        if !question.conditions.is_empty() {
            entry.push_str(&format!(" ({} condition(s))", question.conditions.len()));
        }
        println!("{}", entry);
    }
}
