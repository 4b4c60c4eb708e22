use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use assessment_runtime::{PreviewSession, RuntimeError};
use assessment_spec::{
    FileHandle, QuestionSpec, QuestionType, RenderPayload, RenderQuestion, RenderStatus, Response,
    SubmissionRecord, ValidationErrors, render_json_ui, validate_response,
};

use crate::{CliResult, RenderMode, print_json, prompt_bool, split_list};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: status, visible questions, error codes, the encoded record.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and progress while a candidate walks the form.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    current_section: Option<String>,
    show_record_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_record_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            current_section: None,
            show_record_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        if let Some(job_id) = &payload.job_id {
            println!("Assessment for job {}", job_id);
        }
        println!("Type 'exit' to abort.");
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &RenderPayload) {
        let visible = payload.questions().filter(|question| question.visible());
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
            println!("Visible questions:");
            for question in visible {
                let mut entry = format!(" - {} ({})", question.id, question.text);
                if question.required {
                    entry.push_str(" [required]");
                }
                println!("{}", entry);
            }
        } else if payload.status == RenderStatus::Complete && visible.count() == 0 {
            println!("This assessment has no questions yet.");
        }
    }

    /// Prints the section banner when the wizard moves into a new section.
    pub fn show_section(&mut self, section: &SectionBanner) {
        if self.current_section.as_deref() == Some(section.id.as_str()) {
            return;
        }
        println!();
        println!("== {} ==", section.title);
        if let Some(description) = section
            .description
            .as_deref()
            .filter(|description| !description.is_empty())
        {
            println!("{}", description);
        }
        self.current_section = Some(section.id.clone());
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.text);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        for (index, option) in prompt.options.iter().enumerate() {
            println!("  {}) {}", index + 1, option);
        }
        if let Some(current) = &prompt.current {
            println!("Current answer: {} (press enter to keep)", current);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_submit_errors(&self, errors: &ValidationErrors) {
        eprintln!("Please fix {} answer(s) before submitting:", errors.len());
        for error in errors.values() {
            eprintln!("  {} - {}", error.question_id, error.message);
        }
    }

    pub fn show_completion(&self, record: &SubmissionRecord) {
        println!("Submitted ✅ (submission {})", record.id);
        if self.verbosity.is_verbose() {
            match record.to_cbor() {
                Ok(bytes) => println!("Submission (CBOR hex): {}", encode_hex(&bytes)),
                Err(err) => eprintln!("Failed to serialize submission to CBOR: {}", err),
            }
        }
        if self.show_record_json {
            match record.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize submission to JSON: {}", err),
            }
        }
    }
}

/// Section heading shown before its first prompt.
pub struct SectionBanner {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub text: String,
    pub required: bool,
    pub hint: Option<String>,
    pub options: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(question: &RenderQuestion, index: usize, total: usize) -> Self {
        Self {
            index: index.max(1),
            total,
            text: question.text.clone(),
            required: question.required,
            hint: type_hint(question),
            options: question.options.clone(),
            current: question
                .current_value
                .as_ref()
                .filter(|value| !value.is_empty())
                .map(Response::display),
        }
    }
}

fn type_hint(question: &RenderQuestion) -> Option<String> {
    let hints = &question.hints;
    match question.kind {
        QuestionType::SingleChoice => Some("(pick one: number or text)".to_string()),
        QuestionType::MultiChoice => Some("(comma separated numbers or text)".to_string()),
        QuestionType::Numeric => Some(match (hints.min, hints.max) {
            (Some(min), Some(max)) => format!("(number between {} and {})", min, max),
            (Some(min), None) => format!("(number, at least {})", min),
            (None, Some(max)) => format!("(number, at most {})", max),
            (None, None) => "(number)".to_string(),
        }),
        QuestionType::ShortText | QuestionType::LongText => hints
            .max_length
            .map(|max_length| format!("(max {} characters)", max_length)),
        QuestionType::FileUpload => {
            let mut parts = vec!["path to a file".to_string()];
            if let Some(max_size) = hints.max_size_mb {
                parts.push(format!("max {}MB", max_size));
            }
            if let Some(accept) = &hints.accept {
                parts.push(accept.iter().cloned().collect::<Vec<_>>().join("/"));
            }
            Some(format!("({})", parts.join(", ")))
        }
        QuestionType::Unsupported => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Walks every visible question once, then submits. Questions that fail
/// submit-time validation are asked again.
pub async fn run_wizard(
    session: &mut PreviewSession,
    presenter: &mut WizardPresenter,
    format: RenderMode,
) -> CliResult<SubmissionRecord> {
    let mut asked = BTreeSet::new();
    loop {
        let payload = session.render();
        if format == RenderMode::Json {
            print_json(&render_json_ui(&payload))?;
        }
        presenter.show_header(&payload);
        presenter.show_status(&payload);

        let visible = payload
            .sections
            .iter()
            .flat_map(|section| {
                section
                    .visible_questions()
                    .map(move |question| (section, question))
            })
            .collect::<Vec<_>>();
        let next = visible
            .iter()
            .enumerate()
            .find(|(_, (_, question))| !asked.contains(&question.id));

        if let Some((position, (section, question))) = next {
            presenter.show_section(&SectionBanner {
                id: section.id.clone(),
                title: section.title.clone(),
                description: section.description.clone(),
            });
            let prompt = PromptContext::new(question, position + 1, visible.len());
            let spec = session.form().question(&question.id);
            let answer = prompt_question(&prompt, question, spec, presenter)?;
            let question_id = question.id.clone();
            match answer {
                Some(response) => session.set_response(&question_id, response),
                None => session.clear_response(&question_id),
            }
            asked.insert(question_id);
            continue;
        }

        match session.submit().await {
            Ok(record) => return Ok(record),
            Err(RuntimeError::Invalid { .. }) => {
                presenter.show_submit_errors(session.errors());
                for question_id in session.errors().keys() {
                    asked.remove(question_id);
                }
            }
            Err(error) if error.is_transient() => {
                eprintln!("Submission failed: {}", error);
                if !prompt_bool("Retry submission?", true)? {
                    return Err(error.into());
                }
            }
            Err(error) => return Err(error.into()),
        }
    }
}

fn prompt_question(
    prompt: &PromptContext,
    question: &RenderQuestion,
    spec: Option<&QuestionSpec>,
    presenter: &WizardPresenter,
) -> CliResult<Option<Response>> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input closed before the assessment was submitted".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }

        let answer = match parse_answer(question, trimmed) {
            Ok(answer) => answer,
            Err(err) => {
                presenter.show_parse_error(&err);
                continue;
            }
        };
        if let Some(spec) = spec
            && let Some(failure) = validate_response(spec, answer.as_ref())
        {
            presenter.show_parse_error(&AnswerParseError::new(
                failure.to_string(),
                Some(failure.code().to_string()),
            ));
            continue;
        }
        return Ok(answer);
    }
}

/// Turns a typed line into a response; blank keeps the current answer.
pub fn parse_answer(
    question: &RenderQuestion,
    raw: &str,
) -> Result<Option<Response>, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(question
            .current_value
            .clone()
            .filter(|value| !value.is_empty()));
    }

    match question.kind {
        QuestionType::SingleChoice => match_option(&question.options, raw)
            .map(|choice| Some(Response::Text(choice)))
            .ok_or_else(|| choice_error(&question.options)),
        QuestionType::MultiChoice => {
            let mut selected: Vec<String> = Vec::new();
            for item in split_list(raw) {
                let choice = match_option(&question.options, &item)
                    .ok_or_else(|| choice_error(&question.options))?;
                if !selected.contains(&choice) {
                    selected.push(choice);
                }
            }
            Ok(Some(Response::Choices(selected)))
        }
        QuestionType::Numeric => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|_| Some(Response::text(raw)))
            .ok_or_else(|| {
                AnswerParseError::new(
                    "Please enter a number.",
                    Some("expected number".to_string()),
                )
            }),
        QuestionType::FileUpload => FileHandle::from_path(Path::new(raw))
            .map(|file| Some(Response::File(file)))
            .map_err(|err| {
                AnswerParseError::new(
                    format!("Cannot read file '{}'.", raw),
                    Some(err.to_string()),
                )
            }),
        QuestionType::ShortText | QuestionType::LongText | QuestionType::Unsupported => {
            Ok(Some(Response::text(raw)))
        }
    }
}

/// Accepts a 1-based option number or the option text, ignoring case.
fn match_option(options: &[String], raw: &str) -> Option<String> {
    if let Ok(number) = raw.parse::<usize>()
        && let Some(option) = number.checked_sub(1).and_then(|index| options.get(index))
    {
        return Some(option.clone());
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .cloned()
}

fn choice_error(options: &[String]) -> AnswerParseError {
    AnswerParseError::new(
        format!("Choose one of: {}.", options.join(", ")),
        Some(format!("allowed values: {}", options.join(", "))),
    )
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
