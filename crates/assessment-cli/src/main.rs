mod builder;
mod wizard;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assessment_runtime::{
    AssessmentApi, AssessmentBuilder, DraftStore, EventBus, FileDraftStore, HttpAssessmentApi,
    InMemoryAssessmentApi, PreviewSession, RuntimeConfig, SubmissionPipeline,
};
use assessment_spec::{
    FormSpec, ResponseMap, SubmissionRecord, TemplateKind, ValidationErrors, ValidationResult,
    build_render_payload, form_schema, render_json_ui, render_text, resolve_visibility,
    responses_schema, validate,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use wizard::{Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "TalentFlow assessment CLI",
    long_about = "Builds per-job assessments, previews them as a candidate and validates or exports responses"
)]
struct Cli {
    /// Base URL of the assessment storage API; runs offline when unset.
    #[arg(long, global = true, env = "TALENTFLOW_API_URL", value_name = "URL")]
    api_url: Option<String>,
    /// Directory holding local drafts and cached responses.
    #[arg(long, global = true, env = "TALENTFLOW_DRAFT_DIR", value_name = "DIR")]
    draft_dir: Option<PathBuf>,
    /// JSON config file with runtime settings.
    #[arg(long, global = true, env = "TALENTFLOW_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Raise log and wizard verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in role templates.
    Templates,
    /// Seed a job's draft from a role template.
    Init {
        #[arg(long, value_name = "JOB")]
        job: String,
        /// Template slug, e.g. `product-manager`.
        #[arg(long, value_name = "TEMPLATE")]
        template: TemplateKind,
        /// Also save the result to the storage API.
        #[arg(long)]
        save: bool,
        /// Replace an existing local draft.
        #[arg(long)]
        force: bool,
    },
    /// Interactive editor for a job's sections and questions.
    Edit {
        #[arg(long, value_name = "JOB")]
        job: String,
    },
    /// Render a job's assessment with the cached candidate responses.
    Show {
        #[arg(long, value_name = "JOB")]
        job: String,
        /// JSON response map to render instead of the cache.
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Answer a job's assessment in a text shell and submit it.
    Take {
        #[arg(long, value_name = "JOB")]
        job: String,
        /// Print the JSON render payload before every prompt.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
        /// Write the submission record to this directory.
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
        /// Also print the submission as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate a response map against an assessment file.
    Validate {
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
    },
    /// Report structural problems in an assessment.
    Check {
        #[arg(long, value_name = "SPEC", conflicts_with = "job")]
        spec: Option<PathBuf>,
        #[arg(long, value_name = "JOB")]
        job: Option<String>,
    },
    /// Print the assessment JSON Schema, or the responses schema of a form.
    Schema {
        #[arg(long, value_name = "SPEC", conflicts_with = "job")]
        spec: Option<PathBuf>,
        #[arg(long, value_name = "JOB")]
        job: Option<String>,
        /// Responses used to resolve which questions are visible.
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
    },
    /// List a job's submissions, newest first.
    Submissions {
        #[arg(long, value_name = "JOB")]
        job: String,
        /// Write every record to this directory.
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
        /// Export as CBOR instead of pretty JSON.
        #[arg(long, requires = "export")]
        cbor: bool,
    },
}

/// Storage collaborators shared by the commands.
struct Context {
    api: Arc<dyn AssessmentApi>,
    drafts: Arc<FileDraftStore>,
    events: EventBus,
    online: bool,
}

impl Context {
    fn from_cli(cli: &Cli) -> CliResult<Self> {
        let mut config = RuntimeConfig::load(cli.config.as_deref())?;
        if let Some(url) = cli.api_url.as_deref().filter(|url| !url.trim().is_empty()) {
            config.api_base_url = Some(url.trim().to_string());
        }
        if let Some(dir) = &cli.draft_dir {
            config.draft_dir = dir.clone();
        }
        let (api, online): (Arc<dyn AssessmentApi>, bool) =
            match HttpAssessmentApi::from_config(&config)? {
                Some(api) => (Arc::new(api), true),
                None => {
                    debug!("no api url configured; working offline");
                    (Arc::new(InMemoryAssessmentApi::new()), false)
                }
            };
        let events = EventBus::default();
        spawn_event_log(&events);
        Ok(Self {
            api,
            drafts: Arc::new(FileDraftStore::new(config.draft_dir)),
            events,
            online,
        })
    }

    async fn builder(&self, job_id: &str) -> AssessmentBuilder {
        AssessmentBuilder::open(
            job_id,
            self.api.clone(),
            self.drafts.clone(),
            self.events.clone(),
        )
        .await
    }

    /// Form a candidate sees: the stored form online, the local draft offline.
    async fn candidate_form(&self, job_id: &str) -> CliResult<FormSpec> {
        if self.online {
            return Ok(self.api.fetch_assessment(job_id).await?);
        }
        let sections = self.drafts.load_sections(job_id)?.ok_or_else(|| {
            format!(
                "no local draft for job '{}'; run `init` or `edit` first, or pass --api-url",
                job_id
            )
        })?;
        Ok(FormSpec::new(job_id, sections))
    }

    fn require_online(&self, action: &str) -> CliResult<()> {
        if self.online {
            Ok(())
        } else {
            Err(format!("{} requires --api-url or TALENTFLOW_API_URL", action).into())
        }
    }
}

fn spawn_event_log(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(job_id = event.job_id(), ?event, "assessment event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbosity = Verbosity::from_verbose(cli.verbose > 0);

    let context = || Context::from_cli(&cli);
    match &cli.command {
        Command::Templates => run_templates(),
        Command::Validate { spec, responses } => run_validate(spec, responses),
        Command::Init {
            job,
            template,
            save,
            force,
        } => run_init(&context()?, job, *template, *save, *force).await,
        Command::Edit { job } => {
            let ctx = context()?;
            builder::run_edit(ctx.builder(job).await, &ctx).await
        }
        Command::Show {
            job,
            responses,
            format,
        } => run_show(&context()?, job, responses.as_deref(), *format).await,
        Command::Take {
            job,
            format,
            export,
            json,
        } => run_take(&context()?, job, *format, export.as_deref(), *json, verbosity).await,
        Command::Check { spec, job } => {
            let form = load_form(&context()?, spec.as_deref(), job.as_deref()).await?;
            run_check(&form)
        }
        Command::Schema {
            spec: None,
            job: None,
            ..
        } => print_json(&form_schema()),
        Command::Schema {
            spec,
            job,
            responses,
        } => {
            let form = load_form(&context()?, spec.as_deref(), job.as_deref()).await?;
            let responses = match responses {
                Some(path) => read_responses(path)?,
                None => ResponseMap::new(),
            };
            print_json(&responses_schema(
                &form,
                &resolve_visibility(&form, &responses),
            ))
        }
        Command::Submissions { job, export, cbor } => {
            run_submissions(&context()?, job, export.as_deref(), *cbor).await
        }
    }
}

fn run_templates() -> CliResult<()> {
    println!("Available templates:");
    for kind in TemplateKind::ALL {
        println!(
            "  {:<22} {} ({} sections, {} questions)",
            kind.slug(),
            kind.title(),
            kind.section_count(),
            kind.question_count()
        );
    }
    Ok(())
}

async fn run_init(
    ctx: &Context,
    job_id: &str,
    template: TemplateKind,
    save: bool,
    force: bool,
) -> CliResult<()> {
    if !force && ctx.drafts.load_sections(job_id)?.is_some() {
        return Err(format!(
            "a draft for job '{}' already exists at {}; pass --force to replace it",
            job_id,
            ctx.drafts.sections_path(job_id).display()
        )
        .into());
    }
    if save {
        ctx.require_online("--save")?;
    }
    let mut builder = ctx.builder(job_id).await;
    builder.apply_template(template);
    println!(
        "Applied template '{}' to job {} ({} sections, {} questions)",
        template.title(),
        job_id,
        template.section_count(),
        template.question_count()
    );
    println!("Draft: {}", ctx.drafts.sections_path(job_id).display());
    if save {
        builder.save().await?;
        println!("Saved to the assessment API");
    }
    Ok(())
}

async fn run_show(
    ctx: &Context,
    job_id: &str,
    responses: Option<&Path>,
    format: RenderMode,
) -> CliResult<()> {
    let builder = ctx.builder(job_id).await;
    let responses = match responses {
        Some(path) => read_responses(path)?,
        None => ctx.drafts.load_responses(job_id)?.unwrap_or_default(),
    };
    let payload = build_render_payload(&builder.form(), &responses, &ValidationErrors::new());
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => print_json(&render_json_ui(&payload))?,
    }
    Ok(())
}

async fn run_take(
    ctx: &Context,
    job_id: &str,
    format: RenderMode,
    export: Option<&Path>,
    json: bool,
    verbosity: Verbosity,
) -> CliResult<()> {
    let form = ctx.candidate_form(job_id).await?;
    let mut session = PreviewSession::new(
        job_id,
        form,
        ctx.api.clone(),
        ctx.drafts.clone(),
        ctx.events.clone(),
    );
    let mut presenter = WizardPresenter::new(verbosity, json);
    let record = wizard::run_wizard(&mut session, &mut presenter, format).await?;
    presenter.show_completion(&record);
    if let Some(dir) = export {
        let path = export_record(&record, dir, false)?;
        println!("Exported {}", path.display());
    }
    Ok(())
}

fn run_validate(spec_path: &Path, responses_path: &Path) -> CliResult<()> {
    let spec = read_form(spec_path)?;
    let responses = read_responses(responses_path)?;

    let result = validate(&spec, &responses);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&spec, &responses, &result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(spec: &FormSpec, responses: &ResponseMap, result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in result.errors.values() {
            println!("  {} - {}", error.question_id, error.message);
        }
    }
    let visibility = resolve_visibility(spec, responses);
    let hidden = visibility
        .iter()
        .filter(|(_, visible)| !**visible)
        .map(|(id, _)| id.as_str())
        .collect::<Vec<_>>();
    if !hidden.is_empty() {
        println!("Hidden questions (not checked): {}", hidden.join(", "));
    }
    let unknown = responses
        .keys()
        .filter(|id| spec.question(id).is_none())
        .map(String::as_str)
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        println!("Unknown response fields: {}", unknown.join(", "));
    }
}

fn run_check(form: &FormSpec) -> CliResult<()> {
    let issues = form.integrity_issues();
    if issues.is_empty() {
        println!(
            "Integrity: ok ({} sections, {} questions)",
            form.sections.len(),
            form.questions().count()
        );
        return Ok(());
    }
    println!("Integrity: {} issue(s)", issues.len());
    for issue in &issues {
        println!("  - {}", issue);
    }
    Err("integrity check failed".into())
}

async fn run_submissions(
    ctx: &Context,
    job_id: &str,
    export: Option<&Path>,
    cbor: bool,
) -> CliResult<()> {
    ctx.require_online("listing submissions")?;
    let page = SubmissionPipeline::new(ctx.api.clone())
        .list(job_id)
        .await?;
    if page.items.is_empty() {
        println!("No submissions for job {}", job_id);
        return Ok(());
    }
    println!("{} submission(s) for job {}:", page.total, job_id);
    for record in &page.items {
        println!(
            "  {}  {}  {} response(s)",
            record.id,
            record.submitted_at.to_rfc3339(),
            record.responses.len()
        );
        if let Some(dir) = export {
            let path = export_record(record, dir, cbor)?;
            println!("    -> {}", path.display());
        }
    }
    Ok(())
}

/// Resolves `--spec` or `--job` into a form.
async fn load_form(ctx: &Context, spec: Option<&Path>, job: Option<&str>) -> CliResult<FormSpec> {
    match (spec, job) {
        (Some(path), _) => read_form(path),
        (None, Some(job_id)) => Ok(ctx.builder(job_id).await.form()),
        (None, None) => Err("pass --spec or --job".into()),
    }
}

fn read_form(path: &Path) -> CliResult<FormSpec> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    Ok(serde_json::from_str(&contents)?)
}

fn read_responses(path: &Path) -> CliResult<ResponseMap> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    Ok(serde_json::from_str(&contents)?)
}

fn export_record(record: &SubmissionRecord, dir: &Path, cbor: bool) -> CliResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = if cbor {
        let path = dir.join(format!("submission_{}.cbor", record.id));
        fs::write(&path, record.to_cbor()?)?;
        path
    } else {
        let path = dir.join(record.export_file_name());
        fs::write(&path, record.to_json_pretty()?)?;
        path
    };
    Ok(path)
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prompt_line(prompt: &str, default: Option<&str>) -> CliResult<String> {
    if let Some(default_value) = default {
        print!("{} [{}]: ", prompt, default_value);
    } else {
        print!("{}: ", prompt);
    }
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input closed".into());
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn prompt_optional(prompt: &str) -> CliResult<Option<String>> {
    let value = prompt_line(prompt, None)?;
    if value.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn prompt_non_empty(prompt: &str, default: Option<&str>) -> CliResult<String> {
    loop {
        let value = prompt_line(prompt, default)?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
        println!("Value cannot be empty.");
    }
}

fn mark_required(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.to_lowercase().contains("required") {
        trimmed.to_string()
    } else {
        format!("{} (required)", trimmed)
    }
}

fn prompt_bool(prompt: &str, default: bool) -> CliResult<bool> {
    let prompt_text = format!("{} (y/n)", prompt.trim());
    let default_hint = if default { "Y" } else { "N" };
    loop {
        let line = prompt_line(&prompt_text, Some(default_hint))?;
        match parse_yes_no(&line) {
            Some(value) => return Ok(value),
            None => println!("Invalid answer '{}'. Expected yes or no.", line.trim()),
        }
    }
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Typed at a setting prompt to drop the current value.
const CLEAR_SETTING: &str = "none";

/// Prompts for an optional setting; blank keeps `current`, `none` clears it.
fn prompt_setting(prompt: &str, current: Option<String>) -> CliResult<Option<String>> {
    let hint = match current.as_deref() {
        Some(_) => format!("{prompt} ('{CLEAR_SETTING}' to clear)"),
        None => format!("{prompt} (blank for none)"),
    };
    let raw = prompt_line(&hint, current.as_deref())?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(CLEAR_SETTING) {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn prompt_optional_f64(prompt: &str, current: Option<f64>) -> CliResult<Option<f64>> {
    loop {
        let Some(raw) = prompt_setting(prompt, current.map(|value| value.to_string()))? else {
            return Ok(None);
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => return Ok(Some(value)),
            _ => println!("Enter a number, '{CLEAR_SETTING}' or leave blank."),
        }
    }
}

fn prompt_optional_usize(prompt: &str, current: Option<usize>) -> CliResult<Option<usize>> {
    loop {
        let Some(raw) = prompt_setting(prompt, current.map(|value| value.to_string()))? else {
            return Ok(None);
        };
        match raw.parse::<usize>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => println!("Please enter a whole number, '{CLEAR_SETTING}' or leave blank."),
        }
    }
}

/// Splits a comma separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_spec::SectionSpec;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use serde_json::Value;

    const SAMPLE: &str = include_str!("../tests/fixtures/sample_assessment.json");

    fn cli(drafts: &Path) -> Command {
        let mut cmd = Command::cargo_bin("talentflow-assessment").expect("binary");
        cmd.env_remove("TALENTFLOW_API_URL")
            .env_remove("TALENTFLOW_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--draft-dir")
            .arg(drafts);
        cmd
    }

    fn stdout_of(cmd: &mut Command) -> String {
        let output = cmd.output().expect("run");
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn yes_no_answers_are_case_insensitive() {
        assert_eq!(parse_yes_no("Y"), Some(true));
        assert_eq!(parse_yes_no(" no "), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
    }

    #[test]
    fn split_list_drops_blank_entries() {
        assert_eq!(split_list(" pdf, ,docx,"), vec!["pdf", "docx"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn mark_required_is_idempotent() {
        assert_eq!(mark_required("Title"), "Title (required)");
        assert_eq!(mark_required("Title (required)"), "Title (required)");
    }

    #[test]
    fn templates_command_lists_every_slug() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let stdout = stdout_of(cli(temp.path()).arg("templates"));
        for kind in TemplateKind::ALL {
            assert!(stdout.contains(kind.slug()), "missing {}", kind.slug());
        }
    }

    #[test]
    fn init_writes_a_draft_that_show_renders() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        cli(temp.path())
            .args(["init", "--job", "7", "--template", "product-manager"])
            .assert()
            .success();
        assert!(temp.child("assessment_draft_7.json").path().exists());

        let stdout = stdout_of(cli(temp.path()).args(["show", "--job", "7"]));
        assert!(stdout.contains("Assessment for job 7"));
        assert!(stdout.contains("Product Strategy"));
        assert!(stdout.contains("Status: need_input"));

        cli(temp.path())
            .args(["init", "--job", "7", "--template", "ui-ux-designer"])
            .assert()
            .failure();
        cli(temp.path())
            .args(["init", "--job", "7", "--template", "ui-ux-designer", "--force"])
            .assert()
            .success();
    }

    #[test]
    fn show_json_reports_hidden_questions_as_absent() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let form: FormSpec = serde_json::from_str(SAMPLE).expect("fixture");
        temp.child("assessment_draft_12.json")
            .write_str(&serde_json::to_string(&form.sections).expect("json"))
            .expect("draft");
        temp.child("assessment_responses_12.json")
            .write_str(r#"{ "relocate": "no", "years": "2" }"#)
            .expect("responses");

        let stdout = stdout_of(cli(temp.path()).args(["show", "--job", "12", "--format", "json"]));
        let ui: Value = serde_json::from_str(&stdout).expect("json output");
        let ids = ui["sections"][0]["questions"]
            .as_array()
            .expect("questions")
            .iter()
            .filter_map(|question| question["id"].as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["relocate", "years"]);
    }

    #[test]
    fn validate_command_reports_valid_and_invalid() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let spec = temp.child("spec.json");
        spec.write_str(SAMPLE).expect("spec");
        let good = temp.child("good.json");
        good.write_str(r#"{ "relocate": "no", "years": "5" }"#)
            .expect("good");
        let bad = temp.child("bad.json");
        bad.write_str(r#"{ "relocate": "no", "years": "6" }"#)
            .expect("bad");

        let stdout = stdout_of(
            cli(temp.path())
                .arg("validate")
                .arg("--spec")
                .arg(spec.path())
                .arg("--responses")
                .arg(good.path()),
        );
        assert!(stdout.contains("Validation result: valid"));

        let mut invalid = cli(temp.path());
        invalid
            .arg("validate")
            .arg("--spec")
            .arg(spec.path())
            .arg("--responses")
            .arg(bad.path());
        let output = invalid.output().expect("run");
        assert!(!output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("years - Value must be at most 5"));
    }

    #[test]
    fn check_flags_unsupported_questions() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let spec = temp.child("spec.json");
        spec.write_str(SAMPLE).expect("spec");
        let mut cmd = cli(temp.path());
        cmd.arg("check").arg("--spec").arg(spec.path());
        let output = cmd.output().expect("run");
        assert!(!output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("question 'signature' has an unsupported type"));
    }

    #[test]
    fn schema_command_covers_form_and_responses() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let form_schema: Value =
            serde_json::from_str(&stdout_of(cli(temp.path()).arg("schema"))).expect("schema");
        assert!(form_schema["properties"].get("sections").is_some());

        let spec = temp.child("spec.json");
        spec.write_str(SAMPLE).expect("spec");
        let responses: Value = serde_json::from_str(&stdout_of(
            cli(temp.path()).arg("schema").arg("--spec").arg(spec.path()),
        ))
        .expect("responses schema");
        assert!(responses["properties"].get("relocate").is_some());
        assert!(responses["properties"].get("signature").is_none());
    }

    #[test]
    fn submissions_need_an_api() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        cli(temp.path())
            .args(["submissions", "--job", "12"])
            .assert()
            .failure();
    }

    #[test]
    fn take_walks_visible_questions_and_exports_the_record() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let form: FormSpec = serde_json::from_str(SAMPLE).expect("fixture");
        temp.child("assessment_draft_12.json")
            .write_str(&serde_json::to_string(&form.sections).expect("json"))
            .expect("draft");
        let out = temp.child("out");

        // relocate, years (7 is rejected, then 2), resume, stack
        let answers = ["2", "7", "2", "", "rust, go"];
        cli(temp.path())
            .args(["take", "--job", "12", "--export"])
            .arg(out.path())
            .write_stdin(format!("{}\n", answers.join("\n")))
            .assert()
            .success();

        let exported = std::fs::read_dir(out.path())
            .expect("export dir")
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "json"))
            .expect("exported record");
        let record: Value =
            serde_json::from_str(&std::fs::read_to_string(exported).expect("read")).expect("json");
        assert_eq!(record["jobId"], "12");
        assert_eq!(record["responses"]["relocate"], "no");
        assert_eq!(record["responses"]["years"], "2");
        assert_eq!(record["responses"]["stack"], serde_json::json!(["Rust", "Go"]));
        assert!(record["responses"].get("city").is_none());
    }

    #[test]
    fn editing_question_text_keeps_its_rules() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let form: FormSpec = serde_json::from_str(SAMPLE).expect("fixture");
        temp.child("assessment_draft_3.json")
            .write_str(&serde_json::to_string(&form.sections).expect("json"))
            .expect("draft");
        let script = [
            "edit 3",
            "",
            "",
            "",
            "none",
            "select 2",
            "edit 1",
            "Describe a project you shipped.",
            "",
            "",
            "quit",
        ];
        cli(temp.path())
            .args(["edit", "--job", "3"])
            .write_stdin(format!("{}\n", script.join("\n")))
            .assert()
            .success();

        let sections: Vec<SectionSpec> = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("assessment_draft_3.json")).expect("draft"),
        )
        .expect("json");
        let saved = FormSpec::new("3", sections);

        let senior = saved.question("senior").expect("senior");
        assert_eq!(senior.text, "Describe a project you shipped.");
        assert_eq!(senior.validation.max_length, Some(200));

        let years = saved.question("years").expect("years");
        assert_eq!(years.text, "Years of experience");
        assert!(years.required);
        assert_eq!(years.validation.min, Some(1.0));
        assert_eq!(years.validation.max, None);
    }

    #[test]
    fn edit_session_renames_and_adds_sections() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let script = ["rename", "Basics", "add-section", "rename", "Deep dive", "quit"];
        cli(temp.path())
            .args(["edit", "--job", "3"])
            .write_stdin(format!("{}\n", script.join("\n")))
            .assert()
            .success();

        let draft: Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("assessment_draft_3.json")).expect("draft"),
        )
        .expect("json");
        let titles = draft
            .as_array()
            .expect("sections")
            .iter()
            .filter_map(|section| section["title"].as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Basics", "Deep dive"]);
    }
}
