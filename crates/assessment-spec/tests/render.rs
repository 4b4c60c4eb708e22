use assessment_spec::{
    FormSpec, QuestionState, Response, ResponseMap, ValidationErrors, build_render_payload,
    render::RenderStatus, render_json_ui, render_text, responses_schema, resolve_visibility,
    validate,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "sample_assessment" => include_str!("../tests/fixtures/sample_assessment.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn sample() -> FormSpec {
    serde_json::from_str(fixture("sample_assessment")).expect("deserialize")
}

#[test]
fn fresh_form_needs_input_and_hides_conditional_questions() {
    let spec = sample();
    let payload = build_render_payload(&spec, &ResponseMap::new(), &ValidationErrors::new());

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.job_id.as_deref(), Some("12"));
    let city = payload
        .questions()
        .find(|question| question.id == "city")
        .expect("city");
    assert_eq!(city.state, QuestionState::Hidden);
    // relocate, years, resume, stack; the signature question has an unknown type
    assert_eq!(payload.progress.total, 4);
    assert!(payload.questions().all(|question| question.id != "signature"));
}

#[test]
fn answering_reveals_and_completes() {
    let spec = sample();
    let responses = ResponseMap::from([
        ("relocate".to_string(), Response::text("yes")),
        ("city".to_string(), Response::text("Lisbon")),
        ("years".to_string(), Response::text("4")),
    ]);
    let payload = build_render_payload(&spec, &responses, &ValidationErrors::new());
    assert_eq!(payload.status, RenderStatus::Complete);
    assert_eq!(payload.progress.answered, 3);
    // city and senior are now visible
    assert_eq!(payload.progress.total, 6);

    let text = render_text(&payload);
    assert!(text.contains("Status: complete (3/6)"));
    assert!(text.contains("Which city would you move to?"));
    assert!(text.contains("= Lisbon"));
    assert!(text.contains("accepts docx, pdf"));
}

#[test]
fn errors_mark_questions_invalid() {
    let spec = sample();
    let responses = ResponseMap::from([
        ("relocate".to_string(), Response::text("no")),
        ("years".to_string(), Response::text("9")),
    ]);
    let errors = validate(&spec, &responses).errors;
    let payload = build_render_payload(&spec, &responses, &errors);
    assert_eq!(payload.status, RenderStatus::Error);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["status"], "error");
    let background = &ui["sections"][0];
    let years = background["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .find(|question| question["id"] == "years")
        .expect("years");
    assert_eq!(years["state"], "invalid");
    assert_eq!(years["error"], "Value must be at most 5");
    assert_eq!(years["hints"]["max"], 5.0);
}

#[test]
fn json_ui_omits_hidden_questions() {
    let spec = sample();
    let payload = build_render_payload(&spec, &ResponseMap::new(), &ValidationErrors::new());
    let ui = render_json_ui(&payload);
    let ids: Vec<_> = ui["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .flat_map(|section| section["questions"].as_array().cloned().unwrap_or_default())
        .map(|question| question["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["relocate", "years", "resume", "stack"]);
    assert_eq!(ui["sections"][1]["questions"][0]["hints"]["accept"], ".docx,.pdf");
}

#[test]
fn responses_schema_lists_visible_required_questions() {
    let spec = sample();
    let visibility = resolve_visibility(&spec, &ResponseMap::new());
    let schema = responses_schema(&spec, &visibility);
    let props = schema["properties"].as_object().expect("properties");
    assert!(props.contains_key("relocate"));
    assert!(!props.contains_key("city"));
    assert!(!props.contains_key("signature"));
    assert_eq!(props["stack"]["type"], "array");
    let required = schema["required"].as_array().expect("required");
    assert!(required.iter().any(|value| value == "years"));
}
