use assessment_spec::{
    FileHandle, FormSpec, QuestionSpec, QuestionType, Response, ResponseMap, ValidationFailure,
    ValidationRules, validate, validate_response,
};

fn sample() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/sample_assessment.json")).expect("deserialize")
}

fn responses(entries: &[(&str, Response)]) -> ResponseMap {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.clone()))
        .collect()
}

fn question(kind: QuestionType, required: bool, validation: ValidationRules) -> QuestionSpec {
    let mut question = QuestionSpec::new(kind);
    question.required = required;
    question.validation = validation;
    question
}

#[test]
fn required_questions_reject_every_empty_shape() {
    let empties = [
        None,
        Some(Response::text("")),
        Some(Response::choices(Vec::<String>::new())),
        Some(Response::Raw(serde_json::Value::Null)),
    ];
    for kind in QuestionType::ALL {
        let required = question(kind, true, ValidationRules::default());
        let optional = question(kind, false, ValidationRules::default());
        for empty in &empties {
            assert_eq!(
                validate_response(&required, empty.as_ref()),
                Some(ValidationFailure::Required),
                "{kind} with {empty:?}"
            );
            assert_eq!(validate_response(&optional, empty.as_ref()), None);
        }
    }
}

#[test]
fn numeric_bounds_are_inclusive() {
    let numeric = question(
        QuestionType::Numeric,
        true,
        ValidationRules::range(Some(1.0), Some(5.0)),
    );
    assert_eq!(validate_response(&numeric, Some(&Response::text("1"))), None);
    assert_eq!(validate_response(&numeric, Some(&Response::text("5"))), None);

    let low = validate_response(&numeric, Some(&Response::text("0"))).expect("below min");
    assert_eq!(low.to_string(), "Value must be at least 1");
    assert_eq!(low.code(), "min");

    let high = validate_response(&numeric, Some(&Response::text("6"))).expect("above max");
    assert_eq!(high.to_string(), "Value must be at most 5");
    assert_eq!(high.code(), "max");
}

#[test]
fn non_numeric_text_passes_numeric_bounds() {
    let numeric = question(
        QuestionType::Numeric,
        true,
        ValidationRules::range(Some(1.0), Some(5.0)),
    );
    assert_eq!(validate_response(&numeric, Some(&Response::text("many"))), None);
}

#[test]
fn whitespace_numeric_answer_counts_as_zero() {
    let numeric = question(
        QuestionType::Numeric,
        true,
        ValidationRules::range(Some(1.0), Some(5.0)),
    );
    let failure = validate_response(&numeric, Some(&Response::text("  "))).expect("below min");
    assert_eq!(failure.to_string(), "Value must be at least 1");

    let capped = question(QuestionType::Numeric, false, ValidationRules::range(None, Some(10.0)));
    let failure = validate_response(&capped, Some(&Response::text("0x10"))).expect("hex above max");
    assert_eq!(failure.to_string(), "Value must be at most 10");
    assert_eq!(validate_response(&capped, Some(&Response::text("-Infinity"))), None);
}

#[test]
fn text_length_boundary() {
    let short = question(QuestionType::ShortText, false, ValidationRules::max_length(5));
    assert_eq!(validate_response(&short, Some(&Response::text("héllo"))), None);
    let failure = validate_response(&short, Some(&Response::text("héllo!"))).expect("too long");
    assert_eq!(failure.to_string(), "Text must be no longer than 5 characters");
    assert_eq!(failure.code(), "max_length");
}

#[test]
fn file_rules_check_size_then_extension() {
    let upload = question(
        QuestionType::FileUpload,
        true,
        ValidationRules::file(Some(1.0), ["pdf", "docx"]),
    );

    let ok = Response::File(FileHandle::new("resume.PDF", 1024 * 1024));
    assert_eq!(validate_response(&upload, Some(&ok)), None);

    let wrong = Response::File(FileHandle::new("resume.exe", 100));
    let failure = validate_response(&upload, Some(&wrong)).expect("extension");
    assert_eq!(failure.to_string(), "File must be one of: docx, pdf");
    assert_eq!(failure.code(), "extension");

    let big = Response::File(FileHandle::new("resume.pdf", 1024 * 1024 + 1));
    let failure = validate_response(&upload, Some(&big)).expect("size");
    assert_eq!(failure.to_string(), "File must be smaller than 1MB");
}

#[test]
fn unsupported_questions_never_fail() {
    let form = sample();
    let signature = form.question("signature").expect("signature question");
    assert_eq!(signature.kind, QuestionType::Unsupported);
    assert_eq!(validate_response(signature, None), None);
}

#[test]
fn hidden_required_question_is_ignored() {
    let form = sample();
    let map = responses(&[
        ("relocate", Response::text("no")),
        ("years", Response::text("2")),
    ]);
    let result = validate(&form, &map);
    assert!(result.valid, "unexpected errors: {:?}", result.errors);

    let map = responses(&[
        ("relocate", Response::text("yes")),
        ("years", Response::text("2")),
    ]);
    let result = validate(&form, &map);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors["city"].code, "required");
    assert_eq!(result.errors["city"].message, "This field is required");
}

#[test]
fn out_of_range_number_blocks_submission() {
    let form = sample();
    let mut map = responses(&[
        ("relocate", Response::text("no")),
        ("years", Response::text("6")),
    ]);
    let result = validate(&form, &map);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors["years"].message, "Value must be at most 5");

    map.insert("years".into(), Response::text("5"));
    assert!(validate(&form, &map).valid);
}

#[test]
fn stale_answers_of_hidden_questions_do_not_validate() {
    let form = sample();
    let map = responses(&[
        ("relocate", Response::text("no")),
        ("city", Response::text("far too long for the limit")),
        ("years", Response::text("1")),
    ]);
    assert!(validate(&form, &map).valid);
}
