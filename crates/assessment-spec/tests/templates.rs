use std::collections::BTreeSet;

use assessment_spec::{FormSpec, QuestionType, TemplateKind, validate};

#[test]
fn instantiation_generates_fresh_ids() {
    let first = TemplateKind::ProductManager.instantiate();
    let second = TemplateKind::ProductManager.instantiate();

    let ids = |sections: &[assessment_spec::SectionSpec]| -> BTreeSet<String> {
        sections
            .iter()
            .flat_map(|section| {
                std::iter::once(section.id.clone())
                    .chain(section.questions.iter().map(|question| question.id.clone()))
            })
            .collect()
    };
    assert!(ids(&first).is_disjoint(&ids(&second)));
    assert_eq!(first[0].title, second[0].title);
}

#[test]
fn templates_pass_integrity_checks() {
    for kind in TemplateKind::ALL {
        let form = FormSpec::new("1", kind.instantiate());
        assert!(form.integrity_issues().is_empty(), "{kind}");
    }
}

#[test]
fn full_stack_template_content() {
    let sections = TemplateKind::FullStackDeveloper.instantiate();
    let titles: Vec<_> = sections.iter().map(|section| section.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Technical Knowledge", "Coding Challenge", "System Design"]
    );

    let upload = &sections[2].questions[0];
    assert_eq!(upload.kind, QuestionType::FileUpload);
    assert_eq!(upload.validation.max_size, Some(5.0));
    let allowed = upload
        .validation
        .allowed_extensions
        .clone()
        .expect("extensions");
    assert!(allowed.contains("png"));

    let rating = &sections[1].questions[2];
    assert_eq!(rating.kind, QuestionType::Numeric);
    assert_eq!(rating.validation.min, Some(1.0));
    assert_eq!(rating.validation.max, Some(5.0));
}

#[test]
fn empty_template_form_requires_every_answer() {
    let form = FormSpec::new("1", TemplateKind::UiUxDesigner.instantiate());
    let result = validate(&form, &Default::default());
    assert_eq!(result.errors.len(), form.questions().count());
}
