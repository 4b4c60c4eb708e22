//! Built-in role templates used to seed a job's assessment.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::spec::question::{QuestionSpec, QuestionType, ValidationRules};
use crate::spec::section::SectionSpec;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template '{0}' (expected one of: full-stack-developer, product-manager, ui-ux-designer)")]
    UnknownTemplate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    FullStackDeveloper,
    ProductManager,
    UiUxDesigner,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::FullStackDeveloper,
        TemplateKind::ProductManager,
        TemplateKind::UiUxDesigner,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            TemplateKind::FullStackDeveloper => "full-stack-developer",
            TemplateKind::ProductManager => "product-manager",
            TemplateKind::UiUxDesigner => "ui-ux-designer",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TemplateKind::FullStackDeveloper => "Full Stack Developer",
            TemplateKind::ProductManager => "Product Manager",
            TemplateKind::UiUxDesigner => "UI/UX Designer",
        }
    }

    fn seed(&self) -> &'static [SectionSeed] {
        match self {
            TemplateKind::FullStackDeveloper => FULL_STACK,
            TemplateKind::ProductManager => PRODUCT_MANAGER,
            TemplateKind::UiUxDesigner => UI_UX_DESIGNER,
        }
    }

    pub fn section_count(&self) -> usize {
        self.seed().len()
    }

    pub fn question_count(&self) -> usize {
        self.seed().iter().map(|section| section.questions.len()).sum()
    }

    /// Fresh copy of the template with newly generated ids.
    pub fn instantiate(&self) -> Vec<SectionSpec> {
        self.seed().iter().map(SectionSeed::instantiate).collect()
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        TemplateKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| TemplateError::UnknownTemplate(value.to_string()))
    }
}

struct SectionSeed {
    title: &'static str,
    description: &'static str,
    questions: &'static [QuestionSeed],
}

impl SectionSeed {
    fn instantiate(&self) -> SectionSpec {
        let mut section = SectionSpec::new(self.title);
        section.description = Some(self.description.to_string());
        section.questions = self.questions.iter().map(QuestionSeed::instantiate).collect();
        section
    }
}

enum RuleSeed {
    None,
    MaxLength(usize),
    Range(f64, f64),
    File(f64, &'static [&'static str]),
}

struct QuestionSeed {
    kind: QuestionType,
    text: &'static str,
    options: &'static [&'static str],
    rules: RuleSeed,
}

impl QuestionSeed {
    fn instantiate(&self) -> QuestionSpec {
        let mut question = QuestionSpec::new(self.kind);
        question.text = self.text.to_string();
        question.required = true;
        question.options = self.options.iter().map(|option| option.to_string()).collect();
        question.validation = match self.rules {
            RuleSeed::None => ValidationRules::default(),
            RuleSeed::MaxLength(max_length) => ValidationRules::max_length(max_length),
            RuleSeed::Range(min, max) => ValidationRules::range(Some(min), Some(max)),
            RuleSeed::File(max_size, extensions) => {
                ValidationRules::file(Some(max_size), extensions.iter().copied())
            }
        };
        question
    }
}

const fn single(text: &'static str, options: &'static [&'static str]) -> QuestionSeed {
    QuestionSeed {
        kind: QuestionType::SingleChoice,
        text,
        options,
        rules: RuleSeed::None,
    }
}

const fn multi(text: &'static str, options: &'static [&'static str]) -> QuestionSeed {
    QuestionSeed {
        kind: QuestionType::MultiChoice,
        text,
        options,
        rules: RuleSeed::None,
    }
}

const fn long(text: &'static str, max_length: usize) -> QuestionSeed {
    QuestionSeed {
        kind: QuestionType::LongText,
        text,
        options: &[],
        rules: RuleSeed::MaxLength(max_length),
    }
}

const fn rating(text: &'static str) -> QuestionSeed {
    QuestionSeed {
        kind: QuestionType::Numeric,
        text,
        options: &[],
        rules: RuleSeed::Range(1.0, 5.0),
    }
}

const fn file(text: &'static str, max_size: f64, extensions: &'static [&'static str]) -> QuestionSeed {
    QuestionSeed {
        kind: QuestionType::FileUpload,
        text,
        options: &[],
        rules: RuleSeed::File(max_size, extensions),
    }
}

const FULL_STACK: &[SectionSeed] = &[
    SectionSeed {
        title: "Technical Knowledge",
        description: "This section assesses your understanding of fundamental programming concepts and web technologies.",
        questions: &[
            single(
                "Which of the following best describes RESTful architecture?",
                &[
                    "A stateless client-server architecture using HTTP methods",
                    "A database management system",
                    "A frontend framework",
                    "A programming language",
                ],
            ),
            multi(
                "Select all JavaScript array methods that do not mutate the original array:",
                &["map()", "filter()", "push()", "reduce()", "sort()", "concat()"],
            ),
            single(
                "What is the time complexity of a binary search algorithm?",
                &["O(log n)", "O(n)", "O(n log n)", "O(n²)"],
            ),
            long("Explain the concept of database indexing and its importance.", 500),
        ],
    },
    SectionSeed {
        title: "Coding Challenge",
        description: "Write code to solve the following problems.",
        questions: &[
            long(
                "Implement a function to find the first non-repeating character in a string. Provide the complete function implementation in JavaScript.",
                1000,
            ),
            long(
                "How would you design a real-time chat application? Describe the architecture, technologies, and potential scaling considerations.",
                1000,
            ),
            rating("Rate your proficiency in the following technologies (1-5):"),
        ],
    },
    SectionSeed {
        title: "System Design",
        description: "Demonstrate your understanding of system architecture and design patterns.",
        questions: &[
            file(
                "Upload a system design diagram for a social media platform:",
                5.0,
                &["jpg", "png", "pdf"],
            ),
            long("What design patterns have you used in your projects? Explain with examples.", 800),
            long(
                "How would you handle authentication and authorization in a microservices architecture?",
                600,
            ),
        ],
    },
];

const PRODUCT_MANAGER: &[SectionSeed] = &[
    SectionSeed {
        title: "Product Strategy",
        description: "Evaluate strategic thinking and product vision.",
        questions: &[
            long("How do you prioritize features in a product backlog?", 500),
            multi(
                "Which metrics would you track for a B2B SaaS product?",
                &[
                    "Customer Acquisition Cost (CAC)",
                    "Monthly Recurring Revenue (MRR)",
                    "Net Promoter Score (NPS)",
                    "Customer Lifetime Value (CLV)",
                    "Churn Rate",
                    "Feature Adoption Rate",
                ],
            ),
            long("Describe a product you managed from conception to launch.", 1000),
        ],
    },
    SectionSeed {
        title: "User Research",
        description: "Demonstrate your approach to understanding user needs.",
        questions: &[
            multi(
                "Which user research methods do you prefer?",
                &[
                    "User Interviews",
                    "Surveys",
                    "A/B Testing",
                    "Usage Analytics",
                    "Usability Testing",
                    "Focus Groups",
                ],
            ),
            long("How do you validate product-market fit?", 600),
            file(
                "Upload a sample product requirement document:",
                10.0,
                &["pdf", "doc", "docx"],
            ),
        ],
    },
    SectionSeed {
        title: "Problem Solving",
        description: "Analyze your approach to product challenges.",
        questions: &[
            long("How would you reduce customer churn for a subscription-based product?", 800),
            long("What steps would you take to internationalize a product?", 600),
            rating("Rate the importance of these factors in product decisions (1-5):"),
        ],
    },
];

const UI_UX_DESIGNER: &[SectionSeed] = &[
    SectionSeed {
        title: "Design Principles",
        description: "Evaluate understanding of core design principles and best practices.",
        questions: &[
            multi(
                "Which design principles are most important for mobile interfaces?",
                &[
                    "Consistency",
                    "Accessibility",
                    "Visual Hierarchy",
                    "Feedback",
                    "Simplicity",
                    "Progressive Disclosure",
                ],
            ),
            long("Explain the concept of visual hierarchy and its importance.", 500),
            long("How do you ensure accessibility in your designs?", 600),
        ],
    },
    SectionSeed {
        title: "Design Process",
        description: "Share your approach to design challenges.",
        questions: &[
            file("Upload your portfolio or case study:", 20.0, &["pdf", "zip"]),
            long("Describe your design process from research to implementation.", 800),
            multi(
                "Which design tools do you use regularly?",
                &["Figma", "Adobe XD", "Sketch", "InVision", "Principle", "Protopie"],
            ),
        ],
    },
    SectionSeed {
        title: "Practical Challenge",
        description: "Demonstrate your practical design skills.",
        questions: &[
            long("How would you redesign our product's onboarding experience?", 1000),
            multi(
                "What metrics do you use to measure design success?",
                &[
                    "User Engagement",
                    "Task Completion Rate",
                    "User Satisfaction Score",
                    "Time on Task",
                    "Error Rate",
                    "Conversion Rate",
                ],
            ),
            rating("Rate your expertise in the following areas (1-5):"),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_parse_back() {
        for kind in TemplateKind::ALL {
            assert_eq!(kind.slug().parse::<TemplateKind>(), Ok(kind));
        }
        assert_eq!(
            "designer".parse::<TemplateKind>(),
            Err(TemplateError::UnknownTemplate("designer".into()))
        );
    }

    #[test]
    fn every_template_question_is_required() {
        for kind in TemplateKind::ALL {
            let sections = kind.instantiate();
            assert_eq!(sections.len(), 3);
            assert!(
                sections
                    .iter()
                    .flat_map(|section| section.questions.iter())
                    .all(|question| question.required)
            );
        }
        assert_eq!(TemplateKind::FullStackDeveloper.question_count(), 10);
        assert_eq!(TemplateKind::ProductManager.question_count(), 9);
    }
}
