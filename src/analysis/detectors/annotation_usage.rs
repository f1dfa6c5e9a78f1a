//! Annotation usage check
//!
//! Validates the range annotations themselves: empty ranges, negative or
//! inverted sizes, and range annotations placed on types they cannot
//! describe.

use super::Detector;
use crate::analysis::{Finding, IssueId};
use crate::annotation::{AnnotationError, AnnotationParser};
use crate::constraint::RangeConstraint;
use crate::model::{Annotation, ProjectModel};
use tracing::debug;

const INT_TYPES: &[&str] = &["int", "long"];
const FLOAT_TYPES: &[&str] = &["float", "double"];

/// Types whose mismatch is reported; anything else may be an alias or a
/// user type we cannot see through
const KNOWN_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "float", "double", "boolean", "char", "String", "void",
];

pub struct AnnotationUsageDetector<'a> {
    parser: &'a AnnotationParser,
}

impl<'a> AnnotationUsageDetector<'a> {
    pub fn new(parser: &'a AnnotationParser) -> Self {
        Self { parser }
    }

    /// Check the annotations of one declaration with its declared type
    fn check_annotations(
        &self,
        annotations: &[Annotation],
        type_name: Option<&str>,
        model: &ProjectModel,
        findings: &mut Vec<Finding>,
    ) {
        for annotation in annotations {
            if !self.parser.kind(&annotation.name).is_range() {
                continue;
            }
            let mut report = |message: String| {
                findings.push(Finding::new(
                    IssueId::SupportAnnotationUsage,
                    message,
                    annotation.location.clone(),
                ))
            };

            let constraint = match self.parser.annotation_constraint(annotation, model) {
                Ok(Some(constraint)) => constraint,
                Ok(None) => continue,
                Err(AnnotationError::UnresolvedConstant { name, .. }) => {
                    debug!("Cannot check {}: unresolved constant {}", annotation.text, name);
                    continue;
                }
                Err(e) => {
                    report(e.to_string());
                    continue;
                }
            };

            match constraint {
                RangeConstraint::Int(range) => {
                    if let Some(message) = type_name.and_then(|t| type_mismatch(t, INT_TYPES)) {
                        report(message);
                    }
                    if range.from > range.to {
                        report(INVALID_RANGE.to_string());
                    }
                }
                RangeConstraint::Float(range) => {
                    if let Some(message) = type_name.and_then(|t| type_mismatch(t, FLOAT_TYPES)) {
                        report(message);
                    }
                    if range.from > range.to {
                        report(INVALID_RANGE.to_string());
                    }
                }
                RangeConstraint::Size(size) => {
                    if size.min > size.max {
                        report(
                            "Invalid size range: the `min` attribute must be less than the `max` attribute"
                                .to_string(),
                        );
                    } else if size.multiple < 1 {
                        report("The size multiple must be at least 1".to_string());
                    } else if size.min < 0 && size.min != i64::MIN {
                        report("The size can't be negative".to_string());
                    }
                }
            }
        }
    }
}

const INVALID_RANGE: &str = "Invalid range: the `from` attribute must be less than the `to` attribute";

impl Detector for AnnotationUsageDetector<'_> {
    fn issue(&self) -> IssueId {
        IssueId::SupportAnnotationUsage
    }

    fn detect(&self, model: &ProjectModel) -> Vec<Finding> {
        let mut findings = Vec::new();

        for function in model.functions() {
            for parameter in &function.parameters {
                self.check_annotations(
                    &parameter.annotations,
                    parameter.type_name.as_deref(),
                    model,
                    &mut findings,
                );
            }
            // Constructor annotations describe the instance, not a number
            let return_type = if function.is_constructor {
                None
            } else {
                function.return_type.as_deref()
            };
            self.check_annotations(&function.annotations, return_type, model, &mut findings);
        }

        for field in model.fields().iter().chain(model.locals()) {
            self.check_annotations(&field.annotations, field.type_name.as_deref(), model, &mut findings);
        }

        findings
    }
}

/// Message when `type_name` is a known type outside `expected`.
///
/// Arrays, varargs and collections are checked by their element type;
/// `byte` and `short` are accepted wherever integers are.
fn type_mismatch(type_name: &str, expected: &[&str]) -> Option<String> {
    let element = element_type(type_name);
    if expected.contains(&element.as_str()) {
        return None;
    }
    if expected == INT_TYPES && (element == "byte" || element == "short") {
        return None;
    }
    if !KNOWN_TYPES.contains(&element.as_str()) {
        return None;
    }
    Some(format!(
        "This annotation does not apply for type {}; expected {}",
        display_type(type_name),
        expected.join(" or ")
    ))
}

/// Element type of arrays and collections, in Java primitive spelling
fn element_type(type_name: &str) -> String {
    let mut name = type_name.trim().trim_end_matches('?').trim();
    name = name.trim_end_matches("...");
    while let Some(stripped) = name.strip_suffix("[]") {
        name = stripped.trim_end();
    }

    // First type argument of a generic type (`List<Integer>`, `Array<Int>`)
    if let (Some(open), true) = (name.find('<'), name.ends_with('>')) {
        let arguments = &name[open + 1..name.len() - 1];
        let first = arguments.split(',').next().unwrap_or(arguments);
        let first = first.trim().trim_start_matches("out ").trim_start_matches("in ");
        return primitive_name(first.trim().trim_end_matches('?')).to_string();
    }

    let simple = name.rsplit('.').next().unwrap_or(name);
    let element = match simple {
        "IntArray" => "Int",
        "LongArray" => "Long",
        "ShortArray" => "Short",
        "ByteArray" => "Byte",
        "FloatArray" => "Float",
        "DoubleArray" => "Double",
        "BooleanArray" => "Boolean",
        "CharArray" => "Char",
        _ => name,
    };
    primitive_name(element).to_string()
}

/// Maps Kotlin and boxed Java names to the Java primitive name
fn primitive_name(name: &str) -> &str {
    let simple = match name.strip_prefix("java.lang.").or_else(|| name.strip_prefix("kotlin.")) {
        Some(rest) => rest,
        None => name,
    };
    match simple {
        "Int" | "Integer" => "int",
        "Long" => "long",
        "Short" => "short",
        "Byte" => "byte",
        "Float" => "float",
        "Double" => "double",
        "Boolean" => "boolean",
        "Char" | "Character" => "char",
        "Unit" => "void",
        "String" => "String",
        other => other,
    }
}

/// The declared type as shown in messages
fn display_type(type_name: &str) -> String {
    match type_name.trim() {
        "java.lang.String" | "kotlin.String" => "String".to_string(),
        name => name.to_string(),
    }
}
