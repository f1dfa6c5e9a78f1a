//! Annotation adapter
//!
//! Turns `@IntRange`, `@FloatRange` and `@Size` annotation source text into
//! [`RangeConstraint`] values, and recognizes typedef annotations.

mod value;

pub use value::{parse_literal, unescape};

use crate::constraint::{FloatRangeConstraint, IntRangeConstraint, RangeConstraint, SizeConstraint};
use crate::model::{Annotation, ConstantValue};
use regex::Regex;
use thiserror::Error;
use tracing::trace;

/// Packages the range annotations are published under
const ANNOTATION_PACKAGES: &[&str] = &[
    "androidx.annotation",
    "android.support.annotation",
    "android.annotation",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("Malformed annotation: {0}")]
    Malformed(String),

    #[error("Invalid value `{value}` for attribute `{attribute}`")]
    InvalidValue { attribute: String, value: String },

    #[error("Cannot resolve constant `{name}` used for attribute `{attribute}`")]
    UnresolvedConstant { attribute: String, name: String },

    #[error("Unknown attribute `{attribute}` on @{annotation}")]
    UnknownAttribute { annotation: String, attribute: String },
}

/// Looks up project constants referenced from annotation attributes
pub trait ConstantResolver {
    fn resolve(&self, name: &str) -> Option<ConstantValue>;
}

/// Resolver for contexts without project constants
pub struct NoConstants;

impl ConstantResolver for NoConstants {
    fn resolve(&self, _name: &str) -> Option<ConstantValue> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    IntRange,
    FloatRange,
    Size,
    IntDef,
    LongDef,
    Other,
}

impl AnnotationKind {
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            AnnotationKind::IntRange | AnnotationKind::FloatRange | AnnotationKind::Size
        )
    }
}

/// Annotation split into name and raw attribute texts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnnotation {
    pub name: String,
    /// `(attribute, value text)`; a positional argument is named `value`
    pub attributes: Vec<(String, String)>,
}

impl ParsedAnnotation {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Converts annotation text into constraints
pub struct AnnotationParser {
    header_pattern: Regex,
    extra_packages: Vec<String>,
}

impl AnnotationParser {
    pub fn new(extra_packages: &[String]) -> Self {
        // @Name, @Name(...), @param:Name(...)
        let header_pattern = Regex::new(r"(?s)^@\s*(?:[A-Za-z]+\s*:\s*)?([A-Za-z_][\w.]*)\s*(?:\((.*)\))?\s*$")
            .expect("annotation header pattern is valid");
        Self {
            header_pattern,
            extra_packages: extra_packages.to_vec(),
        }
    }

    /// Classify an annotation by its (possibly qualified) name
    pub fn kind(&self, name: &str) -> AnnotationKind {
        let name = name.trim_start_matches('@');
        let (package, simple) = match name.rsplit_once('.') {
            Some((package, simple)) => (Some(package), simple),
            None => (None, name),
        };
        if let Some(package) = package {
            let known = ANNOTATION_PACKAGES.contains(&package)
                || self.extra_packages.iter().any(|extra| extra == package);
            if !known {
                return AnnotationKind::Other;
            }
        }
        match simple {
            "IntRange" => AnnotationKind::IntRange,
            "FloatRange" => AnnotationKind::FloatRange,
            "Size" => AnnotationKind::Size,
            "IntDef" => AnnotationKind::IntDef,
            "LongDef" => AnnotationKind::LongDef,
            _ => AnnotationKind::Other,
        }
    }

    pub fn parse(&self, text: &str) -> Result<ParsedAnnotation, AnnotationError> {
        let captures = self
            .header_pattern
            .captures(text.trim())
            .ok_or_else(|| AnnotationError::Malformed(text.to_string()))?;
        let name = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| AnnotationError::Malformed(text.to_string()))?;

        let mut attributes = Vec::new();
        if let Some(arguments) = captures.get(2) {
            for argument in split_arguments(arguments.as_str()) {
                match split_named(&argument) {
                    Some((attribute, value)) => attributes.push((attribute, value)),
                    None => attributes.push(("value".to_string(), argument)),
                }
            }
        }

        Ok(ParsedAnnotation { name, attributes })
    }

    /// Constraint for a single annotation; `Ok(None)` when it is not a
    /// range or size annotation.
    pub fn constraint(
        &self,
        text: &str,
        resolver: &dyn ConstantResolver,
    ) -> Result<Option<RangeConstraint>, AnnotationError> {
        let parsed = self.parse(text)?;
        let kind = self.kind(&parsed.name);
        self.build(&parsed, kind, resolver)
    }

    /// Constraint of a source annotation, classified by its name after
    /// import resolution rather than by the name written in its text
    pub fn annotation_constraint(
        &self,
        annotation: &Annotation,
        resolver: &dyn ConstantResolver,
    ) -> Result<Option<RangeConstraint>, AnnotationError> {
        let kind = self.kind(&annotation.name);
        if !kind.is_range() {
            return Ok(None);
        }
        let parsed = self.parse(&annotation.text)?;
        self.build(&parsed, kind, resolver)
    }

    fn build(
        &self,
        parsed: &ParsedAnnotation,
        kind: AnnotationKind,
        resolver: &dyn ConstantResolver,
    ) -> Result<Option<RangeConstraint>, AnnotationError> {
        trace!("Annotation {} classified as {:?}", parsed.name, kind);

        let constraint = match kind {
            AnnotationKind::IntRange => {
                let mut range = IntRangeConstraint::range(i64::MIN, i64::MAX);
                for (attribute, text) in &parsed.attributes {
                    match attribute.as_str() {
                        "from" => range.from = value::parse_long(attribute, text, resolver)?,
                        "to" => range.to = value::parse_long(attribute, text, resolver)?,
                        _ => return Err(unknown(parsed, attribute)),
                    }
                }
                RangeConstraint::Int(range)
            }
            AnnotationKind::FloatRange => {
                let mut range = FloatRangeConstraint::range(f64::NEG_INFINITY, f64::INFINITY);
                for (attribute, text) in &parsed.attributes {
                    match attribute.as_str() {
                        "from" => range.from = value::parse_double(attribute, text, resolver)?,
                        "to" => range.to = value::parse_double(attribute, text, resolver)?,
                        "fromInclusive" => range.from_inclusive = value::parse_bool(attribute, text)?,
                        "toInclusive" => range.to_inclusive = value::parse_bool(attribute, text)?,
                        _ => return Err(unknown(parsed, attribute)),
                    }
                }
                RangeConstraint::Float(range)
            }
            AnnotationKind::Size => {
                let mut size = SizeConstraint::default();
                for (attribute, text) in &parsed.attributes {
                    match attribute.as_str() {
                        "value" => {
                            let exact = value::parse_long(attribute, text, resolver)?;
                            size.min = exact;
                            size.max = exact;
                        }
                        "min" => size.min = value::parse_long(attribute, text, resolver)?,
                        "max" => size.max = value::parse_long(attribute, text, resolver)?,
                        "multiple" => size.multiple = value::parse_long(attribute, text, resolver)?,
                        _ => return Err(unknown(parsed, attribute)),
                    }
                }
                RangeConstraint::Size(size)
            }
            _ => return Ok(None),
        };
        Ok(Some(constraint))
    }

    /// Intersection of all range annotations of a declaration
    pub fn merged_constraint(
        &self,
        annotations: &[Annotation],
        resolver: &dyn ConstantResolver,
    ) -> Result<Option<RangeConstraint>, AnnotationError> {
        let mut merged: Option<RangeConstraint> = None;
        for annotation in annotations {
            if let Some(constraint) = self.annotation_constraint(annotation, resolver)? {
                merged = Some(match merged {
                    Some(previous) => previous.and(&constraint),
                    None => constraint,
                });
            }
        }
        Ok(merged)
    }
}

impl Default for AnnotationParser {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Constraint of one annotation, recognizing only the standard packages and
/// no project constants
pub fn parse_annotation(text: &str) -> Result<Option<RangeConstraint>, AnnotationError> {
    AnnotationParser::default().constraint(text, &NoConstants)
}

fn unknown(parsed: &ParsedAnnotation, attribute: &str) -> AnnotationError {
    AnnotationError::UnknownAttribute {
        annotation: parsed.simple_name().to_string(),
        attribute: attribute.to_string(),
    }
}

/// Split an argument list on top-level commas
fn split_arguments(text: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                arguments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        arguments.push(current.trim().to_string());
    }
    arguments
}

/// `from = 5` -> `("from", "5")`; `None` for positional arguments
fn split_named(argument: &str) -> Option<(String, String)> {
    let (name, value) = argument.split_once('=')?;
    let name = name.trim();
    let is_identifier = name.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    // `==` belongs to an expression, not an assignment
    if !is_identifier || value.starts_with('=') {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct Constants(HashMap<String, ConstantValue>);

    impl ConstantResolver for Constants {
        fn resolve(&self, name: &str) -> Option<ConstantValue> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn test_parse_annotation() {
        assert_eq!(
            parse_annotation("@IntRange(from = 1, to = 3)"),
            Ok(Some(RangeConstraint::Int(IntRangeConstraint::range(1, 3))))
        );
        assert_eq!(parse_annotation("@NonNull"), Ok(None));
        assert!(parse_annotation("@Size(foo = 1)").is_err());
    }

    fn constraint(text: &str) -> Option<RangeConstraint> {
        AnnotationParser::default().constraint(text, &NoConstants).unwrap()
    }

    #[test]
    fn test_parse_header() {
        let parser = AnnotationParser::default();
        let parsed = parser.parse("@IntRange(from = 5, to = 10)").unwrap();
        assert_eq!(parsed.name, "IntRange");
        assert_eq!(parsed.attribute("from"), Some("5"));
        assert_eq!(parsed.attribute("to"), Some("10"));

        let parsed = parser.parse("@Size(3)").unwrap();
        assert_eq!(parsed.attribute("value"), Some("3"));

        let parsed = parser.parse("@androidx.annotation.Size").unwrap();
        assert_eq!(parsed.simple_name(), "Size");
        assert!(parsed.attributes.is_empty());

        let parsed = parser.parse("@param:FloatRange(from = 0.0)").unwrap();
        assert_eq!(parsed.name, "FloatRange");

        assert!(parser.parse("IntRange(from = 1)").is_err());
    }

    #[test]
    fn test_kind() {
        let parser = AnnotationParser::new(&["com.example.annotations".to_string()]);
        assert_eq!(parser.kind("IntRange"), AnnotationKind::IntRange);
        assert_eq!(parser.kind("androidx.annotation.FloatRange"), AnnotationKind::FloatRange);
        assert_eq!(parser.kind("android.support.annotation.Size"), AnnotationKind::Size);
        assert_eq!(parser.kind("android.annotation.IntRange"), AnnotationKind::IntRange);
        assert_eq!(parser.kind("com.example.annotations.IntRange"), AnnotationKind::IntRange);
        assert_eq!(parser.kind("org.other.IntRange"), AnnotationKind::Other);
        assert_eq!(parser.kind("IntDef"), AnnotationKind::IntDef);
        assert_eq!(parser.kind("Nullable"), AnnotationKind::Other);
    }

    #[test]
    fn test_int_range() {
        assert_eq!(
            constraint("@IntRange(from = 5, to = 10)"),
            Some(RangeConstraint::Int(IntRangeConstraint::range(5, 10)))
        );
        assert_eq!(
            constraint("@IntRange(from=0)"),
            Some(RangeConstraint::Int(IntRangeConstraint::at_least(0)))
        );
        assert_eq!(
            constraint("@IntRange(to = Long.MAX_VALUE)"),
            Some(RangeConstraint::Int(IntRangeConstraint::range(i64::MIN, i64::MAX)))
        );
    }

    #[test]
    fn test_float_range() {
        assert_eq!(
            constraint("@androidx.annotation.FloatRange(from=0.0, to=1.0, fromInclusive=false)"),
            Some(RangeConstraint::Float(FloatRangeConstraint::new(0.0, 1.0, false, true)))
        );
        assert_eq!(
            constraint("@FloatRange(from = 2.5f)"),
            Some(RangeConstraint::Float(FloatRangeConstraint::at_least(2.5)))
        );
    }

    #[test]
    fn test_size() {
        assert_eq!(
            constraint("@Size(3)"),
            Some(RangeConstraint::Size(SizeConstraint::exactly(3)))
        );
        assert_eq!(
            constraint("@Size(min = 3, multiple = 2)"),
            Some(RangeConstraint::Size(SizeConstraint::min(3).with_multiple(2)))
        );
        assert_eq!(
            constraint("@Size(max=10)"),
            Some(RangeConstraint::Size(SizeConstraint::max(10)))
        );
    }

    #[test]
    fn test_non_range_annotations() {
        assert_eq!(constraint("@Nullable"), None);
        assert_eq!(constraint("@StringRes"), None);
    }

    #[test]
    fn test_errors() {
        let parser = AnnotationParser::default();
        assert!(matches!(
            parser.constraint("@IntRange(from = LIMIT)", &NoConstants),
            Err(AnnotationError::UnresolvedConstant { .. })
        ));
        assert!(matches!(
            parser.constraint("@IntRange(start = 1)", &NoConstants),
            Err(AnnotationError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            parser.constraint("@FloatRange(fromInclusive = maybe)", &NoConstants),
            Err(AnnotationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_resolver() {
        let mut constants = HashMap::new();
        constants.insert("LIMIT".to_string(), ConstantValue::Int(42));
        let constants = Constants(constants);
        let parser = AnnotationParser::default();
        assert_eq!(
            parser.constraint("@IntRange(from = 0, to = Limits.LIMIT)", &constants).unwrap(),
            Some(RangeConstraint::Int(IntRangeConstraint::range(0, 42)))
        );
    }

    fn annotation(name: &str, text: &str) -> Annotation {
        Annotation::new(name, text, Location::new(PathBuf::from("A.java"), 1, 1, 0, 0))
    }

    #[test]
    fn test_merged_constraint() {
        let parser = AnnotationParser::default();
        let merged = parser
            .merged_constraint(
                &[
                    annotation("IntRange", "@IntRange(from = 0)"),
                    annotation("Nullable", "@Nullable"),
                    annotation("IntRange", "@IntRange(to = 10)"),
                ],
                &NoConstants,
            )
            .unwrap();
        assert_eq!(merged, Some(RangeConstraint::Int(IntRangeConstraint::range(0, 10))));
    }

    #[test]
    fn test_imported_name_decides_kind() {
        let parser = AnnotationParser::default();
        let foreign = annotation("javax.validation.constraints.Size", "@Size(max = 3)");
        assert_eq!(parser.annotation_constraint(&foreign, &NoConstants), Ok(None));
        assert_eq!(parser.merged_constraint(&[foreign], &NoConstants), Ok(None));

        let android = annotation("androidx.annotation.Size", "@Size(max = 3)");
        assert_eq!(
            parser.annotation_constraint(&android, &NoConstants),
            Ok(Some(RangeConstraint::Size(SizeConstraint::max(3))))
        );
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments(r#"from = 1, to = max(2, 3), label = "a,b""#),
            vec!["from = 1", "to = max(2, 3)", r#"label = "a,b""#]
        );
    }
}
