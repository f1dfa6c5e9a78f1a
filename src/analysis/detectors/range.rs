//! Range check
//!
//! Compares every value that flows into a `@IntRange`, `@FloatRange` or
//! `@Size` declaration against the declared constraint. Values are call
//! arguments, `return` values of annotated methods, and assignments to
//! annotated fields, variables and array elements. Literal numbers and
//! strings, array initializers, constants, initialized locals and references
//! to other annotated symbols (optionally narrowed by the `if` conditions
//! around them) are understood.

use super::Detector;
use crate::analysis::flow::{self, Refinement};
use crate::analysis::{Finding, IssueId};
use crate::annotation::AnnotationParser;
use crate::constraint::{FloatRangeConstraint, IntRangeConstraint, RangeConstraint, SizeConstraint};
use crate::model::{
    Annotation, Argument, AssignTarget, Binding, CallSite, ConstantValue, Expr, Function, Location,
    Parameter, ProjectModel, ValueSite,
};
use tracing::{debug, trace};

/// Detector for values outside the declared range
pub struct RangeDetector<'a> {
    parser: &'a AnnotationParser,
    /// Narrow reference constraints with enclosing `if` conditions
    flow_inference: bool,
}

impl<'a> RangeDetector<'a> {
    pub fn new(parser: &'a AnnotationParser) -> Self {
        Self {
            parser,
            flow_inference: true,
        }
    }

    pub fn with_flow_inference(mut self, enabled: bool) -> Self {
        self.flow_inference = enabled;
        self
    }

    /// Merged range constraint of a set of annotations
    fn declared(&self, annotations: &[Annotation], model: &ProjectModel) -> Option<RangeConstraint> {
        match self.parser.merged_constraint(annotations, model) {
            Ok(constraint) => constraint,
            Err(e) => {
                // Reported by the annotation usage check
                debug!("Ignoring malformed annotation: {}", e);
                None
            }
        }
    }

    /// A typedef constant may legitimately lie outside an int range
    fn typedef_exempt(&self, allowed: &RangeConstraint, annotations: &[Annotation], model: &ProjectModel) -> bool {
        matches!(allowed, RangeConstraint::Int(_))
            && annotations
                .iter()
                .any(|a| model.is_typedef(&a.name) || model.is_typedef(a.simple_name()))
    }

    fn check_call(&self, call: &CallSite, function: &Function, model: &ProjectModel, findings: &mut Vec<Finding>) {
        for (parameter, arguments) in bind_arguments(function, call) {
            let Some(allowed) = self.declared(&parameter.annotations, model) else {
                continue;
            };
            if self.typedef_exempt(&allowed, &parameter.annotations, model) {
                trace!("Skipping {}: typedef annotated", parameter.name);
                continue;
            }

            if let (RangeConstraint::Size(size), true) = (&allowed, parameter.is_varargs) {
                let spread = matches!(arguments.as_slice(), [single] if matches!(single.expr, Expr::Array(_) | Expr::SizedArray));
                if !spread {
                    let count = arguments.len() as i64;
                    if !size.is_valid(count) {
                        let location = arguments
                            .first()
                            .map(|a| a.location.clone())
                            .unwrap_or_else(|| call.location.clone());
                        findings.push(Finding::new(IssueId::Range, size.describe_value("size", count), location));
                    }
                    continue;
                }
            }

            for argument in arguments {
                self.report(&allowed, &argument.expr, &argument.location, model, findings);
            }
        }
    }

    /// Check a returned or assigned value against its target declaration
    fn check_value(&self, site: &ValueSite, model: &ProjectModel, findings: &mut Vec<Finding>) {
        let annotations = match &site.target {
            AssignTarget::Annotated(annotations) => annotations.as_slice(),
            AssignTarget::Field { name, class_name } => {
                match model.member_field(class_name.as_deref(), name) {
                    Some(field) => field.annotations.as_slice(),
                    None => return,
                }
            }
        };
        let Some(allowed) = self.declared(annotations, model) else {
            return;
        };
        if self.typedef_exempt(&allowed, annotations, model) {
            return;
        }
        // The size of an array does not constrain its elements
        if site.element && matches!(allowed, RangeConstraint::Size(_)) {
            return;
        }
        self.report(&allowed, &site.expr, &site.location, model, findings);
    }

    fn report(
        &self,
        allowed: &RangeConstraint,
        expr: &Expr,
        location: &Location,
        model: &ProjectModel,
        findings: &mut Vec<Finding>,
    ) {
        let mut messages = Vec::new();
        self.check(allowed, expr, model, &mut messages);
        for message in messages {
            findings.push(Finding::new(IssueId::Range, message, location.clone()));
        }
    }

    fn check(&self, allowed: &RangeConstraint, expr: &Expr, model: &ProjectModel, out: &mut Vec<String>) {
        let expr = initializer_of(expr);
        match expr {
            Expr::Conditional { then_expr, else_expr } => {
                self.check(allowed, then_expr, model, out);
                self.check(allowed, else_expr, model, out);
                return;
            }
            Expr::SizedArray | Expr::Unknown => return,
            _ => {}
        }
        let message = match allowed {
            RangeConstraint::Int(range) => self.int_error(range, expr, model),
            RangeConstraint::Float(range) => self.float_error(range, expr, model),
            RangeConstraint::Size(size) => self.size_error(size, expr, model),
        };
        out.extend(message);
    }

    fn int_error(&self, range: &IntRangeConstraint, expr: &Expr, model: &ProjectModel) -> Option<String> {
        if let Expr::Array(elements) = expr {
            // First failing element only
            let allowed = RangeConstraint::Int(*range);
            return elements.iter().find_map(|element| {
                let mut messages = Vec::new();
                self.check(&allowed, element, model, &mut messages);
                messages.into_iter().next()
            });
        }
        match evaluate(expr, model) {
            Some(value) => int_value_error(range, &value),
            None => self.overlap(&RangeConstraint::Int(*range), expr, model),
        }
    }

    fn float_error(&self, range: &FloatRangeConstraint, expr: &Expr, model: &ProjectModel) -> Option<String> {
        if let Expr::Array(elements) = expr {
            return elements
                .iter()
                .filter_map(|element| evaluate(initializer_of(element), model).and_then(|v| as_double(&v)))
                .find(|value| !range.is_valid(*value))
                .map(|value| range.describe_value(value, None));
        }
        match evaluate(expr, model) {
            Some(ConstantValue::Array(values)) => values
                .iter()
                .filter_map(as_double)
                .find(|value| !range.is_valid(*value))
                .map(|value| range.describe_value(value, None)),
            Some(constant) => {
                let value = as_double(&constant)?;
                let source = match expr {
                    Expr::Literal(literal) => Some(literal.text.as_str()),
                    _ => None,
                };
                (!range.is_valid(value)).then(|| range.describe_value(value, source))
            }
            None => self.overlap(&RangeConstraint::Float(*range), expr, model),
        }
    }

    fn size_error(&self, size: &SizeConstraint, expr: &Expr, model: &ProjectModel) -> Option<String> {
        let (actual, unit) = match expr {
            Expr::Array(elements) => (elements.len() as i64, "size"),
            _ => match evaluate(expr, model) {
                // Java string length counts UTF-16 units
                Some(ConstantValue::Str(text)) => (text.encode_utf16().count() as i64, "length"),
                Some(ConstantValue::Array(values)) => (values.len() as i64, "size"),
                Some(_) => return None,
                None => return self.overlap(&RangeConstraint::Size(*size), expr, model),
            },
        };
        (!size.is_valid(actual)).then(|| size.describe_value(unit, actual))
    }

    /// Constraint declared on the symbol a reference resolves to
    fn reference_constraint(
        &self,
        binding: &Binding,
        name: &str,
        annotations: &[Annotation],
        model: &ProjectModel,
    ) -> Option<RangeConstraint> {
        if !annotations.is_empty() {
            return self.declared(annotations, model);
        }
        match binding {
            Binding::Member { class_name } => model
                .member_field(class_name.as_deref(), name)
                .and_then(|field| self.declared(&field.annotations, model)),
            Binding::Local { .. } | Binding::Unknown => None,
        }
    }

    /// Compares the constraint known for a reference or call result with
    /// the allowed one
    fn overlap(&self, allowed: &RangeConstraint, expr: &Expr, model: &ProjectModel) -> Option<String> {
        let (label, refinement) = match expr {
            Expr::Reference {
                name,
                binding,
                annotations,
                guards,
            } => {
                let declared = self.reference_constraint(binding, name, annotations, model);
                let refinement = if self.flow_inference {
                    flow::refine(declared, guards, name)
                } else {
                    Refinement {
                        constraint: declared,
                        inferred: false,
                    }
                };
                (name, refinement)
            }
            Expr::Call { name, arguments } => {
                let declared = model
                    .functions_named(name)
                    .find(|f| !f.is_constructor && f.accepts_arity(*arguments))
                    .and_then(|f| self.declared(&f.annotations, model));
                (
                    name,
                    Refinement {
                        constraint: declared,
                        inferred: false,
                    },
                )
            }
            _ => return None,
        };

        let actual = refinement.constraint?;
        if allowed.contains(&actual)? {
            return None;
        }
        // An open-ended inferred range may have been narrowed earlier
        if actual.is_infinite() && refinement.inferred {
            return None;
        }
        Some(allowed.describe_delta(&actual, &format!("`{}`", label), ""))
    }
}

impl Detector for RangeDetector<'_> {
    fn issue(&self) -> IssueId {
        IssueId::Range
    }

    fn detect(&self, model: &ProjectModel) -> Vec<Finding> {
        let mut findings = Vec::new();
        for file in model.files() {
            for call in &file.calls {
                if let Some(function) = model.resolve_call(call, &file.path) {
                    self.check_call(call, function, model, &mut findings);
                }
            }
            for site in &file.values {
                self.check_value(site, model, &mut findings);
            }
        }
        findings
    }
}

/// Pairs each parameter with the arguments passed to it; trailing
/// positional arguments all go to a varargs parameter.
fn bind_arguments<'f, 'c>(function: &'f Function, call: &'c CallSite) -> Vec<(&'f Parameter, Vec<&'c Argument>)> {
    let count = function.parameters.len();
    let mut bound: Vec<Vec<&Argument>> = vec![Vec::new(); count];
    let varargs = function
        .parameters
        .last()
        .filter(|p| p.is_varargs)
        .map(|_| count - 1);

    let mut position = 0;
    for argument in &call.arguments {
        let index = match &argument.name {
            Some(name) => function.parameter_named(name).map(|(index, _)| index),
            None => {
                let index = position;
                position += 1;
                match varargs {
                    Some(last) if index >= last => Some(last),
                    _ if index < count => Some(index),
                    _ => None,
                }
            }
        };
        if let Some(index) = index {
            bound[index].push(argument);
        }
    }

    function.parameters.iter().zip(bound).collect()
}

/// Follows an unannotated local to the literal or array it was initialized
/// with; other expressions are returned unchanged
fn initializer_of(expr: &Expr) -> &Expr {
    match expr {
        Expr::Reference {
            binding: Binding::Local { value: Some(value) },
            annotations,
            ..
        } if annotations.is_empty() => match initializer_of(value) {
            resolved @ (Expr::Literal(_) | Expr::Array(_) | Expr::SizedArray) => resolved,
            _ => expr,
        },
        _ => expr,
    }
}

/// Compile-time value of a literal or a reference to a constant
fn evaluate(expr: &Expr, model: &ProjectModel) -> Option<ConstantValue> {
    match expr {
        Expr::Literal(literal) => Some(literal.value.clone()),
        Expr::Reference {
            name,
            binding,
            annotations,
            ..
        } if annotations.is_empty() => match binding {
            Binding::Local { .. } => None,
            Binding::Member { class_name } => model
                .constant_in(class_name.as_deref(), name)
                .map(|c| c.value.clone()),
            Binding::Unknown => model.constant(name).map(|c| c.value.clone()),
        },
        _ => None,
    }
}

fn int_value_error(range: &IntRangeConstraint, value: &ConstantValue) -> Option<String> {
    match value {
        ConstantValue::Int(value) => (!range.is_valid(*value)).then(|| range.describe_value(*value)),
        ConstantValue::Float(value) => {
            let value = *value as i64;
            (!range.is_valid(value)).then(|| range.describe_value(value))
        }
        ConstantValue::Str(_) => None,
        // First failing element only
        ConstantValue::Array(values) => values.iter().find_map(|value| int_value_error(range, value)),
    }
}

fn as_double(value: &ConstantValue) -> Option<f64> {
    match value {
        ConstantValue::Int(v) => Some(*v as f64),
        ConstantValue::Float(v) => Some(*v),
        ConstantValue::Str(_) | ConstantValue::Array(_) => None,
    }
}
