// Java front end: functions, annotated symbols, constants, call sites and
// the values written to annotated declarations

use super::common::{
    children_of_kind, combine, constant_of, literal_expr, named_children, node_location, operand_of,
    simple_name, BodyContext, ImportMap, ParseResult, Parser,
};
use crate::annotation::parse_literal;
use crate::model::{
    Annotation, Argument, AssignTarget, Binding, CallSite, CompareOp, Condition, Constant, Expr, Field,
    Function, Guard, Language, Parameter, Typedef, ValueSite,
};
use miette::{IntoDiagnostic, Result};
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Parser as TsParser};
use tracing::debug;

/// Java source code parser using tree-sitter
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for JavaParser {
    fn parse(&self, path: &Path, contents: &str) -> Result<ParseResult> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_java::language())
            .into_diagnostic()?;

        let tree = parser
            .parse(contents, None)
            .ok_or_else(|| miette::miette!("Failed to parse Java file"))?;

        let mut extractor = JavaExtractor {
            path,
            source: contents,
            imports: ImportMap::default(),
            result: ParseResult::new(),
        };
        let root = tree.root_node();
        extractor.result.package = extractor.extract_package(root);
        extractor.extract_imports(root);
        extractor.visit_declarations(root, None);

        debug!(
            "Parsed {}: {} functions, {} calls, {} value sites",
            path.display(),
            extractor.result.functions.len(),
            extractor.result.calls.len(),
            extractor.result.values.len()
        );

        Ok(extractor.result)
    }
}

const LITERAL_KINDS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "string_literal",
];

struct JavaExtractor<'a> {
    path: &'a Path,
    source: &'a str,
    imports: ImportMap,
    result: ParseResult,
}

impl<'a> JavaExtractor<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    fn extract_package(&self, root: Node) -> Option<String> {
        let package = children_of_kind(root, "package_declaration").into_iter().next()?;
        named_children(package)
            .into_iter()
            .find(|child| child.kind() == "scoped_identifier" || child.kind() == "identifier")
            .map(|child| self.text(child).to_string())
    }

    /// Single-type imports; static and on-demand imports name no annotation
    fn extract_imports(&mut self, root: Node) {
        for import in children_of_kind(root, "import_declaration") {
            let mut cursor = import.walk();
            let is_static = import.children(&mut cursor).any(|c| c.kind() == "static");
            let children = named_children(import);
            if is_static || children.iter().any(|c| c.kind() == "asterisk") {
                continue;
            }
            if let Some(name) = children
                .iter()
                .find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier")
            {
                self.imports.add(self.text(*name), None);
            }
        }
    }

    fn visit_declarations(&mut self, node: Node, class_name: Option<&str>) {
        for child in named_children(node) {
            match child.kind() {
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string());
                    if let Some(body) = child.child_by_field_name("body") {
                        self.visit_declarations(body, name.as_deref());
                    }
                }
                "enum_body_declarations" => self.visit_declarations(child, class_name),
                "annotation_type_declaration" => self.extract_typedef(child),
                "method_declaration" => self.extract_method(child, class_name, false),
                "constructor_declaration" | "compact_constructor_declaration" => {
                    self.extract_method(child, class_name, true)
                }
                "field_declaration" | "constant_declaration" => self.extract_field(child, class_name),
                "static_initializer" | "block" => {
                    let mut context = self.body_context(class_name, child, Vec::new());
                    self.walk(child, &mut context);
                }
                _ => self.visit_declarations(child, class_name),
            }
        }
    }

    /// Context for a body, knowing which locals it reassigns
    fn body_context(&self, class_name: Option<&str>, body: Node, returns: Vec<Annotation>) -> BodyContext {
        let mut context = BodyContext::new(class_name);
        context.returns = returns;
        self.collect_assigned(body, &mut context.reassigned);
        context
    }

    fn collect_assigned(&self, node: Node, names: &mut HashSet<String>) {
        match node.kind() {
            "assignment_expression" => {
                if let Some(name) = node.child_by_field_name("left").and_then(|l| self.written_name(l)) {
                    names.insert(name.to_string());
                }
            }
            "update_expression" => {
                for operand in named_children(node) {
                    if let Some(name) = self.written_name(operand) {
                        names.insert(name.to_string());
                    }
                }
            }
            _ => {}
        }
        for child in named_children(node) {
            self.collect_assigned(child, names);
        }
    }

    /// Variable written through `name = ...` or `name[i] = ...`
    fn written_name(&self, node: Node) -> Option<&'a str> {
        match node.kind() {
            "identifier" => Some(self.text(node)),
            "array_access" => node.child_by_field_name("array").and_then(|a| self.written_name(a)),
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .and_then(|inner| self.written_name(inner)),
            _ => None,
        }
    }

    fn annotations(&self, node: Node) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for modifiers in children_of_kind(node, "modifiers") {
            for modifier in named_children(modifiers) {
                if modifier.kind() == "marker_annotation" || modifier.kind() == "annotation" {
                    let name = modifier
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or("");
                    annotations.push(Annotation::new(
                        self.imports.qualify(name),
                        self.text(modifier),
                        node_location(self.path, modifier),
                    ));
                }
            }
        }
        annotations
    }

    fn has_modifier(&self, node: Node, keyword: &str) -> bool {
        children_of_kind(node, "modifiers").into_iter().any(|modifiers| {
            let mut cursor = modifiers.walk();
            let found = modifiers
                .children(&mut cursor)
                .any(|m| self.text(m) == keyword);
            found
        })
    }

    fn extract_typedef(&mut self, node: Node) {
        let is_typedef = self
            .annotations(node)
            .iter()
            .any(|a| matches!(a.simple_name(), "IntDef" | "LongDef"));
        if !is_typedef {
            return;
        }
        if let Some(name) = node.child_by_field_name("name") {
            let name = self.text(name).to_string();
            let qualified_name = self.result.package.as_ref().map(|p| format!("{}.{}", p, name));
            self.result.typedefs.push(Typedef {
                name,
                qualified_name,
                location: node_location(self.path, node),
            });
        }
    }

    fn extract_method(&mut self, node: Node, class_name: Option<&str>, is_constructor: bool) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .or_else(|| class_name.map(str::to_string))
            .unwrap_or_else(|| "<init>".to_string());

        let parameters = node
            .child_by_field_name("parameters")
            .map(|params| self.extract_parameters(params))
            .unwrap_or_default();
        let annotations = self.annotations(node);

        let function = Function {
            name,
            class_name: class_name.map(str::to_string),
            is_constructor,
            parameters,
            return_type: node
                .child_by_field_name("type")
                .map(|t| self.text(t).to_string()),
            annotations,
            language: Language::Java,
            location: node_location(self.path, node),
        };

        if let Some(body) = node.child_by_field_name("body") {
            let returns = if is_constructor {
                Vec::new()
            } else {
                function.annotations.clone()
            };
            let mut context = self.body_context(class_name, body, returns);
            for parameter in &function.parameters {
                context.declare(&parameter.name, parameter.annotations.clone(), None);
            }
            self.result.functions.push(function);
            self.walk(body, &mut context);
        } else {
            self.result.functions.push(function);
        }
    }

    fn extract_parameters(&self, node: Node) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "formal_parameter" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    let mut type_name = child
                        .child_by_field_name("type")
                        .map(|t| self.text(t).to_string());
                    // `int values[]`
                    if let (Some(t), Some(_)) = (&mut type_name, child.child_by_field_name("dimensions")) {
                        t.push_str("[]");
                    }
                    parameters.push(Parameter {
                        name,
                        type_name,
                        annotations: self.annotations(child),
                        is_varargs: false,
                        location: node_location(self.path, child),
                    });
                }
                "spread_parameter" => {
                    let declarator = children_of_kind(child, "variable_declarator").into_iter().next();
                    let name = declarator
                        .and_then(|d| d.child_by_field_name("name"))
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    let type_name = named_children(child)
                        .into_iter()
                        .find(|n| n.kind() != "modifiers" && n.kind() != "variable_declarator")
                        .map(|t| format!("{}...", self.text(t)));
                    parameters.push(Parameter {
                        name,
                        type_name,
                        annotations: self.annotations(child),
                        is_varargs: true,
                        location: node_location(self.path, child),
                    });
                }
                _ => {}
            }
        }
        parameters
    }

    fn extract_field(&mut self, node: Node, class_name: Option<&str>) {
        let annotations = self.annotations(node);
        let type_name = node
            .child_by_field_name("type")
            .map(|t| self.text(t).to_string());
        let is_constant = node.kind() == "constant_declaration"
            || (self.has_modifier(node, "static") && self.has_modifier(node, "final"));

        for declarator in children_of_kind(node, "variable_declarator") {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node).to_string();

            if !annotations.is_empty() {
                self.result.fields.push(Field {
                    name: name.clone(),
                    class_name: class_name.map(str::to_string),
                    type_name: type_name.clone(),
                    annotations: annotations.clone(),
                    location: node_location(self.path, declarator),
                });
            }

            if let Some(value) = declarator.child_by_field_name("value") {
                let mut context = self.body_context(class_name, value, Vec::new());
                let expr = self.expr(value, &context);
                let text = self.text(value);
                if is_constant {
                    if let Some(constant) = constant_of(&expr).or_else(|| parse_literal(text)) {
                        self.result.constants.push(Constant {
                            name: name.clone(),
                            class_name: class_name.map(str::to_string),
                            value: constant,
                            text: text.to_string(),
                        });
                    }
                }
                self.add_value(AssignTarget::Annotated(annotations.clone()), false, expr, value);
                self.walk(value, &mut context);
            }
        }
    }

    fn add_value(&mut self, target: AssignTarget, element: bool, expr: Expr, node: Node) {
        let empty = matches!(&target, AssignTarget::Annotated(annotations) if annotations.is_empty());
        if empty || expr == Expr::Unknown {
            return;
        }
        self.result.values.push(ValueSite {
            target,
            element,
            expr,
            location: node_location(self.path, node),
        });
    }

    /// Declaration written by an assignment to `node`, and whether an array
    /// element of it is written
    fn assign_target(&self, node: Node, context: &BodyContext) -> Option<(AssignTarget, bool)> {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                let target = if context.scope.contains(name) {
                    AssignTarget::Annotated(context.scope.annotations_of(name))
                } else {
                    AssignTarget::Field {
                        name: name.to_string(),
                        class_name: context.class_name.clone(),
                    }
                };
                Some((target, false))
            }
            "field_access" => {
                let name = self.text(node.child_by_field_name("field")?).to_string();
                let object = node.child_by_field_name("object")?;
                let class_name = match object.kind() {
                    "this" => context.class_name.clone(),
                    "identifier" | "field_access" if !context.scope.contains(self.text(object)) => {
                        Some(simple_name(self.text(object)).to_string())
                    }
                    _ => return None,
                };
                Some((AssignTarget::Field { name, class_name }, false))
            }
            "array_access" => {
                let array = node.child_by_field_name("array")?;
                self.assign_target(array, context).map(|(target, _)| (target, true))
            }
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .and_then(|inner| self.assign_target(inner, context)),
            _ => None,
        }
    }

    /// Walk statements and expressions, recording calls under the current
    /// guards and values written to annotated declarations
    fn walk(&mut self, node: Node, context: &mut BodyContext) {
        match node.kind() {
            "local_variable_declaration" => {
                let annotations = self.annotations(node);
                let type_name = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string());
                for declarator in children_of_kind(node, "variable_declarator") {
                    let value = declarator.child_by_field_name("value");
                    let expr = value.map(|value| self.expr(value, context));
                    if let Some(value) = value {
                        self.walk(value, context);
                    }
                    let Some(name_node) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let name = self.text(name_node);
                    if !annotations.is_empty() {
                        self.result.locals.push(Field {
                            name: name.to_string(),
                            class_name: None,
                            type_name: type_name.clone(),
                            annotations: annotations.clone(),
                            location: node_location(self.path, declarator),
                        });
                    }
                    if let (Some(value), Some(expr)) = (value, &expr) {
                        self.add_value(AssignTarget::Annotated(annotations.clone()), false, expr.clone(), value);
                    }
                    context.declare(name, annotations.clone(), expr);
                }
            }
            "return_statement" => {
                if !context.returns.is_empty() {
                    let value = named_children(node)
                        .into_iter()
                        .find(|child| !child.kind().ends_with("comment"));
                    if let Some(value) = value {
                        let expr = self.expr(value, context);
                        self.add_value(AssignTarget::Annotated(context.returns.clone()), false, expr, value);
                    }
                }
                self.walk_children(node, context);
            }
            "assignment_expression" => {
                let is_plain = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| self.text(op) == "=");
                if let (true, Some(left), Some(right)) = (
                    is_plain,
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    if let Some((target, element)) = self.assign_target(left, context) {
                        let expr = self.expr(right, context);
                        self.add_value(target, element, expr, right);
                    }
                }
                self.walk_children(node, context);
            }
            "if_statement" => {
                let condition_node = node.child_by_field_name("condition");
                let condition = match condition_node {
                    Some(condition_node) => {
                        self.walk(condition_node, context);
                        self.condition(condition_node, context)
                    }
                    None => Condition::Other,
                };
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.walk_guarded(consequence, context, condition.clone(), true);
                }
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.walk_guarded(alternative, context, condition, false);
                }
            }
            "method_invocation" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let arguments = node
                        .child_by_field_name("arguments")
                        .map(|args| self.arguments(args, context))
                        .unwrap_or_default();
                    let call = CallSite {
                        callee: self.text(name).to_string(),
                        is_constructor: false,
                        arguments,
                        location: node_location(self.path, name),
                    };
                    self.result.calls.push(call);
                }
                self.walk_children(node, context);
            }
            "object_creation_expression" => {
                if let Some(type_node) = node.child_by_field_name("type") {
                    let type_text = self.text(type_node);
                    let type_text = type_text.split('<').next().unwrap_or(type_text);
                    let arguments = node
                        .child_by_field_name("arguments")
                        .map(|args| self.arguments(args, context))
                        .unwrap_or_default();
                    let call = CallSite {
                        callee: simple_name(type_text.trim()).to_string(),
                        is_constructor: true,
                        arguments,
                        location: node_location(self.path, node),
                    };
                    self.result.calls.push(call);
                }
                self.walk_children(node, context);
            }
            "enhanced_for_statement" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value, context);
                }
                let saved = context.scope.clone();
                if let Some(name) = node.child_by_field_name("name") {
                    context.declare(self.text(name), self.annotations(node), None);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(body, context);
                }
                context.scope = saved;
            }
            "lambda_expression" => {
                let mut inner = context.nested();
                if let Some(parameters) = node.child_by_field_name("parameters") {
                    for name in self.lambda_parameters(parameters) {
                        inner.declare(name, Vec::new(), None);
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(body, &mut inner);
                }
            }
            "class_body" => {
                // Members of an anonymous class get their own bodies
                let class_name = context.class_name.clone();
                self.visit_declarations(node, class_name.as_deref());
            }
            "block" => {
                let saved = context.scope.clone();
                self.walk_children(node, context);
                context.scope = saved;
            }
            _ => self.walk_children(node, context),
        }
    }

    fn lambda_parameters(&self, node: Node) -> Vec<&'a str> {
        match node.kind() {
            "identifier" => vec![self.text(node)],
            _ => named_children(node)
                .into_iter()
                .filter_map(|child| match child.kind() {
                    "identifier" => Some(self.text(child)),
                    "formal_parameter" => child.child_by_field_name("name").map(|n| self.text(n)),
                    _ => None,
                })
                .collect(),
        }
    }

    fn walk_children(&mut self, node: Node, context: &mut BodyContext) {
        for child in named_children(node) {
            self.walk(child, context);
        }
    }

    fn walk_guarded(&mut self, node: Node, context: &mut BodyContext, condition: Condition, then_branch: bool) {
        context.guards.push(Guard {
            condition,
            then_branch,
        });
        self.walk(node, context);
        context.guards.pop();
    }

    fn arguments(&self, node: Node, context: &BodyContext) -> Vec<Argument> {
        named_children(node)
            .into_iter()
            .filter(|child| !child.kind().ends_with("comment"))
            .map(|child| Argument {
                name: None,
                expr: self.expr(child, context),
                text: self.text(child).to_string(),
                location: node_location(self.path, child),
            })
            .collect()
    }

    fn expr(&self, node: Node, context: &BodyContext) -> Expr {
        let kind = node.kind();
        if LITERAL_KINDS.contains(&kind) {
            return literal_expr(self.text(node));
        }
        match kind {
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                let operand = node.child_by_field_name("operand");
                match (operator, operand) {
                    ("-" | "+", Some(operand)) if LITERAL_KINDS.contains(&operand.kind()) => {
                        let text: String = self.text(node).split_whitespace().collect();
                        literal_expr(&text)
                    }
                    _ => Expr::Unknown,
                }
            }
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.expr(inner, context))
                .unwrap_or(Expr::Unknown),
            "cast_expression" => node
                .child_by_field_name("value")
                .map(|value| self.expr(value, context))
                .unwrap_or(Expr::Unknown),
            "identifier" => context.reference(self.text(node)),
            "field_access" => {
                let (Some(field), Some(object)) = (
                    node.child_by_field_name("field"),
                    node.child_by_field_name("object"),
                ) else {
                    return Expr::Unknown;
                };
                let field = self.text(field);
                match object.kind() {
                    "this" => context.member_reference(field, None),
                    "identifier" | "field_access" => {
                        context.member_reference(field, Some(self.text(object)))
                    }
                    _ => Expr::Reference {
                        name: field.to_string(),
                        binding: Binding::Unknown,
                        annotations: Vec::new(),
                        guards: context.guards.clone(),
                    },
                }
            }
            "ternary_expression" => {
                match (
                    node.child_by_field_name("consequence"),
                    node.child_by_field_name("alternative"),
                ) {
                    (Some(then_node), Some(else_node)) => Expr::Conditional {
                        then_expr: Box::new(self.expr(then_node, context)),
                        else_expr: Box::new(self.expr(else_node, context)),
                    },
                    _ => Expr::Unknown,
                }
            }
            "array_creation_expression" => match node.child_by_field_name("value") {
                Some(initializer) => self.expr(initializer, context),
                None => Expr::SizedArray,
            },
            "array_initializer" => Expr::Array(
                named_children(node)
                    .into_iter()
                    .filter(|child| !child.kind().ends_with("comment"))
                    .map(|child| self.expr(child, context))
                    .collect(),
            ),
            "method_invocation" => match node.child_by_field_name("name") {
                Some(name) => Expr::Call {
                    name: self.text(name).to_string(),
                    arguments: node
                        .child_by_field_name("arguments")
                        .map(|args| named_children(args).len())
                        .unwrap_or(0),
                },
                None => Expr::Unknown,
            },
            _ => Expr::Unknown,
        }
    }

    fn condition(&self, node: Node, context: &BodyContext) -> Condition {
        match node.kind() {
            "parenthesized_expression" | "condition" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.condition(inner, context))
                .unwrap_or(Condition::Other),
            "binary_expression" => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    return Condition::Other;
                };
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                match operator {
                    "&&" | "||" => combine(
                        operator,
                        self.condition(left, context),
                        self.condition(right, context),
                    ),
                    _ => match CompareOp::from_token(operator) {
                        Some(op) => Condition::Compare {
                            left: operand_of(&self.expr(left, context)),
                            op,
                            right: operand_of(&self.expr(right, context)),
                        },
                        None => Condition::Other,
                    },
                }
            }
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                match (operator, node.child_by_field_name("operand")) {
                    ("!", Some(operand)) => Condition::Not(Box::new(self.condition(operand, context))),
                    _ => Condition::Other,
                }
            }
            _ => Condition::Other,
        }
    }
}
