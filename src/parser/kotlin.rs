// Kotlin front end: functions, annotated symbols, constants, call sites and
// the values written to annotated declarations

use super::common::{
    children_of_kind, combine, constant_of, literal_expr, named_children, node_location,
    operand_of, operator_token, BodyContext, ImportMap, ParseResult, Parser,
};
use crate::annotation::parse_literal;
use crate::model::{
    Annotation, Argument, AssignTarget, Binding, CallSite, CompareOp, Condition, Constant,
    ConstantValue, Expr, Field, Function, Guard, Language, Parameter, Typedef, ValueSite,
};
use miette::{IntoDiagnostic, Result};
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Parser as TsParser};
use tracing::debug;

/// Kotlin source code parser using tree-sitter
pub struct KotlinParser;

impl KotlinParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KotlinParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for KotlinParser {
    fn parse(&self, path: &Path, contents: &str) -> Result<ParseResult> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_kotlin::language())
            .into_diagnostic()?;

        let tree = parser
            .parse(contents, None)
            .ok_or_else(|| miette::miette!("Failed to parse Kotlin file"))?;

        let mut extractor = KotlinExtractor {
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
    "integer_literal",
    "hex_literal",
    "bin_literal",
    "long_literal",
    "unsigned_literal",
    "real_literal",
    "string_literal",
];

/// Array factories whose arguments are the array elements
const ARRAY_FACTORIES: &[&str] = &[
    "arrayOf",
    "intArrayOf",
    "longArrayOf",
    "floatArrayOf",
    "doubleArrayOf",
    "shortArrayOf",
    "byteArrayOf",
    "charArrayOf",
    "booleanArrayOf",
    "listOf",
    "mutableListOf",
    "setOf",
];

/// Array constructors that only take a size
const SIZED_ARRAYS: &[&str] = &[
    "IntArray",
    "LongArray",
    "FloatArray",
    "DoubleArray",
    "ShortArray",
    "ByteArray",
    "CharArray",
    "BooleanArray",
    "arrayOfNulls",
];

struct KotlinExtractor<'a> {
    path: &'a Path,
    source: &'a str,
    imports: ImportMap,
    result: ParseResult,
}

impl<'a> KotlinExtractor<'a> {
    fn text(&self, node: Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    fn first_of_kind<'t>(&self, node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
        named_children(node)
            .into_iter()
            .find(|child| kinds.contains(&child.kind()))
    }

    fn extract_package(&self, root: Node) -> Option<String> {
        let header = children_of_kind(root, "package_header").into_iter().next()?;
        self.first_of_kind(header, &["identifier"])
            .map(|id| self.text(id).to_string())
    }

    fn extract_imports(&mut self, root: Node) {
        for list in children_of_kind(root, "import_list") {
            for header in children_of_kind(list, "import_header") {
                if self.first_of_kind(header, &["wildcard_import"]).is_some() {
                    continue;
                }
                let Some(path) = self.first_of_kind(header, &["identifier"]) else {
                    continue;
                };
                let alias = self
                    .first_of_kind(header, &["import_alias"])
                    .and_then(|alias| self.first_of_kind(alias, &["type_identifier"]))
                    .map(|alias| self.text(alias));
                self.imports.add(self.text(path), alias);
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
        let written = match node.kind() {
            "assignment" => self
                .first_of_kind(node, &["directly_assignable_expression"])
                .and_then(|target| named_children(target).into_iter().next()),
            "postfix_expression" | "prefix_expression"
                if operator_token(node, self.source, &["++", "--"]).is_some() =>
            {
                named_children(node)
                    .into_iter()
                    .find(|child| child.kind() == "simple_identifier")
            }
            _ => None,
        };
        if let Some(name) = written.filter(|n| n.kind() == "simple_identifier") {
            names.insert(self.text(name).to_string());
        }
        for child in named_children(node) {
            self.collect_assigned(child, names);
        }
    }

    fn visit_declarations(&mut self, node: Node, class_name: Option<&str>) {
        for child in named_children(node) {
            match child.kind() {
                "class_declaration" => self.extract_class(child),
                "object_declaration" => {
                    let name = self
                        .first_of_kind(child, &["type_identifier"])
                        .map(|n| self.text(n).to_string());
                    if let Some(body) = self.first_of_kind(child, &["class_body"]) {
                        self.visit_declarations(body, name.as_deref());
                    }
                }
                "companion_object" => {
                    if let Some(body) = self.first_of_kind(child, &["class_body"]) {
                        self.visit_declarations(body, class_name);
                    }
                }
                "function_declaration" => self.extract_function(child, class_name),
                "secondary_constructor" => self.extract_secondary_constructor(child, class_name),
                "property_declaration" => self.extract_property(child, class_name),
                "anonymous_initializer" => {
                    let mut context = self.body_context(class_name, child, Vec::new());
                    self.walk(child, &mut context);
                }
                _ => self.visit_declarations(child, class_name),
            }
        }
    }

    fn annotation(&self, node: Node) -> Annotation {
        let name_node = self
            .first_of_kind(node, &["user_type"])
            .or_else(|| {
                self.first_of_kind(node, &["constructor_invocation"])
                    .and_then(|invocation| self.first_of_kind(invocation, &["user_type"]))
            });
        let name = name_node.map(|n| self.text(n)).unwrap_or("");
        let mut annotation = Annotation::new(name, self.text(node), node_location(self.path, node));
        annotation.name = self.imports.qualify(&annotation.name);
        annotation
    }

    /// Annotations in the `modifiers` (or `parameter_modifiers`) child of a node
    fn annotations(&self, node: Node) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for modifiers in named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "modifiers" || child.kind() == "parameter_modifiers")
        {
            for modifier in children_of_kind(modifiers, "annotation") {
                annotations.push(self.annotation(modifier));
            }
        }
        annotations
    }

    fn modifier_texts(&self, node: Node) -> Vec<&'a str> {
        let mut texts = Vec::new();
        if let Some(modifiers) = self.first_of_kind(node, &["modifiers"]) {
            for modifier in named_children(modifiers) {
                if modifier.kind() != "annotation" {
                    texts.push(self.text(modifier).trim());
                }
            }
        }
        texts
    }

    fn extract_class(&mut self, node: Node) {
        let Some(name) = self
            .first_of_kind(node, &["type_identifier"])
            .map(|n| self.text(n).to_string())
        else {
            return;
        };

        let annotations = self.annotations(node);
        if annotations
            .iter()
            .any(|a| matches!(a.simple_name(), "IntDef" | "LongDef"))
        {
            let qualified_name = self.result.package.as_ref().map(|p| format!("{}.{}", p, name));
            let typedef = Typedef {
                name: name.clone(),
                qualified_name,
                location: node_location(self.path, node),
            };
            self.result.typedefs.push(typedef);
        }

        if let Some(primary) = self.first_of_kind(node, &["primary_constructor"]) {
            let parameters = self.class_parameters(primary, &name);
            let function = Function {
                name: name.clone(),
                class_name: Some(name.clone()),
                is_constructor: true,
                parameters,
                return_type: None,
                annotations: self.annotations(primary),
                language: Language::Kotlin,
                location: node_location(self.path, primary),
            };
            self.result.functions.push(function);
        }

        if let Some(body) = self.first_of_kind(node, &["class_body", "enum_class_body"]) {
            self.visit_declarations(body, Some(&name));
        }
    }

    fn class_parameters(&mut self, primary: Node, class_name: &str) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        let holder = self
            .first_of_kind(primary, &["class_parameters"])
            .unwrap_or(primary);
        for child in children_of_kind(holder, "class_parameter") {
            let name = self
                .first_of_kind(child, &["simple_identifier"])
                .map(|n| self.text(n).to_string())
                .unwrap_or_default();
            let type_name = self.type_of(child);
            let annotations = self.annotations(child);
            let is_varargs = self.modifier_texts(child).contains(&"vararg");
            let is_property = {
                let mut cursor = child.walk();
                let found = child
                    .children(&mut cursor)
                    .any(|c| matches!(c.kind(), "val" | "var"));
                found
            };
            if is_property && !annotations.is_empty() {
                let field = Field {
                    name: name.clone(),
                    class_name: Some(class_name.to_string()),
                    type_name: type_name.clone(),
                    annotations: annotations.clone(),
                    location: node_location(self.path, child),
                };
                self.result.fields.push(field);
            }
            parameters.push(Parameter {
                name,
                type_name,
                annotations,
                is_varargs,
                location: node_location(self.path, child),
            });
        }
        parameters
    }

    fn type_of(&self, node: Node) -> Option<String> {
        self.first_of_kind(
            node,
            &["user_type", "nullable_type", "function_type", "type_reference", "parenthesized_type"],
        )
        .map(|t| self.text(t).to_string())
    }

    /// Parameters of `function_value_parameters`; annotations and `vararg`
    /// sit in a preceding `parameter_modifiers` sibling.
    fn value_parameters(&self, node: Node) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        let mut pending_annotations = Vec::new();
        let mut pending_varargs = false;
        for child in named_children(node) {
            match child.kind() {
                "parameter_modifiers" => {
                    for modifier in named_children(child) {
                        match modifier.kind() {
                            "annotation" => pending_annotations.push(self.annotation(modifier)),
                            _ if self.text(modifier).trim() == "vararg" => pending_varargs = true,
                            _ => {}
                        }
                    }
                }
                "parameter" => {
                    let name = self
                        .first_of_kind(child, &["simple_identifier"])
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    parameters.push(Parameter {
                        name,
                        type_name: self.type_of(child),
                        annotations: std::mem::take(&mut pending_annotations),
                        is_varargs: std::mem::take(&mut pending_varargs),
                        location: node_location(self.path, child),
                    });
                }
                _ => {}
            }
        }
        parameters
    }

    fn extract_function(&mut self, node: Node, class_name: Option<&str>) {
        let Some(name) = self
            .first_of_kind(node, &["simple_identifier"])
            .map(|n| self.text(n).to_string())
        else {
            return;
        };
        let parameters = self
            .first_of_kind(node, &["function_value_parameters"])
            .map(|params| self.value_parameters(params))
            .unwrap_or_default();

        // Return type follows the parameter list
        let return_type = {
            let mut after_params = false;
            let mut return_type = None;
            for child in named_children(node) {
                if child.kind() == "function_value_parameters" {
                    after_params = true;
                } else if after_params && matches!(child.kind(), "user_type" | "nullable_type") {
                    return_type = Some(self.text(child).to_string());
                    break;
                }
            }
            return_type
        };

        let function = Function {
            name,
            class_name: class_name.map(str::to_string),
            is_constructor: false,
            parameters,
            return_type,
            annotations: self.annotations(node),
            language: Language::Kotlin,
            location: node_location(self.path, node),
        };

        let Some(body) = self.first_of_kind(node, &["function_body"]) else {
            self.result.functions.push(function);
            return;
        };
        let mut context = self.body_context(class_name, body, function.annotations.clone());
        for parameter in &function.parameters {
            context.declare(&parameter.name, parameter.annotations.clone(), None);
        }
        self.result.functions.push(function);

        // `fun f() = value` returns its expression
        let is_expression_body = {
            let mut cursor = body.walk();
            let first = body.children(&mut cursor).next();
            first.is_some_and(|token| self.text(token) == "=")
        };
        if is_expression_body {
            if let Some(value) = named_children(body).into_iter().next() {
                let expr = self.branch_expr(value, &context);
                self.add_value(AssignTarget::Annotated(context.returns.clone()), false, expr, value);
            }
        }
        self.walk(body, &mut context);
    }

    fn extract_secondary_constructor(&mut self, node: Node, class_name: Option<&str>) {
        let Some(class_name) = class_name else {
            return;
        };
        let parameters = self
            .first_of_kind(node, &["function_value_parameters"])
            .map(|params| self.value_parameters(params))
            .unwrap_or_default();

        let mut context = self.body_context(Some(class_name), node, Vec::new());
        for parameter in &parameters {
            context.declare(&parameter.name, parameter.annotations.clone(), None);
        }

        let function = Function {
            name: class_name.to_string(),
            class_name: Some(class_name.to_string()),
            is_constructor: true,
            parameters,
            return_type: None,
            annotations: self.annotations(node),
            language: Language::Kotlin,
            location: node_location(self.path, node),
        };
        self.result.functions.push(function);

        for child in named_children(node) {
            if matches!(child.kind(), "constructor_delegation_call" | "block" | "statements") {
                self.walk(child, &mut context);
            }
        }
    }

    fn extract_property(&mut self, node: Node, class_name: Option<&str>) {
        let Some(declaration) = self.first_of_kind(node, &["variable_declaration"]) else {
            return;
        };
        let Some(name) = self
            .first_of_kind(declaration, &["simple_identifier"])
            .map(|n| self.text(n).to_string())
        else {
            return;
        };
        let annotations = self.annotations(node);
        let type_name = self.type_of(declaration);

        if !annotations.is_empty() {
            let field = Field {
                name: name.clone(),
                class_name: class_name.map(str::to_string),
                type_name,
                annotations: annotations.clone(),
                location: node_location(self.path, declaration),
            };
            self.result.fields.push(field);
        }

        let initializer = self.initializer(node);
        if let Some(value) = initializer {
            let mut context = self.body_context(class_name, value, Vec::new());
            let expr = self.expr(value, &context);
            let text = self.text(value);
            let constant = if self.modifier_texts(node).contains(&"const") {
                constant_of(&expr).or_else(|| parse_literal(text))
            } else if self.is_read_only(node) {
                // Arrays cannot be `const`; a `val` array is the closest thing
                constant_of(&expr).filter(|value| matches!(value, ConstantValue::Array(_)))
            } else {
                None
            };
            if let Some(constant) = constant {
                self.result.constants.push(Constant {
                    name,
                    class_name: class_name.map(str::to_string),
                    value: constant,
                    text: text.to_string(),
                });
            }
            self.add_value(AssignTarget::Annotated(annotations), false, expr, value);
            self.walk(value, &mut context);
        }
    }

    fn is_read_only(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|c| c.kind() == "val");
        found
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

    /// Declaration written by an assignment, and whether an array element
    /// of it is written
    fn assign_target(&self, node: Node, context: &BodyContext) -> Option<(AssignTarget, bool)> {
        let mut parts = named_children(node);
        let element = parts.last().is_some_and(|last| last.kind() == "indexing_suffix");
        if element {
            parts.pop();
        }
        let target = match parts.as_slice() {
            [name] if name.kind() == "simple_identifier" => {
                let name = self.text(*name);
                if context.scope.contains(name) {
                    AssignTarget::Annotated(context.scope.annotations_of(name))
                } else {
                    AssignTarget::Field {
                        name: name.to_string(),
                        class_name: context.class_name.clone(),
                    }
                }
            }
            [receiver, suffix] if suffix.kind() == "navigation_suffix" => {
                let name = self.first_of_kind(*suffix, &["simple_identifier"])?;
                let class_name = match receiver.kind() {
                    "this_expression" => context.class_name.clone(),
                    "simple_identifier" if !context.scope.contains(self.text(*receiver)) => {
                        Some(self.text(*receiver).to_string())
                    }
                    _ => return None,
                };
                AssignTarget::Field {
                    name: self.text(name).to_string(),
                    class_name,
                }
            }
            _ => return None,
        };
        Some((target, element))
    }

    /// Expression after `=` in a property declaration
    fn initializer<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        let mut after_equals = false;
        for child in node.children(&mut cursor) {
            if !child.is_named() && self.text(child) == "=" {
                after_equals = true;
            } else if after_equals && child.is_named() {
                return Some(child);
            }
        }
        None
    }

    fn walk(&mut self, node: Node, context: &mut BodyContext) {
        match node.kind() {
            "property_declaration" => {
                let value = self.initializer(node);
                let expr = value.map(|value| self.expr(value, context));
                if let Some(value) = value {
                    self.walk(value, context);
                }
                let Some(declaration) = self.first_of_kind(node, &["variable_declaration"]) else {
                    return;
                };
                let Some(name) = self
                    .first_of_kind(declaration, &["simple_identifier"])
                    .map(|n| self.text(n))
                else {
                    return;
                };
                let annotations = self.annotations(node);
                if !annotations.is_empty() {
                    let local = Field {
                        name: name.to_string(),
                        class_name: None,
                        type_name: self.type_of(declaration),
                        annotations: annotations.clone(),
                        location: node_location(self.path, declaration),
                    };
                    self.result.locals.push(local);
                }
                if let (Some(value), Some(expr)) = (value, &expr) {
                    self.add_value(AssignTarget::Annotated(annotations.clone()), false, expr.clone(), value);
                }
                context.declare(name, annotations, expr);
            }
            "assignment" => {
                let is_plain = {
                    let mut cursor = node.walk();
                    let found = node
                        .children(&mut cursor)
                        .any(|c| !c.is_named() && self.text(c) == "=");
                    found
                };
                let target = self.first_of_kind(node, &["directly_assignable_expression"]);
                let value = named_children(node).into_iter().last();
                if let (true, Some(target), Some(value)) = (is_plain, target, value) {
                    if let Some((target, element)) = self.assign_target(target, context) {
                        let expr = self.expr(value, context);
                        self.add_value(target, element, expr, value);
                    }
                }
                self.walk_children(node, context);
            }
            "jump_expression" => {
                let is_return = {
                    let mut cursor = node.walk();
                    let first = node.children(&mut cursor).next();
                    first.is_some_and(|token| self.text(token) == "return")
                };
                if is_return && !context.returns.is_empty() {
                    if let Some(value) = named_children(node).into_iter().last() {
                        let expr = self.branch_expr(value, context);
                        self.add_value(AssignTarget::Annotated(context.returns.clone()), false, expr, value);
                    }
                }
                self.walk_children(node, context);
            }
            "for_statement" => {
                let saved = context.scope.clone();
                for child in named_children(node) {
                    match child.kind() {
                        "variable_declaration" | "multi_variable_declaration" => {
                            for name in self.declared_names(child) {
                                context.declare(name, Vec::new(), None);
                            }
                        }
                        _ => self.walk(child, context),
                    }
                }
                context.scope = saved;
            }
            "if_expression" => self.walk_if(node, context),
            "call_expression" => {
                if let Some(call) = self.call_site(node, context) {
                    self.result.calls.push(call);
                }
                self.walk_children(node, context);
            }
            "lambda_literal" => {
                let mut inner = context.nested();
                inner.declare("it", Vec::new(), None);
                for child in named_children(node) {
                    if child.kind() == "lambda_parameters" {
                        for name in self.declared_names(child) {
                            inner.declare(name, Vec::new(), None);
                        }
                    } else {
                        self.walk(child, &mut inner);
                    }
                }
            }
            "anonymous_function" | "object_literal" => {
                let mut inner = context.nested();
                if let Some(params) = self.first_of_kind(node, &["function_value_parameters"]) {
                    for parameter in self.value_parameters(params) {
                        inner.declare(&parameter.name, parameter.annotations, None);
                    }
                }
                self.walk_children(node, &mut inner);
            }
            "function_declaration" => {
                // Local functions are registered like members
                let class_name = context.class_name.clone();
                self.extract_function(node, class_name.as_deref());
            }
            "block" => {
                let saved = context.scope.clone();
                self.walk_children(node, context);
                context.scope = saved;
            }
            _ => self.walk_children(node, context),
        }
    }

    /// Names bound by a (multi) variable declaration or lambda parameters
    fn declared_names(&self, node: Node) -> Vec<&'a str> {
        match node.kind() {
            "variable_declaration" => self
                .first_of_kind(node, &["simple_identifier"])
                .map(|name| vec![self.text(name)])
                .unwrap_or_default(),
            _ => named_children(node)
                .into_iter()
                .flat_map(|child| self.declared_names(child))
                .collect(),
        }
    }

    fn walk_children(&mut self, node: Node, context: &mut BodyContext) {
        for child in named_children(node) {
            self.walk(child, context);
        }
    }

    fn walk_if(&mut self, node: Node, context: &mut BodyContext) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        let mut condition = Condition::Other;
        let mut seen_condition = false;
        let mut in_else = false;
        for child in children {
            if !child.is_named() {
                if self.text(child) == "else" {
                    in_else = true;
                }
                continue;
            }
            if !seen_condition {
                seen_condition = true;
                self.walk(child, context);
                condition = self.condition(child, context);
                continue;
            }
            context.guards.push(Guard {
                condition: condition.clone(),
                then_branch: !in_else,
            });
            self.walk(child, context);
            context.guards.pop();
        }
    }

    fn callee_name(&self, node: Node) -> Option<&'a str> {
        let callee = named_children(node).into_iter().next()?;
        match callee.kind() {
            "simple_identifier" => Some(self.text(callee)),
            "navigation_expression" => {
                let suffix = self.first_of_kind(callee, &["navigation_suffix"])?;
                self.first_of_kind(suffix, &["simple_identifier"])
                    .map(|id| self.text(id))
            }
            _ => None,
        }
    }

    fn value_arguments<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let suffix = self.first_of_kind(node, &["call_suffix"])?;
        self.first_of_kind(suffix, &["value_arguments"])
    }

    fn call_site(&self, node: Node, context: &BodyContext) -> Option<CallSite> {
        let callee = self.callee_name(node)?;
        let arguments = self
            .value_arguments(node)
            .map(|args| self.arguments(args, context))
            .unwrap_or_default();
        Some(CallSite {
            callee: callee.to_string(),
            is_constructor: false,
            arguments,
            location: node_location(self.path, node),
        })
    }

    fn arguments(&self, node: Node, context: &BodyContext) -> Vec<Argument> {
        children_of_kind(node, "value_argument")
            .into_iter()
            .map(|argument| {
                let is_named = {
                    let mut cursor = argument.walk();
                    let found = argument
                        .children(&mut cursor)
                        .any(|c| !c.is_named() && self.text(c) == "=");
                    found
                };
                let named: Vec<Node> = named_children(argument)
                    .into_iter()
                    .filter(|c| c.kind() != "annotation")
                    .collect();
                let name = if is_named {
                    named.first().map(|n| self.text(*n).to_string())
                } else {
                    None
                };
                let expr = named
                    .last()
                    .map(|value| self.expr(*value, context))
                    .unwrap_or(Expr::Unknown);
                let text = named
                    .last()
                    .map(|value| self.text(*value))
                    .unwrap_or_else(|| self.text(argument));
                Argument {
                    name,
                    expr,
                    text: text.to_string(),
                    location: node_location(self.path, argument),
                }
            })
            .collect()
    }

    fn expr(&self, node: Node, context: &BodyContext) -> Expr {
        let kind = node.kind();
        if kind == "string_literal" {
            let interpolated = named_children(node)
                .iter()
                .any(|c| c.kind().starts_with("interpolat"));
            return if interpolated {
                Expr::Unknown
            } else {
                literal_expr(self.text(node))
            };
        }
        if LITERAL_KINDS.contains(&kind) {
            return literal_expr(self.text(node));
        }
        match kind {
            "prefix_expression" => {
                let operand = named_children(node).into_iter().last();
                let sign = operator_token(node, self.source, &["-", "+"]);
                match (sign, operand) {
                    (Some(_), Some(operand)) if LITERAL_KINDS.contains(&operand.kind()) => {
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
            "simple_identifier" => context.reference(self.text(node)),
            "navigation_expression" => {
                let name = self
                    .first_of_kind(node, &["navigation_suffix"])
                    .and_then(|suffix| self.first_of_kind(suffix, &["simple_identifier"]));
                let Some(name) = name.map(|n| self.text(n)) else {
                    return Expr::Unknown;
                };
                let receiver = named_children(node).into_iter().next();
                match receiver.map(|r| (r.kind(), self.text(r))) {
                    Some(("this_expression", _)) => context.member_reference(name, None),
                    Some(("simple_identifier" | "navigation_expression", receiver)) => {
                        context.member_reference(name, Some(receiver))
                    }
                    _ => Expr::Reference {
                        name: name.to_string(),
                        binding: Binding::Unknown,
                        annotations: Vec::new(),
                        guards: context.guards.clone(),
                    },
                }
            }
            "if_expression" => {
                let branches: Vec<Node> = named_children(node).into_iter().skip(1).collect();
                match branches.as_slice() {
                    [then_node, else_node] => Expr::Conditional {
                        then_expr: Box::new(self.branch_expr(*then_node, context)),
                        else_expr: Box::new(self.branch_expr(*else_node, context)),
                    },
                    _ => Expr::Unknown,
                }
            }
            "call_expression" => {
                let Some(callee) = self.callee_name(node) else {
                    return Expr::Unknown;
                };
                let arguments = self.value_arguments(node);
                if ARRAY_FACTORIES.contains(&callee) {
                    let elements = arguments
                        .map(|args| {
                            self.arguments(args, context)
                                .into_iter()
                                .map(|a| a.expr)
                                .collect()
                        })
                        .unwrap_or_default();
                    Expr::Array(elements)
                } else if SIZED_ARRAYS.contains(&callee) {
                    Expr::SizedArray
                } else {
                    Expr::Call {
                        name: callee.to_string(),
                        arguments: arguments
                            .map(|args| children_of_kind(args, "value_argument").len())
                            .unwrap_or(0),
                    }
                }
            }
            "as_expression" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.expr(inner, context))
                .unwrap_or(Expr::Unknown),
            _ => Expr::Unknown,
        }
    }

    /// Value of an `if` branch: the last expression of a braced body
    fn branch_expr(&self, node: Node, context: &BodyContext) -> Expr {
        match node.kind() {
            "control_structure_body" | "statements" | "block" => named_children(node)
                .into_iter()
                .last()
                .map(|inner| self.branch_expr(inner, context))
                .unwrap_or(Expr::Unknown),
            _ => self.expr(node, context),
        }
    }

    fn condition(&self, node: Node, context: &BodyContext) -> Condition {
        let children = named_children(node);
        match node.kind() {
            "parenthesized_expression" => children
                .into_iter()
                .next()
                .map(|inner| self.condition(inner, context))
                .unwrap_or(Condition::Other),
            "conjunction_expression" | "disjunction_expression" => match children.as_slice() {
                [left, right] => {
                    let op = if node.kind() == "conjunction_expression" { "&&" } else { "||" };
                    combine(op, self.condition(*left, context), self.condition(*right, context))
                }
                _ => Condition::Other,
            },
            "comparison_expression" | "equality_expression" => {
                let operator = operator_token(
                    node,
                    self.source,
                    &["<", "<=", ">", ">=", "==", "!=", "===", "!=="],
                );
                match (operator.and_then(CompareOp::from_token), children.as_slice()) {
                    (Some(op), [left, right]) => Condition::Compare {
                        left: operand_of(&self.expr(*left, context)),
                        op,
                        right: operand_of(&self.expr(*right, context)),
                    },
                    _ => Condition::Other,
                }
            }
            "prefix_expression" => {
                let negated = operator_token(node, self.source, &["!"]).is_some();
                match (negated, children.last()) {
                    (true, Some(operand)) => Condition::Not(Box::new(self.condition(*operand, context))),
                    _ => Condition::Other,
                }
            }
            _ => Condition::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, Operand};
    use std::path::PathBuf;

    fn parse(source: &str) -> ParseResult {
        KotlinParser::new()
            .parse(&PathBuf::from("Test.kt"), source)
            .unwrap()
    }

    #[test]
    fn test_annotated_parameters() {
        let result = parse(
            r#"
package test.pkg

import androidx.annotation.IntRange

class Test {
    fun setAlpha(@IntRange(from = 0, to = 255) alpha: Int) {}
    fun setValues(@Size(min = 1) vararg values: Int) {}
}
"#,
        );
        assert_eq!(result.package.as_deref(), Some("test.pkg"));
        let set_alpha = result
            .functions
            .iter()
            .find(|f| f.name == "setAlpha")
            .unwrap();
        assert_eq!(set_alpha.class_name.as_deref(), Some("Test"));
        assert_eq!(set_alpha.parameters.len(), 1);
        assert_eq!(set_alpha.parameters[0].name, "alpha");
        assert_eq!(set_alpha.parameters[0].type_name.as_deref(), Some("Int"));
        assert_eq!(set_alpha.parameters[0].annotations.len(), 1);
        assert_eq!(set_alpha.parameters[0].annotations[0].simple_name(), "IntRange");

        let set_values = result
            .functions
            .iter()
            .find(|f| f.name == "setValues")
            .unwrap();
        assert!(set_values.parameters[0].is_varargs);
    }

    #[test]
    fn test_call_arguments() {
        let result = parse(
            r#"
fun test() {
    setAlpha(-5)
    setScale(2.49f)
    setValues(intArrayOf(1, 2, 3))
    setText(text = "abc")
}
"#,
        );
        let callees: Vec<&str> = result.calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(callees.contains(&"setAlpha"));
        assert!(callees.contains(&"setValues"));

        let set_alpha = result.calls.iter().find(|c| c.callee == "setAlpha").unwrap();
        assert_eq!(
            set_alpha.arguments[0].expr,
            Expr::Literal(Literal {
                value: ConstantValue::Int(-5),
                text: "-5".to_string()
            })
        );

        let set_values = result.calls.iter().find(|c| c.callee == "setValues").unwrap();
        assert!(matches!(&set_values.arguments[0].expr, Expr::Array(elements) if elements.len() == 3));

        let set_text = result.calls.iter().find(|c| c.callee == "setText").unwrap();
        assert_eq!(set_text.arguments[0].name.as_deref(), Some("text"));
    }

    #[test]
    fn test_guards() {
        let result = parse(
            r#"
fun test(x: Int) {
    if (x >= 0) {
        target(x)
    }
}
"#,
        );
        let call = result.calls.iter().find(|c| c.callee == "target").unwrap();
        match &call.arguments[0].expr {
            Expr::Reference { name, guards, .. } => {
                assert_eq!(name, "x");
                assert_eq!(guards.len(), 1);
                assert_eq!(
                    guards[0].condition,
                    Condition::Compare {
                        left: Operand::Name("x".to_string()),
                        op: CompareOp::Ge,
                        right: Operand::Number(ConstantValue::Int(0)),
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_constants_and_constructors() {
        let result = parse(
            r#"
const val LIMIT = 10

class Box(@Size(3) val code: String) {
    companion object {
        const val NAME = "box"
    }
}
"#,
        );
        assert!(result.constants.iter().any(|c| c.name == "LIMIT" && c.value == ConstantValue::Int(10)));
        assert!(result.constants.iter().any(|c| c.name == "NAME"));
        let constructor = result.functions.iter().find(|f| f.is_constructor).unwrap();
        assert_eq!(constructor.name, "Box");
        assert_eq!(constructor.parameters[0].name, "code");
        assert_eq!(result.fields.len(), 1);
    }

    #[test]
    fn test_value_sites() {
        let result = parse(
            r#"
class Meter {
    @IntRange(from = 0, to = 10)
    var level: Int = 300

    @IntRange(from = 0)
    fun count(): Int {
        return -1
    }

    @IntRange(from = 0)
    fun size(empty: Boolean): Int = if (empty) -1 else 2

    fun fill(@FloatRange(from = 10.0) values: FloatArray) {
        values[0] = 5f
        level = -2
        this.level += 1
    }
}
"#,
        );
        let lines: Vec<usize> = result.values.iter().map(|site| site.location.line).collect();
        assert_eq!(lines, vec![4, 8, 12, 15, 16]);
        assert!(matches!(&result.values[2].expr, Expr::Conditional { .. }));
        assert!(result.values[3].element);
        match &result.values[4].target {
            AssignTarget::Field { name, class_name } => {
                assert_eq!(name, "level");
                assert_eq!(class_name.as_deref(), Some("Meter"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_local_array_initializer() {
        let result = parse(
            r#"
fun test() {
    val array2 = arrayOf(1, 2, 3, 4)
    var count = 1
    count++
    method(array2, count)
    items.forEach { method(it) }
}
"#,
        );
        let call = result.calls.iter().find(|c| c.callee == "method").unwrap();
        match &call.arguments[0].expr {
            Expr::Reference {
                binding: Binding::Local { value: Some(value) },
                ..
            } => assert!(matches!(value.as_ref(), Expr::Array(elements) if elements.len() == 4)),
            other => panic!("unexpected {:?}", other),
        }
        match &call.arguments[1].expr {
            Expr::Reference { binding, .. } => assert_eq!(*binding, Binding::Local { value: None }),
            other => panic!("unexpected {:?}", other),
        }
        let in_lambda = result
            .calls
            .iter()
            .filter(|c| c.callee == "method")
            .nth(1)
            .unwrap();
        match &in_lambda.arguments[0].expr {
            Expr::Reference { binding, .. } => assert_eq!(*binding, Binding::Local { value: None }),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_val_array_constant_and_imports() {
        let result = parse(
            r#"
import javax.validation.constraints.Size
import androidx.annotation.IntRange as Range

object Limits {
    val INVALID = floatArrayOf(10f, 12f, 5f)
    var MUTABLE = intArrayOf(1)
}

fun setName(@Size(max = 3) name: String, @Range(from = 0) count: Int) {}
"#,
        );
        assert_eq!(result.constants.len(), 1);
        assert_eq!(result.constants[0].name, "INVALID");
        assert_eq!(result.constants[0].class_name.as_deref(), Some("Limits"));
        assert!(matches!(&result.constants[0].value, ConstantValue::Array(values) if values.len() == 3));

        let set_name = result.functions.iter().find(|f| f.name == "setName").unwrap();
        assert_eq!(
            set_name.parameters[0].annotations[0].name,
            "javax.validation.constraints.Size"
        );
        assert_eq!(set_name.parameters[1].annotations[0].name, "androidx.annotation.IntRange");
    }
}
