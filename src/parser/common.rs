// Parser utilities shared by the Java and Kotlin front ends

use crate::annotation::parse_literal;
use crate::model::{
    Annotation, Binding, CallSite, Condition, Constant, ConstantValue, Expr, Field, Function,
    Guard, Literal, Location, Operand, Typedef, ValueSite,
};
use miette::Result;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Result of parsing a source file
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Package/namespace of the file
    pub package: Option<String>,

    /// Functions, methods and constructors
    pub functions: Vec<Function>,

    /// Annotated fields and properties
    pub fields: Vec<Field>,

    /// Annotated local variables
    pub locals: Vec<Field>,

    /// Constants with literal initializers
    pub constants: Vec<Constant>,

    /// Annotation types declared as `@IntDef`/`@LongDef`
    pub typedefs: Vec<Typedef>,

    /// Calls with their argument expressions
    pub calls: Vec<CallSite>,

    /// Returns and assignments that may flow into annotated declarations
    pub values: Vec<ValueSite>,
}

impl ParseResult {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Trait for language-specific parsers
pub trait Parser {
    /// Parse a source file and extract the model used by the checks
    fn parse(&self, path: &Path, contents: &str) -> Result<ParseResult>;
}

/// Helper to convert a tree-sitter node position to a Location
pub fn node_location(file: &Path, node: tree_sitter::Node) -> Location {
    let start = node.start_position();
    Location::new(
        file.to_path_buf(),
        start.row + 1,    // tree-sitter uses 0-indexed lines
        start.column + 1, // tree-sitter uses 0-indexed columns
        node.start_byte(),
        node.end_byte(),
    )
}

/// Extract text from a node
pub fn node_text<'a>(node: tree_sitter::Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Find all children of a specific kind
pub fn children_of_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Vec<tree_sitter::Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}

/// All named children of a node
pub fn named_children(node: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// First anonymous child whose text is one of `tokens`
pub fn operator_token<'a>(node: tree_sitter::Node<'a>, source: &'a str, tokens: &[&str]) -> Option<&'a str> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|child| !child.is_named())
        .map(|child| node_text(child, source))
        .find(|text| tokens.contains(text));
    found
}

#[derive(Debug, Clone)]
struct Local {
    annotations: Vec<Annotation>,
    value: Option<Expr>,
}

/// Parameters and local variables visible inside a function body
#[derive(Debug, Default, Clone)]
pub struct Scope {
    locals: HashMap<String, Local>,
}

impl Scope {
    pub fn declare(&mut self, name: &str, annotations: Vec<Annotation>, value: Option<Expr>) {
        self.locals.insert(name.to_string(), Local { annotations, value });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    pub fn annotations_of(&self, name: &str) -> Vec<Annotation> {
        self.locals
            .get(name)
            .map(|local| local.annotations.clone())
            .unwrap_or_default()
    }
}

/// State carried while walking a function body
#[derive(Debug, Default)]
pub struct BodyContext {
    pub scope: Scope,
    pub guards: Vec<Guard>,
    /// Class whose members unqualified names may refer to
    pub class_name: Option<String>,
    /// Annotations of the enclosing method, checked against `return` values
    pub returns: Vec<Annotation>,
    /// Locals written after their declaration
    pub reassigned: HashSet<String>,
}

impl BodyContext {
    pub fn new(class_name: Option<&str>) -> Self {
        Self {
            class_name: class_name.map(str::to_string),
            ..Self::default()
        }
    }

    /// Context for a lambda or anonymous function: same names, own returns
    pub fn nested(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            guards: self.guards.clone(),
            class_name: self.class_name.clone(),
            returns: Vec::new(),
            reassigned: self.reassigned.clone(),
        }
    }

    /// Declare a local, keeping its initializer unless it is reassigned later
    pub fn declare(&mut self, name: &str, annotations: Vec<Annotation>, value: Option<Expr>) {
        let value = value.filter(|_| !self.reassigned.contains(name));
        self.scope.declare(name, annotations, value);
    }

    pub fn reference(&self, name: &str) -> Expr {
        let binding = match self.scope.locals.get(name) {
            Some(local) => Binding::Local {
                value: local.value.clone().map(Box::new),
            },
            None => Binding::Member {
                class_name: self.class_name.clone(),
            },
        };
        Expr::Reference {
            name: name.to_string(),
            binding,
            annotations: self.scope.annotations_of(name),
            guards: self.guards.clone(),
        }
    }

    /// Reference to a member reached through a receiver; `receiver` is the
    /// class name for a static access, `None` for `this`
    pub fn member_reference(&self, name: &str, receiver: Option<&str>) -> Expr {
        let binding = match receiver {
            None => Binding::Member {
                class_name: self.class_name.clone(),
            },
            // A local receiver has a type we do not track
            Some(receiver) if self.scope.contains(receiver) => Binding::Unknown,
            Some(receiver) => Binding::Member {
                class_name: Some(simple_name(receiver).to_string()),
            },
        };
        Expr::Reference {
            name: name.to_string(),
            binding,
            annotations: Vec::new(),
            guards: self.guards.clone(),
        }
    }
}

/// Maps simple names to the qualified names imported by a file
#[derive(Debug, Default, Clone)]
pub struct ImportMap {
    names: HashMap<String, String>,
}

impl ImportMap {
    /// Record `import path` or `import path as alias`; wildcard and static
    /// imports are left out by the callers
    pub fn add(&mut self, path: &str, alias: Option<&str>) {
        let path = path.trim();
        let name = alias.unwrap_or_else(|| simple_name(path));
        self.names.insert(name.to_string(), path.to_string());
    }

    /// Qualified name of an annotation as written in the source
    pub fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        self.names.get(name).cloned().unwrap_or_else(|| name.to_string())
    }
}

/// Constant value of a literal or of an array of literals
pub fn constant_of(expr: &Expr) -> Option<ConstantValue> {
    match expr {
        Expr::Literal(literal) => Some(literal.value.clone()),
        Expr::Array(elements) => elements
            .iter()
            .map(constant_of)
            .collect::<Option<Vec<_>>>()
            .map(ConstantValue::Array),
        _ => None,
    }
}

/// Literal expression from its source text
pub fn literal_expr(text: &str) -> Expr {
    match parse_literal(text) {
        Some(value) => Expr::Literal(Literal {
            value,
            text: text.trim().to_string(),
        }),
        None => Expr::Unknown,
    }
}

/// Guard operand from an already reduced expression
pub fn operand_of(expr: &Expr) -> Operand {
    match expr {
        Expr::Reference { name, .. } => Operand::Name(name.clone()),
        Expr::Literal(Literal {
            value: value @ (ConstantValue::Int(_) | ConstantValue::Float(_)),
            ..
        }) => Operand::Number(value.clone()),
        _ => Operand::Other,
    }
}

/// `cond_a && cond_b` style combination used by both grammars
pub fn combine(op: &str, left: Condition, right: Condition) -> Condition {
    match op {
        "&&" => Condition::And(Box::new(left), Box::new(right)),
        "||" => Condition::Or(Box::new(left), Box::new(right)),
        _ => Condition::Other,
    }
}

/// Last segment of a dotted name
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_expr() {
        match literal_expr("2.49f") {
            Expr::Literal(literal) => {
                assert_eq!(literal.value, ConstantValue::Float(2.49));
                assert_eq!(literal.text, "2.49f");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(literal_expr("foo"), Expr::Unknown);
    }

    #[test]
    fn test_operand_of() {
        let context = BodyContext::default();
        assert_eq!(operand_of(&context.reference("x")), Operand::Name("x".to_string()));
        assert_eq!(
            operand_of(&literal_expr("5")),
            Operand::Number(ConstantValue::Int(5))
        );
        assert_eq!(operand_of(&literal_expr("\"s\"")), Operand::Other);
    }

    #[test]
    fn test_reference_bindings() {
        let mut context = BodyContext::new(Some("Widget"));
        context.reassigned.insert("count".to_string());
        context.declare("level", Vec::new(), Some(literal_expr("5")));
        context.declare("count", Vec::new(), Some(literal_expr("1")));

        match context.reference("level") {
            Expr::Reference {
                binding: Binding::Local { value: Some(value) },
                ..
            } => assert_eq!(*value, literal_expr("5")),
            other => panic!("unexpected {:?}", other),
        }
        match context.reference("count") {
            Expr::Reference { binding, .. } => assert_eq!(binding, Binding::Local { value: None }),
            other => panic!("unexpected {:?}", other),
        }
        match context.reference("alpha") {
            Expr::Reference { binding, .. } => assert_eq!(
                binding,
                Binding::Member {
                    class_name: Some("Widget".to_string())
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
        match context.member_reference("alpha", Some("level")) {
            Expr::Reference { binding, .. } => assert_eq!(binding, Binding::Unknown),
            other => panic!("unexpected {:?}", other),
        }
        match context.member_reference("MAX", Some("com.example.Limits")) {
            Expr::Reference { binding, .. } => assert_eq!(
                binding,
                Binding::Member {
                    class_name: Some("Limits".to_string())
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_import_map() {
        let mut imports = ImportMap::default();
        imports.add("javax.validation.constraints.Size", None);
        imports.add("androidx.annotation.IntRange", Some("Range"));

        assert_eq!(imports.qualify("Size"), "javax.validation.constraints.Size");
        assert_eq!(imports.qualify("Range"), "androidx.annotation.IntRange");
        assert_eq!(imports.qualify("FloatRange"), "FloatRange");
        assert_eq!(imports.qualify("androidx.annotation.Size"), "androidx.annotation.Size");
    }

    #[test]
    fn test_constant_of_array() {
        let array = Expr::Array(vec![literal_expr("10f"), literal_expr("5f")]);
        assert_eq!(
            constant_of(&array),
            Some(ConstantValue::Array(vec![ConstantValue::Float(10.0), ConstantValue::Float(5.0)]))
        );
        assert_eq!(constant_of(&Expr::Array(vec![Expr::Unknown])), None);
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("a.b.C"), "C");
        assert_eq!(simple_name("C"), "C");
    }
}
