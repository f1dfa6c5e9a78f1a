// Source model types extracted from Java and Kotlin files

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Location in source code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize, start_byte: usize, end_byte: usize) -> Self {
        Self {
            file,
            line,
            column,
            start_byte,
            end_byte,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Java,
    Kotlin,
}

/// An annotation occurrence as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Name as written, possibly qualified (`androidx.annotation.IntRange`)
    pub name: String,
    /// Full annotation text including `@` and arguments
    pub text: String,
    pub location: Location,
}

impl Annotation {
    pub fn new(name: impl Into<String>, text: impl Into<String>, location: Location) -> Self {
        let name = name.into();
        // Kotlin use-site targets (`@param:IntRange`) are not part of the name
        let name = match name.rsplit_once(':') {
            Some((_, rest)) => rest.trim().to_string(),
            None => name,
        };
        Self {
            name,
            text: text.into(),
            location,
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Declared type as written (`int`, `float[]`, `Int?`, `List<String>`)
    pub type_name: Option<String>,
    pub annotations: Vec<Annotation>,
    pub is_varargs: bool,
    pub location: Location,
}

impl Parameter {
    /// Numeric kind of the declared type; the element type for varargs
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        self.type_name.as_deref().and_then(NumericKind::of_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Enclosing class, if any
    pub class_name: Option<String>,
    pub is_constructor: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub annotations: Vec<Annotation>,
    pub language: Language,
    pub location: Location,
}

impl Function {
    /// Whether a call with `count` positional arguments can bind to this function
    pub fn accepts_arity(&self, count: usize) -> bool {
        match self.parameters.last() {
            Some(last) if last.is_varargs => count + 1 >= self.parameters.len(),
            _ => count == self.parameters.len(),
        }
    }

    pub fn parameter_named(&self, name: &str) -> Option<(usize, &Parameter)> {
        self.parameters.iter().enumerate().find(|(_, p)| p.name == name)
    }

    /// Parameter receiving the positional argument at `index`
    pub fn parameter_at(&self, index: usize) -> Option<&Parameter> {
        match self.parameters.last() {
            Some(last) if last.is_varargs && index + 1 >= self.parameters.len() => Some(last),
            _ => self.parameters.get(index),
        }
    }
}

/// Integral or floating-point, for telling numeric overloads apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integral,
    Floating,
}

impl NumericKind {
    /// Kind of a Java or Kotlin type name such as `int`, `Long?` or `float...`
    pub fn of_type(type_name: &str) -> Option<Self> {
        let base = type_name
            .trim()
            .trim_end_matches('?')
            .trim_end_matches("...");
        match base.rsplit('.').next().unwrap_or(base) {
            "int" | "long" | "short" | "byte" | "Int" | "Long" | "Short" | "Byte" | "Integer" => {
                Some(NumericKind::Integral)
            }
            "float" | "double" | "Float" | "Double" => Some(NumericKind::Floating),
            _ => None,
        }
    }
}

/// Field or property that carries annotations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub class_name: Option<String>,
    pub type_name: Option<String>,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

/// Compile-time constant value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// Array initializer whose elements are all constant
    Array(Vec<ConstantValue>),
}

impl ConstantValue {
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            ConstantValue::Int(_) => Some(NumericKind::Integral),
            ConstantValue::Float(_) => Some(NumericKind::Floating),
            ConstantValue::Str(_) | ConstantValue::Array(_) => None,
        }
    }
}

/// `static final` field or `const val` with a literal or array initializer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub class_name: Option<String>,
    pub value: ConstantValue,
    /// Initializer source text
    pub text: String,
}

/// Annotation type declared with `@IntDef` or `@LongDef`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Typedef {
    pub name: String,
    pub qualified_name: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "==" | "===" => Some(CompareOp::Eq),
            "!=" | "!==" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    /// The operator seen from the other side: `5 < x` is `x > 5`
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Name(String),
    Number(ConstantValue),
    Other,
}

/// Condition of an `if` that encloses an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub condition: Condition,
    /// true inside the then-branch, false inside the else-branch
    pub then_branch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: ConstantValue,
    /// Source text of the literal (`2.49f`, `-5`, `"abc"`)
    pub text: String,
}

/// What a name in a function body refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Parameter or local variable. `value` is the initializer of a
    /// variable that is never reassigned.
    Local { value: Option<Box<Expr>> },
    /// Field of `class_name`, or a top-level property when `None`
    Member { class_name: Option<String> },
    /// Member of a receiver whose type is not known
    Unknown,
}

/// Argument expression, reduced to the shapes the range check understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// Array with explicit elements (`new int[] {1, 2}`, `intArrayOf(1, 2)`)
    Array(Vec<Expr>),
    /// Array created with a size only (`new int[n]`, `IntArray(n)`)
    SizedArray,
    Reference {
        name: String,
        binding: Binding,
        /// Annotations of the local variable or parameter the name resolves to
        annotations: Vec<Annotation>,
        /// Enclosing guards, outermost first
        guards: Vec<Guard>,
    },
    /// Call of a function whose return value may be annotated
    Call {
        name: String,
        arguments: usize,
    },
    Conditional {
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Unknown,
}

impl Expr {
    /// Numeric kind of a literal, or of both branches of a conditional
    pub fn literal_kind(&self) -> Option<NumericKind> {
        match self {
            Expr::Literal(literal) => literal.value.numeric_kind(),
            Expr::Conditional { then_expr, else_expr } => {
                let kind = then_expr.literal_kind()?;
                (else_expr.literal_kind() == Some(kind)).then_some(kind)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argument {
    /// Kotlin named argument (`foo(size = 3)`)
    pub name: Option<String>,
    pub expr: Expr,
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    /// `new Foo(...)` in Java; Kotlin calls may also resolve to constructors
    pub is_constructor: bool,
    pub arguments: Vec<Argument>,
    pub location: Location,
}

/// Declaration a value is written to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignTarget {
    /// Annotations known where the value is written: the enclosing method
    /// for a `return`, or the declared field or variable
    Annotated(Vec<Annotation>),
    /// Field looked up in the project model
    Field {
        name: String,
        class_name: Option<String>,
    },
}

/// Value returned from an annotated method, or assigned to an annotated
/// field, variable or array element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSite {
    pub target: AssignTarget,
    /// Written to an element of the target array rather than the array
    pub element: bool,
    pub expr: Expr,
    pub location: Location,
}
