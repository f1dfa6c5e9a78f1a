//! Project model
//!
//! Merged view of every parsed file: functions indexed by name, annotated
//! fields, constants, typedef annotations and the call sites the checks
//! walk over.

mod builder;
mod declaration;

pub use builder::ModelBuilder;
pub use declaration::{
    Annotation, Argument, AssignTarget, Binding, CallSite, CompareOp, Condition, Constant,
    ConstantValue, Expr, Field, Function, Guard, Language, Literal, Location, NumericKind, Operand,
    Parameter, Typedef, ValueSite,
};

use crate::annotation::ConstantResolver;
use crate::parser::ParseResult;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Per-file data kept after merging
#[derive(Debug)]
pub struct FileModel {
    pub path: PathBuf,
    pub language: Language,
    pub package: Option<String>,
    pub calls: Vec<CallSite>,
    pub values: Vec<ValueSite>,
}

#[derive(Debug, Default)]
pub struct ProjectModel {
    files: Vec<FileModel>,
    functions: Vec<Function>,
    function_index: HashMap<String, Vec<usize>>,
    fields: Vec<Field>,
    field_index: HashMap<String, Vec<usize>>,
    locals: Vec<Field>,
    constants: HashMap<String, Vec<Constant>>,
    typedefs: HashSet<String>,
}

impl ProjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the parse result of one file
    pub fn add_file(&mut self, path: &Path, language: Language, result: ParseResult) {
        for function in result.functions {
            let index = self.functions.len();
            self.function_index
                .entry(function.name.clone())
                .or_default()
                .push(index);
            self.functions.push(function);
        }
        for field in result.fields {
            let index = self.fields.len();
            self.field_index.entry(field.name.clone()).or_default().push(index);
            self.fields.push(field);
        }
        self.locals.extend(result.locals);
        for constant in result.constants {
            self.constants.entry(constant.name.clone()).or_default().push(constant);
        }
        for typedef in result.typedefs {
            if let Some(qualified) = typedef.qualified_name {
                self.typedefs.insert(qualified);
            }
            self.typedefs.insert(typedef.name);
        }
        self.files.push(FileModel {
            path: path.to_path_buf(),
            language,
            package: result.package,
            calls: result.calls,
            values: result.values,
        });
    }

    pub fn files(&self) -> &[FileModel] {
        &self.files
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn locals(&self) -> &[Field] {
        &self.locals
    }

    pub fn call_count(&self) -> usize {
        self.files.iter().map(|f| f.calls.len()).sum()
    }

    pub fn functions_named(&self, name: &str) -> impl Iterator<Item = &Function> {
        self.function_index
            .get(name)
            .into_iter()
            .flatten()
            .map(|&index| &self.functions[index])
    }

    /// Target of a call among the declarations of that name.
    ///
    /// Overloads whose numeric parameter types agree with the literal
    /// arguments win, then declarations in the calling file.
    pub fn resolve_call(&self, call: &CallSite, file: &Path) -> Option<&Function> {
        let arity = call.arguments.len();
        let has_named = call.arguments.iter().any(|a| a.name.is_some());
        let mut candidates: Vec<&Function> = self
            .functions_named(&call.callee)
            .filter(|f| !call.is_constructor || f.is_constructor)
            .filter(|f| has_named || f.accepts_arity(arity))
            .filter(|f| {
                call.arguments
                    .iter()
                    .filter_map(|a| a.name.as_deref())
                    .all(|name| f.parameter_named(name).is_some())
            })
            .collect();
        candidates.sort_by_key(|f| (literal_mismatches(f, call), f.location.file.as_path() != file));
        candidates.into_iter().next()
    }

    /// Annotated field `name` of `class_name`, falling back to top-level
    /// properties
    pub fn member_field(&self, class_name: Option<&str>, name: &str) -> Option<&Field> {
        let fields: Vec<&Field> = self
            .field_index
            .get(name)
            .into_iter()
            .flatten()
            .map(|&index| &self.fields[index])
            .collect();
        fields
            .iter()
            .find(|field| class_name.is_some() && field.class_name.as_deref() == class_name)
            .or_else(|| fields.iter().find(|field| field.class_name.is_none()))
            .copied()
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name).and_then(|constants| constants.first())
    }

    /// Constant `name`, preferring the one declared in `class_name`
    pub fn constant_in(&self, class_name: Option<&str>, name: &str) -> Option<&Constant> {
        let constants = self.constants.get(name)?;
        constants
            .iter()
            .find(|constant| class_name.is_some() && constant.class_name.as_deref() == class_name)
            .or_else(|| constants.first())
    }

    /// Whether an annotation name refers to an `@IntDef`/`@LongDef` type
    pub fn is_typedef(&self, annotation_name: &str) -> bool {
        self.typedefs.contains(annotation_name)
    }
}

impl ConstantResolver for ProjectModel {
    fn resolve(&self, name: &str) -> Option<ConstantValue> {
        self.constant(name).map(|c| c.value.clone())
    }
}

/// Literal arguments whose numeric kind differs from the parameter type
fn literal_mismatches(function: &Function, call: &CallSite) -> usize {
    let mut position = 0;
    call.arguments
        .iter()
        .filter(|argument| {
            let parameter = match &argument.name {
                Some(name) => function.parameter_named(name).map(|(_, p)| p),
                None => {
                    position += 1;
                    function.parameter_at(position - 1)
                }
            };
            match (argument.expr.literal_kind(), parameter.and_then(Parameter::numeric_kind)) {
                (Some(actual), Some(declared)) => actual != declared,
                _ => false,
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(file: &str) -> Location {
        Location::new(PathBuf::from(file), 1, 1, 0, 0)
    }

    fn function(name: &str, file: &str, params: usize) -> Function {
        Function {
            name: name.to_string(),
            class_name: None,
            is_constructor: false,
            parameters: (0..params)
                .map(|i| Parameter {
                    name: format!("p{}", i),
                    type_name: Some("int".to_string()),
                    annotations: Vec::new(),
                    is_varargs: false,
                    location: location(file),
                })
                .collect(),
            return_type: None,
            annotations: Vec::new(),
            language: Language::Java,
            location: location(file),
        }
    }

    fn literal(text: &str, value: ConstantValue) -> Argument {
        Argument {
            name: None,
            expr: Expr::Literal(Literal {
                value,
                text: text.to_string(),
            }),
            text: text.to_string(),
            location: location("B.kt"),
        }
    }

    fn call(callee: &str, args: usize) -> CallSite {
        CallSite {
            callee: callee.to_string(),
            is_constructor: false,
            arguments: (0..args)
                .map(|_| Argument {
                    name: None,
                    expr: Expr::Unknown,
                    text: "x".to_string(),
                    location: location("B.java"),
                })
                .collect(),
            location: location("B.java"),
        }
    }

    #[test]
    fn test_resolve_call_by_arity_and_file() {
        let mut model = ProjectModel::new();
        let mut a = ParseResult::new();
        a.functions.push(function("foo", "A.java", 1));
        a.functions.push(function("foo", "A.java", 2));
        model.add_file(Path::new("A.java"), Language::Java, a);
        let mut b = ParseResult::new();
        b.functions.push(function("foo", "B.java", 1));
        model.add_file(Path::new("B.java"), Language::Java, b);

        let resolved = model.resolve_call(&call("foo", 1), Path::new("B.java")).unwrap();
        assert_eq!(resolved.location.file, PathBuf::from("B.java"));

        let resolved = model.resolve_call(&call("foo", 2), Path::new("B.java")).unwrap();
        assert_eq!(resolved.parameters.len(), 2);

        assert!(model.resolve_call(&call("foo", 3), Path::new("B.java")).is_none());
        assert!(model.resolve_call(&call("bar", 1), Path::new("B.java")).is_none());
    }

    #[test]
    fn test_resolve_call_by_literal_kind() {
        let mut float_overload = function("check", "A.kt", 1);
        float_overload.parameters[0].type_name = Some("Float".to_string());
        let mut int_overload = function("check", "A.kt", 1);
        int_overload.parameters[0].type_name = Some("Int".to_string());

        let mut model = ProjectModel::new();
        let mut result = ParseResult::new();
        result.functions.push(float_overload);
        result.functions.push(int_overload);
        model.add_file(Path::new("A.kt"), Language::Kotlin, result);

        let mut int_call = call("check", 0);
        int_call.arguments.push(literal("100", ConstantValue::Int(100)));
        let resolved = model.resolve_call(&int_call, Path::new("B.kt")).unwrap();
        assert_eq!(resolved.parameters[0].type_name.as_deref(), Some("Int"));

        let mut float_call = call("check", 0);
        float_call.arguments.push(literal("100.0f", ConstantValue::Float(100.0)));
        let resolved = model.resolve_call(&float_call, Path::new("B.kt")).unwrap();
        assert_eq!(resolved.parameters[0].type_name.as_deref(), Some("Float"));

        // Non-literal arguments keep declaration order
        let resolved = model.resolve_call(&call("check", 1), Path::new("B.kt")).unwrap();
        assert_eq!(resolved.parameters[0].type_name.as_deref(), Some("Float"));
    }

    #[test]
    fn test_member_field_scoped_to_class() {
        let field = |class_name: Option<&str>| Field {
            name: "value".to_string(),
            class_name: class_name.map(str::to_string),
            type_name: Some("int".to_string()),
            annotations: Vec::new(),
            location: location("Other.java"),
        };
        let mut model = ProjectModel::new();
        let mut result = ParseResult::new();
        result.fields.push(field(Some("Other")));
        model.add_file(Path::new("Other.java"), Language::Java, result);

        assert!(model.member_field(Some("Other"), "value").is_some());
        assert!(model.member_field(Some("A"), "value").is_none());
        assert!(model.member_field(None, "value").is_none());

        let mut result = ParseResult::new();
        result.fields.push(field(None));
        model.add_file(Path::new("Props.kt"), Language::Kotlin, result);
        let top_level = model.member_field(Some("A"), "value").unwrap();
        assert!(top_level.class_name.is_none());
    }

    #[test]
    fn test_constants_and_typedefs() {
        let mut model = ProjectModel::new();
        let mut result = ParseResult::new();
        result.constants.push(Constant {
            name: "MAX".to_string(),
            class_name: None,
            value: ConstantValue::Int(10),
            text: "10".to_string(),
        });
        result.typedefs.push(Typedef {
            name: "Mode".to_string(),
            qualified_name: Some("test.Mode".to_string()),
            location: location("A.java"),
        });
        model.add_file(Path::new("A.java"), Language::Java, result);

        assert_eq!(model.resolve("MAX"), Some(ConstantValue::Int(10)));
        assert_eq!(model.constant_in(Some("Other"), "MAX").map(|c| c.text.as_str()), Some("10"));
        assert!(model.is_typedef("Mode"));
        assert!(model.is_typedef("test.Mode"));
        assert!(!model.is_typedef("Other"));
    }
}
