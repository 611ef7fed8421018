//! Parameter schema and bound arguments
//!
//! Every filter declares its inputs as a [`Parameters`] schema: a list of
//! typed [`Parameter`]s with defaults, plus visibility links that make a
//! parameter active only while another parameter holds a given value.
//! Callers bind values in an [`Arguments`] map; [`Parameters::validate`]
//! fills in defaults, coerces compatible values and reports every problem
//! before the filter plans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use structura_core::{DataPath, DataType, Diagnostic, Outcome, Shape, StructuraError, StructuraResult};
use structura_storage::{DataGraph, ObjectType};

/// Warning code for an argument no parameter declares
pub const UNKNOWN_ARGUMENT: i32 = 10;

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    /// Flag
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    String(String),
    /// Index into a choice list
    Choice(usize),
    /// Element type
    DataType(DataType),
    /// Tuple or component shape
    Shape(Shape),
    /// Single object path
    Path(DataPath),
    /// Several object paths
    PathList(Vec<DataPath>),
}

impl ParameterValue {
    /// Short name of the variant, used in messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Float(_) => "float",
            ParameterValue::String(_) => "string",
            ParameterValue::Choice(_) => "choice",
            ParameterValue::DataType(_) => "data type",
            ParameterValue::Shape(_) => "shape",
            ParameterValue::Path(_) => "path",
            ParameterValue::PathList(_) => "path list",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{:?}", v),
            ParameterValue::Choice(v) => write!(f, "#{}", v),
            ParameterValue::DataType(v) => write!(f, "{}", v),
            ParameterValue::Shape(v) => write!(f, "{}", v),
            ParameterValue::Path(v) => write!(f, "{}", v),
            ParameterValue::PathList(v) => {
                let parts: Vec<String> = v.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl From<DataType> for ParameterValue {
    fn from(v: DataType) -> Self {
        ParameterValue::DataType(v)
    }
}

impl From<Shape> for ParameterValue {
    fn from(v: Shape) -> Self {
        ParameterValue::Shape(v)
    }
}

impl From<DataPath> for ParameterValue {
    fn from(v: DataPath) -> Self {
        ParameterValue::Path(v)
    }
}

impl From<Vec<DataPath>> for ParameterValue {
    fn from(v: Vec<DataPath>) -> Self {
        ParameterValue::PathList(v)
    }
}

/// Declared type and constraints of a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// `true` / `false`
    Bool,
    /// Integer with optional inclusive bounds
    Integer {
        /// Smallest accepted value
        min: Option<i64>,
        /// Largest accepted value
        max: Option<i64>,
    },
    /// Finite float with optional inclusive bounds; integers are widened
    Float {
        /// Smallest accepted value
        min: Option<f64>,
        /// Largest accepted value
        max: Option<f64>,
    },
    /// Any text
    String,
    /// One of a fixed list; accepts the index or the choice text
    Choice {
        /// Choice labels, addressed by index
        choices: Vec<String>,
    },
    /// Element type, optionally restricted
    DataType {
        /// Accepted types; empty accepts all
        allowed: Vec<DataType>,
    },
    /// Non-empty shape
    Shape,
    /// Existing object, optionally restricted by type
    DataPath {
        /// Accepted object types; empty accepts all
        allowed: Vec<ObjectType>,
    },
    /// Object the filter will create
    CreatedPath,
    /// Non-empty list of existing objects, optionally restricted by type
    PathList {
        /// Accepted object types; empty accepts all
        allowed: Vec<ObjectType>,
    },
}

impl ParameterKind {
    /// Check `value` against this kind, returning the coerced value
    fn check(&self, value: &ParameterValue) -> Result<ParameterValue, String> {
        use ParameterValue as V;
        match (self, value) {
            (ParameterKind::Bool, V::Bool(_)) => Ok(value.clone()),
            (ParameterKind::Integer { min, max }, V::Integer(v)) => {
                check_bounds(*v, *min, *max)?;
                Ok(value.clone())
            }
            (ParameterKind::Float { min, max }, V::Float(v)) => check_float(*v, *min, *max),
            (ParameterKind::Float { min, max }, V::Integer(v)) => check_float(*v as f64, *min, *max),
            (ParameterKind::String, V::String(_)) => Ok(value.clone()),
            (ParameterKind::Choice { choices }, V::Choice(index)) => {
                if *index < choices.len() {
                    Ok(value.clone())
                } else {
                    Err(format!("choice {} out of range (0..{})", index, choices.len()))
                }
            }
            (ParameterKind::Choice { choices }, V::String(text)) => choices
                .iter()
                .position(|c| c == text)
                .map(V::Choice)
                .ok_or_else(|| format!("'{}' is not one of [{}]", text, choices.join(", "))),
            (ParameterKind::DataType { allowed }, V::DataType(dt)) => {
                if allowed.is_empty() || allowed.contains(dt) {
                    Ok(value.clone())
                } else {
                    Err(format!("data type {} is not accepted", dt))
                }
            }
            (ParameterKind::Shape, V::Shape(shape)) => {
                if shape.rank() == 0 {
                    Err("shape must have at least one dimension".to_string())
                } else {
                    Ok(value.clone())
                }
            }
            (ParameterKind::DataPath { .. } | ParameterKind::CreatedPath, V::Path(path)) => {
                if path.is_empty() {
                    Err("path must not be empty".to_string())
                } else {
                    Ok(value.clone())
                }
            }
            (ParameterKind::PathList { .. }, V::PathList(paths)) => {
                if paths.iter().any(|p| p.is_empty()) {
                    Err("path list contains an empty path".to_string())
                } else {
                    Ok(value.clone())
                }
            }
            (ParameterKind::PathList { .. }, V::Path(path)) if !path.is_empty() => Ok(V::PathList(vec![path.clone()])),
            (kind, value) => Err(format!("expected {}, found {}", kind.expected(), value.type_name())),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ParameterKind::Bool => "bool",
            ParameterKind::Integer { .. } => "integer",
            ParameterKind::Float { .. } => "float",
            ParameterKind::String => "string",
            ParameterKind::Choice { .. } => "choice",
            ParameterKind::DataType { .. } => "data type",
            ParameterKind::Shape => "shape",
            ParameterKind::DataPath { .. } | ParameterKind::CreatedPath => "path",
            ParameterKind::PathList { .. } => "path list",
        }
    }
}

fn check_float(v: f64, min: Option<f64>, max: Option<f64>) -> Result<ParameterValue, String> {
    if !v.is_finite() {
        return Err(format!("{} is not a finite number", v));
    }
    check_bounds(v, min, max)?;
    Ok(ParameterValue::Float(v))
}

fn check_bounds<T: PartialOrd + fmt::Display>(v: T, min: Option<T>, max: Option<T>) -> Result<(), String> {
    if let Some(min) = min {
        if v < min {
            return Err(format!("{} is below the minimum {}", v, min));
        }
    }
    if let Some(max) = max {
        if v > max {
            return Err(format!("{} is above the maximum {}", v, max));
        }
    }
    Ok(())
}

/// One declared input
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Stable identifier used in [`Arguments`]
    pub key: String,
    /// Human readable label
    pub label: String,
    /// Type and constraints
    pub kind: ParameterKind,
    /// Value used when the argument is missing
    pub default: ParameterValue,
}

impl Parameter {
    /// Parameter with an explicit kind and default
    pub fn new(key: &str, label: &str, kind: ParameterKind, default: impl Into<ParameterValue>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            default: default.into(),
        }
    }

    /// Flag
    pub fn bool(key: &str, label: &str, default: bool) -> Self {
        Self::new(key, label, ParameterKind::Bool, default)
    }

    /// Unbounded float
    pub fn float(key: &str, label: &str, default: f64) -> Self {
        Self::new(key, label, ParameterKind::Float { min: None, max: None }, default)
    }

    /// Free text
    pub fn string(key: &str, label: &str, default: &str) -> Self {
        Self::new(key, label, ParameterKind::String, default)
    }

    /// Choice among `choices`, defaulting to index `default`
    pub fn choice(key: &str, label: &str, choices: &[&str], default: usize) -> Self {
        Self::new(
            key,
            label,
            ParameterKind::Choice {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
            ParameterValue::Choice(default),
        )
    }

    /// Any element type
    pub fn data_type(key: &str, label: &str, default: DataType) -> Self {
        Self::new(key, label, ParameterKind::DataType { allowed: Vec::new() }, default)
    }

    /// Shape
    pub fn shape(key: &str, label: &str, default: Shape) -> Self {
        Self::new(key, label, ParameterKind::Shape, default)
    }

    /// Existing object of one of the `allowed` types
    pub fn data_path(key: &str, label: &str, allowed: &[ObjectType]) -> Self {
        Self::new(
            key,
            label,
            ParameterKind::DataPath {
                allowed: allowed.to_vec(),
            },
            DataPath::empty(),
        )
    }

    /// Object the filter creates
    pub fn created_path(key: &str, label: &str) -> Self {
        Self::new(key, label, ParameterKind::CreatedPath, DataPath::empty())
    }

    /// Existing objects of the `allowed` types
    pub fn path_list(key: &str, label: &str, allowed: &[ObjectType]) -> Self {
        Self::new(
            key,
            label,
            ParameterKind::PathList {
                allowed: allowed.to_vec(),
            },
            Vec::<DataPath>::new(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Link {
    controller: String,
    value: ParameterValue,
    dependent: String,
}

/// Ordered schema of a filter's inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    params: Vec<Parameter>,
    links: Vec<Link>,
}

impl Parameters {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter, replacing one with the same key
    pub fn insert(&mut self, parameter: Parameter) {
        match self.params.iter_mut().find(|p| p.key == parameter.key) {
            Some(existing) => *existing = parameter,
            None => self.params.push(parameter),
        }
    }

    /// Make `dependent` active only while `controller` equals `value`
    ///
    /// A parameter with several links is active when any of them matches.
    pub fn link(&mut self, controller: &str, value: impl Into<ParameterValue>, dependent: &str) {
        self.links.push(Link {
            controller: controller.to_string(),
            value: value.into(),
            dependent: dependent.to_string(),
        });
    }

    /// Declared parameter by key
    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Parameters in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether `key` is active given `args`
    ///
    /// Missing controller values fall back to the controller's default.
    /// Both sides are coerced through the controller's kind, so a choice
    /// bound by label matches a link declared by index.
    pub fn is_active(&self, key: &str, args: &Arguments) -> bool {
        let mut links = self.links.iter().filter(|l| l.dependent == key).peekable();
        if links.peek().is_none() {
            return true;
        }
        links.any(|link| {
            let controller = self.get(&link.controller);
            let coerce = |value: &ParameterValue| match controller {
                Some(param) => param.kind.check(value).unwrap_or_else(|_| value.clone()),
                None => value.clone(),
            };
            let current = args
                .get(&link.controller)
                .or_else(|| controller.map(|p| &p.default));
            current.map(&coerce) == Some(coerce(&link.value))
        })
    }

    /// Validate `args`, returning the full argument set with defaults applied
    ///
    /// Inactive parameters are carried through unchecked. Unknown keys are
    /// dropped with a warning.
    pub fn validate(&self, args: &Arguments) -> Outcome<Arguments> {
        let mut warnings = Vec::new();
        for key in args.keys() {
            if self.get(key).is_none() {
                warnings.push(Diagnostic::new(
                    UNKNOWN_ARGUMENT,
                    format!("argument '{}' is not a parameter and was ignored", key),
                ));
            }
        }

        let mut resolved = Arguments::new();
        for param in &self.params {
            let value = args.get(&param.key).unwrap_or(&param.default).clone();
            resolved.insert(param.key.clone(), value);
        }

        let mut errors = Vec::new();
        let mut checked = resolved.clone();
        for param in &self.params {
            if !self.is_active(&param.key, &resolved) {
                continue;
            }
            let Some(value) = resolved.get(&param.key) else {
                continue;
            };
            match param.kind.check(value) {
                Ok(coerced) => checked.insert(param.key.clone(), coerced),
                Err(reason) => errors.push(Diagnostic::from(StructuraError::invalid_parameter(
                    param.key.clone(),
                    reason,
                ))),
            }
        }

        let outcome = if errors.is_empty() {
            Outcome::ok(checked)
        } else {
            Outcome::errors(errors)
        };
        outcome.with_warnings(warnings)
    }

    /// Check that active path parameters name existing objects of an allowed type
    pub fn check_paths(&self, graph: &DataGraph, args: &Arguments) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        for param in &self.params {
            if !self.is_active(&param.key, args) {
                continue;
            }
            let (paths, allowed) = match (&param.kind, args.get(&param.key)) {
                (ParameterKind::DataPath { allowed }, Some(ParameterValue::Path(path))) => {
                    (std::slice::from_ref(path), allowed)
                }
                (ParameterKind::PathList { allowed }, Some(ParameterValue::PathList(paths))) => {
                    (paths.as_slice(), allowed)
                }
                _ => continue,
            };
            if paths.is_empty() {
                errors.push(Diagnostic::from(StructuraError::invalid_parameter(
                    param.key.clone(),
                    "no objects selected",
                )));
            }
            for path in paths {
                match graph.resolve(path) {
                    Err(e) => errors.push(Diagnostic::from(e)),
                    Ok(object) if !allowed.is_empty() && !allowed.contains(&object.object_type()) => {
                        errors.push(Diagnostic::from(StructuraError::invalid_parameter(
                            param.key.clone(),
                            format!("{} is a {}, which is not accepted here", path, object.object_type()),
                        )))
                    }
                    Ok(_) => {}
                }
            }
        }
        errors
    }
}

/// Bound argument values keyed by parameter key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, ParameterValue>);

impl Arguments {
    /// Empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.insert(key.to_string(), value.into());
        self
    }

    /// Bind `key` to `value`
    pub fn insert(&mut self, key: String, value: ParameterValue) {
        self.0.insert(key, value);
    }

    /// Raw value of `key`
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0.get(key)
    }

    /// Bound keys in order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, key: &str) -> StructuraResult<&ParameterValue> {
        self.0
            .get(key)
            .ok_or_else(|| StructuraError::invalid_parameter(key, "missing argument"))
    }

    fn mismatch(key: &str, expected: &str, found: &ParameterValue) -> StructuraError {
        StructuraError::invalid_parameter(key, format!("expected {}, found {}", expected, found.type_name()))
    }

    /// Flag value of `key`
    pub fn bool(&self, key: &str) -> StructuraResult<bool> {
        match self.require(key)? {
            ParameterValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(key, "bool", other)),
        }
    }

    /// Integer value of `key`
    pub fn integer(&self, key: &str) -> StructuraResult<i64> {
        match self.require(key)? {
            ParameterValue::Integer(v) => Ok(*v),
            other => Err(Self::mismatch(key, "integer", other)),
        }
    }

    /// Float value of `key`; integers are widened
    pub fn float(&self, key: &str) -> StructuraResult<f64> {
        match self.require(key)? {
            ParameterValue::Float(v) => Ok(*v),
            ParameterValue::Integer(v) => Ok(*v as f64),
            other => Err(Self::mismatch(key, "float", other)),
        }
    }

    /// Text value of `key`
    pub fn string(&self, key: &str) -> StructuraResult<&str> {
        match self.require(key)? {
            ParameterValue::String(v) => Ok(v),
            other => Err(Self::mismatch(key, "string", other)),
        }
    }

    /// Choice index of `key`
    pub fn choice(&self, key: &str) -> StructuraResult<usize> {
        match self.require(key)? {
            ParameterValue::Choice(v) => Ok(*v),
            other => Err(Self::mismatch(key, "choice", other)),
        }
    }

    /// Element type of `key`
    pub fn data_type(&self, key: &str) -> StructuraResult<DataType> {
        match self.require(key)? {
            ParameterValue::DataType(v) => Ok(*v),
            other => Err(Self::mismatch(key, "data type", other)),
        }
    }

    /// Shape of `key`
    pub fn shape(&self, key: &str) -> StructuraResult<&Shape> {
        match self.require(key)? {
            ParameterValue::Shape(v) => Ok(v),
            other => Err(Self::mismatch(key, "shape", other)),
        }
    }

    /// Path of `key`
    pub fn path(&self, key: &str) -> StructuraResult<&DataPath> {
        match self.require(key)? {
            ParameterValue::Path(v) => Ok(v),
            other => Err(Self::mismatch(key, "path", other)),
        }
    }

    /// Paths of `key`
    pub fn path_list(&self, key: &str) -> StructuraResult<&[DataPath]> {
        match self.require(key)? {
            ParameterValue::PathList(v) => Ok(v),
            other => Err(Self::mismatch(key, "path list", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> DataPath {
        DataPath::parse(text).unwrap()
    }

    fn schema() -> Parameters {
        let mut params = Parameters::new();
        params.insert(Parameter::new(
            "count",
            "Count",
            ParameterKind::Integer {
                min: Some(1),
                max: Some(10),
            },
            3i64,
        ));
        params.insert(Parameter::float("value", "Value", 0.5));
        params.insert(Parameter::choice("mode", "Mode", &["fast", "exact"], 0));
        params.insert(Parameter::bool("use_output", "Use Output", false));
        params.insert(Parameter::created_path("output", "Output"));
        params.link("use_output", true, "output");
        params
    }

    #[test]
    fn defaults_fill_missing_arguments() {
        let (result, warnings) = schema().validate(&Arguments::new()).into_parts();
        let args = result.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(args.integer("count").unwrap(), 3);
        assert_eq!(args.float("value").unwrap(), 0.5);
        assert_eq!(args.choice("mode").unwrap(), 0);
        // Inactive, so the empty default is not rejected.
        assert!(args.path("output").unwrap().is_empty());
    }

    #[test]
    fn linked_parameter_is_checked_once_active() {
        let args = Arguments::new().with("use_output", true);
        let outcome = schema().validate(&args);
        let errors = outcome.error_list();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'output'"));

        let args = args.with("output", path("G/Out"));
        assert!(schema().validate(&args).is_ok());
    }

    #[test]
    fn choice_links_match_labels_and_indices() {
        let mut params = Parameters::new();
        params.insert(Parameter::choice("mode", "Mode", &["fast", "exact"], 0));
        params.insert(Parameter::new(
            "tolerance",
            "Tolerance",
            ParameterKind::Float {
                min: Some(0.0),
                max: None,
            },
            0.0,
        ));
        params.link("mode", ParameterValue::Choice(1), "tolerance");

        assert!(params.is_active("tolerance", &Arguments::new().with("mode", "exact")));
        assert!(params.is_active("tolerance", &Arguments::new().with("mode", ParameterValue::Choice(1))));
        assert!(!params.is_active("tolerance", &Arguments::new().with("mode", "fast")));
        assert!(!params.is_active("tolerance", &Arguments::new()));

        let args = Arguments::new().with("mode", "exact").with("tolerance", -1.0);
        assert!(!params.validate(&args).is_ok());
    }

    #[test]
    fn range_and_type_errors_are_all_reported() {
        let args = Arguments::new().with("count", 11i64).with("value", "high");
        let outcome = schema().validate(&args);
        assert_eq!(outcome.error_list().len(), 2);
        assert!(outcome
            .error_list()
            .iter()
            .all(|d| d.code == StructuraError::invalid_parameter("", "").code()));
    }

    #[test]
    fn values_are_coerced() {
        let args = Arguments::new().with("value", 2i64).with("mode", "exact");
        let args = schema().validate(&args).result.unwrap();
        assert_eq!(args.get("value"), Some(&ParameterValue::Float(2.0)));
        assert_eq!(args.choice("mode").unwrap(), 1);
    }

    #[test]
    fn unknown_arguments_only_warn() {
        let args = Arguments::new().with("colour", "blue");
        let outcome = schema().validate(&args);
        assert!(outcome.is_ok());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].code, UNKNOWN_ARGUMENT);
        assert!(outcome.result.unwrap().get("colour").is_none());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let args = Arguments::new().with("value", f64::NAN);
        assert!(!schema().validate(&args).is_ok());
    }

    #[test]
    fn check_paths_enforces_existence_and_type() {
        let mut graph = DataGraph::new();
        graph.create_group(&DataPath::empty(), "G").unwrap();
        let mut params = Parameters::new();
        params.insert(Parameter::data_path("input", "Input", &[ObjectType::DataArray]));
        params.insert(Parameter::path_list("objects", "Objects", &[]));

        let args = Arguments::new()
            .with("input", path("G"))
            .with("objects", vec![path("G"), path("Missing")]);
        let errors = params.check_paths(&graph, &args);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("not accepted"));
        assert_eq!(errors[1].code, StructuraError::not_found(path("Missing")).code());
    }

    #[test]
    fn typed_getters_report_mismatches() {
        let args = Arguments::new().with("flag", true);
        let err = args.float("flag").unwrap_err();
        assert!(matches!(err, StructuraError::InvalidParameter { ref key, .. } if key == "flag"));
        assert!(args.string("missing").is_err());
    }

    #[test]
    fn arguments_serialize_as_a_plain_map() {
        let args = Arguments::new()
            .with("path", path("G/AM"))
            .with("data_type", DataType::Int32);
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"data_type":{"data_type":"int32"},"path":{"path":"G/AM"}}"#);
        assert_eq!(serde_json::from_str::<Arguments>(&json).unwrap(), args);
    }
}
