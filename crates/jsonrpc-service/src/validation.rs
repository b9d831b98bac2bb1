//! Optional per-method parameter constraints.
//!
//! A constraint is a JSON Schema compiled when the method is registered, or
//! an external [`ParamValidator`]. The binder runs them before dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{Value, json};

use crate::binder::CallArgs;
use crate::error::ServiceError;
use crate::signature::Signature;

/// Most schema errors reported for one value.
const MAX_REPORTED_ERRORS: usize = 5;

/// External validator hook. Returns a description of the violation.
pub trait ParamValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl<F> ParamValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<(), String> {
        self(value)
    }
}

/// A compiled JSON Schema together with its source document.
#[derive(Clone)]
pub struct SchemaConstraint {
    schema: Value,
    validator: Arc<Validator>,
}

impl SchemaConstraint {
    /// Compile `schema`, reporting an unusable schema as an invalid spec.
    pub fn compile(schema: Value) -> Result<Self, ServiceError> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| ServiceError::InvalidSpec(format!("invalid JSON Schema: {}", err)))?;
        Ok(Self {
            schema,
            validator: Arc::new(validator),
        })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        if self.validator.is_valid(value) {
            return Ok(());
        }

        let errors: Vec<_> = self
            .validator
            .iter_errors(value)
            .take(MAX_REPORTED_ERRORS)
            .map(|err| err.to_string())
            .collect();
        Err(errors.join("; "))
    }
}

impl fmt::Debug for SchemaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaConstraint").field(&self.schema).finish()
    }
}

/// Constraint on a single parameter value.
#[derive(Clone)]
pub enum Constraint {
    Schema(SchemaConstraint),
    Custom(Arc<dyn ParamValidator>),
}

impl Constraint {
    /// Constraint from a full JSON Schema document.
    pub fn schema(schema: Value) -> Result<Self, ServiceError> {
        Ok(Constraint::Schema(SchemaConstraint::compile(schema)?))
    }

    pub fn custom<V>(validator: V) -> Self
    where
        V: ParamValidator + 'static,
    {
        Constraint::Custom(Arc::new(validator))
    }

    /// Read a constraint from its JSON form.
    ///
    /// An object or boolean is a JSON Schema. A string is shorthand for
    /// `{"type": <string>}` and a list of strings for `{"type": [...]}`.
    pub fn from_value(spec: &Value) -> Result<Self, ServiceError> {
        match spec {
            Value::Object(_) | Value::Bool(_) => Self::schema(spec.clone()),
            Value::String(_) => Self::schema(json!({ "type": spec })),
            Value::Array(names) if names.is_empty() => Err(ServiceError::InvalidSpec(
                "empty list of accepted types".to_string(),
            )),
            Value::Array(names) if names.iter().all(Value::is_string) => {
                Self::schema(json!({ "type": spec }))
            }
            other => Err(ServiceError::InvalidSpec(format!(
                "constraint must be a JSON Schema or a type name, got {}",
                other
            ))),
        }
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Schema(schema) => schema.check(value),
            Constraint::Custom(validator) => validator.validate(value),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Schema(schema) => f.debug_tuple("Schema").field(schema.schema()).finish(),
            Constraint::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Per-method validation: absent, by position, by name, or one schema
/// applied to the params value as a whole.
#[derive(Debug, Clone, Default)]
pub enum ParamValidation {
    #[default]
    None,
    Positional(Vec<Constraint>),
    Named(HashMap<String, Constraint>),
    Whole(Constraint),
}

impl ParamValidation {
    pub fn positional(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        ParamValidation::Positional(constraints.into_iter().collect())
    }

    pub fn named<K>(constraints: impl IntoIterator<Item = (K, Constraint)>) -> Self
    where
        K: Into<String>,
    {
        ParamValidation::Named(
            constraints
                .into_iter()
                .map(|(name, constraint)| (name.into(), constraint))
                .collect(),
        )
    }

    /// Read a validation spec from JSON. An array yields positional
    /// constraints, an object named constraints; anything else is rejected.
    pub fn from_value(spec: &Value) -> Result<Self, ServiceError> {
        match spec {
            Value::Array(items) => Ok(ParamValidation::Positional(
                items
                    .iter()
                    .map(Constraint::from_value)
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(items) => Ok(ParamValidation::Named(
                items
                    .iter()
                    .map(|(name, spec)| {
                        Constraint::from_value(spec).map(|constraint| (name.clone(), constraint))
                    })
                    .collect::<Result<_, _>>()?,
            )),
            other => Err(ServiceError::InvalidSpec(format!(
                "validation spec must be an array or an object, got {}",
                other
            ))),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParamValidation::None)
    }

    /// Check that the constraints can be matched against the signature.
    pub fn check_against(&self, signature: &Signature) -> Result<(), ServiceError> {
        match (self, signature) {
            (ParamValidation::None | ParamValidation::Whole(_), _) | (_, Signature::Any) => Ok(()),
            (ParamValidation::Positional(constraints), sig) => match sig.max_count() {
                Some(max) if constraints.len() > max => Err(ServiceError::InvalidSpec(format!(
                    "{} positional constraints for at most {} parameters",
                    constraints.len(),
                    max
                ))),
                _ => Ok(()),
            },
            (ParamValidation::Named(_), Signature::Arity { .. }) => Err(ServiceError::InvalidSpec(
                "named constraints need a signature with parameter names".to_string(),
            )),
            (ParamValidation::Named(constraints), sig) => {
                let mut unknown: Vec<_> = constraints
                    .keys()
                    .filter(|name| sig.param(name).is_none())
                    .map(String::as_str)
                    .collect();
                if unknown.is_empty() {
                    Ok(())
                } else {
                    unknown.sort_unstable();
                    Err(ServiceError::InvalidSpec(format!(
                        "constraints for undeclared parameters: {}",
                        unknown.join(", ")
                    )))
                }
            }
        }
    }

    /// Check bound arguments. Positions and names are translated through
    /// the signature when the call shape differs from the constraint shape.
    pub fn validate(&self, args: &CallArgs, signature: &Signature) -> Result<(), String> {
        match (self, args) {
            (ParamValidation::None, _) => Ok(()),
            // absent params are checked as null
            (ParamValidation::Whole(constraint), args) => constraint
                .check(&args.to_value())
                .map_err(|err| format!("params: {}", err)),
            (_, CallArgs::None) => Ok(()),
            (ParamValidation::Positional(constraints), CallArgs::Positional(values)) => constraints
                .iter()
                .zip(values)
                .enumerate()
                .try_for_each(|(index, (constraint, value))| {
                    constraint
                        .check(value)
                        .map_err(|err| format!("parameter {}: {}", index, err))
                }),
            (ParamValidation::Named(constraints), CallArgs::Named(values)) => {
                let mut names: Vec<_> = values.keys().collect();
                names.sort_unstable();
                names.into_iter().try_for_each(|name| {
                    match (constraints.get(name), values.get(name)) {
                        (Some(constraint), Some(value)) => constraint
                            .check(value)
                            .map_err(|err| format!("parameter '{}': {}", name, err)),
                        _ => Ok(()),
                    }
                })
            }
            (ParamValidation::Positional(constraints), CallArgs::Named(values)) => {
                constraints
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, constraint)| {
                        let name = signature.name_at(index).ok_or_else(|| {
                            "expected positional parameters".to_string()
                        })?;
                        match values.get(name) {
                            Some(value) => constraint
                                .check(value)
                                .map_err(|err| format!("parameter '{}': {}", name, err)),
                            None => Ok(()),
                        }
                    })
            }
            (ParamValidation::Named(constraints), CallArgs::Positional(values)) => {
                values.iter().enumerate().try_for_each(|(index, value)| {
                    let name = signature
                        .name_at(index)
                        .ok_or_else(|| "expected named parameters".to_string())?;
                    match constraints.get(name) {
                        Some(constraint) => constraint
                            .check(value)
                            .map_err(|err| format!("parameter '{}': {}", name, err)),
                        None => Ok(()),
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ParamSpec;

    fn constraint(spec: Value) -> Constraint {
        Constraint::from_value(&spec).unwrap()
    }

    #[test]
    fn test_type_shorthand() {
        let number = constraint(json!("number"));
        assert!(number.check(&json!(6)).is_ok());
        assert!(number.check(&json!(6.5)).is_ok());
        assert!(number.check(&json!("6")).is_err());

        let nullable = constraint(json!(["string", "null"]));
        assert!(nullable.check(&json!(null)).is_ok());
        assert!(nullable.check(&json!(1)).is_err());
    }

    #[test]
    fn test_schema_keywords() {
        let age = constraint(json!({"type": "integer", "minimum": 0}));
        assert!(age.check(&json!(30)).is_ok());
        assert!(age.check(&json!(-1)).is_err());

        let name = constraint(json!({"type": "string", "minLength": 1}));
        assert!(name.check(&json!("")).is_err());

        let colour = constraint(json!({"enum": ["red", "green"]}));
        assert!(colour.check(&json!("red")).is_ok());
        assert!(colour.check(&json!("blue")).is_err());

        let point = constraint(json!({
            "type": "object",
            "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
            "required": ["x", "y"]
        }));
        assert!(point.check(&json!({"x": 1, "y": 2})).is_ok());
        assert!(point.check(&json!({"x": 1})).is_err());
    }

    #[test]
    fn test_spec_from_value() {
        let spec = ParamValidation::from_value(&json!([
            "string",
            {"type": "integer", "minimum": 0},
            ["number", "null"]
        ]))
        .unwrap();
        assert!(matches!(spec, ParamValidation::Positional(ref c) if c.len() == 3));

        let spec = ParamValidation::from_value(&json!({"a": {"type": "integer"}})).unwrap();
        assert!(matches!(spec, ParamValidation::Named(_)));
    }

    #[test]
    fn test_spec_shape_rejected() {
        assert!(matches!(
            ParamValidation::from_value(&json!("integer")),
            Err(ServiceError::InvalidSpec(_))
        ));
        assert!(ParamValidation::from_value(&json!(["decimal"])).is_err());
        assert!(ParamValidation::from_value(&json!({"a": 5})).is_err());
        assert!(ParamValidation::from_value(&json!({"a": {"type": 12}})).is_err());
        assert!(ParamValidation::from_value(&json!([[]])).is_err());
    }

    #[test]
    fn test_positional_validation() {
        let spec = ParamValidation::from_value(&json!(["integer", "boolean", "number"])).unwrap();
        let ok = CallArgs::Positional(vec![json!(1), json!(false), json!(6.0)]);
        assert!(spec.validate(&ok, &Signature::Any).is_ok());

        let bad = CallArgs::Positional(vec![json!(1), json!(false), json!("x")]);
        let err = spec.validate(&bad, &Signature::Any).unwrap_err();
        assert!(err.starts_with("parameter 2: "), "{}", err);
        assert!(err.contains("number"), "{}", err);
    }

    #[test]
    fn test_named_constraints_against_positional_call() {
        let signature = Signature::required_names(["a", "b"]);
        let spec = ParamValidation::named([("b", constraint(json!({"type": "string"})))]);
        let args = CallArgs::Positional(vec![json!(1), json!(2)]);

        let err = spec.validate(&args, &signature).unwrap_err();
        assert!(err.starts_with("parameter 'b': "), "{}", err);
    }

    #[test]
    fn test_whole_params_schema() {
        let spec = ParamValidation::Whole(constraint(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"],
            "additionalProperties": false
        })));

        let ok = CallArgs::Named([("name".to_string(), json!("x"))].into_iter().collect());
        assert!(spec.validate(&ok, &Signature::Any).is_ok());

        let extra = CallArgs::Named(
            [("name".to_string(), json!("x")), ("other".to_string(), json!(1))]
                .into_iter()
                .collect(),
        );
        assert!(spec.validate(&extra, &Signature::Any).is_err());

        let err = spec.validate(&CallArgs::None, &Signature::Any).unwrap_err();
        assert!(err.starts_with("params: "), "{}", err);
    }

    #[test]
    fn test_custom_validator() {
        let spec = ParamValidation::positional([Constraint::custom(|value: &Value| {
            match value.as_i64() {
                Some(n) if n > 0 => Ok(()),
                _ => Err("must be a positive integer".to_string()),
            }
        })]);
        let args = CallArgs::Positional(vec![json!(-3)]);
        assert_eq!(
            spec.validate(&args, &Signature::Any).unwrap_err(),
            "parameter 0: must be a positive integer"
        );
    }

    #[test]
    fn test_check_against_signature() {
        let signature = Signature::named([ParamSpec::required("a")]);
        let spec = ParamValidation::named([("z", constraint(json!({})))]);
        assert!(spec.check_against(&signature).is_err());

        let spec = ParamValidation::positional([constraint(json!(true)), constraint(json!(true))]);
        assert!(spec.check_against(&Signature::arity(1)).is_err());
        assert!(spec.check_against(&Signature::arity(2)).is_ok());
    }
}
