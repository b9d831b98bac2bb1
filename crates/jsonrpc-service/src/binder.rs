//! Reconciles supplied params with a method's calling convention.
//!
//! The binder only shapes the call; it never runs the method.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{JsonRpcErrorObject, MethodError};
use crate::registry::MethodEntry;
use crate::request::RequestParams;
use crate::signature::Signature;

/// Arguments handed to a registered method. The shape of the request is
/// preserved: a method is called either positionally or by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallArgs {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(HashMap<String, Value>),
}

impl CallArgs {
    pub fn is_empty(&self) -> bool {
        match self {
            CallArgs::None => true,
            CallArgs::Positional(values) => values.is_empty(),
            CallArgs::Named(values) => values.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CallArgs::None => 0,
            CallArgs::Positional(values) => values.len(),
            CallArgs::Named(values) => values.len(),
        }
    }

    pub fn positional(&self) -> Option<&[Value]> {
        match self {
            CallArgs::Positional(values) => Some(values),
            _ => None,
        }
    }

    pub fn named(&self) -> Option<&HashMap<String, Value>> {
        match self {
            CallArgs::Named(values) => Some(values),
            _ => None,
        }
    }

    /// Look up an argument that may arrive at `position` or as `name`.
    pub fn get(&self, position: usize, name: &str) -> Option<&Value> {
        match self {
            CallArgs::None => None,
            CallArgs::Positional(values) => values.get(position),
            CallArgs::Named(values) => values.get(name),
        }
    }

    /// Like [`CallArgs::get`] but decodes the value, reporting absence or a
    /// type mismatch as invalid params.
    pub fn require<T>(&self, position: usize, name: &str) -> Result<T, MethodError>
    where
        T: DeserializeOwned,
    {
        let value = self
            .get(position, name)
            .ok_or_else(|| MethodError::invalid_params(format!("missing parameter '{}'", name)))?;
        serde_json::from_value(value.clone()).map_err(|err| {
            MethodError::invalid_params(format!("parameter '{}': {}", name, err))
        })
    }

    /// Decode all arguments at once: a sequence for positional calls, a
    /// struct or map for named calls.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, MethodError> {
        Ok(serde_json::from_value(self.to_value())?)
    }

    pub fn to_value(&self) -> Value {
        match self {
            CallArgs::None => Value::Null,
            CallArgs::Positional(values) => Value::Array(values.clone()),
            CallArgs::Named(values) => {
                Value::Object(values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
        }
    }
}

impl From<Option<RequestParams>> for CallArgs {
    fn from(params: Option<RequestParams>) -> Self {
        match params {
            None => CallArgs::None,
            Some(RequestParams::Array(values)) => CallArgs::Positional(values),
            Some(RequestParams::Object(values)) => CallArgs::Named(values),
        }
    }
}

/// Bind `params` to `entry`'s signature and run its validation spec.
///
/// Absent params bind to [`CallArgs::None`]; whether the method can run
/// without arguments is decided when it is dispatched.
pub fn bind(
    entry: &MethodEntry,
    params: Option<RequestParams>,
) -> Result<CallArgs, JsonRpcErrorObject> {
    let args = CallArgs::from(params);
    check_shape(entry.name(), entry.signature(), &args)?;

    entry
        .validation()
        .validate(&args, entry.signature())
        .map_err(JsonRpcErrorObject::invalid_params)?;

    Ok(args)
}

fn check_shape(
    method: &str,
    signature: &Signature,
    args: &CallArgs,
) -> Result<(), JsonRpcErrorObject> {
    match (signature, args) {
        (Signature::Any, _) | (_, CallArgs::None) => Ok(()),
        (sig, CallArgs::Positional(values)) => {
            let required = sig.required_count().unwrap_or(0);
            let max = sig.max_count().unwrap_or(usize::MAX);
            if values.len() < required || values.len() > max {
                Err(JsonRpcErrorObject::invalid_params(format!(
                    "method '{}' takes {} positional parameters, {} supplied",
                    method,
                    describe_range(required, max),
                    values.len()
                )))
            } else {
                Ok(())
            }
        }
        (Signature::Arity { .. }, CallArgs::Named(_)) => Err(JsonRpcErrorObject::invalid_params(
            format!("method '{}' accepts positional parameters only", method),
        )),
        (Signature::Named(params), CallArgs::Named(values)) => {
            let mut unknown: Vec<_> = values
                .keys()
                .filter(|key| !params.iter().any(|p| &p.name == *key))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                unknown.sort_unstable();
                return Err(JsonRpcErrorObject::invalid_params(format!(
                    "unknown parameters for method '{}': {}",
                    method,
                    unknown.join(", ")
                )));
            }

            let missing: Vec<_> = params
                .iter()
                .filter(|p| p.required && !values.contains_key(&p.name))
                .map(|p| p.name.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(JsonRpcErrorObject::invalid_params(format!(
                    "missing required parameters for method '{}': {}",
                    method,
                    missing.join(", ")
                )));
            }
            Ok(())
        }
    }
}

fn describe_range(required: usize, max: usize) -> String {
    if required == max {
        required.to_string()
    } else if max == usize::MAX {
        format!("at least {}", required)
    } else {
        format!("{} to {}", required, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::SyncHandler;
    use crate::registry::RegisterOptions;
    use crate::signature::ParamSpec;
    use crate::validation::ParamValidation;
    use serde_json::json;

    fn entry(options: RegisterOptions) -> MethodEntry {
        MethodEntry::new(
            "subject",
            SyncHandler::new(|_args: CallArgs, _ctx: &crate::CallContext| Ok(Value::Null)),
            options,
        )
        .unwrap()
    }

    fn named(pairs: &[(&str, Value)]) -> Option<RequestParams> {
        Some(RequestParams::Object(
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ))
    }

    #[test]
    fn test_positional_arity() {
        let entry = entry(RegisterOptions::new().signature(Signature::arity(2)));

        assert!(bind(&entry, Some(vec![json!(1), json!(2)].into())).is_ok());

        let err = bind(&entry, Some(vec![json!(1)].into())).unwrap_err();
        assert_eq!(err.code, -32602);
        assert_eq!(
            err.data,
            Some(json!({"details": "method 'subject' takes 2 positional parameters, 1 supplied"}))
        );

        assert!(bind(&entry, Some(vec![json!(1), json!(2), json!(3)].into())).is_err());
    }

    #[test]
    fn test_optional_positional() {
        let entry = entry(RegisterOptions::new().signature(Signature::named([
            ParamSpec::required("a"),
            ParamSpec::optional("b"),
        ])));

        assert!(bind(&entry, Some(vec![json!(1)].into())).is_ok());
        assert!(bind(&entry, Some(vec![json!(1), json!(2)].into())).is_ok());
        assert!(bind(&entry, Some(vec![].into())).is_err());
    }

    #[test]
    fn test_named_binding() {
        let entry = entry(RegisterOptions::new().signature(Signature::named([
            ParamSpec::required("y"),
            ParamSpec::optional("z"),
        ])));

        let args = bind(&entry, named(&[("y", json!(1))])).unwrap();
        assert_eq!(args.get(0, "y"), Some(&json!(1)));

        let err = bind(&entry, named(&[("x", json!(1))])).unwrap_err();
        assert_eq!(err.code, -32602);

        let err = bind(&entry, named(&[("z", json!(1))])).unwrap_err();
        assert_eq!(
            err.data,
            Some(json!({"details": "missing required parameters for method 'subject': y"}))
        );
    }

    #[test]
    fn test_named_against_arity() {
        let entry = entry(RegisterOptions::new().signature(Signature::arity(1)));
        let err = bind(&entry, named(&[("a", json!(1))])).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn test_any_signature_passes_through() {
        let entry = entry(RegisterOptions::new());
        let args = bind(&entry, named(&[("anything", json!(true))])).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(bind(&entry, None).unwrap(), CallArgs::None);
    }

    #[test]
    fn test_validation_failure_carries_detail() {
        let spec = json!({"a": "integer", "c": {"type": "number", "maximum": 10}});
        let entry = entry(
            RegisterOptions::new().validation(ParamValidation::from_value(&spec).unwrap()),
        );

        assert!(bind(&entry, named(&[("a", json!(1)), ("c", json!(6))])).is_ok());

        let err = bind(&entry, named(&[("a", json!(1)), ("c", json!("6"))])).unwrap_err();
        assert_eq!(err.code, -32602);
        let details = err.data.as_ref().and_then(|d| d["details"].as_str()).unwrap();
        assert!(details.starts_with("parameter 'c': "), "{}", details);
        assert!(details.contains("\"6\""), "{}", details);

        let err = bind(&entry, named(&[("a", json!(1)), ("c", json!(11))])).unwrap_err();
        let details = err.data.as_ref().and_then(|d| d["details"].as_str()).unwrap();
        assert!(details.contains("maximum"), "{}", details);
    }

    #[test]
    fn test_call_args_decoding() {
        let args = CallArgs::Positional(vec![json!(3), json!(4)]);
        let pair: (i64, i64) = args.parse().unwrap();
        assert_eq!(pair, (3, 4));

        let first: i64 = args.require(0, "a").unwrap();
        assert_eq!(first, 3);

        let missing = args.require::<i64>(5, "f").unwrap_err();
        assert_eq!(missing.code(), Some(crate::JsonRpcErrorCode::InvalidParams));
    }
}
