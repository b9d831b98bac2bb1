//! Calling-convention descriptors captured when a method is registered.

use std::collections::HashSet;

use crate::error::ServiceError;

/// A named parameter of a registered method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// How a method expects to be called.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Signature {
    /// Shape unknown in advance; the method checks its own arguments.
    #[default]
    Any,
    /// Positional only: `required` mandatory values followed by up to
    /// `optional` extra values.
    Arity { required: usize, optional: usize },
    /// Ordered named parameters. Accepts either a mapping or a sequence
    /// bound to the names in order.
    Named(Vec<ParamSpec>),
}

impl Signature {
    pub fn arity(required: usize) -> Self {
        Signature::Arity {
            required,
            optional: 0,
        }
    }

    pub fn arity_range(required: usize, optional: usize) -> Self {
        Signature::Arity { required, optional }
    }

    pub fn named(params: impl IntoIterator<Item = ParamSpec>) -> Self {
        Signature::Named(params.into_iter().collect())
    }

    /// Shorthand for a signature where every listed name is required.
    pub fn required_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Signature::Named(names.into_iter().map(ParamSpec::required).collect())
    }

    /// Minimum number of arguments, when known.
    pub fn required_count(&self) -> Option<usize> {
        match self {
            Signature::Any => None,
            Signature::Arity { required, .. } => Some(*required),
            Signature::Named(params) => Some(params.iter().filter(|p| p.required).count()),
        }
    }

    /// Maximum number of arguments, when known.
    pub fn max_count(&self) -> Option<usize> {
        match self {
            Signature::Any => None,
            Signature::Arity { required, optional } => Some(required.saturating_add(*optional)),
            Signature::Named(params) => Some(params.len()),
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        match self {
            Signature::Named(params) => params.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// Name bound to a positional slot, for named signatures.
    pub fn name_at(&self, position: usize) -> Option<&str> {
        match self {
            Signature::Named(params) => params.get(position).map(|p| p.name.as_str()),
            _ => None,
        }
    }

    /// Reject descriptors that cannot bind arguments unambiguously.
    pub fn check(&self) -> Result<(), ServiceError> {
        let Signature::Named(params) = self else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        let mut optional_seen = false;
        for param in params {
            if param.name.is_empty() {
                return Err(ServiceError::InvalidSpec(
                    "parameter names must not be empty".to_string(),
                ));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ServiceError::InvalidSpec(format!(
                    "parameter '{}' is declared twice",
                    param.name
                )));
            }
            if param.required && optional_seen {
                return Err(ServiceError::InvalidSpec(format!(
                    "required parameter '{}' follows an optional one",
                    param.name
                )));
            }
            optional_seen |= !param.required;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let sig = Signature::named([
            ParamSpec::required("a"),
            ParamSpec::required("b"),
            ParamSpec::optional("c"),
        ]);
        assert_eq!(sig.required_count(), Some(2));
        assert_eq!(sig.max_count(), Some(3));
        assert_eq!(sig.name_at(2), Some("c"));

        assert_eq!(Signature::arity_range(1, 2).max_count(), Some(3));
        assert_eq!(Signature::Any.required_count(), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let sig = Signature::required_names(["x", "x"]);
        assert!(matches!(sig.check(), Err(ServiceError::InvalidSpec(_))));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let sig = Signature::named([ParamSpec::optional("a"), ParamSpec::required("b")]);
        assert!(sig.check().is_err());

        let sig = Signature::named([ParamSpec::required("a"), ParamSpec::optional("b")]);
        assert!(sig.check().is_ok());
    }

    #[test]
    fn test_max_count_saturates() {
        assert_eq!(Signature::arity_range(usize::MAX, 1).max_count(), Some(usize::MAX));
        assert_eq!(Signature::arity_range(usize::MAX, 1).required_count(), Some(usize::MAX));
    }
}
