//! Factory parameters and their canonical form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::component::ComponentId;
use crate::error::{LayoutError, Result};

/// Namespace for ids derived from cache keys.
const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b9e_54a3_4d0e_9b7a_3c51_e2d8_a604);

/// A single factory parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// An unset optional parameter.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
    /// Another component, built on demand by its own factory.
    Spec(ComponentSpec),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<ComponentSpec> for ParamValue {
    fn from(v: ComponentSpec) -> Self {
        ParamValue::Spec(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Named parameters of one factory call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `overrides` on top of `self`.
    pub fn merged(&self, overrides: &Params) -> Params {
        let mut out = self.clone();
        for (k, v) in overrides.iter() {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.get(name)
            .ok_or_else(|| LayoutError::MissingParameter(name.to_string()))
    }

    /// Numeric parameter; integers are widened.
    pub fn f64(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(type_error(name, "a number", other)),
        }
    }

    /// Numeric parameter that may be left unset.
    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.require(name)? {
            ParamValue::Null => Ok(None),
            _ => self.f64(name).map(Some),
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(type_error(name, "an integer", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(type_error(name, "a boolean", other)),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::Str(v) => Ok(v),
            other => Err(type_error(name, "a string", other)),
        }
    }

    /// A component spec; a bare string names a factory with no overrides.
    pub fn spec(&self, name: &str) -> Result<ComponentSpec> {
        match self.require(name)? {
            ParamValue::Spec(s) => Ok(s.clone()),
            ParamValue::Str(s) => Ok(ComponentSpec::new(s)),
            other => Err(type_error(name, "a component spec", other)),
        }
    }
}

fn type_error(name: &str, expected: &str, got: &ParamValue) -> LayoutError {
    LayoutError::InvalidParameter {
        parameter: name.to_string(),
        reason: format!("expected {expected}, got {got:?}"),
    }
}

/// A factory name plus the parameters to call it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub factory: String,
    pub params: Params,
}

impl ComponentSpec {
    pub fn new(factory: &str) -> Self {
        Self {
            factory: factory.to_string(),
            params: Params::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.set(name, value);
        self
    }
}

impl From<&str> for ComponentSpec {
    fn from(factory: &str) -> Self {
        ComponentSpec::new(factory)
    }
}

/// Identity of one factory call: the factory plus its canonical parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub factory: String,
    pub canonical: String,
}

impl CacheKey {
    /// Deterministic component id for this key.
    pub fn component_id(&self) -> ComponentId {
        Uuid::new_v5(&KEY_NAMESPACE, self.to_string().as_bytes())
    }

    /// Component name: the factory followed by a short digest of the key.
    pub fn component_name(&self) -> String {
        let digest = self.component_id().simple().to_string();
        format!("{}_{}", self.factory, &digest[..8])
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.factory, self.canonical)
    }
}

/// Build the canonical JSON form of a full parameter set.
///
/// `resolve_spec` turns a nested spec into its own key, so a nested spec
/// that spells out its defaults matches one that omits them.
pub fn canonicalize(
    factory: &str,
    params: &Params,
    resolve_spec: &dyn Fn(&ComponentSpec) -> Result<CacheKey>,
) -> Result<CacheKey> {
    let mut object = serde_json::Map::new();
    for (name, value) in params.iter() {
        object.insert(
            name.clone(),
            canonical_value(factory, name, value, resolve_spec)?,
        );
    }
    Ok(CacheKey {
        factory: factory.to_string(),
        canonical: serde_json::to_string(&Value::Object(object))?,
    })
}

fn canonical_value(
    factory: &str,
    name: &str,
    value: &ParamValue,
    resolve_spec: &dyn Fn(&ComponentSpec) -> Result<CacheKey>,
) -> Result<Value> {
    Ok(match value {
        ParamValue::Null => Value::Null,
        ParamValue::Bool(b) => Value::Bool(*b),
        ParamValue::Int(i) => Value::Number((*i).into()),
        ParamValue::Float(f) => {
            let f = if *f == 0.0 { 0.0 } else { *f };
            let n = Number::from_f64(f).ok_or_else(|| LayoutError::NonCacheableParameter {
                factory: factory.to_string(),
                parameter: name.to_string(),
                reason: format!("{f} has no canonical form"),
            })?;
            Value::Number(n)
        }
        ParamValue::Str(s) => Value::String(s.clone()),
        ParamValue::List(items) => Value::Array(
            items
                .iter()
                .map(|v| canonical_value(factory, name, v, resolve_spec))
                .collect::<Result<_>>()?,
        ),
        ParamValue::Map(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                object.insert(k.clone(), canonical_value(factory, name, v, resolve_spec)?);
            }
            Value::Object(object)
        }
        ParamValue::Spec(spec) => {
            let key = resolve_spec(spec)?;
            let mut object = serde_json::Map::new();
            object.insert("$spec".to_string(), Value::String(key.to_string()));
            Value::Object(object)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_specs(spec: &ComponentSpec) -> Result<CacheKey> {
        Err(LayoutError::UnknownFactory(spec.factory.clone()))
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = Params::new().with("length", 4.0).with("width", 0.5);
        let b = Params::new().with("width", 0.5).with("length", 4.0);
        let ka = canonicalize("straight", &a, &no_specs).unwrap();
        let kb = canonicalize("straight", &b, &no_specs).unwrap();
        assert_eq!(ka, kb);
        assert_eq!(ka.component_id(), kb.component_id());
        assert!(ka.component_name().starts_with("straight_"));
    }

    #[test]
    fn test_int_and_float_differ() {
        let a = canonicalize("f", &Params::new().with("n", 4), &no_specs).unwrap();
        let b = canonicalize("f", &Params::new().with("n", 4.0), &no_specs).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let a = canonicalize("f", &Params::new().with("x", -0.0), &no_specs).unwrap();
        let b = canonicalize("f", &Params::new().with("x", 0.0), &no_specs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nan_is_not_cacheable() {
        let params = Params::new().with("widths", vec![0.5, f64::NAN]);
        let err = canonicalize("taper", &params, &no_specs).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::NonCacheableParameter { ref parameter, .. } if parameter == "widths"
        ));
    }

    #[test]
    fn test_nested_spec_uses_resolver() {
        let resolve = |spec: &ComponentSpec| -> Result<CacheKey> {
            Ok(CacheKey {
                factory: spec.factory.clone(),
                canonical: "{}".to_string(),
            })
        };
        let params = Params::new().with("bend", ComponentSpec::new("bend_circular"));
        let key = canonicalize("ring", &params, &resolve).unwrap();
        assert!(key.canonical.contains("bend_circular{}"));
    }

    #[test]
    fn test_typed_getters() {
        let p = Params::new()
            .with("length", 3)
            .with("name", "strip")
            .with("straight", "straight");
        assert_eq!(p.f64("length").unwrap(), 3.0);
        assert_eq!(p.str("name").unwrap(), "strip");
        assert_eq!(p.spec("straight").unwrap().factory, "straight");
        assert!(matches!(
            p.bool("length"),
            Err(LayoutError::InvalidParameter { .. })
        ));
        assert!(matches!(p.f64("width"), Err(LayoutError::MissingParameter(_))));
    }

    #[test]
    fn test_optional_number() {
        let p = Params::new()
            .with("wg_length", None::<f64>)
            .with("radius", Some(5.0));
        assert_eq!(p.opt_f64("wg_length").unwrap(), None);
        assert_eq!(p.opt_f64("radius").unwrap(), Some(5.0));
        assert!(p.f64("wg_length").is_err());

        let unset = canonicalize("f", &p, &no_specs).unwrap();
        assert!(unset.canonical.contains("\"wg_length\":null"));
    }
}
