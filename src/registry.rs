//! The type registry: the startup-time stand-in for reflection.
//!
//! User-defined parameter types register either a single-string factory
//! (the `value_of` / `from_string` pair) or a whole-body model binder
//! derived from their `Deserialize` implementation. The resolver
//! consults this registry; lookups after startup are plain map reads.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::ExtractError;
use crate::value::BoundValue;

/// Parses one string into a user-defined value.
pub type FactoryFn = Arc<dyn Fn(&str) -> Result<BoundValue, ExtractError> + Send + Sync>;

/// Deserializes a whole request body into a user-defined value.
pub type ModelBinder = Arc<dyn Fn(&[u8], ModelFormat) -> Result<BoundValue, ExtractError> + Send + Sync>;

/// Wire format of a model body, chosen from the request content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Xml,
}

#[derive(Clone, Default)]
struct FactoryEntry {
    value_of: Option<FactoryFn>,
    from_string: Option<FactoryFn>,
}

/// Registry of factories and model binders, keyed by type name.
///
/// Built once before synthesis; never mutated afterwards.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, FactoryEntry>,
    models: HashMap<String, ModelBinder>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `value_of`-shaped factory for `type_name`.
    pub fn register_value_of<T, E, F>(&mut self, type_name: &str, factory: F)
    where
        T: Send + 'static,
        E: std::fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let entry = self.factories.entry(type_name.to_owned()).or_default();
        entry.value_of = Some(wrap_factory(type_name, factory));
    }

    /// Registers the `from_string`-shaped factory for `type_name`.
    pub fn register_from_string<T, E, F>(&mut self, type_name: &str, factory: F)
    where
        T: Send + 'static,
        E: std::fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let entry = self.factories.entry(type_name.to_owned()).or_default();
        entry.from_string = Some(wrap_factory(type_name, factory));
    }

    /// Registers a `FromStr` type under its `from_string` slot.
    pub fn register_str_type<T>(&mut self, type_name: &str)
    where
        T: std::str::FromStr + Send + 'static,
        T::Err: std::fmt::Display,
    {
        self.register_from_string(type_name, T::from_str);
    }

    /// Registers a JSON/XML model binder derived from `Deserialize`.
    pub fn register_model<T>(&mut self, type_name: &str)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let binder: ModelBinder = Arc::new(move |bytes, format| {
            let value = match format {
                ModelFormat::Json => {
                    serde_json::from_slice::<T>(bytes).map_err(ExtractError::invalid_body)?
                }
                ModelFormat::Xml => {
                    let text = std::str::from_utf8(bytes).map_err(ExtractError::invalid_body)?;
                    quick_xml::de::from_str::<T>(text).map_err(ExtractError::invalid_body)?
                }
            };
            Ok(BoundValue::Custom(Box::new(value)))
        });
        self.models.insert(type_name.to_owned(), binder);
    }

    /// The factory for a type, `value_of` taking precedence over
    /// `from_string` when both are registered.
    pub(crate) fn factory(&self, type_name: &str) -> Option<FactoryFn> {
        let entry = self.factories.get(type_name)?;
        entry.value_of.clone().or_else(|| entry.from_string.clone())
    }

    pub(crate) fn model_binder(&self, type_name: &str) -> Option<ModelBinder> {
        self.models.get(type_name).cloned()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("factories", &self.factories.len())
            .field("models", &self.models.len())
            .finish()
    }
}

fn wrap_factory<T, E, F>(type_name: &str, factory: F) -> FactoryFn
where
    T: Send + 'static,
    E: std::fmt::Display,
    F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
{
    let type_name = type_name.to_owned();
    Arc::new(move |raw| match factory(raw) {
        Ok(value) => Ok(BoundValue::Custom(Box::new(value))),
        Err(e) => Err(ExtractError::invalid(&type_name, e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        name: String,
    }

    #[derive(Debug, PartialEq)]
    struct Tag(String);

    #[test]
    fn value_of_takes_precedence_over_from_string() {
        let mut registry = TypeRegistry::new();
        registry.register_from_string("Tag", |s: &str| Ok::<_, std::convert::Infallible>(Tag(format!("fs:{s}"))));
        registry.register_value_of("Tag", |s: &str| Ok::<_, std::convert::Infallible>(Tag(format!("vo:{s}"))));

        let factory = registry.factory("Tag").unwrap();
        let value = factory("x").unwrap().into_custom::<Tag>().unwrap();
        assert_eq!(value, Tag("vo:x".into()));
    }

    #[test]
    fn from_string_is_used_when_alone() {
        let mut registry = TypeRegistry::new();
        registry.register_from_string("Tag", |s: &str| Ok::<_, std::convert::Infallible>(Tag(s.to_owned())));

        let factory = registry.factory("Tag").unwrap();
        let value = factory("solo").unwrap().into_custom::<Tag>().unwrap();
        assert_eq!(value, Tag("solo".into()));
    }

    #[test]
    fn factory_failure_is_an_invalid_parameter() {
        let mut registry = TypeRegistry::new();
        registry.register_str_type::<u16>("u16");

        let factory = registry.factory("u16").unwrap();
        let err = factory("not a number").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidParameter { .. }));
    }

    #[test]
    fn model_binder_reads_json_and_xml() {
        let mut registry = TypeRegistry::new();
        registry.register_model::<Item>("Item");
        let binder = registry.model_binder("Item").unwrap();

        let from_json = binder(br#"{"name":"x"}"#, ModelFormat::Json).unwrap();
        assert_eq!(from_json.into_custom::<Item>().unwrap(), Item { name: "x".into() });

        let from_xml = binder(b"<Item><name>x</name></Item>", ModelFormat::Xml).unwrap();
        assert_eq!(from_xml.into_custom::<Item>().unwrap(), Item { name: "x".into() });
    }

    #[test]
    fn malformed_model_body_is_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register_model::<Item>("Item");
        let binder = registry.model_binder("Item").unwrap();

        let err = binder(b"{not json", ModelFormat::Json).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidBody { .. }));
    }

    #[test]
    fn unknown_types_have_no_factory() {
        let registry = TypeRegistry::new();
        assert!(registry.factory("Nope").is_none());
        assert!(registry.model_binder("Nope").is_none());
    }
}
