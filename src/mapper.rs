//! The class mapper collaborator
//!
//! The codec never constructs or inspects typed values on its own; it asks
//! an injected [`ClassMapper`] to resolve wire class names, build fresh
//! instances for decoded objects, list the properties of outbound values
//! and install decoded properties. [`ClassMapping`] is the provided
//! registry-backed implementation.
use crate::types::{ClassDefinition, Element, Value};
use std::collections::HashMap;

/// Option name controlling snake_case/camelCase property translation
pub const OPT_TRANSLATE_CASE: &str = "translate_case";

/// Pseudo class name whose options apply to untyped hashes
pub const HASH_CLASS: &str = "Hash";

/// Mediates between wire class names and host values
///
/// Implementations must be read-only from the codec's point of view; one
/// mapper may be shared by any number of codec instances.
pub trait ClassMapper {
    /// Wire class name for an outbound value, or `None` to use the
    /// anonymous encoding
    fn get_class_name(&self, value: &Value) -> Option<String>;

    /// Fresh host value for an inbound wire class name
    ///
    /// May return a generic mapping when the name is unregistered. Errors
    /// are propagated to the caller unchanged.
    fn get_instance(&self, class_name: &str) -> Result<Value, String>;

    /// The properties to serialize for a value
    fn props_for_serialization(&self, value: &Value) -> Vec<Element>;

    /// Install decoded properties into a fresh instance
    ///
    /// `sealed` holds the sealed members in declared order; `dynamic` is
    /// present only when the wire trait was dynamic.
    fn populate(
        &self,
        instance: Value,
        sealed: Vec<Element>,
        dynamic: Option<Vec<Element>>,
    ) -> Result<Value, String>;

    /// Look up a per-class boolean option
    fn get_option(&self, class_name: &str, option: &str) -> bool;
}

/// Per-class options honored by the codec
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ClassOptions {
    /// Translate camelCase wire property names to snake_case on decode and
    /// back on encode
    pub translate_case: bool,
}

/// The default [`ClassMapper`]: a registry of per-class options
///
/// Unregistered class names decode to typed objects that keep their wire
/// name, so values round-trip without prior registration.
#[derive(Debug, Clone, Default)]
pub struct ClassMapping {
    options: HashMap<String, ClassOptions>,
}

impl ClassMapping {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register options for a wire class name
    ///
    /// Use [`HASH_CLASS`] to set options for untyped hashes.
    pub fn register(&mut self, class_name: impl Into<String>, options: ClassOptions) {
        self.options.insert(class_name.into(), options);
    }
}

impl ClassMapper for ClassMapping {
    fn get_class_name(&self, value: &Value) -> Option<String> {
        match value {
            Value::Object(_, Some(def)) | Value::Custom(_, _, Some(def)) => {
                if def.name.is_empty() {
                    None
                } else {
                    Some(def.name.clone())
                }
            }
            _ => None,
        }
    }

    fn get_instance(&self, class_name: &str) -> Result<Value, String> {
        if class_name.is_empty() {
            Ok(Value::Map(Vec::new()))
        } else {
            Ok(Value::Object(
                Vec::new(),
                Some(ClassDefinition::sealed(class_name)),
            ))
        }
    }

    fn props_for_serialization(&self, value: &Value) -> Vec<Element> {
        match value {
            Value::Object(elements, _) | Value::Map(elements) => elements.clone(),
            // Both the externalized and the regular elements serialize
            Value::Custom(custom, elements, _) => {
                custom.iter().chain(elements).cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    fn populate(
        &self,
        instance: Value,
        sealed: Vec<Element>,
        dynamic: Option<Vec<Element>>,
    ) -> Result<Value, String> {
        match instance {
            Value::Object(mut elements, def) => {
                elements.extend(sealed);
                elements.extend(dynamic.unwrap_or_default());
                Ok(Value::Object(elements, def))
            }
            Value::Map(mut elements) => {
                elements.extend(sealed);
                elements.extend(dynamic.unwrap_or_default());
                Ok(Value::Map(elements))
            }
            other => Ok(other),
        }
    }

    fn get_option(&self, class_name: &str, option: &str) -> bool {
        match option {
            OPT_TRANSLATE_CASE => self
                .options
                .get(class_name)
                .map(|o| o.translate_case)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Rewrite a camelCase wire property name to snake_case
///
/// ASCII only: every uppercase letter `X` becomes `_x`, all other bytes
/// pass through unchanged.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrite a snake_case property name to camelCase for the wire
///
/// ASCII only: each `_` is dropped and the following letter uppercased.
pub(crate) fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            upper_next = false;
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod case_tests {
    use super::{to_camel_case, to_snake_case};

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("aB"), "a_b");
        assert_eq!(to_snake_case("cDE"), "c_d_e");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("a_b"), "aB");
        assert_eq!(to_camel_case("c_d_e"), "cDE");
        assert_eq!(to_camel_case("plain"), "plain");
    }

    #[test]
    fn test_non_ascii_passes_through() {
        assert_eq!(to_snake_case("héllo"), "héllo");
        // The underscore is still consumed, but é has no ASCII uppercase
        assert_eq!(to_camel_case("h_éllo"), "héllo");
    }

    #[test]
    fn test_round_trip() {
        assert_eq!(to_snake_case(&to_camel_case("a_b_c")), "a_b_c");
    }
}
