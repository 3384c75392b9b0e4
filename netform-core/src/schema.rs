//! Schema - Declare configuration schemas for resources
//!
//! Providers declare a schema for each resource type. The host validates user
//! configuration against it before any API call, and uses the force-new flags
//! to decide between an in-place update and a replacement.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::crud::Timeouts;

/// Decides whether a difference on one attribute should be ignored.
///
/// Arguments are the attribute name, the prior value, the new value and the
/// full new configuration.
pub type DiffSuppressFn = fn(&str, &Value, &Value, &Map<String, Value>) -> bool;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Nested block of attributes
    Block(BlockSchema),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    // An empty block arrives as null; the resource decides
                    // whether that is acceptable when it builds its request.
                    if item.is_null() && matches!(**inner, AttributeType::Block(_)) {
                        continue;
                    }
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::Object(map)) => match block.validate(map) {
                Ok(()) => Ok(()),
                Err(mut errors) => Err(errors.remove(0)),
            },

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: json_type_name(value).to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Int",
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Block",
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' conflicts with '{other}'")]
    ConflictingAttributes { name: String, other: String },

    #[error("Attribute '{name}' allows at most {max} item(s), got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing this attribute replaces the resource
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub conflicts_with: Vec<String>,
    pub max_items: Option<usize>,
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl AttributeSchema {
    /// A new optional attribute
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            default: None,
            description: None,
            conflicts_with: Vec::new(),
            max_items: None,
            diff_suppress: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Set only by the provider
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self.required = false;
        self
    }

    /// Settable by the user, filled in by the provider otherwise
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self.required = false;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.conflicts_with = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_diff_suppress(mut self, f: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(f);
        self
    }
}

/// Attributes of a nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: BTreeMap<String, AttributeSchema>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn validate(&self, config: &Map<String, Value>) -> Result<(), Vec<TypeError>> {
        validate_attributes(&self.attributes, config)
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: BTreeMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Operation timeouts consumed by the CRUD driver
    pub timeouts: Option<Timeouts>,
    /// Existing resources can be imported by identifier
    pub importable: bool,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            description: None,
            timeouts: None,
            importable: false,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn importable(mut self) -> Self {
        self.importable = true;
        self
    }

    /// Validate user configuration
    pub fn validate(&self, config: &Map<String, Value>) -> Result<(), Vec<TypeError>> {
        validate_attributes(&self.attributes, config)
    }

    /// Force-new attributes whose value differs between the prior state and
    /// the new configuration, after diff suppression.
    pub fn requires_replacement(
        &self,
        prior: &Map<String, Value>,
        config: &Map<String, Value>,
    ) -> Vec<String> {
        let mut changed = Vec::new();

        for (name, schema) in &self.attributes {
            if !schema.force_new {
                continue;
            }
            let old = prior.get(name).unwrap_or(&Value::Null);
            let new = config.get(name).unwrap_or(&Value::Null);
            if old == new {
                continue;
            }
            if let Some(suppress) = schema.diff_suppress
                && suppress(name, old, new, config)
            {
                continue;
            }
            changed.push(name.clone());
        }

        changed
    }
}

fn validate_attributes(
    attributes: &BTreeMap<String, AttributeSchema>,
    config: &Map<String, Value>,
) -> Result<(), Vec<TypeError>> {
    let mut errors = Vec::new();
    let is_set = |name: &str| config.get(name).is_some_and(|v| !v.is_null());

    // Check required attributes
    for (name, schema) in attributes {
        if schema.required && !is_set(name) && schema.default.is_none() {
            errors.push(TypeError::MissingRequired { name: name.clone() });
        }
    }

    for (name, value) in config {
        if value.is_null() {
            continue;
        }
        let Some(schema) = attributes.get(name) else {
            errors.push(TypeError::UnknownAttribute { name: name.clone() });
            continue;
        };

        if schema.computed && !schema.optional {
            errors.push(TypeError::ComputedAttribute { name: name.clone() });
            continue;
        }

        if let Err(e) = schema.attr_type.validate(value) {
            errors.push(TypeError::AttributeError {
                name: name.clone(),
                inner: Box::new(e),
            });
        }

        if let (Some(max), Value::Array(items)) = (schema.max_items, value)
            && items.len() > max
        {
            errors.push(TypeError::TooManyItems {
                name: name.clone(),
                max,
                got: items.len(),
            });
        }

        for other in &schema.conflicts_with {
            // Report each conflicting pair once when both sides declare it
            let symmetric = attributes
                .get(other)
                .is_some_and(|o| o.conflicts_with.contains(name));
            if is_set(other) && (!symmetric || name < other) {
                errors.push(TypeError::ConflictingAttributes {
                    name: name.clone(),
                    other: other.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Port number type (1-65535)
    pub fn port_number() -> AttributeType {
        AttributeType::Custom {
            name: "PortNumber".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value.as_u64() {
                Some(n) if (1..=65535).contains(&n) => Ok(()),
                _ => Err("Port number must be between 1 and 65535".to_string()),
            },
        }
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let parts: Vec<&str> = cidr.split('/').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    }

    let ip = parts[0];
    let prefix = parts[1];

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }

    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn scoped_schema() -> ResourceSchema {
        ResourceSchema::new("scoped")
            .attribute(
                AttributeSchema::new("compartment_id", AttributeType::String)
                    .force_new()
                    .with_diff_suppress(|_, _, _, config| {
                        config.get("default_id").is_some_and(|v| !v.is_null())
                    }),
            )
            .attribute(
                AttributeSchema::new("default_id", AttributeType::String)
                    .force_new()
                    .conflicts_with(&["compartment_id"]),
            )
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("state", AttributeType::String).computed())
            .attribute(
                AttributeSchema::new(
                    "rules",
                    AttributeType::List(Box::new(AttributeType::Block(
                        BlockSchema::new()
                            .attribute(AttributeSchema::new("cidr", types::cidr()).required())
                            .attribute(AttributeSchema::new("port", types::port_number())),
                    ))),
                )
                .with_max_items(2),
            )
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&json!("hello")).is_ok());
        assert!(t.validate(&json!(42)).is_err());
    }

    #[test]
    fn validate_int_rejects_float() {
        let t = AttributeType::Int;
        assert!(t.validate(&json!(80)).is_ok());
        assert!(t.validate(&json!(80.5)).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let config = object(json!({
            "name": "net",
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "rules": [{"cidr": "10.0.0.0/16", "port": 443}]
        }));
        assert!(scoped_schema().validate(&config).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let errors = scoped_schema().validate(&Map::new()).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::MissingRequired { name } if name == "name"))
        );
    }

    #[test]
    fn conflicting_attributes_reported_once() {
        let config = object(json!({
            "name": "net",
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "default_id": "ocid1.routetable.oc1..bbbb"
        }));
        let errors = scoped_schema().validate(&config).unwrap_err();
        let conflicts = errors
            .iter()
            .filter(|e| matches!(e, TypeError::ConflictingAttributes { .. }))
            .count();
        assert_eq!(conflicts, 1);
    }

    #[test]
    fn computed_and_unknown_attributes_rejected() {
        let config = object(json!({"name": "net", "state": "AVAILABLE", "color": "red"}));
        let errors = scoped_schema().validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::ComputedAttribute { name } if name == "state"))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::UnknownAttribute { name } if name == "color"))
        );
    }

    #[test]
    fn nested_block_errors_and_max_items() {
        let config = object(json!({
            "name": "net",
            "rules": [{"cidr": "10.0.0.0/33"}, {"cidr": "10.0.0.0/8"}, {"cidr": "0.0.0.0/0"}]
        }));
        let errors = scoped_schema().validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::TooManyItems { max: 2, got: 3, .. }))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::AttributeError { name, .. } if name == "rules"))
        );
    }

    #[test]
    fn null_block_passes_schema_validation() {
        let config = object(json!({"name": "net", "rules": [null]}));
        assert!(scoped_schema().validate(&config).is_ok());
    }

    #[test]
    fn requires_replacement_honors_diff_suppress() {
        let schema = scoped_schema();
        let prior = object(json!({"compartment_id": "ocid1.compartment.oc1..aaaa"}));

        let config = object(json!({"compartment_id": "ocid1.compartment.oc1..bbbb"}));
        assert_eq!(
            schema.requires_replacement(&prior, &config),
            vec!["compartment_id".to_string()]
        );

        let prior = object(json!({
            "compartment_id": "ocid1.compartment.oc1..aaaa",
            "default_id": "ocid1.routetable.oc1..cccc"
        }));
        let config = object(json!({"default_id": "ocid1.routetable.oc1..cccc"}));
        assert!(schema.requires_replacement(&prior, &config).is_empty());
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();

        assert!(t.validate(&json!("10.0.0.0/16")).is_ok());
        assert!(t.validate(&json!("0.0.0.0/0")).is_ok());
        assert!(t.validate(&json!("255.255.255.255/32")).is_ok());

        assert!(t.validate(&json!("10.0.0.0")).is_err()); // no prefix
        assert!(t.validate(&json!("10.0.0.0/33")).is_err()); // prefix too large
        assert!(t.validate(&json!("10.0.0.256/16")).is_err()); // octet > 255
        assert!(t.validate(&json!("10.0.0/16")).is_err()); // only 3 octets
        assert!(t.validate(&json!(42)).is_err()); // wrong type
    }
}
