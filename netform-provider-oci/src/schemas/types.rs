//! Attribute types shared by OCI schemas

use std::sync::LazyLock;

use netform_core::schema::AttributeType;
use regex::Regex;
use serde_json::{Map, Value};

static OCID: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^ocid1\.[a-z0-9]+\.[a-z0-9-]+\.[a-z0-9-]*(\.[a-z0-9-]*)?\.[a-z0-9]+$")
});

/// Check the `ocid1.<type>.<realm>.[region].<unique>` form
pub fn is_ocid(value: &str) -> bool {
    OCID.as_ref().is_ok_and(|re| re.is_match(value))
}

/// Oracle Cloud identifier
pub fn ocid() -> AttributeType {
    AttributeType::Custom {
        name: "Ocid".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value.as_str() {
            Some(s) if is_ocid(s) => Ok(()),
            Some(s) => Err(format!("'{}' is not a valid OCID", s)),
            None => Err("Expected string".to_string()),
        },
    }
}

/// ICMP type or code (0-255)
pub fn icmp_number() -> AttributeType {
    AttributeType::Custom {
        name: "IcmpNumber".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value.as_u64() {
            Some(n) if n <= 255 => Ok(()),
            _ => Err("ICMP type and code must be between 0 and 255".to_string()),
        },
    }
}

/// List of strings
pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Suppress diffs on the scope attributes of an adopted default resource
///
/// `compartment_id` and `vcn_id` are read back from the API once a default
/// resource is adopted, while the configuration leaves them out.
pub fn default_resource_suppress_diff(
    _name: &str,
    _old: &Value,
    _new: &Value,
    config: &Map<String, Value>,
) -> bool {
    config
        .get("default_id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
}
