//! JSON Schema export and collect-all validation.
//!
//! The transform engine stops at the first problem. For reporting, a registry
//! root can be rendered as a Draft 2020-12 JSON Schema (wire-side field names)
//! and checked with the `jsonschema` crate, which reports every violation.

use serde_json::{json, Map, Value};

use crate::descriptor::{Extra, PrimitiveKind, TypeDescriptor};
use crate::error::{SchemaError, TransformError, ValidateError};
use crate::registry::SchemaRegistry;

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Render `root` and every type it reaches as a JSON Schema document.
///
/// Named types become `$defs` entries (sorted by name) and references become
/// `$ref: "#/$defs/<name>"`.
///
/// # Errors
///
/// Returns `TransformError::UnknownType` if `root` is not registered.
pub fn export_json_schema(registry: &SchemaRegistry, root: &str) -> Result<Value, TransformError> {
    registry.resolve(root)?;

    let mut defs = Map::new();
    for name in registry.reachable_from(root) {
        if let Some(descriptor) = registry.get(&name) {
            let mut schema = descriptor_schema(descriptor);
            if let Value::Object(map) = &mut schema {
                map.insert("title".to_string(), Value::String(name.clone()));
            }
            defs.insert(name, schema);
        }
    }

    Ok(json!({
        "$schema": DRAFT_2020_12,
        "$ref": def_ref(root),
        "$defs": defs,
    }))
}

/// Validate a wire-format document against a registry root, collecting every
/// violation.
pub fn validate_all(
    registry: &SchemaRegistry,
    root: &str,
    payload: &Value,
) -> Result<(), ValidateError> {
    let schema = export_json_schema(registry, root).map_err(|e| ValidateError::Schema {
        message: e.to_string(),
    })?;
    validate_against_schema(&schema, payload)
}

/// Validate a payload against a JSON Schema document.
///
/// Use this when you've already exported the schema and want to validate
/// multiple payloads against it.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::Schema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

fn def_ref(name: &str) -> String {
    format!("#/$defs/{}", name)
}

fn descriptor_schema(descriptor: &TypeDescriptor) -> Value {
    match descriptor {
        TypeDescriptor::Primitive { of } => match of {
            PrimitiveKind::Any => json!({}),
            kind => json!({ "type": kind.as_str() }),
        },
        TypeDescriptor::Enum { cases } => json!({ "type": "string", "enum": cases }),
        TypeDescriptor::Array { items } => {
            json!({ "type": "array", "items": descriptor_schema(items) })
        }
        TypeDescriptor::Union { alternatives } => {
            let any_of: Vec<Value> = alternatives.iter().map(descriptor_schema).collect();
            json!({ "anyOf": any_of })
        }
        TypeDescriptor::Map { values } => {
            json!({ "type": "object", "additionalProperties": descriptor_schema(values) })
        }
        TypeDescriptor::Object(schema) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in schema.fields() {
                // Absence is expressed through `required`, not the property schema.
                let ty = match &field.ty {
                    TypeDescriptor::Optional { inner } => inner.as_ref(),
                    other => other,
                };
                properties.insert(field.external.clone(), descriptor_schema(ty));
                if !tolerates_absence(&field.ty) {
                    required.push(Value::String(field.external.clone()));
                }
            }
            let additional = match schema.extra() {
                Extra::Closed => Value::Bool(false),
                Extra::Open { values } => descriptor_schema(values),
            };
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": additional,
            })
        }
        TypeDescriptor::Ref { name } => json!({ "$ref": def_ref(name) }),
        TypeDescriptor::Optional { inner } => descriptor_schema(inner),
    }
}

/// Structural version of the engine's absence check. References are not
/// followed, so an aliased optional is exported as required.
fn tolerates_absence(descriptor: &TypeDescriptor) -> bool {
    match descriptor {
        TypeDescriptor::Optional { .. } => true,
        TypeDescriptor::Primitive { of } => *of == PrimitiveKind::Any,
        TypeDescriptor::Union { alternatives } => alternatives.iter().any(tolerates_absence),
        _ => false,
    }
}
