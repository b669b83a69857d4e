//! Transform engine - validates a JSON value against a descriptor and renames
//! object keys between wire and internal names.

use serde_json::{Map, Value};

use crate::descriptor::{Extra, ObjectSchema, PrimitiveKind, TypeDescriptor};
use crate::error::{ConvertError, Diagnostic, ErrorKind, LoadError, TransformError};
use crate::registry::SchemaRegistry;
use crate::types::{escape_pointer_token, Direction, TransformOptions, UnknownFields};

/// Decode a wire-format document into the internal representation.
///
/// # Errors
///
/// Returns `TransformError::Invalid` for the first mismatch found, or
/// `TransformError::UnknownType` if the schema graph is incomplete.
pub fn decode(
    registry: &SchemaRegistry,
    root: &str,
    value: &Value,
) -> Result<Value, TransformError> {
    Transformer::new(registry, TransformOptions::decode()).transform_root(root, value)
}

/// Encode an internal-representation value back into wire format.
///
/// # Errors
///
/// Same as [`decode`].
pub fn encode(
    registry: &SchemaRegistry,
    root: &str,
    value: &Value,
) -> Result<Value, TransformError> {
    Transformer::new(registry, TransformOptions::encode()).transform_root(root, value)
}

/// Parse JSON text and decode it.
pub fn decode_str(
    registry: &SchemaRegistry,
    root: &str,
    json: &str,
) -> Result<Value, ConvertError> {
    let value: Value =
        serde_json::from_str(json).map_err(|source| LoadError::InvalidJson { source })?;
    Ok(decode(registry, root, &value)?)
}

/// Encode a value and pretty-print the result with two-space indentation.
pub fn encode_to_string(
    registry: &SchemaRegistry,
    root: &str,
    value: &Value,
) -> Result<String, ConvertError> {
    let encoded = encode(registry, root, value)?;
    serde_json::to_string_pretty(&encoded).map_err(ConvertError::Serialize)
}

/// Runs transforms against one registry with fixed options.
///
/// Holds no mutable state; one instance can serve any number of documents.
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'r> {
    registry: &'r SchemaRegistry,
    options: TransformOptions,
}

/// Where the engine currently is. Passed down by value, never stored.
#[derive(Debug, Clone, Copy)]
struct Scope<'s> {
    /// JSON Pointer of the current value.
    path: &'s str,
    /// Field or map key holding the current value.
    key: Option<&'s str>,
    /// Name of the enclosing named type.
    parent: Option<&'s str>,
}

impl Scope<'static> {
    const ROOT: Self = Scope {
        path: "",
        key: None,
        parent: None,
    };
}

impl<'r> Transformer<'r> {
    pub fn new(registry: &'r SchemaRegistry, options: TransformOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform `value` against the type registered as `root`.
    pub fn transform_root(&self, root: &str, value: &Value) -> Result<Value, TransformError> {
        tracing::debug!(
            type_name = root,
            direction = self.options.direction.as_str(),
            "transforming document"
        );
        let descriptor = self.registry.resolve(root)?;
        self.transform_named(value, descriptor, Some(root), Scope::ROOT)
    }

    /// Transform `value` against an ad-hoc descriptor. References inside it
    /// are resolved against the registry.
    pub fn transform(
        &self,
        value: &Value,
        descriptor: &TypeDescriptor,
    ) -> Result<Value, TransformError> {
        self.transform_at(value, descriptor, Scope::ROOT)
    }

    fn transform_at(
        &self,
        value: &Value,
        descriptor: &TypeDescriptor,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        self.transform_named(value, descriptor, None, scope)
    }

    /// `name` is the registered name `descriptor` was reached through, if any.
    fn transform_named(
        &self,
        value: &Value,
        descriptor: &TypeDescriptor,
        name: Option<&str>,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        match descriptor {
            TypeDescriptor::Primitive { of } => transform_primitive(*of, value, descriptor, scope),
            TypeDescriptor::Enum { cases } => {
                let found = value
                    .as_str()
                    .is_some_and(|s| cases.iter().any(|case| case == s));
                if found {
                    Ok(value.clone())
                } else {
                    Err(invalid(ErrorKind::EnumMismatch, descriptor.describe(), value, scope))
                }
            }
            TypeDescriptor::Array { items } => {
                self.transform_array(items, value, descriptor, scope)
            }
            TypeDescriptor::Union { alternatives } => {
                self.transform_union(alternatives, value, descriptor, scope)
            }
            TypeDescriptor::Map { values } => self.transform_map(values, value, descriptor, scope),
            TypeDescriptor::Object(schema) => self.transform_object(schema, name, value, scope),
            TypeDescriptor::Ref { name } => {
                let resolved = self.registry.resolve(name)?;
                self.transform_named(value, resolved, Some(name), scope)
            }
            TypeDescriptor::Optional { inner } => self.transform_named(value, inner, name, scope),
        }
    }

    fn transform_array(
        &self,
        items: &TypeDescriptor,
        value: &Value,
        descriptor: &TypeDescriptor,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        let Value::Array(elements) = value else {
            return Err(invalid(ErrorKind::TypeMismatch, descriptor.describe(), value, scope));
        };

        let mut result = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let path = format!("{}/{}", scope.path, i);
            let child = Scope {
                path: &path,
                key: None,
                parent: scope.parent,
            };
            result.push(self.transform_at(element, items, child)?);
        }
        Ok(Value::Array(result))
    }

    fn transform_union(
        &self,
        alternatives: &[TypeDescriptor],
        value: &Value,
        descriptor: &TypeDescriptor,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        for (i, alternative) in alternatives.iter().enumerate() {
            match self.transform_at(value, alternative, scope) {
                Ok(result) => return Ok(result),
                // A broken schema is not a reason to try the next alternative.
                Err(err @ TransformError::UnknownType { .. }) => return Err(err),
                Err(err) => {
                    tracing::trace!(
                        alternative = i,
                        error = %err,
                        "union alternative rejected value"
                    );
                }
            }
        }
        Err(invalid(ErrorKind::UnionExhausted, descriptor.describe(), value, scope))
    }

    fn transform_map(
        &self,
        values: &TypeDescriptor,
        value: &Value,
        descriptor: &TypeDescriptor,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        let Value::Object(map) = value else {
            return Err(invalid(ErrorKind::TypeMismatch, descriptor.describe(), value, scope));
        };

        let mut result = Map::new();
        for (key, entry) in map {
            let path = format!("{}/{}", scope.path, escape_pointer_token(key));
            let child = Scope {
                path: &path,
                key: Some(key),
                parent: scope.parent,
            };
            result.insert(key.clone(), self.transform_at(entry, values, child)?);
        }
        Ok(Value::Object(result))
    }

    /// Declared fields first, in declaration order, then undeclared keys per
    /// the object's `extra` policy, in input order.
    fn transform_object(
        &self,
        schema: &ObjectSchema,
        name: Option<&str>,
        value: &Value,
        scope: Scope<'_>,
    ) -> Result<Value, TransformError> {
        let Value::Object(map) = value else {
            let expected = name.unwrap_or("object").to_string();
            return Err(invalid(ErrorKind::TypeMismatch, expected, value, scope));
        };

        let direction = self.options.direction;
        let mut result = Map::new();

        for field in schema.fields() {
            let (source, target) = field.names(direction);
            let path = format!("{}/{}", scope.path, escape_pointer_token(source));
            let child = Scope {
                path: &path,
                key: Some(source),
                parent: name,
            };
            match map.get(source) {
                Some(entry) => {
                    let transformed = self.transform_at(entry, &field.ty, child)?;
                    result.insert(target.to_string(), transformed);
                }
                None if self.tolerates_absence(&field.ty)? => {}
                None => {
                    return Err(Diagnostic {
                        kind: ErrorKind::MissingRequiredField,
                        path,
                        key: Some(source.to_string()),
                        parent: name.map(str::to_string),
                        expected: field.ty.describe(),
                        actual: None,
                    }
                    .into());
                }
            }
        }

        for (key, entry) in map {
            if schema.claims(key, direction) {
                continue;
            }
            let path = format!("{}/{}", scope.path, escape_pointer_token(key));
            let child = Scope {
                path: &path,
                key: Some(key),
                parent: name,
            };
            // A key spelled like a declared field's output name would be read
            // back as that field by the opposite transform.
            let collides = schema.claims(key, direction.reverse());
            let transformed = match schema.extra() {
                Extra::Open { values } if !collides => self.transform_at(entry, values, child)?,
                Extra::Closed => match self.options.unknown_fields {
                    UnknownFields::Drop => continue,
                    UnknownFields::Preserve if !collides => entry.clone(),
                    _ => return Err(unexpected_field(schema, direction, entry, child)),
                },
                Extra::Open { .. } => return Err(unexpected_field(schema, direction, entry, child)),
            };
            result.insert(key.clone(), transformed);
        }

        Ok(Value::Object(result))
    }

    /// Whether an object field of type `descriptor` may be missing.
    fn tolerates_absence(&self, descriptor: &TypeDescriptor) -> Result<bool, TransformError> {
        match descriptor {
            TypeDescriptor::Optional { .. } => Ok(true),
            TypeDescriptor::Primitive { of } => Ok(*of == PrimitiveKind::Any),
            TypeDescriptor::Union { alternatives } => {
                for alternative in alternatives {
                    if self.tolerates_absence(alternative)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            TypeDescriptor::Ref { name } => self.tolerates_absence(self.registry.resolve(name)?),
            _ => Ok(false),
        }
    }
}

fn transform_primitive(
    kind: PrimitiveKind,
    value: &Value,
    descriptor: &TypeDescriptor,
    scope: Scope<'_>,
) -> Result<Value, TransformError> {
    let matches = match kind {
        PrimitiveKind::Any => true,
        PrimitiveKind::String => value.is_string(),
        PrimitiveKind::Number => value.is_number(),
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Null => value.is_null(),
    };
    if matches {
        Ok(value.clone())
    } else {
        Err(invalid(ErrorKind::TypeMismatch, descriptor.describe(), value, scope))
    }
}

fn unexpected_field(
    schema: &ObjectSchema,
    direction: Direction,
    value: &Value,
    scope: Scope<'_>,
) -> TransformError {
    let names: Vec<&str> = schema.fields().iter().map(|f| f.names(direction).0).collect();
    let expected = format!("one of the declared fields [{}]", names.join(", "));
    invalid(ErrorKind::UnexpectedField, expected, value, scope)
}

fn invalid(kind: ErrorKind, expected: String, value: &Value, scope: Scope<'_>) -> TransformError {
    Diagnostic {
        kind,
        path: scope.path.to_string(),
        key: scope.key.map(str::to_string),
        parent: scope.parent.map(str::to_string),
        expected,
        actual: Some(value.clone()),
    }
    .into()
}
