//! Type descriptors - the shapes a JSON value can be checked against.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Primitive JSON kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    Null,
    /// Accepts every value, including an absent one.
    Any,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Null => "null",
            PrimitiveKind::Any => "any",
        }
    }
}

/// Shape of a JSON value.
///
/// Descriptors are plain data. Named types live in a
/// [`SchemaRegistry`](crate::SchemaRegistry) and are reached through
/// [`TypeDescriptor::Ref`], which is how recursive schemas are expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDescriptor {
    Primitive {
        of: PrimitiveKind,
    },
    /// Closed set of string literals, matched case-sensitively.
    Enum {
        cases: Vec<String>,
    },
    Array {
        items: Box<TypeDescriptor>,
    },
    /// Ordered alternatives; the first one that accepts the value wins.
    Union {
        alternatives: Vec<TypeDescriptor>,
    },
    /// String-keyed object with homogeneous values.
    Map {
        values: Box<TypeDescriptor>,
    },
    Object(ObjectSchema),
    /// Named indirection into the registry, resolved at transform time.
    Ref {
        name: String,
    },
    /// Allows an object field to be absent. A present value must match `inner`.
    Optional {
        inner: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn string() -> Self {
        Self::Primitive {
            of: PrimitiveKind::String,
        }
    }

    pub fn number() -> Self {
        Self::Primitive {
            of: PrimitiveKind::Number,
        }
    }

    pub fn boolean() -> Self {
        Self::Primitive {
            of: PrimitiveKind::Boolean,
        }
    }

    pub fn null() -> Self {
        Self::Primitive {
            of: PrimitiveKind::Null,
        }
    }

    pub fn any() -> Self {
        Self::Primitive {
            of: PrimitiveKind::Any,
        }
    }

    pub fn enumeration<I, S>(cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            cases: cases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn array(items: TypeDescriptor) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    pub fn union(alternatives: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::Union {
            alternatives: alternatives.into_iter().collect(),
        }
    }

    pub fn map(values: TypeDescriptor) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    pub fn object(fields: impl IntoIterator<Item = FieldSpec>, extra: Extra) -> Self {
        Self::Object(ObjectSchema::new(fields, extra))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref { name: name.into() }
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::Optional {
            inner: Box::new(inner),
        }
    }

    /// Human-readable summary used as the "expected" part of diagnostics.
    ///
    /// References are rendered by name and never followed, so this terminates
    /// on recursive schemas.
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive { of } => of.as_str().to_string(),
            Self::Enum { cases } => format!("one of [{}]", cases.join(", ")),
            Self::Array { items } => format!("array of {}", items.describe()),
            Self::Union { alternatives } => {
                let parts: Vec<String> = alternatives.iter().map(Self::describe).collect();
                format!("one of [{}]", parts.join(", "))
            }
            Self::Map { values } => format!("map of {}", values.describe()),
            Self::Object(_) => "object".to_string(),
            Self::Ref { name } => name.clone(),
            Self::Optional { inner } => format!("an optional {}", inner.describe()),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A declared object field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Name on the wire.
    #[serde(rename = "name")]
    pub external: String,
    /// Name in the internal representation; same as `external` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl FieldSpec {
    /// A field whose name is the same on both sides.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            external: name.into(),
            internal: None,
            ty,
        }
    }

    /// A field that is renamed between wire and internal representation.
    pub fn renamed(
        external: impl Into<String>,
        internal: impl Into<String>,
        ty: TypeDescriptor,
    ) -> Self {
        Self {
            external: external.into(),
            internal: Some(internal.into()),
            ty,
        }
    }

    pub fn internal_name(&self) -> &str {
        self.internal.as_deref().unwrap_or(&self.external)
    }

    /// Returns `(source, target)` names for the direction.
    pub fn names(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::Decode => (&self.external, self.internal_name()),
            Direction::Encode => (self.internal_name(), &self.external),
        }
    }
}

/// Policy for keys an object does not declare.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum Extra {
    /// Undeclared keys are governed by
    /// [`UnknownFields`](crate::UnknownFields).
    #[default]
    Closed,
    /// Undeclared keys are kept and their values must match `values`.
    Open { values: Box<TypeDescriptor> },
}

impl Extra {
    pub fn open(values: TypeDescriptor) -> Self {
        Extra::Open {
            values: Box::new(values),
        }
    }
}

/// Object shape: declared fields plus a policy for everything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
    #[serde(default)]
    extra: Extra,
    #[serde(skip)]
    claimed: ClaimedNames,
}

/// Source-side field names per direction, built on first use.
#[derive(Debug, Clone, Default)]
struct ClaimedNames {
    decode: OnceLock<HashSet<String>>,
    encode: OnceLock<HashSet<String>>,
}

impl ObjectSchema {
    pub fn new(fields: impl IntoIterator<Item = FieldSpec>, extra: Extra) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            extra,
            claimed: ClaimedNames::default(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn field(&self, external: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.external == external)
    }

    /// Whether `key` is the source-side name of a declared field.
    pub fn claims(&self, key: &str, direction: Direction) -> bool {
        let cell = match direction {
            Direction::Decode => &self.claimed.decode,
            Direction::Encode => &self.claimed.encode,
        };
        cell.get_or_init(|| {
            self.fields
                .iter()
                .map(|f| f.names(direction).0.to_string())
                .collect()
        })
        .contains(key)
    }
}

impl PartialEq for ObjectSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.extra == other.extra
    }
}
