//! Jackal Types
//!
//! Structural validation and key mapping for Jackal package manifests.
//!
//! A [`SchemaRegistry`] maps type names to [`TypeDescriptor`]s. The transform
//! engine walks a JSON value together with a descriptor and either returns a
//! copy with object keys renamed for the chosen [`Direction`], or fails with a
//! single [`Diagnostic`] that says where the value is, what was expected and
//! what was found.
//!
//! # Example
//!
//! ```
//! use jackal_types::{decode, encode, Extra, FieldSpec, SchemaRegistry, TypeDescriptor};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new()
//!     .with("Arch", TypeDescriptor::enumeration(["amd64", "arm64"]))
//!     .with(
//!         "Build",
//!         TypeDescriptor::object(
//!             [
//!                 FieldSpec::renamed("arch", "architecture", TypeDescriptor::reference("Arch")),
//!                 FieldSpec::new("version", TypeDescriptor::optional(TypeDescriptor::string())),
//!             ],
//!             Extra::Closed,
//!         ),
//!     );
//! registry.check().unwrap();
//!
//! let decoded = decode(&registry, "Build", &json!({ "arch": "arm64" })).unwrap();
//! assert_eq!(decoded, json!({ "architecture": "arm64" }));
//!
//! let encoded = encode(&registry, "Build", &decoded).unwrap();
//! assert_eq!(encoded, json!({ "arch": "arm64" }));
//!
//! let err = decode(&registry, "Build", &json!({ "arch": "mips" })).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "invalid value at /arch for key \"arch\" on Build: expected one of [amd64, arm64], got \"mips\""
//! );
//! ```
//!
//! # Descriptor rules
//!
//! | Descriptor | Accepts | Result |
//! |------------|---------|--------|
//! | `Primitive` | exact JSON kind (`any` accepts all) | value unchanged |
//! | `Enum` | string in the case set | value unchanged |
//! | `Array` | array, every element valid | elements transformed, order kept |
//! | `Union` | first alternative that accepts | that alternative's result |
//! | `Map` | object, every value valid | keys kept, values transformed |
//! | `Object` | object with required fields present | fields renamed, extras per policy |
//! | `Ref` | whatever the named type accepts | that type's result |
//! | `Optional` | absent field, or a value `inner` accepts | `inner`'s result |

mod descriptor;
mod error;
mod loader;
mod registry;
mod transform;
mod types;
mod validator;

pub mod jackal;

pub use descriptor::{Extra, FieldSpec, ObjectSchema, PrimitiveKind, TypeDescriptor};
pub use error::{
    ConvertError, Diagnostic, ErrorKind, LoadError, RegistryError, RegistryIssue, SchemaError,
    TransformError, ValidateError,
};
pub use loader::{load_document, load_document_auto, load_document_str, load_registry, Format};
pub use registry::SchemaRegistry;
pub use transform::{decode, decode_str, encode, encode_to_string, Transformer};
pub use types::{Direction, TransformOptions, UnknownFields};
pub use validator::{export_json_schema, validate_against_schema, validate_all};
