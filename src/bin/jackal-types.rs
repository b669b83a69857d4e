//! Jackal Types CLI
//!
//! Command-line interface for decoding, encoding and validating Jackal
//! documents against a schema registry.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jackal_types::{
    export_json_schema, jackal, load_document_auto, load_registry, validate_all, Direction,
    RegistryError, SchemaRegistry, TransformError, TransformOptions, Transformer, UnknownFields,
    ValidateError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jackal-types")]
#[command(about = "Validate and convert Jackal package documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SchemaArgs {
    /// Root type the document must match
    #[arg(long = "type", short = 't', default_value = jackal::JACKAL_PACKAGE)]
    root: String,

    /// Schema registry file (JSON or YAML); defaults to the built-in Jackal registry
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Document to convert: file path (.json, .yaml, .yml) or - for stdin
    document: String,

    #[command(flatten)]
    schema: SchemaArgs,

    /// Undeclared keys on closed objects: reject, drop, or preserve
    #[arg(long, default_value = "reject")]
    unknown_fields: String,

    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a wire-format document into the internal representation
    Decode {
        #[command(flatten)]
        args: ConvertArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Encode an internal-representation document back into wire format
    Encode {
        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Validate a wire-format document
    Validate {
        /// Document to validate: file path or - for stdin
        document: String,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Report every violation instead of stopping at the first
        #[arg(long)]
        all: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Check a schema registry for dangling references and duplicate fields
    Check {
        /// Schema registry file; defaults to the built-in Jackal registry
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Export a root type as a JSON Schema document
    Export {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode { args, pretty } => run_convert(args, Direction::Decode, pretty),
        Commands::Encode { args } => run_convert(args, Direction::Encode, true),
        Commands::Validate {
            document,
            schema,
            all,
            json,
        } => run_validate(&document, &schema, all, json),
        Commands::Check { registry, json } => run_check(registry.as_deref(), json),
        Commands::Export { schema, output } => run_export(&schema, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// A user-supplied registry, checked before use, or the built-in one.
enum LoadedRegistry {
    Builtin,
    Custom(SchemaRegistry),
}

impl LoadedRegistry {
    fn get(&self) -> &SchemaRegistry {
        match self {
            LoadedRegistry::Builtin => jackal::registry(),
            LoadedRegistry::Custom(registry) => registry,
        }
    }
}

fn open_registry(path: Option<&Path>) -> Result<LoadedRegistry, RegistryError> {
    let Some(path) = path else {
        return Ok(LoadedRegistry::Builtin);
    };
    let registry = load_registry(path)?;
    registry.check()?;
    Ok(LoadedRegistry::Custom(registry))
}

fn report_registry_error(json_output: bool, err: &RegistryError) {
    match err {
        RegistryError::Invalid { issues } if !json_output => {
            eprintln!("Error: {}", err);
            for issue in issues {
                eprintln!("  {}", issue);
            }
        }
        _ => report_error(json_output, &err.to_string()),
    }
}

fn run_convert(args: ConvertArgs, direction: Direction, pretty: bool) -> Result<(), u8> {
    let Some(policy) = UnknownFields::parse(&args.unknown_fields) else {
        eprintln!(
            "Error: unknown --unknown-fields value \"{}\": expected reject, drop, or preserve",
            args.unknown_fields
        );
        return Err(2);
    };

    let registry = open_registry(args.schema.registry.as_deref()).map_err(|e| {
        report_registry_error(false, &e);
        e.exit_code() as u8
    })?;

    let document = load_document_auto(&args.document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let options = TransformOptions::new(direction).unknown_fields(policy);
    let transformed = Transformer::new(registry.get(), options)
        .transform_root(&args.schema.root, &document)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    write_json(&transformed, pretty, args.output.as_deref())
}

fn run_validate(
    document: &str,
    schema: &SchemaArgs,
    all: bool,
    json_output: bool,
) -> Result<(), u8> {
    let registry = open_registry(schema.registry.as_deref()).map_err(|e| {
        report_registry_error(json_output, &e);
        e.exit_code() as u8
    })?;

    let payload = load_document_auto(document).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    if all {
        return match validate_all(registry.get(), &schema.root, &payload) {
            Ok(()) => {
                report_valid(json_output);
                Ok(())
            }
            Err(ValidateError::Invalid { errors }) => {
                if json_output {
                    let output = serde_json::json!({ "valid": false, "errors": errors });
                    println!("{}", output);
                } else {
                    eprintln!("Validation failed:");
                    for error in errors {
                        eprintln!("  {}", error);
                    }
                }
                Err(1)
            }
            Err(e @ ValidateError::Schema { .. }) => {
                report_error(json_output, &e.to_string());
                Err(e.exit_code() as u8)
            }
        };
    }

    let transformer = Transformer::new(registry.get(), TransformOptions::decode());
    match transformer.transform_root(&schema.root, &payload) {
        Ok(_) => {
            report_valid(json_output);
            Ok(())
        }
        Err(TransformError::Invalid(diagnostic)) => {
            if json_output {
                let output = serde_json::json!({ "valid": false, "errors": [diagnostic] });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                eprintln!("  {}", diagnostic);
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn run_check(path: Option<&Path>, json_output: bool) -> Result<(), u8> {
    let registry = match path {
        Some(path) => load_registry(path).map_err(|e| {
            report_error(json_output, &e.to_string());
            e.exit_code() as u8
        })?,
        None => jackal::registry().clone(),
    };

    match registry.check() {
        Ok(()) => {
            if json_output {
                println!("{}", serde_json::json!({ "ok": true, "types": registry.len() }));
            } else {
                println!("✓ {} types checked, no problems", registry.len());
            }
            Ok(())
        }
        Err(RegistryError::Invalid { issues }) if json_output => {
            let output = serde_json::json!({
                "ok": false,
                "types": registry.len(),
                "issues": issues,
            });
            println!("{}", output);
            Err(1)
        }
        Err(e @ RegistryError::Invalid { .. }) => {
            report_registry_error(false, &e);
            Err(1)
        }
        Err(e) => {
            report_registry_error(json_output, &e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_export(schema: &SchemaArgs, output: Option<PathBuf>) -> Result<(), u8> {
    let registry = open_registry(schema.registry.as_deref()).map_err(|e| {
        report_registry_error(false, &e);
        e.exit_code() as u8
    })?;

    let exported = export_json_schema(registry.get(), &schema.root).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_json(&exported, true, output.as_deref())
}

fn write_json(value: &Value, pretty: bool, output: Option<&Path>) -> Result<(), u8> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", text);
        }
    }

    Ok(())
}

fn report_valid(json_output: bool) {
    if json_output {
        println!(r#"{{"valid":true}}"#);
    } else {
        println!("Valid");
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
