//! Integration tests for the transform engine and the built-in Jackal registry.

use jackal_types::{
    decode, encode, export_json_schema, jackal, validate_against_schema, Diagnostic, ErrorKind,
    Extra, FieldSpec, RegistryError, SchemaRegistry, TransformError, TransformOptions,
    Transformer, TypeDescriptor, UnknownFields,
};
use serde_json::{json, Value};

fn diagnostic(result: Result<Value, TransformError>) -> Diagnostic {
    match result {
        Err(TransformError::Invalid(d)) => *d,
        other => panic!("expected a diagnostic, got {:?}", other),
    }
}

fn adhoc(value: &Value, descriptor: &TypeDescriptor) -> Result<Value, TransformError> {
    let registry = SchemaRegistry::new();
    Transformer::new(&registry, TransformOptions::decode()).transform(value, descriptor)
}

fn sample_package() -> Value {
    json!({
        "kind": "JackalPackageConfig",
        "metadata": {
            "name": "component-webhooks",
            "description": "Deploys podinfo with webhook-driven waits",
            "version": "0.1.0",
            "architecture": "amd64"
        },
        "variables": [
            { "name": "DOMAIN", "default": "uds.dev", "prompt": true, "type": "raw" }
        ],
        "constants": [
            { "name": "CHART_VERSION", "value": "6.4.0", "autoIndent": false }
        ],
        "components": [
            {
                "name": "podinfo",
                "required": true,
                "images": ["ghcr.io/stefanprodan/podinfo:6.4.0"],
                "charts": [
                    {
                        "name": "podinfo",
                        "namespace": "podinfo",
                        "url": "oci://ghcr.io/stefanprodan/charts/podinfo",
                        "version": "6.4.0",
                        "noWait": false
                    }
                ],
                "actions": {
                    "onDeploy": {
                        "defaults": { "maxRetries": 2, "shell": { "linux": "bash" } },
                        "after": [
                            {
                                "description": "wait for podinfo",
                                "wait": {
                                    "cluster": {
                                        "kind": "deployment",
                                        "name": "podinfo",
                                        "namespace": "podinfo",
                                        "condition": "available"
                                    }
                                }
                            },
                            {
                                "cmd": "echo ${JACKAL_VAR_DOMAIN}",
                                "setVariables": [ { "name": "HOST", "sensitive": false } ]
                            }
                        ]
                    }
                },
                "only": { "localOS": "linux", "cluster": { "architecture": "amd64", "distros": ["k3s"] } }
            },
            {
                "name": "files",
                "files": [
                    { "source": "https://example.com/tool", "target": "bin/tool", "executable": true, "symlinks": ["/usr/local/bin/tool"] }
                ],
                "dataInjections": [
                    {
                        "source": "data",
                        "compress": true,
                        "target": { "namespace": "podinfo", "selector": "app=podinfo", "container": "podinfo", "path": "/data" }
                    }
                ]
            }
        ]
    })
}

fn sample_state() -> Value {
    json!({
        "agentTLS": { "ca": "ca", "cert": "cert", "key": "key" },
        "architecture": "arm64",
        "artifactServer": { "address": "http://gitea", "internalServer": true, "pushPassword": "p", "pushUsername": "u" },
        "distro": "k3s",
        "gitServer": {
            "address": "http://gitea",
            "internalServer": true,
            "pullPassword": "p",
            "pullUsername": "u",
            "pushPassword": "p",
            "pushUsername": "u"
        },
        "loggingSecret": "s",
        "registryInfo": {
            "address": "127.0.0.1:31999",
            "internalRegistry": true,
            "nodePort": 31999,
            "pullPassword": "p",
            "pullUsername": "u",
            "pushPassword": "p",
            "pushUsername": "u",
            "secret": "s"
        },
        "storageClass": "local-path",
        "jackalAppliance": false
    })
}

mod round_trip {
    use super::*;

    #[test]
    fn package_decode_then_encode() {
        let registry = jackal::registry();
        let wire = sample_package();
        let decoded = decode(registry, jackal::JACKAL_PACKAGE, &wire).unwrap();
        let encoded = encode(registry, jackal::JACKAL_PACKAGE, &decoded).unwrap();
        assert_eq!(encoded, wire);
    }

    #[test]
    fn decoded_then_encoded_then_decoded_is_stable() {
        let registry = jackal::registry();
        let decoded = decode(registry, jackal::JACKAL_PACKAGE, &sample_package()).unwrap();
        let encoded = encode(registry, jackal::JACKAL_PACKAGE, &decoded).unwrap();
        let again = decode(registry, jackal::JACKAL_PACKAGE, &encoded).unwrap();
        assert_eq!(again, decoded);
    }

    #[test]
    fn state_keys_are_snake_cased() {
        let decoded = decode(jackal::registry(), jackal::JACKAL_STATE, &sample_state()).unwrap();
        assert_eq!(decoded["agent_tls"]["ca"], "ca");
        assert_eq!(decoded["registry_info"]["node_port"], 31999);
        assert_eq!(decoded["jackal_appliance"], false);
        assert!(decoded.get("agentTLS").is_none());
    }

    #[test]
    fn jackal_types_root() {
        let wire = json!({
            "DeployedPackage": {
                "cliVersion": "v0.32.0",
                "name": "demo",
                "generation": 1,
                "data": { "kind": "JackalPackageConfig", "components": [] },
                "deployedComponents": [
                    {
                        "name": "podinfo",
                        "status": "Succeeded",
                        "observedGeneration": 1,
                        "installedCharts": [ { "chartName": "podinfo", "namespace": "podinfo" } ]
                    }
                ],
                "componentWebhooks": {
                    "podinfo": {
                        "capability": { "name": "capability", "status": "Running", "observedGeneration": 1 }
                    }
                },
                "connectStrings": {
                    "podinfo": { "description": "podinfo UI", "url": "/" }
                }
            },
            "JackalPackage": sample_package(),
            "JackalState": sample_state()
        });

        let decoded = jackal::to_jackal_types(&wire.to_string()).unwrap();
        let deployed = &decoded["deployed_package"];
        assert_eq!(deployed["cli_version"], "v0.32.0");
        // Map keys are data, not field names, and are never renamed.
        assert_eq!(
            deployed["component_webhooks"]["podinfo"]["capability"]["observed_generation"],
            1
        );
        assert_eq!(deployed["connect_strings"]["podinfo"]["url"], "/");

        let text = jackal::jackal_types_to_json(&decoded).unwrap();
        assert!(text.starts_with("{\n  \"DeployedPackage\": {\n    \"cliVersion\""));
        let encoded: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(encoded, wire);
    }
}

mod properties {
    use super::*;

    #[test]
    fn kind_mismatch_names_descriptor() {
        let descriptor = TypeDescriptor::union([
            TypeDescriptor::string(),
            TypeDescriptor::object(Vec::<FieldSpec>::new(), Extra::Closed),
        ]);
        let d = diagnostic(adhoc(&json!(42), &descriptor));
        assert_eq!(d.kind, ErrorKind::UnionExhausted);
        assert_eq!(d.expected, "one of [string, object]");
        assert_eq!(d.actual, Some(json!(42)));
    }

    #[test]
    fn enum_lists_every_case() {
        let arch = TypeDescriptor::enumeration(["amd64", "arm64"]);
        assert_eq!(adhoc(&json!("amd64"), &arch).unwrap(), json!("amd64"));

        let d = diagnostic(adhoc(&json!("mips"), &arch));
        assert_eq!(d.kind, ErrorKind::EnumMismatch);
        assert!(d.to_string().contains("one of [amd64, arm64]"));
    }

    #[test]
    fn optional_vs_required_field() {
        let optional = TypeDescriptor::object(
            [FieldSpec::new("version", TypeDescriptor::optional(TypeDescriptor::string()))],
            Extra::Closed,
        );
        let result = adhoc(&json!({}), &optional).unwrap();
        assert!(result.get("version").is_none());

        let required = TypeDescriptor::object(
            [FieldSpec::new("version", TypeDescriptor::string())],
            Extra::Closed,
        );
        let d = diagnostic(adhoc(&json!({}), &required));
        assert_eq!(d.kind, ErrorKind::MissingRequiredField);
    }

    #[test]
    fn union_order_decides_result() {
        let a = TypeDescriptor::object(
            [FieldSpec::renamed("name", "a_name", TypeDescriptor::string())],
            Extra::open(TypeDescriptor::any()),
        );
        let b = TypeDescriptor::object(
            [
                FieldSpec::renamed("name", "b_name", TypeDescriptor::string()),
                FieldSpec::renamed("url", "b_url", TypeDescriptor::string()),
            ],
            Extra::Closed,
        );
        let value = json!({ "name": "podinfo", "url": "oci://x" });

        for _ in 0..3 {
            let result = adhoc(&value, &TypeDescriptor::union([a.clone(), b.clone()])).unwrap();
            assert_eq!(result, json!({ "a_name": "podinfo", "url": "oci://x" }));
        }
        let result = adhoc(&value, &TypeDescriptor::union([b, a])).unwrap();
        assert_eq!(result, json!({ "b_name": "podinfo", "b_url": "oci://x" }));
    }

    #[test]
    fn open_object_round_trip_keeps_key_names() {
        let registry = SchemaRegistry::new().with(
            "Deployed",
            TypeDescriptor::object(
                [FieldSpec::renamed(
                    "cliVersion",
                    "cli_version",
                    TypeDescriptor::optional(TypeDescriptor::string()),
                )],
                Extra::open(TypeDescriptor::any()),
            ),
        );

        let wire = json!({ "cliVersion": "v0.32.0", "annotations": { "team": "ops" } });
        let decoded = decode(&registry, "Deployed", &wire).unwrap();
        assert_eq!(encode(&registry, "Deployed", &decoded).unwrap(), wire);

        // Passing this through would come back as "cliVersion".
        let d = diagnostic(decode(&registry, "Deployed", &json!({ "cli_version": "x" })));
        assert_eq!(d.kind, ErrorKind::UnexpectedField);
        assert_eq!(d.key.as_deref(), Some("cli_version"));
    }

    #[test]
    fn array_error_carries_index() {
        let d = diagnostic(adhoc(
            &json!(["x", 1]),
            &TypeDescriptor::array(TypeDescriptor::string()),
        ));
        assert_eq!(d.path, "/1");
        assert_eq!(d.actual, Some(json!(1)));
    }

    #[test]
    fn map_passthrough() {
        let descriptor = TypeDescriptor::map(TypeDescriptor::string());
        let value = json!({ "a": "x", "b": "y" });
        assert_eq!(adhoc(&value, &descriptor).unwrap(), value);

        let d = diagnostic(adhoc(&json!({ "a": 1 }), &descriptor));
        assert_eq!(d.key.as_deref(), Some("a"));
    }
}

mod jackal_errors {
    use super::*;

    #[test]
    fn nested_component_error_has_full_path() {
        let mut wire = sample_package();
        wire["components"][0]["actions"]["onDeploy"]["after"][0]["wait"]["network"] =
            json!({ "address": "localhost:8080", "protocol": "ftp" });

        let d = diagnostic(decode(jackal::registry(), jackal::JACKAL_PACKAGE, &wire));
        assert_eq!(d.kind, ErrorKind::EnumMismatch);
        assert_eq!(d.path, "/components/0/actions/onDeploy/after/0/wait/network/protocol");
        assert_eq!(d.parent.as_deref(), Some("JackalComponentActionWaitNetwork"));
        assert_eq!(d.expected, "one of [http, https, tcp]");
    }

    #[test]
    fn missing_component_name() {
        let wire = json!({ "kind": "JackalInitConfig", "components": [ { "required": true } ] });
        let d = diagnostic(decode(jackal::registry(), jackal::JACKAL_PACKAGE, &wire));
        assert_eq!(d.kind, ErrorKind::MissingRequiredField);
        assert_eq!(d.path, "/components/0/name");
        assert_eq!(d.parent.as_deref(), Some("JackalComponent"));
    }

    #[test]
    fn unknown_key_policies() {
        let mut wire = sample_package();
        wire["metadata"]["maintainer"] = json!("ops");
        let registry = jackal::registry();

        let d = diagnostic(decode(registry, jackal::JACKAL_PACKAGE, &wire));
        assert_eq!(d.kind, ErrorKind::UnexpectedField);
        assert_eq!(d.path, "/metadata/maintainer");

        let options = TransformOptions::decode().unknown_fields(UnknownFields::Drop);
        let decoded = Transformer::new(registry, options)
            .transform_root(jackal::JACKAL_PACKAGE, &wire)
            .unwrap();
        assert!(decoded["metadata"].get("maintainer").is_none());

        let options = TransformOptions::decode().unknown_fields(UnknownFields::Preserve);
        let decoded = Transformer::new(registry, options)
            .transform_root(jackal::JACKAL_PACKAGE, &wire)
            .unwrap();
        assert_eq!(decoded["metadata"]["maintainer"], "ops");
    }

    #[test]
    fn null_is_not_absence() {
        let mut wire = sample_package();
        wire["metadata"]["version"] = Value::Null;
        let d = diagnostic(decode(jackal::registry(), jackal::JACKAL_PACKAGE, &wire));
        assert_eq!(d.kind, ErrorKind::TypeMismatch);
        assert_eq!(d.path, "/metadata/version");
        assert_eq!(d.expected, "string");
    }
}

mod recursive_schemas {
    use super::*;

    fn tree_registry() -> SchemaRegistry {
        SchemaRegistry::new().with(
            "Node",
            TypeDescriptor::object(
                [
                    FieldSpec::renamed("nodeName", "node_name", TypeDescriptor::string()),
                    FieldSpec::new(
                        "children",
                        TypeDescriptor::optional(TypeDescriptor::array(
                            TypeDescriptor::reference("Node"),
                        )),
                    ),
                ],
                Extra::Closed,
            ),
        )
    }

    #[test]
    fn self_referential_type() {
        let registry = tree_registry();
        registry.check().unwrap();

        let wire = json!({
            "nodeName": "root",
            "children": [
                { "nodeName": "a", "children": [ { "nodeName": "a1" } ] },
                { "nodeName": "b" }
            ]
        });
        let decoded = decode(&registry, "Node", &wire).unwrap();
        assert_eq!(decoded["children"][0]["children"][0]["node_name"], "a1");
        assert_eq!(encode(&registry, "Node", &decoded).unwrap(), wire);

        let bad = json!({
            "nodeName": "root",
            "children": [ { "nodeName": "a", "children": [ {} ] } ]
        });
        let d = diagnostic(decode(&registry, "Node", &bad));
        assert_eq!(d.path, "/children/0/children/0/nodeName");
    }

    #[test]
    fn loop_without_input_fails_check() {
        let value =
            TypeDescriptor::union([TypeDescriptor::reference("Value"), TypeDescriptor::string()]);
        let wrapper = TypeDescriptor::optional(TypeDescriptor::reference("Wrapper"));
        let registry = SchemaRegistry::new()
            .with("Value", value)
            .with("Wrapper", wrapper);

        let err = registry.check().unwrap_err();
        let message = err.to_string();
        assert_eq!(err.exit_code(), 2);
        assert!(message.contains("2 problem(s)"), "{message}");
        let RegistryError::Invalid { issues } = err else {
            panic!("expected registry issues");
        };
        let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
        let value_loop = "Value: type reaches itself without reading input (Value -> Value)";
        assert!(lines.iter().any(|line| line == value_loop));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("Wrapper:") && line.ends_with("(Wrapper -> Wrapper)")));
    }

    #[test]
    fn unresolved_ref_is_not_a_data_error() {
        let registry = SchemaRegistry::new().with(
            "Pkg",
            TypeDescriptor::object(
                [FieldSpec::new("build", TypeDescriptor::reference("Build"))],
                Extra::Closed,
            ),
        );
        assert!(registry.check().is_err());

        let err = decode(&registry, "Pkg", &json!({ "build": {} })).unwrap_err();
        assert!(matches!(err, TransformError::UnknownType { ref name } if name == "Build"));
        assert_eq!(err.exit_code(), 2);
    }
}

mod json_schema_agreement {
    use super::*;

    #[test]
    fn exported_schema_agrees_with_engine() {
        let registry = jackal::registry();
        let schema = export_json_schema(registry, jackal::JACKAL_PACKAGE).unwrap();

        let valid = sample_package();
        assert!(decode(registry, jackal::JACKAL_PACKAGE, &valid).is_ok());
        assert!(validate_against_schema(&schema, &valid).is_ok());

        let mut invalid = sample_package();
        invalid["components"][0]["only"]["cluster"]["architecture"] = json!("mips");
        assert!(decode(registry, jackal::JACKAL_PACKAGE, &invalid).is_err());
        assert!(validate_against_schema(&schema, &invalid).is_err());
    }

    #[test]
    fn exported_state_schema_accepts_state() {
        let registry = jackal::registry();
        let schema = export_json_schema(registry, jackal::JACKAL_STATE).unwrap();
        assert!(validate_against_schema(&schema, &sample_state()).is_ok());
    }
}

mod concurrency {
    use super::*;

    #[test]
    fn shared_registry_across_threads() {
        let registry = jackal::registry();
        let wire = sample_package();
        let expected = decode(registry, jackal::JACKAL_PACKAGE, &wire).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| decode(registry, jackal::JACKAL_PACKAGE, &wire).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
