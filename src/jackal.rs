//! Built-in registry for Jackal package manifests and cluster state.
//!
//! Wire names are the camelCase keys found in `jackal.yaml` and in the state
//! secrets; the internal representation uses snake_case keys. Every object is
//! closed.

use std::sync::OnceLock;

use serde_json::Value;

use crate::descriptor::{Extra, FieldSpec, TypeDescriptor};
use crate::error::ConvertError;
use crate::registry::SchemaRegistry;
use crate::transform::{decode_str, encode_to_string};

/// Root holding one of each top-level document.
pub const JACKAL_TYPES: &str = "JackalTypes";
/// A package definition (`jackal.yaml`).
pub const JACKAL_PACKAGE: &str = "JackalPackage";
/// Record of a package deployed into a cluster.
pub const DEPLOYED_PACKAGE: &str = "DeployedPackage";
/// Cluster-wide Jackal state.
pub const JACKAL_STATE: &str = "JackalState";

/// The process-wide Jackal registry, built on first use.
pub fn registry() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

pub fn to_jackal_types(json: &str) -> Result<Value, ConvertError> {
    decode_str(registry(), JACKAL_TYPES, json)
}

pub fn jackal_types_to_json(value: &Value) -> Result<String, ConvertError> {
    encode_to_string(registry(), JACKAL_TYPES, value)
}

pub fn to_jackal_package(json: &str) -> Result<Value, ConvertError> {
    decode_str(registry(), JACKAL_PACKAGE, json)
}

pub fn jackal_package_to_json(value: &Value) -> Result<String, ConvertError> {
    encode_to_string(registry(), JACKAL_PACKAGE, value)
}

/// `camelCase` to `snake_case`. Acronym runs stay together: `agentTLS`
/// becomes `agent_tls` and `localOS` becomes `local_os`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            let ends_acronym = prev.is_some_and(|p| p.is_ascii_uppercase())
                && next.is_some_and(|n| n.is_ascii_lowercase());
            if after_lower || ends_acronym {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn field(name: &str, ty: TypeDescriptor) -> FieldSpec {
    FieldSpec::renamed(name, to_snake_case(name), ty)
}

fn object(fields: Vec<FieldSpec>) -> TypeDescriptor {
    TypeDescriptor::object(fields, Extra::Closed)
}

fn opt(ty: TypeDescriptor) -> TypeDescriptor {
    TypeDescriptor::optional(ty)
}

fn r(name: &str) -> TypeDescriptor {
    TypeDescriptor::reference(name)
}

fn string() -> TypeDescriptor {
    TypeDescriptor::string()
}

fn number() -> TypeDescriptor {
    TypeDescriptor::number()
}

fn boolean() -> TypeDescriptor {
    TypeDescriptor::boolean()
}

fn strings() -> TypeDescriptor {
    TypeDescriptor::array(string())
}

fn list(name: &str) -> TypeDescriptor {
    TypeDescriptor::array(r(name))
}

fn build_registry() -> SchemaRegistry {
    let mut reg = SchemaRegistry::new();

    reg.register(
        JACKAL_TYPES,
        object(vec![
            field("DeployedPackage", r(DEPLOYED_PACKAGE)),
            field("JackalPackage", r(JACKAL_PACKAGE)),
            field("JackalState", r(JACKAL_STATE)),
        ]),
    );
    reg.register(
        DEPLOYED_PACKAGE,
        object(vec![
            field("cliVersion", string()),
            field(
                "componentWebhooks",
                opt(TypeDescriptor::map(TypeDescriptor::map(r("Webhook")))),
            ),
            field("connectStrings", opt(TypeDescriptor::map(r("ConnectString")))),
            field("data", r(JACKAL_PACKAGE)),
            field("deployedComponents", list("DeployedComponent")),
            field("generation", number()),
            field("name", string()),
        ]),
    );
    reg.register(
        "Webhook",
        object(vec![
            field("name", string()),
            field("observedGeneration", number()),
            field("status", string()),
            field("waitDurationSeconds", opt(number())),
        ]),
    );
    reg.register(
        "ConnectString",
        object(vec![field("description", string()), field("url", string())]),
    );

    register_package(&mut reg);
    register_component(&mut reg);
    register_actions(&mut reg);
    register_state(&mut reg);

    reg.register("Type", TypeDescriptor::enumeration(["file", "raw"]));
    reg.register("Protocol", TypeDescriptor::enumeration(["http", "https", "tcp"]));
    reg.register("Architecture", TypeDescriptor::enumeration(["amd64", "arm64"]));
    reg.register("LocalOS", TypeDescriptor::enumeration(["darwin", "linux", "windows"]));
    reg.register(
        "Kind",
        TypeDescriptor::enumeration(["JackalInitConfig", "JackalPackageConfig"]),
    );

    tracing::debug!(types = reg.len(), "built jackal schema registry");
    reg
}

fn register_package(reg: &mut SchemaRegistry) {
    reg.register(
        JACKAL_PACKAGE,
        object(vec![
            field("build", opt(r("JackalBuildData"))),
            field("components", list("JackalComponent")),
            field("constants", opt(list("JackalPackageConstant"))),
            field("kind", r("Kind")),
            field("metadata", opt(r("JackalMetadata"))),
            field("variables", opt(list("JackalPackageVariable"))),
        ]),
    );
    reg.register(
        "JackalBuildData",
        object(vec![
            field("architecture", string()),
            field("differential", opt(boolean())),
            field("differentialMissing", opt(strings())),
            field("lastNonBreakingVersion", opt(string())),
            field("migrations", opt(strings())),
            field("registryOverrides", opt(TypeDescriptor::map(string()))),
            field("terminal", string()),
            field("timestamp", string()),
            field("user", string()),
            field("version", string()),
        ]),
    );
    reg.register(
        "JackalPackageConstant",
        object(vec![
            field("autoIndent", opt(boolean())),
            field("description", opt(string())),
            field("name", string()),
            field("pattern", opt(string())),
            field("value", string()),
        ]),
    );
    reg.register(
        "JackalMetadata",
        object(vec![
            field("aggregateChecksum", opt(string())),
            field("architecture", opt(string())),
            field("authors", opt(string())),
            field("description", opt(string())),
            field("documentation", opt(string())),
            field("image", opt(string())),
            field("name", string()),
            field("source", opt(string())),
            field("uncompressed", opt(boolean())),
            field("url", opt(string())),
            field("vendor", opt(string())),
            field("version", opt(string())),
            field("yolo", opt(boolean())),
        ]),
    );
    reg.register(
        "JackalPackageVariable",
        object(vec![
            field("autoIndent", opt(boolean())),
            field("default", opt(string())),
            field("description", opt(string())),
            field("name", string()),
            field("pattern", opt(string())),
            field("prompt", opt(boolean())),
            field("sensitive", opt(boolean())),
            field("type", opt(r("Type"))),
        ]),
    );
}

fn register_component(reg: &mut SchemaRegistry) {
    reg.register(
        "JackalComponent",
        object(vec![
            field("actions", opt(r("JackalComponentActions"))),
            field("charts", opt(list("JackalChart"))),
            field("cosignKeyPath", opt(string())),
            field("dataInjections", opt(list("JackalDataInjection"))),
            field("default", opt(boolean())),
            field("description", opt(string())),
            field("extensions", opt(r("JackalComponentExtensions"))),
            field("files", opt(list("JackalFile"))),
            field("group", opt(string())),
            field("images", opt(strings())),
            field("import", opt(r("JackalComponentImport"))),
            field("manifests", opt(list("JackalManifest"))),
            field("name", string()),
            field("only", opt(r("JackalComponentOnlyTarget"))),
            field("repos", opt(strings())),
            field("required", opt(boolean())),
            field("scripts", opt(r("DeprecatedJackalComponentScripts"))),
        ]),
    );
    reg.register(
        "JackalChart",
        object(vec![
            field("gitPath", opt(string())),
            field("localPath", opt(string())),
            field("name", string()),
            field("namespace", string()),
            field("noWait", opt(boolean())),
            field("releaseName", opt(string())),
            field("url", opt(string())),
            field("valuesFiles", opt(strings())),
            field("version", opt(string())),
        ]),
    );
    reg.register(
        "JackalDataInjection",
        object(vec![
            field("compress", opt(boolean())),
            field("source", string()),
            field("target", r("JackalContainerTarget")),
        ]),
    );
    reg.register(
        "JackalContainerTarget",
        object(vec![
            field("container", string()),
            field("namespace", string()),
            field("path", string()),
            field("selector", string()),
        ]),
    );
    reg.register(
        "JackalComponentExtensions",
        object(vec![field("bigbang", opt(r("BigBang")))]),
    );
    reg.register(
        "BigBang",
        object(vec![
            field("fluxPatchFiles", opt(strings())),
            field("repo", opt(string())),
            field("skipFlux", opt(boolean())),
            field("valuesFiles", opt(strings())),
            field("version", string()),
        ]),
    );
    reg.register(
        "JackalFile",
        object(vec![
            field("executable", opt(boolean())),
            field("extractPath", opt(string())),
            field("shasum", opt(string())),
            field("source", string()),
            field("symlinks", opt(strings())),
            field("target", string()),
        ]),
    );
    reg.register(
        "JackalComponentImport",
        object(vec![
            field("name", opt(string())),
            field("path", opt(string())),
            field("url", opt(string())),
        ]),
    );
    reg.register(
        "JackalManifest",
        object(vec![
            field("files", opt(strings())),
            field("kustomizations", opt(strings())),
            field("kustomizeAllowAnyDirectory", opt(boolean())),
            field("name", string()),
            field("namespace", opt(string())),
            field("noWait", opt(boolean())),
        ]),
    );
    reg.register(
        "JackalComponentOnlyTarget",
        object(vec![
            field("cluster", opt(r("JackalComponentOnlyCluster"))),
            field("flavor", opt(string())),
            field("localOS", opt(r("LocalOS"))),
        ]),
    );
    reg.register(
        "JackalComponentOnlyCluster",
        object(vec![
            field("architecture", opt(r("Architecture"))),
            field("distros", opt(strings())),
        ]),
    );
    reg.register(
        "DeprecatedJackalComponentScripts",
        object(vec![
            field("after", opt(strings())),
            field("before", opt(strings())),
            field("prepare", opt(strings())),
            field("retry", opt(boolean())),
            field("showOutput", opt(boolean())),
            field("timeoutSeconds", opt(number())),
        ]),
    );
}

fn register_actions(reg: &mut SchemaRegistry) {
    reg.register(
        "JackalComponentActions",
        object(vec![
            field("onCreate", opt(r("JackalComponentActionSet"))),
            field("onDeploy", opt(r("JackalComponentActionSet"))),
            field("onRemove", opt(r("JackalComponentActionSet"))),
        ]),
    );
    reg.register(
        "JackalComponentActionSet",
        object(vec![
            field("after", opt(list("JackalComponentAction"))),
            field("before", opt(list("JackalComponentAction"))),
            field("defaults", opt(r("JackalComponentActionDefaults"))),
            field("onFailure", opt(list("JackalComponentAction"))),
            field("onSuccess", opt(list("JackalComponentAction"))),
        ]),
    );
    reg.register(
        "JackalComponentAction",
        object(vec![
            field("cmd", opt(string())),
            field("description", opt(string())),
            field("dir", opt(string())),
            field("env", opt(strings())),
            field("maxRetries", opt(number())),
            field("maxTotalSeconds", opt(number())),
            field("mute", opt(boolean())),
            field("setVariable", opt(string())),
            field("setVariables", opt(list("JackalComponentActionSetVariable"))),
            field("shell", opt(r("JackalComponentActionShell"))),
            field("wait", opt(r("JackalComponentActionWait"))),
        ]),
    );
    reg.register(
        "JackalComponentActionSetVariable",
        object(vec![
            field("autoIndent", opt(boolean())),
            field("name", string()),
            field("pattern", opt(string())),
            field("sensitive", opt(boolean())),
            field("type", opt(r("Type"))),
        ]),
    );
    reg.register(
        "JackalComponentActionShell",
        object(vec![
            field("darwin", opt(string())),
            field("linux", opt(string())),
            field("windows", opt(string())),
        ]),
    );
    reg.register(
        "JackalComponentActionWait",
        object(vec![
            field("cluster", opt(r("JackalComponentActionWaitCluster"))),
            field("network", opt(r("JackalComponentActionWaitNetwork"))),
        ]),
    );
    reg.register(
        "JackalComponentActionWaitCluster",
        object(vec![
            field("condition", opt(string())),
            field("kind", string()),
            field("name", string()),
            field("namespace", opt(string())),
        ]),
    );
    reg.register(
        "JackalComponentActionWaitNetwork",
        object(vec![
            field("address", string()),
            field("code", opt(number())),
            field("protocol", r("Protocol")),
        ]),
    );
    reg.register(
        "JackalComponentActionDefaults",
        object(vec![
            field("dir", opt(string())),
            field("env", opt(strings())),
            field("maxRetries", opt(number())),
            field("maxTotalSeconds", opt(number())),
            field("mute", opt(boolean())),
            field("shell", opt(r("JackalComponentActionShell"))),
        ]),
    );
}

fn register_state(reg: &mut SchemaRegistry) {
    reg.register(
        "DeployedComponent",
        object(vec![
            field("installedCharts", list("InstalledChart")),
            field("name", string()),
            field("observedGeneration", number()),
            field("status", string()),
        ]),
    );
    reg.register(
        "InstalledChart",
        object(vec![field("chartName", string()), field("namespace", string())]),
    );
    reg.register(
        JACKAL_STATE,
        object(vec![
            field("agentTLS", r("GeneratedPKI")),
            field("architecture", string()),
            field("artifactServer", r("ArtifactServerInfo")),
            field("distro", string()),
            field("gitServer", r("GitServerInfo")),
            field("loggingSecret", string()),
            field("registryInfo", r("RegistryInfo")),
            field("storageClass", string()),
            field("jackalAppliance", boolean()),
        ]),
    );
    reg.register(
        "GeneratedPKI",
        object(vec![
            field("ca", string()),
            field("cert", string()),
            field("key", string()),
        ]),
    );
    reg.register(
        "ArtifactServerInfo",
        object(vec![
            field("address", string()),
            field("internalServer", boolean()),
            field("pushPassword", string()),
            field("pushUsername", string()),
        ]),
    );
    reg.register(
        "GitServerInfo",
        object(vec![
            field("address", string()),
            field("internalServer", boolean()),
            field("pullPassword", string()),
            field("pullUsername", string()),
            field("pushPassword", string()),
            field("pushUsername", string()),
        ]),
    );
    reg.register(
        "RegistryInfo",
        object(vec![
            field("address", string()),
            field("internalRegistry", boolean()),
            field("nodePort", number()),
            field("pullPassword", string()),
            field("pullUsername", string()),
            field("pushPassword", string()),
            field("pushUsername", string()),
            field("secret", string()),
        ]),
    );
}
