//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;

use tag_resolver::config::types::DEFAULT_HOST_PLATFORM;
use tag_resolver::graph::{
    ActionMetadata, Artifact, ArtifactValue, BuildConfigurationKey, BuildOptions,
    ConfiguredTargetKey, ConfiguredTargetValue, RuleConfiguredTarget,
};
use tag_resolver::{
    AttrType, AttributeDescriptor, AttributeSchema, GraphKey, GraphValue, InMemoryGraph, Label,
    Location, ProviderView, RawTag,
};

/// Route `tracing` output through the test harness. Honors RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn label(raw: &str) -> Label {
    Label::parse_canonical(raw).unwrap()
}

pub fn exec_options() -> BuildOptions {
    BuildOptions::default()
        .with("platforms", DEFAULT_HOST_PLATFORM)
        .with("compilation_mode", "opt")
}

pub fn options_key() -> GraphKey {
    GraphKey::BaselineOptions {
        after_exec_transition: true,
        platform: label(DEFAULT_HOST_PLATFORM),
    }
}

pub fn target_key(target: &str) -> GraphKey {
    GraphKey::ConfiguredTarget(ConfiguredTargetKey {
        label: label(target),
        configuration: BuildConfigurationKey::from_options(&exec_options()),
    })
}

pub fn rule_target(target: &str, outputs: &[&str]) -> GraphValue {
    GraphValue::ConfiguredTarget(ConfiguredTargetValue::Rule(RuleConfiguredTarget {
        label: label(target),
        providers: ProviderView::new()
            .with("DefaultInfo", json!({ "files": outputs }))
            .with("ToolInfo", json!({ "path": outputs.first() })),
        actions: vec![ActionMetadata {
            mnemonic: "Genrule".into(),
            outputs: outputs.iter().map(|o| Artifact::new(*o)).collect(),
        }],
    }))
}

pub fn built(exec_path: &str) -> GraphValue {
    GraphValue::Artifact(ArtifactValue {
        digest: format!("sha256:{exec_path}"),
        size: 42,
    })
}

pub const TOOL: &str = "@@//gen:tool";
pub const OUTPUTS: [&str; 2] = ["bazel-out/gen/tool", "bazel-out/gen/tool.runfiles"];

/// Graph where everything `//gen:tool` needs is already computed.
pub fn ready_graph() -> InMemoryGraph {
    let mut graph = InMemoryGraph::new();
    graph.insert_ready(options_key(), GraphValue::BaselineOptions(exec_options()));
    graph.insert_ready(target_key(TOOL), rule_target(TOOL, &OUTPUTS));
    for output in OUTPUTS {
        graph.insert_ready(Artifact::new(output).key(), built(output));
    }
    graph
}

/// Same values as [`ready_graph`], none of them computed yet.
pub fn pending_graph() -> InMemoryGraph {
    let mut graph = InMemoryGraph::new();
    graph.insert_pending(options_key(), GraphValue::BaselineOptions(exec_options()));
    graph.insert_pending(target_key(TOOL), rule_target(TOOL, &OUTPUTS));
    for output in OUTPUTS {
        graph.insert_pending(Artifact::new(output).key(), built(output));
    }
    graph
}

/// `dep(name = ..., dep = ..., mode = ..., jobs = ...)`
pub fn dep_schema() -> Arc<AttributeSchema> {
    Arc::new(
        AttributeSchema::new(
            "dep",
            vec![
                AttributeDescriptor::new("name", AttrType::String).mandatory(),
                AttributeDescriptor::new("dep", AttrType::Label),
                AttributeDescriptor::new("mode", AttrType::String).with_default("opt"),
                AttributeDescriptor::new("jobs", AttrType::Int),
                AttributeDescriptor::new("tags", AttrType::StringList),
            ],
        )
        .unwrap(),
    )
}

pub fn module_location(line: u32) -> Location {
    Location::new("/ws/MODULE.bazel", line, 5)
}

pub fn dep_tag() -> RawTag {
    RawTag::new("dep", module_location(3))
        .with_attr("name", "x")
        .with_attr("dep", "//gen:tool")
}
