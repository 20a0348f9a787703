// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The fixed scene tool catalog.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::schema::{FieldSpec, FieldViolation, SchemaViolations, ToolSchema};
use super::{ToolDefinition, ToolOutput, ToolRegistry};
use crate::error::ToolError;
use crate::host::EditorHost;
use crate::model::{ContextSnapshot, NodeId, SearchPage};
use crate::query::{ContextSnapshotBuilder, NodeSearchEngine, SearchError, SearchRequest, SnapshotRequest};
use crate::sandbox::{SandboxedCodeExecutor, ScriptArgs, ScriptReport};

pub const GET_EDITOR_CONTEXT: &str = "get_editor_context";
pub const SEARCH_NODES: &str = "search_nodes";
pub const EXECUTE_SCRIPT: &str = "execute_script";
pub const GET_NODE_INFO: &str = "get_node_info";
pub const SELECT_NODES: &str = "select_nodes";
pub const CREATE_NODE: &str = "create_node";
pub const DELETE_NODE: &str = "delete_node";
pub const SET_NODE_PROPERTY: &str = "set_node_property";

/// Registers every scene tool against `host`.
pub fn register_scene_tools<H: EditorHost>(
    registry: &mut ToolRegistry,
    host: Arc<H>,
    script_timeout_ms: u64,
) {
    registry.register(editor_context_tool(host.clone()));
    registry.register(search_nodes_tool(host.clone()));
    registry.register(execute_script_tool(host.clone(), script_timeout_ms));
    registry.register(node_info_tool(host.clone()));
    registry.register(select_nodes_tool(host.clone()));
    registry.register(create_node_tool(host.clone()));
    registry.register(delete_node_tool(host.clone()));
    registry.register(set_node_property_tool(host));
}

fn parse<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

fn node_id(raw: &str) -> Result<NodeId, ToolError> {
    NodeId::new(raw).map_err(|err| ToolError::InvalidArguments(format!("`{raw}`: {err}")))
}

fn editor_context_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(
            FieldSpec::boolean("includeHierarchy")
                .default(true)
                .describe("Include a summary of the scene hierarchy"),
        )
        .field(
            FieldSpec::boolean("includeRecentLogs")
                .default(true)
                .describe("Include recent editor log lines (ignored when summaryOnly is set)"),
        )
        .field(
            FieldSpec::boolean("summaryOnly")
                .default(false)
                .describe("Compact mode: nested uuid/name/childCount only, larger node ceiling"),
        )
        .field(FieldSpec::integer("maxDepth").default(2).describe("Traversal depth, 1 to 10"))
        .field(
            FieldSpec::integer("maxNodes")
                .default(100)
                .describe("Node budget, 10 to 500 (up to 5000 in summaryOnly mode)"),
        )
        .field(FieldSpec::integer("maxLogLines").default(20).describe("Log lines, 5 to 100"))
        .field(
            FieldSpec::string("parentUuid")
                .describe("Only summarize the children of this node; skips the selection"),
        );

    ToolDefinition::new(
        GET_EDITOR_CONTEXT,
        "Get editor context",
        "Bounded snapshot of the editor: mode, selection, hierarchy summary, recent logs and \
         environment. Partial data is returned with warnings rather than failing.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let request: SnapshotRequest = parse(args)?;
                let options = request
                    .resolve()
                    .map_err(|err| ToolError::InvalidArguments(format!("parentUuid: {err}")))?;
                let snapshot = ContextSnapshotBuilder::new(host.as_ref()).build(&options).await;
                ToolOutput::value(&snapshot)
            }
        },
    )
    .with_output_schema::<ContextSnapshot>()
}

fn search_nodes_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(
            FieldSpec::string("namePattern")
                .describe("Glob over node names; * any run, ? one character, case-insensitive"),
        )
        .field(
            FieldSpec::string("componentType")
                .describe("Case-insensitive substring of a component type, e.g. Sprite"),
        )
        .field(FieldSpec::string("pathPattern").describe("Glob over slash-joined node paths"))
        .field(FieldSpec::integer("limit").default(50).describe("Page size, 1 to 100"))
        .field(FieldSpec::integer("offset").default(0).describe("Matches to skip"));

    ToolDefinition::new(
        SEARCH_NODES,
        "Search nodes",
        "Find nodes by name glob, component type and path glob. At least one filter is \
         required. Results are paginated and report the total match count.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let request: SearchRequest = parse(args)?;
                let query = request.into_query().map_err(search_error)?;
                let page =
                    NodeSearchEngine::new(host.as_ref()).search(&query).await.map_err(search_error)?;
                ToolOutput::value(&page)
            }
        },
    )
    .with_output_schema::<SearchPage>()
}

fn search_error(err: SearchError) -> ToolError {
    match err {
        SearchError::NoFilter => ToolError::Validation(SchemaViolations {
            violations: vec![FieldViolation::new(
                "namePattern",
                "one of namePattern, componentType or pathPattern is required",
            )],
        }),
        SearchError::InvalidPattern { .. } => ToolError::InvalidArguments(err.to_string()),
        SearchError::Host(err) => ToolError::Host(err),
    }
}

fn execute_script_tool<H: EditorHost>(host: Arc<H>, default_timeout_ms: u64) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(
            FieldSpec::string("code")
                .required()
                .min_length(1)
                .describe("Script body; `return` a value to get it back"),
        )
        .field(FieldSpec::boolean("returnResult").default(true))
        .field(
            FieldSpec::integer("timeout")
                .default(default_timeout_ms)
                .min(1.0)
                .describe("Deadline in milliseconds"),
        )
        .field(FieldSpec::boolean("captureConsole").default(true))
        .field(
            FieldSpec::boolean("skipValidation")
                .default(false)
                .describe("Skip the pre-execution risk scan"),
        )
        .field(
            FieldSpec::boolean("showApiDocs")
                .default(false)
                .describe("Attach the scripting API notes to the result"),
        );

    ToolDefinition::new(
        EXECUTE_SCRIPT,
        "Execute script",
        "Run a script inside the editor with only cc, Editor, console and scene in scope. \
         Risky constructs are rejected unless validation is skipped.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let script: ScriptArgs = parse(args)?;
                let options = script.options(default_timeout_ms);
                let report =
                    SandboxedCodeExecutor::new(host.as_ref()).execute(&script.code, &options).await;
                ToolOutput::value(&report)
            }
        },
    )
    .with_output_schema::<ScriptReport>()
}

#[derive(Deserialize)]
struct UuidArgs {
    uuid: String,
}

fn uuid_schema(description: &str) -> ToolSchema {
    ToolSchema::new().field(FieldSpec::string("uuid").required().min_length(1).describe(description))
}

fn node_info_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    ToolDefinition::new(
        GET_NODE_INFO,
        "Get node info",
        "Name, active state, parent, components and properties of one node.",
        uuid_schema("Node uuid"),
        move |args| {
            let host = host.clone();
            async move {
                let UuidArgs { uuid } = parse(args)?;
                let details = host.node_details(&node_id(&uuid)?).await?;
                ToolOutput::value(&details)
            }
        },
    )
}

#[derive(Deserialize)]
struct SelectArgs {
    uuids: Vec<String>,
    mode: String,
}

fn select_nodes_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(FieldSpec::string_list("uuids").required().describe("Nodes to select"))
        .field(
            FieldSpec::string("mode")
                .default("replace")
                .one_of(&["replace", "append"])
                .describe("Replace the selection or add to it"),
        );

    ToolDefinition::new(
        SELECT_NODES,
        "Select nodes",
        "Set the editor selection. An empty list with mode replace clears it.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let SelectArgs { uuids, mode } = parse(args)?;
                let requested = uuids.iter().map(|uuid| node_id(uuid)).collect::<Result<Vec<_>, _>>()?;
                let mut selection = if mode == "append" { host.selection().await? } else { Vec::new() };
                for uuid in requested {
                    if !selection.contains(&uuid) {
                        selection.push(uuid);
                    }
                }
                host.select_nodes(&selection).await?;
                ToolOutput::value(&json!({ "success": true, "selected": selection }))
            }
        },
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    name: String,
    parent_uuid: Option<String>,
}

fn create_node_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(FieldSpec::string("name").required().min_length(1).describe("Name of the new node"))
        .field(FieldSpec::string("parentUuid").describe("Parent node; the scene root when omitted"));

    ToolDefinition::new(
        CREATE_NODE,
        "Create node",
        "Create an empty node under a parent.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let CreateArgs { name, parent_uuid } = parse(args)?;
                let parent = parent_uuid.as_deref().map(node_id).transpose()?;
                let uuid = host.create_node(&name, parent.as_ref()).await?;
                ToolOutput::json_text(&json!({
                    "success": true,
                    "uuid": uuid,
                    "name": name,
                    "parentUuid": parent,
                }))
            }
        },
    )
}

fn delete_node_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    ToolDefinition::new(
        DELETE_NODE,
        "Delete node",
        "Delete a node and everything below it.",
        uuid_schema("Node to delete"),
        move |args| {
            let host = host.clone();
            async move {
                let UuidArgs { uuid } = parse(args)?;
                host.delete_node(&node_id(&uuid)?).await?;
                ToolOutput::json_text(&json!({ "success": true, "uuid": uuid }))
            }
        },
    )
}

#[derive(Deserialize)]
struct SetPropertyArgs {
    uuid: String,
    property: String,
    value: Value,
}

fn set_node_property_tool<H: EditorHost>(host: Arc<H>) -> ToolDefinition {
    let schema = ToolSchema::new()
        .field(FieldSpec::string("uuid").required().min_length(1).describe("Node uuid"))
        .field(
            FieldSpec::string("property")
                .required()
                .min_length(1)
                .describe("Property path, e.g. name, active or position.x"),
        )
        .field(FieldSpec::any("value").required().describe("New value"));

    ToolDefinition::new(
        SET_NODE_PROPERTY,
        "Set node property",
        "Set one property on a node.",
        schema,
        move |args| {
            let host = host.clone();
            async move {
                let SetPropertyArgs { uuid, property, value } = parse(args)?;
                host.set_property(&node_id(&uuid)?, &property, value.clone()).await?;
                ToolOutput::json_text(&json!({
                    "success": true,
                    "uuid": uuid,
                    "property": property,
                    "value": value,
                }))
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::host::{demo_host, HostError, MemoryHost, MemoryScene};
    use crate::sandbox::DEFAULT_TIMEOUT_MS;

    fn catalog(host: MemoryHost) -> (ToolRegistry, Arc<MemoryHost>) {
        let host = Arc::new(host);
        let mut registry = ToolRegistry::new();
        register_scene_tools(&mut registry, host.clone(), DEFAULT_TIMEOUT_MS);
        (registry, host)
    }

    #[test]
    fn catalog_registers_every_tool_once() {
        let (registry, _) = catalog(demo_host().unwrap());
        assert_eq!(
            registry.list_names(),
            vec![
                CREATE_NODE,
                DELETE_NODE,
                EXECUTE_SCRIPT,
                GET_EDITOR_CONTEXT,
                GET_NODE_INFO,
                SEARCH_NODES,
                SELECT_NODES,
                SET_NODE_PROPERTY,
            ]
        );
        let context = registry.lookup(GET_EDITOR_CONTEXT).unwrap();
        assert!(context.output_schema().is_some());
        assert_eq!(context.input_schema()["properties"]["maxDepth"]["default"], 2);
    }

    #[tokio::test]
    async fn snapshot_tool_clamps_the_node_budget() {
        let mut scene = MemoryScene::new("Big");
        let root = scene.root().clone();
        for index in 0..30 {
            scene.add_node(&root, &format!("N{index}"), &[]).unwrap();
        }
        let (registry, _) = catalog(MemoryHost::new(scene));

        let value = registry
            .execute(GET_EDITOR_CONTEXT, &json!({ "summaryOnly": true, "maxNodes": 5 }))
            .await
            .unwrap();
        assert_eq!(value["hierarchy"]["maxNodes"], 10);
        assert_eq!(value["hierarchy"]["summarizedNodes"], 10);
        assert_eq!(value["hierarchy"]["truncated"], true);
        assert_eq!(value["compact"], true);
    }

    #[tokio::test]
    async fn out_of_range_integers_clamp_to_their_ceilings() {
        let (registry, _) = catalog(demo_host().unwrap());

        let value = registry
            .execute(GET_EDITOR_CONTEXT, &json!({ "maxNodes": 18_446_744_073_709_551_615_u64 }))
            .await
            .unwrap();
        assert_eq!(value["hierarchy"]["maxNodes"], 500);

        let page = registry
            .execute(SEARCH_NODES, &json!({ "namePattern": "Enemy*", "limit": 1e20, "offset": 1e20 }))
            .await
            .unwrap();
        assert_eq!(page["limit"], 100);
        assert_eq!(page["total"], 3);
        assert_eq!(page["offset"], 3);
        assert_eq!(page["results"], json!([]));
    }

    #[tokio::test]
    async fn search_tool_requires_a_filter() {
        let (registry, host) = catalog(demo_host().unwrap());
        let err = registry.execute(SEARCH_NODES, &json!({ "limit": 5 })).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn search_tool_returns_a_page() {
        let (registry, _) = catalog(demo_host().unwrap());
        let value = registry
            .execute(SEARCH_NODES, &json!({ "namePattern": "Enemy*", "limit": 2 }))
            .await
            .unwrap();
        assert_eq!(value["total"], 3);
        assert_eq!(value["hasMore"], true);
        assert_eq!(value["results"][0]["name"], "Enemy1");
    }

    #[tokio::test]
    async fn mutation_tools_unwrap_their_text_envelopes() {
        let (registry, host) = catalog(demo_host().unwrap());

        let created = registry
            .execute(CREATE_NODE, &json!({ "name": "Spawner" }))
            .await
            .unwrap();
        assert_eq!(created["success"], true);
        let uuid = created["uuid"].as_str().unwrap().to_owned();

        let updated = registry
            .execute(
                SET_NODE_PROPERTY,
                &json!({ "uuid": uuid, "property": "position.y", "value": 3.5 }),
            )
            .await
            .unwrap();
        assert_eq!(updated["value"], 3.5);

        let info = registry.execute(GET_NODE_INFO, &json!({ "uuid": uuid })).await.unwrap();
        assert_eq!(info["name"], "Spawner");
        assert_eq!(info["properties"]["position.y"], 3.5);

        let deleted = registry.execute(DELETE_NODE, &json!({ "uuid": uuid })).await.unwrap();
        assert_eq!(deleted, json!({ "success": true, "uuid": uuid }));
        let node = node_id(&uuid).unwrap();
        assert_eq!(host.node_details(&node).await, Err(HostError::NotFound(uuid)));
    }

    #[tokio::test]
    async fn host_failures_surface_as_host_errors() {
        let (registry, _) = catalog(demo_host().unwrap());
        let err = registry.execute(GET_NODE_INFO, &json!({ "uuid": "ghost" })).await.unwrap_err();
        assert!(err.is_tool_failure());
        assert_eq!(err, ToolError::Host(HostError::NotFound("ghost".into())));
    }

    #[tokio::test]
    async fn select_nodes_replaces_or_appends() {
        let (registry, host) = catalog(demo_host().unwrap());
        let tree = host.node_tree().await.unwrap();
        let canvas = tree.children[0].uuid.to_string();
        let enemies = tree.children[1].uuid.to_string();

        registry.execute(SELECT_NODES, &json!({ "uuids": [canvas] })).await.unwrap();
        let value = registry
            .execute(SELECT_NODES, &json!({ "uuids": [enemies, canvas], "mode": "append" }))
            .await
            .unwrap();
        assert_eq!(value["selected"], json!([canvas, enemies]));

        let err = registry
            .execute(SELECT_NODES, &json!({ "uuids": [], "mode": "toggle" }))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn script_tool_rejects_empty_code() {
        let (registry, _) = catalog(demo_host().unwrap());
        let err = registry.execute(EXECUTE_SCRIPT, &json!({ "code": "" })).await.unwrap_err();
        assert!(err.is_validation());

        let report = registry
            .execute(EXECUTE_SCRIPT, &json!({ "code": "setInterval(tick, 5)" }))
            .await
            .unwrap();
        assert_eq!(report["success"], false);
        assert_eq!(report["validation"]["violations"][0]["category"], "timers");
    }
}
