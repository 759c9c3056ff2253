//! The `list_servers` tool: descriptor, argument parsing, invocation, and
//! text rendering.

use std::sync::Arc;

use ostack_core::compute::{ComputeControl, ListServersRequest, ServerListing, ServerRecord};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

/// Name of the server-listing tool.
pub const LIST_SERVERS_TOOL: &str = "list_servers";

/// Arguments accepted by `list_servers`. Unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListServersParams {
    #[serde(default = "default_detailed")]
    pub detailed: bool,
    #[serde(default)]
    pub all_projects: bool,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub marker: Option<String>,
}

const fn default_detailed() -> bool {
    true
}

impl From<ListServersParams> for ListServersRequest {
    fn from(params: ListServersParams) -> Self {
        Self {
            detailed: params.detailed,
            all_projects: params.all_projects,
            filters: params.filters,
            limit: params.limit,
            marker: params.marker,
        }
    }
}

/// Descriptors for every tool this server exposes.
#[must_use]
pub fn descriptors() -> Vec<Tool> {
    vec![Tool::new(
        LIST_SERVERS_TOOL,
        "List servers from the OpenStack Nova compute service.",
        Arc::new(list_servers_schema()),
    )]
}

fn list_servers_schema() -> JsonObject {
    let schema = json!({
        "type": "object",
        "properties": {
            "detailed": {
                "type": "boolean",
                "default": true,
                "description": "Whether to return detailed server information"
            },
            "all_projects": {
                "type": "boolean",
                "default": false,
                "description": "List servers from all projects (admin only)"
            },
            "filters": {
                "type": "object",
                "description": "Filters to apply when listing servers",
                "additionalProperties": true
            },
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum number of servers to return"
            },
            "marker": {
                "type": "string",
                "description": "ID of the last item in the previous page (for pagination)"
            }
        },
        "additionalProperties": false
    });
    match schema {
        Value::Object(object) => object,
        _ => JsonObject::new(),
    }
}

/// Routes one tool call and renders its outcome as text.
///
/// An unknown name and malformed arguments are rendered outcomes, never
/// protocol errors.
pub async fn dispatch(
    control: &ComputeControl,
    name: &str,
    arguments: Option<JsonObject>,
) -> CallToolResult {
    info!(tool = %name, "tool called");

    if name != LIST_SERVERS_TOOL {
        return CallToolResult::success(vec![Content::text(format!("Unknown tool: {name}"))]);
    }

    let arguments = Value::Object(arguments.unwrap_or_default());
    let params: ListServersParams = match serde_json::from_value(arguments) {
        Ok(params) => params,
        Err(err) => {
            return CallToolResult::error(vec![Content::text(format!("Invalid arguments: {err}"))]);
        }
    };

    let request = ListServersRequest::from(params);
    match control.list_servers(&request).await {
        Ok(listing) => CallToolResult::success(vec![Content::text(render_listing(&listing))]),
        Err(err) => CallToolResult::error(vec![Content::text(format!("Error: {err}"))]),
    }
}

fn render_listing(listing: &ServerListing) -> String {
    let mut output = format!("Found {} servers\n\n", listing.count);
    for server in &listing.servers {
        render_server(&mut output, server);
    }
    output
}

fn render_server(output: &mut String, server: &ServerRecord) {
    output.push_str(&format!("ID: {}\n", text_field(server, "id")));
    output.push_str(&format!("Name: {}\n", text_field(server, "name")));
    output.push_str(&format!("Status: {}\n", text_field(server, "status")));

    if let Some(Value::Object(networks)) = server.get("addresses") {
        output.push_str("Addresses:\n");
        for (network, entries) in networks {
            let Some(entries) = entries.as_array() else {
                continue;
            };
            for entry in entries {
                let addr = entry
                    .get("addr")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let addr_type = entry
                    .get("OS-EXT-IPS:type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                output.push_str(&format!("  - {network}: {addr} ({addr_type})\n"));
            }
        }
    }

    if let Some(Value::Object(flavor)) = server.get("flavor") {
        let name = flavor
            .get("original_name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        output.push_str(&format!("Flavor: {name}\n"));
    }

    // Nova reports an empty image for boot-from-volume servers.
    if let Some(Value::Object(image)) = server.get("image") {
        if !image.is_empty() {
            let id = image.get("id").and_then(Value::as_str).unwrap_or("Unknown");
            output.push_str(&format!("Image: {id}\n"));
        }
    }

    output.push('\n');
}

fn text_field(server: &ServerRecord, key: &str) -> String {
    match server.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> ServerRecord {
        let value = json!({
            "id": "abc-123",
            "name": "web-1",
            "status": "ACTIVE",
            "addresses": {
                "private": [
                    { "addr": "10.0.0.3", "OS-EXT-IPS:type": "fixed" },
                    { "addr": "203.0.113.7", "OS-EXT-IPS:type": "floating" }
                ]
            },
            "flavor": { "original_name": "m1.small" },
            "image": { "id": "img-9" }
        });
        match value {
            Value::Object(map) => map,
            _ => ServerRecord::new(),
        }
    }

    #[test]
    fn renders_the_full_record_shape() {
        let listing = ServerListing::new(vec![full_record()]);
        let text = render_listing(&listing);

        let expected = "Found 1 servers\n\n\
            ID: abc-123\n\
            Name: web-1\n\
            Status: ACTIVE\n\
            Addresses:\n\
            \x20 - private: 10.0.0.3 (fixed)\n\
            \x20 - private: 203.0.113.7 (floating)\n\
            Flavor: m1.small\n\
            Image: img-9\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn sparse_records_render_the_header_lines_only() {
        let mut record = ServerRecord::new();
        record.insert("id".to_string(), json!("abc"));
        record.insert("name".to_string(), json!("bare"));
        record.insert("status".to_string(), json!("BUILD"));

        let listing = ServerListing::new(vec![record]);
        let text = render_listing(&listing);

        assert_eq!(text, "Found 1 servers\n\nID: abc\nName: bare\nStatus: BUILD\n\n");
    }

    #[test]
    fn flavor_without_a_name_renders_unknown() {
        let mut record = ServerRecord::new();
        record.insert("id".to_string(), json!("abc"));
        record.insert("flavor".to_string(), json!({}));

        let listing = ServerListing::new(vec![record]);
        let text = render_listing(&listing);

        assert!(text.contains("Flavor: Unknown\n"));
    }

    #[test]
    fn empty_or_textual_images_are_skipped() {
        let mut record = ServerRecord::new();
        record.insert("id".to_string(), json!("abc"));
        record.insert("image".to_string(), json!({}));

        let listing = ServerListing::new(vec![record]);
        assert!(!render_listing(&listing).contains("Image:"));

        let mut record = ServerRecord::new();
        record.insert("image".to_string(), json!(""));
        let listing = ServerListing::new(vec![record]);
        assert!(!render_listing(&listing).contains("Image:"));
    }

    #[test]
    fn missing_fields_render_as_unknown() {
        let listing = ServerListing::new(vec![ServerRecord::new()]);
        let text = render_listing(&listing);

        assert!(text.contains("ID: unknown\n"));
        assert!(text.contains("Name: unknown\n"));
        assert!(text.contains("Status: unknown\n"));
    }

    #[test]
    fn defaults_match_the_documented_schema() {
        let params: ListServersParams =
            serde_json::from_value(json!({})).expect("empty arguments should parse");

        assert!(params.detailed);
        assert!(!params.all_projects);
        assert!(params.filters.is_none());
        assert!(params.limit.is_none());
        assert!(params.marker.is_none());
    }

    #[test]
    fn unknown_argument_keys_are_rejected() {
        let result: Result<ListServersParams, _> =
            serde_json::from_value(json!({ "flavor": "m1.small" }));
        assert!(result.is_err());
    }

    #[test]
    fn schema_covers_every_request_field() {
        let schema = list_servers_schema();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .expect("schema should have properties");

        for field in ["detailed", "all_projects", "filters", "limit", "marker"] {
            assert!(properties.contains_key(field), "missing {field}");
        }
        assert_eq!(schema.get("additionalProperties"), Some(&json!(false)));
    }
}
