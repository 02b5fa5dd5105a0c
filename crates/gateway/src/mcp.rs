//! JSON-RPC method dispatch shared by every transport surface (streamable
//! HTTP, SSE POST, and the group-scoped variants of both). `initialize`,
//! `tools/list`, and `tools/call` are the only methods the front-end
//! itself understands — everything else maps to a JSON-RPC method-not-
//! found error.

use mcphub_core::HubFacade;
use mcphub_domain::HubError;
use mcphub_transport::protocol::{initialize_params, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use mcphub_transport::MessageDirection;
use serde_json::{json, Value};

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// The hub's own fallback "group" — used by the ungrouped `/mcp` and
/// `/sse` endpoints, which expose the union the `default` group config
/// describes (or whatever a deployer names their catch-all group).
pub const DEFAULT_GROUP: &str = "default";

pub async fn dispatch(facade: &HubFacade, group_id: &str, request: JsonRpcRequest, client_id: Option<&str>) -> JsonRpcResponse {
    facade.trace().record(group_id.to_string(), MessageDirection::Inbound, request.method.clone(), &json!(request));

    let result = match request.method.as_str() {
        "initialize" => Ok(handle_initialize()),
        "tools/list" => handle_tools_list(facade, group_id).await,
        "tools/call" => handle_tools_call(facade, group_id, request.params.clone(), client_id).await,
        "notifications/initialized" | "ping" => Ok(Value::Null),
        other => {
            let response = JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("method not found: {other}"),
                    data: None,
                }),
            };
            facade.trace().record(group_id.to_string(), MessageDirection::Outbound, request.method.clone(), &json!(response));
            return response;
        }
    };

    let response = match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(err) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: request.id,
            result: None,
            error: Some(hub_error_to_jsonrpc(&err)),
        },
    };
    facade.trace().record(group_id.to_string(), MessageDirection::Outbound, request.method.clone(), &json!(response));
    response
}

fn handle_initialize() -> Value {
    let params = initialize_params();
    json!({
        "protocolVersion": params.protocol_version,
        "capabilities": { "tools": { "listChanged": true } },
        "serverInfo": params.client_info,
    })
}

async fn handle_tools_list(facade: &HubFacade, group_id: &str) -> Result<Value, HubError> {
    let tools = facade.tool_manager.get_tools_for_group(group_id).await?;
    Ok(json!({ "tools": tools }))
}

async fn handle_tools_call(facade: &HubFacade, group_id: &str, params: Option<Value>, client_id: Option<&str>) -> Result<Value, HubError> {
    let params = params.ok_or_else(|| HubError::InvalidParams("tools/call requires params".into()))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| HubError::InvalidParams("tools/call params.name must be a string".into()))?;
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    let result = facade.tool_manager.execute_tool(group_id, name, arguments, client_id).await?;
    serde_json::to_value(result).map_err(|e| HubError::ToolExecutionFailed(e.to_string()))
}

/// Map the hub's own error taxonomy onto JSON-RPC error codes. The
/// standard JSON-RPC codes only cover protocol-shape failures; anything
/// that's a hub-domain error (not-found, rate-limited, forbidden, ...)
/// carries its hub error code in `error.data.code` so callers that
/// understand the hub's envelope can branch on it without string-
/// matching `message`.
fn hub_error_to_jsonrpc(err: &HubError) -> JsonRpcError {
    let code = match err {
        HubError::InvalidParams(_) | HubError::UnresolvedTemplateVariable(_) => INVALID_PARAMS,
        HubError::ToolNotFound(_) | HubError::ServerNotFound(_) | HubError::GroupNotFound(_) => METHOD_NOT_FOUND,
        _ => INTERNAL_ERROR,
    };
    JsonRpcError {
        code,
        message: err.to_string(),
        data: Some(json!({ "code": err.code(), "httpStatus": err.http_status() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_domain::config::{GroupConfig, GroupsFile, HubConfig};

    fn facade_with_default_group() -> HubConfig {
        let mut groups = GroupsFile::new();
        groups.insert(
            "default".into(),
            GroupConfig {
                id: "default".into(),
                name: "default".into(),
                description: None,
                servers: vec![],
                tools: vec![],
                validation: None,
            },
        );
        HubConfig { groups, ..Default::default() }
    }

    #[tokio::test]
    async fn initialize_returns_protocol_version() {
        let facade = HubFacade::init(&facade_with_default_group()).await.unwrap();
        let req = JsonRpcRequest::new(1, "initialize", None);
        let resp = dispatch(&facade, "default", req, None).await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn tools_list_on_empty_group_returns_empty_array() {
        let facade = HubFacade::init(&facade_with_default_group()).await.unwrap();
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let resp = dispatch(&facade, "default", req, None).await;
        assert_eq!(resp.result.unwrap()["tools"], json!([]));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let facade = HubFacade::init(&facade_with_default_group()).await.unwrap();
        let req = JsonRpcRequest::new(3, "bogus/method", None);
        let resp = dispatch(&facade, "default", req, None).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_call_missing_name_is_invalid_params() {
        let facade = HubFacade::init(&facade_with_default_group()).await.unwrap();
        let req = JsonRpcRequest::new(4, "tools/call", Some(json!({})));
        let resp = dispatch(&facade, "default", req, None).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_against_empty_group_reports_no_servers_available() {
        let facade = HubFacade::init(&facade_with_default_group()).await.unwrap();
        let req = JsonRpcRequest::new(5, "tools/call", Some(json!({"name": "ghost"})));
        let resp = dispatch(&facade, "default", req, None).await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.data.unwrap()["code"], "NoServersAvailable");
    }
}
