//! The CRM tool set advertised to the voice agent.
//!
//! Ten tools over the Close.com operations. Argument schemas here are what
//! the upstream model sees; handlers validate required arguments, apply the
//! documented defaults, and render remote failures as error text.

use serde_json::json;

use super::{ToolDef, ToolRegistry, int_arg, missing_argument, str_arg};

/// Default result count for list-style tools.
const DEFAULT_LIMIT: i64 = 200;

/// Default status for new opportunities.
const DEFAULT_OPPORTUNITY_STATUS: &str = "Active";

/// Default sort order for opportunity listings.
const DEFAULT_OPPORTUNITY_SORT: &str = "-date_created";

/// Register the full CRM tool set.
pub(super) fn install(registry: &mut ToolRegistry) {
    registry.register(
        ToolDef::function(
            "search_leads",
            "Search for leads by name or query.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query (e.g., company name or person name)."},
                    "limit": {"type": "integer", "description": "Number of leads to return. Default 200."}
                },
                "required": ["query"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(query) = str_arg(&args, "query") else {
                    return missing_argument("query");
                };
                let limit = int_arg(&args, "limit").unwrap_or(DEFAULT_LIMIT);
                crm.search_leads(&query, limit)
                    .await
                    .unwrap_or_else(|e| format!("Error searching leads: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "get_lead_details",
            "Get full details of a specific lead.",
            json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "string", "description": "The ID of the lead."}
                },
                "required": ["lead_id"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(lead_id) = str_arg(&args, "lead_id") else {
                    return missing_argument("lead_id");
                };
                crm.get_lead_details(&lead_id)
                    .await
                    .unwrap_or_else(|e| format!("Error getting lead details: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "add_lead_note",
            "Add a note to a lead.",
            json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "string", "description": "The ID of the lead."},
                    "note_text": {"type": "string", "description": "The content of the note."}
                },
                "required": ["lead_id", "note_text"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(lead_id) = str_arg(&args, "lead_id") else {
                    return missing_argument("lead_id");
                };
                let Some(note_text) = str_arg(&args, "note_text") else {
                    return missing_argument("note_text");
                };
                crm.add_lead_note(&lead_id, &note_text)
                    .await
                    .unwrap_or_else(|e| format!("Error adding note: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "create_lead",
            "Create a new lead.",
            json!({
                "type": "object",
                "properties": {
                    "company_name": {"type": "string", "description": "The name of the company."},
                    "contact_name": {"type": "string", "description": "The name of the contact person (optional)."},
                    "email": {"type": "string", "description": "The email of the contact (optional)."}
                },
                "required": ["company_name"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(company_name) = str_arg(&args, "company_name") else {
                    return missing_argument("company_name");
                };
                let contact_name = str_arg(&args, "contact_name");
                let email = str_arg(&args, "email");
                crm.create_lead(&company_name, contact_name.as_deref(), email.as_deref())
                    .await
                    .unwrap_or_else(|e| format!("Error creating lead: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "update_lead_description",
            "Update the description of a lead.",
            json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "string", "description": "The ID of the lead."},
                    "description": {"type": "string", "description": "The new description text."}
                },
                "required": ["lead_id", "description"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(lead_id) = str_arg(&args, "lead_id") else {
                    return missing_argument("lead_id");
                };
                let Some(description) = str_arg(&args, "description") else {
                    return missing_argument("description");
                };
                crm.update_lead_description(&lead_id, &description)
                    .await
                    .unwrap_or_else(|e| format!("Error updating lead: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "create_opportunity",
            "Create a new opportunity for a lead.",
            json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "string", "description": "The ID of the lead."},
                    "note": {"type": "string", "description": "Description or note for the opportunity."},
                    "value": {"type": "integer", "description": "The value of the opportunity in cents."},
                    "status": {"type": "string", "description": "The status (e.g., 'Active'). Optional."}
                },
                "required": ["lead_id", "note", "value"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(lead_id) = str_arg(&args, "lead_id") else {
                    return missing_argument("lead_id");
                };
                let Some(note) = str_arg(&args, "note") else {
                    return missing_argument("note");
                };
                let Some(value) = int_arg(&args, "value") else {
                    return missing_argument("value");
                };
                let status = str_arg(&args, "status")
                    .unwrap_or_else(|| DEFAULT_OPPORTUNITY_STATUS.to_string());
                crm.create_opportunity(&lead_id, &note, value, &status)
                    .await
                    .unwrap_or_else(|e| format!("Error creating opportunity: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "get_lead_notes",
            "Get all notes for a specific lead.",
            json!({
                "type": "object",
                "properties": {
                    "lead_id": {"type": "string", "description": "The ID of the lead."}
                },
                "required": ["lead_id"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(lead_id) = str_arg(&args, "lead_id") else {
                    return missing_argument("lead_id");
                };
                crm.get_lead_notes(&lead_id)
                    .await
                    .unwrap_or_else(|e| format!("Error getting notes: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "update_note",
            "Update the content of a specific note.",
            json!({
                "type": "object",
                "properties": {
                    "note_id": {"type": "string", "description": "The ID of the note to update."},
                    "new_text": {"type": "string", "description": "The new content for the note."}
                },
                "required": ["note_id", "new_text"]
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let Some(note_id) = str_arg(&args, "note_id") else {
                    return missing_argument("note_id");
                };
                let Some(new_text) = str_arg(&args, "new_text") else {
                    return missing_argument("new_text");
                };
                crm.update_note(&note_id, &new_text)
                    .await
                    .unwrap_or_else(|e| format!("Error updating note: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "get_opportunities",
            "Get a list of opportunities, sorted by newest first.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Number of opportunities to return. Default 200."},
                    "sort_by": {"type": "string", "description": "Sort field. Default '-date_created'."},
                    "status_label": {"type": "string", "description": "Optional status label to filter by (e.g. 'Active', 'Won')."}
                },
                "required": []
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let limit = int_arg(&args, "limit").unwrap_or(DEFAULT_LIMIT);
                let sort_by = str_arg(&args, "sort_by")
                    .unwrap_or_else(|| DEFAULT_OPPORTUNITY_SORT.to_string());
                let status_label = str_arg(&args, "status_label");
                crm.get_opportunities(limit, &sort_by, status_label.as_deref())
                    .await
                    .unwrap_or_else(|e| format!("Error getting opportunities: {e}"))
            })
        }),
    );

    registry.register(
        ToolDef::function(
            "list_leads",
            "List multiple leads, sorted by newest first.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Number of leads to return. Default 200."},
                    "query": {"type": "string", "description": "Optional search query."}
                },
                "required": []
            }),
        ),
        Box::new(|crm, args| {
            Box::pin(async move {
                let limit = int_arg(&args, "limit").unwrap_or(DEFAULT_LIMIT);
                let query = str_arg(&args, "query").unwrap_or_default();
                crm.list_leads(limit, &query)
                    .await
                    .unwrap_or_else(|e| format!("Error searching leads: {e}"))
            })
        }),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::crm::{CrmClient, CrmConfig};
    use crate::tools::{TOOL_NOT_FOUND, ToolArguments, ToolRegistry};

    fn registry_for(server: &MockServer) -> ToolRegistry {
        ToolRegistry::with_crm_tools(Arc::new(CrmClient::new(CrmConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
        })))
    }

    fn args(pairs: &[(&str, serde_json::Value)]) -> ToolArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_ten_tools_registered_in_order() {
        let registry = ToolRegistry::with_crm_tools(Arc::new(CrmClient::new(CrmConfig::default())));
        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(
            names,
            [
                "search_leads",
                "get_lead_details",
                "add_lead_note",
                "create_lead",
                "update_lead_description",
                "create_opportunity",
                "get_lead_notes",
                "update_note",
                "get_opportunities",
                "list_leads",
            ]
        );
    }

    #[test]
    fn test_definitions_carry_required_lists() {
        let registry = ToolRegistry::with_crm_tools(Arc::new(CrmClient::new(CrmConfig::default())));
        for def in registry.definitions() {
            assert_eq!(def.tool_type, "function");
            assert!(def.parameters["required"].is_array(), "{}", def.name);
        }
        let defs = registry.definitions();
        let create_opp = defs
            .iter()
            .find(|d| d.name == "create_opportunity")
            .unwrap();
        assert_eq!(
            create_opp.parameters["required"],
            serde_json::json!(["lead_id", "note", "value"])
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let server = MockServer::start().await;
        let registry = registry_for(&server);
        let result = registry.dispatch("send_invoice", &ToolArguments::new()).await;
        assert_eq!(result, TOOL_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_argument() {
        let server = MockServer::start().await;
        let registry = registry_for(&server);
        let result = registry.dispatch("get_lead_details", &ToolArguments::new()).await;
        assert_eq!(result, "Error: missing required argument 'lead_id'");
    }

    #[tokio::test]
    async fn test_search_leads_applies_default_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lead/"))
            .and(query_param("query", "acme"))
            .and(query_param("limit", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let result = registry
            .dispatch("search_leads", &args(&[("query", serde_json::json!("acme"))]))
            .await;
        assert_eq!(result, "No leads found matching that query.");
    }

    #[tokio::test]
    async fn test_create_opportunity_applies_default_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/opportunity/"))
            .and(body_json(serde_json::json!({
                "lead_id": "lead_1",
                "note": "big deal",
                "value": 5000,
                "value_period": "one_time",
                "status": "Active"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "opp_1"})),
            )
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let result = registry
            .dispatch(
                "create_opportunity",
                &args(&[
                    ("lead_id", serde_json::json!("lead_1")),
                    ("note", serde_json::json!("big deal")),
                    ("value", serde_json::json!(5000)),
                ]),
            )
            .await;
        assert_eq!(result, "Opportunity created. ID: opp_1");
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lead/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let registry = registry_for(&server);
        let result = registry
            .dispatch("search_leads", &args(&[("query", serde_json::json!("acme"))]))
            .await;
        assert!(result.starts_with("Error searching leads:"), "{result}");
        assert!(result.contains("boom"));
    }

    #[tokio::test]
    async fn test_every_tool_returns_text_when_crm_unconfigured() {
        // No API key configured: every dispatch must still resolve to a
        // string, never a panic or an error type.
        let registry = ToolRegistry::with_crm_tools(Arc::new(CrmClient::new(CrmConfig::default())));
        let cases: Vec<(&str, ToolArguments)> = vec![
            ("search_leads", args(&[("query", serde_json::json!("a"))])),
            ("get_lead_details", args(&[("lead_id", serde_json::json!("l1"))])),
            (
                "add_lead_note",
                args(&[
                    ("lead_id", serde_json::json!("l1")),
                    ("note_text", serde_json::json!("n")),
                ]),
            ),
            ("create_lead", args(&[("company_name", serde_json::json!("Acme"))])),
            (
                "update_lead_description",
                args(&[
                    ("lead_id", serde_json::json!("l1")),
                    ("description", serde_json::json!("d")),
                ]),
            ),
            (
                "create_opportunity",
                args(&[
                    ("lead_id", serde_json::json!("l1")),
                    ("note", serde_json::json!("n")),
                    ("value", serde_json::json!(1)),
                ]),
            ),
            ("get_lead_notes", args(&[("lead_id", serde_json::json!("l1"))])),
            (
                "update_note",
                args(&[
                    ("note_id", serde_json::json!("n1")),
                    ("new_text", serde_json::json!("t")),
                ]),
            ),
            ("get_opportunities", ToolArguments::new()),
            ("list_leads", ToolArguments::new()),
        ];

        for (name, arguments) in cases {
            let result = registry.dispatch(name, &arguments).await;
            assert!(result.starts_with("Error"), "{name} returned: {result}");
        }
    }
}
