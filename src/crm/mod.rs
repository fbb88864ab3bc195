//! Close.com CRM client.
//!
//! This module wraps the Close.com REST API behind a small set of named
//! operations used by the voice agent's tools. Every operation returns a
//! human-readable text block on success; remote failures are returned as
//! explicit `CrmError` values and rendered into tool output by the caller.
//!
//! # API Reference
//!
//! - Base URL: `https://api.close.com/api/v1`
//! - Auth: HTTP Basic, API key as username with an empty password
//! - Leads: `GET/POST /lead/`, `GET/PUT /lead/{id}/`
//! - Notes: `GET/POST /activity/note/`, `PUT /activity/note/{id}/`
//! - Opportunities: `GET/POST /opportunity/`

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Close.com REST API base URL.
pub const CLOSE_API_BASE_URL: &str = "https://api.close.com/api/v1";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size requested when an opportunity status filter forces
/// client-side filtering.
const STATUS_FILTER_PAGE_SIZE: i64 = 200;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur calling the CRM.
#[derive(Debug, Error)]
pub enum CrmError {
    /// No API key configured
    #[error("CLOSE_API_KEY is not configured")]
    MissingCredentials,

    /// Network or protocol failure
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

// =============================================================================
// Configuration
// =============================================================================

/// CRM client configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Close.com API key
    pub api_key: Option<String>,
    /// REST base URL (overridable for tests)
    pub base_url: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: CLOSE_API_BASE_URL.to_string(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadSummary {
    #[serde(default)]
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    status_label: String,
    #[serde(default)]
    contacts: Vec<ContactSummary>,
    #[serde(default)]
    opportunities: Vec<OpportunitySummary>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactSummary {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpportunitySummary {
    status_label: Option<String>,
    value_formatted: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    status_label: String,
    description: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NoteSummary {
    #[serde(default)]
    id: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    date_created: String,
    user_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpportunityDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status_label: String,
    note: Option<String>,
    value_formatted: Option<String>,
    lead_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Close.com CRM client.
///
/// Cheap to share behind an `Arc`; the inner reqwest client pools
/// connections across all sessions.
pub struct CrmClient {
    config: CrmConfig,
    http: Client,
}

impl CrmClient {
    /// Create a new client. A missing API key is tolerated here and
    /// reported by each operation, so the server can start without CRM
    /// credentials and still relay conversations.
    pub fn new(config: CrmConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn api_key(&self) -> CrmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or(CrmError::MissingCredentials)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> CrmResult<T> {
        let response = self
            .http
            .get(format!("{}{}", self.config.base_url, path))
            .basic_auth(self.api_key()?, None::<&str>)
            .query(params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> CrmResult<T> {
        let response = self
            .http
            .post(format!("{}{}", self.config.base_url, path))
            .basic_auth(self.api_key()?, None::<&str>)
            .json(payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> CrmResult<T> {
        let response = self
            .http
            .put(format!("{}{}", self.config.base_url, path))
            .basic_auth(self.api_key()?, None::<&str>)
            .json(payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> CrmResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Api { status, body });
        }
        Ok(response.json().await?)
    }

    // -------------------------------------------------------------------------
    // Leads
    // -------------------------------------------------------------------------

    /// Search for leads by name or keyword, returning a formatted block
    /// per lead. Only the fields the agent needs are requested, keeping
    /// the context size small.
    pub async fn search_leads(&self, query: &str, limit: i64) -> CrmResult<String> {
        let params = [
            ("query", query.to_string()),
            (
                "_fields",
                "id,display_name,status_label,contacts,opportunities".to_string(),
            ),
            ("limit", limit.to_string()),
        ];
        let page: Page<LeadSummary> = self.get_json("/lead/", &params).await?;

        let results: Vec<String> = page.data.iter().map(format_lead_summary).collect();
        if results.is_empty() {
            return Ok("No leads found matching that query.".to_string());
        }
        Ok(results.join("\n---\n"))
    }

    /// Get full details for a specific lead.
    pub async fn get_lead_details(&self, lead_id: &str) -> CrmResult<String> {
        let lead: LeadDetail = self.get_json(&format!("/lead/{lead_id}/"), &[]).await?;
        Ok(format!(
            "ID: {}\nName: {}\nStatus: {}\nDescription: {}\nURL: {}\n",
            lead.id,
            lead.display_name,
            lead.status_label,
            lead.description.as_deref().unwrap_or("N/A"),
            lead.url.as_deref().unwrap_or("N/A"),
        ))
    }

    /// Create a new lead with an optional contact.
    pub async fn create_lead(
        &self,
        company_name: &str,
        contact_name: Option<&str>,
        email: Option<&str>,
    ) -> CrmResult<String> {
        let mut contacts = Vec::new();
        if contact_name.is_some() || email.is_some() {
            let mut contact = serde_json::Map::new();
            if let Some(name) = contact_name {
                contact.insert("name".to_string(), json!(name));
            }
            if let Some(email) = email {
                contact.insert(
                    "emails".to_string(),
                    json!([{ "email": email, "type": "office" }]),
                );
            }
            contacts.push(serde_json::Value::Object(contact));
        }
        let payload = json!({ "name": company_name, "contacts": contacts });

        let created: Created = self.post_json("/lead/", &payload).await?;
        Ok(format!(
            "Lead created successfully. ID: {}",
            created.id.as_deref().unwrap_or("unknown")
        ))
    }

    /// Update the description/about field of a lead.
    pub async fn update_lead_description(
        &self,
        lead_id: &str,
        description: &str,
    ) -> CrmResult<String> {
        let payload = json!({ "description": description });
        let _: serde_json::Value = self
            .put_json(&format!("/lead/{lead_id}/"), &payload)
            .await?;
        Ok("Lead description updated.".to_string())
    }

    /// List multiple leads, optionally filtered by a query. An empty query
    /// lists everything, newest first.
    pub async fn list_leads(&self, limit: i64, query: &str) -> CrmResult<String> {
        let query = if query.is_empty() { "*" } else { query };
        self.search_leads(query, limit).await
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    /// Add a note to a specific lead.
    pub async fn add_lead_note(&self, lead_id: &str, note_text: &str) -> CrmResult<String> {
        let payload = json!({ "lead_id": lead_id, "note": note_text });
        let _: serde_json::Value = self.post_json("/activity/note/", &payload).await?;
        Ok("Note added successfully to the lead.".to_string())
    }

    /// Get all notes for a specific lead, newest first.
    pub async fn get_lead_notes(&self, lead_id: &str) -> CrmResult<String> {
        let params = [
            ("lead_id", lead_id.to_string()),
            ("_fields", "id,note,date_created,user_name".to_string()),
            ("_order_by", "-date_created".to_string()),
        ];
        let page: Page<NoteSummary> = self.get_json("/activity/note/", &params).await?;

        let results: Vec<String> = page
            .data
            .iter()
            .map(|note| {
                format!(
                    "Note ID: {}\nDate: {}\nAuthor: {}\nContent: {}",
                    note.id,
                    note.date_created,
                    note.user_name.as_deref().unwrap_or("Unknown"),
                    note.note,
                )
            })
            .collect();
        if results.is_empty() {
            return Ok("No notes found for this lead.".to_string());
        }
        Ok(results.join("\n---\n"))
    }

    /// Update the content of a specific note.
    pub async fn update_note(&self, note_id: &str, new_text: &str) -> CrmResult<String> {
        let payload = json!({ "note": new_text });
        let _: serde_json::Value = self
            .put_json(&format!("/activity/note/{note_id}/"), &payload)
            .await?;
        Ok("Note updated successfully.".to_string())
    }

    // -------------------------------------------------------------------------
    // Opportunities
    // -------------------------------------------------------------------------

    /// Create a new opportunity for a lead. `value` is in cents.
    pub async fn create_opportunity(
        &self,
        lead_id: &str,
        note: &str,
        value: i64,
        status: &str,
    ) -> CrmResult<String> {
        let payload = json!({
            "lead_id": lead_id,
            "note": note,
            "value": value,
            "value_period": "one_time",
            "status": status,
        });
        let created: Created = self.post_json("/opportunity/", &payload).await?;
        Ok(format!(
            "Opportunity created. ID: {}",
            created.id.as_deref().unwrap_or("unknown")
        ))
    }

    /// Get a list of opportunities, optionally filtered by status label.
    ///
    /// The status filter is applied client-side with a case-insensitive
    /// substring match; a full page is fetched in that case so enough
    /// candidates are available.
    pub async fn get_opportunities(
        &self,
        limit: i64,
        sort_by: &str,
        status_label: Option<&str>,
    ) -> CrmResult<String> {
        let api_limit = if status_label.is_some() {
            STATUS_FILTER_PAGE_SIZE
        } else {
            limit
        };
        let params = [
            ("_limit", api_limit.to_string()),
            ("_order_by", sort_by.to_string()),
            (
                "_fields",
                "id,note,value,value_formatted,status_label,lead_name".to_string(),
            ),
        ];
        let page: Page<OpportunityDetail> = self.get_json("/opportunity/", &params).await?;

        let mut results = Vec::new();
        for opp in &page.data {
            if let Some(wanted) = status_label
                && !opp
                    .status_label
                    .to_lowercase()
                    .contains(&wanted.to_lowercase())
            {
                continue;
            }
            results.push(format!(
                "Opp ID: {}\nLead: {}\nValue: {}\nStatus: {}\nNote: {}",
                opp.id,
                opp.lead_name.as_deref().unwrap_or("Unknown"),
                opp.value_formatted.as_deref().unwrap_or("$0"),
                opp.status_label,
                opp.note.as_deref().unwrap_or("No details"),
            ));
            if results.len() >= limit as usize {
                break;
            }
        }

        if results.is_empty() {
            return Ok(match status_label {
                Some(label) => format!("No opportunities found matching status '{label}'."),
                None => "No opportunities found.".to_string(),
            });
        }
        debug!(count = results.len(), "formatted opportunities");
        Ok(results.join("\n---\n"))
    }
}

fn format_lead_summary(lead: &LeadSummary) -> String {
    let contact_names: Vec<&str> = lead
        .contacts
        .iter()
        .map(|c| c.display_name.as_deref().unwrap_or("Unknown"))
        .collect();
    let opp_info: Vec<String> = lead
        .opportunities
        .iter()
        .map(|o| {
            format!(
                "{} (${})",
                o.status_label.as_deref().unwrap_or("Unknown"),
                o.value_formatted.as_deref().unwrap_or("0"),
            )
        })
        .collect();
    let opp_info = opp_info.join(", ");

    format!(
        "ID: {}\nName: {}\nStatus: {}\nContacts: {}\nOpportunities: {}",
        lead.id,
        lead.display_name,
        lead.status_label,
        contact_names.join(", "),
        if opp_info.is_empty() {
            "None"
        } else {
            &opp_info
        },
    )
}

// =============================================================================
// Tests
// =============================================================================
