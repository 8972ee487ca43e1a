//! Ticket models for the TDX Web API.
//!
//! [`Ticket`] is what the API returns; [`NewTicket`] and
//! [`CreateTicketOptions`] describe a ticket to create.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{
    deserialize_lenient_bool, deserialize_lenient_f64, deserialize_lenient_i64,
    deserialize_lenient_string, deserialize_lenient_vec, deserialize_tdx_date, Attachment,
};
use crate::config::TicketDefaults;
use crate::error::TdxError;

/// A TDX ticket.
///
/// Only `id` is required. Every other field defaults to `None` and unknown
/// keys are ignored. Known fields tolerate the types TDX actually sends:
/// enum fields such as `Classification` arrive as integers, IDs sometimes as
/// numeric strings. A value that still does not fit its field is read as
/// `None` rather than failing the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ticket {
    /// Ticket ID.
    #[serde(rename = "ID")]
    pub id: i64,

    // Hierarchy and classification
    #[serde(rename = "ParentID", default, deserialize_with = "deserialize_lenient_i64")]
    pub parent_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub parent_title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub parent_class: Option<String>,
    #[serde(rename = "TypeID", default, deserialize_with = "deserialize_lenient_i64")]
    pub type_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub type_name: Option<String>,
    #[serde(rename = "TypeCategoryID", default, deserialize_with = "deserialize_lenient_i64")]
    pub type_category_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub type_category_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub classification_name: Option<String>,
    #[serde(rename = "FormID", default, deserialize_with = "deserialize_lenient_i64")]
    pub form_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub form_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub uri: Option<String>,

    // Account and source
    #[serde(rename = "AccountID", default, deserialize_with = "deserialize_lenient_i64")]
    pub account_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub account_name: Option<String>,
    #[serde(rename = "SourceID", default, deserialize_with = "deserialize_lenient_i64")]
    pub source_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub source_name: Option<String>,

    // Status, impact, urgency, priority
    #[serde(rename = "StatusID", default, deserialize_with = "deserialize_lenient_i64")]
    pub status_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub status_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub status_class: Option<String>,
    #[serde(rename = "ImpactID", default, deserialize_with = "deserialize_lenient_i64")]
    pub impact_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub impact_name: Option<String>,
    #[serde(rename = "UrgencyID", default, deserialize_with = "deserialize_lenient_i64")]
    pub urgency_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub urgency_name: Option<String>,
    #[serde(rename = "PriorityID", default, deserialize_with = "deserialize_lenient_i64")]
    pub priority_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub priority_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub priority_order: Option<f64>,

    // SLA
    #[serde(rename = "SlaID", default, deserialize_with = "deserialize_lenient_i64")]
    pub sla_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub sla_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_sla_violated: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_sla_respond_by_violated: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_sla_resolve_by_violated: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub respond_by_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub resolve_by_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub sla_begin_date: Option<DateTime<Utc>>,

    // Hold
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_on_hold: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub placed_on_hold_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub goes_off_hold_date: Option<DateTime<Utc>>,

    // Created / modified
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub modified_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub modified_full_name: Option<String>,

    // Requestor
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_first_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub requestor_uid: Option<String>,

    // Time tracking
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub actual_minutes: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub estimated_minutes: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub days_old: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub end_date: Option<DateTime<Utc>>,

    // Responsibility
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responsible_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responsible_full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responsible_email: Option<String>,
    #[serde(rename = "ResponsibleGroupID", default, deserialize_with = "deserialize_lenient_i64")]
    pub responsible_group_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responsible_group_name: Option<String>,

    // Responded / completed
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub responded_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responded_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub responded_full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub completed_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub completed_full_name: Option<String>,

    // Reviewer
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub reviewer_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub reviewer_full_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub reviewer_email: Option<String>,
    #[serde(rename = "ReviewingGroupID", default, deserialize_with = "deserialize_lenient_i64")]
    pub reviewing_group_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub reviewing_group_name: Option<String>,

    // Budgets
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub time_budget: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub expenses_budget: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub time_budget_used: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub expenses_budget_used: Option<f64>,

    // Task conversion
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_converted_to_task: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub converted_to_task_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub converted_to_task_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub converted_to_task_full_name: Option<String>,
    #[serde(rename = "TaskProjectID", default, deserialize_with = "deserialize_lenient_i64")]
    pub task_project_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub task_project_name: Option<String>,
    #[serde(rename = "TaskPlanID", default, deserialize_with = "deserialize_lenient_i64")]
    pub task_plan_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub task_plan_name: Option<String>,
    #[serde(rename = "TaskID", default, deserialize_with = "deserialize_lenient_i64")]
    pub task_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub task_title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub task_start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub task_end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub task_percent_complete: Option<i64>,

    // Opportunity, location, service, article
    #[serde(rename = "OpportunityID", default, deserialize_with = "deserialize_lenient_i64")]
    pub opportunity_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub opportunity_name: Option<String>,
    #[serde(rename = "LocationID", default, deserialize_with = "deserialize_lenient_i64")]
    pub location_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub location_name: Option<String>,
    #[serde(rename = "LocationRoomID", default, deserialize_with = "deserialize_lenient_i64")]
    pub location_room_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub location_room_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub ref_code: Option<String>,
    #[serde(rename = "ServiceID", default, deserialize_with = "deserialize_lenient_i64")]
    pub service_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub service_name: Option<String>,
    #[serde(rename = "ServiceCategoryID", default, deserialize_with = "deserialize_lenient_i64")]
    pub service_category_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub service_category_name: Option<String>,
    #[serde(rename = "ArticleID", default, deserialize_with = "deserialize_lenient_i64")]
    pub article_id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub article_subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub article_status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub article_category_path_names: Option<String>,

    /// Ticketing application the ticket belongs to.
    #[serde(rename = "AppID", default, deserialize_with = "deserialize_lenient_i64")]
    pub app_id: Option<i64>,

    // Collections
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub attributes: Option<Vec<CustomAttribute>>,
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub tasks: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub notify: Option<Vec<serde_json::Value>>,
}

impl Ticket {
    /// Returns the title if present, otherwise a placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Returns the status name if present, otherwise the status ID.
    pub fn display_status(&self) -> String {
        match (&self.status_name, self.status_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "Unknown".to_string(),
        }
    }
}

/// A custom attribute value on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomAttribute {
    /// Attribute ID.
    #[serde(rename = "ID")]
    pub id: i64,

    /// Raw value; choice attributes carry the choice ID here.
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Display text of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
}

impl CustomAttribute {
    /// Creates an attribute assignment for a new or edited ticket.
    pub fn new(id: i64, value: impl Into<String>) -> Self {
        Self {
            id,
            value: Some(value.into()),
            name: None,
            value_text: None,
        }
    }
}

/// Body keys written by the typed fields of [`NewTicket`].
const NEW_TICKET_FIELDS: [&str; 13] = [
    "TypeID",
    "Title",
    "AccountID",
    "StatusID",
    "PriorityID",
    "RequestorUid",
    "Description",
    "ServiceID",
    "SourceID",
    "ResponsibleGroupID",
    "Classification",
    "Attributes",
    "Notify",
];

/// A ticket to create.
///
/// Absent optional fields are omitted from the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewTicket {
    #[serde(rename = "TypeID")]
    pub type_id: i64,
    pub title: String,
    #[serde(rename = "AccountID")]
    pub account_id: i64,
    #[serde(rename = "StatusID")]
    pub status_id: i64,
    #[serde(rename = "PriorityID")]
    pub priority_id: i64,
    pub requestor_uid: String,
    pub description: String,

    #[serde(rename = "ServiceID", skip_serializing_if = "Option::is_none")]
    pub service_id: Option<i64>,
    #[serde(rename = "SourceID", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(rename = "ResponsibleGroupID", skip_serializing_if = "Option::is_none")]
    pub responsible_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<CustomAttribute>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<Vec<serde_json::Value>>,

    /// Additional named fields, e.g. `RequestorEmail`. Never holds nulls.
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl NewTicket {
    /// Creates a ticket with the fields TDX requires.
    pub fn new(
        type_id: i64,
        title: impl Into<String>,
        account_id: i64,
        status_id: i64,
        priority_id: i64,
        requestor_uid: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            type_id,
            title: title.into(),
            account_id,
            status_id,
            priority_id,
            requestor_uid: requestor_uid.into(),
            description: description.into(),
            service_id: None,
            source_id: None,
            responsible_group_id: None,
            classification: None,
            attributes: None,
            notify: None,
            extra: BTreeMap::new(),
        }
    }

    /// Creates a ticket from configured defaults.
    ///
    /// Fills source and responsible group, and sends `RequestorEmail` when
    /// one is configured.
    pub fn from_defaults(
        defaults: &TicketDefaults,
        title: impl Into<String>,
        description: impl Into<String>,
        status_id: i64,
    ) -> Self {
        let ticket = Self::new(
            defaults.type_id,
            title,
            defaults.account_id,
            status_id,
            defaults.priority_id,
            defaults.requestor_uid.clone(),
            description,
        )
        .with_source(defaults.source_id)
        .with_responsible_group(defaults.responsible_group_id);

        match defaults.requestor_email {
            Some(ref email) => ticket.with_field("RequestorEmail", email.as_str()),
            None => ticket,
        }
    }

    pub fn with_service(mut self, service_id: i64) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn with_source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_responsible_group(mut self, group_id: i64) -> Self {
        self.responsible_group_id = Some(group_id);
        self
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<CustomAttribute>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_notify(mut self, notify: Vec<serde_json::Value>) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Adds an additional named field. Null values are dropped.
    ///
    /// Names of the typed fields (`Title`, `StatusID`, ...) are rejected by
    /// [`NewTicket::validate`]; use the typed setters for those.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        let name = name.into();
        if value.is_null() {
            self.extra.remove(&name);
        } else {
            self.extra.insert(name, value);
        }
        self
    }

    /// Additional named fields in key order.
    pub fn extra_fields(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extra
    }

    /// Checks the fields TDX rejects without a useful message.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Validation` for a blank title or requestor UID, or
    /// for an extra field that shadows a typed one.
    pub fn validate(&self) -> Result<(), TdxError> {
        if self.title.trim().is_empty() {
            return Err(TdxError::validation("ticket title must not be empty"));
        }
        if self.requestor_uid.trim().is_empty() {
            return Err(TdxError::validation("requestor UID must not be empty"));
        }
        if let Some(name) = self
            .extra
            .keys()
            .find(|name| NEW_TICKET_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(name)))
        {
            return Err(TdxError::validation(format!(
                "extra field {} duplicates a ticket field",
                name
            )));
        }
        Ok(())
    }
}

/// Notification and defaulting flags for ticket creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTicketOptions {
    pub enable_notify_reviewer: bool,
    pub notify_requestor: bool,
    pub notify_responsible: bool,
    pub allow_requestor_creation: bool,
    pub apply_defaults: bool,
}

impl Default for CreateTicketOptions {
    fn default() -> Self {
        Self {
            enable_notify_reviewer: false,
            notify_requestor: true,
            notify_responsible: true,
            allow_requestor_creation: true,
            apply_defaults: true,
        }
    }
}

impl CreateTicketOptions {
    /// Query parameters sent with the create call.
    pub fn query_pairs(&self) -> [(&'static str, bool); 5] {
        [
            ("EnableNotifyReviewer", self.enable_notify_reviewer),
            ("NotifyRequestor", self.notify_requestor),
            ("NotifyResponsible", self.notify_responsible),
            ("AllowRequestorCreation", self.allow_requestor_creation),
            ("ApplyDefaults", self.apply_defaults),
        ]
    }
}
