//! Ticket rows, access context and the serialized ticket record

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Kind of entity a ticket is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssigneeType {
    User,
    Team,
    Department,
    Company,
}

impl AssigneeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssigneeType::User => "user",
            AssigneeType::Team => "team",
            AssigneeType::Department => "department",
            AssigneeType::Company => "company",
        }
    }
}

impl std::str::FromStr for AssigneeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(AssigneeType::User),
            "team" => Ok(AssigneeType::Team),
            "department" => Ok(AssigneeType::Department),
            "company" => Ok(AssigneeType::Company),
            _ => Err(format!("Invalid assignee type: {}", s)),
        }
    }
}

/// Assignment edge between a ticket and a user, team, department or company
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketAssignee {
    pub ticket_id: i32,
    pub assignee_type: AssigneeType,
    pub assignee_id: i32,
}

/// Who is asking, as seen by the ticket access rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketAccessContext {
    pub user_id: i32,
    pub department_id: Option<i32>,
    pub company_id: Option<i32>,
    pub team_ids: Vec<i32>,
    /// Users below this one in the reporting hierarchy
    pub reporting_user_ids: Vec<i32>,
}

/// Ticket search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct TicketSearchQuery {
    /// Substring of the ticket code
    pub ticket_id: Option<String>,
    /// Substring of requested email, to or cc recipients
    pub email: Option<String>,
    pub status_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub title: Option<String>,
    pub tags: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub from_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub to_date: Option<String>,
    pub contact_id: Option<i32>,
    pub contact_type_id: Option<i32>,
    pub segmentations_id: Option<i32>,
}

/// Ticket joined with its mandatory and optional lookups
#[derive(Debug, Clone, Default, FromRow)]
pub struct TicketRow {
    pub id: i32,
    pub ticket_code: Option<String>,
    pub parent_id: Option<i32>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub requested_email: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone_no: Option<String>,
    pub contact_ref_no: Option<String>,
    pub reminder_flag: Option<bool>,
    pub reminder_datetime: Option<DateTime<Utc>>,
    pub schedule_at: Option<DateTime<Utc>>,
    pub auto_reminder: Option<bool>,
    pub reminder_time: Option<String>,
    pub response_time: Option<NaiveTime>,
    pub resolution_time: Option<NaiveTime>,
    /// JSON list of notification type ids, or a bare id
    pub notification_type_id: Option<String>,
    /// JSON list
    pub to_recipients: Option<String>,
    /// JSON list
    pub cc_recipients: Option<String>,
    /// JSON object
    pub meta_data: Option<String>,
    pub tags: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub contact_id: Option<i32>,
    pub assigned_to_id: Option<i32>,
    pub created_by_id: Option<i32>,
    pub assigned_by_id: Option<i32>,
    pub company_department_id: i32,
    pub ticket_status_id: i32,
    pub priority_id: i32,
    pub ticket_source_id: Option<i32>,
    pub purpose_type_id: Option<i32>,
    pub sla_id: Option<i32>,

    pub contact_db_name: Option<String>,
    pub contact_avatar: Option<String>,
    pub contact_type_id: Option<i32>,
    pub segmentations_id: Option<i32>,
    pub priority_name: Option<String>,
    pub status_slug: Option<String>,
    pub company_department_label: Option<String>,
    pub department_name: Option<String>,
    pub source_name: Option<String>,
    pub purpose_name: Option<String>,
    pub purpose_label: Option<String>,
    pub purpose_parent_id: Option<i32>,
    pub purpose_status: Option<i16>,
    pub parent_purpose_name: Option<String>,
    pub parent_purpose_label: Option<String>,
    pub sla_name: Option<String>,
    pub sla_response_time: Option<i32>,
    pub sla_resolution_time: Option<i32>,
    pub assigned_to_name: Option<String>,
    pub created_by_name: Option<String>,
    pub assigned_by_name: Option<String>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct ContactPhoneRow {
    pub contact_id: i32,
    pub phone_number: String,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct TicketAssigneeRow {
    pub ticket_id: i32,
    pub assignee_type: String,
    pub assignee_id: i32,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_picture: Option<String>,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct AttachmentRow {
    pub ticket_id: i32,
    pub id: i32,
    pub file_url: String,
    pub uploaded_by: Option<i32>,
}

/// Related data batch-fetched for a page of tickets
#[derive(Debug, Clone, Default)]
pub struct TicketRelations {
    /// Keyed by contact id
    pub phone_numbers: HashMap<i32, Vec<ContactPhoneRow>>,
    /// Keyed by ticket id
    pub assignees: HashMap<i32, Vec<TicketAssigneeRow>>,
    /// Keyed by ticket id
    pub attachments: HashMap<i32, Vec<AttachmentRow>>,
    /// Keyed by ticket id
    pub replies_count: HashMap<i32, i64>,
    /// Notification type id to name
    pub notification_types: HashMap<i32, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TicketStatusRef {
    pub id: i32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SlaInfo {
    pub name: Option<String>,
    pub response_time: Option<i32>,
    pub resolution_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PurposeInfo {
    pub id: Option<i32>,
    pub name: String,
    pub label: String,
    pub status: Option<i16>,
    pub full_name: String,
    pub parent_id: Option<i32>,
    pub parent_name: String,
    pub parent_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttachmentInfo {
    pub id: i32,
    pub file_url: String,
    pub uploaded_by: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssigneeUser {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub teams: Vec<i32>,
}

/// Flat presentation record of a ticket
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TicketRecord {
    pub id: i32,
    /// Business ticket code
    pub ticket_id: Option<String>,
    pub parent_id: Option<i32>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub requested_email: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone_no: Option<String>,
    pub avatar: Option<String>,
    pub company_department_id: i32,
    pub company_department_name: Option<String>,
    pub department_name: Option<String>,
    pub ticket_status: TicketStatusRef,
    pub ticket_source: Option<String>,
    pub priority: Option<String>,
    pub assigned_to_id: Option<i32>,
    pub assigned_to: Option<String>,
    pub created_by_id: Option<i32>,
    pub created_by: Option<String>,
    pub assigned_by_id: Option<i32>,
    pub assigned_by: Option<String>,
    pub sla: SlaInfo,
    /// `HH:MM:SS`
    pub response_time: Option<String>,
    /// `HH:MM:SS`
    pub resolution_time: Option<String>,
    pub notification_types: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub to_recipients: Vec<serde_json::Value>,
    #[schema(value_type = Vec<Object>)]
    pub cc_recipients: Vec<serde_json::Value>,
    pub contact_ref_no: Option<String>,
    pub reminder_flag: Option<bool>,
    pub reminder_datetime: Option<DateTime<Utc>>,
    pub schedule_at: Option<DateTime<Utc>>,
    pub auto_reminder: bool,
    pub reminder_time: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub attachments: Vec<AttachmentInfo>,
    pub purpose: Option<PurposeInfo>,
    #[schema(value_type = Object)]
    pub meta_data: serde_json::Map<String, serde_json::Value>,
    pub replies_count: i64,
    pub assignee_users: Vec<AssigneeUser>,
}
