//! Flattening of joined ticket rows into presentation records

use serde_json::{Map, Value};

use crate::models::ticket::{
    AssigneeType, AssigneeUser, AttachmentInfo, PurposeInfo, SlaInfo, TicketRecord, TicketRelations,
    TicketRow, TicketStatusRef,
};

use super::decode::{parse_notification_ids, parse_or_default};

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Preferred phone of the contact, else its first phone, else the phone
/// typed on the ticket
fn contact_phone(row: &TicketRow, relations: &TicketRelations) -> Option<String> {
    let phones = row
        .contact_id
        .and_then(|id| relations.phone_numbers.get(&id))
        .filter(|phones| !phones.is_empty());

    match phones {
        Some(phones) => phones
            .iter()
            .find(|p| p.is_preferred)
            .or_else(|| phones.first())
            .map(|p| p.phone_number.clone()),
        None => row.contact_phone_no.clone(),
    }
}

fn assignee_users(row: &TicketRow, relations: &TicketRelations) -> Vec<AssigneeUser> {
    let user_type = AssigneeType::User.as_str();
    relations
        .assignees
        .get(&row.id)
        .map(|assignees| {
            assignees
                .iter()
                .filter(|a| a.assignee_type == user_type)
                .filter_map(|a| {
                    let name = present(&a.user_name)?;
                    Some(AssigneeUser {
                        id: a.assignee_id,
                        name: name.to_string(),
                        email: a.user_email.clone(),
                        avatar: a.user_picture.clone(),
                        teams: Vec::new(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn purpose(row: &TicketRow) -> Option<PurposeInfo> {
    let name = present(&row.purpose_name)?;
    let parent_name = present(&row.parent_purpose_name).map(str::trim);

    Some(PurposeInfo {
        id: row.purpose_type_id,
        name: name.trim().to_string(),
        label: row.purpose_label.clone().unwrap_or_default(),
        status: row.purpose_status,
        full_name: match parent_name {
            Some(parent) => format!("{} - {}", name.trim(), parent),
            None => name.to_string(),
        },
        parent_id: row.purpose_parent_id,
        parent_name: parent_name.unwrap_or_default().to_string(),
        parent_label: row
            .parent_purpose_label
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    })
}

fn attachments(row: &TicketRow, relations: &TicketRelations) -> Vec<AttachmentInfo> {
    relations
        .attachments
        .get(&row.id)
        .map(|list| {
            list.iter()
                .map(|a| AttachmentInfo {
                    id: a.id,
                    file_url: a.file_url.clone(),
                    uploaded_by: a.uploaded_by,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn serialize_ticket(row: &TicketRow, relations: &TicketRelations) -> TicketRecord {
    let notification_types = parse_notification_ids(row.notification_type_id.as_deref(), row.id)
        .into_iter()
        .filter_map(|id| relations.notification_types.get(&id).cloned())
        .collect();

    let to_recipients: Vec<Value> = parse_or_default(row.to_recipients.as_deref(), row.id, "to_recipients");
    let cc_recipients: Vec<Value> = parse_or_default(row.cc_recipients.as_deref(), row.id, "cc_recipients");
    let meta_data: Map<String, Value> = parse_or_default(row.meta_data.as_deref(), row.id, "meta_data");

    TicketRecord {
        id: row.id,
        ticket_id: row.ticket_code.clone(),
        parent_id: row.parent_id,
        title: row.title.clone(),
        message: row.message.clone(),
        requested_email: row.requested_email.clone(),
        contact_name: present(&row.contact_db_name)
            .or(row.contact_name.as_deref())
            .map(str::to_string),
        contact_phone_no: contact_phone(row, relations),
        avatar: row.contact_avatar.clone(),
        company_department_id: row.company_department_id,
        company_department_name: row.company_department_label.clone(),
        department_name: row.department_name.clone(),
        ticket_status: TicketStatusRef {
            id: row.ticket_status_id,
            name: row.status_slug.clone(),
        },
        ticket_source: row.source_name.clone(),
        priority: row.priority_name.clone(),
        assigned_to_id: row.assigned_to_id,
        assigned_to: row.assigned_to_name.clone(),
        created_by_id: row.created_by_id,
        created_by: row.created_by_name.clone(),
        assigned_by_id: row.assigned_by_id,
        assigned_by: row.assigned_by_name.clone(),
        sla: SlaInfo {
            name: row.sla_name.clone(),
            response_time: row.sla_response_time,
            resolution_time: row.sla_resolution_time,
        },
        response_time: row.response_time.map(|t| t.format("%H:%M:%S").to_string()),
        resolution_time: row.resolution_time.map(|t| t.format("%H:%M:%S").to_string()),
        notification_types,
        to_recipients,
        cc_recipients,
        contact_ref_no: row.contact_ref_no.clone(),
        reminder_flag: row.reminder_flag,
        reminder_datetime: row.reminder_datetime,
        schedule_at: row.schedule_at,
        auto_reminder: row.auto_reminder.unwrap_or(false),
        reminder_time: row.reminder_time.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
        attachments: attachments(row, relations),
        purpose: purpose(row),
        meta_data,
        replies_count: relations.replies_count.get(&row.id).copied().unwrap_or(0),
        assignee_users: assignee_users(row, relations),
    }
}
