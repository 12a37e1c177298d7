//! Tickets repository: access context, accessible ids and snapshot search

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::ticket::{
        AttachmentRow, ContactPhoneRow, TicketAccessContext, TicketAssigneeRow, TicketRelations,
        TicketRow,
    },
    tickets::{AccessSource, TicketFilter},
};

/// Read access to tickets for the resolver
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Memberships and reporting hierarchy of a user
    async fn access_context(&self, user_id: i32) -> AppResult<TicketAccessContext>;

    /// Ticket ids made visible by one access source
    async fn ticket_ids_for(&self, source: &AccessSource) -> AppResult<Vec<i32>>;

    /// Matching tickets and their related data, read from one snapshot
    async fn search(&self, filter: &TicketFilter) -> AppResult<(Vec<TicketRow>, TicketRelations)>;
}

const TICKET_SELECT: &str = r#"
SELECT
    t.id, t.ticket_id AS ticket_code, t.parent_id, t.title, t.message, t.requested_email,
    t.contact_name, t.contact_phone_no, t.contact_ref_no,
    t.reminder_flag, t.reminder_datetime, t.schedule_at, t.auto_reminder, t.reminder_time,
    t.response_time, t.resolution_time,
    t.notification_type_id, t.to_recipients, t.cc_recipients, t.meta_data, t.tags,
    t.is_deleted, t.created_at, t.updated_at,
    t.contact_id, t.assigned_to_id, t.created_by_id, t.assigned_by_id,
    t.company_department_id, t.ticket_status_id, t.priority_id,
    t.ticket_source_id, t.purpose_type_id, t.sla_id,
    c.name AS contact_db_name, c.picture_url AS contact_avatar,
    c.contact_type_id, c.segmentations_id,
    p.name AS priority_name,
    s.slug AS status_slug,
    cd.label AS company_department_label,
    d.name AS department_name,
    src.name AS source_name,
    pu.name AS purpose_name, pu.label AS purpose_label,
    pu.parent_id AS purpose_parent_id, pu.status AS purpose_status,
    ppu.name AS parent_purpose_name, ppu.label AS parent_purpose_label,
    sla.name AS sla_name, sla.response_time AS sla_response_time,
    sla.resolution_time AS sla_resolution_time,
    COALESCE(au.full_name, au.username) AS assigned_to_name,
    COALESCE(cu.full_name, cu.username) AS created_by_name,
    COALESCE(bu.full_name, bu.username) AS assigned_by_name
FROM tickets t
JOIN priorities p ON p.id = t.priority_id
JOIN ticket_statuses_by_dept s ON s.id = t.ticket_status_id
JOIN company_departments cd ON cd.id = t.company_department_id
LEFT JOIN contacts c ON c.id = t.contact_id
LEFT JOIN departments d ON d.id = cd.department_id
LEFT JOIN ticket_sources src ON src.id = t.ticket_source_id
LEFT JOIN purposes pu ON pu.id = t.purpose_type_id
LEFT JOIN purposes ppu ON ppu.id = pu.parent_id
LEFT JOIN sla_configurations sla ON sla.id = t.sla_id
LEFT JOIN users au ON au.id = t.assigned_to_id
LEFT JOIN users cu ON cu.id = t.created_by_id
LEFT JOIN users bu ON bu.id = t.assigned_by_id
"#;

#[derive(Clone)]
pub struct TicketsRepository {
    pool: Pool<Postgres>,
}

impl TicketsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_relations(
        conn: &mut PgConnection,
        ticket_ids: &[i32],
    ) -> AppResult<TicketRelations> {
        let mut relations = TicketRelations::default();
        if ticket_ids.is_empty() {
            return Ok(relations);
        }

        let phones = sqlx::query_as::<_, ContactPhoneRow>(
            r#"
            SELECT contact_id, phone_number, is_preferred
            FROM contacts_phone_numbers
            WHERE contact_id IN (
                SELECT contact_id FROM tickets
                WHERE id = ANY($1) AND contact_id IS NOT NULL
            )
            ORDER BY id
            "#,
        )
        .bind(ticket_ids)
        .fetch_all(&mut *conn)
        .await?;
        for phone in phones {
            relations.phone_numbers.entry(phone.contact_id).or_default().push(phone);
        }

        let assignees = sqlx::query_as::<_, TicketAssigneeRow>(
            r#"
            SELECT ta.ticket_id, ta.assignee_type, ta.assignee_id,
                   COALESCE(u.full_name, u.username) AS user_name,
                   u.email AS user_email, u.avatar_url AS user_picture
            FROM ticket_assignees ta
            LEFT JOIN users u ON ta.assignee_type = 'user' AND u.id = ta.assignee_id
            WHERE ta.ticket_id = ANY($1)
            ORDER BY ta.id
            "#,
        )
        .bind(ticket_ids)
        .fetch_all(&mut *conn)
        .await?;
        for assignee in assignees {
            relations.assignees.entry(assignee.ticket_id).or_default().push(assignee);
        }

        let attachments = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT ticket_id, id, file_url, uploaded_by
            FROM ticket_attachments
            WHERE ticket_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ticket_ids)
        .fetch_all(&mut *conn)
        .await?;
        for attachment in attachments {
            relations.attachments.entry(attachment.ticket_id).or_default().push(attachment);
        }

        let replies: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT ticket_id, COUNT(*)
            FROM ticket_replies
            WHERE ticket_id = ANY($1)
            GROUP BY ticket_id
            "#,
        )
        .bind(ticket_ids)
        .fetch_all(&mut *conn)
        .await?;
        relations.replies_count = replies.into_iter().collect();

        let notification_types: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, name FROM notification_types")
                .fetch_all(&mut *conn)
                .await?;
        relations.notification_types = notification_types.into_iter().collect::<HashMap<_, _>>();

        Ok(relations)
    }
}

#[async_trait]
impl TicketStore for TicketsRepository {
    async fn access_context(&self, user_id: i32) -> AppResult<TicketAccessContext> {
        let (department_id, company_id): (Option<i32>, Option<i32>) = sqlx::query_as(
            "SELECT company_department_id, company_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

        let team_ids = sqlx::query_scalar::<_, i32>(
            "SELECT team_id FROM team_users WHERE user_id = $1 ORDER BY team_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let reporting_user_ids = sqlx::query_scalar::<_, i32>(
            r#"
            WITH RECURSIVE reports AS (
                SELECT id FROM users WHERE manager_id = $1
                UNION
                SELECT u.id FROM users u JOIN reports r ON u.manager_id = r.id
            )
            SELECT id FROM reports WHERE id <> $1 ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TicketAccessContext {
            user_id,
            department_id,
            company_id,
            team_ids,
            reporting_user_ids,
        })
    }

    async fn ticket_ids_for(&self, source: &AccessSource) -> AppResult<Vec<i32>> {
        let ids = match source {
            AccessSource::CreatedOrAssigned(user_id) => {
                sqlx::query_scalar::<_, i32>(
                    r#"
                    SELECT id FROM tickets
                    WHERE (created_by_id = $1 OR assigned_to_id = $1) AND is_deleted = FALSE
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            edge_source => {
                let Some((assignee_type, assignee_ids)) = edge_source.assignee_filter() else {
                    return Ok(Vec::new());
                };
                sqlx::query_scalar::<_, i32>(
                    r#"
                    SELECT DISTINCT ta.ticket_id
                    FROM ticket_assignees ta
                    JOIN tickets t ON t.id = ta.ticket_id
                    WHERE t.is_deleted = FALSE
                      AND ta.assignee_type = $1
                      AND ta.assignee_id = ANY($2)
                    "#,
                )
                .bind(assignee_type.as_str())
                .bind(assignee_ids)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(ids)
    }

    async fn search(&self, filter: &TicketFilter) -> AppResult<(Vec<TicketRow>, TicketRelations)> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(TICKET_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY t.parent_id ASC NULLS FIRST, t.created_at DESC");

        let rows = qb.build_query_as::<TicketRow>().fetch_all(&mut *tx).await?;

        let ticket_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let relations = Self::fetch_relations(&mut *tx, &ticket_ids).await?;

        tx.commit().await?;

        tracing::debug!(count = rows.len(), "Ticket search completed");
        Ok((rows, relations))
    }
}
