//! Ticket search predicates.
//!
//! A [`TicketFilter`] is a conjunction of [`Predicate`]s. It renders into a
//! parameterized SQL `WHERE` clause for the Postgres store and evaluates
//! against a [`TicketRow`] for in-memory stores, with the same semantics.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::ticket::{TicketRow, TicketSearchQuery};

/// What the caller is allowed to see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessScope {
    pub accessible_ticket_ids: Vec<i32>,
    pub reporting_user_ids: Vec<i32>,
}

impl AccessScope {
    pub fn new(accessible: &HashSet<i32>, reporting_user_ids: &[i32]) -> Self {
        let mut accessible_ticket_ids: Vec<i32> = accessible.iter().copied().collect();
        accessible_ticket_ids.sort_unstable();
        Self {
            accessible_ticket_ids,
            reporting_user_ids: reporting_user_ids.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accessible_ticket_ids.is_empty() && self.reporting_user_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    NotDeleted,
    /// Id in the accessible set OR assignee in the reporting hierarchy.
    /// Empty arms are left out.
    Access {
        ticket_ids: Vec<i32>,
        reporting_user_ids: Vec<i32>,
    },
    DenyAll,
    TicketCodeContains(String),
    TitleContains(String),
    StatusIs(i32),
    PriorityIs(i32),
    ContactIs(i32),
    TagsContain(String),
    /// Requested email, to recipients or cc recipients
    EmailContains(String),
    CreatedFrom(DateTime<Utc>),
    CreatedUntil(DateTime<Utc>),
    HasContact,
    ContactTypeIs(i32),
    SegmentationIs(i32),
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

impl Predicate {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::NotDeleted => {
                qb.push("t.is_deleted = FALSE");
            }
            Predicate::Access {
                ticket_ids,
                reporting_user_ids,
            } if ticket_ids.is_empty() && reporting_user_ids.is_empty() => {
                qb.push("FALSE");
            }
            Predicate::Access {
                ticket_ids,
                reporting_user_ids,
            } => {
                qb.push("(");
                let mut arms = qb.separated(" OR ");
                if !ticket_ids.is_empty() {
                    arms.push("t.id = ANY(");
                    arms.push_bind_unseparated(ticket_ids.clone());
                    arms.push_unseparated(")");
                }
                if !reporting_user_ids.is_empty() {
                    arms.push("t.assigned_to_id = ANY(");
                    arms.push_bind_unseparated(reporting_user_ids.clone());
                    arms.push_unseparated(")");
                }
                qb.push(")");
            }
            Predicate::DenyAll => {
                qb.push("FALSE");
            }
            Predicate::TicketCodeContains(term) => {
                qb.push("t.ticket_id ILIKE ").push_bind(escape_like(term));
            }
            Predicate::TitleContains(term) => {
                qb.push("t.title ILIKE ").push_bind(escape_like(term));
            }
            Predicate::StatusIs(id) => {
                qb.push("t.ticket_status_id = ").push_bind(*id);
            }
            Predicate::PriorityIs(id) => {
                qb.push("t.priority_id = ").push_bind(*id);
            }
            Predicate::ContactIs(id) => {
                qb.push("t.contact_id = ").push_bind(*id);
            }
            Predicate::TagsContain(term) => {
                qb.push("t.tags ILIKE ").push_bind(escape_like(term));
            }
            Predicate::EmailContains(term) => {
                let pattern = escape_like(term);
                qb.push("(t.requested_email ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR t.to_recipients ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR t.cc_recipients ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            Predicate::CreatedFrom(at) => {
                qb.push("t.created_at >= ").push_bind(*at);
            }
            Predicate::CreatedUntil(at) => {
                qb.push("t.created_at <= ").push_bind(*at);
            }
            Predicate::HasContact => {
                qb.push("t.contact_id IS NOT NULL");
            }
            Predicate::ContactTypeIs(id) => {
                qb.push("c.contact_type_id = ").push_bind(*id);
            }
            Predicate::SegmentationIs(id) => {
                qb.push("c.segmentations_id = ").push_bind(*id);
            }
        }
    }

    fn matches(&self, row: &TicketRow) -> bool {
        match self {
            Predicate::NotDeleted => !row.is_deleted,
            Predicate::Access {
                ticket_ids,
                reporting_user_ids,
            } => {
                ticket_ids.contains(&row.id)
                    || row
                        .assigned_to_id
                        .map(|id| reporting_user_ids.contains(&id))
                        .unwrap_or(false)
            }
            Predicate::DenyAll => false,
            Predicate::TicketCodeContains(term) => contains_ci(row.ticket_code.as_deref(), term),
            Predicate::TitleContains(term) => contains_ci(row.title.as_deref(), term),
            Predicate::StatusIs(id) => row.ticket_status_id == *id,
            Predicate::PriorityIs(id) => row.priority_id == *id,
            Predicate::ContactIs(id) => row.contact_id == Some(*id),
            Predicate::TagsContain(term) => contains_ci(row.tags.as_deref(), term),
            Predicate::EmailContains(term) => {
                contains_ci(row.requested_email.as_deref(), term)
                    || contains_ci(row.to_recipients.as_deref(), term)
                    || contains_ci(row.cc_recipients.as_deref(), term)
            }
            Predicate::CreatedFrom(at) => row.created_at.map(|c| c >= *at).unwrap_or(false),
            Predicate::CreatedUntil(at) => row.created_at.map(|c| c <= *at).unwrap_or(false),
            Predicate::HasContact => row.contact_id.is_some(),
            Predicate::ContactTypeIs(id) => row.contact_type_id == Some(*id),
            Predicate::SegmentationIs(id) => row.segmentations_id == Some(*id),
        }
    }
}

/// Conjunction of predicates; always contains [`Predicate::NotDeleted`]
#[derive(Debug, Clone, PartialEq)]
pub struct TicketFilter {
    predicates: Vec<Predicate>,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self {
            predicates: vec![Predicate::NotDeleted],
        }
    }
}

impl TicketFilter {
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Append ` WHERE p1 AND p2 ...` to the query
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            predicate.push_sql(qb);
        }
    }

    pub fn matches(&self, row: &TicketRow) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_day(raw: &str, bound: &'static str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(day) => Some(day),
        Err(e) => {
            tracing::debug!(bound, raw, error = %e, "Ignoring unparseable date filter");
            None
        }
    }
}

fn start_of_day(raw: &str) -> Option<DateTime<Utc>> {
    let day = parse_day(raw, "from_date")?;
    day.and_hms_opt(0, 0, 0).map(|at| Utc.from_utc_datetime(&at))
}

fn end_of_day(raw: &str) -> Option<DateTime<Utc>> {
    let day = parse_day(raw, "to_date")?;
    day.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|at| Utc.from_utc_datetime(&at))
}

fn access_predicate(scope: &AccessScope, restrict_when_empty: bool) -> Option<Predicate> {
    if !scope.is_empty() {
        return Some(Predicate::Access {
            ticket_ids: scope.accessible_ticket_ids.clone(),
            reporting_user_ids: scope.reporting_user_ids.clone(),
        });
    }
    if restrict_when_empty {
        Some(Predicate::DenyAll)
    } else {
        tracing::warn!("No accessible tickets or reports, search is not restricted by access");
        None
    }
}

/// Build the search filter: not-deleted, then access, then every criterion
/// present in the query. Unparseable dates are skipped.
pub fn build_search_filters(
    query: &TicketSearchQuery,
    scope: &AccessScope,
    restrict_when_empty: bool,
) -> TicketFilter {
    let needs_contact = query.contact_type_id.is_some() || query.segmentations_id.is_some();

    let optional = [
        access_predicate(scope, restrict_when_empty),
        non_blank(&query.ticket_id).map(Predicate::TicketCodeContains),
        non_blank(&query.title).map(Predicate::TitleContains),
        query.status_id.map(Predicate::StatusIs),
        query.priority_id.map(Predicate::PriorityIs),
        query.contact_id.map(Predicate::ContactIs),
        non_blank(&query.tags).map(Predicate::TagsContain),
        non_blank(&query.email).map(Predicate::EmailContains),
        query.from_date.as_deref().and_then(start_of_day).map(Predicate::CreatedFrom),
        query.to_date.as_deref().and_then(end_of_day).map(Predicate::CreatedUntil),
        needs_contact.then_some(Predicate::HasContact),
        query.contact_type_id.map(Predicate::ContactTypeIs),
        query.segmentations_id.map(Predicate::SegmentationIs),
    ];

    optional
        .into_iter()
        .flatten()
        .fold(TicketFilter::default(), TicketFilter::and)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(ids: &[i32], reports: &[i32]) -> AccessScope {
        AccessScope::new(&ids.iter().copied().collect(), reports)
    }

    fn row(id: i32) -> TicketRow {
        TicketRow {
            id,
            ticket_status_id: 1,
            priority_id: 1,
            company_department_id: 1,
            created_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single(),
            ..Default::default()
        }
    }

    #[test]
    fn test_access_disjunction() {
        let filter = build_search_filters(&TicketSearchQuery::default(), &scope(&[1], &[42]), true);

        assert!(filter.matches(&row(1)));
        let reported = TicketRow {
            assigned_to_id: Some(42),
            ..row(2)
        };
        assert!(filter.matches(&reported));
        assert!(!filter.matches(&row(3)));
    }

    #[test]
    fn test_deleted_tickets_never_match() {
        let filter = build_search_filters(&TicketSearchQuery::default(), &scope(&[1], &[]), true);
        let deleted = TicketRow {
            is_deleted: true,
            ..row(1)
        };
        assert!(!filter.matches(&deleted));
    }

    #[test]
    fn test_empty_scope_restricted_by_default() {
        let filter = build_search_filters(&TicketSearchQuery::default(), &AccessScope::default(), true);
        assert!(filter.predicates().contains(&Predicate::DenyAll));
        assert!(!filter.matches(&row(1)));
    }

    #[test]
    fn test_empty_scope_permissive_when_configured() {
        let filter = build_search_filters(&TicketSearchQuery::default(), &AccessScope::default(), false);
        assert_eq!(filter.predicates(), &[Predicate::NotDeleted]);
        assert!(filter.matches(&row(1)));
    }

    #[test]
    fn test_only_present_criteria_are_added() {
        let query = TicketSearchQuery {
            title: Some("printer".to_string()),
            ticket_id: Some("   ".to_string()),
            status_id: Some(2),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1], &[]), true);
        assert_eq!(filter.predicates().len(), 4);
        assert!(filter
            .predicates()
            .contains(&Predicate::TitleContains("printer".to_string())));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let query = TicketSearchQuery {
            from_date: Some("2024-03-10".to_string()),
            to_date: Some("2024-03-10".to_string()),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1], &[]), true);
        assert!(filter.matches(&row(1)));

        let late = TicketRow {
            created_at: Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).single(),
            ..row(1)
        };
        assert!(filter.matches(&late));

        let next_day = TicketRow {
            created_at: Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).single(),
            ..row(1)
        };
        assert!(!filter.matches(&next_day));
    }

    #[test]
    fn test_bad_dates_are_ignored() {
        let query = TicketSearchQuery {
            from_date: Some("10/03/2024".to_string()),
            to_date: Some("tomorrow".to_string()),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1], &[]), true);
        assert_eq!(filter.predicates().len(), 2);
    }

    #[test]
    fn test_email_searches_three_fields() {
        let query = TicketSearchQuery {
            email: Some("Alice@".to_string()),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1, 2, 3], &[]), true);

        let requested = TicketRow {
            requested_email: Some("alice@example.org".to_string()),
            ..row(1)
        };
        let cc = TicketRow {
            cc_recipients: Some(r#"["bob@example.org","alice@example.org"]"#.to_string()),
            ..row(2)
        };
        assert!(filter.matches(&requested));
        assert!(filter.matches(&cc));
        assert!(!filter.matches(&row(3)));
    }

    #[test]
    fn test_contact_type_requires_contact() {
        let query = TicketSearchQuery {
            contact_type_id: Some(4),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1], &[]), true);
        assert!(filter.predicates().contains(&Predicate::HasContact));
        let with_contact = TicketRow {
            contact_id: Some(9),
            contact_type_id: Some(4),
            ..row(1)
        };
        assert!(filter.matches(&with_contact));
        assert!(!filter.matches(&row(1)));
    }

    #[test]
    fn test_sql_rendering() {
        let query = TicketSearchQuery {
            title: Some("50%".to_string()),
            ..Default::default()
        };
        let filter = build_search_filters(&query, &scope(&[1], &[7]), true);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.id FROM tickets t");
        filter.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM tickets t WHERE t.is_deleted = FALSE AND \
             (t.id = ANY($1) OR t.assigned_to_id = ANY($2)) AND t.title ILIKE $3"
        );
        assert_eq!(escape_like("50%"), "%50\\%%");
    }

    #[test]
    fn test_empty_access_renders_false() {
        let filter = TicketFilter::default().and(Predicate::Access {
            ticket_ids: vec![],
            reporting_user_ids: vec![],
        });
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.id FROM tickets t");
        filter.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM tickets t WHERE t.is_deleted = FALSE AND FALSE"
        );
        assert!(!filter.matches(&row(1)));
    }
}
