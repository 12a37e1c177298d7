//! Sources of ticket visibility for a user

use crate::models::ticket::{AssigneeType, TicketAccessContext, TicketAssignee};

/// One independent way a ticket becomes visible to a user.
///
/// The accessible set is the union over every source returned by
/// [`access_sources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessSource {
    /// Assignee edge of type `user` naming the user
    AssignedUser(i32),
    /// Assignee edge of type `team` naming one of the user's teams
    AssignedTeams(Vec<i32>),
    AssignedDepartment(i32),
    AssignedCompany(i32),
    /// Non-deleted tickets created by or assigned to the user
    CreatedOrAssigned(i32),
}

impl AccessSource {
    /// Whether an assignee edge grants access through this source.
    /// [`AccessSource::CreatedOrAssigned`] never matches an edge.
    pub fn matches_assignee(&self, edge: &TicketAssignee) -> bool {
        match self {
            AccessSource::AssignedUser(id) => {
                edge.assignee_type == AssigneeType::User && edge.assignee_id == *id
            }
            AccessSource::AssignedTeams(ids) => {
                edge.assignee_type == AssigneeType::Team && ids.contains(&edge.assignee_id)
            }
            AccessSource::AssignedDepartment(id) => {
                edge.assignee_type == AssigneeType::Department && edge.assignee_id == *id
            }
            AccessSource::AssignedCompany(id) => {
                edge.assignee_type == AssigneeType::Company && edge.assignee_id == *id
            }
            AccessSource::CreatedOrAssigned(_) => false,
        }
    }

    /// Assignee type and ids for edge-based sources
    pub fn assignee_filter(&self) -> Option<(AssigneeType, Vec<i32>)> {
        match self {
            AccessSource::AssignedUser(id) => Some((AssigneeType::User, vec![*id])),
            AccessSource::AssignedTeams(ids) => Some((AssigneeType::Team, ids.clone())),
            AccessSource::AssignedDepartment(id) => Some((AssigneeType::Department, vec![*id])),
            AccessSource::AssignedCompany(id) => Some((AssigneeType::Company, vec![*id])),
            AccessSource::CreatedOrAssigned(_) => None,
        }
    }
}

/// Sources that apply to a user. Team, department and company sources are
/// only present when the user has such memberships.
pub fn access_sources(ctx: &TicketAccessContext) -> Vec<AccessSource> {
    let mut sources = vec![AccessSource::AssignedUser(ctx.user_id)];

    if !ctx.team_ids.is_empty() {
        sources.push(AccessSource::AssignedTeams(ctx.team_ids.clone()));
    }
    if let Some(department_id) = ctx.department_id {
        sources.push(AccessSource::AssignedDepartment(department_id));
    }
    if let Some(company_id) = ctx.company_id {
        sources.push(AccessSource::AssignedCompany(company_id));
    }
    sources.push(AccessSource::CreatedOrAssigned(ctx.user_id));

    sources
}
