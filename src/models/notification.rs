//! Notification recipient rules
//!
//! A [`PolicyTable`] maps each [`NotificationEvent`] to a [`RecipientPolicy`].
//! [`compute_recipients`] applies a policy to the people involved in an
//! event. Manager chains are resolved by the caller beforehand so that the
//! computation itself stays pure.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskCompleted,
    TaskAssigned,
    ChecklistCreated,
    ChecklistUpdated,
    ChecklistDeleted,
    ConversationCreated,
    ConversationUpdated,
    ConversationDeleted,
}

impl NotificationEvent {
    pub const ALL: [NotificationEvent; 11] = [
        NotificationEvent::TaskCreated,
        NotificationEvent::TaskUpdated,
        NotificationEvent::TaskDeleted,
        NotificationEvent::TaskCompleted,
        NotificationEvent::TaskAssigned,
        NotificationEvent::ChecklistCreated,
        NotificationEvent::ChecklistUpdated,
        NotificationEvent::ChecklistDeleted,
        NotificationEvent::ConversationCreated,
        NotificationEvent::ConversationUpdated,
        NotificationEvent::ConversationDeleted,
    ];
}

/// Who receives a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecipientPolicy {
    pub include_assignee: bool,
    pub include_creator: bool,
    /// Also includes the actor
    pub include_actor_managers: bool,
    pub include_assignee_managers: bool,
    pub include_creator_managers: bool,
    pub include_previous_assignee: bool,
    pub exclude_actor: bool,
}

impl Default for RecipientPolicy {
    fn default() -> Self {
        Self {
            include_assignee: true,
            include_creator: true,
            include_actor_managers: true,
            include_assignee_managers: false,
            include_creator_managers: false,
            include_previous_assignee: false,
            exclude_actor: false,
        }
    }
}

/// Immutable mapping from event kind to recipient policy
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    policies: HashMap<NotificationEvent, RecipientPolicy>,
}

impl PolicyTable {
    pub fn new(policies: impl IntoIterator<Item = (NotificationEvent, RecipientPolicy)>) -> Self {
        Self {
            policies: policies.into_iter().collect(),
        }
    }

    /// Policy for an event, falling back to [`RecipientPolicy::default`]
    pub fn policy(&self, event: NotificationEvent) -> RecipientPolicy {
        self.policies.get(&event).copied().unwrap_or_default()
    }

    /// Every event with its effective policy
    pub fn entries(&self) -> Vec<(NotificationEvent, RecipientPolicy)> {
        NotificationEvent::ALL
            .iter()
            .map(|event| (*event, self.policy(*event)))
            .collect()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        use NotificationEvent::*;

        let base = RecipientPolicy::default();
        Self::new([
            (
                TaskCreated,
                RecipientPolicy {
                    include_creator: false,
                    include_assignee_managers: true,
                    ..base
                },
            ),
            (
                TaskUpdated,
                RecipientPolicy {
                    include_assignee_managers: true,
                    include_previous_assignee: true,
                    ..base
                },
            ),
            (
                TaskDeleted,
                RecipientPolicy {
                    include_assignee_managers: true,
                    ..base
                },
            ),
            (
                TaskCompleted,
                RecipientPolicy {
                    include_assignee: false,
                    include_creator_managers: true,
                    include_assignee_managers: true,
                    exclude_actor: true,
                    ..base
                },
            ),
            (
                TaskAssigned,
                RecipientPolicy {
                    include_assignee_managers: true,
                    include_previous_assignee: true,
                    exclude_actor: true,
                    ..base
                },
            ),
            (ChecklistCreated, RecipientPolicy { exclude_actor: true, ..base }),
            (ChecklistUpdated, RecipientPolicy { exclude_actor: true, ..base }),
            (ChecklistDeleted, RecipientPolicy { exclude_actor: true, ..base }),
            (ConversationCreated, RecipientPolicy { exclude_actor: true, ..base }),
            (
                ConversationUpdated,
                RecipientPolicy {
                    include_actor_managers: false,
                    exclude_actor: true,
                    ..base
                },
            ),
        ])
    }
}

/// Effective policy of one event
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventPolicy {
    pub event: NotificationEvent,
    pub policy: RecipientPolicy,
}

/// Recipient preview request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipientRequest {
    pub event: NotificationEvent,
    /// Defaults to the caller
    pub actor_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub creator_id: Option<i32>,
    pub previous_assignee_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipientList {
    pub event: NotificationEvent,
    pub recipients: Vec<i32>,
}

/// People involved in an event, with their manager chains already resolved
#[derive(Debug, Clone, Default)]
pub struct RecipientContext {
    pub actor_id: i32,
    pub assignee_id: Option<i32>,
    pub creator_id: Option<i32>,
    pub previous_assignee_id: Option<i32>,
    pub actor_managers: Vec<i32>,
    pub assignee_managers: Vec<i32>,
    pub creator_managers: Vec<i32>,
}

pub fn compute_recipients(policy: &RecipientPolicy, ctx: &RecipientContext) -> BTreeSet<i32> {
    let mut recipients = BTreeSet::new();

    if policy.include_assignee {
        recipients.extend(ctx.assignee_id);
    }
    if policy.include_creator {
        recipients.extend(ctx.creator_id);
    }
    if policy.include_actor_managers {
        recipients.extend(ctx.actor_managers.iter().copied());
        recipients.insert(ctx.actor_id);
    }
    if policy.include_assignee_managers && ctx.assignee_id.is_some() {
        recipients.extend(ctx.assignee_managers.iter().copied());
    }
    if policy.include_creator_managers && ctx.creator_id.is_some() {
        recipients.extend(ctx.creator_managers.iter().copied());
    }
    if policy.include_previous_assignee {
        recipients.extend(ctx.previous_assignee_id);
    }
    if policy.exclude_actor {
        recipients.remove(&ctx.actor_id);
    }

    recipients
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RecipientContext {
        RecipientContext {
            actor_id: 1,
            assignee_id: Some(2),
            creator_id: Some(3),
            previous_assignee_id: Some(4),
            actor_managers: vec![10],
            assignee_managers: vec![20],
            creator_managers: vec![30],
        }
    }

    #[test]
    fn test_task_created_notifies_actor_and_managers() {
        let table = PolicyTable::default();
        let got = compute_recipients(&table.policy(NotificationEvent::TaskCreated), &context());
        assert_eq!(got, BTreeSet::from([1, 2, 10, 20]));
    }

    #[test]
    fn test_task_completed_excludes_actor() {
        let table = PolicyTable::default();
        let got = compute_recipients(&table.policy(NotificationEvent::TaskCompleted), &context());
        assert_eq!(got, BTreeSet::from([3, 10, 20, 30]));
    }

    #[test]
    fn test_task_assigned_includes_previous_assignee() {
        let table = PolicyTable::default();
        let got = compute_recipients(&table.policy(NotificationEvent::TaskAssigned), &context());
        assert_eq!(got, BTreeSet::from([2, 3, 4, 10, 20]));
    }

    #[test]
    fn test_missing_event_uses_default_policy() {
        let table = PolicyTable::default();
        assert_eq!(
            table.policy(NotificationEvent::ConversationDeleted),
            RecipientPolicy::default()
        );
        let got = compute_recipients(&table.policy(NotificationEvent::ConversationDeleted), &context());
        assert_eq!(got, BTreeSet::from([1, 2, 3, 10]));
    }

    #[test]
    fn test_manager_chains_ignored_without_subject() {
        let ctx = RecipientContext {
            assignee_id: None,
            ..context()
        };
        let got = compute_recipients(&PolicyTable::default().policy(NotificationEvent::TaskDeleted), &ctx);
        assert!(!got.contains(&20));
    }

    #[test]
    fn test_conversation_updated_only_assignee() {
        let got = compute_recipients(
            &PolicyTable::default().policy(NotificationEvent::ConversationUpdated),
            &context(),
        );
        assert_eq!(got, BTreeSet::from([2, 3]));
    }
}
