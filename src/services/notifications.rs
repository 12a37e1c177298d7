//! Notification addressing over the reporting hierarchy

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::notification::{
        compute_recipients, EventPolicy, NotificationEvent, PolicyTable, RecipientContext,
    },
    repository::ManagerDirectory,
};

/// Who is involved in an event
#[derive(Debug, Clone, Copy)]
pub struct EventParticipants {
    pub actor_id: i32,
    pub assignee_id: Option<i32>,
    pub creator_id: Option<i32>,
    pub previous_assignee_id: Option<i32>,
}

#[derive(Clone)]
pub struct NotificationService {
    directory: Arc<dyn ManagerDirectory>,
    policies: Arc<PolicyTable>,
}

impl NotificationService {
    pub fn new(directory: Arc<dyn ManagerDirectory>, policies: PolicyTable) -> Self {
        Self {
            directory,
            policies: Arc::new(policies),
        }
    }

    pub fn rules(&self) -> Vec<EventPolicy> {
        self.policies
            .entries()
            .into_iter()
            .map(|(event, policy)| EventPolicy { event, policy })
            .collect()
    }

    /// Active users to notify about an event, ascending
    pub async fn recipients(
        &self,
        event: NotificationEvent,
        participants: EventParticipants,
    ) -> AppResult<Vec<i32>> {
        let policy = self.policies.policy(event);

        let actor_managers = if policy.include_actor_managers {
            self.managers_of(participants.actor_id, "actor").await
        } else {
            Vec::new()
        };
        let assignee_managers = match participants.assignee_id {
            Some(id) if policy.include_assignee_managers => self.managers_of(id, "assignee").await,
            _ => Vec::new(),
        };
        let creator_managers = match participants.creator_id {
            Some(id) if policy.include_creator_managers => self.managers_of(id, "creator").await,
            _ => Vec::new(),
        };

        let ctx = RecipientContext {
            actor_id: participants.actor_id,
            assignee_id: participants.assignee_id,
            creator_id: participants.creator_id,
            previous_assignee_id: participants.previous_assignee_id,
            actor_managers,
            assignee_managers,
            creator_managers,
        };

        let candidates: Vec<i32> = compute_recipients(&policy, &ctx).into_iter().collect();
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut active = self.directory.active_users(candidates).await?;
        active.sort_unstable();
        active.dedup();

        tracing::debug!(?event, count = active.len(), "Computed notification recipients");
        Ok(active)
    }

    /// Manager chain of a participant; a failed lookup contributes nobody
    async fn managers_of(&self, user_id: i32, role: &'static str) -> Vec<i32> {
        match self.directory.manager_ids(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(user_id, role, error = %e, "Error getting managers");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::repository::users::MockManagerDirectory;
    use mockall::predicate::eq;

    fn participants() -> EventParticipants {
        EventParticipants {
            actor_id: 1,
            assignee_id: Some(2),
            creator_id: Some(3),
            previous_assignee_id: None,
        }
    }

    fn all_active(directory: &mut MockManagerDirectory) {
        directory.expect_active_users().returning(|ids| Ok(ids));
    }

    #[tokio::test]
    async fn test_manager_chains_are_resolved() {
        let mut directory = MockManagerDirectory::new();
        directory
            .expect_manager_ids()
            .with(eq(1))
            .returning(|_| Ok(vec![10, 11]));
        directory
            .expect_manager_ids()
            .with(eq(2))
            .returning(|_| Ok(vec![20]));
        all_active(&mut directory);

        let service = NotificationService::new(Arc::new(directory), PolicyTable::default());
        let got = service
            .recipients(NotificationEvent::TaskCreated, participants())
            .await
            .unwrap();

        assert_eq!(got, vec![1, 2, 10, 11, 20]);
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_only_that_chain() {
        let mut directory = MockManagerDirectory::new();
        directory
            .expect_manager_ids()
            .with(eq(1))
            .returning(|_| Err(AppError::Internal("directory down".to_string())));
        directory
            .expect_manager_ids()
            .with(eq(2))
            .returning(|_| Ok(vec![20]));
        all_active(&mut directory);

        let service = NotificationService::new(Arc::new(directory), PolicyTable::default());
        let got = service
            .recipients(NotificationEvent::TaskCreated, participants())
            .await
            .unwrap();

        assert_eq!(got, vec![1, 2, 20]);
    }

    #[tokio::test]
    async fn test_inactive_users_are_dropped() {
        let mut directory = MockManagerDirectory::new();
        directory.expect_manager_ids().returning(|_| Ok(vec![10]));
        directory
            .expect_active_users()
            .returning(|ids| Ok(ids.into_iter().filter(|id| *id != 10).collect()));

        let service = NotificationService::new(Arc::new(directory), PolicyTable::default());
        let got = service
            .recipients(NotificationEvent::ChecklistCreated, participants())
            .await
            .unwrap();

        assert_eq!(got, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_no_lookup_when_policy_skips_managers() {
        let mut directory = MockManagerDirectory::new();
        directory.expect_manager_ids().never();
        all_active(&mut directory);

        let service = NotificationService::new(Arc::new(directory), PolicyTable::default());
        let got = service
            .recipients(NotificationEvent::ConversationUpdated, participants())
            .await
            .unwrap();

        assert_eq!(got, vec![2, 3]);
    }

    #[test]
    fn test_rules_cover_every_event() {
        let service = NotificationService::new(
            Arc::new(MockManagerDirectory::new()),
            PolicyTable::default(),
        );
        assert_eq!(service.rules().len(), NotificationEvent::ALL.len());
    }
}
