//! Parent-then-children ordering of ticket lists

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::ticket::TicketRow;

pub trait FamilyMember {
    fn id(&self) -> i32;
    fn parent_id(&self) -> Option<i32>;
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

impl FamilyMember for TicketRow {
    fn id(&self) -> i32 {
        self.id
    }

    fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Order tickets as families: newest root first, each root followed by its
/// children oldest first.
///
/// A ticket is a root when it has no parent or when its parent is not a
/// parentless ticket of the same list. Orphans therefore surface as roots of
/// their own. Parent cycles are not detected.
pub fn organize_ticket_families<T: FamilyMember>(tickets: Vec<T>) -> Vec<T> {
    let parent_ids: HashSet<i32> = tickets
        .iter()
        .filter(|t| t.parent_id().is_none())
        .map(|t| t.id())
        .collect();

    let total = tickets.len();
    let mut roots = Vec::new();
    let mut orphans = Vec::new();
    let mut children: HashMap<i32, Vec<T>> = HashMap::new();

    for ticket in tickets {
        match ticket.parent_id() {
            None => roots.push(ticket),
            Some(parent) if parent_ids.contains(&parent) => {
                children.entry(parent).or_default().push(ticket)
            }
            Some(_) => orphans.push(ticket),
        }
    }
    roots.extend(orphans);
    roots.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

    let mut organized = Vec::with_capacity(total);
    for root in roots {
        let family = children.remove(&root.id());
        organized.push(root);
        if let Some(mut family) = family {
            family.sort_by_key(|t| t.created_at());
            organized.extend(family);
        }
    }
    organized
}
