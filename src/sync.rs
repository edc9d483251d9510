//! Sync adapter between the realtime store and the session state
//!
//! Snapshots replace `members` and `expenses` wholesale. There is no
//! ordering between local writes and remote snapshots: whatever snapshot is
//! pulled last wins, even if it drops a write made locally a moment earlier.

use crate::error::{CollaboratorError, SerializationError, TripError, ValidationError};
use crate::formatter::{display_name_identity, FinanceFormatter};
use crate::state::{StatePatch, TripStore};
use crate::traits::RealtimeBackend;
use crate::types::{
    ExpenseId, Group, GroupId, Ledger, Member, NewExpense, UserIdentity, WorkspaceSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User input from the expense form
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: f64,
    pub involved: Vec<String>,
}

impl ExpenseDraft {
    pub fn new(title: impl Into<String>, amount: f64, involved: Vec<String>) -> Self {
        Self {
            title: title.into(),
            amount,
            involved,
        }
    }

    /// Build a draft from raw form text; an unparsable amount becomes NaN
    pub fn from_form(title: &str, amount: &str, involved: Vec<String>) -> Self {
        Self::new(title, amount.trim().parse().unwrap_or(f64::NAN), involved)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ValidationError::InvalidAmount {
                value: self.amount.to_string(),
            });
        }
        if self.involved.is_empty() {
            return Err(ValidationError::NoParticipants);
        }
        Ok(())
    }
}

/// Entry in the workspace discovery list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceCard {
    pub id: GroupId,
    pub name: String,
    pub initial: String,
}

/// Decode a snapshot as delivered by the store. `null` means the group is gone.
pub fn decode_snapshot(json: &str) -> Result<Option<WorkspaceSnapshot>, SerializationError> {
    serde_json::from_str(json).map_err(|e| SerializationError::DeserializationFailed {
        reason: e.to_string(),
    })
}

fn member_for(user: &UserIdentity) -> Member {
    Member::new(display_name_identity(Some(user)), user.normalized_email(), user.uid.clone())
}

/// Moves data between a [`RealtimeBackend`] and a [`TripStore`]
#[derive(Debug, Clone)]
pub struct SyncAdapter {
    store: TripStore,
    formatter: FinanceFormatter,
    watching: Option<GroupId>,
}

impl SyncAdapter {
    pub fn new(store: TripStore, formatter: FinanceFormatter) -> Self {
        Self {
            store,
            formatter,
            watching: None,
        }
    }

    pub fn watching(&self) -> Option<&GroupId> {
        self.watching.as_ref()
    }

    /// Make `id` the active group and start receiving its snapshots
    pub fn stream_workspace<B: RealtimeBackend>(
        &mut self,
        backend: &mut B,
        id: &GroupId,
    ) -> Result<(), TripError> {
        self.store.update(StatePatch::new().active_group_id(Some(id.clone())));
        backend.watch(id)?;
        self.watching = Some(id.clone());
        Ok(())
    }

    /// Apply the pending snapshot of the watched group, if any.
    ///
    /// Returns whether the store was updated.
    pub fn pull<B: RealtimeBackend>(&mut self, backend: &mut B) -> Result<bool, TripError> {
        let id = match &self.watching {
            Some(id) => id.clone(),
            None => return Ok(false),
        };
        match backend.poll_snapshot(&id)? {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn apply_snapshot(&self, snapshot: WorkspaceSnapshot) {
        self.store.update(
            StatePatch::new()
                .members(snapshot.members)
                .expenses(snapshot.expenses),
        );
    }

    /// Validate and push a new expense on behalf of the signed-in user.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Arguments
    /// * `backend` - Store receiving the new record
    /// * `draft` - Form input, trimmed before it is written
    /// * `now` - Client clock used for the date label
    ///
    /// # Returns
    /// The push key the store assigned to the expense
    pub fn publish_expense<B: RealtimeBackend>(
        &self,
        backend: &mut B,
        draft: &ExpenseDraft,
        now: DateTime<Utc>,
    ) -> Result<ExpenseId, TripError> {
        draft.validate()?;
        let state = self.store.snapshot();
        let user = state.current_user.as_ref().ok_or(ValidationError::NotSignedIn)?;
        let group = state
            .active_group_id
            .as_ref()
            .ok_or(ValidationError::NoActiveWorkspace)?;

        let payload = NewExpense {
            title: draft.title.trim().to_string(),
            amount: draft.amount,
            by: display_name_identity(Some(user)),
            involved: draft.involved.clone(),
            date: self.formatter.day_month(now),
        };
        backend.push_expense(group, payload)
    }

    /// Create a group with `user` as admin and only member
    pub fn create_workspace<B: RealtimeBackend>(
        &self,
        backend: &mut B,
        name: &str,
        user: &UserIdentity,
    ) -> Result<GroupId, TripError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingWorkspaceName.into());
        }
        backend.create_group(Group {
            name: name.to_string(),
            admin: user.normalized_email(),
            created_at: 0,
            members: vec![member_for(user)],
            expenses: Ledger::new(),
        })
    }

    /// Add `user` to an existing group unless already a member
    pub fn join_workspace<B: RealtimeBackend>(
        &self,
        backend: &mut B,
        id: &str,
        user: &UserIdentity,
    ) -> Result<(GroupId, Group), TripError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingWorkspaceId.into());
        }
        let id = GroupId::new(id);
        let mut group = backend
            .fetch_group(&id)?
            .ok_or_else(|| CollaboratorError::NotFound { id: id.to_string() })?;

        let email = user.normalized_email();
        if !group.members.iter().any(|m| m.has_email(&email)) {
            group.members.push(member_for(user));
            backend.replace_members(&id, group.members.clone())?;
        }
        Ok((id, group))
    }

    /// Groups whose member list contains `email`
    pub fn discover_workspaces<B: RealtimeBackend>(
        &self,
        backend: &B,
        email: &str,
    ) -> Result<Vec<WorkspaceCard>, TripError> {
        Ok(backend
            .list_groups()?
            .into_iter()
            .filter(|(_, group)| group.members.iter().any(|m| m.has_email(email)))
            .map(|(id, group)| WorkspaceCard {
                initial: group
                    .name
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().collect())
                    .unwrap_or_default(),
                id,
                name: group.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_validation() {
        let ok = ExpenseDraft::new("Fuel", 40.0, vec!["Ann".to_string()]);
        assert!(ok.validate().is_ok());

        let blank = ExpenseDraft::new("  ", 40.0, vec!["Ann".to_string()]);
        assert_eq!(blank.validate(), Err(ValidationError::MissingTitle));

        let negative = ExpenseDraft::new("Fuel", -1.0, vec!["Ann".to_string()]);
        assert!(matches!(negative.validate(), Err(ValidationError::InvalidAmount { .. })));

        let nobody = ExpenseDraft::new("Fuel", 40.0, Vec::new());
        assert_eq!(nobody.validate(), Err(ValidationError::NoParticipants));
    }

    #[test]
    fn test_from_form_rejects_garbage_amount() {
        let draft = ExpenseDraft::from_form("Fuel", "forty", vec!["Ann".to_string()]);
        assert!(matches!(draft.validate(), Err(ValidationError::InvalidAmount { .. })));

        let draft = ExpenseDraft::from_form("Fuel", " 40.5 ", vec!["Ann".to_string()]);
        assert_eq!(draft.amount, 40.5);
    }

    #[test]
    fn test_decode_snapshot_tolerates_missing_fields() {
        let json = r#"{"name":"Goa","members":[{"name":"Ann","email":"a@x.io","uid":"1"}]}"#;
        let snapshot = decode_snapshot(json)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.members.len(), 1);
        assert!(snapshot.expenses.is_empty());

        assert_eq!(decode_snapshot("null").unwrap(), None);
        assert!(decode_snapshot("[1,2").is_err());
    }
}
