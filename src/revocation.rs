//! Member revocation and ledger purge

use crate::error::{GuardError, TripError, ValidationError};
use crate::state::TripStore;
use crate::traits::{Prompter, RealtimeBackend};
use crate::types::Member;

#[derive(Debug, Clone, PartialEq)]
pub enum RevocationOutcome {
    /// The filtered member list was written to the store
    Revoked { remaining: Vec<Member> },
    /// The user declined the confirmation dialog
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Purged,
    /// There was no active group to purge
    NoWorkspace,
}

/// Removes members and purges ledgers of the active group
#[derive(Debug, Clone)]
pub struct RevocationService {
    store: TripStore,
    root_admin: String,
    purge_token: String,
}

impl RevocationService {
    pub fn new(
        store: TripStore,
        root_admin: impl Into<String>,
        purge_token: impl Into<String>,
    ) -> Self {
        Self {
            store,
            root_admin: root_admin.into(),
            purge_token: purge_token.into(),
        }
    }

    /// Remove the member with `email` from the active group.
    ///
    /// The configured root admin can never be removed, whatever the group's
    /// own admin field says. The local member list is left alone; the change
    /// arrives with the next snapshot.
    ///
    /// # Arguments
    /// * `backend` - Store receiving the filtered member list
    /// * `prompter` - Asked to confirm once the admin guard has passed
    /// * `email` - Member to remove, matched case-insensitively
    ///
    /// # Returns
    /// The outcome, or `GuardError::RootAdminProtected` for the root admin
    pub fn execute<B, P>(
        &self,
        backend: &mut B,
        prompter: &mut P,
        email: &str,
    ) -> Result<RevocationOutcome, TripError>
    where
        B: RealtimeBackend,
        P: Prompter,
    {
        if email.trim().eq_ignore_ascii_case(self.root_admin.trim()) {
            return Err(GuardError::RootAdminProtected {
                email: email.to_string(),
            }
            .into());
        }

        if !prompter.confirm(&format!("Initialize cloud revocation for {}?", email)) {
            return Ok(RevocationOutcome::Declined);
        }

        let state = self.store.snapshot();
        let group = match &state.active_group_id {
            Some(group) => group,
            None => return Err(ValidationError::NoActiveWorkspace.into()),
        };
        let remaining: Vec<Member> = state
            .members
            .iter()
            .filter(|m| !m.has_email(email))
            .cloned()
            .collect();

        backend.replace_members(group, remaining.clone())?;
        Ok(RevocationOutcome::Revoked { remaining })
    }

    /// Delete every expense of the active group after a typed confirmation.
    ///
    /// Irreversible once the token matches.
    pub fn hard_reset<B, P>(
        &self,
        backend: &mut B,
        prompter: &mut P,
    ) -> Result<ResetOutcome, TripError>
    where
        B: RealtimeBackend,
        P: Prompter,
    {
        let group = match self.store.snapshot().active_group_id.clone() {
            Some(group) => group,
            None => return Ok(ResetOutcome::NoWorkspace),
        };

        let challenge = prompter.prompt(&format!(
            "This wipes ALL cloud transactions. Type '{}' to proceed.",
            self.purge_token
        ));
        if challenge.as_deref() != Some(self.purge_token.as_str()) {
            return Err(GuardError::ConfirmationMismatch.into());
        }

        backend.remove_expenses(&group)?;
        Ok(ResetOutcome::Purged)
    }
}
