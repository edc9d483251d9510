//! Core data types for the ledger

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque key of a group in the realtime store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First six characters, as shown in the workspace header
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(6) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, server-assigned key of an expense record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub String);

impl ExpenseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ledger of a group, keyed and iterated in key order
pub type Ledger = BTreeMap<ExpenseId, Expense>;

/// A member of a group. `email` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub uid: String,
}

impl Member {
    pub fn new(name: impl Into<String>, email: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            uid: uid.into(),
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// A published expense. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub title: String,
    pub amount: f64,
    pub by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub involved: Vec<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub date: String,
}

/// Expense payload sent to the store; the timestamp is assigned server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub by: String,
    pub involved: Vec<String>,
    pub date: String,
}

impl NewExpense {
    pub fn stamp(self, timestamp: i64) -> Expense {
        Expense {
            title: self.title,
            amount: self.amount,
            by: self.by,
            involved: self.involved,
            timestamp,
            date: self.date,
        }
    }
}

/// A group as stored in the realtime database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub admin: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<Member>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expenses: Ledger,
}

/// The store drops empty collections, so they arrive absent or null
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Full point-in-time copy of a group's members and expenses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<Member>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expenses: Ledger,
}

impl From<&Group> for WorkspaceSnapshot {
    fn from(group: &Group) -> Self {
        Self {
            members: group.members.clone(),
            expenses: group.expenses.clone(),
        }
    }
}

/// Identity yielded by the authentication provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub email: String,
    pub uid: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl UserIdentity {
    pub fn new(
        display_name: impl Into<String>,
        email: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            display_name: Some(display_name.into()),
            email: email.into(),
            uid: uid.into(),
            photo_url: None,
        }
    }

    pub fn with_photo(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn normalized_email(&self) -> String {
        self.email.to_lowercase()
    }
}

/// The view pane currently shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    #[default]
    Dashboard,
    Feed,
    Analytics,
    Settings,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Dashboard => "dashboard",
            View::Feed => "feed",
            View::Analytics => "analytics",
            View::Settings => "settings",
        };
        f.write_str(name)
    }
}

/// Handle to a live chart instance owned by the chart surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartHandle(pub u64);

/// Handle to a running interval timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// Blake3 fingerprint of a session state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHash(pub [u8; 32]);

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_id_short() {
        assert_eq!(GroupId::new("-NxAbCdEfGh").short(), "-NxAbC");
        assert_eq!(GroupId::new("abc").short(), "abc");
    }

    #[test]
    fn test_expense_decodes_without_involved() {
        let json = r#"{"title":"Taxi","amount":120,"by":"Ann","timestamp":5,"date":"01 Jan"}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert!(expense.involved.is_empty());
        assert_eq!(expense.amount, 120.0);
    }

    #[test]
    fn test_member_email_match_ignores_case() {
        let member = Member::new("Ann", "Ann@Example.com", "u1");
        assert!(member.has_email("ann@example.com"));
        assert!(!member.has_email("bob@example.com"));
    }
}
