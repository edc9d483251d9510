//! Reconciliation engine: derives every user-facing number from raw state
//!
//! Each render routine recomputes from the full expense set on every call.
//! Nothing is memoized between passes, so a ribbon render is
//! O(members × expenses). That is the accepted scaling limit.

use crate::error::TripError;
use crate::formatter::{calc_balance, display_name_identity, FinanceFormatter};
use crate::state::{SessionState, StatePatch, TripStore};
use crate::traits::ChartSurface;
use crate::types::{Expense, ExpenseId};
use serde::{Deserialize, Serialize};

/// Balances closer to zero than this are shown as settled
pub const SETTLED_TOLERANCE: f64 = 1e-9;

/// Maximum participant initials shown on a feed card
pub const FEED_INITIALS: usize = 4;

/// Tri-state classification of a balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStatus {
    /// Owed money
    Creditor,
    /// Owes money
    Debtor,
    Settled,
}

impl BalanceStatus {
    pub fn classify(balance: f64) -> Self {
        if balance > SETTLED_TOLERANCE {
            BalanceStatus::Creditor
        } else if balance < -SETTLED_TOLERANCE {
            BalanceStatus::Debtor
        } else {
            BalanceStatus::Settled
        }
    }
}

/// The three headline figures for the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total: f64,
    pub my_contribution: f64,
    pub net_balance: f64,
    pub total_label: String,
    pub contribution_label: String,
    pub balance_label: String,
    pub status: BalanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberBalanceCard {
    pub name: String,
    pub balance: f64,
    pub balance_label: String,
    pub status: BalanceStatus,
}

/// Selectable participant on the expense form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantChip {
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCard {
    pub id: ExpenseId,
    pub title: String,
    pub date: String,
    pub by: String,
    pub amount_label: String,
    pub initials: Vec<String>,
    /// Participants beyond the shown initials
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedView {
    Empty,
    Entries(Vec<ExpenseCard>),
}

impl FeedView {
    pub fn cards(&self) -> &[ExpenseCard] {
        match self {
            FeedView::Empty => &[],
            FeedView::Entries(cards) => cards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRow {
    pub name: String,
    pub email: String,
    pub initial: String,
    /// The signed-in user's own row, which carries the root badge
    pub is_self: bool,
}

impl MemberRow {
    pub fn revocable(&self) -> bool {
        !self.is_self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsView {
    pub member_count_label: String,
    pub rows: Vec<MemberRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsView {
    pub series: Vec<ChartPoint>,
    pub average_label: String,
    pub max_label: String,
    pub count: usize,
}

fn initial(name: &str) -> String {
    name.chars().next().map(String::from).unwrap_or_default()
}

/// Stateless engine turning a session state into view data
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    formatter: FinanceFormatter,
}

impl ReconciliationEngine {
    pub fn new(formatter: FinanceFormatter) -> Self {
        Self { formatter }
    }

    pub fn reconcile_financials(&self, state: &SessionState) -> FinancialSummary {
        let identity = display_name_identity(state.current_user.as_ref());
        let expenses: Vec<&Expense> = state.expenses.values().collect();

        let total: f64 = expenses.iter().map(|e| e.amount).sum();
        let my_contribution: f64 = expenses
            .iter()
            .filter(|e| e.by == identity)
            .map(|e| e.amount)
            .sum();
        let net_balance = calc_balance(&identity, &state.expenses);

        FinancialSummary {
            total,
            my_contribution,
            net_balance,
            total_label: self.formatter.to_currency(total),
            contribution_label: self.formatter.to_currency(my_contribution),
            balance_label: self.formatter.to_currency(net_balance),
            status: BalanceStatus::classify(net_balance),
        }
    }

    pub fn render_ribbon(&self, state: &SessionState) -> Vec<MemberBalanceCard> {
        state
            .members
            .iter()
            .map(|member| {
                let balance = calc_balance(&member.name, &state.expenses);
                MemberBalanceCard {
                    name: member.name.clone(),
                    balance,
                    balance_label: self.formatter.to_currency(balance),
                    status: BalanceStatus::classify(balance),
                }
            })
            .collect()
    }

    pub fn participant_chips(&self, state: &SessionState) -> Vec<ParticipantChip> {
        state
            .members
            .iter()
            .map(|member| ParticipantChip {
                name: member.name.clone(),
                selected: true,
            })
            .collect()
    }

    /// Most recent first; equal timestamps keep key order
    pub fn render_feed(&self, state: &SessionState) -> FeedView {
        let mut items: Vec<(&ExpenseId, &Expense)> = state.expenses.iter().collect();
        if items.is_empty() {
            return FeedView::Empty;
        }
        items.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));

        let cards = items
            .into_iter()
            .map(|(id, expense)| ExpenseCard {
                id: id.clone(),
                title: expense.title.clone(),
                date: expense.date.clone(),
                by: expense.by.clone(),
                amount_label: self.formatter.to_currency(expense.amount),
                initials: expense
                    .involved
                    .iter()
                    .take(FEED_INITIALS)
                    .map(|name| initial(name))
                    .collect(),
                overflow: expense.involved.len().saturating_sub(FEED_INITIALS),
            })
            .collect();
        FeedView::Entries(cards)
    }

    pub fn render_settings(&self, state: &SessionState) -> SettingsView {
        let own_email = state.current_user.as_ref().map(|u| u.email.as_str());
        let rows = state
            .members
            .iter()
            .map(|member| MemberRow {
                name: member.name.clone(),
                email: member.email.clone(),
                initial: initial(&member.name),
                is_self: own_email.map_or(false, |email| member.has_email(email)),
            })
            .collect();

        SettingsView {
            member_count_label: format!("{} TOTAL", state.members.len()),
            rows,
        }
    }

    /// Oldest first series with average, maximum and count
    pub fn render_analytics(&self, state: &SessionState) -> Option<AnalyticsView> {
        let mut expenses: Vec<&Expense> = state.expenses.values().collect();
        if expenses.is_empty() {
            return None;
        }
        expenses.sort_by_key(|e| e.timestamp);

        let total: f64 = expenses.iter().map(|e| e.amount).sum();
        let max = expenses
            .iter()
            .map(|e| e.amount)
            .fold(f64::NEG_INFINITY, f64::max);

        Some(AnalyticsView {
            series: expenses
                .iter()
                .map(|e| ChartPoint {
                    label: e.date.clone(),
                    amount: e.amount,
                })
                .collect(),
            average_label: self.formatter.to_currency(total / expenses.len() as f64),
            max_label: self.formatter.to_currency(max),
            count: expenses.len(),
        })
    }

    /// Draw the analytics chart, releasing the previous chart first.
    ///
    /// The store holds at most one live chart handle. An empty ledger leaves
    /// the current chart untouched.
    pub fn render_chart<C: ChartSurface>(
        &self,
        store: &TripStore,
        surface: &mut C,
    ) -> Result<Option<AnalyticsView>, TripError> {
        let state = store.snapshot();
        let analytics = match self.render_analytics(&state) {
            Some(analytics) => analytics,
            None => return Ok(None),
        };

        if let Some(previous) = state.chart {
            surface.dispose(previous);
            store.update(StatePatch::new().chart(None));
        }

        let handle = surface.draw(&analytics.series)?;
        store.update(StatePatch::new().chart(Some(handle)));
        Ok(Some(analytics))
    }
}
