//! Currency formatting and balance calculation

use crate::config::AppConfig;
use crate::types::{Expense, Ledger, UserIdentity};
use chrono::{DateTime, Utc};

/// Identity used when the signed-in user has no usable display name
pub const FALLBACK_IDENTITY: &str = "User";

/// Digit grouping convention of a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// 1,234,567
    Thousands,
    /// 12,34,567
    Indian,
}

impl Grouping {
    pub fn for_locale(locale: &str) -> Self {
        if locale.eq_ignore_ascii_case("en-IN") || locale.eq_ignore_ascii_case("hi-IN") {
            Grouping::Indian
        } else {
            Grouping::Thousands
        }
    }

    fn apply(self, digits: &str) -> String {
        if digits.len() <= 3 {
            return digits.to_string();
        }
        let (head, tail) = digits.split_at(digits.len() - 3);
        let width = match self {
            Grouping::Thousands => 3,
            Grouping::Indian => 2,
        };

        let mut groups = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(width);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        groups.push(tail);
        groups.join(",")
    }
}

/// Locale-aware money formatting with zero fractional digits
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceFormatter {
    locale: String,
    grouping: Grouping,
    symbol: String,
}

impl FinanceFormatter {
    pub fn new(locale: &str, currency: &str) -> Self {
        Self {
            locale: locale.to_string(),
            grouping: Grouping::for_locale(locale),
            symbol: currency_symbol(currency),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.locale, &config.currency)
    }

    /// Format a value as money, rounded half away from zero.
    ///
    /// Values that round to zero are printed without a sign. Non-finite
    /// values print as zero.
    pub fn to_currency(&self, value: f64) -> String {
        let rounded = if value.is_finite() { value.round() } else { 0.0 };
        let digits = format!("{:.0}", rounded.abs());
        let sign = if rounded < 0.0 { "-" } else { "" };
        format!("{}{}{}", sign, self.symbol, self.grouping.apply(&digits))
    }

    /// Short `DD Mon` date label stamped onto new expenses
    pub fn day_month(&self, at: DateTime<Utc>) -> String {
        if self.locale.eq_ignore_ascii_case("en-US") {
            at.format("%b %d").to_string()
        } else {
            at.format("%d %b").to_string()
        }
    }
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{}\u{a0}", other),
    }
}

/// Net balance of `member` over the ledger: paid minus equal-split shares.
///
/// Positive means the member is owed money. Expenses with no participants
/// contribute nothing to any share.
///
/// # Arguments
/// * `member` - Ledger identity, the first word of a display name
/// * `expenses` - The full ledger
///
/// # Returns
/// Amount paid by `member` minus their share of every expense they are in
pub fn calc_balance(member: &str, expenses: &Ledger) -> f64 {
    balance_over(member, expenses.values())
}

/// Order-independent balance accumulation over any expense sequence
pub fn balance_over<'a, I>(member: &str, expenses: I) -> f64
where
    I: IntoIterator<Item = &'a Expense>,
{
    expenses.into_iter().fold(0.0, |balance, expense| {
        let mut balance = balance;
        if expense.by == member {
            balance += expense.amount;
        }
        if !expense.involved.is_empty() && expense.involved.iter().any(|name| name == member) {
            balance -= expense.amount / expense.involved.len() as f64;
        }
        balance
    })
}

/// Identity used to match the signed-in user against `by` and `involved`.
///
/// This is the first space-delimited token of the display name, not the
/// email. Members who share a first name are indistinguishable here and
/// their balances merge; callers needing a unique key must use the email.
pub fn display_name_identity(user: Option<&UserIdentity>) -> String {
    user.and_then(|u| u.display_name.as_deref())
        .and_then(|name| name.split(' ').next())
        .filter(|token| !token.is_empty())
        .unwrap_or(FALLBACK_IDENTITY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExpenseId;
    use chrono::TimeZone;

    fn expense(amount: f64, by: &str, involved: &[&str]) -> Expense {
        Expense {
            title: "t".to_string(),
            amount,
            by: by.to_string(),
            involved: involved.iter().map(|s| s.to_string()).collect(),
            timestamp: 0,
            date: String::new(),
        }
    }

    #[test]
    fn test_indian_grouping() {
        let f = FinanceFormatter::new("en-IN", "INR");
        assert_eq!(f.to_currency(210_000_000_000.0), "₹2,10,00,00,00,000");
        assert_eq!(f.to_currency(1234567.0), "₹12,34,567");
        assert_eq!(f.to_currency(999.0), "₹999");
    }

    #[test]
    fn test_thousands_grouping() {
        let f = FinanceFormatter::new("en-US", "USD");
        assert_eq!(f.to_currency(1234567.0), "$1,234,567");
        assert_eq!(f.to_currency(1000.0), "$1,000");
    }

    #[test]
    fn test_rounding_and_sign() {
        let f = FinanceFormatter::new("en-IN", "INR");
        assert_eq!(f.to_currency(149.5), "₹150");
        assert_eq!(f.to_currency(-150.4), "-₹150");
        assert_eq!(f.to_currency(-0.4), "₹0");
        assert_eq!(f.to_currency(f64::NAN), "₹0");
    }

    #[test]
    fn test_unknown_currency_uses_code() {
        let f = FinanceFormatter::new("en-US", "chf");
        assert_eq!(f.to_currency(12.0), "CHF\u{a0}12");
    }

    #[test]
    fn test_day_month_label() {
        let at = Utc.with_ymd_and_hms(2026, 10, 6, 12, 0, 0).unwrap();
        assert_eq!(FinanceFormatter::new("en-IN", "INR").day_month(at), "06 Oct");
        assert_eq!(FinanceFormatter::new("en-US", "USD").day_month(at), "Oct 06");
    }

    #[test]
    fn test_calc_balance_split() {
        let mut ledger = Ledger::new();
        ledger.insert(ExpenseId::new("a"), expense(300.0, "Ann", &["Ann", "Bob"]));

        assert_eq!(calc_balance("Ann", &ledger), 150.0);
        assert_eq!(calc_balance("Bob", &ledger), -150.0);
        assert_eq!(calc_balance("Cid", &ledger), 0.0);
    }

    #[test]
    fn test_empty_participants_contribute_nothing() {
        let mut ledger = Ledger::new();
        ledger.insert(ExpenseId::new("a"), expense(100.0, "Ann", &[]));

        assert_eq!(calc_balance("Ann", &ledger), 100.0);
        assert_eq!(calc_balance("Bob", &ledger), 0.0);
    }

    #[test]
    fn test_display_name_identity() {
        let user = UserIdentity::new("Ann Marie Lee", "ann@example.com", "u1");
        assert_eq!(display_name_identity(Some(&user)), "Ann");

        let mut nameless = user.clone();
        nameless.display_name = None;
        assert_eq!(display_name_identity(Some(&nameless)), FALLBACK_IDENTITY);

        nameless.display_name = Some(" leading".to_string());
        assert_eq!(display_name_identity(Some(&nameless)), FALLBACK_IDENTITY);

        assert_eq!(display_name_identity(None), FALLBACK_IDENTITY);
    }
}
