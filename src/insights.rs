//! Rotating status banner

/// Cycles through a fixed pool of banner messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRotation {
    pool: Vec<String>,
    index: usize,
}

impl InsightRotation {
    pub fn new(pool: Vec<String>) -> Self {
        Self { pool, index: 0 }
    }

    /// Standard pool; one message reflects the current member count
    pub fn for_members(member_count: usize) -> Self {
        Self::new(vec![
            "Financial integrity at 100%. Cloud nodes synchronized.".to_string(),
            "Spending velocity is within predicted thresholds.".to_string(),
            format!("Monitoring activity for {} authenticated users.", member_count),
            "Viewport reconciliation complete.".to_string(),
        ])
    }

    /// Message the next tick will show, without advancing
    pub fn peek(&self) -> Option<&str> {
        if self.pool.is_empty() {
            return None;
        }
        Some(&self.pool[self.index % self.pool.len()])
    }

    /// Message for the next timer tick, wrapping around the pool
    pub fn next_message(&mut self) -> Option<&str> {
        if self.pool.is_empty() {
            return None;
        }
        let at = self.index % self.pool.len();
        self.index += 1;
        Some(&self.pool[at])
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
