use crate::error::OpError;
use crate::table::TableName;
use tabled::Tabled;

/// Result for one table (export) or one file (import).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: String,
    pub target: Option<TableName>,
    pub result: Result<(), String>,
}

impl ItemOutcome {
    pub fn ok(item: impl Into<String>, target: TableName) -> Self {
        ItemOutcome {
            item: item.into(),
            target: Some(target),
            result: Ok(()),
        }
    }

    pub fn failed(item: impl Into<String>, target: Option<TableName>, error: &OpError) -> Self {
        ItemOutcome {
            item: item.into(),
            target,
            result: Err(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Ordered outcomes of an export or import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Aggregate outcome: true iff the batch ran at least one item and none failed.
    pub fn succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.failed_count() == 0
    }

    pub fn into_result(self) -> Result<Self, OpError> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(OpError::PartialBatchFailure {
                failed: self.failed_count(),
                total: self.total(),
            })
        }
    }

    pub fn rows(&self) -> Vec<OutcomeRow> {
        self.outcomes.iter().map(OutcomeRow::from).collect()
    }
}

#[derive(Debug, Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Item")]
    pub item: String,
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&ItemOutcome> for OutcomeRow {
    fn from(outcome: &ItemOutcome) -> Self {
        OutcomeRow {
            item: outcome.item.clone(),
            table: outcome
                .target
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".into()),
            status: match &outcome.result {
                Ok(()) => "ok".into(),
                Err(e) => format!("failed: {}", e),
            },
        }
    }
}
