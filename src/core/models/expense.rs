use crate::core::settlement::Expense;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Accommodation,
    Transport,
    Food,
    Activities,
    Shopping,
    #[default]
    Misc,
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Activities => "activities",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Misc => "misc",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseRecord {
    pub id: String,
    pub trip_id: String,
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub paid_by: String,
    pub split_among: Vec<String>,
    pub notes: String,
    pub created_by: String,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: DateTime<Utc>,
}

impl From<&ExpenseRecord> for Expense {
    fn from(record: &ExpenseRecord) -> Self {
        Expense {
            id: record.id.clone(),
            payer: record.paid_by.clone(),
            amount: record.amount,
            split_among: record.split_among.clone(),
        }
    }
}

/// Fields accepted when recording an expense.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub paid_by: String,
    #[serde(default)]
    pub split_among: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<ExpenseCategory>,
    pub paid_by: Option<String>,
    pub split_among: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryItem {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub total: f64,
    pub count: usize,
    pub items: Vec<CategoryItem>,
}
