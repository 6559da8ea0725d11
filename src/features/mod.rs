//! Feature derivation from account records: scalar signals, temporal and
//! text-similarity neighbours, normalization, table assembly.

pub mod distance;
mod normalize;
mod pipeline;
mod scalar;
mod temporal;
mod text;

pub use distance::{damerau_levenshtein, harmonic_mean, levenshtein};
pub use normalize::{min_max, MinMax};
pub use pipeline::FeatureTableBuilder;
pub use scalar::{non_alpha_ratio, ScalarExtractor, ScalarFeatures};
pub use temporal::{find_time_neighbours, TimeNeighbours};
pub use text::{
    column_window_neighbours, text_window_neighbours, RowNeighbours, TextScorer,
};

use serde::{Deserialize, Serialize};

/// Every column the builder knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    SymbInName,
    SymbInEmail,
    TimeDifference,
    NeighbourAbove,
    NeighbourBelow,
    TextNeighbourAbove,
    TextNeighbourBelow,
    UsernameLength,
    NumbersInName,
    EmailLength,
    MatchingNames,
    PatternEmail,
    Country,
    DateLastEmail,
    DateRegistered,
    DateLastLogin,
    MatchingDates,
    UsernameNeighbourAbove,
    UsernameNeighbourBelow,
    EmailNeighbourAbove,
    EmailNeighbourBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

impl FeatureColumn {
    pub fn name(self) -> &'static str {
        use FeatureColumn::*;
        match self {
            SymbInName => "symb_in_name",
            SymbInEmail => "symb_in_email",
            TimeDifference => "time_difference",
            NeighbourAbove => "neighbour_above",
            NeighbourBelow => "neighbour_below",
            TextNeighbourAbove => "text_neighbour_above",
            TextNeighbourBelow => "text_neighbour_below",
            UsernameLength => "username_length",
            NumbersInName => "numbers_in_name",
            EmailLength => "email_length",
            MatchingNames => "matching_names",
            PatternEmail => "pattern_email",
            Country => "country",
            DateLastEmail => "date_last_email",
            DateRegistered => "date_registered",
            DateLastLogin => "date_last_login",
            MatchingDates => "matching_dates",
            UsernameNeighbourAbove => "username_neighbour_above",
            UsernameNeighbourBelow => "username_neighbour_below",
            EmailNeighbourAbove => "email_neighbour_above",
            EmailNeighbourBelow => "email_neighbour_below",
        }
    }

    /// Storage type when the column is not rescaled.
    pub fn natural_type(self) -> ColumnType {
        use FeatureColumn::*;
        match self {
            SymbInName | SymbInEmail | TimeDifference | NeighbourAbove | NeighbourBelow
            | TextNeighbourAbove | TextNeighbourBelow => ColumnType::Real,
            _ => ColumnType::Integer,
        }
    }
}

/// Column layout of the emitted table. The identifier and label columns
/// bracket these in every schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Ratios, time deltas and neighbour text scores
    Compact,
    /// Integer signals and per-column row-window neighbours
    Extended,
}

impl FeatureSchema {
    pub fn columns(self) -> &'static [FeatureColumn] {
        use FeatureColumn::*;
        match self {
            FeatureSchema::Compact => &[
                SymbInName,
                SymbInEmail,
                TimeDifference,
                NeighbourAbove,
                NeighbourBelow,
                TextNeighbourAbove,
                TextNeighbourBelow,
            ],
            FeatureSchema::Extended => &[
                UsernameLength,
                NumbersInName,
                EmailLength,
                MatchingNames,
                PatternEmail,
                Country,
                DateLastEmail,
                DateRegistered,
                DateLastLogin,
                MatchingDates,
                UsernameNeighbourAbove,
                UsernameNeighbourBelow,
                EmailNeighbourAbove,
                EmailNeighbourBelow,
            ],
        }
    }
}

/// Which neighbour pair `text_neighbour_above/below` scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextNeighbourMode {
    /// The records found by the temporal neighbour search
    Temporal,
    /// The first similar record within the row-order radius
    RowWindow,
}

/// One emitted row, values aligned with `FeatureTable::columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub id: i64,
    pub values: Vec<f64>,
    pub is_fake: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub name: String,
    /// Name of the identifier column
    pub id_column: String,
    /// Name of the label column
    pub label_column: String,
    pub columns: Vec<(FeatureColumn, ColumnType)>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn value(&self, row: usize, column: FeatureColumn) -> Option<f64> {
        let idx = self.columns.iter().position(|(c, _)| *c == column)?;
        self.rows.get(row).and_then(|r| r.values.get(idx)).copied()
    }

    pub fn row_by_id(&self, id: i64) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}
