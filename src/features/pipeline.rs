//! Feature table assembly: records → scalar signals → temporal neighbours →
//! text neighbours → normalization → rows keyed by identifier.

use super::{
    column_window_neighbours, find_time_neighbours, min_max, text_window_neighbours,
    ColumnType, FeatureColumn, FeatureRow, FeatureTable, RowNeighbours, ScalarExtractor,
    ScalarFeatures, TextNeighbourMode, TextScorer, TimeNeighbours,
};
use crate::config::FeaturesConfig;
use crate::error::{Error, Result};
use crate::records::Dataset;
use tracing::{debug, info};

/// Intermediate per-row results shared by the column projections.
struct Derived {
    scalars: Vec<ScalarFeatures>,
    time: Vec<TimeNeighbours>,
    text_above: Vec<Option<f64>>,
    text_below: Vec<Option<f64>>,
    username_window: Vec<RowNeighbours>,
    email_window: Vec<RowNeighbours>,
}

pub struct FeatureTableBuilder {
    config: FeaturesConfig,
}

impl FeatureTableBuilder {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Derive the configured schema for every record of `dataset`.
    ///
    /// Fails when the identifier or label column name repeats a feature
    /// column name (or each other), since the stored table could not hold both.
    pub fn build(
        &self,
        name: &str,
        dataset: &Dataset,
        id_column: &str,
        label_column: &str,
    ) -> Result<FeatureTable> {
        let columns = self.config.schema.columns();
        if id_column == label_column {
            return Err(Error::ColumnClash(label_column.to_string()));
        }
        if let Some(col) = columns
            .iter()
            .find(|c| c.name() == id_column || c.name() == label_column)
        {
            return Err(Error::ColumnClash(col.name().to_string()));
        }
        let derived = self.derive(dataset, columns);

        let mut layout = Vec::with_capacity(columns.len());
        let mut values: Vec<Vec<f64>> = Vec::with_capacity(columns.len());
        for &col in columns {
            let raw = project(col, &derived);
            if self.config.normalize.contains(&col) {
                layout.push((col, ColumnType::Real));
                values.push(min_max(&raw));
            } else {
                layout.push((col, col.natural_type()));
                values.push(raw.into_iter().map(|v| v.unwrap_or(0.0)).collect());
            }
        }

        let rows = dataset
            .records()
            .iter()
            .enumerate()
            .map(|(i, r)| FeatureRow {
                id: r.id,
                values: values.iter().map(|col| col[i]).collect(),
                is_fake: i64::from(r.is_fake),
            })
            .collect::<Vec<_>>();

        info!(
            table = name,
            rows = rows.len(),
            schema = ?self.config.schema,
            "feature table built"
        );
        Ok(FeatureTable {
            name: name.to_string(),
            id_column: id_column.to_string(),
            label_column: label_column.to_string(),
            columns: layout,
            rows,
        })
    }

    fn derive(&self, dataset: &Dataset, columns: &[FeatureColumn]) -> Derived {
        use FeatureColumn::*;
        let records = dataset.records();
        let threshold = self.config.edit_threshold;
        let radius = self.config.radius_for(records.len());
        let wants = |set: &[FeatureColumn]| set.iter().any(|c| columns.contains(c));

        let extractor = ScalarExtractor::new(threshold, self.config.round_dates_to_secs);
        let scalars = records.iter().map(|r| extractor.extract(r)).collect();

        let wants_text = wants(&[TextNeighbourAbove, TextNeighbourBelow]);
        let wants_time = wants(&[NeighbourAbove, NeighbourBelow])
            || (wants_text && self.config.text_neighbours == TextNeighbourMode::Temporal);
        let time = if wants_time {
            let instants: Vec<_> = records.iter().map(|r| r.registered).collect();
            find_time_neighbours(&instants)
        } else {
            Vec::new()
        };
        debug!(rows = time.len(), "temporal neighbours");

        let text_pairs: Vec<RowNeighbours> = match (wants_text, self.config.text_neighbours) {
            (false, _) => Vec::new(),
            (true, TextNeighbourMode::Temporal) => time
                .iter()
                .map(|t| RowNeighbours {
                    above: t.above,
                    below: t.below,
                })
                .collect(),
            (true, TextNeighbourMode::RowWindow) => {
                text_window_neighbours(records, radius, threshold)
            }
        };
        let scorer = TextScorer::new(records);
        let text_above = text_pairs
            .iter()
            .enumerate()
            .map(|(i, p)| scorer.score_opt(i, p.above))
            .collect();
        let text_below = text_pairs
            .iter()
            .enumerate()
            .map(|(i, p)| scorer.score_opt(i, p.below))
            .collect();
        debug!(rows = text_pairs.len(), mode = ?self.config.text_neighbours, "text neighbours");

        let username_window = if wants(&[UsernameNeighbourAbove, UsernameNeighbourBelow]) {
            let names: Vec<Option<&str>> = records.iter().map(|r| Some(r.username.as_str())).collect();
            column_window_neighbours(&names, radius, threshold)
        } else {
            Vec::new()
        };
        let email_window = if wants(&[EmailNeighbourAbove, EmailNeighbourBelow]) {
            let emails: Vec<Option<&str>> = records.iter().map(|r| r.email.as_deref()).collect();
            column_window_neighbours(&emails, radius, threshold)
        } else {
            Vec::new()
        };

        Derived {
            scalars,
            time,
            text_above,
            text_below,
            username_window,
            email_window,
        }
    }
}

fn flag(b: bool) -> Option<f64> {
    Some(if b { 1.0 } else { 0.0 })
}

/// Raw (unscaled) column values; `None` marks a missing neighbour.
fn project(col: FeatureColumn, d: &Derived) -> Vec<Option<f64>> {
    use FeatureColumn::*;
    let rows = |w: &[RowNeighbours], above: bool| -> Vec<Option<f64>> {
        w.iter()
            .enumerate()
            .map(|(i, n)| {
                let dist = if above { n.above_rows(i) } else { n.below_rows(i) };
                dist.map(|v| v as f64)
            })
            .collect()
    };
    match col {
        SymbInName => d.scalars.iter().map(|s| Some(s.symb_in_name)).collect(),
        SymbInEmail => d.scalars.iter().map(|s| Some(s.symb_in_email)).collect(),
        TimeDifference => d.scalars.iter().map(|s| Some(s.time_difference)).collect(),
        UsernameLength => d.scalars.iter().map(|s| Some(s.username_length as f64)).collect(),
        NumbersInName => d.scalars.iter().map(|s| flag(s.numbers_in_name)).collect(),
        EmailLength => d.scalars.iter().map(|s| Some(s.email_length as f64)).collect(),
        MatchingNames => d.scalars.iter().map(|s| flag(s.matching_names)).collect(),
        PatternEmail => d.scalars.iter().map(|s| flag(s.pattern_email)).collect(),
        Country => d.scalars.iter().map(|s| flag(s.country_present)).collect(),
        DateLastEmail => d.scalars.iter().map(|s| flag(s.date_last_email_present)).collect(),
        DateRegistered => d.scalars.iter().map(|s| Some(s.date_registered as f64)).collect(),
        DateLastLogin => d.scalars.iter().map(|s| Some(s.date_last_login as f64)).collect(),
        MatchingDates => d.scalars.iter().map(|s| flag(s.matching_dates)).collect(),
        NeighbourAbove => d.time.iter().map(|t| t.above_secs).collect(),
        NeighbourBelow => d.time.iter().map(|t| t.below_secs).collect(),
        TextNeighbourAbove => d.text_above.clone(),
        TextNeighbourBelow => d.text_below.clone(),
        UsernameNeighbourAbove => rows(d.username_window.as_slice(), true),
        UsernameNeighbourBelow => rows(d.username_window.as_slice(), false),
        EmailNeighbourAbove => rows(d.email_window.as_slice(), true),
        EmailNeighbourBelow => rows(d.email_window.as_slice(), false),
    }
}
