use super::JuristicId;
use crate::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Flat field name -> text mapping; whatever the page happened to render.
pub type Profile = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YearFigure {
    pub amount: Option<f64>,
    pub pct_change: Option<f64>,
}

/// One line of the financials table. Figures are positional: entry `i`
/// belongs to `years[i]` of the owning table.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRow {
    label: String,
    figures: Vec<YearFigure>,
}

impl FinancialRow {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn figures(&self) -> &[YearFigure] {
        &self.figures
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialsTable {
    unit: Option<String>,
    years: Vec<String>,
    rows: Vec<FinancialRow>,
}

impl FinancialsTable {
    pub fn new(unit: Option<String>, years: Vec<String>) -> Self {
        Self {
            unit,
            years,
            rows: Vec::new(),
        }
    }

    /// Table with no years and no rows, keeping whatever unit was found.
    pub fn empty(unit: Option<String>) -> Self {
        Self::new(unit, Vec::new())
    }

    /// Append a row. It must carry exactly one figure per year.
    pub fn push_row(&mut self, label: impl Into<String>, figures: Vec<YearFigure>) -> Result<()> {
        if figures.len() != self.years.len() {
            return Err(ScrapeError::Other(format!(
                "row has {} figures for {} years",
                figures.len(),
                self.years.len()
            )));
        }
        self.rows.push(FinancialRow {
            label: label.into(),
            figures,
        });
        Ok(())
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn rows(&self) -> &[FinancialRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct RowView<'a> {
    years: &'a [String],
    row: &'a FinancialRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.years.len()))?;
        map.serialize_entry("label", &self.row.label)?;
        for (year, figure) in self.years.iter().zip(&self.row.figures) {
            map.serialize_entry(year, figure)?;
        }
        map.end()
    }
}

impl Serialize for FinancialsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows: Vec<RowView<'_>> = self
            .rows
            .iter()
            .map(|row| RowView {
                years: &self.years,
                row,
            })
            .collect();

        let mut state = serializer.serialize_struct("FinancialsTable", 3)?;
        state.serialize_field("unit", &self.unit)?;
        state.serialize_field("years", &self.years)?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

/// Everything written for one juristic ID.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRecord {
    pub juristic_id: JuristicId,
    pub source_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub profile: Profile,
    pub directors: Vec<String>,
    pub financials: FinancialsTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ScrapeRecord {
    pub fn new(juristic_id: JuristicId) -> Self {
        Self {
            juristic_id,
            source_url: None,
            scraped_at: Utc::now(),
            profile: Profile::new(),
            directors: Vec::new(),
            financials: FinancialsTable::default(),
            note: None,
        }
    }
}

/// Printed to stdout when a run fails.
#[derive(Debug, Serialize)]
pub struct ErrorRecord<'a> {
    pub juristic_id: &'a str,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn figure(amount: f64, pct: Option<f64>) -> YearFigure {
        YearFigure {
            amount: Some(amount),
            pct_change: pct,
        }
    }

    #[test]
    fn rejects_rows_with_wrong_year_count() {
        let mut table = FinancialsTable::new(None, vec!["2565".into(), "2566".into()]);
        assert!(table.push_row("รายได้รวม", vec![figure(1.0, None)]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn rows_serialize_year_keys_in_header_order() {
        let mut table = FinancialsTable::new(
            Some("บาท".into()),
            vec!["2566".into(), "2565".into()],
        );
        table
            .push_row(
                "สินทรัพย์รวม",
                vec![figure(1200.0, Some(20.0)), figure(1000.0, None)],
            )
            .unwrap();

        let text = serde_json::to_string(&table).unwrap();
        let pos_2566 = text.find("\"2566\":{").unwrap();
        let pos_2565 = text.find("\"2565\":{").unwrap();
        assert!(pos_2566 < pos_2565);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "unit": "บาท",
                "years": ["2566", "2565"],
                "rows": [{
                    "label": "สินทรัพย์รวม",
                    "2566": { "amount": 1200.0, "pct_change": 20.0 },
                    "2565": { "amount": 1000.0, "pct_change": null }
                }]
            })
        );
    }

    #[test]
    fn empty_table_shape() {
        let value = serde_json::to_value(FinancialsTable::empty(None)).unwrap();
        assert_eq!(value, json!({ "unit": null, "years": [], "rows": [] }));
    }

    #[test]
    fn note_is_omitted_when_absent() {
        let record = ScrapeRecord::new(JuristicId::parse("0105542065502").unwrap());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("note").is_none());
        assert_eq!(value["juristic_id"], "0105542065502");
        assert_eq!(value["financials"]["rows"], json!([]));
    }
}
