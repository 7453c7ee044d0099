use super::{element_text, parse_selector, text_lines, PageExtractor};
use crate::config::ExtractionSelectors;
use crate::domain::{FinancialsTable, YearFigure};
use crate::error::{Result, ScrapeError};
use crate::normalize::{canonical, parse_number};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(20\d{2}|25\d{2})$").unwrap());
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(20|25)\d{2}").unwrap());

/// The multi-year table showing, per year, an amount and a % change.
pub struct FinancialsExtractor<'a> {
    selectors: &'a ExtractionSelectors,
}

impl<'a> FinancialsExtractor<'a> {
    pub fn new(selectors: &'a ExtractionSelectors) -> Self {
        Self { selectors }
    }

    fn container<'d>(&self, document: &'d Html) -> Result<ElementRef<'d>> {
        let selector = parse_selector(&self.selectors.financials_container)?;
        Ok(document
            .select(&selector)
            .next()
            .unwrap_or_else(|| document.root_element()))
    }

    /// Text after `หน่วย :` on its line, cut before any trailing year.
    fn unit(&self, container: ElementRef<'_>) -> Result<Option<String>> {
        let pattern = format!(r"{}\s*[:：]\s*(.+)", regex::escape(&self.selectors.unit_label));
        let re = Regex::new(&pattern).map_err(|e| ScrapeError::Selector(e.to_string()))?;

        for line in text_lines(container) {
            let Some(caps) = re.captures(&line) else {
                continue;
            };
            let raw = caps[1].split('\t').next().unwrap_or_default();
            let unit = match TRAILING_YEAR.find(raw) {
                Some(m) => &raw[..m.start()],
                None => raw,
            }
            .trim();
            if !unit.is_empty() {
                return Ok(Some(unit.to_string()));
            }
        }
        Ok(None)
    }

    /// Years in header order, if this table is the amount / % change table.
    fn header_years(&self, table: ElementRef<'_>) -> Result<Option<Vec<String>>> {
        let rows = parse_selector("thead tr")?;
        let cells = parse_selector("th, td")?;
        let amount = canonical(&self.selectors.amount_header);
        let change = canonical(&self.selectors.change_header);

        let mut has_subheaders = false;
        let mut years = Vec::new();

        for row in table.select(&rows) {
            let texts: Vec<String> = row.select(&cells).map(element_text).collect();
            let joined = canonical(&texts.join(" "));
            if joined.contains(&amount) && joined.contains(&change) {
                has_subheaders = true;
            }
            years.extend(texts.into_iter().filter(|t| YEAR.is_match(t)));
        }

        Ok((has_subheaders && !years.is_empty()).then_some(years))
    }
}

impl PageExtractor for FinancialsExtractor<'_> {
    type Output = FinancialsTable;

    fn extract(&self, document: &Html) -> Result<FinancialsTable> {
        let container = self.container(document)?;
        let unit = self.unit(container)?;

        let tables = parse_selector("table")?;
        let mut target = None;
        for table in container.select(&tables) {
            if let Some(years) = self.header_years(table)? {
                target = Some((table, years));
                break;
            }
        }

        let Some((table, years)) = target else {
            debug!("No table with amount and % change headers found");
            return Ok(FinancialsTable::empty(unit));
        };

        let body_rows = parse_selector("tbody tr")?;
        let cells = parse_selector("th, td")?;
        let needed = 1 + 2 * years.len();
        let mut result = FinancialsTable::new(unit, years);

        for row in table.select(&body_rows) {
            let texts: Vec<String> = row.select(&cells).map(element_text).collect();
            if texts.len() < needed {
                continue;
            }

            let figures = texts[1..needed]
                .chunks(2)
                .map(|pair| YearFigure {
                    amount: parse_number(&pair[0]),
                    pct_change: parse_number(&pair[1]),
                })
                .collect();
            result.push_row(texts[0].clone(), figures)?;
        }

        debug!(
            "Parsed financials table: {} years, {} rows",
            result.years().len(),
            result.rows().len()
        );
        Ok(result)
    }
}
