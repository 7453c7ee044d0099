use crate::config::{Config, ExtractionSelectors};
use crate::domain::{FinancialsTable, ScrapeRecord};
use crate::error::{Result, ScrapeError};
use crate::infrastructure::{BrowserSession, FileSystemStore, Locator, MocClient};
use crate::scrapers::{FinancialsExtractor, PageExtractor, PageState, ProfileExtractor};
use indicatif::ProgressBar;
use scraper::Html;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const RESULTS_PAGE_NOTE: &str = "Extracted from results page; detail click failed";

const COOKIE_TIMEOUT: Duration = Duration::from_millis(1500);
const TAB_TIMEOUT: Duration = Duration::from_millis(1200);
const INPUT_TIMEOUT: Duration = Duration::from_secs(5);
const BUTTON_TIMEOUT: Duration = Duration::from_secs(2);
const SEARCH_SETTLE: Duration = Duration::from_secs(8);
const RESULTS_SETTLE: Duration = Duration::from_secs(10);
const RESULT_TIMEOUT: Duration = Duration::from_secs(3);
const RESULT_ROUNDS: usize = 2;
const FINANCIALS_CONTAINER_TIMEOUT: Duration = Duration::from_secs(15);
const FINANCIALS_TABLE_POLLS: usize = 30;
const FINANCIALS_TABLE_INTERVAL: Duration = Duration::from_millis(500);

/// Drives one lookup: search, open the company, read profile and
/// financials, write the record.
pub struct ScrapingService<'a> {
    config: &'a Config,
    store: FileSystemStore,
    progress: ProgressBar,
}

impl<'a> ScrapingService<'a> {
    pub fn new(config: &'a Config, store: FileSystemStore, progress: ProgressBar) -> Self {
        info!("Created new Scraping service");
        Self {
            config,
            store,
            progress,
        }
    }

    fn step(&self, message: &str) {
        info!("{}", message);
        self.progress.set_message(message.to_string());
    }

    /// Scrape, enrich and write the record; returns the path written.
    pub async fn run(&self) -> Result<PathBuf> {
        let result = self.scrape().await;
        self.progress.finish_and_clear();
        let mut record = result?;

        if self.config.args.api_profile {
            self.merge_api_profile(&mut record).await?;
        }

        let path = self
            .config
            .output_path(self.store.record_path(&self.config.juristic_id));
        self.store.write_json_file(&path, &record)?;
        Ok(path)
    }

    async fn merge_api_profile(&self, record: &mut ScrapeRecord) -> Result<()> {
        let client = MocClient::new(self.config.args.api_url.clone())?;
        for (key, value) in client.profile_fields(&self.config.juristic_id).await {
            record.profile.entry(key).or_insert(value);
        }
        Ok(())
    }

    /// One browser session for the whole run, closed on every path.
    pub async fn scrape(&self) -> Result<ScrapeRecord> {
        self.step("Launching browser");
        let session = BrowserSession::launch(&self.config.browser_options()).await?;

        let result = self.scrape_with(&session).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        result
    }

    async fn scrape_with(&self, session: &BrowserSession) -> Result<ScrapeRecord> {
        let id = &self.config.juristic_id;
        let mut record = ScrapeRecord::new(id.clone());

        self.step(&format!("Navigating to {}", self.config.args.search_url));
        session.goto(&self.config.args.search_url).await?;
        self.accept_cookies(session).await;
        self.classify(session).await?;

        self.step("Searching for juristic ID");
        self.fill_search_and_submit(session).await?;
        session.wait_for_network_idle(SEARCH_SETTLE).await;

        if self.classify(session).await? != PageState::Detail {
            let results = self.wait_for_results(session).await?;
            if !self.open_first_result(session, &results).await {
                warn!("Could not open details; extracting from results page");
                self.read_profile(session, &mut record).await?;
                record.note = Some(RESULTS_PAGE_NOTE.to_string());
                return Ok(record);
            }
        }

        self.step("Reading company profile");
        self.read_profile(session, &mut record).await?;

        self.step("Opening financials tab");
        if !self.goto_financials_tab(session).await {
            return Err(ScrapeError::NotFound("financials table".to_string()));
        }

        let html = session.content().await?;
        record.financials = parse_financials(&html, &self.config.selectors.extraction)?;

        for row in record.financials.rows() {
            let figures: Vec<String> = record
                .financials
                .years()
                .iter()
                .zip(row.figures())
                .map(|(year, figure)| format!("{}={:?}", year, figure.amount))
                .collect();
            debug!("{}: {}", row.label(), figures.join(", "));
        }
        if record.financials.is_empty() {
            warn!("Financials tab has no data rows");
        }
        info!(
            "Financials: {} rows over {} years (unit: {})",
            record.financials.rows().len(),
            record.financials.years().len(),
            record.financials.unit().unwrap_or("unknown")
        );

        Ok(record)
    }

    /// Snapshot the page and fail fast on a firewall rejection.
    async fn classify(&self, session: &BrowserSession) -> Result<PageState> {
        let html = session.content().await?;
        let state = PageState::classify(
            &Html::parse_document(&html),
            &self.config.juristic_id,
            &self.config.selectors.extraction,
        );
        debug!("Page state: {:?}", state);

        if let PageState::Blocked(marker) = state {
            self.dump_debug(session, "debug_blocked_page").await;
            return Err(ScrapeError::Blocked(marker));
        }
        Ok(state)
    }

    async fn read_profile(&self, session: &BrowserSession, record: &mut ScrapeRecord) -> Result<()> {
        let html = session.content().await?;
        apply_profile(record, &html, &self.config.selectors.extraction)?;
        record.source_url = session.url().await;

        info!(
            "Profile: {} fields, {} directors",
            record.profile.len(),
            record.directors.len()
        );
        Ok(())
    }

    async fn accept_cookies(&self, session: &BrowserSession) {
        if session
            .try_click(&self.config.selectors.page.cookie_buttons, COOKIE_TIMEOUT)
            .await
        {
            info!("Accepted cookie banner");
        }
    }

    async fn find_search_input(&self, session: &BrowserSession) -> Option<Locator> {
        let page = &self.config.selectors.page;

        if session.is_visible(&page.search_label).await {
            return Some(page.search_label.clone());
        }
        if let Some(locator) = session.first_visible(&page.search_inputs, INPUT_TIMEOUT).await {
            return Some(locator.clone());
        }
        session
            .first_visible(&page.search_input_fallbacks, Duration::ZERO)
            .await
            .cloned()
    }

    async fn fill_search_and_submit(&self, session: &BrowserSession) -> Result<()> {
        let page = &self.config.selectors.page;
        let id = self.config.juristic_id.as_str();

        if session.try_click(&page.id_search_tabs, TAB_TIMEOUT).await {
            debug!("Switched to ID search tab");
        }

        let Some(input) = self.find_search_input(session).await else {
            self.dump_debug(session, "debug_search_page").await;
            return Err(ScrapeError::NotFound("search input".to_string()));
        };

        debug!("Typing juristic ID into {}", input);
        session.fill(&input, id).await?;
        session.press_enter(&input).await?;

        if session.try_click(&page.search_buttons, BUTTON_TIMEOUT).await {
            debug!("Clicked search button");
        }

        let suggestion = Locator::literal_text(id);
        let picked = if session.is_visible(&suggestion).await {
            session.click(&suggestion).await
        } else if session
            .wait_visible(&page.suggestion_fallback, TAB_TIMEOUT)
            .await
        {
            session.click(&page.suggestion_fallback).await
        } else {
            Ok(false)
        };
        match picked {
            Ok(true) => debug!("Picked autocomplete suggestion"),
            Ok(false) => {}
            Err(e) => debug!("Suggestion click failed: {}", e),
        }

        Ok(())
    }

    async fn wait_for_results(&self, session: &BrowserSession) -> Result<Locator> {
        let id = self.config.juristic_id.as_str();
        let mut candidates = vec![Locator::role("link", regex::escape(id))];
        candidates.extend(self.config.selectors.page.results.iter().cloned());

        session.wait_for_network_idle(RESULTS_SETTLE).await;

        for round in 0..RESULT_ROUNDS {
            if let Some(found) = session.first_visible(&candidates, RESULT_TIMEOUT).await {
                info!("Found results via {}", found);
                return Ok(found.clone());
            }
            debug!("No results yet (round {})", round + 1);
            sleep(Duration::from_secs(1)).await;
        }

        self.dump_debug(session, "debug_results_page").await;
        Err(ScrapeError::NotFound("search results".to_string()))
    }

    /// Link inside the result, then the first row, then the result itself.
    async fn open_first_result(&self, session: &BrowserSession, results: &Locator) -> bool {
        let rows = &self.config.selectors.page.result_rows;

        let mut opened = matches!(session.click_link_within(results).await, Ok(true));
        if !opened && session.is_visible(rows).await {
            opened = matches!(session.click(rows).await, Ok(true));
        }
        if !opened {
            opened = matches!(session.click(results).await, Ok(true));
        }

        if opened {
            info!("Opening first result");
            session.wait_for_network_idle(RESULTS_SETTLE).await;
        }
        opened
    }

    async fn goto_financials_tab(&self, session: &BrowserSession) -> bool {
        let page = &self.config.selectors.page;

        session
            .try_click(&page.financials_menu, COOKIE_TIMEOUT)
            .await;
        if !session
            .try_click(&page.financials_submenu, BUTTON_TIMEOUT)
            .await
        {
            session
                .try_click(&page.financials_submenu_fallbacks, Duration::from_millis(2500))
                .await;
        }
        session.wait_for_network_idle(RESULTS_SETTLE).await;

        let container = Locator::css(page.financials_container.as_str());
        if !session
            .wait_visible(&container, FINANCIALS_CONTAINER_TIMEOUT)
            .await
        {
            warn!("Financials container never became visible");
            self.dump_debug(session, "debug_financials_tab").await;
            return false;
        }

        if !session
            .wait_for_text(&page.financials_container, 50, FINANCIALS_CONTAINER_TIMEOUT)
            .await
        {
            debug!("Financials container is still nearly empty");
        }

        for _ in 0..FINANCIALS_TABLE_POLLS {
            if session
                .has_visible_within(&page.financials_container, "table")
                .await
            {
                return true;
            }
            sleep(FINANCIALS_TABLE_INTERVAL).await;
        }

        warn!("No table rendered in the financials tab");
        self.dump_debug(session, "debug_financials_tab").await;
        false
    }

    /// Screenshot and HTML of the current page, only with --verbose.
    async fn dump_debug(&self, session: &BrowserSession, name: &str) {
        if !self.config.args.verbose {
            return;
        }

        let png = self.store.debug_path(name, "png");
        if let Err(e) = session.screenshot(&png).await {
            debug!("Screenshot failed: {}", e);
        }

        match session.content().await {
            Ok(html) => {
                if let Err(e) = self.store.write_debug_html(name, &html) {
                    debug!("Writing debug HTML failed: {}", e);
                }
            }
            Err(e) => debug!("Reading page content failed: {}", e),
        }
    }
}

fn apply_profile(record: &mut ScrapeRecord, html: &str, selectors: &ExtractionSelectors) -> Result<()> {
    let data = ProfileExtractor::new(selectors).extract(&Html::parse_document(html))?;
    record.profile.extend(data.fields);
    record.directors = data.directors;
    Ok(())
}

fn parse_financials(html: &str, selectors: &ExtractionSelectors) -> Result<FinancialsTable> {
    FinancialsExtractor::new(selectors).extract(&Html::parse_document(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JuristicId;
    use serde_json::{json, Value};

    const COMPANY_PAGE: &str = include_str!("../../tests/fixtures/company_profile.html");

    fn record_from_fixture() -> ScrapeRecord {
        let selectors = ExtractionSelectors::default();
        let mut record = ScrapeRecord::new(JuristicId::parse("0105542065502").unwrap());
        apply_profile(&mut record, COMPANY_PAGE, &selectors).unwrap();
        record.financials = parse_financials(COMPANY_PAGE, &selectors).unwrap();
        record
    }

    #[test]
    fn record_matches_documented_shape() {
        let value = serde_json::to_value(record_from_fixture()).unwrap();

        assert_eq!(value["juristic_id"], "0105542065502");
        assert!(value["scraped_at"].is_string());
        assert!(value["profile"].as_object().unwrap().values().all(Value::is_string));
        assert_eq!(value["profile"]["status"], "ยังดำเนินกิจการอยู่");
        assert_eq!(value["profile"]["name_en"], "EXAMPLE TRADING COMPANY LIMITED");
        assert_eq!(value["directors"], json!(["นาย สมชาย ใจดี", "นาง สมหญิง ใจงาม"]));

        let financials = &value["financials"];
        assert_eq!(financials["unit"], "บาท");
        assert_eq!(financials["years"], json!(["2564", "2565", "2566"]));

        let rows = financials["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            json!({
                "label": "รายได้รวม",
                "2564": { "amount": 10000000.0, "pct_change": null },
                "2565": { "amount": 12500000.0, "pct_change": 25.0 },
                "2566": { "amount": 11250000.0, "pct_change": -10.0 }
            })
        );
        assert_eq!(rows[3]["label"], "กำไร(ขาดทุน)สุทธิ");
        assert_eq!(rows[3]["2565"]["amount"], json!(-350000.0));
        assert!(value.get("note").is_none());
    }

    #[test]
    fn every_row_has_exactly_the_header_years() {
        let value = serde_json::to_value(record_from_fixture()).unwrap();
        let years: Vec<&str> = value["financials"]["years"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        for row in value["financials"]["rows"].as_array().unwrap() {
            let mut keys: Vec<&str> = row
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .filter(|k| *k != "label")
                .collect();
            keys.sort_unstable();
            let mut expected = years.clone();
            expected.sort_unstable();
            assert_eq!(keys, expected);
        }
    }
}
