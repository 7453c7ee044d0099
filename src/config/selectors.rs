use crate::error::{Result, ScrapeError};
use crate::infrastructure::Locator;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One profile field found by the text of its label.
///
/// Each entry of `labels` is a set of fragments that must all appear in the
/// label element's own text; the first label yielding a value wins.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelledField {
    pub key: String,
    pub labels: Vec<Vec<String>>,
}

impl LabelledField {
    fn new(key: &str, labels: &[&[&str]]) -> Self {
        Self {
            key: key.to_string(),
            labels: labels
                .iter()
                .map(|fragments| fragments.iter().map(|f| f.to_string()).collect())
                .collect(),
        }
    }
}

/// Selectors and text patterns for the live page. Every field has a
/// built-in default; a JSON file may override any subset of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    pub cookie_buttons: Vec<Locator>,
    pub id_search_tabs: Vec<Locator>,
    pub search_label: Locator,
    pub search_inputs: Vec<Locator>,
    pub search_input_fallbacks: Vec<Locator>,
    pub search_buttons: Vec<Locator>,
    pub suggestion_fallback: Locator,
    pub results: Vec<Locator>,
    pub result_rows: Locator,
    pub financials_menu: Vec<Locator>,
    pub financials_submenu: Vec<Locator>,
    pub financials_submenu_fallbacks: Vec<Locator>,
    pub financials_container: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        let css = |s: &str| Locator::css(s);
        Self {
            cookie_buttons: [
                "ยอมรับ",
                "ยินยอม",
                "ตกลง",
                "รับทราบ",
                "Accept",
                "Agree",
                "I agree",
                "Accept all",
            ]
            .iter()
            .map(|name| Locator::role("button", *name))
            .collect(),
            id_search_tabs: vec![
                Locator::role("tab", "เลข|ID|Registration|Tax"),
                Locator::role("button", "เลข|ID|Registration|Tax"),
            ],
            search_label: Locator::label("ค้นหา|นิติบุคคล|เลข|Juristic|Registration|Search"),
            search_inputs: [
                "#key-word",
                r#"input[name="textSearch"]"#,
                "form#form input.form-control",
                r#"input[name="search"]"#,
                r#"input[id*="search"]"#,
                r#"input[placeholder*="ค้นหา"]"#,
                r#"input[placeholder*="นิติบุคคล"]"#,
                r#"input[placeholder*="เลข"]"#,
                r#"input[placeholder*="Juristic" i]"#,
                r#"input[placeholder*="Registration" i]"#,
                r#"input[placeholder*="Tax" i]"#,
                r#"input[placeholder*="Search" i]"#,
                r#"input[type="search"]"#,
                r#"input[type="text"]"#,
            ]
            .iter()
            .map(|s| css(s))
            .collect(),
            search_input_fallbacks: vec![
                css(r#"input:not([type="hidden"])"#),
                css("mat-form-field input"),
            ],
            search_buttons: vec![
                css("#searchicon"),
                Locator::role("button", "ค้นหา|search"),
                css(r#"button[type="submit"]"#),
                css(r#"button[id*="search"]"#),
            ],
            suggestion_fallback: css("li[role='option']"),
            results: vec![
                css(r#"[data-testid*="result" i]"#),
                css(r#".results, #results, [class*="result" i]"#),
                css(r#"table, ul[role="list"], div[role="list"]"#),
                css(r#"mat-table, .mat-table, [role="table"]"#),
                css(r#"[role="row"], .mat-row, tr"#),
            ],
            result_rows: css(r#"[role="row"], .mat-row, tr"#),
            financials_menu: vec![css("#menu2"), Locator::text("ข้อมูลงบการเงิน")],
            financials_submenu: vec![css("#menu22")],
            financials_submenu_fallbacks: vec![
                Locator::role("link", "งบการเงิน|Financial"),
                Locator::text("งบการเงิน|Financial"),
            ],
            financials_container: "#companyProfileTab22, .tab22".to_string(),
        }
    }
}

/// Selectors and text patterns for the HTML snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSelectors {
    pub title: Vec<String>,
    pub fields: Vec<LabelledField>,
    pub directors_label: Vec<String>,
    pub max_directors: usize,
    pub raw_text_roots: Vec<String>,
    pub raw_text_limit: usize,
    pub financials_container: String,
    pub amount_header: String,
    pub change_header: String,
    pub unit_label: String,
    pub detail_markers: Vec<String>,
    pub blocked_markers: Vec<String>,
}

impl Default for ExtractionSelectors {
    fn default() -> Self {
        Self {
            title: ["h1", "h2", r#"[data-testid*="title" i]"#, r#"[data-testid*="name" i]"#]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fields: vec![
                LabelledField::new("name_th", &[&["ชื่อ", "ไทย"], &["ชื่อนิติบุคคล"]]),
                LabelledField::new("name_en", &[&["ชื่อ", "อังกฤษ"], &["Name", "(English"]]),
                LabelledField::new("status", &[&["สถานะ"], &["Status"]]),
                LabelledField::new("address", &[&["ที่ตั้ง"], &["ที่อยู่"], &["Address"]]),
                LabelledField::new(
                    "registered_capital",
                    &[&["ทุน", "จดทะเบียน"], &["Registered", "capital"]],
                ),
                LabelledField::new(
                    "registration_date",
                    &[&["วันที่จดทะเบียน"], &["Registration", "date"]],
                ),
                LabelledField::new("business_type", &[&["ประเภทนิติบุคคล"], &["Juristic", "type"]]),
            ],
            directors_label: vec!["กรรมการ".to_string()],
            max_directors: 20,
            raw_text_roots: vec!["main".to_string(), "body".to_string()],
            raw_text_limit: 4000,
            financials_container: "#companyProfileTab22, .tab22".to_string(),
            amount_header: "จำนวนเงิน".to_string(),
            change_header: "%เปลี่ยนแปลง".to_string(),
            unit_label: "หน่วย".to_string(),
            detail_markers: vec!["ชื่อนิติบุคคล".to_string(), "เลขทะเบียนนิติบุคคล".to_string()],
            blocked_markers: vec![
                "Request Rejected".to_string(),
                "The requested URL was rejected".to_string(),
                "Access Denied".to_string(),
                "Your support ID is".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub page: PageSelectors,
    pub extraction: ExtractionSelectors,
}

impl SelectorConfig {
    /// Built-in selectors, or the given JSON file layered over them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let config = serde_json::from_str(&content).map_err(|e| {
                    ScrapeError::Config(format!("{}: {}", path.display(), e))
                })?;
                info!("Loaded selector overrides from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}
