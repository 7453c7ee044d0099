//! DOM-extraction heuristics over an HTML snapshot of the page.

use crate::error::{Result, ScrapeError};
use crate::normalize::{collapse_whitespace, contains_all};
use scraper::{ElementRef, Html, Selector};

pub(crate) mod financials;
pub(crate) mod page_state;
pub(crate) mod profile;

pub use financials::FinancialsExtractor;
pub use page_state::PageState;
pub use profile::ProfileExtractor;

pub trait PageExtractor {
    type Output;

    fn extract(&self, document: &Html) -> Result<Self::Output>;
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "section", "table",
    "tbody", "thead", "tfoot", "tr", "ul",
];

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector(format!("{selector}: {e}")))
}

/// Text of `el` as rendered, skipping scripts and styles, whitespace
/// collapsed. Inline markup adds no separator; block boundaries and table
/// cells become a single space.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut buffer = String::new();
    push_lines(el, &mut buffer);
    collapse_whitespace(&buffer)
}

/// Text nodes that are direct children of `el`.
pub fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rendered-ish lines of `el`: block elements start a new line, table
/// cells are tab separated. Lines are trimmed and never empty.
pub fn text_lines(el: ElementRef<'_>) -> Vec<String> {
    let mut buffer = String::new();
    push_lines(el, &mut buffer);
    buffer
        .lines()
        .map(|line| {
            line.split('\t')
                .map(collapse_whitespace)
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn push_lines(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.replace(['\n', '\r', '\t'], " "));
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            push_lines(child_el, out);
            if block {
                out.push('\n');
            } else if name == "td" || name == "th" {
                out.push('\t');
            }
        }
    }
}

/// First match of the first selector in the chain with non-empty text.
/// Only the first match of each selector is considered.
pub fn first_text(document: &Html, selectors: &[String]) -> Result<Option<String>> {
    for selector in selectors {
        let selector = parse_selector(selector)?;
        if let Some(el) = document.select(&selector).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

/// Root element for text searches: `<body>` when present.
pub fn search_root(document: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element())
}

/// First element, in document order, whose own text contains every fragment.
pub fn find_labelled<'a>(root: ElementRef<'a>, fragments: &[String]) -> Option<ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !SKIPPED_TAGS.contains(&el.value().name()))
        .find(|el| contains_all(&own_text(*el), fragments))
}

/// The first element after `el` in document order, outside its subtree.
pub fn following_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut node = *el;
    loop {
        let mut sibling = node.next_sibling();
        while let Some(candidate) = sibling {
            if let Some(found) = ElementRef::wrap(candidate) {
                return Some(found);
            }
            sibling = candidate.next_sibling();
        }
        node = node.parent()?;
    }
}

/// Value rendered right after a label: for each label (a set of fragments)
/// take the element following the label element; first non-empty text wins.
pub fn value_after_label(root: ElementRef<'_>, labels: &[Vec<String>]) -> Option<String> {
    labels.iter().find_map(|fragments| {
        let label = find_labelled(root, fragments)?;
        let value = element_text(following_element(label)?);
        (!value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(sets: &[&[&str]]) -> Vec<Vec<String>> {
        sets.iter()
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn value_follows_label_cell() {
        let html = Html::parse_document(
            r#"<html><body><table><tr>
                <td>สถานะนิติบุคคล :</td><td> ยังดำเนินกิจการอยู่ </td>
            </tr></table></body></html>"#,
        );
        let root = search_root(&html);
        assert_eq!(
            value_after_label(root, &labels(&[&["สถานะ"]])).as_deref(),
            Some("ยังดำเนินกิจการอยู่")
        );
    }

    #[test]
    fn following_skips_the_label_subtree() {
        let html = Html::parse_document(
            r#"<body><div><span>ทุนจดทะเบียน<b>ignored child</b></span></div><p>5,000,000.00</p></body>"#,
        );
        let root = search_root(&html);
        assert_eq!(
            value_after_label(root, &labels(&[&["ทุน", "จดทะเบียน"]])).as_deref(),
            Some("5,000,000.00")
        );
    }

    #[test]
    fn falls_through_to_next_label() {
        let html = Html::parse_document(
            r#"<body><p>Status</p><p>Active</p><p>สถานะ</p><p></p></body>"#,
        );
        let root = search_root(&html);
        assert_eq!(
            value_after_label(root, &labels(&[&["สถานะ"], &["Status"]])).as_deref(),
            Some("Active")
        );
    }

    #[test]
    fn missing_label_is_none() {
        let html = Html::parse_document("<body><p>nothing here</p></body>");
        assert!(value_after_label(search_root(&html), &labels(&[&["Address"]])).is_none());
    }

    #[test]
    fn element_text_skips_scripts() {
        let html = Html::parse_document(
            "<body><main>Hello <script>var x = 1;</script><b>world</b></main></body>",
        );
        let main = html.select(&parse_selector("main").unwrap()).next().unwrap();
        assert_eq!(element_text(main), "Hello world");
    }

    #[test]
    fn inline_markup_adds_no_spaces() {
        let html = Html::parse_document(
            "<body><table><tr><td>กำไร<span>(ขาดทุน)</span>สุทธิ</td><td>25<b>66</b></td></tr></table></body>",
        );
        let cells = parse_selector("td").unwrap();
        let texts: Vec<String> = html.select(&cells).map(element_text).collect();
        assert_eq!(texts, vec!["กำไร(ขาดทุน)สุทธิ", "2566"]);
    }

    #[test]
    fn block_boundaries_separate_words() {
        let html = Html::parse_document(
            "<body><div><p>นาย</p><p>หนึ่ง</p>ใจดี<br>EXAMPLE</div></body>",
        );
        assert_eq!(element_text(search_root(&html)), "นาย หนึ่ง ใจดี EXAMPLE");
    }

    #[test]
    fn first_text_tries_selectors_in_order() {
        let html = Html::parse_document("<body><h1> </h1><h2>บริษัท ตัวอย่าง จำกัด</h2></body>");
        let text = first_text(&html, &["h1".into(), "h2".into()]).unwrap();
        assert_eq!(text.as_deref(), Some("บริษัท ตัวอย่าง จำกัด"));
    }

    #[test]
    fn invalid_selector_is_reported() {
        let html = Html::parse_document("<body></body>");
        assert!(matches!(
            first_text(&html, &["[[".into()]),
            Err(ScrapeError::Selector(_))
        ));
    }

    #[test]
    fn text_lines_break_on_blocks_and_tab_cells() {
        let html = Html::parse_document(
            "<body><div>หน่วย : บาท</div><table><tr><td>a</td><td>b</td></tr></table></body>",
        );
        assert_eq!(text_lines(search_root(&html)), vec!["หน่วย : บาท", "a\tb"]);
    }
}
