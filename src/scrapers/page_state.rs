use super::{element_text, search_root};
use crate::config::ExtractionSelectors;
use crate::domain::JuristicId;
use scraper::{Html, Selector};

/// What kind of page the browser ended up on after a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// A firewall rejection page; carries the marker that matched.
    Blocked(String),
    /// The company detail page for the searched ID.
    Detail,
    /// Anything else: search form, result list, interstitials.
    Other,
}

impl PageState {
    pub fn classify(document: &Html, id: &JuristicId, selectors: &ExtractionSelectors) -> Self {
        let text = element_text(search_root(document));
        let title = Selector::parse("title")
            .ok()
            .and_then(|selector| document.select(&selector).next().map(element_text))
            .unwrap_or_default();

        if let Some(marker) = selectors
            .blocked_markers
            .iter()
            .find(|marker| text.contains(marker.as_str()) || title.contains(marker.as_str()))
        {
            return PageState::Blocked(marker.clone());
        }

        if text.contains(id.as_str())
            || selectors
                .detail_markers
                .iter()
                .any(|marker| text.contains(marker.as_str()))
        {
            return PageState::Detail;
        }

        PageState::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(html: &str) -> PageState {
        let id = JuristicId::parse("0105542065502").unwrap();
        PageState::classify(
            &Html::parse_document(html),
            &id,
            &ExtractionSelectors::default(),
        )
    }

    #[test]
    fn detects_firewall_rejection() {
        let state = classify(
            "<html><head><title>Request Rejected</title></head>\
             <body>The requested URL was rejected. Your support ID is: 123</body></html>",
        );
        assert_eq!(state, PageState::Blocked("Request Rejected".to_string()));
    }

    #[test]
    fn detail_page_by_id_or_marker() {
        assert_eq!(
            classify("<body><span>เลขทะเบียน 0105542065502</span></body>"),
            PageState::Detail
        );
        assert_eq!(
            classify("<body><td>เลขทะเบียนนิติบุคคล</td></body>"),
            PageState::Detail
        );
    }

    #[test]
    fn id_in_input_value_is_not_detail() {
        assert_eq!(
            classify(r#"<body><input id="key-word" value="0105542065502"></body>"#),
            PageState::Other
        );
    }
}
