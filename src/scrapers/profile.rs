use super::{
    element_text, find_labelled, first_text, following_element, parse_selector, search_root,
    value_after_label, PageExtractor,
};
use crate::config::ExtractionSelectors;
use crate::domain::Profile;
use crate::error::Result;
use crate::normalize::truncate_chars;
use scraper::Html;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileData {
    pub fields: Profile,
    pub directors: Vec<String>,
}

/// Company profile from the detail page (or, failing that, the results page).
pub struct ProfileExtractor<'a> {
    selectors: &'a ExtractionSelectors,
}

impl<'a> ProfileExtractor<'a> {
    pub fn new(selectors: &'a ExtractionSelectors) -> Self {
        Self { selectors }
    }

    fn directors(&self, document: &Html) -> Result<Vec<String>> {
        let root = search_root(document);
        let Some(section) =
            find_labelled(root, &self.selectors.directors_label).and_then(following_element)
        else {
            return Ok(Vec::new());
        };

        let items = parse_selector("li, p, div")?;
        Ok(section
            .select(&items)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .take(self.selectors.max_directors)
            .collect())
    }

    fn raw_text_sample(&self, document: &Html) -> Result<Option<String>> {
        for root in &self.selectors.raw_text_roots {
            let selector = parse_selector(root)?;
            if let Some(el) = document.select(&selector).next() {
                let text = element_text(el);
                if !text.is_empty() {
                    return Ok(Some(truncate_chars(&text, self.selectors.raw_text_limit)));
                }
            }
        }
        Ok(None)
    }
}

impl PageExtractor for ProfileExtractor<'_> {
    type Output = ProfileData;

    fn extract(&self, document: &Html) -> Result<ProfileData> {
        let mut fields = Profile::new();

        if let Some(title) = first_text(document, &self.selectors.title)? {
            fields.insert("title".to_string(), title);
        }

        let root = search_root(document);
        for field in &self.selectors.fields {
            if let Some(value) = value_after_label(root, &field.labels) {
                fields.insert(field.key.clone(), value);
            }
        }

        if let Some(sample) = self.raw_text_sample(document)? {
            fields.insert("raw_text_sample".to_string(), sample);
        }

        Ok(ProfileData {
            fields,
            directors: self.directors(document)?,
        })
    }
}
