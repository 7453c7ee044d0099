use crate::domain::JuristicId;
use crate::error::Result;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Key prefix for fields merged into the profile from the open-data API.
pub const API_FIELD_PREFIX: &str = "api.";

/// Client for the Ministry of Commerce open-data juristic endpoint.
pub struct MocClient {
    client: Client,
    base_url: String,
}

impl MocClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn get_juristic(&self, id: &JuristicId) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("juristic_id", id.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Fetch and flatten the API record into `api.`-prefixed profile fields.
    /// Failures are logged and yield an empty map.
    pub async fn profile_fields(&self, id: &JuristicId) -> BTreeMap<String, String> {
        match self.get_juristic(id).await {
            Ok(value) => {
                let fields = flatten_json(&value, API_FIELD_PREFIX);
                info!("Open-data API returned {} fields for {}", fields.len(), id);
                fields
            }
            Err(e) => {
                warn!("Open-data API lookup for {} failed: {}", id, e);
                BTreeMap::new()
            }
        }
    }
}

/// Flatten scalars of a JSON tree into dotted keys. Arrays use their index
/// as a path segment; nulls are dropped.
pub fn flatten_json(value: &Value, prefix: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(value, prefix.trim_end_matches('.'), &mut out);
    out
}

fn flatten_into(value: &Value, path: &str, out: &mut BTreeMap<String, String>) {
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    };

    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(path.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(path.to_string(), n.to_string());
        }
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.insert(path.to_string(), s.to_string());
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(item, &join(&i.to_string()), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(item, &join(key), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn flattens_nested_objects_with_prefix() {
        let value = json!({
            "juristic_name_th": "บริษัท ตัวอย่าง จำกัด",
            "status": { "code": 1, "text": "ยังดำเนินกิจการอยู่" },
            "committees": ["นาย ก", "นาง ข"],
            "fax": null,
            "blank": "  "
        });

        let fields = flatten_json(&value, API_FIELD_PREFIX);

        assert_eq!(fields["api.juristic_name_th"], "บริษัท ตัวอย่าง จำกัด");
        assert_eq!(fields["api.status.code"], "1");
        assert_eq!(fields["api.status.text"], "ยังดำเนินกิจการอยู่");
        assert_eq!(fields["api.committees.1"], "นาง ข");
        assert!(!fields.contains_key("api.fax"));
        assert!(!fields.contains_key("api.blank"));
    }

    #[tokio::test]
    async fn fetches_profile_fields_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/juristic"))
            .and(query_param("juristic_id", "0105542065502"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "juristic_id": "0105542065502",
                "juristic_status": "ยังดำเนินกิจการอยู่"
            })))
            .mount(&server)
            .await;

        let client = MocClient::new(format!("{}/juristic", server.uri())).unwrap();
        let id = JuristicId::parse("0105542065502").unwrap();
        let fields = client.profile_fields(&id).await;

        assert_eq!(fields["api.juristic_id"], "0105542065502");
        assert_eq!(fields["api.juristic_status"], "ยังดำเนินกิจการอยู่");
    }

    #[tokio::test]
    async fn api_errors_yield_no_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = MocClient::new(format!("{}/juristic", server.uri())).unwrap();
        let id = JuristicId::parse("0105542065502").unwrap();
        assert!(client.profile_fields(&id).await.is_empty());
    }
}
