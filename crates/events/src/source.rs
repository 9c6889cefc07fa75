//! HTTP client for the scheduling system's modified-detail queue.
//!
//! `GET {base}/updates/{region}` returns the queue for a region and
//! `PUT {base}/updates/{region}` with a JSON array of ids removes entries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use shiftwatch_core::notification::RawChange;
use shiftwatch_core::ports::ChangeSource;
use shiftwatch_core::types::{Region, SourceId};
use shiftwatch_core::CoreError;

use crate::config::{self, ConfigError};

const DEFAULT_REGIONS: &str = "1,2,3,4,5,6";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CsrError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Change source returned HTTP {0}")]
    HttpStatus(u16),
}

impl From<CsrError> for CoreError {
    fn from(e: CsrError) -> Self {
        CoreError::Source(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// CsrConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub regions: Vec<Region>,
    pub timeout: Duration,
}

impl CsrConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Required | Default       |
    /// |---------------------|----------|---------------|
    /// | `CSR_API_URL`       | yes      | —             |
    /// | `CSR_API_TOKEN`     | no       | —             |
    /// | `CSR_REGIONS`       | no       | `1,2,3,4,5,6` |
    /// | `HTTP_TIMEOUT_SECS` | no       | `30`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config::required("CSR_API_URL")?,
            token: config::optional("CSR_API_TOKEN"),
            regions: parse_regions(&config::or_default("CSR_REGIONS", DEFAULT_REGIONS))?,
            timeout: Duration::from_secs(config::parsed_or(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Parse a comma-separated region list, ignoring blanks and repeats.
pub fn parse_regions(raw: &str) -> Result<Vec<Region>, ConfigError> {
    let mut regions = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let region: Region = config::parse_value("CSR_REGIONS", part)?;
        if !regions.contains(&region) {
            regions.push(region);
        }
    }
    Ok(regions)
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Ids arrive as either JSON numbers or numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(SourceId),
    Text(String),
}

impl WireId {
    fn into_id(self) -> Result<SourceId, CoreError> {
        match self {
            WireId::Number(id) => Ok(id),
            WireId::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| CoreError::Source(format!("Non-numeric update id {text:?}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModifiedDetail {
    id: WireId,
    #[serde(default)]
    quantum_id: Option<String>,
    #[serde(default)]
    shift_modified: Option<NaiveDateTime>,
    shift_type: String,
    detail_start: NaiveDateTime,
    detail_end: NaiveDateTime,
    #[serde(default)]
    activity: Option<String>,
    action_type: String,
}

impl TryFrom<ModifiedDetail> for RawChange {
    type Error = CoreError;

    fn try_from(detail: ModifiedDetail) -> Result<Self, Self::Error> {
        Ok(RawChange {
            source_id: detail.id.into_id()?,
            user_id: detail.quantum_id,
            shift_modified_at: detail.shift_modified,
            window_start: detail.detail_start,
            window_end: detail.detail_end,
            activity_label: detail.activity,
            parent_kind: detail.shift_type.parse()?,
            change_kind: detail.action_type.parse()?,
        })
    }
}

// ---------------------------------------------------------------------------
// CsrClient
// ---------------------------------------------------------------------------

/// [`ChangeSource`] backed by the scheduling system's HTTP API.
pub struct CsrClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CsrClient {
    pub fn new(config: &CsrConfig) -> Result<Self, CsrError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn updates_url(&self, region: Region) -> String {
        format!("{}/updates/{region}", self.base_url)
    }

    fn authorised(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch(&self, region: Region) -> Result<Vec<ModifiedDetail>, CsrError> {
        let response = self
            .authorised(self.client.get(self.updates_url(region)))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CsrError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn delete(&self, region: Region, ids: &[SourceId]) -> Result<(), CsrError> {
        let response = self
            .authorised(self.client.put(self.updates_url(region)))
            .json(ids)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CsrError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeSource for CsrClient {
    async fn fetch_modified(&self, region: Region) -> Result<Vec<RawChange>, CoreError> {
        let details = self.fetch(region).await?;
        tracing::info!(region, count = details.len(), "Found modified details");
        details.into_iter().map(RawChange::try_from).collect()
    }

    async fn acknowledge(&self, region: Region, source_ids: &[SourceId]) -> Result<(), CoreError> {
        if source_ids.is_empty() {
            return Ok(());
        }
        self.delete(region, source_ids).await?;
        tracing::debug!(region, count = source_ids.len(), "Acknowledged modified details");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use shiftwatch_core::kinds::{ChangeKind, ParentKind};

    use super::*;

    fn decode(json: &str) -> Result<Vec<RawChange>, CoreError> {
        let details: Vec<ModifiedDetail> = serde_json::from_str(json).unwrap();
        details.into_iter().map(RawChange::try_from).collect()
    }

    #[test]
    fn decodes_string_and_numeric_ids() {
        let changes = decode(
            r#"[
              {
                "id": "101",
                "quantumId": "CSTRIFE",
                "shiftModified": "2022-03-25T15:00:00",
                "shiftType": "SHIFT",
                "detailStart": "2022-03-31T10:00:00",
                "detailEnd": "2022-03-31T11:00:00",
                "activity": "CCTV monitoring",
                "actionType": "ADD"
              },
              {
                "id": 103,
                "shiftType": "overtime",
                "detailStart": "2022-03-31T00:00:00",
                "detailEnd": "2022-03-31T00:00:00",
                "actionType": "Unchanged"
              }
            ]"#,
        )
        .unwrap();

        assert_eq!(changes[0].source_id, 101);
        assert_eq!(changes[0].user_id.as_deref(), Some("CSTRIFE"));
        assert_eq!(changes[0].activity_label.as_deref(), Some("CCTV monitoring"));
        assert_eq!(changes[0].change_kind, ChangeKind::Add);

        assert_eq!(changes[1].source_id, 103);
        assert_eq!(changes[1].user_id, None);
        assert_eq!(changes[1].shift_modified_at, None);
        assert!(changes[1].is_shift_level());
        assert_eq!(changes[1].parent_kind, ParentKind::Overtime);
        assert_eq!(changes[1].change_kind, ChangeKind::Unchanged);
    }

    #[test]
    fn unknown_action_type_is_a_contract_error() {
        let result = decode(
            r#"[{
                "id": 1,
                "shiftType": "SHIFT",
                "detailStart": "2022-03-31T10:00:00",
                "detailEnd": "2022-03-31T11:00:00",
                "actionType": "MOVE"
            }]"#,
        );
        assert_matches!(result, Err(CoreError::UnknownVariant { value, .. }) if value == "MOVE");
    }

    #[test]
    fn non_numeric_text_id_is_a_source_error() {
        let result = decode(
            r#"[{
                "id": "abc",
                "shiftType": "SHIFT",
                "detailStart": "2022-03-31T10:00:00",
                "detailEnd": "2022-03-31T11:00:00",
                "actionType": "ADD"
            }]"#,
        );
        assert_matches!(result, Err(CoreError::Source(_)));
    }

    #[test]
    fn parse_regions_trims_and_dedupes() {
        assert_eq!(parse_regions(" 1, 2,,2 ,6").unwrap(), vec![1, 2, 6]);
        assert_matches!(
            parse_regions("1,north"),
            Err(ConfigError::Invalid { name: "CSR_REGIONS", .. })
        );
    }

    #[test]
    fn csr_errors_become_source_errors() {
        let err: CoreError = CsrError::HttpStatus(500).into();
        assert_matches!(err, CoreError::Source(msg) if msg == "Change source returned HTTP 500");
    }

    #[test]
    fn updates_url_ignores_trailing_slash() {
        let client = CsrClient::new(&CsrConfig {
            base_url: "http://csr.local/".into(),
            token: None,
            regions: vec![1],
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.updates_url(4), "http://csr.local/updates/4");
    }
}
