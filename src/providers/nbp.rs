use super::util::with_retry;
use crate::core::currency::{CurrencyCode, CurrencyTable};
use crate::core::series::{FetchError, RateFetcher, RateSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

const USER_AGENT: &str = "fxsync/0.1";

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    rates: Vec<SeriesPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesPoint {
    effective_date: NaiveDate,
    bid: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResponse {
    effective_date: NaiveDate,
    rates: Vec<TableRate>,
}

#[derive(Debug, Deserialize)]
struct TableRate {
    code: String,
    bid: f64,
}

/// Bid rates from the NBP exchange-rate API (table C).
pub struct NbpRateFetcher {
    base_url: String,
    anchor: CurrencyCode,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl NbpRateFetcher {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anchor: CurrencyCode::default_anchor(),
            client,
            retries: 3,
            retry_delay_ms: 500,
        })
    }

    /// Currency whose trading calendar the reference unit's series follows.
    pub fn with_anchor(mut self, anchor: CurrencyCode) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_retry_policy(mut self, retries: usize, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, label: &str, url: &str) -> Result<T, FetchError> {
        debug!("Requesting {} from {}", label, url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Network {
                code: label.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: label.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Network {
            code: label.to_string(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse {} response", label);
            FetchError::decode(label, e.to_string())
        })
    }

    async fn fetch_native(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries, FetchError> {
        let url = format!(
            "{}/api/exchangerates/rates/c/{}/{}/{}/",
            self.base_url,
            code.as_str().to_lowercase(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        let data: SeriesResponse = with_retry(
            || self.get_json(code.as_str(), &url),
            self.retries,
            self.retry_delay_ms,
        )
        .await?;

        RateSeries::from_points(data.rates.into_iter().map(|p| (p.effective_date, p.bid)))
            .map_err(|message| FetchError::decode(code.as_str(), message))
    }
}

#[async_trait]
impl RateFetcher for NbpRateFetcher {
    #[instrument(
        name = "NbpSeriesFetch",
        skip(self),
        fields(code = %code)
    )]
    async fn fetch_series(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateSeries, FetchError> {
        if code.is_reference() {
            // The reference unit has no market series; it trades whenever the
            // anchor does.
            debug!(anchor = %self.anchor, "Synthesizing reference series");
            let anchor = self.fetch_native(&self.anchor, start, end).await?;
            return Ok(anchor.with_constant_rate(1.0));
        }
        self.fetch_native(code, start, end).await
    }

    #[instrument(name = "NbpTableFetch", skip(self))]
    async fn fetch_table(&self, date: NaiveDate) -> Result<CurrencyTable, FetchError> {
        let url = format!(
            "{}/api/exchangerates/tables/c/{}/",
            self.base_url,
            date.format("%Y-%m-%d")
        );
        let tables: Vec<TableResponse> = with_retry(
            || self.get_json("table", &url),
            self.retries,
            self.retry_delay_ms,
        )
        .await?;

        let table = tables
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::decode("table", "no table in response"))?;

        let mut rates = BTreeMap::new();
        for rate in table.rates {
            let code: CurrencyCode = rate
                .code
                .parse()
                .map_err(|e| FetchError::decode("table", format!("{e}")))?;
            if !rate.bid.is_finite() || rate.bid < 0.0 {
                return Err(FetchError::decode(
                    "table",
                    format!("invalid bid {} for {}", rate.bid, code),
                ));
            }
            rates.insert(code, rate.bid);
        }
        Ok(CurrencyTable::new(table.effective_date, rates))
    }

    fn calendar_anchor(&self, code: &CurrencyCode) -> Option<CurrencyCode> {
        code.is_reference().then(|| self.anchor.clone())
    }
}
