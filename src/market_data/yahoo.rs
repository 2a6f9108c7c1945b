// =============================================================================
// Yahoo Finance chart client
// =============================================================================
//
// Daily bars come from `/v8/finance/chart/{symbol}` with an explicit
// `period1`/`period2` window. Bar timestamps are session opens in UTC and are
// dated in the exchange's IANA zone (`meta.exchangeTimezoneName`), so bars on
// either side of a DST change land on their own trading date. `gmtoffset` is
// only the offset in force right now; it is the fallback when the zone name
// is missing or unknown.
//
// Unknown or delisted symbols come back as HTTP 404 with a chart error whose
// code is "Not Found"; that is reported as an empty table, not a failure.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::{HistoryTable, PriceProvider, ProviderError};
use crate::config::ProviderConfig;

/// Longest slice of an error body echoed back in `ProviderError::Status`.
const MAX_ERROR_BODY: usize = 256;

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooProvider {
    base_url: Url,
    auto_adjust: bool,
    client: reqwest::Client,
}

impl YahooProvider {
    /// Build a client from provider settings. No request timeout is set; the
    /// reqwest defaults apply.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        debug!(base_url = %base_url, auto_adjust = config.auto_adjust, "YahooProvider initialised");

        Ok(Self {
            base_url,
            auto_adjust: config.auto_adjust,
            client,
        })
    }

    /// `{base}/v8/finance/chart/{symbol}` with the symbol percent-encoded as a
    /// single path segment.
    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl PriceProvider for YahooProvider {
    #[instrument(skip(self), name = "yahoo::fetch_daily")]
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoryTable, ProviderError> {
        let url = self.chart_url(symbol)?;
        let period1 = start.timestamp().to_string();
        let period2 = end.timestamp().to_string();

        let resp = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "div,splits"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        let table = parse_chart(status, &body, self.auto_adjust)?;
        debug!(symbol, rows = table.dates.len(), "chart fetched");
        Ok(table)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds, as of the request.
    #[serde(default)]
    gmtoffset: i64,
    #[serde(default, rename = "exchangeTimezoneName")]
    exchange_timezone_name: Option<String>,
}

impl ChartMeta {
    fn timezone(&self) -> Option<Tz> {
        let name = self.exchange_timezone_name.as_deref()?;
        match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(timezone = name, gmtoffset = self.gmtoffset, "unknown exchange timezone, dating bars by gmtoffset");
                None
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    /// Kept as raw maps so a missing `close` key is distinguishable from an
    /// all-null column.
    #[serde(default)]
    quote: Vec<Map<String, Value>>,
    #[serde(default)]
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseSeries {
    #[serde(default)]
    adjclose: Option<Vec<Value>>,
}

/// Turn a chart response into a [`HistoryTable`].
fn parse_chart(status: StatusCode, body: &str, auto_adjust: bool) -> Result<HistoryTable, ProviderError> {
    let envelope: ChartEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ProviderError::Status {
                status,
                body: truncate(body, MAX_ERROR_BODY),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(error) = envelope.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(HistoryTable::empty());
        }
        return Err(ProviderError::Api(format!("{}: {}", error.code, error.description)));
    }
    if !status.is_success() {
        return Err(ProviderError::Status {
            status,
            body: truncate(body, MAX_ERROR_BODY),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(HistoryTable::empty());
    };
    let Some(timestamps) = result.timestamp.filter(|t| !t.is_empty()) else {
        return Ok(HistoryTable::empty());
    };

    let tz = result.meta.timezone();
    let dates = timestamps
        .iter()
        .map(|&ts| local_date(ts, tz, result.meta.gmtoffset))
        .collect::<Result<Vec<_>, _>>()?;

    let adjusted = auto_adjust
        .then(|| {
            result
                .indicators
                .adjclose
                .into_iter()
                .next()
                .and_then(|a| a.adjclose)
        })
        .flatten();

    let close = adjusted.or_else(|| {
        result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|mut q| q.remove("close"))
            .and_then(|v| match v {
                Value::Array(cells) => Some(cells),
                _ => None,
            })
    });

    if let Some(cells) = &close {
        if cells.len() != dates.len() {
            return Err(ProviderError::ShapeMismatch {
                dates: dates.len(),
                closes: cells.len(),
            });
        }
    }

    Ok(HistoryTable { dates, close })
}

fn local_date(timestamp: i64, tz: Option<Tz>, gmtoffset: i64) -> Result<NaiveDate, ProviderError> {
    let local = match tz {
        Some(tz) => DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&tz).date_naive()),
        None => DateTime::from_timestamp(timestamp.saturating_add(gmtoffset), 0).map(|dt| dt.date_naive()),
    };
    local.ok_or(ProviderError::InvalidTimestamp(timestamp))
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
