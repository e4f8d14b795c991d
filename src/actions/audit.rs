// src/actions/audit.rs

//! Remote page-speed audits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::errors::ActionError;
use crate::types::AuditStrategy;

pub const PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Environment variable holding an optional page-speed API key.
pub const PAGESPEED_KEY_ENV: &str = "ASSETDAG_PAGESPEED_KEY";

/// Result of one audit.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub url: String,
    pub strategy: AuditStrategy,
    /// Performance score, 0-100.
    pub score: f64,
}

pub type AuditFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AuditReport, ActionError>> + Send + 'a>>;

/// A remote service that scores a public URL.
pub trait RemoteAuditor: Send + Sync + fmt::Debug {
    fn audit<'a>(&'a self, url: &'a str, strategy: AuditStrategy) -> AuditFuture<'a>;
}

/// Google PageSpeed Insights over HTTPS.
#[derive(Debug, Clone)]
pub struct PageSpeedAuditor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PageSpeedAuditor {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Default endpoint, key from `ASSETDAG_PAGESPEED_KEY` if set.
    pub fn from_env() -> Self {
        Self::new(PAGESPEED_ENDPOINT, std::env::var(PAGESPEED_KEY_ENV).ok())
    }

    async fn fetch(&self, url: &str, strategy: AuditStrategy) -> Result<AuditReport, ActionError> {
        let mut query = vec![
            ("url", url.to_string()),
            ("strategy", strategy.as_str().to_string()),
            ("category", "performance".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        debug!(endpoint = %self.endpoint, url, %strategy, "requesting audit");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| ActionError::Network(format!("audit request for {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Network(format!(
                "audit service returned {status} for {url}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ActionError::Network(format!("invalid audit response for {url}: {e}")))?;

        Ok(AuditReport {
            url: url.to_string(),
            strategy,
            score: parse_score(&body)?,
        })
    }
}

impl RemoteAuditor for PageSpeedAuditor {
    fn audit<'a>(&'a self, url: &'a str, strategy: AuditStrategy) -> AuditFuture<'a> {
        Box::pin(self.fetch(url, strategy))
    }
}

/// `lighthouseResult.categories.performance.score` (0-1) scaled to 0-100.
pub fn parse_score(body: &Value) -> Result<f64, ActionError> {
    body.pointer("/lighthouseResult/categories/performance/score")
        .and_then(Value::as_f64)
        .map(|score| (score * 100.0).round())
        .ok_or_else(|| {
            ActionError::Network("audit response has no performance score".to_string())
        })
}

/// Audits the project's public URL and optionally enforces a minimum score.
#[derive(Debug, Clone)]
pub struct AuditAction {
    pub strategy: AuditStrategy,
    pub threshold: Option<f64>,
    /// Defaults to `https://<project domain>`.
    pub url: Option<String>,
}

impl TaskAction for AuditAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let url = self
                .url
                .clone()
                .unwrap_or_else(|| format!("https://{}", ctx.project().domain));

            let report = ctx.auditor().audit(&url, self.strategy).await?;
            info!(task, url = %report.url, strategy = %report.strategy, score = report.score, "audit finished");

            if let Some(threshold) = self.threshold {
                if report.score < threshold {
                    return Err(ActionError::tool(
                        format!("audit {url}"),
                        format!("score {} is below threshold {}", report.score, threshold),
                    ));
                }
            }
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "audit"
    }
}
