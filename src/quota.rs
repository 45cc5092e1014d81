//! GLM quota retrieval: normalization of upstream limits and
//! mapping onto the published quota model

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::GlmApiClient;
use crate::cache::ResponseCache;
use crate::config::{resolve_base_domain, Config};
use crate::error::{QuotaError, QuotaResult};
use crate::models::{LimitCategory, NormalizedLimit, PublishedQuota, ToolUsage};
use crate::window::build_time_window;

pub const QUOTA_LIMIT_PATH: &str = "/api/monitor/usage/quota/limit";
pub const MODEL_USAGE_PATH: &str = "/api/monitor/usage/model-usage";
pub const TOOL_USAGE_PATH: &str = "/api/monitor/usage/tool-usage";

pub const TOKEN_MODEL: &str = "glm";
pub const MCP_MONTHLY_MODEL: &str = "glm-coding-plan-mcp-monthly";
const TOOL_MODEL_PREFIX: &str = "glm-coding-plan-";
/// Never reported as its own model
const EXCLUDED_TOOL: &str = "zread";

/// Convert the raw `limits` array into normalized limits.
///
/// Mistyped or missing fields fall back to defaults instead of failing;
/// a missing or non-array `limits` yields nothing.
pub fn normalize(payload: &Map<String, Value>) -> Vec<NormalizedLimit> {
    let Some(Value::Array(items)) = payload.get("limits") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_limit)
        .collect()
}

fn normalize_limit(raw: &Map<String, Value>) -> NormalizedLimit {
    let tag = str_field(raw, "type");
    let mut limit = NormalizedLimit::new(LimitCategory::from_tag(tag), int_field(raw, "percentage"));

    if limit.category == LimitCategory::MonthlyToolUsage {
        limit.current_usage = int_field(raw, "currentValue");
        limit.total = int_field(raw, "usage");
        limit.usage_details = raw
            .get("usageDetails")
            .and_then(Value::as_array)
            .map(|details| {
                details
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|detail| ToolUsage {
                        tool_id: str_field(detail, "modelCode").to_string(),
                        usage: int_field(detail, "usage"),
                    })
                    .collect()
            })
            .unwrap_or_default();
    }

    limit
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Any JSON number, truncated toward zero; anything else is 0
fn int_field(map: &Map<String, Value>, key: &str) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Map normalized limits to published models (remaining percentages)
pub fn format_glm_quota(limits: &[NormalizedLimit], now_unix: i64) -> PublishedQuota {
    let mut quota = PublishedQuota::new(now_unix);

    for limit in limits {
        match &limit.category {
            LimitCategory::TokenWindow => {
                quota.add_model(TOKEN_MODEL, 100i64.saturating_sub(limit.percentage_used));
            }
            LimitCategory::MonthlyToolUsage => {
                debug!(
                    category = %limit.category,
                    current_usage = limit.current_usage,
                    total = limit.total,
                    "Formatting monthly tool usage"
                );
                quota.add_model(MCP_MONTHLY_MODEL, 100i64.saturating_sub(limit.percentage_used));

                for detail in &limit.usage_details {
                    if detail.tool_id == EXCLUDED_TOOL {
                        continue;
                    }
                    quota.add_model(
                        format!("{}{}", TOOL_MODEL_PREFIX, detail.tool_id),
                        100i64.saturating_sub(tool_percentage(detail.usage, limit.total)),
                    );
                }
            }
            LimitCategory::Other(tag) => {
                debug!(limit_type = %tag, "Skipping unrecognized limit type");
            }
        }
    }

    quota
}

/// Share of `total` used by one tool, truncated toward zero
fn tool_percentage(usage: i64, total: i64) -> i64 {
    if total > 0 {
        usage.saturating_mul(100) / total
    } else {
        0
    }
}

/// Time-windowed usage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Model,
    Tool,
}

impl UsageKind {
    pub fn path(&self) -> &'static str {
        match self {
            UsageKind::Model => MODEL_USAGE_PATH,
            UsageKind::Tool => TOOL_USAGE_PATH,
        }
    }
}

/// Resolves configuration, queries upstream and produces the published quota
pub struct QuotaService {
    config: Config,
    client: GlmApiClient,
}

impl QuotaService {
    pub fn new(config: Config, cache: Arc<ResponseCache>) -> QuotaResult<Self> {
        let client = GlmApiClient::new(cache, config.debounce())?;
        Ok(Self { config, client })
    }

    /// Resolve the upstream origin and the token to send
    fn upstream(&self) -> QuotaResult<(String, &str)> {
        let auth_token = self.config.require_auth_token()?;
        let base_url = self.config.require_base_url()?;
        let (platform, origin) = resolve_base_domain(base_url)?;
        debug!(%platform, %origin, "Resolved upstream platform");
        Ok((origin, auth_token))
    }

    /// Fetch the GLM quota from Z.ai / ZHIPU.
    ///
    /// An upstream 403 is the one non-success status that is not an error:
    /// it yields an empty quota with `is_forbidden` set. Every other
    /// non-2xx status is returned as [`QuotaError::UpstreamStatus`].
    pub async fn get_glm_quota(&self, cancel: &CancellationToken) -> QuotaResult<PublishedQuota> {
        let (origin, auth_token) = self.upstream()?;
        let url = format!("{}{}", origin, QUOTA_LIMIT_PATH);

        let raw = match self.client.query(cancel, &url, auth_token, "").await {
            Ok(raw) => raw,
            Err(e) if e.upstream_status() == Some(403) => {
                warn!("Z.ai denied access (403 Forbidden), reporting quota as forbidden");
                return Ok(PublishedQuota::forbidden(Utc::now().timestamp()));
            }
            Err(e) => return Err(e),
        };

        let payload = match raw {
            Value::Object(payload) => payload,
            other => {
                return Err(QuotaError::MalformedResponse(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let limits = normalize(&payload);
        Ok(format_glm_quota(&limits, Utc::now().timestamp()))
    }

    /// Fetch a raw usage report for the rolling window ending now
    pub async fn get_usage(&self, cancel: &CancellationToken, kind: UsageKind) -> QuotaResult<Value> {
        let (origin, auth_token) = self.upstream()?;
        let url = format!("{}{}", origin, kind.path());
        let query_params = build_time_window(Utc::now());

        self.client.query(cancel, &url, auth_token, &query_params).await
    }
}
