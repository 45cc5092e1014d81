//! Data models for normalized limits and the published quota

use serde::{Deserialize, Serialize};

/// Upstream tag for the rolling token budget
pub const TOKENS_LIMIT: &str = "TOKENS_LIMIT";
/// Upstream tag for the monthly MCP tool budget
pub const TIME_LIMIT: &str = "TIME_LIMIT";

/// Category of a normalized limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitCategory {
    /// Token budget over a rolling 5 hour window
    TokenWindow,
    /// Aggregate MCP tool usage over a monthly window
    MonthlyToolUsage,
    /// Upstream type not understood yet, carrying the original tag
    Other(String),
}

impl LimitCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            TOKENS_LIMIT => LimitCategory::TokenWindow,
            TIME_LIMIT => LimitCategory::MonthlyToolUsage,
            other => LimitCategory::Other(other.to_string()),
        }
    }

    /// Human readable label
    pub fn label(&self) -> &str {
        match self {
            LimitCategory::TokenWindow => "Token usage(5 Hour)",
            LimitCategory::MonthlyToolUsage => "MCP usage(1 Month)",
            LimitCategory::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for LimitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Usage count of a single MCP tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUsage {
    pub tool_id: String,
    pub usage: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLimit {
    pub category: LimitCategory,
    pub percentage_used: i64,
    /// Monthly category only
    pub current_usage: i64,
    /// Monthly category only
    pub total: i64,
    pub usage_details: Vec<ToolUsage>,
}

impl NormalizedLimit {
    pub fn new(category: LimitCategory, percentage_used: i64) -> Self {
        Self {
            category,
            percentage_used,
            current_usage: 0,
            total: 0,
            usage_details: Vec::new(),
        }
    }
}

/// Model quota information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedModel {
    pub name: String,
    /// Remaining percentage
    pub percentage: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<String>,
}

/// Quota data structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedQuota {
    pub models: Vec<PublishedModel>,
    pub last_updated: i64,
    #[serde(default)]
    pub is_forbidden: bool,
}

impl PublishedQuota {
    pub fn new(last_updated: i64) -> Self {
        Self {
            models: Vec::new(),
            last_updated,
            is_forbidden: false,
        }
    }

    /// Quota reported when upstream denies access
    pub fn forbidden(last_updated: i64) -> Self {
        Self {
            is_forbidden: true,
            ..Self::new(last_updated)
        }
    }

    pub fn add_model(&mut self, name: impl Into<String>, percentage: i64) {
        self.models.push(PublishedModel {
            name: name.into(),
            percentage,
            reset_time: None,
        });
    }
}
