//! Configuration for the navigator and the probe tool
//!
//! The navigator itself is configured by the host's snapshot
//! (`NavigatorOptions`), which deserializes from the same camelCase JSON
//! the reading system produces. The probe binary reads its defaults from
//! the environment.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{FlowMetrics, FrameDimensions};

/// Pagination state owned by the host. Never modified here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationInfo {
    pub column_width: f64,
    pub column_gap: f64,
    pub column_count: usize,
    pub visible_column_count: usize,
    pub current_spread_index: usize,
    pub page_offset: f64,
    pub right_to_left: bool,
    pub is_vertical_writing_mode: bool,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            column_width: 0.0,
            column_gap: 0.0,
            column_count: 1,
            visible_column_count: 1,
            current_spread_index: 0,
            page_offset: 0.0,
            right_to_left: false,
            is_vertical_writing_mode: false,
        }
    }
}

/// Which page-index algorithm the CFI entry points use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageIndexMethod {
    /// Document offsets divided by column size, with the 0.9 nudge
    #[default]
    Offsets,
    /// Rebased client rectangles divided by the column stride, clamped
    Rectangles,
}

/// Construction options for a navigator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigatorOptions {
    /// Classify visibility by client rectangles instead of vertical offsets
    pub rectangle_based: bool,
    /// Absent when the document is scrolled rather than paginated
    pub pagination_info: Option<PaginationInfo>,
    pub page_index_method: PageIndexMethod,
}

impl NavigatorOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn paginated(pagination: PaginationInfo) -> Self {
        Self {
            rectangle_based: true,
            pagination_info: Some(pagination),
            page_index_method: PageIndexMethod::default(),
        }
    }

    pub fn is_right_to_left(&self) -> bool {
        self.pagination_info
            .as_ref()
            .map(|p| p.right_to_left)
            .unwrap_or(false)
    }

    pub fn is_vertical_writing_mode(&self) -> bool {
        self.pagination_info
            .as_ref()
            .map(|p| p.is_vertical_writing_mode)
            .unwrap_or(false)
    }
}

/// Viewport offsets applied before visibility checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleContentOffsets {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
}

impl VisibleContentOffsets {
    pub fn left(offset: f64) -> Self {
        Self {
            left: Some(offset),
            ..Self::default()
        }
    }

    pub fn top(offset: f64) -> Self {
        Self {
            top: Some(offset),
            ..Self::default()
        }
    }

    pub fn with_bottom(mut self, bottom: f64) -> Self {
        self.bottom = Some(bottom);
        self
    }
}

/// A bare number is a top offset
impl From<f64> for VisibleContentOffsets {
    fn from(top: f64) -> Self {
        Self::top(top)
    }
}

/// Defaults for the probe binary, overridable from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub frame: FrameDimensions,
    pub metrics: FlowMetrics,
    pub column_gap: f64,
    pub rectangle_based: bool,
    pub page_index_method: PageIndexMethod,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            frame: FrameDimensions::new(800.0, 600.0),
            metrics: FlowMetrics::default(),
            column_gap: 20.0,
            rectangle_based: true,
            page_index_method: PageIndexMethod::Offsets,
        }
    }
}

impl ProbeConfig {
    /// Read `CFI_NAV_*` variables. Unset or unparsable values keep their default.
    pub fn from_env() -> Self {
        let defaults = ProbeConfig::default();
        ProbeConfig {
            frame: FrameDimensions::new(
                env_number("CFI_NAV_FRAME_WIDTH").unwrap_or(defaults.frame.width),
                env_number("CFI_NAV_FRAME_HEIGHT").unwrap_or(defaults.frame.height),
            ),
            metrics: FlowMetrics {
                char_width: env_number("CFI_NAV_CHAR_WIDTH").unwrap_or(defaults.metrics.char_width),
                line_height: env_number("CFI_NAV_LINE_HEIGHT")
                    .unwrap_or(defaults.metrics.line_height),
            },
            column_gap: env_number("CFI_NAV_COLUMN_GAP").unwrap_or(defaults.column_gap),
            rectangle_based: env::var("CFI_NAV_RECTANGLE_BASED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rectangle_based),
            page_index_method: match env::var("CFI_NAV_PAGE_METHOD")
                .unwrap_or_default()
                .as_str()
            {
                "rectangles" => PageIndexMethod::Rectangles,
                _ => defaults.page_index_method,
            },
        }
    }

    /// Single-page pagination snapshot for `column_count` columns
    pub fn pagination(&self, column_count: usize) -> PaginationInfo {
        PaginationInfo {
            column_width: self.frame.width - self.column_gap,
            column_gap: self.column_gap,
            column_count: column_count.max(1),
            ..PaginationInfo::default()
        }
    }

    pub fn navigator_options(&self, pagination: PaginationInfo) -> NavigatorOptions {
        NavigatorOptions {
            rectangle_based: self.rectangle_based,
            pagination_info: Some(pagination),
            page_index_method: self.page_index_method,
        }
    }
}

fn env_number(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}
