//! Request and response types for the HTTP API
//!
//! Query parameters are deserialized loosely and validated here, before any
//! handler touches the store, so every rejection carries a readable message.

use crate::api::error::ApiError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;
pub const DEFAULT_TOP_RATED_LIMIT: i64 = 20;
pub const MAX_TOP_RATED_LIMIT: i64 = 100;

/// Validated skip/limit pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

/// `skip` and `limit` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn validate(&self) -> Result<Page, ApiError> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(ApiError::BadRequest(
                "skip must be greater than or equal to 0".to_string(),
            ));
        }

        let limit = validate_limit(self.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)?;

        Ok(Page {
            skip: u32::try_from(skip).unwrap_or(u32::MAX),
            limit,
        })
    }
}

/// Query parameters for title/category search
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub category: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchParams {
    pub fn page(&self) -> Result<Page, ApiError> {
        PageParams {
            skip: self.skip,
            limit: self.limit,
        }
        .validate()
    }

    /// Returns the non-blank title and category filters
    pub fn filters(&self) -> Result<(Option<String>, Option<String>), ApiError> {
        let title = non_blank(&self.title);
        let category = non_blank(&self.category);

        if title.is_none() && category.is_none() {
            return Err(ApiError::BadRequest(
                "At least one search parameter (title or category) is required".to_string(),
            ));
        }

        Ok((title, category))
    }
}

/// Query parameters for the price range filter
#[derive(Debug, Default, Deserialize)]
pub struct PriceRangeParams {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PriceRangeParams {
    pub fn page(&self) -> Result<Page, ApiError> {
        PageParams {
            skip: self.skip,
            limit: self.limit,
        }
        .validate()
    }

    /// Returns the validated inclusive bounds
    pub fn bounds(&self) -> Result<(Option<f64>, Option<f64>), ApiError> {
        let min = validate_price("min_price", self.min_price)?;
        let max = validate_price("max_price", self.max_price)?;

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ApiError::BadRequest(
                    "min_price cannot be greater than max_price".to_string(),
                ));
            }
        }

        Ok((min, max))
    }
}

/// Query parameters for the top-rated listing
#[derive(Debug, Default, Deserialize)]
pub struct TopRatedParams {
    pub limit: Option<i64>,
}

impl TopRatedParams {
    pub fn limit(&self) -> Result<u32, ApiError> {
        validate_limit(self.limit, DEFAULT_TOP_RATED_LIMIT, MAX_TOP_RATED_LIMIT)
    }
}

fn validate_limit(limit: Option<i64>, default: i64, max: i64) -> Result<u32, ApiError> {
    let limit = limit.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit as u32)
}

fn validate_price(name: &str, price: Option<f64>) -> Result<Option<f64>, ApiError> {
    match price {
        Some(p) if !p.is_finite() => Err(ApiError::BadRequest(format!(
            "{} must be a finite number",
            name
        ))),
        Some(p) if p < 0.0 => Err(ApiError::BadRequest(format!(
            "{} must be greater than or equal to 0",
            name
        ))),
        other => Ok(other),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// `GET /` banner
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: String,
}

/// Generic message body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Liveness ping
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// Health report, always served with 200
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database_connected: bool,
    pub has_data: bool,
}

/// Whether the store currently holds data
#[derive(Debug, Serialize, Deserialize)]
pub struct DataStatusResponse {
    pub has_data: bool,
    /// `data_loaded`, `no_data` or `database_error`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_loaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
