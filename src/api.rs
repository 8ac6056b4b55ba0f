//! Workout generation endpoint
//!
//! Transport-agnostic request handler: takes the HTTP method and raw body,
//! returns status, headers and JSON body. CORS preflight is answered
//! without touching the generator.

use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::generator::{Goal, Intensity, generate_workout};
use crate::moves::MoveCatalog;
use crate::workout::WorkoutRound;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";

/// Longest workout a request may ask for
pub const MAX_DURATION_MINUTES: f64 = 90.0;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Failed to fetch moves")]
    MovesUnavailable,
    #[error("Missing required parameters")]
    MissingParameters,
    #[error("Duration must be at most {} minutes", MAX_DURATION_MINUTES)]
    DurationTooLong,
    #[error("{0}")]
    InvalidBody(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    goal: Option<String>,
    duration: Option<Minutes>,
    intensity: Option<String>,
}

/// Duration arrives as a number or a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Minutes {
    Number(f64),
    Text(String),
}

impl Minutes {
    /// Unparseable text counts as absent
    fn value(&self) -> Option<f64> {
        match self {
            Minutes::Number(n) => Some(*n),
            Minutes::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn cors_headers() -> Vec<(&'static str, String)> {
    vec![
        ("Access-Control-Allow-Origin", ALLOW_ORIGIN.to_string()),
        ("Access-Control-Allow-Headers", ALLOW_HEADERS.to_string()),
    ]
}

fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
    let mut headers = cors_headers();
    headers.push(("Content-Type", "application/json".to_string()));
    ApiResponse {
        status,
        headers,
        body: Some(body.to_string()),
    }
}

/// Handle one request against the given move catalog
pub fn handle<R: Rng + ?Sized>(method: &str, body: &str, catalog: &MoveCatalog, rng: &mut R) -> ApiResponse {
    if method.eq_ignore_ascii_case("OPTIONS") {
        let mut headers = cors_headers();
        headers.push(("Access-Control-Allow-Methods", ALLOW_METHODS.to_string()));
        return ApiResponse {
            status: 204,
            headers,
            body: None,
        };
    }

    match generate(method, body, catalog, rng) {
        Ok(rounds) => {
            info!("Generated {} rounds", rounds.len());
            json_response(200, json!({ "rounds": rounds }))
        }
        Err(e) => {
            warn!("Generation request rejected: {}", e);
            json_response(400, json!({ "error": e.to_string() }))
        }
    }
}

fn generate<R: Rng + ?Sized>(
    method: &str,
    body: &str,
    catalog: &MoveCatalog,
    rng: &mut R,
) -> Result<Vec<WorkoutRound>, GenerateError> {
    if !method.eq_ignore_ascii_case("POST") {
        return Err(GenerateError::MethodNotAllowed);
    }
    if catalog.is_empty() {
        return Err(GenerateError::MovesUnavailable);
    }

    let request: GenerateRequest = serde_json::from_str(body)?;
    let (Some(goal), Some(duration), Some(intensity)) = (
        request.goal.filter(|g| !g.is_empty()),
        request
            .duration
            .and_then(|d| d.value())
            .filter(|d| *d != 0.0 && !d.is_nan()),
        request.intensity.filter(|i| !i.is_empty()),
    ) else {
        return Err(GenerateError::MissingParameters);
    };

    if duration > MAX_DURATION_MINUTES {
        return Err(GenerateError::DurationTooLong);
    }
    let minutes = duration.max(0.0) as u32;
    Ok(generate_workout(
        Goal::parse(&goal),
        minutes,
        Intensity::parse(&intensity),
        catalog,
        rng,
    ))
}
