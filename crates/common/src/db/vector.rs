//! Vector wire format and similarity helpers
//!
//! pgvector exchanges vectors as bracketed comma-separated decimals with no
//! whitespace: `[0.1,0.2,-0.03]`. Components are written with Rust's `f32`
//! Display, which is shortest-round-trip, so `parse_vector(format_vector(v))`
//! recovers `v` exactly.

use crate::errors::{AppError, Result};

/// Format a vector for the `::vector` cast
pub fn format_vector(vec: &[f32]) -> String {
    if vec.is_empty() {
        return "[]".to_string();
    }
    let parts: Vec<String> = vec.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Parse a vector from its wire representation
pub fn parse_vector(s: &str) -> Result<Vec<f32>> {
    let inner = s
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| AppError::validation(format!("invalid vector component {part:?}: {e}")))
        })
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 on length mismatch or when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..a.len() {
        dot += f64::from(a[i]) * f64::from(b[i]);
        norm_a += f64::from(a[i]) * f64::from(a[i]);
        norm_b += f64::from(b[i]) * f64::from(b[i]);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
