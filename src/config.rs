//! Trace request options
//!
//! `TraceOptions` is the request shape an RPC or CLI surface deserializes
//! and hands to the crate. Timeouts use Go-style duration strings
//! (`"300ms"`, `"5s"`, `"1m30s"`).

use crate::{
    errors::TracerError,
    host::{ExecutionBudget, DEFAULT_TIMEOUT},
    programs::CALL_TRACER,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TraceOptions {
    /// Tracer name, `callTracer` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracer: Option<String>,
    /// Program-specific config, parsed by the program's factory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracer_config: Option<serde_json::Value>,
    /// Wall-clock budget of the trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Maximum number of dispatched events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_limit: Option<u64>,
}

impl TraceOptions {
    pub fn tracer_name(&self) -> &str {
        self.tracer.as_deref().unwrap_or(CALL_TRACER)
    }

    /// Budget described by `timeout` and `stepLimit`
    pub fn budget(&self) -> Result<ExecutionBudget, TracerError> {
        let timeout = match &self.timeout {
            Some(raw) => parse_duration(raw).map_err(TracerError::InvalidConfig)?,
            None => DEFAULT_TIMEOUT,
        };
        Ok(ExecutionBudget::new(self.step_limit, Some(timeout)))
    }
}

/// Parses a Go-style duration (`"1h2m3.5s"`, `"250ms"`, `"10us"`)
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let input = raw.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {input:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        total += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return Err(format!("duration {input:?} out of range"));
    }
    Ok(Duration::from_nanos(total as u64))
}
