//! `/health` endpoint payload.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Whether the transcription engine loaded at startup.
    pub engine_loaded: bool,
    /// Short model name.
    pub model: String,
}

/// Build a health response from live state.
pub fn health_check(start_time: Instant, engine_loaded: bool) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        engine_loaded,
        model: sotto_transcription::model::MODEL_NAME.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), false);
        assert_eq!(resp.status, "ok");
    }

    #[test]
    fn uptime_counts_from_start() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(120))
            .unwrap();
        let resp = health_check(start, true);
        assert!(resp.uptime_secs >= 119);
    }

    #[test]
    fn engine_flag_carried_through() {
        assert!(health_check(Instant::now(), true).engine_loaded);
        assert!(!health_check(Instant::now(), false).engine_loaded);
    }

    #[test]
    fn names_the_model() {
        let resp = health_check(Instant::now(), false);
        assert!(resp.model.contains("whisper"));
    }

    #[test]
    fn serialization() {
        let resp = health_check(Instant::now(), true);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["engine_loaded"], true);
        assert!(json["uptime_secs"].is_number());
        assert!(json["model"].is_string());
    }
}
