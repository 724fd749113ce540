use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_submission(outcome: &'static str, level: &str) {
    metrics::counter!(
        "falowen_submissions_total",
        "outcome" => outcome,
        "level" => level.to_string()
    )
    .increment(1);
}

pub(crate) fn record_external_fallback(source: &'static str) {
    metrics::counter!("falowen_external_fallbacks_total", "source" => source).increment(1);
}

pub(crate) fn record_auth(action: &'static str, outcome: &'static str) {
    metrics::counter!("falowen_auth_total", "action" => action, "outcome" => outcome).increment(1);
}
