//! Per-mode "did we read everything we expected to" hygiene pass.
//!
//! This never rejects otherwise-valid source configuration; it only reports
//! top-level pointers nothing in this run mode is wired to consume, so an
//! operator can catch a typo'd key before it silently does nothing.

/// The binary invoking the config loader, since the CLI's one-shot `run` and
/// the daemon's long-lived tick loop read slightly different sections.
pub enum RunMode {
    Cli,
    Daemon,
}

pub fn consumed_pointers(mode: RunMode) -> &'static [&'static str] {
    match mode {
        RunMode::Cli => CLI,
        RunMode::Daemon => DAEMON,
    }
}

static CLI: &[&str] = &["/global", "/sources"];

static DAEMON: &[&str] = &["/global", "/sources", "/daemon"];

/// Returns the top-level keys present in `config_json` that no pointer in
/// `consumed` accounts for.
pub fn report_unused_keys(
    config_json: &serde_json::Value,
    consumed: &[&str],
) -> Vec<String> {
    let Some(obj) = config_json.as_object() else {
        return Vec::new();
    };
    obj.keys()
        .filter(|k| !consumed.iter().any(|p| p.trim_start_matches('/') == k.as_str()))
        .cloned()
        .collect()
}
