// Logging utilities
// Dual-format logging (JSON lines + human-readable) with [PHASE]/[STEP] tags lifted into fields

use log::Level;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Describe a database endpoint for logs without ever including the password.
pub fn describe_endpoint(user: &str, host: &str, port: u16, database: &str) -> String {
    format!("{}@{}:{}/{}", user, host, port, database)
}

/// Parse phase and step from log message
/// Extracts [PHASE: ...] and [STEP: ...] patterns
pub fn parse_log_metadata(message: &str) -> (Option<String>, Option<String>, String) {
    let (phase, rest) = extract_tag(message, "[PHASE:");
    let (step, cleaned) = extract_tag(&rest, "[STEP:");
    (phase, step, cleaned)
}

fn extract_tag(message: &str, open: &str) -> (Option<String>, String) {
    let Some(start) = message.find(open) else {
        return (None, message.to_string());
    };
    let Some(end) = message[start..].find(']') else {
        return (None, message.to_string());
    };
    let value = message[start + open.len()..start + end].trim().to_string();
    let cleaned = format!("{} {}", &message[..start], &message[start + end + 1..])
        .trim()
        .to_string();
    (Some(value), cleaned)
}

/// Format log entry as JSON for structured logging
pub fn format_json_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
    run_id: Option<&str>,
) -> String {
    let mut log_entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": message,
    });

    if let Some(phase) = phase {
        log_entry["phase"] = json!(phase);
    }

    if let Some(step) = step {
        log_entry["step"] = json!(step);
    }

    if let Some(run_id) = run_id {
        log_entry["run_id"] = json!(run_id);
    }

    serde_json::to_string(&log_entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut log_line = format!("[{}] [{}]", timestamp, level.as_str());

    if let Some(phase) = phase {
        log_line.push_str(&format!(" [PHASE: {}]", phase));
    }

    if let Some(step) = step {
        log_line.push_str(&format!(" [STEP: {}]", step));
    }

    log_line.push_str(&format!(" [{}] {}", target, message));
    log_line
}

/// Log file paths for one run: (JSON lines, human-readable).
pub fn log_file_paths(log_dir: &Path, stamp: &str) -> (PathBuf, PathBuf) {
    (
        log_dir.join(format!("odoo-inithook-{}.log", stamp)),
        log_dir.join(format!("odoo-inithook-{}.txt", stamp)),
    )
}

/// Human-readable INFO lines to stdout.
fn console_dispatch() -> fern::Dispatch {
    fern::Dispatch::new()
        .level(log::LevelFilter::Info)
        .format(|out, message, record| {
            let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let (phase, step, cleaned) = parse_log_metadata(&message.to_string());
            out.finish(format_args!(
                "{}",
                format_human_readable_log(
                    &timestamp_local.to_string(),
                    record.level(),
                    record.target(),
                    &cleaned,
                    phase.as_deref(),
                    step.as_deref(),
                )
            ))
        })
        .chain(std::io::stdout())
}

/// Initialize the global logger.
///
/// - Human-readable INFO lines to stdout (the operator console)
/// - JSON lines at DEBUG to `<log_dir>/odoo-inithook-<ts>.log`
/// - Human-readable DEBUG lines to `<log_dir>/odoo-inithook-<ts>.txt`
pub fn init_logging(log_dir: &Path, run_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let stamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S").to_string();
    let (json_log_file, txt_log_file) = log_file_paths(log_dir, &stamp);
    let run_id = run_id.to_string();

    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        // sqlx logs every statement at INFO; keep it in the files only
        .level_for("sqlx", log::LevelFilter::Warn)
        .chain(console_dispatch())
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let (phase, step, cleaned) = parse_log_metadata(&message.to_string());
                    out.finish(format_args!(
                        "{}",
                        format_json_log(
                            &timestamp_utc,
                            record.level(),
                            record.target(),
                            &cleaned,
                            phase.as_deref(),
                            step.as_deref(),
                            Some(&run_id),
                        )
                    ))
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let (phase, step, cleaned) = parse_log_metadata(&message.to_string());
                    out.finish(format_args!(
                        "{}",
                        format_human_readable_log(
                            &timestamp_local.to_string(),
                            record.level(),
                            record.target(),
                            &cleaned,
                            phase.as_deref(),
                            step.as_deref(),
                        )
                    ))
                })
                .chain(fern::log_file(txt_log_file)?),
        )
        .apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Console-only logger, used when the log directory is unusable.
pub fn init_console_logging() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .level(log::LevelFilter::Info)
        .level_for("sqlx", log::LevelFilter::Warn)
        .chain(console_dispatch())
        .apply()
}
