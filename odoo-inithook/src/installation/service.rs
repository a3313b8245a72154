// Service management helpers (systemd)

use anyhow::Result;
use log::{debug, info, warn};
use tokio::time::Duration;

use crate::installation::{run_checked, run_cmd_with_timeout};

/// Restart a systemd service and report whether it came back active.
///
/// Requires root. A failed restart is an error; a service that restarts but is
/// not yet active is only logged (units may take a moment to settle).
pub async fn restart_service(service_name: &str, timeout_dur: Duration) -> Result<()> {
    info!(
        "[PHASE: reload] [STEP: restart] Restarting service '{}'",
        service_name
    );

    let args = vec!["restart".to_string(), service_name.to_string()];
    run_checked("systemctl", &args, &[], timeout_dur, "systemctl_restart").await?;

    if is_service_active(service_name).await {
        info!(
            "[PHASE: reload] [STEP: restart] Service '{}' is active",
            service_name
        );
    } else {
        warn!(
            "[PHASE: reload] [STEP: restart] Service '{}' restarted but is not reported active yet",
            service_name
        );
    }
    Ok(())
}

/// True when `systemctl is-active` prints "active".
pub async fn is_service_active(service_name: &str) -> bool {
    // --no-pager prevents blocking on interactive pager
    let args = vec![
        "is-active".to_string(),
        "--no-pager".to_string(),
        service_name.to_string(),
    ];
    match run_cmd_with_timeout(
        "systemctl",
        &args,
        &[],
        Duration::from_secs(15),
        "systemctl_is_active",
    )
    .await
    {
        Ok(out) => parse_is_active(&out.stdout),
        Err(e) => {
            debug!(
                "[PHASE: reload] [STEP: restart] is-active check failed for '{}': {}",
                service_name, e
            );
            false
        }
    }
}

fn parse_is_active(stdout: &str) -> bool {
    stdout.trim().eq_ignore_ascii_case("active")
}
