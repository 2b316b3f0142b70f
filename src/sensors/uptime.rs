//! Host uptime behind the pluggable provider seam

use super::UptimeProvider;
use async_trait::async_trait;
use std::io;
use tokio::process::Command;

/// Shells out to `uptime -p` and strips the `up ` prefix, matching the
/// free-form string dashboards already display.
pub struct HostUptime;

#[async_trait]
impl UptimeProvider for HostUptime {
    async fn uptime(&self) -> io::Result<String> {
        let output = Command::new("uptime").arg("-p").output().await?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("uptime -p exited with {}", output.status),
            ));
        }
        Ok(format_uptime(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn format_uptime(raw: &str) -> String {
    raw.trim_end()
        .strip_prefix("up ")
        .unwrap_or_else(|| raw.trim_end())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefix_and_newline() {
        assert_eq!(
            format_uptime("up 2 hours, 14 minutes\n"),
            "2 hours, 14 minutes"
        );
    }

    #[test]
    fn test_passes_through_unexpected_shape() {
        assert_eq!(format_uptime("14:05 up 3 days\n"), "14:05 up 3 days");
    }

    #[tokio::test]
    async fn test_host_uptime_runs() {
        // Smoke test against the real binary; skip silently where absent.
        if let Ok(uptime) = HostUptime.uptime().await {
            assert!(!uptime.starts_with("up "));
            assert!(!uptime.ends_with('\n'));
        }
    }
}
