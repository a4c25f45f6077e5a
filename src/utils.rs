use anyhow::Result;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Logs go to stderr so stdout stays free for
/// command output.
pub fn setup_logging(verbosity: &str) -> Result<()> {
    let level = match verbosity {
        "silent" => Level::ERROR,
        "normal" => Level::INFO,
        "verbose" => Level::DEBUG,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("catalog_pager={}", level).parse()?);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Derivative sizes for the status listing, in binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let exponent = match bytes {
        0 => 0,
        _ => (bytes.ilog2() / 10) as usize,
    }
    .min(UNITS.len() - 1);

    if exponent == 0 {
        return format!("{} B", bytes);
    }
    let scaled = bytes as f64 / (1u64 << (10 * exponent)) as f64;
    format!("{:.2} {}", scaled, UNITS[exponent])
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    if seconds == 0 {
        format!("{} ms", elapsed.as_millis())
    } else if seconds < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(u64::MAX), "16777216.00 TB");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250 ms");
        assert_eq!(format_elapsed(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_elapsed(Duration::from_secs(7200)), "120m 00s");
    }
}
