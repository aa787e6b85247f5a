use crate::core::job::{JobIdSelector, JobId};
use anyhow::{anyhow, Context, Result};
use clap::builder::{
    styling::{AnsiColor, Effects},
    Styles,
};
use std::time::Duration;

/// Parse time limit string into Duration.
///
/// Supported formats:
/// - `"HH:MM:SS"` — hours:minutes:seconds
/// - `"MM:SS"` — minutes:seconds
/// - `"MM"` — minutes
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lqts::utils::parse_time_limit;
///
/// assert_eq!(parse_time_limit("30").unwrap(), Duration::from_secs(1800));
/// assert_eq!(parse_time_limit("30:45").unwrap(), Duration::from_secs(1845));
/// assert_eq!(parse_time_limit("2:30:45").unwrap(), Duration::from_secs(9045));
/// ```
pub fn parse_time_limit(time_str: &str) -> Result<Duration> {
    let parts: Vec<&str> = time_str.split(':').collect();

    match parts.len() {
        1 => {
            let val = time_str
                .parse::<u64>()
                .context("Invalid time format. Expected number of minutes")?;
            Ok(Duration::from_secs(val * 60))
        }
        2 => {
            let minutes = parts[0]
                .parse::<u64>()
                .context("Invalid minutes in MM:SS format")?;
            let seconds = parts[1]
                .parse::<u64>()
                .context("Invalid seconds in MM:SS format")?;
            Ok(Duration::from_secs(minutes * 60 + seconds))
        }
        3 => {
            let hours = parts[0]
                .parse::<u64>()
                .context("Invalid hours in HH:MM:SS format")?;
            let minutes = parts[1]
                .parse::<u64>()
                .context("Invalid minutes in HH:MM:SS format")?;
            let seconds = parts[2]
                .parse::<u64>()
                .context("Invalid seconds in HH:MM:SS format")?;
            Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
        }
        _ => Err(anyhow!(
            "Invalid time format. Expected formats: HH:MM:SS, MM:SS, or MM"
        )),
    }
}

/// Format duration for display (e.g., `"2h 30m 45s"`, `"45m 30s"`, `"30s"`).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lqts::utils::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(1845)), "30m 45s");
/// assert_eq!(format_duration(Duration::from_secs(9045)), "2h 30m 45s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Parse a single job id selector such as `"3"`, `"3.*"` or `"3.2"`.
pub fn parse_job_id_selector(id_str: &str) -> Result<JobIdSelector> {
    id_str
        .trim()
        .parse::<JobIdSelector>()
        .map_err(|e| anyhow!("invalid job id '{id_str}': {e}"))
}

/// Parse a comma-separated list of job id selectors, e.g. `"3.2,4.1,5"`.
///
/// # Examples
///
/// ```
/// use lqts::utils::parse_job_id_selectors;
///
/// let ids = parse_job_id_selectors("1.2,3").unwrap();
/// assert_eq!(ids.len(), 2);
/// ```
pub fn parse_job_id_selectors(id_strings: &str) -> Result<Vec<JobIdSelector>> {
    id_strings
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_job_id_selector)
        .collect()
}

/// Format a fully-resolved job id in its canonical `group.index` form.
pub fn format_job_id(job_id: JobId) -> String {
    job_id.to_string()
}

pub const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());
