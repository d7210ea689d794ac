//! Display formatting for countdowns and charge gauges.
//!
//! Panel renderers go through this module so that every surface shows
//! remaining time the same way.

/// Format remaining seconds as `M:SS`, or `zero_label` once expired.
///
/// # Examples
/// ```
/// use traitwatch_types::formatting::format_countdown;
/// assert_eq!(format_countdown(125, "READY"), "2:05");
/// assert_eq!(format_countdown(9, "READY"), "0:09");
/// assert_eq!(format_countdown(0, "READY"), "READY");
/// ```
pub fn format_countdown(secs: u32, zero_label: &str) -> String {
    if secs == 0 {
        return zero_label.to_string();
    }
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Format elapsed milliseconds as `M:SS` (truncated).
///
/// # Examples
/// ```
/// use traitwatch_types::formatting::format_elapsed;
/// assert_eq!(format_elapsed(61_999), "1:01");
/// assert_eq!(format_elapsed(-5), "0:00");
/// ```
pub fn format_elapsed(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Format a stack gauge as filled/empty pips followed by progress
/// toward the next charge.
///
/// # Examples
/// ```
/// use traitwatch_types::formatting::format_charge;
/// assert_eq!(format_charge(1, 3, 0.5), "●○○ 50%");
/// assert_eq!(format_charge(3, 3, 0.0), "●●● FULL");
/// ```
pub fn format_charge(stacks: u8, max_stacks: u8, partial: f64) -> String {
    let mut gauge = String::with_capacity(usize::from(max_stacks) * 3 + 5);
    for i in 0..max_stacks {
        gauge.push(if i < stacks { '●' } else { '○' });
    }
    if stacks >= max_stacks {
        gauge.push_str(" FULL");
    } else {
        let pct = (partial.clamp(0.0, 1.0) * 100.0).floor() as u32;
        gauge.push_str(&format!(" {pct}%"));
    }
    gauge
}
