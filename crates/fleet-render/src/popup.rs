//! Popup content rendering

use chrono::Duration;
use fleet_core::Report;
use fleet_tracker::format_clock;
use serde::{Deserialize, Serialize};

/// Values shown in a drone popup
///
/// Holds copies rather than references to the track, so a refresh always
/// renders whatever was last captured without touching shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupSnapshot {
    pub name: String,
    pub altitude: Option<f64>,
}

impl PopupSnapshot {
    pub fn from_report(report: &Report) -> Self {
        Self {
            name: if report.name.is_empty() {
                report.registration.to_string()
            } else {
                report.name.clone()
            },
            altitude: report.altitude,
        }
    }
}

/// Render popup HTML for a snapshot and elapsed flight time
pub fn render_popup(snapshot: &PopupSnapshot, elapsed: Duration) -> String {
    format!(
        concat!(
            "<div class=\"drone-popup\">",
            "<div class=\"drone-popup-name\">{name}</div>",
            "<div class=\"drone-popup-labels\"><div>Altitude</div><div>Flight Time</div></div>",
            "<div class=\"drone-popup-values\"><div>{altitude} m</div><div>{elapsed}</div></div>",
            "</div>"
        ),
        name = escape_html(&snapshot.name),
        altitude = snapshot.altitude.unwrap_or(0.0),
        elapsed = format_clock(elapsed),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
