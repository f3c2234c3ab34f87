pub mod sensor;
pub mod telemetry;

/// Presentation view of one reading slot.
#[derive(Debug, Clone)]
pub struct SlotView {
    pub display: String,
    pub has_error: bool,
    pub updates: u64,
}

impl Default for SlotView {
    fn default() -> Self {
        Self {
            display: String::new(),
            has_error: false,
            updates: 0,
        }
    }
}

/// Everything the presentation layer needs for one refresh: the four
/// reading slots, the transient supply/duty line and the wall clock.
#[derive(Debug, Clone, Default)]
pub struct ReadingsSnapshot {
    pub date_display: String,
    pub time_display: String,
    pub temperature: SlotView,
    pub humidity: SlotView,
    pub count_rate: SlotView,
    pub dose_rate: SlotView,
    pub supply_display: Option<String>,
}

impl ReadingsSnapshot {
    /// Compact single-line rendition, used as the log-based display.
    pub fn status_line(&self) -> String {
        let mut parts = vec![
            format!("{} {}", self.date_display, self.time_display),
            format!("T: {} ℃{}", self.temperature.display, stale_marker(&self.temperature)),
            format!("H: {} %{}", self.humidity.display, stale_marker(&self.humidity)),
        ];
        if !self.count_rate.display.is_empty() || self.count_rate.has_error {
            parts.push(format!(
                "CPM: {}{}",
                self.count_rate.display,
                stale_marker(&self.count_rate)
            ));
            parts.push(format!(
                "Rad: {} µSv{}",
                self.dose_rate.display,
                stale_marker(&self.dose_rate)
            ));
        }
        if let Some(supply) = &self.supply_display {
            parts.push(supply.clone());
        }
        parts.join(" | ")
    }
}

fn stale_marker(slot: &SlotView) -> &'static str {
    if slot.has_error {
        " [stale]"
    } else {
        ""
    }
}
