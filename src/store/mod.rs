use crate::models::{ReadingsSnapshot, SlotView};

/// One reading slot: last-known value plus a per-cycle error flag.
///
/// `updates` counts value mutations and is the redraw cue for the
/// presentation layer. The pollers only call [`Slot::set`] when a freshly
/// fetched value differs from the stored one, so an unchanged reading
/// leaves the counter alone.
#[derive(Debug, Clone, Default)]
pub struct Slot<T> {
    value: Option<T>,
    has_error: bool,
    updates: u64,
}

impl<T: Copy + PartialEq> Slot<T> {
    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.updates += 1;
    }

    pub fn set_error(&mut self, has_error: bool) {
        self.has_error = has_error;
    }
}

/// Shared state both pollers write into and the presentation layer reads.
///
/// The local sensor poller owns `temperature` and `humidity`, the remote
/// poller owns `count_rate` and `dose_rate`; the slot sets are disjoint.
/// The supply line is transient display state, rebuilt on every successful
/// remote poll rather than reconciled.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    pub temperature: Slot<f64>,
    pub humidity: Slot<f64>,
    pub count_rate: Slot<u64>,
    pub dose_rate: Slot<f64>,
    supply_display: Option<String>,
}

impl ReadingStore {
    pub fn set_supply_display(&mut self, line: String) {
        self.supply_display = Some(line);
    }

    pub fn supply_display(&self) -> Option<&str> {
        self.supply_display.as_deref()
    }

    pub fn snapshot(&self) -> ReadingsSnapshot {
        let now = chrono::Local::now();
        ReadingsSnapshot {
            date_display: now.format("%d.%m.%Y").to_string(),
            time_display: now.format("%H:%M:%S").to_string(),
            temperature: slot_view(&self.temperature, |v| format!("{v}")),
            humidity: slot_view(&self.humidity, |v| format!("{v}")),
            count_rate: slot_view(&self.count_rate, |v| format!("{v:3}")),
            dose_rate: slot_view(&self.dose_rate, |v| format!("{v:.2}")),
            supply_display: self.supply_display.clone(),
        }
    }
}

fn slot_view<T, F>(slot: &Slot<T>, format: F) -> SlotView
where
    T: Copy + PartialEq,
    F: Fn(T) -> String,
{
    SlotView {
        display: slot.value().map(format).unwrap_or_default(),
        has_error: slot.has_error(),
        updates: slot.updates(),
    }
}
