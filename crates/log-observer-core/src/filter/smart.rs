//! Structured filter builder: suggestion dropdown plus a list of condition chips

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use super::condition::{generate_suggestions, Suggestion};
use crate::models::StreamKind;
use crate::timer::Debouncer;

/// Error shown on a chip whose condition failed validation
pub const INVALID_FILTER: &str = "Invalid filter syntax";

/// Delay between losing focus and closing the dropdown
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(150);

/// Filters offered while no filter is active
pub const EXAMPLE_FILTERS: [(&str, &str); 4] = [
    (r#"level = "ERROR""#, "Show only error logs"),
    (r#"timestamp > "2024-01-01""#, "Recent logs"),
    (r#"message LIKE "%exception%""#, "Find exceptions"),
    (r#"level IN ("ERROR", "WARN")"#, "Errors and warnings"),
];

/// One chip in the active filter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub id: u64,
    pub condition_text: String,
    pub is_valid: bool,
    pub error: Option<String>,
}

/// Receives the valid conditions after every change of the filter list
pub type FilterListener = Box<dyn FnMut(Vec<String>) + Send>;

pub struct SmartFilter {
    kind: StreamKind,
    filters: Vec<FilterCondition>,
    next_filter_id: u64,
    is_dropdown_open: bool,
    input: String,
    input_visible: bool,
    input_focused: bool,
    suggestions: Vec<Suggestion>,
    highlighted: Option<usize>,
    blur_close: Debouncer,
    close_delay: Duration,
    listener: Option<FilterListener>,
}

impl fmt::Debug for SmartFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartFilter")
            .field("kind", &self.kind)
            .field("filters", &self.filters)
            .field("next_filter_id", &self.next_filter_id)
            .field("is_dropdown_open", &self.is_dropdown_open)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

impl SmartFilter {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            next_filter_id: 1,
            is_dropdown_open: false,
            input: String::new(),
            input_visible: false,
            input_focused: false,
            suggestions: Vec::new(),
            highlighted: None,
            blur_close: Debouncer::new(),
            close_delay: DEFAULT_CLOSE_DELAY,
            listener: None,
        }
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Register the callback notified with the valid conditions
    pub fn on_change(&mut self, listener: impl FnMut(Vec<String>) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    /// Conditions that are applied to requests
    pub fn valid_conditions(&self) -> Vec<String> {
        self.filters
            .iter()
            .filter(|f| f.is_valid)
            .map(|f| f.condition_text.clone())
            .collect()
    }

    // -- filter list -------------------------------------------------------

    fn make_condition(&mut self, text: String) -> FilterCondition {
        let id = self.next_filter_id;
        self.next_filter_id += 1;
        // shallow check only; the backend validates the SQL
        let is_valid = !text.trim().is_empty();
        FilterCondition {
            id,
            condition_text: text,
            is_valid,
            error: (!is_valid).then(|| INVALID_FILTER.to_string()),
        }
    }

    /// Append a chip and return its id
    pub fn add_filter(&mut self, text: impl Into<String>) -> u64 {
        let condition = self.make_condition(text.into());
        let id = condition.id;
        debug!(stream = %self.kind, id, valid = condition.is_valid, "Filter added");
        self.filters.push(condition);
        self.notify();
        id
    }

    /// Remove a chip; unknown ids change nothing but still re-notify
    pub fn remove_filter(&mut self, id: u64) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.id != id);
        self.notify();
        self.filters.len() != before
    }

    /// Replace the whole list
    pub fn set_filters<I, S>(&mut self, conditions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = conditions
            .into_iter()
            .map(|c| self.make_condition(c.into()))
            .collect::<Vec<_>>();
        self.notify();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.notify();
    }

    fn notify(&mut self) {
        let valid = self.valid_conditions();
        if let Some(listener) = self.listener.as_mut() {
            listener(valid);
        }
    }

    // -- input and dropdown ------------------------------------------------

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_input_visible(&self) -> bool {
        self.input_visible
    }

    pub fn is_input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.is_dropdown_open
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    fn open_dropdown(&mut self) {
        self.is_dropdown_open = true;
    }

    fn close_dropdown(&mut self) {
        self.is_dropdown_open = false;
        self.highlighted = None;
    }

    fn refresh_suggestions(&mut self) {
        self.suggestions = generate_suggestions(&self.input, self.kind);
        self.highlighted = None;
    }

    /// Reveal and focus the input, opening the dropdown with field suggestions
    pub fn show_input(&mut self) {
        self.input_visible = true;
        self.focus();
    }

    /// Hide the input entirely, discarding its text
    pub fn hide_input(&mut self) {
        self.input_visible = false;
        self.input_focused = false;
        self.input.clear();
        self.blur_close.cancel();
        self.close_dropdown();
    }

    pub fn focus(&mut self) {
        self.input_focused = true;
        self.blur_close.cancel();
        if !self.is_dropdown_open {
            self.suggestions = generate_suggestions("", self.kind);
            self.highlighted = None;
            self.open_dropdown();
        }
    }

    /// Input lost focus; the dropdown closes after the configured delay so a
    /// selection made in the meantime still lands.
    pub fn blur(&mut self, now: Instant) {
        self.input_focused = false;
        self.blur_close.schedule(now, self.close_delay);
    }

    pub fn input_changed(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.refresh_suggestions();
        self.open_dropdown();
    }

    pub fn push_char(&mut self, c: char) {
        let mut text = std::mem::take(&mut self.input);
        text.push(c);
        self.input_changed(text);
    }

    pub fn pop_char(&mut self) {
        let mut text = std::mem::take(&mut self.input);
        text.pop();
        self.input_changed(text);
    }

    pub fn escape(&mut self) {
        self.close_dropdown();
    }

    pub fn click_outside(&mut self) {
        self.close_dropdown();
    }

    /// Move the keyboard highlight through the suggestions, wrapping around
    pub fn highlight_next(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.open_dropdown();
        self.highlighted = Some(match self.highlighted {
            Some(i) => (i + 1) % self.suggestions.len(),
            None => 0,
        });
    }

    pub fn highlight_previous(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.open_dropdown();
        let len = self.suggestions.len();
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
    }

    /// Copy a suggestion into the input and refocus it. Never submits.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        let Some(suggestion) = self.suggestions.get(index) else {
            return false;
        };
        self.input = suggestion.text.clone();
        self.input_focused = true;
        self.blur_close.cancel();
        self.close_dropdown();
        true
    }

    /// Load an example filter into the input
    pub fn use_example(&mut self, index: usize) -> bool {
        let Some((text, _)) = EXAMPLE_FILTERS.get(index) else {
            return false;
        };
        self.show_input();
        self.input_changed(*text);
        true
    }

    /// Enter: add the trimmed input as a filter when it is not blank
    pub fn submit(&mut self) -> Option<u64> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        let id = self.add_filter(text);
        self.input.clear();
        self.close_dropdown();
        Some(id)
    }

    /// Run the blur-close timer
    pub fn poll_timers(&mut self, now: Instant) {
        if self.blur_close.poll(now) {
            self.close_dropdown();
        }
    }

    pub fn pending_timers(&self) -> usize {
        usize::from(self.blur_close.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorded(filter: &mut SmartFilter) -> Arc<Mutex<Vec<Vec<String>>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        filter.on_change(move |conditions| sink.lock().push(conditions));
        calls
    }

    #[test]
    fn test_empty_filter_is_invalid_and_not_emitted() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        let calls = recorded(&mut filter);

        filter.add_filter("");
        filter.add_filter("   ");
        filter.add_filter("level = 'ERROR'");

        assert!(!filter.filters()[0].is_valid);
        assert_eq!(filter.filters()[1].error.as_deref(), Some(INVALID_FILTER));
        assert!(filter.filters()[2].is_valid);
        assert_eq!(filter.filters()[2].error, None);

        let calls = calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Vec::<String>::new());
        assert_eq!(calls[2], vec!["level = 'ERROR'".to_string()]);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut filter = SmartFilter::new(StreamKind::Queries);
        let a = filter.add_filter("a = 1");
        let b = filter.add_filter("b = 2");
        assert!(filter.remove_filter(b));
        let c = filter.add_filter("c = 3");
        assert!(c > b && b > a);

        filter.set_filters(["x = 1", "y = 2"]);
        assert!(filter.filters().iter().all(|f| f.id > c));

        assert!(!filter.remove_filter(a));
    }

    #[test]
    fn test_set_and_clear_notify() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        let calls = recorded(&mut filter);

        filter.set_filters(vec!["a = 1".to_string(), String::new()]);
        filter.clear_filters();

        let calls = calls.lock();
        assert_eq!(calls[0], vec!["a = 1".to_string()]);
        assert!(calls[1].is_empty());
        assert!(filter.filters().is_empty());
    }

    #[test]
    fn test_focus_opens_field_suggestions() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        filter.show_input();
        assert!(filter.is_input_visible());
        assert!(filter.is_dropdown_open());
        assert_eq!(filter.suggestions().len(), 10);

        filter.escape();
        assert!(!filter.is_dropdown_open());

        filter.input_changed("log_level = 'x'");
        assert!(filter.is_dropdown_open());
        assert_eq!(filter.suggestions()[0].text, "log_level = 'INFO'");
    }

    #[test]
    fn test_blur_closes_after_delay_but_selection_wins() {
        let start = Instant::now();
        let mut filter = SmartFilter::new(StreamKind::Logs);
        filter.show_input();

        filter.blur(start);
        assert!(filter.is_dropdown_open());
        assert_eq!(filter.pending_timers(), 1);

        // the click on an item is processed before the close fires
        assert!(filter.select_suggestion(1));
        assert_eq!(filter.input(), "path");
        assert!(filter.is_input_focused());
        assert_eq!(filter.pending_timers(), 0);
        assert!(filter.filters().is_empty(), "selection must not submit");

        filter.focus();
        filter.blur(start);
        filter.poll_timers(start + Duration::from_millis(100));
        assert!(filter.is_dropdown_open());
        filter.poll_timers(start + Duration::from_millis(150));
        assert!(!filter.is_dropdown_open());
    }

    #[test]
    fn test_submit_trims_and_clears_input() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        filter.show_input();
        filter.input_changed("  node_id = 'n1'  ");

        let id = filter.submit();
        assert_eq!(id, Some(1));
        assert_eq!(filter.filters()[0].condition_text, "node_id = 'n1'");
        assert_eq!(filter.input(), "");
        assert!(!filter.is_dropdown_open());

        filter.input_changed("   ");
        assert_eq!(filter.submit(), None);
    }

    #[test]
    fn test_use_example_fills_input() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        assert!(filter.use_example(2));
        assert_eq!(filter.input(), r#"message LIKE "%exception%""#);
        assert!(filter.is_input_visible());
        assert!(!filter.use_example(9));
    }

    #[test]
    fn test_highlight_wraps() {
        let mut filter = SmartFilter::new(StreamKind::Logs);
        filter.show_input();
        filter.highlight_previous();
        assert_eq!(filter.highlighted(), Some(9));
        filter.highlight_next();
        assert_eq!(filter.highlighted(), Some(0));
    }
}
