//! Search box state: debounced input, generation-tagged requests, results.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::audio::Track;
use crate::catalog::CatalogError;

/// Holds the latest text until it has been stable for `delay`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn input(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.to_string(), now + self.delay));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// The settled text, once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if self.deadline().is_some_and(|at| at <= now) {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }
}

pub struct SearchState {
    pub input: String,
    pub results: Vec<Track>,
    pub banner: Option<&'static str>,
    pub has_searched: bool,
    pub loading: bool,
    pub selected: usize,
    generation: u64,
    debouncer: Debouncer,
}

impl SearchState {
    pub fn new(debounce: Duration) -> Self {
        Self {
            input: String::new(),
            results: Vec::new(),
            banner: None,
            has_searched: false,
            loading: false,
            selected: 0,
            generation: 0,
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        self.input.push(c);
        self.input_changed(now);
    }

    pub fn backspace(&mut self, now: Instant) {
        self.input.pop();
        self.input_changed(now);
    }

    pub fn clear_input(&mut self, now: Instant) {
        self.input.clear();
        self.input_changed(now);
    }

    fn input_changed(&mut self, now: Instant) {
        if self.input.trim().is_empty() {
            // cleared: no request, and whatever is in flight is now stale
            self.debouncer.cancel();
            self.generation += 1;
            self.results.clear();
            self.banner = None;
            self.has_searched = false;
            self.loading = false;
            self.selected = 0;
        } else {
            self.debouncer.input(&self.input, now);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// A `(generation, query)` to run once the input has settled.
    pub fn poll(&mut self, now: Instant) -> Option<(u64, String)> {
        let query = self.debouncer.poll(now)?;
        self.generation += 1;
        self.loading = true;
        debug!(generation = self.generation, query = %query, "Search settled");
        Some((self.generation, query))
    }

    /// Apply a finished search. Returns false when it was superseded.
    pub fn finish(&mut self, generation: u64, result: Result<Vec<Track>, CatalogError>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale search result");
            return false;
        }

        self.loading = false;
        self.has_searched = true;
        self.selected = 0;
        match result {
            Ok(tracks) => {
                self.results = tracks;
                self.banner = None;
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                self.results.clear();
                self.banner = Some(e.user_message());
            }
        }
        true
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.results.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.results.is_empty() {
            return;
        }
        self.selected = step(self.selected, delta, self.results.len());
    }

    pub fn status_line(&self) -> String {
        if self.loading {
            "Searching...".to_string()
        } else if !self.has_searched {
            "Type / to search the catalog".to_string()
        } else if self.results.is_empty() {
            if self.banner.is_some() {
                String::new()
            } else {
                "No results found".to_string()
            }
        } else {
            format!("{} results found", self.results.len())
        }
    }
}

/// Move `current` by `delta` within `0..len`, clamping at both ends.
pub fn step(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let target = current as i64 + delta as i64;
    target.clamp(0, len as i64 - 1) as usize
}
