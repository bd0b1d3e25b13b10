// Log-tail buffer for the active view: level filter, bounded FIFO, auto-follow.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::models::{LogLevel, LogLine};

pub const LOG_CAPACITY: usize = 1000;
/// Within this distance from the bottom the view keeps following new lines.
pub const FOLLOW_THRESHOLD: f64 = 50.0;

/// Per-source colours for network-aggregate tails, assigned in first-seen order.
pub const SOURCE_PALETTE: [&str; 8] = [
    "#4A9EFF", "#22c55e", "#f59e0b", "#ef4444", "#a855f7", "#06b6d4", "#f472b6", "#eab308",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum LogTarget {
    Container(String),
    Network(String),
}

impl LogTarget {
    pub fn name(&self) -> &str {
        match self {
            LogTarget::Container(id) => id,
            LogTarget::Network(name) => name,
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Container(id) => write!(f, "container {}", id),
            LogTarget::Network(name) => write!(f, "network {}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Filtered,
    /// `follow` tells the renderer to scroll to the newest line.
    Appended { follow: bool },
}

#[derive(Debug)]
pub struct LogTail {
    target: LogTarget,
    capacity: usize,
    level: LogLevel,
    lines: VecDeque<LogLine>,
    distance_from_bottom: f64,
    colors: HashMap<String, &'static str>,
}

impl LogTail {
    pub fn new(target: LogTarget, level: LogLevel) -> Self {
        Self::with_capacity(target, level, LOG_CAPACITY)
    }

    pub fn with_capacity(target: LogTarget, level: LogLevel, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            target,
            capacity,
            level,
            lines: VecDeque::with_capacity(capacity.min(LOG_CAPACITY)),
            distance_from_bottom: 0.0,
            colors: HashMap::new(),
        }
    }

    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Applies to lines arriving from now on; already-buffered lines stay.
    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn set_scroll(&mut self, distance_from_bottom: f64) {
        self.distance_from_bottom = distance_from_bottom.max(0.0);
    }

    pub fn is_following(&self) -> bool {
        self.distance_from_bottom <= FOLLOW_THRESHOLD
    }

    pub fn append(&mut self, line: LogLine) -> AppendOutcome {
        if !self.level.matches(&line.line) {
            return AppendOutcome::Filtered;
        }
        if !self.colors.contains_key(&line.source_id) {
            let color = SOURCE_PALETTE[self.colors.len() % SOURCE_PALETTE.len()];
            self.colors.insert(line.source_id.clone(), color);
        }
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
        AppendOutcome::Appended {
            follow: self.is_following(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn color_for(&self, source_id: &str) -> Option<&'static str> {
        self.colors.get(source_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> LogLine {
        LogLine::new("web", text, None)
    }

    #[test]
    fn keeps_newest_thousand_in_order() {
        let mut tail = LogTail::new(LogTarget::Container("web".into()), LogLevel::All);
        for i in 0..1500 {
            tail.append(line(&format!("line {}", i)));
        }
        assert_eq!(tail.len(), LOG_CAPACITY);
        let texts: Vec<_> = tail.lines().map(|l| l.line.clone()).collect();
        assert_eq!(texts.first().map(String::as_str), Some("line 500"));
        assert_eq!(texts.last().map(String::as_str), Some("line 1499"));
        assert!(!texts.iter().any(|t| t == "line 499"));
    }

    #[test]
    fn filtered_lines_are_not_buffered() {
        let mut tail = LogTail::new(LogTarget::Container("web".into()), LogLevel::Warning);
        assert_eq!(tail.append(line("INFO booting")), AppendOutcome::Filtered);
        assert!(matches!(
            tail.append(line("WARN disk almost full")),
            AppendOutcome::Appended { .. }
        ));
        assert!(matches!(
            tail.append(line("Error: boom")),
            AppendOutcome::Appended { .. }
        ));
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn level_change_does_not_replay() {
        let mut tail = LogTail::new(LogTarget::Container("web".into()), LogLevel::Error);
        tail.append(line("info: started"));
        tail.set_level(LogLevel::All);
        assert!(tail.is_empty());
        tail.append(line("info: again"));
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn follow_only_near_bottom() {
        let mut tail = LogTail::new(LogTarget::Network("bridge".into()), LogLevel::All);
        assert_eq!(tail.append(line("a")), AppendOutcome::Appended { follow: true });
        tail.set_scroll(50.0);
        assert_eq!(tail.append(line("b")), AppendOutcome::Appended { follow: true });
        tail.set_scroll(120.0);
        assert_eq!(tail.append(line("c")), AppendOutcome::Appended { follow: false });
    }

    #[test]
    fn sources_get_palette_colours_in_first_seen_order() {
        let mut tail = LogTail::new(LogTarget::Network("bridge".into()), LogLevel::All);
        tail.append(LogLine::new("db", "x", None));
        tail.append(LogLine::new("web", "y", None));
        tail.append(LogLine::new("db", "z", None));
        assert_eq!(tail.color_for("db"), Some("#4A9EFF"));
        assert_eq!(tail.color_for("web"), Some("#22c55e"));
        assert_eq!(tail.color_for("cache"), None);
    }
}
