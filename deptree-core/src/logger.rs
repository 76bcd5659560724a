use crate::console;
use std::sync::Mutex;

/// Progress and status sink for traversals and index builds. Loggers never
/// influence control flow.
pub trait Logger: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn log(&self, message: &str);
    fn error(&self, message: &str);

    /// A logger whose messages are prefixed with `name`, nested under this
    /// logger's own prefix as `parent:name`.
    fn scope(&self, name: &str) -> Box<dyn Logger>;
}

/// Writes through [`console`]: `log` redraws the status line, `error` prints
/// a persistent error line.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLogger {
    prefix: Option<String>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn scoped(&self, name: &str) -> ConsoleLogger {
        ConsoleLogger {
            prefix: Some(nested_prefix(self.prefix.as_deref(), name)),
        }
    }

    fn format(&self, message: &str) -> String {
        format_line(self.prefix.as_deref(), message)
    }
}

fn nested_prefix(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{}:{}", parent, name),
        None => name.to_string(),
    }
}

fn format_line(prefix: Option<&str>, message: &str) -> String {
    match prefix {
        Some(prefix) => format!("[{}] {}", prefix, message),
        None => message.to_string(),
    }
}

impl Logger for ConsoleLogger {
    fn start(&self) {
        console::verbose(&self.format("started"));
    }

    fn stop(&self) {
        console::clear_line();
        console::verbose(&self.format("stopped"));
    }

    fn log(&self, message: &str) {
        console::status(&self.format(message));
    }

    fn error(&self, message: &str) {
        console::clear_line();
        console::error(&self.format(message));
    }

    fn scope(&self, name: &str) -> Box<dyn Logger> {
        Box::new(self.scoped(name))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn start(&self) {}

    fn stop(&self) {}

    fn log(&self, _message: &str) {}

    fn error(&self, _message: &str) {}

    fn scope(&self, _name: &str) -> Box<dyn Logger> {
        Box::new(NullLogger)
    }
}

/// Keeps every line in memory. Scoped loggers share the parent's buffer.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    prefix: Option<String>,
    lines: std::sync::Arc<Mutex<Vec<LogLine>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Started,
    Stopped,
    Log(String),
    Error(String),
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                LogLine::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, line: LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }

    fn format(&self, message: &str) -> String {
        format_line(self.prefix.as_deref(), message)
    }
}

impl Logger for MemoryLogger {
    fn start(&self) {
        self.push(LogLine::Started);
    }

    fn stop(&self) {
        self.push(LogLine::Stopped);
    }

    fn log(&self, message: &str) {
        self.push(LogLine::Log(self.format(message)));
    }

    fn error(&self, message: &str) {
        self.push(LogLine::Error(self.format(message)));
    }

    fn scope(&self, name: &str) -> Box<dyn Logger> {
        Box::new(MemoryLogger {
            prefix: Some(nested_prefix(self.prefix.as_deref(), name)),
            lines: self.lines.clone(),
        })
    }
}
