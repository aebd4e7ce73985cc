//! Injected query logging.
//!
//! Every executed statement is reported as a `Connection String: ...` line,
//! a `SQL: ...` line and one `Param[i]: ...` line per bound parameter. Where
//! those lines go is up to the [`QueryLogger`] handed to the factory.

use std::sync::{Mutex, PoisonError};

use sheetq_types::CellValue;

pub trait QueryLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Discards everything. The default logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl QueryLogger for NoopLogger {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

/// Forwards to `tracing` under the `sheetq::query` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "sheetq::query", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "sheetq::query", "{message}");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// Keeps every line in memory; handy for asserting on what was executed.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Info lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.filtered(LogLevel::Info)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.filtered(LogLevel::Warn)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn filtered(&self, level: LogLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(LogLevel, String)>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryLogger for MemoryLogger {
    fn info(&self, message: &str) {
        self.lock().push((LogLevel::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lock().push((LogLevel::Warn, message.to_string()));
    }
}

/// Report one statement execution.
pub fn log_statement(
    logger: &dyn QueryLogger,
    connection_string: &str,
    sql: &str,
    params: &[CellValue],
) {
    logger.info(&format!("Connection String: {connection_string}"));
    logger.info(&format!("SQL: {sql}"));
    for (idx, param) in params.iter().enumerate() {
        logger.info(&format!("Param[{idx}]: {param}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_lines() {
        let logger = MemoryLogger::new();
        log_statement(
            &logger,
            "Provider=test",
            "SELECT * FROM [Sheet1$] WHERE ([CEO] = ?)",
            &["Paul".into()],
        );
        logger.warn("careful");
        assert_eq!(
            logger.lines(),
            vec![
                "Connection String: Provider=test",
                "SQL: SELECT * FROM [Sheet1$] WHERE ([CEO] = ?)",
                "Param[0]: Paul",
            ]
        );
        assert_eq!(logger.warnings(), vec!["careful"]);
        logger.clear();
        assert!(logger.lines().is_empty());
    }
}
