//! Console output gating for the renovar commands.
//!
//! Handlers tag each line with the level it belongs to; the user's
//! `--quiet`/`--verbose` flags decide what actually prints. The operational
//! log file is separate and always written.

/// How much console output the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Nothing at all; exit status is the only feedback.
    Quiet,
    /// The default operator-facing lines.
    Normal,
    /// Extra detail such as state roots and deployment dates.
    Verbose,
}

fn wants(level: LogLevel, required: LogLevel) -> bool {
    match level {
        LogLevel::Quiet => false,
        LogLevel::Normal => required == LogLevel::Normal,
        LogLevel::Verbose => matches!(required, LogLevel::Normal | LogLevel::Verbose),
    }
}

/// Print `msg` when the user's `level` covers the line's `required` level.
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if wants(level, required) {
        println!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_decision_table() {
        use LogLevel::*;
        assert!(!wants(Quiet, Normal));
        assert!(!wants(Quiet, Verbose));
        assert!(wants(Normal, Normal));
        assert!(!wants(Normal, Verbose));
        assert!(wants(Verbose, Normal));
        assert!(wants(Verbose, Verbose));
    }

    #[test]
    fn test_log_does_not_panic() {
        log(LogLevel::Quiet, LogLevel::Normal, "hidden");
        log(LogLevel::Normal, LogLevel::Normal, "shown");
        log(LogLevel::Verbose, LogLevel::Verbose, "detail");
    }
}
