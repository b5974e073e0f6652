use std::fmt;

/// Minimum severity a record must meet to be formatted and emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Level {
    /// Upper-case form used for the JSON/text/keyvalue `L`/`level` key.
    pub fn as_upper_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_all_declared_names_case_insensitively() {
        assert_eq!(Level::from_str("DEBUG").unwrap(), Level::Debug);
        assert_eq!(Level::from_str("Info").unwrap(), Level::Info);
        assert_eq!(Level::from_str("warning").unwrap(), Level::Warn);
        assert_eq!(Level::from_str("error").unwrap(), Level::Error);
        assert_eq!(Level::from_str("fatal").unwrap(), Level::Fatal);
        assert_eq!(Level::from_str("panic").unwrap(), Level::Panic);
    }

    #[test]
    fn unknown_level_is_an_error() {
        assert!(Level::from_str("trace").is_err());
    }

    #[test]
    fn ordering_is_ascending_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Panic);
    }

    #[test]
    fn upper_str_matches_json_level_key_convention() {
        assert_eq!(Level::Info.as_upper_str(), "INFO");
        assert_eq!(Level::Warn.to_string(), "WARN");
    }
}
