//! Wires the logger core into a running [`ignite_config::ReloadManager`]
//! (§4.4 "Integration with hot-reload").

use ignite_config::defaults::ApplyDefaults;
use ignite_config::{ConfigError, ReloadManager};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::logger::init;
use crate::options::LogOptions;

/// Registers a callback that rebuilds the logger in place whenever the
/// watched config reloads. `extract` pulls the `log` section out of the
/// application's full config type.
pub fn watch_reload<T, F>(manager: &ReloadManager<T>, extract: F)
where
    T: Default + ApplyDefaults + Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Fn(&T) -> LogOptions + Send + Sync + 'static,
{
    manager.register_callback(move |_old, new| {
        let opts = extract(new);
        init(opts).map_err(|err| ConfigError::invalid(err.to_string()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use ignite_config::{Defaults, LoadOptions};
    use std::io::Write;
    use std::str::FromStr;
    use std::time::{Duration, Instant};

    #[derive(Debug, Default, Clone, Serialize, serde::Deserialize, Defaults)]
    struct LogSection {
        #[ignite(default = "info")]
        level: String,
    }

    #[derive(Debug, Default, Clone, Serialize, serde::Deserialize, Defaults)]
    struct AppConfig {
        #[ignite(nested)]
        log: LogSection,
    }

    /// §4.4 "Integration with hot-reload": a callback that recognises the
    /// `log` section rebuilds the global logger via `Init` on every reload.
    #[test]
    fn watch_reload_rebuilds_the_global_logger_on_change() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "log:\n  level: info").unwrap();
        file.flush().unwrap();

        let manager =
            ReloadManager::<AppConfig>::start(LoadOptions::new().file(file.path())).unwrap();
        watch_reload(&manager, |cfg: &AppConfig| LogOptions {
            level: Level::from_str(&cfg.log.level).unwrap_or_default(),
            ..LogOptions::default()
        });

        std::fs::write(file.path(), "log:\n  level: error\n").unwrap();

        let deadline = Instant::now() + Duration::from_millis(2000);
        while Instant::now() < deadline && manager.current().log.level != "error" {
            std::thread::sleep(Duration::from_millis(20));
        }

        assert_eq!(manager.current().log.level, "error");
    }
}
