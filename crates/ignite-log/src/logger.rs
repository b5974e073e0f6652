use std::panic::Location;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

use crate::context::Context;
use crate::encode::{self, Format};
use crate::error::LogError;
use crate::field::Field;
use crate::level::Level;
use crate::options::LogOptions;
use crate::record::LogRecord;
use crate::sink::{RotatingFileSink, Sink, StderrSink, StdoutSink};

struct LoggerInner {
    level: Level,
    format: Format,
    caller: bool,
    stacktrace: bool,
    stacktrace_level: Level,
    name: Option<String>,
    sinks: Vec<Arc<dyn Sink>>,
    error_sinks: Vec<Arc<dyn Sink>>,
    attached: Vec<(String, Field)>,
    context_keys: Vec<String>,
}

impl LoggerInner {
    fn build(opts: &LogOptions) -> Result<Self, LogError> {
        let sinks = build_sinks(&opts.outputs, &opts.rotation)?;
        let error_sinks = build_sinks(&opts.error_outputs, &opts.rotation)?;
        Ok(Self {
            level: opts.level,
            format: opts.format,
            caller: opts.caller,
            stacktrace: opts.stacktrace,
            stacktrace_level: opts.stacktrace_level,
            name: opts.name.clone(),
            sinks,
            error_sinks,
            attached: Vec::new(),
            context_keys: opts.context_keys.clone(),
        })
    }
}

fn build_sinks(
    outputs: &[String],
    rotation: &crate::options::RotationOptions,
) -> Result<Vec<Arc<dyn Sink>>, LogError> {
    outputs
        .iter()
        .map(|target| -> Result<Arc<dyn Sink>, LogError> {
            match target.as_str() {
                "stdout" => Ok(Arc::new(StdoutSink::new())),
                "stderr" => Ok(Arc::new(StderrSink::new())),
                path => Ok(Arc::new(RotatingFileSink::new(path, rotation.clone())?)),
            }
        })
        .collect()
}

/// A cheaply cloneable handle onto the process-wide logger, or a derived
/// logger produced by `with_values`/`with_name`.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

static GLOBAL: LazyLock<ArcSwap<LoggerInner>> = LazyLock::new(|| {
    ArcSwap::from_pointee(
        LoggerInner::build(&LogOptions::default()).expect("default logger options never fail"),
    )
});

/// Replaces the process-wide logger. Idempotent and thread-safe: the
/// pointer swap is atomic, so concurrent readers observe either the old or
/// new snapshot, never a half-built one.
pub fn init(opts: LogOptions) -> Result<(), LogError> {
    let inner = LoggerInner::build(&opts)?;
    GLOBAL.store(Arc::new(inner));
    Ok(())
}

/// A snapshot of the current process-wide logger.
pub fn global() -> Logger {
    Logger {
        inner: GLOBAL.load_full(),
    }
}

impl Logger {
    /// Pre-attaches `fields` to every record this derived logger emits.
    pub fn with_values(&self, fields: &[(&str, Field)]) -> Logger {
        let mut inner = clone_inner(&self.inner);
        inner
            .attached
            .extend(fields.iter().map(|(k, v)| (k.to_string(), v.clone())));
        Logger {
            inner: Arc::new(inner),
        }
    }

    /// Returns a derived logger whose name is the parent's name plus `.n`.
    pub fn with_name(&self, name: &str) -> Logger {
        let mut inner = clone_inner(&self.inner);
        inner.name = Some(match &inner.name {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        });
        Logger {
            inner: Arc::new(inner),
        }
    }

    /// Flushes every sink. Errors are returned but non-fatal: all sinks are
    /// still attempted.
    pub fn sync(&self) -> Result<(), LogError> {
        let mut last_err = None;
        for sink in self.inner.sinks.iter().chain(self.inner.error_sinks.iter()) {
            if let Err(err) = sink.flush() {
                last_err = Some(LogError::Flush(err));
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        // Fatal/Panic always write and terminate regardless of the
        // configured minimum, mirroring zap's Check: termination must not
        // silently depend on the level filter.
        level >= self.inner.level || level >= Level::Fatal
    }

    #[track_caller]
    fn emit(&self, level: Level, message: String, explicit: Vec<(String, Field)>) {
        self.emit_with_context(level, message, explicit, None)
    }

    #[track_caller]
    fn emit_with_context(
        &self,
        level: Level,
        message: String,
        explicit: Vec<(String, Field)>,
        ctx: Option<&Context>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let mut fields = Vec::with_capacity(self.inner.attached.len() + explicit.len() + 2);
        if let Some(ctx) = ctx {
            fields.extend(ctx.extracted_fields(&self.inner.context_keys));
        }
        fields.extend(self.inner.attached.iter().cloned());
        fields.extend(explicit);

        let caller = if self.inner.caller {
            let loc = Location::caller();
            Some(format!("{}:{}", loc.file(), loc.line()))
        } else {
            None
        };

        let (stacktrace, error_verbose) = self.capture_stack(level, &fields);

        let record = LogRecord {
            timestamp: chrono::Utc::now(),
            level,
            message,
            name: self.inner.name.clone(),
            caller,
            fields,
            stacktrace,
            error_verbose,
        };

        self.dispatch(&record);
    }

    fn capture_stack(
        &self,
        level: Level,
        fields: &[(String, Field)],
    ) -> (Option<String>, Option<String>) {
        let structured_stack = fields.iter().find_map(|(key, value)| {
            if key != "error" {
                return None;
            }
            match value {
                Field::Json(v) => v.get("stack").and_then(|s| s.as_str()).map(str::to_string),
                _ => None,
            }
        });
        if let Some(stack) = structured_stack {
            return (None, Some(stack));
        }
        if self.inner.stacktrace && level >= self.inner.stacktrace_level {
            let trace = std::backtrace::Backtrace::force_capture().to_string();
            return (Some(trace), None);
        }
        (None, None)
    }

    fn dispatch(&self, record: &LogRecord) {
        let bytes = encode::encode(record, self.inner.format);
        for sink in &self.inner.sinks {
            if let Err(err) = sink.write_record(&bytes) {
                eprintln!("ignite-log: sink write failed: {err}");
            }
        }
        if record.level >= Level::Error {
            for sink in &self.inner.error_sinks {
                if let Err(err) = sink.write_record(&bytes) {
                    eprintln!("ignite-log: error sink write failed: {err}");
                }
            }
        }
    }

    fn terminate_fatal(&self) {
        let _ = self.sync();
        std::process::exit(1);
    }

    fn terminate_panic(&self) -> ! {
        let _ = self.sync();
        panic!("ignite-log: panic()-level record logged, see sink output for details");
    }
}

fn clone_inner(inner: &Arc<LoggerInner>) -> LoggerInner {
    LoggerInner {
        level: inner.level,
        format: inner.format,
        caller: inner.caller,
        stacktrace: inner.stacktrace,
        stacktrace_level: inner.stacktrace_level,
        name: inner.name.clone(),
        sinks: inner.sinks.clone(),
        error_sinks: inner.error_sinks.clone(),
        attached: inner.attached.clone(),
        context_keys: inner.context_keys.clone(),
    }
}

macro_rules! level_methods {
    (
        $level:ident,
        $plain:ident, $formatted:ident, $structured:ident,
        $ctx_plain:ident, $ctx_formatted:ident, $ctx_structured:ident,
        terminal = $terminal:ident
    ) => {
        #[track_caller]
        pub fn $plain(&self, msg: &str) {
            self.emit(Level::$level, msg.to_string(), Vec::new());
            self.$terminal();
        }

        #[track_caller]
        pub fn $formatted(&self, args: std::fmt::Arguments<'_>) {
            self.emit(Level::$level, args.to_string(), Vec::new());
            self.$terminal();
        }

        #[track_caller]
        pub fn $structured(&self, msg: &str, fields: &[(&str, Field)]) {
            let owned = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
            self.emit(Level::$level, msg.to_string(), owned);
            self.$terminal();
        }

        #[track_caller]
        pub fn $ctx_plain(&self, ctx: &Context, msg: &str) {
            self.emit_with_context(Level::$level, msg.to_string(), Vec::new(), Some(ctx));
            self.$terminal();
        }

        #[track_caller]
        pub fn $ctx_formatted(&self, ctx: &Context, args: std::fmt::Arguments<'_>) {
            self.emit_with_context(Level::$level, args.to_string(), Vec::new(), Some(ctx));
            self.$terminal();
        }

        #[track_caller]
        pub fn $ctx_structured(&self, ctx: &Context, msg: &str, fields: &[(&str, Field)]) {
            let owned = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
            self.emit_with_context(Level::$level, msg.to_string(), owned, Some(ctx));
            self.$terminal();
        }
    };
}

/// No-op terminal action: debug/info/warn/error just return.
impl Logger {
    fn noop_terminal(&self) {}

    level_methods!(Debug, debug, debugf, debugw, ctx_debug, ctx_debugf, ctx_debugw, terminal = noop_terminal);
    level_methods!(Info, info, infof, infow, ctx_info, ctx_infof, ctx_infow, terminal = noop_terminal);
    level_methods!(Warn, warn, warnf, warnw, ctx_warn, ctx_warnf, ctx_warnw, terminal = noop_terminal);
    level_methods!(Error, error, errorf, errorw, ctx_error, ctx_errorf, ctx_errorw, terminal = noop_terminal);
}

/// `Fatal` writes then terminates the process with exit code 1 (§4.4).
impl Logger {
    level_methods!(Fatal, fatal, fatalf, fatalw, ctx_fatal, ctx_fatalf, ctx_fatalw, terminal = terminate_fatal_unit);

    fn terminate_fatal_unit(&self) {
        self.terminate_fatal();
    }
}

/// `Panic` writes then raises a language-appropriate abort. These never
/// return, but the macro-generated signatures above are uniform across
/// levels, so the divergence happens once execution reaches `terminate_panic`.
impl Logger {
    level_methods!(Panic, panic, panicf, panicw, ctx_panic, ctx_panicf, ctx_panicw, terminal = terminate_panic_unit);

    fn terminate_panic_unit(&self) {
        self.terminate_panic();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LogOptions;

    #[test]
    fn level_filter_drops_below_configured_minimum() {
        let logger = Logger {
            inner: Arc::new(
                LoggerInner::build(&LogOptions {
                    level: Level::Warn,
                    ..LogOptions::default()
                })
                .unwrap(),
            ),
        };
        assert!(!logger.enabled(Level::Debug));
        assert!(!logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Warn));
        assert!(logger.enabled(Level::Error));
    }

    #[test]
    fn with_name_nests_under_parent() {
        let logger = global().with_name("child");
        assert_eq!(logger.inner.name.as_deref(), Some("child"));
        let grandchild = logger.with_name("grand");
        assert_eq!(grandchild.inner.name.as_deref(), Some("child.grand"));
    }

    #[test]
    fn with_values_pre_attaches_fields() {
        let logger = global().with_values(&[("request_id", Field::Str("r1".into()))]);
        assert_eq!(logger.inner.attached.len(), 1);
    }

    /// §3/§4.4: `LogOptions::context_keys` is the sole source of which custom
    /// context fields a logger auto-extracts; it must survive `with_name`'s
    /// `clone_inner` unchanged.
    #[test]
    fn context_keys_thread_through_build_and_clone() {
        let logger = Logger {
            inner: Arc::new(
                LoggerInner::build(&LogOptions {
                    context_keys: vec!["tenant".to_string()],
                    ..LogOptions::default()
                })
                .unwrap(),
            ),
        };
        assert_eq!(logger.inner.context_keys, vec!["tenant".to_string()]);

        let derived = logger.with_name("child");
        assert_eq!(derived.inner.context_keys, vec!["tenant".to_string()]);
    }
}
