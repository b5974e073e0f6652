/// Non-fatal errors surfaced by [`crate::logger::Logger::sync`] and sink
/// construction. Emission itself never returns an error — a failing sink is
/// logged to stderr and skipped so the others still receive the record.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("sink flush failed: {0}")]
    Flush(#[from] std::io::Error),

    #[error("unrecognised output target `{0}`, expected \"stdout\", \"stderr\", or a file path")]
    UnknownOutput(String),
}
