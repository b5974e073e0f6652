use crate::field::Field;

/// A request-scoped association list consulted by the `Ctx*` logging calls
/// (§3 "Context (log)"). Three well-known slots plus whatever custom key
/// descriptors the logger was constructed with.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub trace_id: Option<String>,
    pub request_id: Option<String>,
    custom: Vec<(String, Field)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attaches a custom context key, declared at logger construction via
    /// [`crate::options::LogOptions::context_keys`]. Its textual form is the
    /// field name in the emitted record.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Field>) -> Self {
        self.custom.push((key.into(), value.into()));
        self
    }

    /// The ordered list of context-extracted fields: `trace_id`,
    /// `request_id` (always surfaced when set), then custom keys in
    /// declaration order, restricted to `declared` — the descriptor names
    /// the logger was constructed with via
    /// [`crate::options::LogOptions::context_keys`]. A custom key attached
    /// via [`Context::with_custom`] that wasn't declared at `init` is
    /// silently dropped, matching §4.4: only descriptors "configured at
    /// init" are auto-extracted.
    pub(crate) fn extracted_fields(&self, declared: &[String]) -> Vec<(String, Field)> {
        let mut out = Vec::with_capacity(2 + self.custom.len());
        if let Some(trace_id) = &self.trace_id {
            out.push(("trace_id".to_string(), Field::Str(trace_id.clone())));
        }
        if let Some(request_id) = &self.request_id {
            out.push(("request_id".to_string(), Field::Str(request_id.clone())));
        }
        out.extend(
            self.custom
                .iter()
                .filter(|(key, _)| declared.iter().any(|d| d == key))
                .cloned(),
        );
        out
    }
}
