/// A single structured value attached to a [`crate::record::LogRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl Field {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Field::Str(s) => serde_json::Value::String(s.clone()),
            Field::I64(i) => serde_json::Value::from(*i),
            Field::U64(u) => serde_json::Value::from(*u),
            Field::F64(f) => serde_json::Value::from(*f),
            Field::Bool(b) => serde_json::Value::Bool(*b),
            Field::Json(v) => v.clone(),
        }
    }

    /// Rendering used by the text and keyvalue encoders. Strings containing
    /// spaces, quotes, or control characters are shell-style quoted.
    pub fn to_display_string(&self) -> String {
        match self {
            Field::Str(s) => quote_if_needed(s),
            Field::I64(i) => i.to_string(),
            Field::U64(u) => u.to_string(),
            Field::F64(f) => f.to_string(),
            Field::Bool(b) => b.to_string(),
            Field::Json(v) => quote_if_needed(&v.to_string()),
        }
    }
}

fn quote_if_needed(s: &str) -> String {
    let needs_quoting = s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '"' || c.is_control());
    if !needs_quoting {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

macro_rules! impl_from {
    ($variant:ident, $($t:ty),+) => {
        $(impl From<$t> for Field {
            fn from(v: $t) -> Self {
                Field::$variant(v.into())
            }
        })+
    };
}

impl_from!(Str, &str, String);
impl_from!(I64, i8, i16, i32, i64);
impl_from!(U64, u8, u16, u32, u64);
impl_from!(F64, f32, f64);
impl_from!(Bool, bool);

impl From<serde_json::Value> for Field {
    fn from(v: serde_json::Value) -> Self {
        Field::Json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string_is_unquoted() {
        assert_eq!(Field::Str("hello".into()).to_display_string(), "hello");
    }

    #[test]
    fn string_with_space_is_quoted() {
        assert_eq!(Field::Str("hello world".into()).to_display_string(), "\"hello world\"");
    }

    #[test]
    fn string_with_embedded_quote_is_escaped() {
        assert_eq!(
            Field::Str("say \"hi\"".into()).to_display_string(),
            "\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn empty_string_is_quoted() {
        assert_eq!(Field::Str(String::new()).to_display_string(), "\"\"");
    }

    #[test]
    fn numeric_and_bool_variants_round_trip_to_json() {
        assert_eq!(Field::I64(-3).to_json(), serde_json::json!(-3));
        assert_eq!(Field::U64(7).to_json(), serde_json::json!(7));
        assert_eq!(Field::Bool(true).to_json(), serde_json::json!(true));
    }

    #[test]
    fn from_impls_select_the_right_variant() {
        assert_eq!(Field::from("s"), Field::Str("s".into()));
        assert_eq!(Field::from(3i32), Field::I64(3));
        assert_eq!(Field::from(3u32), Field::U64(3));
        assert_eq!(Field::from(true), Field::Bool(true));
    }
}
