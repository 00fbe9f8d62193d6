//! Input sanitizer
//!
//! Rewrites every string in the request body and every header value. Never
//! blocks.

use super::{Next, SecurityContext, SecurityMiddleware};
use crate::error::SecurityResult;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("script pattern is valid");
}

/// Sanitize a single string
///
/// ASCII control characters are stripped first, then script blocks are
/// removed until none remain, then the result is trimmed. Stripping first
/// means a control character inside a tag cannot shield the block:
/// `<script>a</script\0>b` becomes `b`.
pub fn sanitize_str(input: &str) -> String {
    let mut out: String = input.chars().filter(|c| !c.is_ascii_control()).collect();
    // Removing one block can splice the halves of another back together
    loop {
        let next = SCRIPT_BLOCK.replace_all(&out, "");
        if next == out {
            break;
        }
        out = next.into_owned();
    }
    out.trim().to_string()
}

/// Sanitize a JSON value in place, recursing into arrays and objects
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = sanitize_str(s),
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::Object(fields) => fields.values_mut().for_each(sanitize_value),
        _ => {}
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSanitizer;

impl InputSanitizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecurityMiddleware for InputSanitizer {
    fn name(&self) -> &str {
        "InputSanitizer"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        sanitize_value(&mut ctx.body);
        for value in ctx.headers.values_mut() {
            let cleaned = sanitize_str(value);
            *value = cleaned;
        }
        next.run(ctx).await?;
        Ok(())
    }
}
