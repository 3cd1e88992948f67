//! Response parsing: raw model text → the 15 contract fields.
//!
//! Even a well-prompted model occasionally disobeys "respond with JSON only":
//! it wraps the object in ```json fences, switches to single quotes, emits
//! Python-style `None`/`True`/`False`, or surrounds the object with a polite
//! sentence. Rather than rejecting those pages, decoding runs in two stages:
//!
//! 1. **Strict** — strip outer code fences, then standard JSON decoding.
//! 2. **Permissive** — drop fence markers anywhere, keep only the outermost
//!    `{…}` span, rewrite single-quoted strings and Python literals into
//!    JSON, then decode strictly again.
//!
//! Only when both stages fail is the page a parse failure — reported, never
//! raised. The permissive rewrite is best-effort by design; its exact
//! leniency boundary is not a contract.
//!
//! Missing keys are treated as null rather than errors: the response schema
//! is not self-describing, and a model that omits a key it found nothing for
//! should cost us one field, not the page.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::output::ExtractionRecord;

/// Decode the model's raw response text into a key → value mapping.
///
/// Fenced and unfenced responses parse identically. On failure the returned
/// detail describes both stages for the page report.
pub fn parse_fields(raw: &str) -> Result<Map<String, Value>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    // Stage 1: strict JSON after removing an enclosing fence block.
    let unfenced = strip_outer_fences(trimmed);
    let strict_detail = match serde_json::from_str::<Value>(unfenced.trim()) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected a JSON object, got {}", value_kind(&other)),
        Err(e) => e.to_string(),
    };

    // Stage 2: permissive decode of looser, Python-flavoured output.
    debug!("Strict decode failed ({strict_detail}); trying permissive decode");
    permissive_decode(trimmed)
        .ok_or_else(|| format!("strict decode failed ({strict_detail}); permissive decode failed"))
}

/// Build a tagged record from a decoded mapping.
///
/// Keys absent from the mapping become `None`; string values are kept exactly
/// as extracted (including whitespace-only strings); stray numbers and
/// booleans are stringified rather than dropped.
pub fn record_from_map(map: &Map<String, Value>, file: &str, page: usize) -> ExtractionRecord {
    let field = |key: &str| field_value(map.get(key));

    ExtractionRecord {
        cnpj_prestador: field("cnpj_prestador"),
        nome_prestador: field("nome_prestador"),
        cnpj_tomador: field("cnpj_tomador"),
        nome_tomador: field("nome_tomador"),
        numero_nota: field("numero_nota"),
        data_emissao: field("data_emissao"),
        valor_total: field("valor_total"),
        discriminacao_servico: field("discriminacao_servico"),
        ir: field("ir"),
        pis: field("pis"),
        cofins: field("cofins"),
        csll: field("csll"),
        inss: field("inss"),
        iss: field("iss"),
        valor_aproximado_tributos: field("valor_aproximado_tributos"),
        nome_arquivo: file.to_string(),
        pagina: page,
    }
}

fn field_value(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Stage 1: outer fence stripping ───────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps.get(1).map_or(input, |m| m.as_str()),
        None => input,
    }
}

// ── Stage 2: permissive decode ───────────────────────────────────────────────

/// Best-effort decode of almost-JSON: fence markers anywhere, surrounding
/// prose, single-quoted strings, Python literal forms.
fn permissive_decode(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = raw.replace("```json", "").replace("```", "");

    // Keep only the outermost object when prose surrounds it.
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }

    let rewritten = pythonish_to_json(&cleaned[start..=end]);
    match serde_json::from_str::<Value>(&rewritten) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Rewrite Python-literal syntax into JSON: single-quoted strings become
/// double-quoted and bare `None`/`True`/`False` become JSON literals.
/// Characters inside double-quoted strings pass through untouched.
fn pythonish_to_json(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Plain,
        Single,
        Double,
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut state = State::Plain;

    while let Some(c) = chars.next() {
        match state {
            State::Plain => match c {
                '\'' => {
                    state = State::Single;
                    out.push('"');
                }
                '"' => {
                    state = State::Double;
                    out.push('"');
                }
                c if c.is_alphabetic() => {
                    let mut word = String::new();
                    word.push(c);
                    while let Some(&next) = chars.peek() {
                        if next.is_alphanumeric() || next == '_' {
                            word.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match word.as_str() {
                        "None" => out.push_str("null"),
                        "True" => out.push_str("true"),
                        "False" => out.push_str("false"),
                        _ => out.push_str(&word),
                    }
                }
                _ => out.push(c),
            },
            State::Single => match c {
                '\\' => match chars.next() {
                    // Python escapes the quote itself; JSON must not.
                    Some('\'') => out.push('\''),
                    Some('"') => out.push_str("\\\""),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                },
                '\'' => {
                    state = State::Plain;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            },
            State::Double => match c {
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    state = State::Plain;
                    out.push('"');
                }
                _ => out.push(c),
            },
        }
    }

    out
}
