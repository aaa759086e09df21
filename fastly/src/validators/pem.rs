//! PEM block validators
//!
//! Only the textual structure is checked: BEGIN/END framing, matching labels
//! and a base64 body. The decoded bytes are never parsed as DER.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::validator::violation;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "\n-----END ";
const DASHES: &str = "-----";

/// A decoded PEM block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: String,
    pub contents: Vec<u8>,
}

/// Find and decode the first well-formed PEM block in `data`, returning it
/// together with everything after its END line. Malformed candidates are
/// skipped; `None` means no block was found at all.
pub fn decode(data: &str) -> Option<(Block, &str)> {
    let mut rest = data;
    loop {
        let start = if rest.starts_with(BEGIN) {
            0
        } else {
            rest.find("\n-----BEGIN ")? + 1
        };
        let after_begin = &rest[start + BEGIN.len()..];
        if let Some(found) = parse_block(after_begin) {
            return Some(found);
        }
        rest = after_begin;
    }
}

fn parse_block(after_begin: &str) -> Option<(Block, &str)> {
    let (type_line, body) = split_line(after_begin);
    let label = type_line.strip_suffix(DASHES)?;

    let (body, after_end) = match body.strip_prefix(&END[1..]) {
        Some(after_end) => ("", after_end),
        None => {
            let idx = body.find(END)?;
            (&body[..idx], &body[idx + END.len()..])
        }
    };

    let (end_line, remainder) = split_line(after_end);
    if end_line.strip_suffix(DASHES)? != label {
        return None;
    }

    let encoded: String = skip_headers(body)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let contents = STANDARD.decode(encoded).ok()?;

    Some((
        Block {
            label: label.to_string(),
            contents,
        },
        remainder,
    ))
}

/// Split off the first line, trimming trailing blanks and carriage returns
fn split_line(s: &str) -> (&str, &str) {
    let (line, rest) = match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    };
    (line.trim_end_matches([' ', '\t', '\r']), rest)
}

/// RFC 1421 headers ("Proc-Type: ...") end at the first blank line
fn skip_headers(body: &str) -> &str {
    let (first, _) = split_line(body);
    if !first.contains(':') {
        return body;
    }
    let mut rest = body;
    while !rest.is_empty() {
        let (line, next) = split_line(rest);
        rest = next;
        if line.trim().is_empty() {
            break;
        }
    }
    rest
}

fn respond(diagnostics: Vec<tfplug::Diagnostic>) -> ValidatorResponse {
    ValidatorResponse { diagnostics }
}

/// Exactly one PEM block with the given label and nothing after it
pub struct PemBlock {
    label: String,
}

impl PemBlock {
    pub fn create(label: &str) -> Box<dyn Validator> {
        Box::new(Self {
            label: label.to_string(),
        })
    }
}

impl Validator for PemBlock {
    fn description(&self) -> String {
        format!("value must be a single PEM block of type '{}'", self.label)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if value.is_null() || value.is_unknown() {
            return respond(vec![]);
        }
        let key = request.path.to_string();
        let text = value.as_str().unwrap_or_default();

        let Some((block, rest)) = decode(text) else {
            return respond(vec![violation(
                &request.path,
                format!("expected {} to be a valid PEM-format block", key),
            )]);
        };
        if block.label != self.label {
            return respond(vec![violation(
                &request.path,
                format!(
                    "expected {} to be a valid PEM-format block of type '{}'",
                    key, self.label
                ),
            )]);
        }
        if !rest.is_empty() {
            return respond(vec![violation(
                &request.path,
                format!("expected {} to only contain one PEM-format block", key),
            )]);
        }
        respond(vec![])
    }
}

/// One or more PEM blocks, all with the given label. Trailing text that is
/// not a PEM block is ignored.
pub struct PemBlocks {
    label: String,
}

impl PemBlocks {
    pub fn create(label: &str) -> Box<dyn Validator> {
        Box::new(Self {
            label: label.to_string(),
        })
    }
}

impl Validator for PemBlocks {
    fn description(&self) -> String {
        format!("value must be one or more PEM blocks of type '{}'", self.label)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let value = &request.config_value.value;
        if value.is_null() || value.is_unknown() {
            return respond(vec![]);
        }
        let invalid = || {
            respond(vec![violation(
                &request.path,
                format!(
                    "expected {} to be valid PEM-format blocks of type '{}'",
                    request.path, self.label
                ),
            )])
        };

        let mut rest = value.as_str().unwrap_or_default();
        let mut count = 0;
        while let Some((block, next)) = decode(rest) {
            if block.label != self.label {
                return invalid();
            }
            count += 1;
            rest = next;
        }

        if count == 0 {
            return invalid();
        }
        respond(vec![])
    }
}
