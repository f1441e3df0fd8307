// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pingback payload validator.
//!
//! Turns a raw XML-RPC request body into a (source, target) URL pair:
//! - Empty body rejection
//! - `<methodName>pingback.ping</methodName>` marker check
//! - Well-formedness and `methodCall` structure of the document
//! - Positional source/target extraction from `methodCall/params/param/value`
//! - Source URL scheme/host validation

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// XML-RPC method name of the pingback operation.
pub const PING_METHOD: &str = "pingback.ping";

const METHOD_MARKER: &str = "<methodName>pingback.ping</methodName>";

/// Payload rejection reasons.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Empty request body")]
    Empty,

    #[error("Method not found: body does not invoke pingback.ping")]
    MethodNotFound,

    #[error("Malformed XML-RPC payload: {0}")]
    Malformed(String),

    #[error("URL not found: expected source and target parameters, got {found}")]
    UrlNotFound { found: usize },

    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),
}

/// Source and target URLs extracted from a valid payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingbackClaim {
    pub source_url: String,
    pub target_url: String,
}

/// Validate a raw pingback request body.
pub fn validate_payload(body: &str) -> Result<PingbackClaim, PayloadError> {
    if body.trim().is_empty() {
        debug!("Empty pingback payload");
        return Err(PayloadError::Empty);
    }

    if !body.contains(METHOD_MARKER) {
        debug!("Payload does not invoke pingback.ping");
        return Err(PayloadError::MethodNotFound);
    }

    let call = parse_call(body)?;
    if call.method_name.trim() != PING_METHOD {
        debug!(method = %call.method_name, "Payload invokes another method");
        return Err(PayloadError::MethodNotFound);
    }

    let params = call.params;
    let [source, target, ..] = params.as_slice() else {
        debug!(found = params.len(), "Missing pingback parameters");
        return Err(PayloadError::UrlNotFound {
            found: params.len(),
        });
    };

    let claim = PingbackClaim {
        source_url: source.trim().to_string(),
        target_url: target.trim().to_string(),
    };
    validate_source_url(&claim.source_url)?;

    debug!(source = %claim.source_url, target = %claim.target_url, "Payload valid");
    Ok(claim)
}

/// The source must be an absolute http(s) URL with a host, so that a domain
/// can always be derived from it once accepted.
fn validate_source_url(source: &str) -> Result<(), PayloadError> {
    let invalid = || PayloadError::InvalidSourceUrl(source.to_string());
    let url = Url::parse(source).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        debug!(source = %source, "Invalid source URL (bad scheme or no host)");
        return Err(invalid());
    }
    Ok(())
}

const ROOT: &[u8] = b"methodCall";
const PARAMS: &[&[u8]] = &[ROOT, b"params"];
const METHOD_NAME: &[&[u8]] = &[ROOT, b"methodName"];

/// The parts of a `methodCall` document pingback cares about.
#[derive(Debug, Default)]
struct MethodCall {
    method_name: String,
    params: Vec<String>,
}

/// Parse a `methodCall` document, taking params only from
/// `methodCall/params/param/value`.
fn parse_call(body: &str) -> Result<MethodCall, PayloadError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut current: Option<String> = None;
    let mut call = MethodCall::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_placement(&path, &mut seen_root, &name)?;
                if name == b"param" {
                    current = Some(String::new());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                check_placement(&path, &mut seen_root, &name)?;
                if name == b"param" {
                    call.params.push(String::new());
                }
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some(b"param".as_slice()) {
                    if let Some(value) = current.take() {
                        call.params.push(value);
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| PayloadError::Malformed(e.to_string()))?;
                append_text(&path, &mut call.method_name, &mut current, &text)?;
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&path, &mut call.method_name, &mut current, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "XML-RPC parse failure");
                return Err(PayloadError::Malformed(e.to_string()));
            }
        }
    }

    if !path.is_empty() {
        return Err(PayloadError::Malformed("unclosed element".to_string()));
    }
    if !seen_root {
        return Err(PayloadError::Malformed("no methodCall element".to_string()));
    }

    Ok(call)
}

/// A document has exactly one `methodCall` root and `param` only under `params`.
fn check_placement(
    path: &[Vec<u8>],
    seen_root: &mut bool,
    name: &[u8],
) -> Result<(), PayloadError> {
    if path.is_empty() {
        if *seen_root || name != ROOT {
            return Err(PayloadError::Malformed(format!(
                "unexpected root element <{}>",
                String::from_utf8_lossy(name)
            )));
        }
        *seen_root = true;
    } else if name == b"param" && !at(path, PARAMS) {
        return Err(PayloadError::Malformed(
            "<param> outside methodCall/params".to_string(),
        ));
    }
    Ok(())
}

fn append_text(
    path: &[Vec<u8>],
    method_name: &mut String,
    current: &mut Option<String>,
    text: &str,
) -> Result<(), PayloadError> {
    if path.is_empty() {
        return Err(PayloadError::Malformed(
            "text outside methodCall".to_string(),
        ));
    }
    if at(path, METHOD_NAME) {
        method_name.push_str(text);
    } else if let Some(value) = current.as_mut() {
        // path is methodCall/params/param/...
        if path.get(3).map(Vec::as_slice) != Some(b"value".as_slice()) {
            return Err(PayloadError::Malformed(
                "param content outside <value>".to_string(),
            ));
        }
        value.push_str(text);
    }
    Ok(())
}

fn at(path: &[Vec<u8>], expected: &[&[u8]]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a.as_slice() == *b)
}
