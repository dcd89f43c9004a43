//! `Accept-Encoding` parsing and content coding selection.
//!
//! Selection deliberately lets the server's priority order win over the client's quality
//! values: among the codings a client accepts at all, the first one in the server's priority
//! list is used. A client that sends no usable preference gets `identity`.

use crate::encoding::{Encoding, IDENTITY, WILDCARD};

/// One entry of an `Accept-Encoding` header.
#[derive(Debug, Clone, PartialEq)]
pub struct QValue {
    /// The coding token, lowercased.
    pub token: String,
    /// The quality, always within `(0, 1]` for parsed entries.
    pub quality: f32,
}

impl QValue {
    pub fn new(token: impl Into<String>, quality: f32) -> Self {
        Self { token: token.into(), quality }
    }

    fn accepts(&self, token: &str) -> bool {
        self.quality > 0.0 && self.token == token
    }
}

/// Outcome of [`negotiate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiated {
    /// Compress with this coding.
    Encoding(Encoding),
    /// Send the body as is.
    Identity,
    /// Nothing the client accepts is available; callers send the body as is.
    NotAcceptable,
}

impl Negotiated {
    /// The chosen coding, if any.
    pub fn encoding(self) -> Option<Encoding> {
        match self {
            Negotiated::Encoding(encoding) => Some(encoding),
            Negotiated::Identity | Negotiated::NotAcceptable => None,
        }
    }
}

/// Parses an `Accept-Encoding` header value.
///
/// Entries with a quality of zero, a negative or an unparsable quality are dropped; qualities
/// above one are clamped. The result is sorted by descending quality, keeping header order for
/// equal qualities.
pub fn parse_accept_encoding(header: &str) -> Vec<QValue> {
    let mut values: Vec<QValue> = header
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut params = part.split(';');
            let token = params.next().unwrap_or_default().trim().to_ascii_lowercase();
            if token.is_empty() {
                return None;
            }
            let quality = params.map(str::trim).find_map(parse_quality).unwrap_or(1.0);
            (quality > 0.0).then(|| QValue::new(token, quality))
        })
        .collect();

    // sort_by is stable, so equal qualities keep their header order
    values.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    values
}

/// Returns the quality of a `q=` parameter, `None` for any other parameter.
fn parse_quality(param: &str) -> Option<f32> {
    let (name, value) = param.split_once('=')?;
    if !name.trim().eq_ignore_ascii_case("q") {
        return None;
    }
    let quality = match value.trim().parse::<f32>() {
        Ok(q) if q.is_nan() => 0.0,
        Ok(q) => q.clamp(0.0, 1.0),
        Err(_) => 0.0,
    };
    Some(quality)
}

/// Chooses the coding for a response.
///
/// `client_prefs` is the output of [`parse_accept_encoding`], `is_enabled` tells which codings
/// the server has configured and `server_priority` orders them.
pub fn negotiate<F>(client_prefs: &[QValue], is_enabled: F, server_priority: &[Encoding]) -> Negotiated
where
    F: Fn(Encoding) -> bool,
{
    if client_prefs.is_empty() {
        return Negotiated::Identity;
    }

    let mut enabled = server_priority.iter().copied().filter(|encoding| is_enabled(*encoding));

    if let Some(encoding) =
        enabled.clone().find(|encoding| client_prefs.iter().any(|pref| pref.accepts(encoding.as_str())))
    {
        return Negotiated::Encoding(encoding);
    }

    if client_prefs.iter().any(|pref| pref.accepts(WILDCARD))
        && let Some(encoding) = enabled.next()
    {
        return Negotiated::Encoding(encoding);
    }

    if client_prefs.iter().any(|pref| pref.accepts(IDENTITY)) {
        return Negotiated::Identity;
    }

    Negotiated::NotAcceptable
}
