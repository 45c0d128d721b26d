//! Canonical resource identity shared by the diagram and the backend.
//!
//! A [`NodeId`] names one cloud/platform resource as
//! `provider:type[:namespace]:name`. The string form is the join key between
//! diagram nodes and the architecture's resource metadata, so encoding and
//! decoding must be exact inverses.
//!
//! Built on `winnow` 0.7. Segments that would otherwise be ambiguous (empty,
//! or containing `:` `[` `]` `\`) are written in brackets with `]` and `\`
//! escaped by a backslash.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use thiserror::Error;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{none_of, one_of, take_while};

/// A malformed resource identifier. Never carries a partially-decoded id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource id {input:?}: {reason}")]
pub struct InvalidIdFormat {
    input: String,
    reason: String,
}

impl InvalidIdFormat {
    fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// The text that failed to decode.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Identity of a resource: provider, type, optional namespace, and name.
///
/// Immutable once built. Renaming a resource means building a new `NodeId`
/// and replacing the old one, never editing in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    provider: String,
    kind: String,
    namespace: Option<String>,
    name: String,
}

impl NodeId {
    /// Build a validated id. An empty `namespace` is treated as absent.
    pub fn new(
        provider: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Result<Self, InvalidIdFormat> {
        let provider = provider.into();
        let kind = kind.into();
        let name = name.into();
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_owned);

        let describe = || format!("{provider}:{kind}:{}:{name}", namespace.as_deref().unwrap_or(""));
        if !is_identifier(&provider) {
            return Err(InvalidIdFormat::new(describe(), "provider must be a non-empty identifier"));
        }
        if !is_identifier(&kind) {
            return Err(InvalidIdFormat::new(describe(), "type must be a non-empty identifier"));
        }
        if name.is_empty() {
            return Err(InvalidIdFormat::new(describe(), "name must not be empty"));
        }

        Ok(Self {
            provider,
            kind,
            namespace,
            name,
        })
    }

    /// Decode the canonical string form.
    pub fn parse(text: &str) -> Result<Self, InvalidIdFormat> {
        let (provider, kind, first, second) = node_id_parts
            .parse(text)
            .map_err(|e| InvalidIdFormat::new(text, format!("at offset {}: {}", e.offset(), e.inner())))?;

        let (namespace, name) = match second {
            Some(name) => (Some(first), name),
            None => (None, first),
        };
        if name.is_empty() {
            return Err(InvalidIdFormat::new(text, "missing name"));
        }

        Self::new(provider, kind, namespace.as_deref(), name)
            .map_err(|e| InvalidIdFormat::new(text, e.reason))
    }

    /// Parse at a UI boundary: malformed text means "no resource", logged
    /// at debug level instead of surfacing an error.
    pub fn parse_or_log(text: &str) -> Option<Self> {
        match Self::parse(text) {
            Ok(id) => Some(id),
            Err(err) => {
                log::debug!("treating resource as unidentified: {err}");
                None
            }
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The resource type, e.g. `s3_bucket`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `provider:type`, used for icon and metadata lookups.
    pub fn qualified_type(&self) -> String {
        format!("{}:{}", self.provider, self.kind)
    }

    /// Human-facing name: `namespace/name`, or just `name`.
    pub fn display_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.provider, self.kind)?;
        if let Some(ns) = &self.namespace {
            write_segment(f, ns)?;
            f.write_char(':')?;
        }
        write_segment(f, &self.name)
    }
}

impl FromStr for NodeId {
    type Err = InvalidIdFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NodeId::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ─── Encoding ────────────────────────────────────────────────────────────

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

fn is_reserved(c: char) -> bool {
    matches!(c, ':' | '[' | ']' | '\\')
}

fn write_segment(f: &mut fmt::Formatter<'_>, segment: &str) -> fmt::Result {
    if !segment.is_empty() && !segment.chars().any(is_reserved) {
        return f.write_str(segment);
    }
    f.write_char('[')?;
    for c in segment.chars() {
        if c == ']' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char(']')
}

// ─── Decoding ────────────────────────────────────────────────────────────

type Parts<'a> = (&'a str, &'a str, String, Option<String>);

fn node_id_parts<'a>(input: &mut &'a str) -> ModalResult<Parts<'a>> {
    let provider = identifier
        .context(StrContext::Label("provider"))
        .parse_next(input)?;
    ':'.parse_next(input)?;
    let kind = identifier
        .context(StrContext::Label("type"))
        .parse_next(input)?;
    ':'.parse_next(input)?;
    let first = segment.parse_next(input)?;
    let second = opt(preceded(':', segment)).parse_next(input)?;
    Ok((provider, kind, first, second))
}

fn identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., is_identifier_char).parse_next(input)
}

fn segment(input: &mut &str) -> ModalResult<String> {
    alt((bracketed_segment, plain_segment)).parse_next(input)
}

fn plain_segment(input: &mut &str) -> ModalResult<String> {
    take_while(0.., |c: char| !is_reserved(c))
        .map(str::to_owned)
        .parse_next(input)
}

fn bracketed_segment(input: &mut &str) -> ModalResult<String> {
    let escaped = preceded('\\', one_of([']', '\\']));
    let unescaped = none_of([']', '\\']);
    delimited(
        '[',
        repeat::<_, _, String, _, _>(0.., alt((escaped, unescaped))),
        cut_err(']').context(StrContext::Expected(StrContextValue::CharLiteral(']'))),
    )
    .parse_next(input)
}
