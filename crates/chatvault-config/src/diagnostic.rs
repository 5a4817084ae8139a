// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic rendering for configuration failures.
//!
//! Figment reports deserialization problems as flat error values; this
//! module lifts them into miette diagnostics that point at the offending
//! line of the TOML source and, for unknown keys, propose the closest
//! valid key by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity floor below which no correction is proposed. 0.75 catches
/// `prot` -> `port` and `databse_path` -> `database_path` without
/// suggesting unrelated keys.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One configuration problem, renderable as a miette report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key the model does not know (`deny_unknown_fields` rejection).
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chatvault::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, when one is similar enough.
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(
        code(chatvault::config::invalid_type),
        help("expected {expected}")
    )]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the model requires but the sources never supplied.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chatvault::config::missing_key),
        help("add `{key} = <value>` to your chatvault.toml")
    )]
    MissingKey { key: String },

    /// A semantic constraint violated by an otherwise well-formed value.
    #[error("validation error: {message}")]
    #[diagnostic(code(chatvault::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no dedicated variant.
    #[error("configuration error: {0}")]
    #[diagnostic(code(chatvault::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(candidate) => format!("did you mean `{candidate}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Expand a `figment::Error` (which batches every problem it found) into
/// one `ConfigError` per problem. `toml_sources` pairs each source path
/// with its raw content so unknown-key errors can carry a span.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| classify_figment_error(e, toml_sources))
        .collect()
}

fn classify_figment_error(
    error: figment::error::Error,
    toml_sources: &[(String, String)],
) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, accepted) => {
            let accepted: Vec<&str> = accepted.to_vec();
            let suggestion = suggest_key(field, &accepted);
            let (span, src) = locate_in_sources(&error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion,
                valid_keys: accepted.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted_path(&error),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
            span: None,
            src: None,
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted_path(error: &figment::error::Error) -> String {
    error
        .path
        .iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Resolve the span of `field` inside whichever TOML source produced the
/// error. Returns nothing when the source is not a file we read (env
/// overrides, inline strings we were not given).
fn locate_in_sources(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(path) = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(p) => Some(p.display().to_string()),
            _ => None,
        })
    else {
        return (None, None);
    };

    let Some((name, content)) = toml_sources.iter().find(|(p, _)| *p == path) else {
        return (None, None);
    };

    let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    match find_key_offset(content, &section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` within `content`, scoped to the `[section]`
/// named by the first element of `path` (or the whole file for top-level
/// keys). The match must be a full key: the field name at the start of a
/// line, followed by `=` or whitespace.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let scope_start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut cursor = scope_start;
    for line in content[scope_start..].lines() {
        let key = line.trim_start();
        if let Some(rest) = key.strip_prefix(field) {
            if matches!(rest.chars().next(), Some('=' | ' ' | '\t')) {
                return Some(cursor + (line.len() - key.len()));
            }
        }
        cursor += line.len() + 1;
    }
    None
}

/// The valid key most similar to `unknown`, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Render each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        if handler.render_report(&mut rendered, error as &dyn Diagnostic).is_ok() {
            eprint!("{rendered}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
