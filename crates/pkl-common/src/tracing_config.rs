//! Tracing configuration for the language server.
//!
//! Supports three output formats controlled by `PKL_LSP_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! PKL_LSP_LOG=debug PKL_LSP_LOG_FORMAT=tree pkl-lsp
//! PKL_LSP_LOG="pkl_checker=trace,pkl_common::cache=debug" pkl-lsp
//! ```
//!
//! The subscriber is only initialised when `PKL_LSP_LOG` (or `RUST_LOG`) is
//! set. All output goes to stderr so it never interferes with the JSON-RPC
//! stream on stdout.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("PKL_LSP_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `PKL_LSP_LOG`, falling back to `RUST_LOG` and
/// then to `default_directive`.
fn build_filter(default_directive: Option<&str>) -> Option<EnvFilter> {
    if let Ok(val) = std::env::var("PKL_LSP_LOG") {
        Some(EnvFilter::builder().parse_lossy(val))
    } else if std::env::var("RUST_LOG").is_ok() {
        Some(EnvFilter::from_default_env())
    } else {
        default_directive.map(|directive| EnvFilter::builder().parse_lossy(directive))
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `PKL_LSP_LOG` nor `RUST_LOG` is set. Calling it
/// twice is harmless: the second installation attempt is ignored.
pub fn init_tracing() {
    init_tracing_with(None);
}

/// Like [`init_tracing`], but installs a subscriber filtered by
/// `default_directive` (e.g. the client's configured log level) when the
/// environment sets no filter.
pub fn init_tracing_with(default_directive: Option<&str>) {
    let Some(filter) = build_filter(default_directive) else {
        return;
    };
    let installed = match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_span_retrace(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).try_init().is_ok()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init().is_ok()
        }
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };
    if !installed {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("TREE"), LogFormat::Tree);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
        assert_eq!(LogFormat::parse("verbose"), LogFormat::Text);
    }
}
