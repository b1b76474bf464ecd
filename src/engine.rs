//! Engine selection: the fixed enumeration of supported backends and the
//! capability table keyed by it.

use crate::capability::Capabilities;
use crate::error::{GraphError, Result};
use std::fmt;
use std::str::FromStr;

/// A selectable graph-storage backend implementation.
///
/// The set is closed and small on purpose: each variant maps to a storage
/// medium and a fixed [`Capabilities`] row, and the rest of the crate is
/// written once against the union of all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// Embedded transactional store (RocksDB on a local path).
    EmbeddedTransactional,
    /// Distributed partitioned store. Key indexes only; no manual indexes.
    Distributed,
    /// REST-exposed store. No transactions, no key indexes.
    Rest,
    /// Document/object store repurposed as a graph store. Understands
    /// `username`/`password` configuration entries.
    Document,
    /// Pure in-memory store. No transactions; data lost on close.
    InMemory,
    /// Write-only batch store. No indexes, no transactions, no edge
    /// search: every edge creation is appended unconditionally.
    BatchWriteOnly,
}

impl Engine {
    /// All supported engines, in declaration order.
    pub const ALL: [Engine; 6] = [
        Engine::EmbeddedTransactional,
        Engine::Distributed,
        Engine::Rest,
        Engine::Document,
        Engine::InMemory,
        Engine::BatchWriteOnly,
    ];

    /// The normalized identifier token for this engine.
    pub fn id(&self) -> &'static str {
        match self {
            Engine::EmbeddedTransactional => "embedded-transactional",
            Engine::Distributed => "distributed",
            Engine::Rest => "rest",
            Engine::Document => "document",
            Engine::InMemory => "in-memory",
            Engine::BatchWriteOnly => "batch-write-only",
        }
    }

    /// Match an identifier against the fixed enumeration.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownEngine`] for anything outside the
    /// enumeration. Callers must treat that as a fatal configuration
    /// error and never proceed with a partially-initialized session.
    pub fn parse(identifier: &str) -> Result<Engine> {
        let normalized = identifier.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "embedded-transactional" => Ok(Engine::EmbeddedTransactional),
            "distributed" => Ok(Engine::Distributed),
            "rest" => Ok(Engine::Rest),
            "document" => Ok(Engine::Document),
            "in-memory" => Ok(Engine::InMemory),
            "batch-write-only" => Ok(Engine::BatchWriteOnly),
            _ => Err(GraphError::UnknownEngine {
                name: identifier.trim().to_string(),
            }),
        }
    }

    /// The static capability row for this engine.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Engine::EmbeddedTransactional => Capabilities {
                manual_indexes: true,
                key_indexes: true,
                transactions: true,
                edge_search: true,
            },
            Engine::Distributed => Capabilities {
                manual_indexes: false,
                key_indexes: true,
                transactions: true,
                edge_search: true,
            },
            Engine::Rest => Capabilities {
                manual_indexes: true,
                key_indexes: false,
                transactions: false,
                edge_search: true,
            },
            Engine::Document => Capabilities {
                manual_indexes: true,
                key_indexes: true,
                transactions: true,
                edge_search: true,
            },
            Engine::InMemory => Capabilities {
                manual_indexes: true,
                key_indexes: true,
                transactions: false,
                edge_search: true,
            },
            Engine::BatchWriteOnly => Capabilities {
                manual_indexes: false,
                key_indexes: false,
                transactions: false,
                edge_search: false,
            },
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Engine {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        Engine::parse(s)
    }
}
