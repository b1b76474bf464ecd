//! Static capability descriptors for the supported engines.
//!
//! Capability is a property of the *engine choice*, never probed at
//! runtime: the flags are fixed when the session opens and every optional
//! operation is gated on them at the session layer.

/// The fixed set of optional features an engine choice supports.
///
/// Immutable after session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Caller-populated secondary indexes keyed by arbitrary property
    /// name/value pairs.
    pub manual_indexes: bool,
    /// Backend-maintained secondary indexes for declared property names.
    pub key_indexes: bool,
    /// Explicit transaction boundaries with commit/rollback.
    pub transactions: bool,
    /// Outgoing-edge scans usable for duplicate-edge suppression.
    pub edge_search: bool,
}

impl Capabilities {
    /// True when any index kind is available.
    pub fn any_indexes(&self) -> bool {
        self.manual_indexes || self.key_indexes
    }
}
