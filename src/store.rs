//! KV-backed graph element store shared by every engine.
//!
//! Key layout (all values JSON):
//!
//! ```text
//! meta:counters                      id counters
//! vertex:{id}                        vertex record
//! edge:{id}                          edge record
//! adj:out:{vid}:{label}:{eid}        outgoing adjacency entry (value: edge id)
//! adj:in:{vid}:{eid}                 incoming adjacency entry (value: edge id)
//! idx:{name}                         manual index descriptor
//! idxe:{name}:{key}:{value}:{id}     manual index entry (value: element id)
//! kidx:{kind}:{key}                  key index marker
//! ```
//!
//! On transactional engines every write lands in a pending overlay that
//! reads merge over the backend (read-your-writes); `commit` applies the
//! overlay as one atomic batch and `rollback` discards it, restoring the
//! id counters to their last-committed values. Non-transactional engines
//! write straight through.

use crate::error::{GraphError, Result};
use crate::kv::{BatchOp, KvBackend};
use crate::property::{PropertyMap, PropertyValue};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a vertex (monotonic counter).
pub type VertexId = u64;

/// Unique identifier for an edge (monotonic counter).
pub type EdgeId = u64;

/// Scope of a secondary index: over vertices or over edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Index over vertices
    Vertex,
    /// Index over edges
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Reference to a vertex or an edge, for property operations that apply
/// to either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    /// A vertex, by id
    Vertex(VertexId),
    /// An edge, by id
    Edge(EdgeId),
}

/// A vertex record.
///
/// Vertices created through the session layer always carry the
/// layer-managed `type` and `sys_created_at` properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier (assigned by the store)
    pub id: VertexId,
    /// Key-value metadata
    pub properties: PropertyMap,
}

/// A directed, labeled edge record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier (assigned by the store)
    pub id: EdgeId,
    /// Free-form relationship label
    pub label: String,
    /// Source vertex id
    pub source: VertexId,
    /// Target vertex id
    pub target: VertexId,
    /// Key-value metadata
    pub properties: PropertyMap,
}

/// Handle to a named, typed manual index.
///
/// Obtained from `Session::get_or_create_index`; also the persisted
/// descriptor record for the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    name: String,
    kind: ElementKind,
}

impl IndexHandle {
    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the index files vertices or edges.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }
}

/// Persisted manual index entry.
///
/// Carries the key and value it was filed under: index names, property
/// keys, and value tokens may all contain the key separator, so reads
/// verify on the record rather than trusting the key prefix alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    key: String,
    value: PropertyValue,
    element: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Counters {
    vertices: u64,
    edges: u64,
}

const KEY_COUNTERS: &[u8] = b"meta:counters";

/// KV-backed element store with an optional transactional write overlay.
pub(crate) struct GraphStore {
    backend: Box<dyn KvBackend>,
    /// `Some` iff the engine supports transactions. `None` in the map
    /// value marks a pending delete.
    pending: Option<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    counters: Counters,
    committed: Counters,
}

impl GraphStore {
    pub fn open(backend: Box<dyn KvBackend>, transactional: bool) -> Result<Self> {
        let counters = match backend.get(KEY_COUNTERS)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map_err(|e| GraphError::serialization("Failed to deserialize counters", Some(e)))?,
            None => Counters::default(),
        };

        Ok(Self {
            backend,
            pending: transactional.then(BTreeMap::new),
            counters,
            committed: counters,
        })
    }

    // --- overlay-aware primitives ---

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = &self.pending {
            if let Some(entry) = pending.get(key) {
                return Ok(entry.clone());
            }
        }
        self.backend.get(key)
    }

    fn write(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        match &mut self.pending {
            Some(pending) => {
                pending.insert(key, Some(value));
                Ok(())
            }
            None => self.backend.put(&key, &value),
        }
    }

    fn erase(&mut self, key: Vec<u8>) -> Result<()> {
        match &mut self.pending {
            Some(pending) => {
                pending.insert(key, None);
                Ok(())
            }
            None => self.backend.delete(&key),
        }
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.backend.scan_prefix(prefix)?.into_iter().collect();

        if let Some(pending) = &self.pending {
            for (key, entry) in pending
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
            {
                match entry {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    // --- transaction boundary ---

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Apply all pending writes as one atomic batch.
    ///
    /// The overlay is discarded only once the batch has landed; a failed
    /// commit leaves every buffered write in place so the caller can
    /// retry or roll back. On non-transactional stores only the id
    /// counters are persisted.
    pub fn commit(&mut self) -> Result<()> {
        let counters_raw = serde_json::to_vec(&self.counters)
            .map_err(|e| GraphError::serialization("Failed to serialize counters", Some(e)))?;

        let Some(pending) = &self.pending else {
            return self.backend.put(KEY_COUNTERS, &counters_raw);
        };

        let mut ops: Vec<BatchOp> = pending
            .iter()
            .map(|(key, entry)| match entry {
                Some(value) => BatchOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                },
                None => BatchOp::Delete { key: key.clone() },
            })
            .collect();
        ops.push(BatchOp::Put {
            key: KEY_COUNTERS.to_vec(),
            value: counters_raw,
        });

        debug!("committing {} buffered writes", ops.len() - 1);
        self.backend.write_batch(ops)?;
        self.committed = self.counters;
        if let Some(pending) = self.pending.as_mut() {
            pending.clear();
        }
        Ok(())
    }

    /// Discard all pending writes, restoring the last-committed counters.
    pub fn rollback(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            trace!("discarding {} buffered writes", pending.len());
            pending.clear();
        }
        self.counters = self.committed;
    }

    /// Conclude transaction state before close.
    ///
    /// With `auto_commit` the pending writes are committed; otherwise they
    /// are discarded and the benign [`GraphError::ManualCommitRequired`]
    /// is reported for the session to swallow.
    pub fn finalize(&mut self, auto_commit: bool) -> Result<()> {
        if !self.has_pending() {
            return Ok(());
        }
        if auto_commit {
            self.commit()
        } else {
            self.rollback();
            Err(GraphError::ManualCommitRequired)
        }
    }

    /// Persist counters and flush the backend.
    pub fn close(&mut self) -> Result<()> {
        let counters_raw = serde_json::to_vec(&self.counters)
            .map_err(|e| GraphError::serialization("Failed to serialize counters", Some(e)))?;
        self.backend.put(KEY_COUNTERS, &counters_raw)?;
        self.backend.flush()
    }

    // --- elements ---

    pub fn add_vertex(&mut self, properties: PropertyMap) -> Result<VertexId> {
        let id = self.counters.vertices;
        self.counters.vertices += 1;

        let vertex = Vertex { id, properties };
        self.write(vertex_key(id), encode(&vertex, "vertex")?)?;
        trace!("vertex {id} created");
        Ok(id)
    }

    pub fn vertex(&self, id: VertexId) -> Result<Vertex> {
        match self.read(&vertex_key(id))? {
            Some(raw) => decode(&raw, "vertex"),
            None => Err(GraphError::VertexNotFound { id }),
        }
    }

    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        label: &str,
        properties: PropertyMap,
    ) -> Result<EdgeId> {
        // Both endpoints must exist
        self.vertex(source)?;
        self.vertex(target)?;

        let id = self.counters.edges;
        self.counters.edges += 1;

        let edge = Edge {
            id,
            label: label.to_string(),
            source,
            target,
            properties,
        };
        let id_raw = encode(&id, "edge id")?;
        self.write(edge_key(id), encode(&edge, "edge")?)?;
        self.write(adj_out_key(source, label, id), id_raw.clone())?;
        self.write(adj_in_key(target, id), id_raw)?;
        trace!("edge {id} created: {source} -[{label}]-> {target}");
        Ok(id)
    }

    pub fn edge(&self, id: EdgeId) -> Result<Edge> {
        match self.read(&edge_key(id))? {
            Some(raw) => decode(&raw, "edge"),
            None => Err(GraphError::EdgeNotFound { id }),
        }
    }

    /// All outgoing edges of `source` carrying exactly `label`.
    pub fn out_edges(&self, source: VertexId, label: &str) -> Result<Vec<Edge>> {
        let mut edges = Vec::new();
        for (_, raw) in self.scan(&adj_out_prefix(source, label))? {
            let id: EdgeId = decode(&raw, "edge id")?;
            let edge = self.edge(id)?;
            // Labels may contain the key separator; verify on the record.
            if edge.label == label {
                edges.push(edge);
            }
        }
        Ok(edges)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.edge(id)?;
        self.erase(edge_key(id))?;
        self.erase(adj_out_key(edge.source, &edge.label, id))?;
        self.erase(adj_in_key(edge.target, id))?;
        trace!("edge {id} removed");
        Ok(())
    }

    // --- properties ---

    pub fn set_property(&mut self, element: ElementId, key: &str, value: PropertyValue) -> Result<()> {
        match element {
            ElementId::Vertex(id) => {
                let mut vertex = self.vertex(id)?;
                vertex.properties.insert(key, value);
                self.write(vertex_key(id), encode(&vertex, "vertex")?)
            }
            ElementId::Edge(id) => {
                let mut edge = self.edge(id)?;
                edge.properties.insert(key, value);
                self.write(edge_key(id), encode(&edge, "edge")?)
            }
        }
    }

    pub fn property(&self, element: ElementId, key: &str) -> Result<Option<PropertyValue>> {
        let properties = match element {
            ElementId::Vertex(id) => self.vertex(id)?.properties,
            ElementId::Edge(id) => self.edge(id)?.properties,
        };
        Ok(properties.get(key).cloned())
    }

    // --- manual indexes ---

    /// Look up a manual index descriptor by name.
    ///
    /// An unreadable descriptor (written by an incompatible revision) is
    /// treated as absent so the caller falls through to create.
    pub fn index_descriptor(&self, name: &str) -> Result<Option<IndexHandle>> {
        match self.read(&index_key(name))? {
            None => Ok(None),
            Some(raw) => match serde_json::from_slice(&raw) {
                Ok(handle) => Ok(Some(handle)),
                Err(e) => {
                    debug!("unreadable descriptor for index {name}, treating as absent: {e}");
                    Ok(None)
                }
            },
        }
    }

    pub fn create_index(&mut self, name: &str, kind: ElementKind) -> Result<IndexHandle> {
        let handle = IndexHandle {
            name: name.to_string(),
            kind,
        };
        self.write(index_key(name), encode(&handle, "index descriptor")?)?;
        Ok(handle)
    }

    /// Drop an index descriptor and all its entries.
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        self.erase(index_key(name))?;
        for (key, _) in self.scan(&index_entries_prefix(name))? {
            self.erase(key)?;
        }
        Ok(())
    }

    pub fn index_put(
        &mut self,
        index: &IndexHandle,
        key: &str,
        value: &PropertyValue,
        element: u64,
    ) -> Result<()> {
        let value_token = encode_index_value(value)?;
        let entry = IndexEntry {
            key: key.to_string(),
            value: value.clone(),
            element,
        };
        self.write(
            index_entry_key(&index.name, key, &value_token, element),
            encode(&entry, "index entry")?,
        )
    }

    /// First element filed under `(key, value)`, if any.
    ///
    /// Selection among multiple matches is first-encountered in key
    /// order; otherwise unspecified.
    pub fn index_first(
        &self,
        index: &IndexHandle,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Option<u64>> {
        let value_token = encode_index_value(value)?;
        for (_, raw) in self.scan(&index_entry_prefix(&index.name, key, &value_token))? {
            let entry: IndexEntry = decode(&raw, "index entry")?;
            // Prefix collisions are possible; verify on the record.
            if entry.key == key && entry.value == *value {
                return Ok(Some(entry.element));
            }
        }
        Ok(None)
    }

    /// File `element` under `(key, value)` unless already present.
    /// Returns whether an insert occurred.
    pub fn index_put_if_absent(
        &mut self,
        index: &IndexHandle,
        key: &str,
        value: &PropertyValue,
        element: u64,
    ) -> Result<bool> {
        let value_token = encode_index_value(value)?;
        for (_, raw) in self.scan(&index_entry_prefix(&index.name, key, &value_token))? {
            let entry: IndexEntry = decode(&raw, "index entry")?;
            if entry.key == key && entry.value == *value && entry.element == element {
                return Ok(false);
            }
        }
        self.index_put(index, key, value, element)?;
        Ok(true)
    }

    // --- key indexes ---

    pub fn create_key_index(&mut self, key: &str, kind: ElementKind) -> Result<()> {
        // Idempotent: rewriting the marker is harmless
        self.write(key_index_key(key, kind), Vec::new())
    }

    pub fn drop_key_index(&mut self, key: &str, kind: ElementKind) -> Result<()> {
        self.erase(key_index_key(key, kind))
    }

    #[cfg(test)]
    pub fn has_key_index(&self, key: &str, kind: ElementKind) -> Result<bool> {
        Ok(self.read(&key_index_key(key, kind))?.is_some())
    }
}

// --- key builders ---

fn vertex_key(id: VertexId) -> Vec<u8> {
    format!("vertex:{id}").into_bytes()
}

fn edge_key(id: EdgeId) -> Vec<u8> {
    format!("edge:{id}").into_bytes()
}

fn adj_out_key(source: VertexId, label: &str, edge: EdgeId) -> Vec<u8> {
    format!("adj:out:{source}:{label}:{edge}").into_bytes()
}

fn adj_out_prefix(source: VertexId, label: &str) -> Vec<u8> {
    format!("adj:out:{source}:{label}:").into_bytes()
}

fn adj_in_key(target: VertexId, edge: EdgeId) -> Vec<u8> {
    format!("adj:in:{target}:{edge}").into_bytes()
}

fn index_key(name: &str) -> Vec<u8> {
    format!("idx:{name}").into_bytes()
}

fn index_entry_key(name: &str, key: &str, value_token: &str, element: u64) -> Vec<u8> {
    format!("idxe:{name}:{key}:{value_token}:{element}").into_bytes()
}

fn index_entry_prefix(name: &str, key: &str, value_token: &str) -> Vec<u8> {
    format!("idxe:{name}:{key}:{value_token}:").into_bytes()
}

fn index_entries_prefix(name: &str) -> Vec<u8> {
    format!("idxe:{name}:").into_bytes()
}

fn key_index_key(key: &str, kind: ElementKind) -> Vec<u8> {
    format!("kidx:{kind}:{key}").into_bytes()
}

/// Canonical token for a property value inside an index entry key.
fn encode_index_value(value: &PropertyValue) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| GraphError::serialization("Failed to encode index value", Some(e)))
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| GraphError::serialization(format!("Failed to serialize {what}"), Some(e)))
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(raw)
        .map_err(|e| GraphError::serialization(format!("Failed to deserialize {what}"), Some(e)))
}
