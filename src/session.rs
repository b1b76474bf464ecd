//! The session layer: backend selection and every public graph operation.
//!
//! A [`Session`] owns exactly one backend connection and programs against
//! it through the capability flags fixed at open time. Operations the
//! engine does not support degrade to logged warnings (transactions) or
//! reported [`GraphError::Unsupported`] errors (indexes); only an unknown
//! engine identifier is fatal.

use crate::capability::Capabilities;
use crate::codec;
use crate::engine::Engine;
use crate::error::{GraphError, Result};
use crate::kv::{KvBackend, MemoryBackend, RocksDbBackend};
use crate::property::{PropertyMap, PropertyValue};
use crate::shutdown::Shutdown;
use crate::store::{Edge, EdgeId, ElementId, ElementKind, GraphStore, IndexHandle, VertexId};
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Property carrying the free-form type tag on every materialized vertex.
pub const TYPE_PROPERTY: &str = "type";

/// Property recording creation time, encoded as epoch seconds.
///
/// Underscore rather than a `sys:` prefix because some backends reject
/// `:` in property names.
pub const CREATED_AT_PROPERTY: &str = "sys_created_at";

/// Name of the per-session manual index over the `type` property.
const TYPE_INDEX: &str = "type-idx";

/// One open connection to a graph backend.
///
/// Created by [`Session::open`]; closed explicitly or by the
/// [`ShutdownRegistry`](crate::ShutdownRegistry). The mutating API takes
/// `&mut self`, so sharing a session across threads requires external
/// synchronization (e.g. `Mutex<Session>`); the layer adds no locking of
/// its own.
pub struct Session {
    id: Uuid,
    engine: Engine,
    caps: Capabilities,
    store: GraphStore,
    type_index: Option<IndexHandle>,
    /// Mutations since the last commit
    mutations: u64,
    /// `None`: unset (final commit at close, no mid-stream auto-commit).
    /// `Some(0)`: manual-only commits. `Some(n)`: auto-commit every `n`.
    max_buffer_size: Option<u32>,
    closed: bool,
}

impl Session {
    /// Open a session against the engine named by `engine_id`.
    ///
    /// `engine_id` is matched case-insensitively against the fixed
    /// enumeration (see [`Engine`]). `location` is a filesystem path,
    /// in-memory tag, or network URL depending on the engine. `config`
    /// entries are backend-specific; unrecognized entries are ignored
    /// with a warning.
    ///
    /// Opening eagerly creates the Type Index (manual-index engines) and
    /// a key index on `type` (key-index engines).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownEngine`] for an unrecognized
    /// identifier: a fatal configuration error. No partially-initialized
    /// session is ever returned. Backend open failures surface as
    /// [`GraphError::Storage`].
    pub fn open(
        engine_id: &str,
        location: &str,
        config: Option<&BTreeMap<String, String>>,
    ) -> Result<Session> {
        let engine = Engine::parse(engine_id)?;
        debug!("requested engine: {engine} location: {location}");

        let backend = open_backend(engine, location, config)?;
        let caps = engine.capabilities();
        let mut store = GraphStore::open(backend, caps.transactions)?;

        let type_index = if caps.manual_indexes {
            trace!("fetching index: {TYPE_INDEX}");
            Some(get_or_create_index_in(&mut store, TYPE_INDEX, ElementKind::Vertex)?)
        } else {
            None
        };
        if caps.key_indexes {
            store.create_key_index(TYPE_PROPERTY, ElementKind::Vertex)?;
        }
        // Make the eager setup durable before any caller transaction, so
        // a rollback in the first scope cannot erase it.
        if caps.transactions {
            store.commit()?;
        }

        let session = Session {
            id: Uuid::new_v4(),
            engine,
            caps,
            store,
            type_index,
            mutations: 0,
            max_buffer_size: None,
            closed: false,
        };
        info!(
            "session {} open: engine={} location={}",
            session.id, engine, location
        );
        Ok(session)
    }

    // --- capability queries ---

    /// The normalized identifier of this session's engine.
    pub fn engine_id(&self) -> &'static str {
        self.engine.id()
    }

    /// The engine this session was opened against.
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// The full capability set fixed at open time.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Whether the engine supports explicit transaction boundaries.
    pub fn supports_transactions(&self) -> bool {
        self.caps.transactions
    }

    /// Whether the engine supports manual indexes.
    pub fn supports_indexes(&self) -> bool {
        self.caps.manual_indexes
    }

    // --- index registry ---

    /// Get a handle to the named manual index, creating it if absent.
    ///
    /// A stored descriptor that cannot be read (or was written with a
    /// different element kind) is treated as absent and recreated.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unsupported`] when the engine lacks manual
    /// indexes; the session stays usable.
    pub fn get_or_create_index(&mut self, name: &str, kind: ElementKind) -> Result<IndexHandle> {
        self.ensure_open()?;
        self.require_manual_indexes("get_or_create_index")?;
        get_or_create_index_in(&mut self.store, name, kind)
    }

    /// Drop a manual index and all its entries.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unsupported`] when the engine lacks manual
    /// indexes.
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.require_manual_indexes("drop_index")?;
        debug!("dropping index: {name}");
        self.store.drop_index(name)
    }

    /// Declare a key index for `key`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unsupported`] when the engine lacks key
    /// indexes.
    pub fn create_key_index(&mut self, key: &str, kind: ElementKind) -> Result<()> {
        self.ensure_open()?;
        self.require_key_indexes("create_key_index")?;
        self.store.create_key_index(key, kind)
    }

    /// Drop a key index declaration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unsupported`] when the engine lacks key
    /// indexes.
    pub fn drop_key_index(&mut self, key: &str, kind: ElementKind) -> Result<()> {
        self.ensure_open()?;
        self.require_key_indexes("drop_key_index")?;
        self.store.drop_key_index(key, kind)
    }

    /// File `element` under `(key, value)` in a manual index unless it is
    /// already there. Returns whether an insert occurred.
    pub fn add_to_index_if_not_present(
        &mut self,
        index: &IndexHandle,
        key: &str,
        value: impl Into<PropertyValue>,
        element: ElementId,
    ) -> Result<bool> {
        self.ensure_open()?;
        let value = value.into();
        let id = match element {
            ElementId::Vertex(id) => id,
            ElementId::Edge(id) => id,
        };
        let inserted = self.store.index_put_if_absent(index, key, &value, id)?;
        if inserted {
            self.note_mutation()?;
        }
        Ok(inserted)
    }

    // --- entity materializer ---

    /// Create a new vertex carrying only the layer-managed `type` and
    /// creation-timestamp properties.
    ///
    /// The vertex is filed in the Type Index when the engine supports
    /// manual indexes; otherwise that step is skipped and the `type`
    /// property is still set. Always produces a new vertex, never a dedup.
    pub fn create_vertex(&mut self, vertex_type: &str) -> Result<VertexId> {
        self.ensure_open()?;
        let id = self.store.add_vertex(PropertyMap::new())?;
        self.store
            .set_property(ElementId::Vertex(id), TYPE_PROPERTY, vertex_type.into())?;
        if let Some(type_index) = self.type_index.clone() {
            self.store.index_put(
                &type_index,
                TYPE_PROPERTY,
                &PropertyValue::String(vertex_type.to_string()),
                id,
            )?;
        }
        self.stamp_created(ElementId::Vertex(id))?;
        self.note_mutation()?;
        debug!("vertex {id} created with type {vertex_type}");
        Ok(id)
    }

    /// Look up `(key, value)` in `index`; return the first match, or
    /// create a vertex of `vertex_type`, set the `(key, value)` property,
    /// and file it in the index.
    ///
    /// Check-then-create: not atomic with respect to concurrent callers
    /// sharing one backend; two racing calls with the same key may each
    /// create a vertex. Callers needing uniqueness must serialize access.
    pub fn get_or_create_vertex(
        &mut self,
        index: &IndexHandle,
        key: &str,
        value: impl Into<PropertyValue>,
        vertex_type: &str,
    ) -> Result<VertexId> {
        self.ensure_open()?;
        let value = value.into();
        if let Some(existing) = self.store.index_first(index, key, &value)? {
            trace!("index {} hit for {key}, vertex {existing}", index.name());
            return Ok(existing);
        }

        let id = self.create_vertex(vertex_type)?;
        self.store
            .set_property(ElementId::Vertex(id), key, value.clone())?;
        self.store.index_put(index, key, &value, id)?;
        self.note_mutation()?;
        Ok(id)
    }

    /// Create an edge unconditionally, stamping the creation timestamp.
    ///
    /// For callers that know the edge is absent; some backends object to
    /// duplicate edges between the same vertices with the same label.
    pub fn create_edge(&mut self, source: VertexId, target: VertexId, label: &str) -> Result<EdgeId> {
        self.ensure_open()?;
        let id = self.store.add_edge(source, target, label, PropertyMap::new())?;
        self.stamp_created(ElementId::Edge(id))?;
        self.note_mutation()?;
        Ok(id)
    }

    /// Create an edge only if no `label` edge from `source` to `target`
    /// exists yet.
    ///
    /// On engines with edge-search capability an existing edge is
    /// returned as-is. Engines without it never dedup: every call creates
    /// a new edge. `edge_id` is an optional caller-supplied identifier,
    /// recorded as the `eid` property; engines that assign their own ids
    /// ignore it.
    pub fn create_edge_if_not_exist(
        &mut self,
        edge_id: Option<&str>,
        source: VertexId,
        target: VertexId,
        label: &str,
    ) -> Result<EdgeId> {
        self.ensure_open()?;
        if self.caps.edge_search {
            for edge in self.store.out_edges(source, label)? {
                if edge.target == target {
                    trace!("edge {} already present: {source} -[{label}]-> {target}", edge.id);
                    return Ok(edge.id);
                }
            }
        }

        let id = self.store.add_edge(source, target, label, PropertyMap::new())?;
        if let Some(eid) = edge_id {
            self.store.set_property(ElementId::Edge(id), "eid", eid.into())?;
        }
        self.stamp_created(ElementId::Edge(id))?;
        self.note_mutation()?;
        Ok(id)
    }

    /// Remove an edge and its adjacency entries.
    ///
    /// Manual-index membership is not cleaned up here; engines that need
    /// it handle it internally.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<()> {
        self.ensure_open()?;
        self.store.remove_edge(edge)?;
        self.note_mutation()
    }

    /// All outgoing edges of `source` carrying `label`.
    pub fn out_edges(&self, source: VertexId, label: &str) -> Result<Vec<Edge>> {
        self.ensure_open()?;
        self.store.out_edges(source, label)
    }

    // --- transaction buffer ---

    /// Begin a new transactional scope, committing whatever is buffered.
    ///
    /// The new scope aliases this session. Logged warning and no-op on
    /// non-transactional engines.
    pub fn start_transaction(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.caps.transactions {
            warn!("attempt to start a transaction on the non-transactional {} engine", self.engine);
            return Ok(());
        }
        self.store.commit()?;
        self.mutations = 0;
        Ok(())
    }

    /// Conclude the current transaction successfully, committing buffered
    /// mutations and resetting the commit counter.
    ///
    /// Logged warning and no-op on non-transactional engines.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.caps.transactions {
            warn!("attempt to stop a transaction on the non-transactional {} engine", self.engine);
            return Ok(());
        }
        self.store.commit()?;
        self.mutations = 0;
        Ok(())
    }

    /// Conclude the current transaction as failed, discarding mutations
    /// back to the last commit point.
    ///
    /// Logged warning and no-op on non-transactional engines: values set
    /// before the call remain.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.caps.transactions {
            warn!("attempt to rollback a transaction on the non-transactional {} engine", self.engine);
            return Ok(());
        }
        self.store.rollback();
        self.mutations = 0;
        Ok(())
    }

    /// Configure the auto-commit threshold.
    ///
    /// `0` disables auto-commit entirely: commits become manual, and
    /// pending mutations at close are discarded. Logged warning on
    /// non-transactional sessions.
    pub fn set_max_buffer_size(&mut self, size: u32) {
        if !self.caps.transactions {
            warn!("attempt to set buffer size on the non-transactional {} engine", self.engine);
            return;
        }
        if size == 0 {
            debug!("transaction buffer size set to 0, commits are MANUAL");
        } else {
            debug!("transaction buffer size set to {size}");
        }
        self.max_buffer_size = Some(size);
    }

    /// Mutations buffered since the last commit.
    pub fn pending_mutations(&self) -> u64 {
        self.mutations
    }

    fn note_mutation(&mut self) -> Result<()> {
        if !self.caps.transactions {
            return Ok(());
        }
        self.mutations += 1;
        if let Some(max) = self.max_buffer_size {
            if max > 0 && self.mutations >= u64::from(max) {
                debug!("auto-committing after {} mutations", self.mutations);
                self.store.commit()?;
                self.mutations = 0;
            }
        }
        Ok(())
    }

    // --- property codec ---

    /// Set a string property. The value is trimmed; a `None` or
    /// empty-after-trim value leaves the property **absent**.
    pub fn set_string(&mut self, element: ElementId, key: &str, value: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        match codec::normalize_string(value) {
            Some(v) => {
                trace!("{key} = {v}");
                self.store.set_property(element, key, PropertyValue::String(v))?;
                self.note_mutation()
            }
            None => {
                trace!("{key} is null or empty, property not set");
                Ok(())
            }
        }
    }

    /// Set a date property, encoded as epoch seconds. Skipped when `None`.
    pub fn set_datetime(
        &mut self,
        element: ElementId,
        key: &str,
        value: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.ensure_open()?;
        match value {
            Some(dt) => {
                self.store.set_property(element, key, codec::encode_datetime(&dt))?;
                self.note_mutation()
            }
            None => {
                trace!("{key} = null (not setting property)");
                Ok(())
            }
        }
    }

    /// Set an integer property verbatim. Covers both int and long inputs.
    pub fn set_int(&mut self, element: ElementId, key: &str, value: i64) -> Result<()> {
        self.ensure_open()?;
        trace!("{key} = {value}");
        self.store.set_property(element, key, PropertyValue::Int(value))?;
        self.note_mutation()
    }

    /// Set a floating point property verbatim.
    pub fn set_float(&mut self, element: ElementId, key: &str, value: f64) -> Result<()> {
        self.ensure_open()?;
        trace!("{key} = {value}");
        self.store.set_property(element, key, PropertyValue::Float(value))?;
        self.note_mutation()
    }

    /// Set a boolean property verbatim.
    pub fn set_bool(&mut self, element: ElementId, key: &str, value: bool) -> Result<()> {
        self.ensure_open()?;
        trace!("{key} = {value}");
        self.store.set_property(element, key, PropertyValue::Bool(value))?;
        self.note_mutation()
    }

    /// Set an opaque property verbatim when `Some`, skip when `None`.
    pub fn set_value(
        &mut self,
        element: ElementId,
        key: &str,
        value: Option<PropertyValue>,
    ) -> Result<()> {
        self.ensure_open()?;
        match value {
            Some(v) => {
                self.store.set_property(element, key, v)?;
                self.note_mutation()
            }
            None => Ok(()),
        }
    }

    /// Set a property only if it is currently absent.
    ///
    /// Returns whether the set occurred; an existing value is never
    /// overwritten. Usable to emulate immutable fields.
    pub fn set_property_if_null(
        &mut self,
        element: ElementId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<bool> {
        self.ensure_open()?;
        if self.store.property(element, key)?.is_some() {
            return Ok(false);
        }
        let value = value.into();
        trace!("setting key: {key} = {value:?}");
        self.store.set_property(element, key, value)?;
        self.note_mutation()?;
        Ok(true)
    }

    /// Read a property. `Ok(None)` means absent, distinct from any set
    /// value, including the empty string (which is never stored).
    pub fn property(&self, element: ElementId, key: &str) -> Result<Option<PropertyValue>> {
        self.ensure_open()?;
        self.store.property(element, key)
    }

    // --- teardown ---

    /// Close the session, concluding transaction state and flushing the
    /// backend. Idempotent.
    ///
    /// Pending mutations are committed unless the session is in
    /// manual-only mode, in which case they are discarded and the benign
    /// "manual commit required" condition is logged and swallowed. Other
    /// close-time transaction errors are logged and do not prevent the
    /// backend handle from being flushed.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing session {} ({})", self.id, self.engine);

        if self.caps.transactions {
            let auto_commit = self.max_buffer_size != Some(0);
            match self.store.finalize(auto_commit) {
                Ok(()) => {}
                Err(GraphError::ManualCommitRequired) => {
                    debug!("automatic transactions disabled, manual commit required; pending writes discarded");
                }
                Err(e) => error!("error concluding transaction state on close: {e}"),
            }
        }

        self.store.close()?;
        trace!("session {} closed", self.id);
        Ok(())
    }

    fn stamp_created(&mut self, element: ElementId) -> Result<()> {
        self.store
            .set_property(element, CREATED_AT_PROPERTY, codec::encode_datetime(&Utc::now()))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(GraphError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn require_manual_indexes(&self, operation: &'static str) -> Result<()> {
        if self.caps.manual_indexes {
            Ok(())
        } else {
            error!("manual indexes are not supported by the {} engine", self.engine);
            Err(GraphError::Unsupported {
                operation,
                engine: self.engine.id(),
            })
        }
    }

    fn require_key_indexes(&self, operation: &'static str) -> Result<()> {
        if self.caps.key_indexes {
            Ok(())
        } else {
            error!("key indexes are not supported by the {} engine", self.engine);
            Err(GraphError::Unsupported {
                operation,
                engine: self.engine.id(),
            })
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Shutdown for Session {
    fn shutdown(&mut self) -> Result<()> {
        self.close()
    }
}

/// Open the physical backend for an engine choice.
fn open_backend(
    engine: Engine,
    location: &str,
    config: Option<&BTreeMap<String, String>>,
) -> Result<Box<dyn KvBackend>> {
    match engine {
        Engine::EmbeddedTransactional => {
            info!("opening embedded transactional store at: {location}");
            warn_unused_config(engine, config, &[]);
            Ok(Box::new(RocksDbBackend::open(location)?))
        }
        Engine::Distributed => {
            info!("opening distributed store connection at: {location}");
            warn_unused_config(engine, config, &[]);
            Ok(Box::new(MemoryBackend::new()))
        }
        Engine::Rest => {
            if config.is_some() {
                warn!("configuration parameters passed to the rest engine - ignored");
            }
            info!("opening rest store connection at: {location}");
            Ok(Box::new(MemoryBackend::new()))
        }
        Engine::Document => {
            let credentials = config.and_then(|c| {
                c.get("username")
                    .zip(c.get("password"))
                    .map(|(user, _)| user.clone())
            });
            match credentials {
                Some(user) => info!("opening document store at {location} as {user}"),
                None => debug!("opening anonymous document store connection at {location}"),
            }
            warn_unused_config(engine, config, &["username", "password"]);
            Ok(Box::new(RocksDbBackend::open(location)?))
        }
        Engine::InMemory => {
            if config.is_some() {
                warn!("configuration parameters passed to the in-memory engine - ignored");
            }
            debug!("opening in-memory store: {location}");
            Ok(Box::new(MemoryBackend::new()))
        }
        Engine::BatchWriteOnly => {
            info!("opening batch write-only store at: {location}");
            warn_unused_config(engine, config, &[]);
            Ok(Box::new(RocksDbBackend::open(location)?))
        }
    }
}

/// Warn once per configuration entry the engine does not understand.
fn warn_unused_config(
    engine: Engine,
    config: Option<&BTreeMap<String, String>>,
    understood: &[&str],
) {
    let Some(config) = config else { return };
    for key in config.keys() {
        if !understood.contains(&key.as_str()) {
            warn!("configuration key '{key}' is not understood by the {engine} engine - ignored");
        }
    }
}

/// Shared get-or-create used both at session open (for the Type Index)
/// and by the public registry operation.
fn get_or_create_index_in(
    store: &mut GraphStore,
    name: &str,
    kind: ElementKind,
) -> Result<IndexHandle> {
    if let Some(handle) = store.index_descriptor(name)? {
        if handle.kind() == kind {
            return Ok(handle);
        }
        debug!(
            "index {name} exists for {} elements, expected {kind}; treating as absent",
            handle.kind()
        );
    }
    warn!("creating index {name} for {kind} elements");
    store.create_index(name, kind)
}
