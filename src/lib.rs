//! # graphbridge
//!
//! A uniform, capability-negotiating access layer over multiple graph
//! storage backends.
//!
//! Callers program against one [`Session`] API regardless of which engine
//! backs it. Each engine carries a fixed [`Capabilities`] profile, and
//! operations the engine cannot perform degrade predictably: transaction
//! calls become logged no-ops, index calls report
//! [`GraphError::Unsupported`], and only an unknown engine identifier is
//! fatal.
//!
//! ## Features
//!
//! - **Six engines, one API**: embedded-transactional, distributed, rest,
//!   document, in-memory, and batch-write-only backends behind a single
//!   session type
//! - **Idempotent materialization**: [`Session::get_or_create_vertex`] and
//!   [`Session::create_edge_if_not_exist`] for repeatable data loads
//! - **Buffered transactions**: explicit commit/rollback plus a
//!   configurable auto-commit threshold for bulk ingestion
//! - **Lossless property codec**: trimmed strings (empty means absent),
//!   epoch-second dates, set-if-null semantics
//! - **Coordinated teardown**: a process-wide [`ShutdownRegistry`] closing
//!   every open session at exit
//!
//! ## Example
//!
//! ```
//! use graphbridge::{ElementId, Session};
//!
//! # fn main() -> graphbridge::Result<()> {
//! let mut session = Session::open("in-memory", "scratch", None)?;
//!
//! let alice = session.create_vertex("user")?;
//! let repo = session.create_vertex("repository")?;
//! session.set_string(ElementId::Vertex(alice), "login", Some("alice"))?;
//! session.create_edge_if_not_exist(None, alice, repo, "OWNS")?;
//!
//! session.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capability;
pub mod codec;
pub mod engine;
pub mod error;
pub mod kv;
pub mod property;
pub mod session;
pub mod shutdown;

mod store;

pub use capability::Capabilities;
pub use engine::Engine;
pub use error::{GraphError, Result};
pub use property::{PropertyMap, PropertyValue};
pub use session::Session;
pub use shutdown::{Shutdown, ShutdownRegistry};
pub use store::{Edge, EdgeId, ElementId, ElementKind, IndexHandle, Vertex, VertexId};
