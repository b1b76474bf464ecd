//! Integration tests for session open, capability gating, and the
//! entity materializer.

use graphbridge::{
    ElementId, ElementKind, Engine, GraphError, PropertyValue, Session,
};
use std::collections::BTreeMap;
use tempfile::TempDir;

#[test]
fn test_every_engine_opens_and_echoes_its_id() {
    for engine in Engine::ALL {
        let dir = TempDir::new().unwrap();
        let location = dir.path().to_str().unwrap().to_string();
        let mut session = Session::open(engine.id(), &location, None).unwrap();

        assert_eq!(session.engine_id(), engine.id());
        assert_eq!(session.capabilities(), engine.capabilities());
        session.close().unwrap();
    }
}

#[test]
fn test_engine_identifier_is_case_insensitive() {
    let mut session = Session::open("  In-Memory ", "scratch", None).unwrap();
    assert_eq!(session.engine(), Engine::InMemory);
    session.close().unwrap();
}

#[test]
fn test_unknown_engine_is_fatal() {
    let err = Session::open("graphite", "nowhere", None).unwrap_err();
    match err {
        GraphError::UnknownEngine { name } => assert_eq!(name, "graphite"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unrecognized_config_is_ignored() {
    let mut config = BTreeMap::new();
    config.insert("compression".to_string(), "snappy".to_string());

    // Ignored with a warning, never an error
    let mut session = Session::open("in-memory", "scratch", Some(&config)).unwrap();
    session.create_vertex("user").unwrap();
    session.close().unwrap();
}

#[test]
fn test_get_or_create_vertex_is_idempotent() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let index = session
        .get_or_create_index("by-login", ElementKind::Vertex)
        .unwrap();

    let first = session
        .get_or_create_vertex(&index, "login", "alice", "user")
        .unwrap();
    let second = session
        .get_or_create_vertex(&index, "login", "alice", "user")
        .unwrap();
    assert_eq!(first, second);

    let other = session
        .get_or_create_vertex(&index, "login", "bob", "user")
        .unwrap();
    assert_ne!(first, other);

    // The materialized vertex carries the key property and the type tag
    assert_eq!(
        session.property(ElementId::Vertex(first), "login").unwrap(),
        Some(PropertyValue::String("alice".into()))
    );
    assert_eq!(
        session.property(ElementId::Vertex(first), "type").unwrap(),
        Some(PropertyValue::String("user".into()))
    );
    session.close().unwrap();
}

#[test]
fn test_create_vertex_always_creates() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let a = session.create_vertex("user").unwrap();
    let b = session.create_vertex("user").unwrap();
    assert_ne!(a, b);
    session.close().unwrap();
}

#[test]
fn test_created_timestamp_is_epoch_seconds() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let v = session.create_vertex("user").unwrap();

    match session
        .property(ElementId::Vertex(v), "sys_created_at")
        .unwrap()
    {
        Some(PropertyValue::Int(secs)) => {
            // Sometime after 2020
            assert!(secs > 1_577_836_800);
        }
        other => panic!("unexpected timestamp encoding: {other:?}"),
    }
    session.close().unwrap();
}

#[test]
fn test_edge_dedup_with_search_capability() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let a = session.create_vertex("user").unwrap();
    let b = session.create_vertex("repository").unwrap();

    let first = session.create_edge_if_not_exist(None, a, b, "OWNS").unwrap();
    let again = session.create_edge_if_not_exist(None, a, b, "OWNS").unwrap();
    assert_eq!(first, again);

    // Different label or direction is a different edge
    let forked = session.create_edge_if_not_exist(None, a, b, "FORKED").unwrap();
    assert_ne!(first, forked);
    let reverse = session.create_edge_if_not_exist(None, b, a, "OWNS").unwrap();
    assert_ne!(first, reverse);

    assert_eq!(session.out_edges(a, "OWNS").unwrap().len(), 1);
    session.close().unwrap();
}

#[test]
fn test_no_edge_dedup_without_search_capability() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().to_str().unwrap().to_string();
    let mut session = Session::open("batch-write-only", &location, None).unwrap();
    assert!(!session.capabilities().edge_search);

    let a = session.create_vertex("user").unwrap();
    let b = session.create_vertex("repository").unwrap();

    let first = session.create_edge_if_not_exist(None, a, b, "OWNS").unwrap();
    let second = session.create_edge_if_not_exist(None, a, b, "OWNS").unwrap();
    assert_ne!(first, second);
    session.close().unwrap();
}

#[test]
fn test_caller_supplied_edge_id_is_recorded() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let a = session.create_vertex("user").unwrap();
    let b = session.create_vertex("user").unwrap();

    let e = session
        .create_edge_if_not_exist(Some("a-knows-b"), a, b, "KNOWS")
        .unwrap();
    assert_eq!(
        session.property(ElementId::Edge(e), "eid").unwrap(),
        Some(PropertyValue::String("a-knows-b".into()))
    );
    session.close().unwrap();
}

#[test]
fn test_remove_edge() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let a = session.create_vertex("user").unwrap();
    let b = session.create_vertex("user").unwrap();
    let e = session.create_edge(a, b, "KNOWS").unwrap();

    session.remove_edge(e).unwrap();
    assert!(session.out_edges(a, "KNOWS").unwrap().is_empty());
    session.close().unwrap();
}

#[test]
fn test_string_codec_trims_and_skips_empty() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let v = session.create_vertex("user").unwrap();
    let element = ElementId::Vertex(v);

    session.set_string(element, "name", Some("  Alice  ")).unwrap();
    assert_eq!(
        session.property(element, "name").unwrap(),
        Some(PropertyValue::String("Alice".into()))
    );

    // Whitespace-only and None both leave the property untouched
    session.set_string(element, "bio", Some("   ")).unwrap();
    assert!(session.property(element, "bio").unwrap().is_none());
    session.set_string(element, "bio", None).unwrap();
    assert!(session.property(element, "bio").unwrap().is_none());
    session.close().unwrap();
}

#[test]
fn test_set_property_if_null_never_overwrites() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let v = session.create_vertex("user").unwrap();
    let element = ElementId::Vertex(v);

    assert!(session.set_property_if_null(element, "joined", 1000i64).unwrap());
    assert!(!session.set_property_if_null(element, "joined", 2000i64).unwrap());
    assert_eq!(
        session.property(element, "joined").unwrap(),
        Some(PropertyValue::Int(1000))
    );
    session.close().unwrap();
}

#[test]
fn test_typed_setters_round_trip() {
    let mut session = Session::open("in-memory", "scratch", None).unwrap();
    let v = session.create_vertex("user").unwrap();
    let element = ElementId::Vertex(v);

    session.set_int(element, "followers", 42).unwrap();
    session.set_float(element, "score", 0.5).unwrap();
    session.set_bool(element, "hireable", true).unwrap();

    assert_eq!(
        session.property(element, "followers").unwrap(),
        Some(PropertyValue::Int(42))
    );
    assert_eq!(
        session.property(element, "score").unwrap(),
        Some(PropertyValue::Float(0.5))
    );
    assert_eq!(
        session.property(element, "hireable").unwrap(),
        Some(PropertyValue::Bool(true))
    );
    session.close().unwrap();
}

#[test]
fn test_manual_index_gating() {
    // distributed: no manual indexes, but key indexes work
    let mut session = Session::open("distributed", "cluster:7100", None).unwrap();

    let err = session
        .get_or_create_index("by-login", ElementKind::Vertex)
        .unwrap_err();
    assert!(matches!(err, GraphError::Unsupported { .. }));
    assert!(matches!(
        session.drop_index("by-login").unwrap_err(),
        GraphError::Unsupported { .. }
    ));

    session.create_key_index("login", ElementKind::Vertex).unwrap();
    session.drop_key_index("login", ElementKind::Vertex).unwrap();

    // Vertex creation still works, type tag included, index step skipped
    let v = session.create_vertex("user").unwrap();
    assert_eq!(
        session.property(ElementId::Vertex(v), "type").unwrap(),
        Some(PropertyValue::String("user".into()))
    );
    session.close().unwrap();
}

#[test]
fn test_key_index_gating() {
    // rest: manual indexes but no key indexes
    let mut session = Session::open("rest", "http://localhost:8182", None).unwrap();

    session.get_or_create_index("by-login", ElementKind::Vertex).unwrap();
    assert!(matches!(
        session.create_key_index("login", ElementKind::Vertex).unwrap_err(),
        GraphError::Unsupported { .. }
    ));
    session.close().unwrap();
}

#[test]
fn test_index_handles_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().to_str().unwrap().to_string();

    let alice = {
        let mut session = Session::open("embedded-transactional", &location, None).unwrap();
        let index = session
            .get_or_create_index("by-login", ElementKind::Vertex)
            .unwrap();
        let v = session
            .get_or_create_vertex(&index, "login", "alice", "user")
            .unwrap();
        session.commit().unwrap();
        session.close().unwrap();
        v
    };

    let mut session = Session::open("embedded-transactional", &location, None).unwrap();
    let index = session
        .get_or_create_index("by-login", ElementKind::Vertex)
        .unwrap();
    let found = session
        .get_or_create_vertex(&index, "login", "alice", "user")
        .unwrap();
    assert_eq!(found, alice);
    session.close().unwrap();
}

#[test]
fn test_document_engine_accepts_credentials() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().to_str().unwrap().to_string();
    let mut config = BTreeMap::new();
    config.insert("username".to_string(), "admin".to_string());
    config.insert("password".to_string(), "secret".to_string());

    let mut session = Session::open("document", &location, Some(&config)).unwrap();
    session.create_vertex("document").unwrap();
    session.close().unwrap();
}
