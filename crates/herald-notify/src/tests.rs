//! Unit tests for the notification builder.

use std::collections::HashMap;

use herald_store::StoreError;
use herald_types::{Event, EventKind, Payload};
use serde_json::{json, Value};

use crate::{build, rule_for, BuildError, Directory, RecipientPolicy};

/// In-memory directory with every kind registered.
struct FakeDirectory {
    users: HashMap<i64, String>,
    types: HashMap<EventKind, i64>,
}

impl FakeDirectory {
    fn new() -> Self {
        let users = HashMap::from([(2, "sarah_designer".to_string()), (3, "mike".to_string())]);
        let types = EventKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| (*kind, i as i64 + 1))
            .collect();
        Self { users, types }
    }
}

impl Directory for FakeDirectory {
    fn display_name(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(&user_id).cloned())
    }

    fn notification_type_id(&self, kind: EventKind) -> Result<Option<i64>, StoreError> {
        Ok(self.types.get(&kind).copied())
    }
}

fn event(event_type: &str, data: Value) -> Event {
    Event {
        id: 11,
        event_type: event_type.to_string(),
        actor_id: 2,
        target_id: 7,
        data: data.as_object().cloned().unwrap_or_default(),
        processed: false,
        created_at: "2025-01-01T00:00:00.000Z".to_string(),
    }
}

#[test]
fn every_kind_builds_deterministic_content_with_fresh_ids() {
    let dir = FakeDirectory::new();
    for kind in EventKind::ALL {
        let e = event(kind.as_str(), json!({ "post_owner_id": 9, "comment": "hi", "context": "ctx" }));
        let a = build(&dir, &e).expect("build should succeed");
        let b = build(&dir, &e).expect("build should succeed");

        assert_eq!(a.title, b.title, "{kind}");
        assert_eq!(a.message, b.message, "{kind}");
        assert_eq!(a.data, b.data, "{kind}");
        assert_eq!(a.recipient_id, b.recipient_id, "{kind}");
        assert_ne!(a.id, b.id, "{kind}: each build gets its own id");
        assert_eq!(a.kind, kind);
        assert_eq!(a.event_id, 11);
    }
}

#[test]
fn payload_always_carries_actor_identity() {
    let dir = FakeDirectory::new();
    for kind in EventKind::ALL {
        let draft = build(&dir, &event(kind.as_str(), json!({}))).unwrap();
        assert_eq!(draft.data["actor_id"], 2, "{kind}");
        assert_eq!(draft.data["actor_display_name"], "sarah_designer", "{kind}");
        assert!(draft.message.contains("sarah_designer"), "{kind}");
    }
}

#[test]
fn like_and_comment_prefer_post_owner() {
    let dir = FakeDirectory::new();
    for kind in ["like", "comment"] {
        let with_owner = build(&dir, &event(kind, json!({ "post_owner_id": 9 }))).unwrap();
        assert_eq!(with_owner.recipient_id, 9, "{kind}");

        let without_owner = build(&dir, &event(kind, json!({}))).unwrap();
        assert_eq!(without_owner.recipient_id, 7, "{kind}");
    }
}

#[test]
fn post_owner_accepts_numeric_strings_and_ignores_zero_or_null() {
    let dir = FakeDirectory::new();
    let cases = [
        (json!({ "post_owner_id": "9" }), 9),
        (json!({ "post_owner_id": 0 }), 7),
        (json!({ "post_owner_id": null }), 7),
        (json!({ "post_owner_id": "" }), 7),
        (json!({ "post_owner_id": true }), 7),
    ];
    for (data, expected) in cases {
        let draft = build(&dir, &event("like", data.clone())).unwrap();
        assert_eq!(draft.recipient_id, expected, "data: {data}");
    }
}

#[test]
fn follow_and_mention_ignore_post_owner() {
    let dir = FakeDirectory::new();
    for kind in ["follow", "mention"] {
        let draft = build(&dir, &event(kind, json!({ "post_owner_id": 9 }))).unwrap();
        assert_eq!(draft.recipient_id, 7, "{kind}");
    }
}

#[test]
fn kind_specific_payload_fields() {
    let dir = FakeDirectory::new();

    let follow = build(&dir, &event("follow", json!({}))).unwrap();
    assert_eq!(follow.title, "New Follower");
    assert!(follow.data.get("post_id").is_none());

    let like = build(&dir, &event("like", json!({}))).unwrap();
    assert_eq!(like.title, "Post Liked");
    assert_eq!(like.data["post_id"], 7);

    let comment = build(&dir, &event("comment", json!({ "comment": "nice!" }))).unwrap();
    assert_eq!(comment.title, "New Comment");
    assert_eq!(comment.data["post_id"], 7);
    assert_eq!(comment.data["comment"], "nice!");

    let mention = build(&dir, &event("mention", json!({ "context": "in #design" }))).unwrap();
    assert_eq!(mention.title, "You were mentioned");
    assert_eq!(mention.data["context"], "in #design");
    assert!(mention.data.get("post_id").is_none());
}

#[test]
fn free_text_defaults_when_missing_or_empty() {
    let dir = FakeDirectory::new();

    let comment = build(&dir, &event("comment", json!({ "comment": "" }))).unwrap();
    assert_eq!(comment.data["comment"], "New comment");

    let mention = build(&dir, &event("mention", json!({}))).unwrap();
    assert_eq!(mention.data["context"], "mentioned you");

    for empty in [json!(null), json!(false), json!(0)] {
        let comment = build(&dir, &event("comment", json!({ "comment": empty }))).unwrap();
        assert_eq!(comment.data["comment"], "New comment", "{empty}");
    }
}

#[test]
fn non_string_free_text_is_kept() {
    let dir = FakeDirectory::new();

    let comment = build(&dir, &event("comment", json!({ "comment": 42 }))).unwrap();
    assert_eq!(comment.data["comment"], 42);

    let mention = build(&dir, &event("mention", json!({ "context": { "thread": 3 } }))).unwrap();
    assert_eq!(mention.data["context"], json!({ "thread": 3 }));
}

#[test]
fn unknown_type_is_rejected_before_lookups() {
    let dir = FakeDirectory::new();
    let mut poke = event("poke", json!({}));
    poke.actor_id = 404;

    let err = build(&dir, &poke).expect_err("poke is not a known kind");
    assert!(matches!(err, BuildError::UnknownEventType(ref t) if t == "poke"));
    assert!(!err.is_lookup_failure());
}

#[test]
fn unknown_actor_is_a_lookup_failure() {
    let dir = FakeDirectory::new();
    let mut e = event("follow", json!({}));
    e.actor_id = 404;

    let err = build(&dir, &e).expect_err("actor 404 does not exist");
    assert!(matches!(err, BuildError::ActorNotFound(404)));
    assert!(err.is_lookup_failure());
}

#[test]
fn missing_type_row_is_a_lookup_failure() {
    let mut dir = FakeDirectory::new();
    dir.types.remove(&EventKind::Mention);

    let err = build(&dir, &event("mention", json!({}))).expect_err("type row missing");
    assert!(matches!(err, BuildError::NotificationTypeNotFound(EventKind::Mention)));
    assert!(err.is_lookup_failure());
}

#[test]
fn rules_cover_every_kind() {
    for kind in EventKind::ALL {
        assert_eq!(rule_for(kind).kind, kind);
    }
    assert_eq!(rule_for(EventKind::Like).recipient, RecipientPolicy::PostOwnerOrTarget);
    assert_eq!(rule_for(EventKind::Mention).recipient, RecipientPolicy::Target);
}

#[test]
fn builds_against_sqlite_directory() {
    let conn = rusqlite::Connection::open_in_memory().expect("should open in-memory db");
    herald_db::run_migrations(&conn).expect("migrations should succeed");
    conn.execute(
        "INSERT INTO users (id, username, email) VALUES (2, 'sarah_designer', 's@example.com')",
        [],
    )
    .unwrap();

    let draft = build(&conn, &event("comment", json!({ "post_owner_id": 9, "comment": "nice!" })))
        .expect("build should succeed");

    let expected_type: i64 = conn
        .query_row("SELECT id FROM notification_types WHERE name = 'comment'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(draft.type_id, expected_type);
    assert_eq!(draft.recipient_id, 9);
    assert_eq!(draft.message, "sarah_designer commented on your post");

    let data: Payload = draft.data;
    assert_eq!(data["comment"], "nice!");
}
