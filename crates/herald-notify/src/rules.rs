//! Per-kind generation rules.

use herald_types::{Event, EventKind, Payload};
use serde_json::Value;

/// How a kind picks its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientPolicy {
    /// Always `event.target_id`.
    Target,
    /// `event.data.post_owner_id` when present, else `event.target_id`.
    ///
    /// Clients do not always send the owner separately from the target.
    PostOwnerOrTarget,
}

/// Static description of how one event kind becomes a notification.
#[derive(Debug)]
pub struct Rule {
    pub kind: EventKind,
    pub title: &'static str,
    pub recipient: RecipientPolicy,
    /// Renders the message from the actor's display name.
    pub message: fn(&str) -> String,
    /// Adds kind-specific keys to the payload.
    pub extend_payload: fn(&Event, &mut Payload),
}

static FOLLOW: Rule = Rule {
    kind: EventKind::Follow,
    title: "New Follower",
    recipient: RecipientPolicy::Target,
    message: follow_message,
    extend_payload: no_extra_payload,
};

static LIKE: Rule = Rule {
    kind: EventKind::Like,
    title: "Post Liked",
    recipient: RecipientPolicy::PostOwnerOrTarget,
    message: like_message,
    extend_payload: post_payload,
};

static COMMENT: Rule = Rule {
    kind: EventKind::Comment,
    title: "New Comment",
    recipient: RecipientPolicy::PostOwnerOrTarget,
    message: comment_message,
    extend_payload: comment_payload,
};

static MENTION: Rule = Rule {
    kind: EventKind::Mention,
    title: "You were mentioned",
    recipient: RecipientPolicy::Target,
    message: mention_message,
    extend_payload: mention_payload,
};

/// Returns the generation rule for `kind`.
pub fn rule_for(kind: EventKind) -> &'static Rule {
    match kind {
        EventKind::Follow => &FOLLOW,
        EventKind::Like => &LIKE,
        EventKind::Comment => &COMMENT,
        EventKind::Mention => &MENTION,
    }
}

impl Rule {
    /// Resolves the recipient of `event` under this rule's policy.
    pub fn recipient_of(&self, event: &Event) -> i64 {
        match self.recipient {
            RecipientPolicy::Target => event.target_id,
            RecipientPolicy::PostOwnerOrTarget => {
                post_owner_id(&event.data).unwrap_or(event.target_id)
            }
        }
    }
}

/// Reads `post_owner_id` as a non-zero integer, accepting numeric strings.
fn post_owner_id(data: &Payload) -> Option<i64> {
    let owner = match data.get("post_owner_id")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (owner != 0).then_some(owner)
}

/// Copies a field from the event data as-is, or uses `default` when it is
/// missing, `null`, `false`, `0` or an empty string.
fn text_or(data: &Payload, key: &str, default: &str) -> Value {
    match data.get(key) {
        Some(value) if is_truthy(value) => value.clone(),
        _ => Value::String(default.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn follow_message(actor: &str) -> String {
    format!("{actor} started following you")
}

fn like_message(actor: &str) -> String {
    format!("{actor} liked your post")
}

fn comment_message(actor: &str) -> String {
    format!("{actor} commented on your post")
}

fn mention_message(actor: &str) -> String {
    format!("{actor} mentioned you in a post")
}

fn no_extra_payload(_event: &Event, _payload: &mut Payload) {}

fn post_payload(event: &Event, payload: &mut Payload) {
    payload.insert("post_id".to_string(), Value::from(event.target_id));
}

fn comment_payload(event: &Event, payload: &mut Payload) {
    post_payload(event, payload);
    payload.insert(
        "comment".to_string(),
        text_or(&event.data, "comment", "New comment"),
    );
}

fn mention_payload(event: &Event, payload: &mut Payload) {
    payload.insert(
        "context".to_string(),
        text_or(&event.data, "context", "mentioned you"),
    );
}
