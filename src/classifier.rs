use crate::models::{Commit, CommitPayload, PingEventPayload, PushEvent, PushEventPayload};
use serde::Deserialize as _;

/// Event type assumed for requests without an `X-GitHub-Event` header.
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// What to do about an incoming webhook event.
#[derive(Debug, Eq, PartialEq)]
pub enum EventDecision
{
	/// GitHub checks that the webhook is reachable. Acknowledge without notifying anyone.
	Ping
	{
		/// The greeting GitHub sends along with ping events.
		zen: Option<String>,
		hook_id: Option<u64>,
	},
	/// Commits were pushed and should be announced.
	Push(PushEvent),
	/// The event doesn’t warrant a notification. This is not an error.
	Ignored
	{
		reason: String,
	},
}

/// Determine what kind of event was received and whether it warrants a notification.
///
/// Placeholders for information missing from push event payloads are filled in here, so that later
/// stages never have to deal with missing values.
///
/// # Arguments
/// - `event_type`: The value of the `X-GitHub-Event` header, if present.
/// - `payload`: The payload, decoded from JSON.
///
/// # Errors
/// Returns [crate::Error::DecodePayloadBody] if a push event payload doesn’t have the expected
/// structure, for example, if `commits` isn’t a list.
pub fn classify(event_type: Option<&str>, payload: &serde_json::Value)
	-> Result<EventDecision, crate::Error>
{
	let event_type = event_type.unwrap_or(UNKNOWN_EVENT_TYPE);

	match event_type
	{
		"ping" =>
		{
			// The ping payload is only echoed back, so be lenient about its contents
			let payload = PingEventPayload::deserialize(payload).unwrap_or_default();

			Ok(EventDecision::Ping{zen: payload.zen, hook_id: payload.hook_id})
		},
		"push" =>
		{
			ensure_objects(payload)?;

			let payload = PushEventPayload::deserialize(payload)
				.map_err(crate::Error::DecodePayloadBody)?;

			let commits = payload.commits.unwrap_or_default();

			if commits.is_empty()
			{
				return Ok(EventDecision::Ignored{reason: "no commits".to_owned()});
			}

			let repository = payload.repository.unwrap_or_default();

			Ok(EventDecision::Push(PushEvent
			{
				repository_name: non_empty_or(repository.name, crate::models::UNKNOWN_NAME),
				repository_url: non_empty_or(repository.html_url, crate::models::NO_URL),
				branch: branch_name(payload.ref_.as_deref()).to_owned(),
				pusher: non_empty_or(payload.pusher.and_then(|pusher| pusher.name),
					crate::models::UNKNOWN_NAME),
				head: payload.after,
				commits: commits.into_iter().map(commit).collect(),
			}))
		},
		_ => Ok(EventDecision::Ignored{reason: format!("unhandled event type: {event_type}")}),
	}
}

/// The branch name, which is the last segment of the ref (`refs/heads/main` → `main`).
pub fn branch_name(ref_: Option<&str>) -> &str
{
	ref_.and_then(|ref_| ref_.rsplit('/').next()).unwrap_or_default()
}

/// Require the push event payload and its nested records to be JSON objects. Derived deserializers
/// would also read arrays positionally, which GitHub never sends.
#[doc(hidden)]
fn ensure_objects(payload: &serde_json::Value) -> Result<(), crate::Error>
{
	ensure_object(payload, "a push event object")?;

	for field in ["repository", "pusher"]
	{
		ensure_optional_object(payload.get(field), "an object")?;
	}

	if let Some(commits) = payload.get("commits").and_then(serde_json::Value::as_array)
	{
		for commit in commits
		{
			ensure_object(commit, "a commit object")?;
			ensure_optional_object(commit.get("author"), "an object")?;
		}
	}

	Ok(())
}

#[doc(hidden)]
fn ensure_optional_object(value: Option<&serde_json::Value>, expected: &'static str)
	-> Result<(), crate::Error>
{
	match value
	{
		None | Some(serde_json::Value::Null) => Ok(()),
		Some(value) => ensure_object(value, expected),
	}
}

#[doc(hidden)]
fn ensure_object(value: &serde_json::Value, expected: &'static str) -> Result<(), crate::Error>
{
	use serde::de::{Error as _, Unexpected};

	let unexpected = match value
	{
		serde_json::Value::Object(_) => return Ok(()),
		serde_json::Value::Null => Unexpected::Unit,
		serde_json::Value::Bool(value) => Unexpected::Bool(*value),
		serde_json::Value::Number(_) => Unexpected::Other("number"),
		serde_json::Value::String(value) => Unexpected::Str(value),
		serde_json::Value::Array(_) => Unexpected::Seq,
	};

	Err(crate::Error::DecodePayloadBody(serde_json::Error::invalid_type(unexpected, &expected)))
}

#[doc(hidden)]
fn commit(payload: CommitPayload) -> Commit
{
	use crate::models::{NO_MESSAGE, NO_URL, UNKNOWN_ID, UNKNOWN_NAME, UNKNOWN_TIMESTAMP};

	Commit
	{
		id: non_empty_or(payload.id, UNKNOWN_ID),
		author: non_empty_or(payload.author.and_then(|author| author.name), UNKNOWN_NAME),
		message: non_empty_or(payload.message, NO_MESSAGE),
		timestamp: non_empty_or(payload.timestamp, UNKNOWN_TIMESTAMP),
		url: non_empty_or(payload.url, NO_URL),
	}
}

#[doc(hidden)]
fn non_empty_or(value: Option<String>, placeholder: &str) -> String
{
	value
		.filter(|value| !value.trim().is_empty())
		.unwrap_or_else(|| placeholder.to_owned())
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn push_payload(commits: serde_json::Value) -> serde_json::Value
	{
		serde_json::json!({
			"ref": "refs/heads/main",
			"after": "c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3",
			"repository": {"name": "hello-world", "html_url": "https://github.com/octocat/hello-world"},
			"pusher": {"name": "octocat", "email": "octocat@github.com"},
			"commits": commits,
		})
	}

	fn commit_payload(id: &str, message: &str) -> serde_json::Value
	{
		serde_json::json!({
			"id": id,
			"message": message,
			"timestamp": "2024-03-01T12:00:00+01:00",
			"url": format!("https://github.com/octocat/hello-world/commit/{id}"),
			"author": {"name": "Mona Lisa", "email": "mona@github.com"},
		})
	}

	#[test]
	fn push_preserves_commit_order()
	{
		let payload = push_payload(serde_json::json!([
			commit_payload("c1", "first"),
			commit_payload("c2", "second"),
			commit_payload("c3", "third"),
		]));

		let push_event = match classify(Some("push"), &payload).unwrap()
		{
			EventDecision::Push(push_event) => push_event,
			decision => panic!("unexpected decision {decision:?}"),
		};

		let ids: Vec<_> = push_event.commits.iter().map(|commit| commit.id.as_str()).collect();

		assert_eq!(ids, ["c1", "c2", "c3"]);
		assert_eq!(push_event.repository_name, "hello-world");
		assert_eq!(push_event.repository_url, "https://github.com/octocat/hello-world");
		assert_eq!(push_event.branch, "main");
		assert_eq!(push_event.pusher, "octocat");
		assert_eq!(push_event.head.as_deref(), Some("c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3"));
		assert_eq!(push_event.commits[1].message, "second");
		assert_eq!(push_event.commits[1].author, "Mona Lisa");
	}

	#[test]
	fn push_without_commits_is_ignored()
	{
		let decision = classify(Some("push"), &serde_json::json!({"commits": []})).unwrap();
		assert_eq!(decision, EventDecision::Ignored{reason: "no commits".to_owned()});

		let decision = classify(Some("push"), &serde_json::json!({"ref": "refs/tags/v1"})).unwrap();
		assert_eq!(decision, EventDecision::Ignored{reason: "no commits".to_owned()});
	}

	#[test]
	fn ping_is_recognized_regardless_of_commits()
	{
		let payload = serde_json::json!({
			"zen": "Keep it logically awesome.",
			"hook_id": 42,
			"commits": [{"id": "c1"}],
		});

		assert_eq!(classify(Some("ping"), &payload).unwrap(), EventDecision::Ping
		{
			zen: Some("Keep it logically awesome.".to_owned()),
			hook_id: Some(42),
		});

		assert_eq!(classify(Some("ping"), &serde_json::json!({"commits": []})).unwrap(),
			EventDecision::Ping{zen: None, hook_id: None});
	}

	#[test]
	fn other_event_types_are_ignored_with_reason()
	{
		let payload = push_payload(serde_json::json!([commit_payload("c1", "first")]));

		assert_eq!(classify(Some("issues"), &payload).unwrap(),
			EventDecision::Ignored{reason: "unhandled event type: issues".to_owned()});
		assert_eq!(classify(None, &payload).unwrap(),
			EventDecision::Ignored{reason: "unhandled event type: unknown".to_owned()});
	}

	#[test]
	fn missing_fields_are_replaced_with_placeholders()
	{
		let payload = serde_json::json!({"commits": [{}, {"author": {}}, {"author": null, "message": ""}]});

		let push_event = match classify(Some("push"), &payload).unwrap()
		{
			EventDecision::Push(push_event) => push_event,
			decision => panic!("unexpected decision {decision:?}"),
		};

		assert_eq!(push_event.branch, "");
		assert_eq!(push_event.pusher, "Unknown");
		assert_eq!(push_event.repository_url, "#");
		assert!(push_event.head.is_none());
		assert_eq!(push_event.commits.len(), 3);

		for commit in &push_event.commits
		{
			assert_eq!(commit.id, "unknown");
			assert_eq!(commit.author, "Unknown");
			assert_eq!(commit.message, "No message");
			assert_eq!(commit.timestamp, "Unknown");
			assert_eq!(commit.url, "#");
		}
	}

	#[test]
	fn malformed_push_payloads_are_errors()
	{
		for payload in [
			serde_json::json!({"commits": "not a list"}),
			serde_json::json!({"commits": [{"message": 5}]}),
			serde_json::json!({"ref": ["refs", "heads", "main"], "commits": [{}]}),
			serde_json::json!([1, 2, 3]),
			serde_json::json!("push"),
			serde_json::json!(null),
			serde_json::json!([]),
			serde_json::json!(["refs/heads/main", null, null, null, [{"id": "c1", "message": "hi"}]]),
			serde_json::json!({"commits": [["c1", "hi"]]}),
			serde_json::json!({"commits": [null]}),
			serde_json::json!({"commits": [{"author": ["Mona Lisa"]}]}),
			serde_json::json!({"repository": ["hello-world"], "commits": [{}]}),
			serde_json::json!({"pusher": "octocat", "commits": [{}]}),
		]
		{
			assert!(matches!(classify(Some("push"), &payload), Err(crate::Error::DecodePayloadBody(_))),
				"payload {payload}");
		}
	}

	#[test]
	fn branch_name_is_last_ref_segment()
	{
		assert_eq!(branch_name(Some("refs/heads/main")), "main");
		assert_eq!(branch_name(Some("refs/heads/feature/login")), "login");
		assert_eq!(branch_name(Some("main")), "main");
		assert_eq!(branch_name(None), "");
	}
}
