/// Placeholder for a pusher or commit author whose name is missing from the payload.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Placeholder for a missing commit message.
pub const NO_MESSAGE: &str = "No message";
/// Placeholder for a missing commit timestamp.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";
/// Placeholder for a missing commit or repository URL.
pub const NO_URL: &str = "#";
/// Placeholder for a missing commit ID.
pub const UNKNOWN_ID: &str = "unknown";

/// An incoming webhook request, as extracted from the HTTP request. Never modified after receipt.
#[derive(Debug)]
pub struct WebhookRequest
{
	/// The raw, unparsed request body, which the payload signature is computed from.
	pub body: warp::hyper::body::Bytes,
	/// Value of the `X-Hub-Signature-256` header.
	pub signature: Option<String>,
	/// Value of the `X-GitHub-Event` header.
	pub event: Option<String>,
	/// Value of the `X-GitHub-Delivery` header, a GUID identifying this delivery.
	pub delivery: Option<String>,
	/// Address of the client that sent the request, if known.
	pub remote_address: Option<std::net::SocketAddr>,
}

/// Partial user data model as sent in webhook event payloads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct User
{
	/// The user’s display name (for commit authors) or handle (for pushers).
	pub name: Option<String>,
	// We don’t need the other fields, so ignore them
}

/// Partial repository data model as sent in webhook event payloads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Repository
{
	/// The name of the repository.
	pub name: Option<String>,
	/// The user-facing URL of the repository.
	pub html_url: Option<String>,
	// We don’t need the other fields, so ignore them
}

/// Partial commit data model as sent in push event payloads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CommitPayload
{
	/// The SHA of the commit.
	pub id: Option<String>,
	/// The commit message.
	pub message: Option<String>,
	/// The commit’s timestamp in ISO 8601 format.
	pub timestamp: Option<String>,
	/// User-facing URL of the commit.
	pub url: Option<String>,
	/// The Git author of the commit.
	pub author: Option<User>,
	// We don’t need the other fields, so ignore them
}

/// Webhook event payload for push events as provided by the GitHub server.
///
/// Every field is optional so that payloads lacking some information can still be relayed. Only
/// fields of the wrong type make a payload malformed.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PushEventPayload
{
	/// The full Git ref that was pushed (example: `refs/heads/main`).
	#[serde(rename = "ref")]
	pub ref_: Option<String>,
	/// The SHA of the most recent commit on the ref after the push.
	pub after: Option<String>,
	/// The repository this push was made to.
	pub repository: Option<Repository>,
	/// The user who pushed the commits.
	pub pusher: Option<User>,
	/// The pushed commits in chronological order (GitHub includes at most 20 of them).
	pub commits: Option<Vec<CommitPayload>>,
	// We don’t need the other fields, so ignore them
}

/// Webhook event payload for ping events, sent by GitHub when a webhook is created.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PingEventPayload
{
	/// A random string of GitHub zen.
	pub zen: Option<String>,
	/// The ID of the webhook that triggered the ping.
	pub hook_id: Option<u64>,
}

/// A push event with all placeholders for missing information filled in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PushEvent
{
	pub repository_name: String,
	pub repository_url: String,
	/// The branch name, that is, the last segment of the pushed ref.
	pub branch: String,
	pub pusher: String,
	/// SHA of the branch head after the push, if provided.
	pub head: Option<String>,
	/// Pushed commits in the order they were received. Never reordered.
	pub commits: Vec<Commit>,
}

/// A single pushed commit with all placeholders for missing information filled in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commit
{
	pub id: String,
	pub author: String,
	pub message: String,
	pub timestamp: String,
	pub url: String,
}

impl Commit
{
	/// The abbreviated commit SHA as shown by Git.
	pub fn short_id(&self) -> &str
	{
		match self.id.char_indices().nth(7)
		{
			Some((index, _)) => &self.id[..index],
			None => &self.id,
		}
	}

	/// The first line of the commit message.
	pub fn title(&self) -> &str
	{
		self.message.lines().next().unwrap_or_default()
	}
}

/// What happened to a single notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus
{
	/// The messaging API accepted the message.
	Sent,
	/// The messaging API rejected the message.
	Failed,
	/// The messaging API couldn’t be asked, for example, because of a network failure or because
	/// delivery isn’t configured.
	Error,
	/// No notification was sent on purpose, because the event doesn’t warrant one.
	Ignored,
}

/// Outcome of a single notification, reported back in the webhook response (serialized to JSON).
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct NotificationResult
{
	/// The commit SHA, or the head SHA of the push for summary notifications.
	pub id: String,
	pub status: NotificationStatus,
	/// Human-readable diagnostic information for notifications that weren’t sent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

impl NotificationResult
{
	/// Record the outcome of a delivery attempt.
	pub fn from_outcome(id: String, outcome: crate::telegram_api::DeliveryOutcome) -> Self
	{
		use crate::telegram_api::DeliveryOutcome;

		let (status, detail) = match outcome
		{
			DeliveryOutcome::Delivered => (NotificationStatus::Sent, None),
			DeliveryOutcome::Rejected{detail} => (NotificationStatus::Failed, Some(detail)),
			DeliveryOutcome::Errored{detail} => (NotificationStatus::Error, Some(detail)),
		};

		Self{id, status, detail}
	}
}

/// Response type for handled push events (serialized to JSON).
#[derive(Debug, serde::Serialize)]
pub struct PushResponse<'a>
{
	pub status: &'a str,
	pub repository: &'a str,
	pub branch: &'a str,
	pub pusher: &'a str,
	/// One entry per notification, in the order the commits were pushed.
	pub results: Vec<NotificationResult>,
}

/// Response type acknowledging ping events (serialized to JSON).
#[derive(Debug, serde::Serialize)]
pub struct PingResponse<'a>
{
	pub status: &'a str,
	pub info: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub zen: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hook_id: Option<u64>,
}

/// Response type for events that don’t lead to notifications (serialized to JSON).
#[derive(Debug, serde::Serialize)]
pub struct IgnoredResponse<'a>
{
	/// Always [NotificationStatus::Ignored].
	pub status: NotificationStatus,
	pub reason: &'a str,
}

/// Response type for the liveness and readiness probes (serialized to JSON).
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse<'a>
{
	pub status: &'a str,
	pub service: &'a str,
	pub version: &'a str,
	pub telegram_configured: bool,
	pub webhook_secret_configured: bool,
	pub unsigned_payloads: crate::signature::UnsignedPayloadPolicy,
}

/// Response type informing about errors while handling webhook events (serialized to JSON).
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse<'a>
{
	/// Error message with a human-readable explanation as to why this request failed.
	pub error: &'a str,
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn commit(id: &str, message: &str) -> Commit
	{
		Commit
		{
			id: id.to_owned(),
			author: UNKNOWN_NAME.to_owned(),
			message: message.to_owned(),
			timestamp: UNKNOWN_TIMESTAMP.to_owned(),
			url: NO_URL.to_owned(),
		}
	}

	#[test]
	fn short_id_abbreviates_to_seven_characters()
	{
		assert_eq!(commit("0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c", "").short_id(), "0d1a26e");
		assert_eq!(commit("abc", "").short_id(), "abc");
		assert_eq!(commit(UNKNOWN_ID, "").short_id(), "unknown");
	}

	#[test]
	fn title_is_first_line_of_message()
	{
		assert_eq!(commit("a", "Fix parser\n\nLonger explanation").title(), "Fix parser");
		assert_eq!(commit("a", "").title(), "");
	}

	#[test]
	fn results_serialize_with_snake_case_status()
	{
		let result = NotificationResult::from_outcome("abc".to_owned(),
			crate::telegram_api::DeliveryOutcome::Delivered);

		assert_eq!(serde_json::to_value(&result).unwrap(),
			serde_json::json!({"id": "abc", "status": "sent"}));

		let result = NotificationResult::from_outcome("def".to_owned(),
			crate::telegram_api::DeliveryOutcome::Rejected{detail: "HTTP 400".to_owned()});

		assert_eq!(serde_json::to_value(&result).unwrap(),
			serde_json::json!({"id": "def", "status": "failed", "detail": "HTTP 400"}));
	}
}
