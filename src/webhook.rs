use crate::classifier::EventDecision;
use crate::models::{NotificationResult, PushEvent, WebhookRequest};

/// Everything request handlers need, shared by all requests and never modified.
#[derive(Clone)]
pub struct Relay
{
	pub config: std::sync::Arc<crate::Config>,
	pub telegram_api_client: crate::telegram_api::Client,
}

impl Relay
{
	pub fn from_config(config: crate::Config) -> Result<Self, crate::Error>
	{
		let config = std::sync::Arc::new(config);
		let telegram_api_client = crate::telegram_api::Client::from_config(config.clone())?;

		Ok(Self{config, telegram_api_client})
	}
}

/// All routes served by this application, with rejections turned into JSON error responses.
///
/// - `POST /github`: Receive GitHub webhook events.
/// - `GET /` and `GET /health`: Report that the service is running and how it’s configured.
pub fn routes(relay: Relay)
	-> impl warp::Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
{
	use warp::Filter as _;

	let max_payload_bytes = relay.config.server.max_payload_bytes;

	let webhook_event_route =
		// Only listen for requests to /github
		warp::path("github").and(warp::path::end())
		// Only listen for POST requests
		.and(warp::post())
		// Reject payloads larger than configured, which should be enough for all valid requests
		.and(warp::body::content_length_limit(max_payload_bytes))
		// Retrieve the raw payload and the headers needed to handle it
		.and(with_webhook_request())
		// Pass on the shared configuration and clients
		.and(with_relay(relay.clone()))
		// Forward request to request handler
		.and_then(handle_webhook_event);

	let health_route =
		warp::path::end().or(warp::path("health").and(warp::path::end())).unify()
		.and(warp::get())
		.and(with_relay(relay))
		.map(handle_health_check);

	webhook_event_route
		.or(health_route)
		.recover(handle_rejection)
}

/// [warp] filter extracting a [WebhookRequest] from the HTTP request. The body is kept as raw bytes,
/// as the payload signature is computed over the exact bytes sent.
pub fn with_webhook_request()
	-> impl warp::Filter<Extract = (WebhookRequest,), Error = warp::Rejection> + Clone
{
	use warp::Filter as _;

	warp::body::bytes()
		.and(warp::header::optional::<String>("x-hub-signature-256"))
		.and(warp::header::optional::<String>("x-github-event"))
		.and(warp::header::optional::<String>("x-github-delivery"))
		.and(warp::addr::remote())
		.map(
			|body: warp::hyper::body::Bytes,
				signature: Option<String>,
				event: Option<String>,
				delivery: Option<String>,
				remote_address: Option<std::net::SocketAddr>|
			{
				WebhookRequest{body, signature, event, delivery, remote_address}
			})
}

#[doc(hidden)]
fn with_relay(relay: Relay)
	-> impl warp::Filter<Extract = (Relay,), Error = std::convert::Infallible> + Clone
{
	use warp::Filter as _;

	warp::any().map(move || relay.clone())
}

/// Request handler for webhook events.
///
/// Verifies the payload signature, decides what to do about the event, and sends notifications for
/// pushed commits. Events that don’t warrant notifications and failed notifications are reported
/// with a successful HTTP response, as GitHub can’t do anything about them.
///
/// # Arguments
/// - `request`: The incoming webhook request.
/// - `relay`: Shared configuration and clients.
async fn handle_webhook_event(request: WebhookRequest, relay: Relay)
	-> Result<impl warp::Reply, warp::Rejection>
{
	let event_type = request.event.as_deref().unwrap_or(crate::classifier::UNKNOWN_EVENT_TYPE);
	let delivery = request.delivery.as_deref().unwrap_or("unknown");

	match request.remote_address
	{
		Some(remote_address) => log::debug!("received “{event_type}” event (delivery {delivery}) \
			from {remote_address}"),
		None => log::debug!("received “{event_type}” event (delivery {delivery})"),
	}

	// Nothing in the payload can be trusted before the signature is verified
	crate::signature::Verifier::new(&relay.config.webhook)
		.check(&request.body, request.signature.as_deref())
		.map_err(|error|
		{
			log::warn!("rejected “{event_type}” event (delivery {delivery}): {error}");
			warp::reject::custom(error)
		})?;

	let decision = serde_json::from_slice(&request.body)
		.map_err(crate::Error::DecodePayloadBody)
		.and_then(|payload: serde_json::Value|
			crate::classifier::classify(request.event.as_deref(), &payload))
		.map_err(|error|
		{
			match &error
			{
				crate::Error::DecodePayloadBody(source) => log::warn!("could not decode \
					“{event_type}” event (delivery {delivery}): {source}"),
				_ => log::warn!("could not decode “{event_type}” event (delivery {delivery}): \
					{error}"),
			}

			warp::reject::custom(error)
		})?;

	let response = match decision
	{
		EventDecision::Ping{zen, hook_id} =>
		{
			log::info!("received ping for webhook {} (delivery {delivery})",
				hook_id.map_or_else(|| "unknown".to_owned(), |hook_id| hook_id.to_string()));

			warp::reply::json(&crate::models::PingResponse
			{
				status: "pong",
				info: "webhook is set up correctly",
				zen: zen.as_deref(),
				hook_id,
			})
		},
		EventDecision::Ignored{reason} =>
		{
			log::info!("ignoring “{event_type}” event (delivery {delivery}): {reason}");

			warp::reply::json(&crate::models::IgnoredResponse
			{
				status: crate::models::NotificationStatus::Ignored,
				reason: &reason,
			})
		},
		EventDecision::Push(push_event) =>
		{
			log::info!("{} commit(s) pushed to branch “{}” of repository “{}” by {} (delivery \
				{delivery})", push_event.commits.len(), push_event.branch,
				push_event.repository_name, push_event.pusher);

			let results = notify(&relay, &push_event, delivery).await;

			warp::reply::json(&crate::models::PushResponse
			{
				status: "processed",
				repository: &push_event.repository_name,
				branch: &push_event.branch,
				pusher: &push_event.pusher,
				results,
			})
		},
	};

	Ok(warp::reply::with_status(response, warp::http::StatusCode::OK))
}

/// Send the notifications for a push event and collect their outcomes in commit order.
///
/// Notifications are sent one after the other, so that they appear in the chat in the order the
/// commits were made. A failed notification doesn’t prevent the remaining ones from being sent.
async fn notify(relay: &Relay, push_event: &PushEvent, delivery: &str) -> Vec<NotificationResult>
{
	match relay.config.notifications.mode
	{
		crate::config::NotificationMode::PerCommit =>
		{
			let mut results = Vec::with_capacity(push_event.commits.len());

			for commit in &push_event.commits
			{
				let text = crate::format::format_commit(&push_event.repository_name, commit,
					&push_event.branch, &push_event.pusher);
				let outcome = relay.telegram_api_client.deliver(&text).await;

				log_outcome(push_event, &commit.id, delivery, &outcome);
				results.push(NotificationResult::from_outcome(commit.id.clone(), outcome));
			}

			results
		},
		crate::config::NotificationMode::Summary =>
		{
			let id = push_event.head.clone().unwrap_or_else(|| "push".to_owned());

			let text = crate::format::format_push_summary(push_event);
			let outcome = relay.telegram_api_client.deliver(&text).await;

			log_outcome(push_event, &id, delivery, &outcome);
			vec![NotificationResult::from_outcome(id, outcome)]
		},
	}
}

#[doc(hidden)]
fn log_outcome(push_event: &PushEvent, id: &str, delivery: &str,
	outcome: &crate::telegram_api::DeliveryOutcome)
{
	let repository_name = &push_event.repository_name;

	if outcome.is_success()
	{
		log::info!("sent notification about “{id}” in repository “{repository_name}” (delivery \
			{delivery})");
	}
	else
	{
		log::warn!("could not send notification about “{id}” in repository “{repository_name}” \
			(delivery {delivery}): {}", outcome.detail().unwrap_or_default());
	}
}

/// Request handler for liveness and readiness probes. Never reveals secrets.
fn handle_health_check(relay: Relay) -> impl warp::Reply
{
	warp::reply::json(&crate::models::HealthResponse
	{
		status: "running",
		service: env!("CARGO_PKG_NAME"),
		version: env!("CARGO_PKG_VERSION"),
		telegram_configured: relay.telegram_api_client.is_configured(),
		webhook_secret_configured: relay.config.webhook.secret.is_some(),
		unsigned_payloads: relay.config.webhook.unsigned_payloads,
	})
}

/// Request handler for all requests that were rejected previously.
///
/// # Arguments
/// - `error`: Reasons for why this request was rejected by all routes.
async fn handle_rejection(error: warp::Rejection)
	-> Result<impl warp::Reply, std::convert::Infallible>
{
	let status_code;
	let message;

	// Check for this crate’s errors first. They are only raised once a request matched a route,
	// while other routes may have rejected the same request for unrelated reasons
	if let Some(crate::Error::DecodePayloadBody(_)) = error.find()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "malformed payload body";
	}
	else if let Some(crate::Error::MissingPayloadSignature) = error.find()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "missing payload signature";
	}
	else if let Some(crate::Error::InvalidPayloadSignature) = error.find()
	{
		status_code = warp::http::StatusCode::FORBIDDEN;
		message = "invalid payload signature";
	}
	else if let Some(_) = error.find::<warp::reject::PayloadTooLarge>()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "payload too large";
	}
	else if let Some(_) = error.find::<warp::reject::LengthRequired>()
	{
		status_code = warp::http::StatusCode::LENGTH_REQUIRED;
		message = "missing content length";
	}
	else if let Some(_) = error.find::<warp::reject::InvalidHeader>()
	{
		status_code = warp::http::StatusCode::BAD_REQUEST;
		message = "invalid webhook header";
	}
	else if error.is_not_found()
	{
		status_code = warp::http::StatusCode::NOT_FOUND;
		message = "not found";
	}
	else if let Some(_) = error.find::<warp::reject::MethodNotAllowed>()
	{
		status_code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
		message = "method not allowed";
	}
	// If users are able to trigger errors we did not anticipate, log the error chain so we can
	// inspect this more closely later
	else
	{
		status_code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
		message = "internal server error";

		log::error!("unhandled error: {:#?}", error);
	}

	let response = warp::reply::json(&crate::models::ErrorResponse{error: message});

	Ok(warp::reply::with_status(response, status_code))
}
