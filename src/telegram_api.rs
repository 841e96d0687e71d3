/// Configuration of the Telegram Bot API client.
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct Config
{
	/// The base URL of the Telegram Bot API server with a trailing slash (optional, default:
	/// <https://api.telegram.org/>).
	pub base_url: url::Url,
	/// The token of the bot sending the notifications, as issued by @BotFather. Without it,
	/// notifications are not delivered.
	pub bot_token: Option<String>,
	/// The ID of the chat to deliver notifications to (numeric, or `@channelusername` for public
	/// channels). Quote numeric IDs in YAML. Without it, notifications are not delivered.
	pub chat_id: Option<String>,
	/// Give up on requests to the Telegram Bot API after this many seconds (default: 10). Zero is
	/// rejected, as every request would time out immediately.
	pub timeout_secs: std::num::NonZeroU64,
}

impl Default for Config
{
	fn default() -> Self
	{
		Self
		{
			base_url: telegram_org_api_base_url(),
			bot_token: None,
			chat_id: None,
			timeout_secs: std::num::NonZeroU64::new(10)
				.expect("this call is infallible because the value is nonzero"),
		}
	}
}

#[doc(hidden)]
fn telegram_org_api_base_url() -> url::Url
{
	url::Url::parse("https://api.telegram.org/")
		.expect("this call is infallible because we know the URL to be well-formed")
}

/// The outcome of delivering a single notification. Failures are reported as data, so that a
/// failed notification doesn’t abort handling the remaining ones.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeliveryOutcome
{
	/// The Telegram Bot API accepted the message.
	Delivered,
	/// The Telegram Bot API responded, but refused to send the message.
	Rejected
	{
		detail: String,
	},
	/// No response was obtained from the Telegram Bot API, or no request was made at all.
	Errored
	{
		detail: String,
	},
}

impl DeliveryOutcome
{
	pub fn is_success(&self) -> bool
	{
		matches!(self, Self::Delivered)
	}

	/// Diagnostic information about why the delivery failed.
	pub fn detail(&self) -> Option<&str>
	{
		match self
		{
			Self::Delivered => None,
			Self::Rejected{detail} | Self::Errored{detail} => Some(detail),
		}
	}
}

/// A Telegram Bot API client that sends messages to the configured chat.
///
/// Each call to [Client::deliver] makes exactly one request, bounded by the configured timeout.
/// Failed requests are not retried.
///
/// The client can safely be shared between threads, which is achieved by internally using
/// thread-safe handles to the underlying data structures. This allows the client to be used in
/// request handlers asynchronously and concurrently.
#[derive(Clone)]
pub struct Client
{
	#[doc(hidden)]
	config: std::sync::Arc<crate::Config>,
	#[doc(hidden)]
	reqwest_client: reqwest::Client,
}

impl Client
{
	/// Initialize a new Telegram Bot API client with a given configuration.
	pub fn from_config(config: std::sync::Arc<crate::Config>) -> Result<Self, crate::Error>
	{
		let reqwest_client = reqwest::ClientBuilder::new()
			// Set a recognizable user agent to get meaningful debugging information
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			// Bound every request, so that a slow API can’t stall webhook requests indefinitely
			.timeout(std::time::Duration::from_secs(config.telegram.timeout_secs.get()))
			.build().map_err(crate::Error::CreateHttpClient)?;

		Ok(Self{config, reqwest_client})
	}

	/// Whether both the bot token and the chat ID are configured.
	pub fn is_configured(&self) -> bool
	{
		self.config.telegram.bot_token.is_some() && self.config.telegram.chat_id.is_some()
	}

	/// Send a message in MarkdownV2 markup to the configured chat.
	///
	/// This never fails. All errors are reported in the returned [DeliveryOutcome].
	pub async fn deliver(&self, text: &str) -> DeliveryOutcome
	{
		match self.send_message(text).await
		{
			Ok(()) => DeliveryOutcome::Delivered,
			Err(error @ crate::Error::ReceivedTelegramApiError{..}) =>
				DeliveryOutcome::Rejected{detail: error.to_string()},
			Err(crate::Error::SendTelegramMessage(error)) if error.is_timeout() =>
				DeliveryOutcome::Errored
				{
					detail: format!("request timed out after {} s",
						self.config.telegram.timeout_secs),
				},
			Err(error) => DeliveryOutcome::Errored{detail: format!("{:#}", anyhow::Error::from(error))},
		}
	}

	#[doc(hidden)]
	async fn send_message(&self, text: &str) -> Result<(), crate::Error>
	{
		let config = &self.config.telegram;

		let (bot_token, chat_id) = match (config.bot_token.as_deref(), config.chat_id.as_deref())
		{
			(Some(bot_token), Some(chat_id)) => (bot_token, chat_id),
			_ => return Err(crate::Error::MissingTelegramConfiguration),
		};

		// Bot tokens contain a colon, so the relative URL needs to start with ./ in order not to be
		// mistaken for an absolute URL with a scheme
		let url = config.base_url.join(&format!("./bot{bot_token}/sendMessage"))
			.map_err(crate::Error::ParseUrl)?;

		let send_message_request = SendMessageRequest
		{
			chat_id,
			text,
			parse_mode: "MarkdownV2",
			disable_web_page_preview: true,
		};

		// The URL contains the bot token, so strip it from errors, which end up in logs and responses
		let map_reqwest_error = |error: reqwest::Error| crate::Error::SendTelegramMessage(error.without_url());

		let response = self.reqwest_client.post(url)
			.json(&send_message_request)
			.send().await.map_err(map_reqwest_error)?;

		let status_code = response.status();
		let response_body = response.bytes().await.map_err(map_reqwest_error)?;

		// The Bot API always responds with JSON, but proxies in between might not
		let response_body: SendMessageResponse =
			serde_json::from_slice(&response_body).unwrap_or_default();

		if !status_code.is_success() || response_body.ok == Some(false)
		{
			let description = response_body.description
				.or_else(|| status_code.canonical_reason().map(str::to_owned))
				.unwrap_or_else(|| "unknown error".to_owned());

			return Err(crate::Error::ReceivedTelegramApiError{status_code, description});
		}

		Ok(())
	}
}

/// Parameters of the Bot API’s sendMessage method.
#[doc(hidden)]
#[derive(Debug, serde::Serialize)]
struct SendMessageRequest<'a>
{
	chat_id: &'a str,
	text: &'a str,
	parse_mode: &'a str,
	disable_web_page_preview: bool,
}

/// Response to a request to the Bot API’s sendMessage method.
#[doc(hidden)]
#[derive(Debug, Default, serde::Deserialize)]
struct SendMessageResponse
{
	ok: Option<bool>,
	/// Human-readable description of the result, only present on errors.
	description: Option<String>,
	// We don’t need the sent message, so ignore all other fields
}
