/// Path of the configuration file read when `PUSH_RELAY_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Default, serde::Deserialize)]
#[serde(default)]
/// Top-level configuration of this application.
///
/// The configuration is read once at startup from an optional YAML file, after which environment
/// variables override individual values. It is never modified afterwards and shared with all
/// request handlers.
pub struct Config
{
	/// Options for the HTTP server receiving webhook events.
	pub server: ServerConfig,
	/// Options for authenticating incoming webhook events.
	pub webhook: crate::signature::Config,
	/// Options specific to the Telegram Bot API.
	pub telegram: crate::telegram_api::Config,
	/// Options controlling how push events are turned into notifications.
	pub notifications: NotificationsConfig,
}

impl Config
{
	/// Attempt to read and parse the configuration from a YAML file.
	///
	/// # Arguments
	/// `path`: Path to the configuration file in YAML format.
	pub fn from_file<P>(path: P) -> Result<Self, crate::Error>
	where
		P: AsRef<std::path::Path>
	{
		let file = std::fs::File::open(&path).map_err(crate::Error::ReadConfigFile)?;
		serde_yaml::from_reader(&file).map_err(crate::Error::ParseConfigFile)
	}

	/// Load the configuration file (if any) and apply overrides from the environment.
	///
	/// An explicitly configured file (`PUSH_RELAY_CONFIG`) must exist, while the default
	/// `config.yaml` is optional, so the service can be configured through the environment alone.
	///
	/// # Arguments
	/// - `lookup`: Returns the value of an environment variable, if set.
	pub fn load<L>(lookup: L) -> Result<Self, crate::Error>
	where
		L: Fn(&str) -> Option<String>,
	{
		let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

		let mut config = match lookup("PUSH_RELAY_CONFIG")
		{
			Some(path) =>
			{
				log::info!("reading configuration from “{path}”");
				Self::from_file(path)?
			},
			None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() =>
			{
				log::info!("reading configuration from “{DEFAULT_CONFIG_PATH}”");
				Self::from_file(DEFAULT_CONFIG_PATH)?
			},
			None => Self::default(),
		};

		config.apply_environment(lookup)?;

		Ok(config)
	}

	/// Override configuration values with those set in the environment.
	pub fn apply_environment<L>(&mut self, lookup: L) -> Result<(), crate::Error>
	where
		L: Fn(&str) -> Option<String>,
	{
		if let Some(bot_token) = lookup("TELEGRAM_BOT_TOKEN")
		{
			self.telegram.bot_token = Some(bot_token);
		}

		if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID")
		{
			self.telegram.chat_id = Some(chat_id);
		}

		if let Some(base_url) = lookup("TELEGRAM_API_BASE_URL")
		{
			self.telegram.base_url = parse_variable("TELEGRAM_API_BASE_URL", base_url)?;
		}

		if let Some(timeout_secs) = lookup("TELEGRAM_TIMEOUT_SECS")
		{
			self.telegram.timeout_secs = parse_variable("TELEGRAM_TIMEOUT_SECS", timeout_secs)?;
		}

		if let Some(secret) = lookup("GITHUB_WEBHOOK_SECRET")
		{
			self.webhook.secret = Some(secret);
		}

		if let Some(policy) = lookup("WEBHOOK_UNSIGNED_PAYLOADS")
		{
			self.webhook.unsigned_payloads = parse_variable("WEBHOOK_UNSIGNED_PAYLOADS", policy)?;
		}

		if let Some(mode) = lookup("NOTIFICATION_MODE")
		{
			self.notifications.mode = parse_variable("NOTIFICATION_MODE", mode)?;
		}

		if let Some(listen) = lookup("LISTEN_ADDRESS")
		{
			self.server.listen = parse_variable("LISTEN_ADDRESS", listen)?;
		}

		// PORT is what most hosting platforms set, so it takes precedence over the listen address
		if let Some(port) = lookup("PORT")
		{
			let port = parse_variable("PORT", port)?;
			self.server.listen.set_port(port);
		}

		Ok(())
	}
}

#[doc(hidden)]
fn parse_variable<T>(name: &'static str, value: String) -> Result<T, crate::Error>
where
	T: std::str::FromStr,
{
	value.parse().map_err(|_| crate::Error::InvalidEnvironmentVariable{name, value})
}

/// Configuration of the HTTP server.
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig
{
	/// Address and port to listen on (default: `0.0.0.0:5000`).
	pub listen: std::net::SocketAddr,
	/// Reject payloads larger than this many bytes (default: 1 MiB). GitHub caps webhook payloads
	/// at 25 MB, but push events with that many commits are truncated long before.
	pub max_payload_bytes: u64,
}

impl Default for ServerConfig
{
	fn default() -> Self
	{
		Self
		{
			listen: std::net::SocketAddr::from(([0, 0, 0, 0], 5000)),
			max_payload_bytes: 1024 * 1024,
		}
	}
}

/// Configuration of how push events are turned into notifications.
#[derive(Default, serde::Deserialize)]
#[serde(default)]
pub struct NotificationsConfig
{
	/// Whether to send one message per commit or one message per push.
	pub mode: NotificationMode,
}

/// How many notifications to send for a single push event.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode
{
	/// Send a separate message for each commit, in the order they were pushed.
	#[default]
	PerCommit,
	/// Send a single message summarizing all commits of the push.
	Summary,
}

impl std::str::FromStr for NotificationMode
{
	type Err = ();

	fn from_str(value: &str) -> Result<Self, Self::Err>
	{
		match value
		{
			"per_commit" => Ok(Self::PerCommit),
			"summary" => Ok(Self::Summary),
			_ => Err(()),
		}
	}
}
