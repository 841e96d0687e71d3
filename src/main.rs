#[doc(hidden)]
mod classifier;
#[doc(hidden)]
mod config;
#[doc(hidden)]
mod error;
#[cfg(test)]
mod fake_telegram_api;
pub mod format;
#[doc(hidden)]
mod models;
pub mod signature;
pub mod telegram_api;
pub mod webhook;

pub use config::Config;
pub use error::Error;

#[tokio::main]
async fn main() -> anyhow::Result<()>
{
	pretty_env_logger::init();

	// Read the optional config file and override its values with those from the environment
	let config = Config::load(|name| std::env::var(name).ok())?;
	let listen_address = config.server.listen;

	if config.telegram.bot_token.is_none() || config.telegram.chat_id.is_none()
	{
		log::warn!("Telegram bot token or chat ID not configured, notifications won’t be delivered");
	}

	match (&config.webhook.secret, config.webhook.unsigned_payloads)
	{
		(Some(_), _) => (),
		(None, signature::UnsignedPayloadPolicy::Reject) =>
			log::warn!("no webhook secret configured, all webhook events will be rejected"),
		(None, signature::UnsignedPayloadPolicy::Accept) =>
			log::warn!("no webhook secret configured, accepting webhook events without checking \
				their signature (this should be configured for production use)"),
	}

	// Set up the Telegram Bot API client once and share it with all request handlers
	let relay = webhook::Relay::from_config(config)?;
	let routes = webhook::routes(relay);

	let (address, server) = warp::serve(routes)
		.try_bind_with_graceful_shutdown(listen_address, shutdown_signal())?;

	log::info!("listening for incoming webhook events on {address}");
	server.await;
	log::info!("shut down");

	Ok(())
}

/// Resolves once the process is asked to terminate, so that running requests can finish first.
async fn shutdown_signal()
{
	if let Err(error) = tokio::signal::ctrl_c().await
	{
		log::error!("could not listen for shutdown signal");
		log::error!("{:?}", anyhow::Error::from(error));

		// Without a way to be notified, keep running until killed
		std::future::pending::<()>().await;
	}

	log::info!("received shutdown signal, shutting down gracefully");
}
