//! Rendering of notifications in Telegram’s MarkdownV2 markup.
//!
//! All values taken from webhook payloads are user-controlled and escaped before being interpolated,
//! so that commit messages can neither break the markup nor inject formatting or links.

use crate::models::{Commit, PushEvent};

/// Commit messages are cut off after this many characters (Telegram messages are limited to 4096).
pub const MAX_MESSAGE_CHARS: usize = 1000;
/// Commit titles in push summaries are cut off after this many characters.
pub const MAX_TITLE_CHARS: usize = 100;
/// Push summaries list at most this many commits.
pub const MAX_SUMMARY_COMMITS: usize = 10;
/// Repository, branch, and user names as well as timestamps are cut off after this many characters.
pub const MAX_NAME_CHARS: usize = 64;
/// Links with longer targets are left out, as a cut-off URL would point nowhere.
pub const MAX_URL_CHARS: usize = 300;
/// Telegram rejects messages longer than this.
pub const MAX_TEXT_CHARS: usize = 4096;

/// The characters that carry meaning in MarkdownV2 text.
const MARKDOWN_V2_SPECIAL_CHARACTERS: &[char] = &[
	'_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Render the notification for a single commit.
///
/// # Arguments
/// - `repository_name`: Name of the repository the commit was pushed to.
/// - `commit`: The pushed commit.
/// - `branch`: Name of the branch the commit was pushed to.
/// - `pusher`: Name of the user who pushed the commit.
pub fn format_commit(repository_name: &str, commit: &Commit, branch: &str, pusher: &str) -> String
{
	let mut text = format!(
		"📦 *New commit to {}*\n\
		👤 Author: {}\n\
		📤 Pushed by: {}\n\
		🌿 Branch: {}\n\
		🕒 Time: {}\n\
		📝 Message: {}",
		escape_name(repository_name),
		escape_name(&commit.author),
		escape_name(pusher),
		escape_name(branch),
		escape_name(&format_timestamp(&commit.timestamp)),
		escape(&truncate(&commit.message, MAX_MESSAGE_CHARS)));

	if has_link_target(&commit.url)
	{
		text.push_str(&format!("\n🔗 [View commit]({})", escape_link_target(&commit.url)));
	}

	text
}

/// Render a single notification summarizing all commits of a push.
pub fn format_push_summary(push_event: &PushEvent) -> String
{
	let commit_count = push_event.commits.len();
	let noun = if commit_count == 1 {"commit"} else {"commits"};

	let mut text = format!(
		"📦 *{commit_count} new {noun} to {}*\n\
		🌿 Branch: {}\n\
		📤 Pushed by: {}\n",
		escape_name(&push_event.repository_name),
		escape_name(&push_event.branch),
		escape_name(&push_event.pusher));

	let footer = if has_link_target(&push_event.repository_url)
	{
		format!("\n\n🔗 [View repository]({})", escape_link_target(&push_event.repository_url))
	}
	else
	{
		String::new()
	};

	// Room for the footer and the line announcing omitted commits
	let budget = MAX_TEXT_CHARS - footer.chars().count() - 32;
	let mut text_chars = text.chars().count();
	let mut listed_count = 0;

	for commit in push_event.commits.iter().take(MAX_SUMMARY_COMMITS)
	{
		let short_id = escape(commit.short_id());
		let title = escape(&truncate(commit.title(), MAX_TITLE_CHARS));
		let author = escape_name(&commit.author);

		let line = if has_link_target(&commit.url)
		{
			format!("\n• [{short_id}]({}) {title} \\({author}\\)", escape_link_target(&commit.url))
		}
		else
		{
			format!("\n• {short_id} {title} \\({author}\\)")
		};

		let line_chars = line.chars().count();

		if text_chars + line_chars > budget
		{
			break;
		}

		text.push_str(&line);
		text_chars += line_chars;
		listed_count += 1;
	}

	if commit_count > listed_count
	{
		text.push_str(&format!("\n…and {} more", commit_count - listed_count));
	}

	text.push_str(&footer);

	text
}

/// Escape all characters with a special meaning in MarkdownV2 text.
pub fn escape(text: &str) -> String
{
	let mut escaped = String::with_capacity(text.len());

	for character in text.chars()
	{
		if MARKDOWN_V2_SPECIAL_CHARACTERS.contains(&character)
		{
			escaped.push('\\');
		}

		escaped.push(character);
	}

	escaped
}

/// Escape a name after cutting it off at [MAX_NAME_CHARS].
#[doc(hidden)]
fn escape_name(name: &str) -> String
{
	escape(&truncate(name, MAX_NAME_CHARS))
}

/// Whether a URL can be linked to. Telegram rejects links without a target.
#[doc(hidden)]
fn has_link_target(url: &str) -> bool
{
	url != crate::models::NO_URL && url.chars().count() <= MAX_URL_CHARS
}

/// Escape the characters that would end a MarkdownV2 link target prematurely.
pub fn escape_link_target(url: &str) -> String
{
	let mut escaped = String::with_capacity(url.len());

	for character in url.chars()
	{
		if character == ')' || character == '\\'
		{
			escaped.push('\\');
		}

		escaped.push(character);
	}

	escaped
}

/// Render RFC 3339 timestamps in a more readable form, leaving anything else as is.
pub fn format_timestamp(timestamp: &str) -> String
{
	match chrono::DateTime::parse_from_rfc3339(timestamp)
	{
		Ok(timestamp) => timestamp.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
		Err(_) => timestamp.to_owned(),
	}
}

/// Cut off text after a number of characters, without splitting a character.
#[doc(hidden)]
fn truncate(text: &str, max_chars: usize) -> String
{
	match text.char_indices().nth(max_chars)
	{
		Some((index, _)) => format!("{}… (truncated)", &text[..index]),
		None => text.to_owned(),
	}
}
