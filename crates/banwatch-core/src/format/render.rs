//! Message rendering
//!
//! Produces the markdown body posted for one new ban. The output depends
//! only on its inputs: rendering the same ban twice yields the same string.

use tracing::warn;

use crate::error::Result;
use crate::format::Labels;
use crate::model::{Ban, Comment, PlayerProfile, comment, timestamp};

const STEAM_PROFILE_URL: &str = "https://steamcommunity.com/profiles/";

/// Render the notification for one ban
///
/// `comments` is `None` when the comment lookup failed and `Some(&[])` when
/// the player has none; both omit the comment section.
///
/// # Errors
///
/// Returns `Error::Timestamp` if any comment carries an unparseable
/// `creation_time`. A malformed action time is not an error; it renders as
/// the `unknown` label.
pub fn render(
    ban: &Ban,
    player: &PlayerProfile,
    comments: Option<&[Comment]>,
    labels: &Labels,
) -> Result<String> {
    let action = player.latest_action();
    let blacklisted = player.is_blacklisted();

    let name = player.display_name().unwrap_or(&labels.unknown);
    let steam_id = player
        .steam_id_64
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(&ban.steam_id_64);

    let shown_time = action
        .and_then(|a| a.time.as_deref())
        .and_then(|raw| match timestamp::parse_api_time(raw) {
            Ok(time) => Some(timestamp::display(&time)),
            Err(e) => {
                warn!(steam_id, error = %e, "Unparseable action time");
                None
            }
        });

    let (reason, enforced_by) = if blacklisted {
        (
            player.blacklist.reason.as_deref(),
            player.blacklist.by.as_deref(),
        )
    } else {
        (
            action.and_then(|a| a.reason.as_deref()),
            action.and_then(|a| a.by.as_deref()),
        )
    };
    let ban_type = action.and_then(|a| a.action_type.as_deref());

    let playtime = player.playtime();
    let unknown = labels.unknown.as_str();

    let mut out = Message::default();
    out.heading(&labels.new_ban);
    out.blank();
    out.field(&labels.name, name);
    out.field(&labels.steam_id, steam_id);
    out.field(&labels.ban_time, shown_time.as_deref().unwrap_or(unknown));
    out.field(
        &labels.on_blacklist,
        if blacklisted { &labels.yes } else { &labels.no },
    );
    out.field(&labels.steam_url, &format!("{}{}", STEAM_PROFILE_URL, steam_id));
    out.field(
        &labels.total_playtime,
        &format!(
            "{} {} {} {} {}",
            playtime.hours, labels.hours, labels.and, playtime.minutes, labels.minutes
        ),
    );
    out.field(&labels.reason, reason.unwrap_or(unknown));
    out.field(&labels.ban_enforced_by, enforced_by.unwrap_or(unknown));
    out.field(&labels.ban_type, ban_type.unwrap_or(unknown));

    if let Some((latest, created_at)) = comment::latest(comments.unwrap_or_default())? {
        out.heading(&labels.player_comments);
        out.line(&format!(
            "- {}: {} ({} {})",
            timestamp::display(&created_at),
            latest.content,
            labels.by,
            latest.by
        ));
    }

    Ok(out.finish())
}

#[derive(Default)]
struct Message(String);

impl Message {
    fn line(&mut self, text: &str) {
        self.0.push_str(text);
        self.0.push('\n');
    }

    fn blank(&mut self) {
        self.0.push('\n');
    }

    fn heading(&mut self, label: &str) {
        self.line(&format!("**{}**", label));
    }

    fn field(&mut self, label: &str, value: &str) {
        self.line(&format!("**{}** {}", label, value));
    }

    fn finish(self) -> String {
        self.0
    }
}
