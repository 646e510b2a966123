use teloxide::prelude::*;

use crate::bot::AppContext;
use crate::platform::{Marker, MarkerEvent, MessageRef};
use crate::train::state::VOTE_NEXT_MARKER;

/// Routes vote button taps into the marker hub.
///
/// Callback data format: `vote:<channel_id>/<message_id>:<marker>`. Taps on
/// messages nobody is polling any more are acknowledged and dropped.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, ctx: AppContext) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;
    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    tracing::debug!("Callback received: '{}' from user {}", data, user_id);

    let Some(rest) = data.strip_prefix("vote:") else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some((message_id, marker)) = rest.rsplit_once(':') else {
        tracing::warn!("vote callback without a marker: '{data}'");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    match message_id.parse::<MessageRef>() {
        Ok(message) => {
            let delivered = ctx.hub.dispatch(
                &message,
                MarkerEvent {
                    marker: Marker::from(marker),
                    user_id,
                },
            );
            let text = if delivered {
                "🗳 Vote recorded"
            } else if marker == VOTE_NEXT_MARKER {
                "👍 Noted"
            } else {
                "This vote has closed"
            };
            bot.answer_callback_query(q.id).text(text).await?;
        }
        Err(err) => {
            tracing::warn!("malformed vote callback '{data}': {err}");
            bot.answer_callback_query(q.id).await?;
        }
    }

    Ok(())
}
