use teloxide::prelude::*;

use crate::bot::AppContext;
use crate::platform::ChannelId;
use crate::train::{Train, TrainError};
use crate::utils::ids::next_train_id;
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};

fn invoking_channel(msg: &Message) -> ChannelId {
    ChannelId {
        chat: msg.chat.id.0,
        topic: msg.thread_id.map(i64::from).unwrap_or(0),
    }
}

/// `/train`: creates a dedicated channel, registers the train, and prompts
/// the invoker for the first raid.
pub async fn handle_train(bot: Bot, msg: Message, ctx: &AppContext) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let username = user.username.as_deref().unwrap_or("unknown");
    let chat_id = msg.chat.id.0;
    log_command_start("train", username, user_id, chat_id);

    let report_channel = invoking_channel(&msg);
    let train_id = next_train_id();
    let name = format!("raid-train-{train_id}");

    let channel = match ctx.deps.platform.create_channel(chat_id, &name).await {
        Ok(channel) => channel,
        Err(err) => {
            log_command_error("train", username, user_id, chat_id, &err.to_string());
            bot.send_message(
                msg.chat.id,
                "❌ Couldn't create a channel for the train. Is this chat a forum supergroup?",
            )
            .await?;
            return Ok(());
        }
    };

    let train = ctx.registry.trains.get_or_create(train_id, || {
        Train::new(train_id, chat_id, channel, report_channel, ctx.deps.clone())
    });
    if let Err(err) = train.upsert().await {
        log_command_error("train", username, user_id, chat_id, &err.to_string());
        bot.send_message(msg.chat.id, "❌ Error saving the new train.")
            .await?;
        return Ok(());
    }
    ctx.registry.register_channel(channel, train.clone());

    match train.select_first_raid(user_id).await {
        Ok(()) => log_command_success("train", username, user_id, chat_id),
        Err(TrainError::NoCandidates) => {
            bot.send_message(
                msg.chat.id,
                "❌ No raids are currently reported in this channel.",
            )
            .await?;
        }
        Err(TrainError::Prompt(err)) => {
            log_command_error("train", username, user_id, chat_id, &err.to_string());
            bot.send_message(
                msg.chat.id,
                "❌ No raid was picked in time. Use /train to start again.",
            )
            .await?;
        }
        Err(err) => {
            log_command_error("train", username, user_id, chat_id, &err.to_string());
            bot.send_message(msg.chat.id, "❌ Error starting the train.")
                .await?;
        }
    }

    Ok(())
}

/// `/done`: finishes the invoking channel's current raid. Silently ignored
/// outside train channels.
pub async fn handle_done(bot: Bot, msg: Message, ctx: &AppContext) -> ResponseResult<()> {
    let channel = invoking_channel(&msg);
    let Some(train) = ctx.registry.train_for_channel(&channel) else {
        return Ok(());
    };

    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or(0);
    let username = msg
        .from()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown");
    log_command_start("done", username, user_id, msg.chat.id.0);

    match train.finish_current_raid().await {
        Ok(report) => {
            if !report.failed.is_empty() {
                tracing::warn!(
                    train_id = train.id,
                    failed = report.failed.len(),
                    "some train messages could not be deleted"
                );
            }
            log_command_success("done", username, user_id, msg.chat.id.0);
        }
        Err(TrainError::NoCurrentRaid) => {
            bot.send_message(msg.chat.id, "❌ This train has no raid in progress.")
                .await?;
        }
        Err(TrainError::NoNextRaid) => {
            bot.send_message(
                msg.chat.id,
                "❌ No next raid has been voted yet. Vote on one before finishing this raid.",
            )
            .await?;
        }
        Err(err) => {
            log_command_error("done", username, user_id, msg.chat.id.0, &err.to_string());
            bot.send_message(msg.chat.id, "❌ Error finishing the current raid.")
                .await?;
        }
    }

    Ok(())
}
