use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::Command;
use crate::bot::AppContext;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: AppContext,
) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => {
            bot.send_message(
                msg.chat.id,
                "🚂 Welcome to Raid Train Bot!\n\nUse /train in a raid report channel to start a train.\nUse /help to see all commands.",
            )
            .await?;
        }
        Command::Train => {
            crate::bot::commands::train_control::handle_train(bot, msg, &ctx).await?;
        }
        Command::Done => {
            crate::bot::commands::train_control::handle_done(bot, msg, &ctx).await?;
        }
    }
    Ok(())
}
