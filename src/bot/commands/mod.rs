pub mod train_control;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Raid Train Bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Start a raid train from this channel's raids")]
    Train,
    #[command(description = "Finish the current raid and roll on to the next")]
    Done,
}
