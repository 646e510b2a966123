/// Choice marker emoji sequences
pub mod emoji;
/// Time-ordered train id generation
pub mod ids;
/// Structured command/operation logging helpers
pub mod logging;
/// Telegram MarkdownV2 escaping
pub mod markdown;
