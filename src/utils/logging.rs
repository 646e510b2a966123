//! Structured command logging. Every command handler emits a CMD_START line
//! and exactly one CMD_SUCCESS or CMD_ERROR line.

use tracing::{error, info};

pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64) {
    info!(
        "CMD_START: {} by {}({}) in chat {}",
        command, user, user_id, chat_id
    );
}

pub fn log_command_success(command: &str, user: &str, user_id: i64, chat_id: i64) {
    info!(
        "CMD_SUCCESS: {} by {}({}) in chat {}",
        command, user, user_id, chat_id
    );
}

pub fn log_command_error(command: &str, user: &str, user_id: i64, chat_id: i64, error: &str) {
    error!(
        "CMD_ERROR: {} by {}({}) in chat {} - {}",
        command, user, user_id, chat_id, error
    );
}
