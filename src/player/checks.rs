use crate::{
    common::errors::OperationResult,
    protocol::{command::CommandIntent, messages},
};

/// The issuing member must be in a voice channel.
pub fn require_voice_presence(intent: &CommandIntent) -> Result<(), OperationResult> {
    if intent.member.voice_channel.is_some() {
        Ok(())
    } else {
        Err(OperationResult::failure(messages::NOT_IN_VOICE))
    }
}

/// The issuing member must hold voice operator privileges.
pub fn require_voice_operator(intent: &CommandIntent) -> Result<(), OperationResult> {
    if intent.member.is_operator {
        Ok(())
    } else {
        Err(OperationResult::failure(messages::NOT_OPERATOR))
    }
}

/// Every precondition `intent.command` is subject to.
pub fn check(intent: &CommandIntent) -> Result<(), OperationResult> {
    require_voice_presence(intent)?;
    if intent.command.requires_operator() {
        require_voice_operator(intent)?;
    }
    Ok(())
}
