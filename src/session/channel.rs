use crate::error::VoiceError;

/// Relay room name for channel `n`
pub fn channel_name(n: u32) -> String {
    format!("channel-{}", n)
}

/// Check `n` against the configured channel range (1..=count)
pub fn validate_channel(n: u32, count: u32) -> Result<u32, VoiceError> {
    if n == 0 || n > count {
        return Err(VoiceError::InvalidChannel(n));
    }
    Ok(n)
}
