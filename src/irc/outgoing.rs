//! Outgoing Message Pacing
//!
//! Long replies are wrapped into several lines and every line is followed by
//! a pause so the network's flood protection never kicks the bot.

use crate::config::FloodConfig;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unusually large message ({chunks} chunks): {message}")]
pub struct MessageTooLarge {
    pub chunks: usize,
    pub message: String,
}

/// Line splitting and delays for one connection
#[derive(Debug, Clone)]
pub struct FloodControl {
    pub max_line_len: usize,
    pub max_chunks: usize,
    /// Pause between the pieces of one wrapped message
    pub continuation: Duration,
    /// Pause after every message
    pub anti_flood: Duration,
}

impl FloodControl {
    /// Split `message` into sendable chunks. CR and LF never survive into a
    /// chunk; each would end the protocol line early.
    pub fn chunks(&self, message: &str) -> Result<Vec<String>, MessageTooLarge> {
        let message = message.replace(['\r', '\n'], " ");
        if message.trim().is_empty() {
            return Ok(Vec::new());
        }
        if message.chars().count() <= self.max_line_len {
            return Ok(vec![message]);
        }

        let options = textwrap::Options::new(self.max_line_len)
            .word_separator(textwrap::WordSeparator::AsciiSpace)
            .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
        let chunks: Vec<String> = textwrap::wrap(&message, options)
            .into_iter()
            .map(|line| line.into_owned())
            .collect();
        if chunks.len() > self.max_chunks {
            return Err(MessageTooLarge {
                chunks: chunks.len(),
                message,
            });
        }
        Ok(chunks)
    }

    /// Wait the given delay, skipping zero-length pauses
    pub async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl From<&FloodConfig> for FloodControl {
    fn from(config: &FloodConfig) -> Self {
        Self {
            max_line_len: config.max_line_len,
            max_chunks: config.max_chunks,
            continuation: Duration::from_millis(config.continuation_ms),
            anti_flood: Duration::from_millis(config.anti_flood_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn control(max_line_len: usize, max_chunks: usize) -> FloodControl {
        FloodControl {
            max_line_len,
            max_chunks,
            continuation: Duration::ZERO,
            anti_flood: Duration::ZERO,
        }
    }

    #[test]
    fn test_short_message_is_untouched() {
        let chunks = control(400, 10).chunks("        openstack/nova").unwrap();
        assert_eq!(chunks, vec!["        openstack/nova"]);
    }

    #[test]
    fn test_blank_message_sends_nothing() {
        assert!(control(400, 10).chunks("   ").unwrap().is_empty());
    }

    #[test]
    fn test_long_message_wraps_on_words() {
        let chunks = control(10, 10).chunks("alpha beta gamma delta").unwrap();
        assert_eq!(chunks, vec!["alpha beta", "gamma", "delta"]);
        assert!(chunks.iter().all(|c| c.len() <= 10));
    }

    #[test]
    fn test_wrapping_fills_lines_greedily() {
        let chunks = control(12, 10).chunks("aa bb cc dd ee ff gg").unwrap();
        assert_eq!(chunks, vec!["aa bb cc dd", "ee ff gg"]);
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        let chunks = control(400, 10).chunks("Jane\nQUIT :bye\r\nJOIN #evil").unwrap();
        assert_eq!(chunks, vec!["Jane QUIT :bye  JOIN #evil"]);

        let chunks = control(10, 10).chunks("alpha\nbeta gamma\rdelta").unwrap();
        assert_eq!(chunks, vec!["alpha beta", "gamma", "delta"]);
        assert!(control(10, 10).chunks("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_oversized_message_is_refused() {
        let err = control(5, 2).chunks("one two three four").unwrap_err();
        assert_eq!(err.chunks, 4);
    }

    #[test]
    fn test_from_config() {
        let control = FloodControl::from(&FloodConfig::default());
        assert_eq!(control.max_line_len, 400);
        assert_eq!(control.max_chunks, 10);
        assert_eq!(control.continuation, Duration::from_millis(500));
        assert_eq!(control.anti_flood, Duration::from_secs(2));
    }
}
