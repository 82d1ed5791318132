//! Terminal yes/no prompt

use async_trait::async_trait;
use peerwatch_core::ConfirmPrompt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// counts as "no".
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl ConfirmPrompt for StdinPrompt {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        let mut stderr = tokio::io::stderr();
        let question = format!("\n{title}\n{message} [y/N] ");
        if stderr.write_all(question.as_bytes()).await.is_err() {
            return false;
        }
        let _ = stderr.flush().await;

        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                tracing::warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }
}
