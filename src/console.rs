//! Console Transport
//!
//! Reads one command per line and prints the replies, as if the lines had
//! been posted in `channel`. Handy for trying queries without a network.

use crate::commands::CommandDispatcher;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

pub async fn run<R, W>(
    dispatcher: &CommandDispatcher,
    channel: &str,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Console mode, answering as {}", channel);
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        for reply in dispatcher.handle_line(channel, &line).await {
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;
    }
    Ok(())
}

/// Console over the process's stdin and stdout
pub async fn run_stdio(dispatcher: &CommandDispatcher, channel: &str) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run(dispatcher, channel, stdin, tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::sample_state;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_console_prints_replies() {
        let (state, _) = sample_state();
        let dispatcher = CommandDispatcher::new(state);
        let input: &[u8] = b"?whois openstack/swift\nnot a command\n?channel openstack/nova\n";
        let mut output = Vec::new();

        run(&dispatcher, "#dev", input, &mut output).await.unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "openstack/swift is owned by storage\n\
             Compute uses IRC channel #openstack-nova\n"
        );
    }

    #[tokio::test]
    async fn test_console_release_channel_shows_liaison() {
        let (state, liaisons) = sample_state();
        let dispatcher = CommandDispatcher::new(state);
        let input: &[u8] = b"?ptl compute\n";
        let mut output = Vec::new();

        run(&dispatcher, "#openstack-release", input, &mut output)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Compute PTL: Jane Doe (jdoe)\nCompute Liaison: Alex Smith (asmith)\n"
        );
        assert_eq!(liaisons.calls(), 1);
    }
}
