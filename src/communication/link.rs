use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::peripherals::RemoteLink;

/// Remote link fed by a task through an unbounded channel. Replies go to
/// stdout prefixed with `[remote]`.
pub struct ChannelLink {
    rx: UnboundedReceiver<u8>,
    echo: bool,
}

impl ChannelLink {
    pub fn new(rx: UnboundedReceiver<u8>) -> Self {
        Self { rx, echo: true }
    }

    /// Same link without console replies.
    pub fn quiet(rx: UnboundedReceiver<u8>) -> Self {
        Self { rx, echo: false }
    }
}

impl RemoteLink for ChannelLink {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }

    fn write_line(&mut self, text: &str) {
        if self.echo {
            println!("[remote] {}", text);
        }
    }
}

pub fn channel_link() -> (UnboundedSender<u8>, ChannelLink) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChannelLink::new(rx))
}

/// Forwards every byte read from `input` until it closes or the link is
/// dropped. Line endings are passed through; the command decoder skips them.
pub async fn forward_bytes<R>(input: R, tx: UnboundedSender<u8>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        for byte in line.bytes().chain(std::iter::once(b'\n')) {
            if tx.send(byte).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}
