use anyhow::{Context, Result};
use chat_relay_core::ChatMessage;
use chat_relay_transport::{
    ClientMessage, ServerMessage,
    line::{read_frame, write_frame},
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    select,
};
use tracing::{info, warn};

use crate::cli::ClientArgs;

pub async fn run(args: ClientArgs) -> Result<()> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!("connected to {}", args.server);

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    select! {
        res = chat(&mut reader, &mut writer, &mut stdin, &mut stdout) => res,
        ctrl_c = tokio::signal::ctrl_c() => {
            if let Err(error) = ctrl_c {
                warn!(?error, "ctrl-c handler failed");
            }
            Ok(())
        }
    }
}

/// Forward input lines to the relay and print relayed messages.
///
/// On end of input (or `/quit`) the write half is shut down and relayed
/// messages keep printing until the relay closes the connection.
async fn chat<R, W, I, O>(server: &mut R, writer: &mut W, input: &mut I, output: &mut O) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let forward = async {
        forward_lines(input, writer).await?;
        if let Err(error) = writer.shutdown().await {
            warn!(?error, "failed to shutdown client writer cleanly");
        }
        std::future::pending::<Result<()>>().await
    };

    select! {
        res = print_frames(server, output) => res,
        res = forward => res,
    }
}

async fn forward_lines<I, W>(input: &mut I, writer: &mut W) -> Result<()>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = input.read_line(&mut line).await?;
        if !forward_line(bytes_read, &line, writer).await? {
            return Ok(());
        }
    }
}

async fn forward_line<W>(bytes_read: usize, line: &str, writer: &mut W) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    if bytes_read == 0 {
        return Ok(false);
    }

    let text = line.trim_end_matches(['\n', '\r']);
    if text.eq_ignore_ascii_case("/quit") {
        return Ok(false);
    }
    if text.is_empty() {
        return Ok(true);
    }

    write_frame(writer, &ClientMessage::chat(text)).await?;
    Ok(true)
}

async fn print_frames<R, O>(server: &mut R, output: &mut O) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    while let Some(frame) = read_frame::<_, ServerMessage>(server).await? {
        let msg = ChatMessage::from(frame);
        output.write_all(format!("> {msg}\n").as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}
