mod config;

use anyhow::Result;
use config::ClientConfig;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = ClientConfig::load();
    let addr = cfg.addr();

    let stream = TcpStream::connect(&addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::ConnectionRefused {
            anyhow::anyhow!("no task server running at {addr}")
        } else {
            anyhow::anyhow!("failed to connect to {addr}: {e}")
        }
    })?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = write_half;

    // Welcome banner arrives unprompted.
    if !print_block(&mut reader).await? {
        return Ok(());
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        if !print_block(&mut reader).await? {
            eprintln!("server closed the connection");
            break;
        }
    }

    Ok(())
}

/// Print one reply block. Returns false once the server has closed the
/// connection; the blank terminator line is consumed, not printed.
async fn print_block(reader: &mut BufReader<OwnedReadHalf>) -> Result<bool> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(false);
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return Ok(true);
        }
        println!("{line}");
    }
}
