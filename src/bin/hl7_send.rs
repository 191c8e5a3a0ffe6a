//! Test sender: frames an HL7 message with MLLP, sends it over TCP, and
//! prints the unwrapped acknowledgment.

use std::{io, time::Duration};

use clap::Parser;
use hl7_listener::mllp::{CARRIAGE_RETURN, END_BLOCK, START_BLOCK};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

/// Command line arguments for the `hl7-send` test sender.
#[derive(Debug, Parser)]
#[command(name = "hl7-send", version, about = "Send a framed HL7 message and print the ACK")]
struct Cli {
    /// Listener host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listener port.
    #[arg(short, long, default_value_t = 4040)]
    port: u16,

    /// Message text to send; a sample ADT^A01 is used when omitted.
    #[arg(long)]
    message: Option<String>,

    /// Seconds to wait for the acknowledgment.
    #[arg(long, default_value_t = 5)]
    wait: u64,
}

fn sample_message() -> String {
    format!(
        "MSH|^~\\&|SendingApp|SendingFac|ReceivingApp|ReceivingFac|{}||ADT^A01|MSG00001|P|2.5\r\
         PID|1||123456^^^Hospital^MR||Doe^John||19800101|M|||123 Street^^Town^CT^12345||555-5555|\r",
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    )
}

async fn read_ack(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut ack = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(ack);
        }
        ack.extend_from_slice(&buf[..n]);
        if ack.windows(2).any(|w| w == [END_BLOCK, CARRIAGE_RETURN]) {
            return Ok(ack);
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let text = cli.message.unwrap_or_else(sample_message);

    let mut framed = Vec::with_capacity(text.len() + 3);
    framed.push(START_BLOCK);
    framed.extend_from_slice(text.as_bytes());
    framed.push(END_BLOCK);
    framed.push(CARRIAGE_RETURN);

    println!("Connecting to {}:{}...", cli.host, cli.port);
    let mut stream = TcpStream::connect((cli.host.as_str(), cli.port)).await?;
    println!("Connected! Sending HL7 message...");
    stream.write_all(&framed).await?;

    match timeout(Duration::from_secs(cli.wait), read_ack(&mut stream)).await {
        Ok(ack) => {
            let ack = ack?;
            if ack.is_empty() {
                println!("No ACK received.");
            } else {
                let text = String::from_utf8_lossy(&ack);
                let text = text.trim_matches(|c| matches!(c, '\x0b' | '\x1c' | '\r'));
                println!("\nReceived ACK:\n-----------------\n\n{text}");
            }
        }
        Err(_) => println!("Timed out waiting for ACK"),
    }
    Ok(())
}
