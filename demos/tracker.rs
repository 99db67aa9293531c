//! Tracker demo - storage node registration and file upload.
//!
//! This demo shows:
//! - A tracker server answering CONNECT requests with RESPONSE
//! - A storage node registering itself and uploading a file body
//! - Streaming a body without buffering it on either side
//!
//! # Running
//!
//! ```text
//! RUST_LOG=tracker_bridge=debug cargo run --example tracker
//! ```

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tracker_bridge::handler::{CopyBody, DiscardBody, ReaderBody};
use tracker_bridge::{connect, Bridge, BridgeConfig, Envelope, Operation, Server, ServerConfig};

/// Metadata sent by a storage node.
#[derive(Serialize, Deserialize, Debug)]
struct ConnectMeta {
    uuid: String,
    group: String,
    file_name: String,
}

/// Metadata returned by the tracker.
#[derive(Serialize, Deserialize, Debug)]
struct ConnectReply {
    status: u8,
    received: u64,
}

async fn tracker(mut bridge: Bridge<TcpStream>) -> tracker_bridge::Result<()> {
    loop {
        let mut sink = CopyBody::new(tokio::io::sink());
        let (request, received) = bridge.receive_request(&mut sink).await?;
        let meta: ConnectMeta = request.decode_meta()?;
        info!(
            "{} from {} in {}: {} ({} bytes)",
            request.operation(),
            meta.uuid,
            meta.group,
            meta.file_name,
            received
        );

        let reply = ConnectReply {
            status: 0,
            received,
        };
        let response = Envelope::build(Operation::RESPONSE, &reply, 0)?;
        bridge.send_response(&response, tracker_bridge::handler::NoBody).await?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tracker=info".parse()?))
        .init();

    let server = Server::bind(&ServerConfig::new(0).host("127.0.0.1")).await?;
    let addr = server.local_addr()?;
    info!("tracker listening on {}", addr);
    tokio::spawn(server.serve(tracker));

    let mut storage = connect(addr, &BridgeConfig::default()).await?;
    for n in 0..3u64 {
        let size = (n + 1) * 4 * 1024 * 1024;
        let meta = ConnectMeta {
            uuid: "storage-01".to_string(),
            group: "G01".to_string(),
            file_name: format!("chunk-{}.bin", n),
        };
        let request = Envelope::build(Operation::CONNECT, &meta, size)?;
        let body = ReaderBody::new(tokio::io::AsyncReadExt::take(tokio::io::repeat(0x5a), size), size);

        let response = storage.call(&request, body, DiscardBody).await?;
        let reply: ConnectReply = response.decode_meta()?;
        info!("tracker replied: status {} after {} bytes", reply.status, reply.received);
    }

    storage.close().await;
    Ok(())
}
