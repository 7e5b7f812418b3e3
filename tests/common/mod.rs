//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use wordgate::codec::{Codec, JsonCodec};
use wordgate::config::Config;
use wordgate::dispatch::encode_package;
use wordgate::guard::RateGuard;
use wordgate::protocol::{Message, Package};
use wordgate::quotes::StaticQuotes;
use wordgate::{Server, Shutdown};

/// A running server on an ephemeral port plus the handles to stop it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub handle: JoinHandle<Result<(), wordgate::Error>>,
}

/// Start a server with the given tuning on an ephemeral port.
pub async fn start_server(cfg: Config) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let guard = Arc::new(RateGuard::new(cfg.pow.guard_window()));
    tokio::spawn(Arc::clone(&guard).run(shutdown.subscribe()));

    let server = Server::new(&cfg, guard, Arc::new(StaticQuotes::default()));

    let handle = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move { server.run(listener, &shutdown).await }
    });

    // Give the accept loop a beat to come up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Quick config for tests: short timeouts, easy puzzles.
pub fn test_config(max_difficulty: u32, factor: f64) -> Config {
    let mut cfg = Config::default();
    cfg.net.timeout_ms = 2_000;
    cfg.pow.max_difficulty = max_difficulty;
    cfg.pow.rate_difficulty_factor = factor;
    cfg
}

/// Send one framed message over a raw stream.
pub async fn send_message<T: Message + serde::Serialize>(stream: &mut TcpStream, msg: &T) {
    let frame = encode_package(msg, &JsonCodec).unwrap();
    stream.write_all(&frame).await.unwrap();
}

/// Read one package off a raw stream.
pub async fn read_package(stream: &mut TcpStream) -> Package {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(n > 0, "server closed the connection");

    JsonCodec.get_raw(&buf[..n]).unwrap()
}

/// Read one package and decode it as `T`, asserting the tag matches.
pub async fn read_message<T>(stream: &mut TcpStream) -> T
where
    T: Message + serde::de::DeserializeOwned,
{
    let pkg = read_package(stream).await;
    assert_eq!(pkg.tag, T::TAG, "unexpected response tag");

    JsonCodec.unmarshal(pkg.payload.get().as_bytes()).unwrap()
}
