//! Test helpers for room integration tests.
//!
//! Provides a served room and TestClient, a joined member whose screen is one
//! end of an in-memory pipe.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use roomcast::config::RoomConfig;
use roomcast::{Identity, Room, UserConfig};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a room and spawn its serve loop.
pub fn start_room(config: RoomConfig) -> (Room, JoinHandle<roomcast::Result<()>>) {
    let room = Room::new(config);
    let server = room.clone();
    let handle = tokio::spawn(async move { server.serve().await });
    (room, handle)
}

/// A joined member reading its screen output.
pub struct TestClient {
    pub name: String,
    reader: BufReader<DuplexStream>,
}

impl TestClient {
    /// Join `room` as `name` with default settings.
    pub async fn join(room: &Room, name: &str) -> Self {
        Self::join_with_config(room, name, UserConfig::default()).await
    }

    /// Join `room` as `name` with the given settings.
    pub async fn join_with_config(room: &Room, name: &str, config: UserConfig) -> Self {
        let (screen, reader) = tokio::io::duplex(64 * 1024);
        let identity = Identity::new(name).unwrap();
        let member = room
            .join_with_config(identity, config, screen)
            .await
            .unwrap();
        tokio::spawn(member.deliver());
        Self {
            name: name.to_string(),
            reader: BufReader::new(reader),
        }
    }

    /// Read one line, terminator included.
    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        timeout(DEFAULT_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line
    }

    /// Assert the next line.
    pub async fn expect(&mut self, expected: &str) {
        assert_eq!(self.read_line().await, expected, "output for {}", self.name);
    }

    /// Assert the screen has been closed.
    pub async fn expect_closed(&mut self) {
        let line = self.read_line().await;
        assert!(line.is_empty(), "expected EOF for {}, got {line:?}", self.name);
    }
}
