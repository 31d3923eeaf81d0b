use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use clanfall_engine::{AttackSink, ChangeRecord, ClanFeed};
use serde::Serialize;
use tracing::{info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const IDLE_POLL_DELAY: Duration = Duration::from_millis(10);

/// Receiving half of the remote store subscription. Each received line is one
/// change batch; `poll_batches` drains them without blocking the caller.
pub struct BatchFeed {
    batch_rx: Receiver<Vec<ChangeRecord>>,
}

impl ClanFeed for BatchFeed {
    fn poll_batches(&mut self, out: &mut Vec<Vec<ChangeRecord>>) {
        loop {
            match self.batch_rx.try_recv() {
                Ok(batch) => out.push(batch),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// Sending half: attack commands are queued to the client thread, which
/// serializes and writes them. Dropping this commander shuts the thread down.
pub struct AttackCommander {
    attack_tx: Sender<String>,
}

impl AttackSink for AttackCommander {
    fn send_attack(&mut self, target_clan_id: &str) {
        if self.attack_tx.send(target_clan_id.to_string()).is_err() {
            warn!("remote_store_client_gone");
        }
    }
}

/// Spawns the background client that owns the remote store connection.
///
/// The thread reconnects with a fixed delay on any connection loss, so a
/// restarted store resumes feeding batches without the loop noticing beyond
/// a gap in deliveries.
pub fn spawn_remote_store(addr: String, user_id: String) -> (BatchFeed, AttackCommander) {
    let (batch_tx, batch_rx) = mpsc::channel::<Vec<ChangeRecord>>();
    let (attack_tx, attack_rx) = mpsc::channel::<String>();

    let spawned = thread::Builder::new()
        .name("remote-store".to_string())
        .spawn(move || client_main(addr, user_id, batch_tx, attack_rx));
    if spawned.is_err() {
        warn!("remote_store_spawn_failed");
    }

    (BatchFeed { batch_rx }, AttackCommander { attack_tx })
}

fn client_main(
    addr: String,
    user_id: String,
    batch_tx: Sender<Vec<ChangeRecord>>,
    attack_rx: Receiver<String>,
) {
    loop {
        let stream = match TcpStream::connect(&addr) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(addr = %addr, error = %err, "remote_store_connect_failed");
                thread::sleep(RECONNECT_DELAY);
                if commander_gone(&attack_rx) {
                    return;
                }
                continue;
            }
        };
        if let Err(err) = stream.set_nonblocking(true) {
            warn!(error = %err, "remote_store_nonblocking_failed");
            thread::sleep(RECONNECT_DELAY);
            continue;
        }
        if let Err(err) = stream.set_nodelay(true) {
            warn!(error = %err, "remote_store_nodelay_failed");
        }
        info!(addr = %addr, "remote_store_connected");

        if !run_session(stream, &user_id, &batch_tx, &attack_rx) {
            return;
        }
        thread::sleep(RECONNECT_DELAY);
        if commander_gone(&attack_rx) {
            return;
        }
    }
}

/// One connection's lifetime. Returns true to reconnect, false to shut the
/// client down (the loop side has dropped its channel ends).
fn run_session(
    mut stream: TcpStream,
    user_id: &str,
    batch_tx: &Sender<Vec<ChangeRecord>>,
    attack_rx: &Receiver<String>,
) -> bool {
    let mut read_buf = Vec::new();
    let mut out_buf: Vec<u8> = Vec::new();
    let mut lines = Vec::new();

    loop {
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    warn!("remote_store_closed_connection");
                    return true;
                }
                Ok(bytes_read) => {
                    read_buf.extend_from_slice(&chunk[..bytes_read]);
                    drain_complete_lines(&mut read_buf, &mut lines);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "remote_store_read_failed");
                    return true;
                }
            }
        }

        for line in lines.drain(..) {
            match decode_batch_line(&line) {
                Ok(batch) => {
                    if batch_tx.send(batch).is_err() {
                        return false;
                    }
                }
                Err(err) => {
                    warn!(path = %err.path(), error = %err, "feed_line_rejected");
                }
            }
        }

        loop {
            match attack_rx.try_recv() {
                Ok(target_clan_id) => {
                    out_buf.extend_from_slice(&encode_attack_line(user_id, &target_clan_id));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        while !out_buf.is_empty() {
            match stream.write(&out_buf) {
                Ok(0) => {
                    warn!("remote_store_write_zero");
                    return true;
                }
                Ok(bytes_written) => {
                    out_buf.drain(..bytes_written);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "remote_store_write_failed");
                    return true;
                }
            }
        }

        thread::sleep(IDLE_POLL_DELAY);
    }
}

fn commander_gone(attack_rx: &Receiver<String>) -> bool {
    matches!(attack_rx.try_recv(), Err(TryRecvError::Disconnected))
}

fn drain_complete_lines(buffer: &mut Vec<u8>, out: &mut Vec<String>) {
    while let Some(newline_index) = buffer.iter().position(|byte| *byte == b'\n') {
        let mut line_bytes = buffer.drain(..=newline_index).collect::<Vec<u8>>();
        line_bytes.pop(); // newline
        if line_bytes.last().copied() == Some(b'\r') {
            line_bytes.pop();
        }

        match String::from_utf8(line_bytes) {
            Ok(line) => {
                if !line.is_empty() {
                    out.push(line);
                }
            }
            Err(err) => warn!(error = %err, "feed_invalid_utf8_line_dropped"),
        }
    }
}

fn decode_batch_line(
    line: &str,
) -> Result<Vec<ChangeRecord>, serde_path_to_error::Error<serde_json::Error>> {
    let mut deserializer = serde_json::Deserializer::from_str(line);
    serde_path_to_error::deserialize(&mut deserializer)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttackCommand<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    user_id: &'a str,
    target_clan_id: &'a str,
}

fn encode_attack_line(user_id: &str, target_clan_id: &str) -> Vec<u8> {
    let command = AttackCommand {
        kind: "attack",
        user_id,
        target_clan_id,
    };
    match serde_json::to_vec(&command) {
        Ok(mut payload) => {
            payload.push(b'\n');
            payload
        }
        Err(err) => {
            warn!(error = %err, "attack_command_encode_failed");
            Vec::new()
        }
    }
}
