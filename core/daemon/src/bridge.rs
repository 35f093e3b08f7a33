//! Stdio host bridge: newline-delimited JSON in, newline-delimited JSON out.

use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use tabkeeper_core::{load_settings, Engine};
use tabkeeper_daemon_protocol::{parse_host_message, HostCommand, HostMessage};

/// Reads `input` line by line on its own thread, forwarding every valid
/// message. The channel closes when `input` hits EOF or fails.
pub fn spawn_reader<R>(input: R, tx: Sender<HostMessage>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.split(b'\n') {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "Failed to read host input");
                    break;
                }
            };
            let Some(message) = decode_line(&line) else {
                continue;
            };
            if tx.send(message).is_err() {
                break;
            }
        }
        debug!("Host input reader finished");
    })
}

/// Blank lines are skipped silently; malformed ones are logged and skipped.
pub fn decode_line(line: &[u8]) -> Option<HostMessage> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }
    match parse_host_message(line) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Skipping malformed host message");
            None
        }
    }
}

pub fn write_commands<W: Write>(out: &mut W, commands: &[HostCommand]) -> io::Result<()> {
    if commands.is_empty() {
        return Ok(());
    }
    for command in commands {
        serde_json::to_writer(&mut *out, command)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Re-reads `settings_path` and swaps the result into `engine`. A failed
/// read keeps the current settings.
pub fn reload_settings(engine: &mut Engine, settings_path: Option<&Path>) {
    let Some(path) = settings_path else {
        warn!("No settings file to reload");
        return;
    };
    match load_settings(Some(path.to_path_buf())) {
        Ok(settings) => {
            engine.set_settings(settings);
            let settings = engine.settings();
            info!(
                path = %path.display(),
                on_open = ?settings.on_open,
                open_in_order = settings.open_in_order,
                on_close = ?settings.on_close,
                focus_on_open = ?settings.focus_on_open,
                "Settings reloaded"
            );
        }
        Err(err) => {
            warn!(
                error = %err,
                path = %path.display(),
                "Failed to reload settings; keeping current"
            );
        }
    }
}

fn dispatch(
    engine: &mut Engine,
    message: HostMessage,
    settings_path: Option<&Path>,
) -> Vec<HostCommand> {
    if message == HostMessage::ReloadSettings {
        reload_settings(engine, settings_path);
        return Vec::new();
    }
    engine.handle_message(message, Utc::now())
}

/// Drives `engine` until the inbound channel closes.
///
/// Messages arriving during `startup_delay` are handed to the engine before
/// it starts, so relay and command messages take effect while host events
/// are dropped. A `reload_settings` message re-reads `settings_path` at any
/// point.
pub fn run<W: Write>(
    engine: &mut Engine,
    inbound: &Receiver<HostMessage>,
    out: &mut W,
    startup_delay: Duration,
    settings_path: Option<&Path>,
) -> io::Result<()> {
    let deadline = Instant::now() + startup_delay;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match inbound.recv_timeout(remaining) {
            Ok(message) => {
                let commands = dispatch(engine, message, settings_path);
                write_commands(out, &commands)?;
            }
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Host input closed before startup");
                return Ok(());
            }
        }
    }

    write_commands(out, &engine.start())?;

    for message in inbound.iter() {
        let commands = dispatch(engine, message, settings_path);
        write_commands(out, &commands)?;
    }

    info!(
        pending_requests = engine.pending_requests(),
        "Host input closed; shutting down"
    );
    Ok(())
}
