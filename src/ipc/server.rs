use anyhow::Result;
use log::{error, info, warn};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{self, BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    sync::{
        Arc, Mutex,
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread,
    time::Duration,
};

use super::pipeline::{FrameLine, prediction_json, spawn_stdin_pump};
use super::runtime::socket_path;
use crate::config::ConfigState;
use crate::recorder::SignRecorder;

pub enum SessionEvent {
    Frame(FrameLine),
    InputClosed,
    Record,
    Reload,
    Shutdown,
}

/// What `status` reports; refreshed by the session loop after every event.
#[derive(Debug, Clone, Default)]
struct StatusSnapshot {
    name: String,
    config: String,
    library: String,
    library_size: usize,
    seq_len: usize,
    frames: u64,
    is_recording: bool,
    label: String,
}

/// Session state owned by the event loop.
struct Session {
    cfg: ConfigState,
    recorder: SignRecorder,
    frames: u64,
    label: String,
}

impl Session {
    fn new(cfg: ConfigState, recorder: SignRecorder) -> Self {
        Self {
            cfg,
            recorder,
            frames: 0,
            label: String::new(),
        }
    }

    /// Apply one event. `Ok(false)` ends the session.
    fn handle<W: Write>(&mut self, evt: SessionEvent, out: &mut W) -> Result<bool> {
        match evt {
            SessionEvent::Frame(frame) => {
                if frame.record {
                    self.recorder.start_recording();
                }
                // malformed landmarks end the session
                let p = self.recorder.process(&frame.detection)?;
                writeln!(out, "{}", prediction_json(self.frames, &p))?;
                out.flush()?;
                self.frames += 1;
                self.label = p.label;
            }
            SessionEvent::Record => {
                self.recorder.start_recording();
                self.label.clear();
            }
            SessionEvent::Reload => match reload(&mut self.cfg) {
                Ok(r) => {
                    self.recorder = r;
                    self.label.clear();
                    info!("config and library reloaded");
                }
                Err(e) => error!("reload failed, keeping previous state: {e:#}"),
            },
            SessionEvent::InputClosed => {
                info!("input closed after {} frames", self.frames);
                return Ok(false);
            }
            SessionEvent::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            name: self.cfg.name(),
            config: self.cfg.config_path.display().to_string(),
            library: self.cfg.library_path().display().to_string(),
            library_size: self.recorder.library().len(),
            seq_len: self.recorder.settings().seq_len,
            frames: self.frames,
            is_recording: self.recorder.is_recording(),
            label: self.label.clone(),
        }
    }
}

pub fn run_session(cfg: ConfigState) -> Result<()> {
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    listener.set_nonblocking(true)?;
    info!("session: listening on {}", sock.display());

    let result = session_loop(cfg, &listener);

    let _ = std::fs::remove_file(&sock);
    info!("session: stopped");
    result
}

fn session_loop(cfg: ConfigState, listener: &UnixListener) -> Result<()> {
    let recorder = SignRecorder::new(cfg.load_library()?, cfg.settings.recorder_settings());
    let mut session = Session::new(cfg, recorder);
    let status = Arc::new(Mutex::new(session.snapshot()));

    let (tx, rx) = mpsc::channel::<SessionEvent>();
    spawn_signal_watcher(tx.clone())?;
    let _pump = spawn_stdin_pump(tx.clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                let tx = tx.clone();
                let status = status.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &status, tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => warn!("accept failed: {e}"),
        }

        let evt = match rx.recv_timeout(Duration::from_millis(5)) {
            Ok(evt) => evt,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        if !session.handle(evt, &mut out)? {
            return Ok(());
        }
        if let Ok(mut s) = status.lock() {
            *s = session.snapshot();
        }
    }
}

fn reload(cfg: &mut ConfigState) -> Result<SignRecorder> {
    let mut next = cfg.clone();
    next.reload()?;
    let lib = next.load_library()?;
    let recorder = SignRecorder::new(lib, next.settings.recorder_settings());
    *cfg = next;
    Ok(recorder)
}

fn spawn_signal_watcher(tx: Sender<SessionEvent>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("session: caught signal {sig}");
            let _ = tx.send(SessionEvent::Shutdown);
        }
    });
    Ok(())
}

/// Queue `evt` for the session loop and acknowledge with `data`.
fn forward(tx: &Sender<SessionEvent>, evt: SessionEvent, data: &str) -> serde_json::Value {
    match tx.send(evt) {
        Ok(()) => serde_json::json!({"ok": true, "data": data}),
        Err(_) => serde_json::json!({"ok": false, "error": "session stopped"}),
    }
}

fn handle_client(mut stream: UnixStream, status: &Mutex<StatusSnapshot>, tx: Sender<SessionEvent>) -> Result<()> {
    // the listener is non-blocking; the accepted stream must not be
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: serde_json::Value = serde_json::from_str(&line)?;
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");

    let resp = match op {
        "status" => {
            let s = status.lock().map(|s| s.clone()).unwrap_or_default();
            serde_json::json!({"ok": true, "data": {
                "name": s.name,
                "config": s.config,
                "library": s.library,
                "library_size": s.library_size,
                "seq_len": s.seq_len,
                "frames": s.frames,
                "is_recording": s.is_recording,
                "label": s.label,
            }})
        }
        "record" => forward(&tx, SessionEvent::Record, "recording"),
        "reload" => forward(&tx, SessionEvent::Reload, "reload requested"),
        "shutdown" => forward(&tx, SessionEvent::Shutdown, "shutting down"),
        _ => serde_json::json!({"ok": false, "error": format!("unknown op: {op}")}),
    };

    writeln!(stream, "{resp}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hand::sample_hand;
    use crate::landmarks::detection_from_raw;
    use crate::library::ReferenceLibrary;
    use crate::library::fixtures::{entry, right_hand_sign};
    use crate::recorder::RecorderSettings;
    use std::{fs, path::PathBuf, sync::mpsc::TryRecvError};

    const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

    fn ask(req: &str, status: &Mutex<StatusSnapshot>, tx: Sender<SessionEvent>) -> serde_json::Value {
        let (mut client, server) = UnixStream::pair().unwrap();
        writeln!(client, "{req}").unwrap();
        handle_client(server, status, tx).unwrap();
        let mut resp = String::new();
        BufReader::new(client).read_line(&mut resp).unwrap();
        serde_json::from_str(&resp).unwrap()
    }

    fn session() -> Session {
        let cfg = ConfigState {
            config_path: PathBuf::from("/etc/signctl/config.toml"),
            settings: Settings::from_toml_str(DEFAULT_CONFIG).unwrap(),
            library_override: None,
        };
        let lib = ReferenceLibrary::new(vec![
            entry("wave", "wave-1", right_hand_sign(&[sample_hand(0.3)])),
            entry("wave", "wave-2", right_hand_sign(&[sample_hand(0.31)])),
            entry("wave", "wave-3", right_hand_sign(&[sample_hand(0.32)])),
        ]);
        let settings = RecorderSettings {
            seq_len: 1,
            ..RecorderSettings::default()
        };
        Session::new(cfg, SignRecorder::new(lib, settings))
    }

    #[test]
    fn record_op_reaches_session() {
        let status = Mutex::new(StatusSnapshot::default());
        let (tx, rx) = mpsc::channel();

        let resp = ask(r#"{"op":"record"}"#, &status, tx.clone());
        assert_eq!(resp["ok"], true);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Record)));

        let resp = ask(r#"{"op":"dance"}"#, &status, tx);
        assert_eq!(resp["ok"], false);
        assert!(resp["error"].as_str().unwrap().contains("dance"));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn ops_fail_once_session_is_gone() {
        let status = Mutex::new(StatusSnapshot::default());
        for op in ["record", "reload", "shutdown"] {
            let (tx, rx) = mpsc::channel();
            drop(rx);
            let resp = ask(&format!(r#"{{"op":"{op}"}}"#), &status, tx);
            assert_eq!(resp["ok"], false, "{op}");
            assert_eq!(resp["error"], "session stopped", "{op}");
        }
    }

    #[test]
    fn status_reports_latest_snapshot() {
        let s = session();
        let status = Mutex::new(s.snapshot());
        let (tx, _rx) = mpsc::channel();
        let resp = ask(r#"{"op":"status"}"#, &status, tx);
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["data"]["name"], "default");
        assert_eq!(resp["data"]["library_size"], 3);
        assert_eq!(resp["data"]["seq_len"], 1);
        assert_eq!(resp["data"]["is_recording"], false);
    }

    #[test]
    fn record_clears_previous_label() {
        let mut s = session();
        let mut out = Vec::new();
        let frame = FrameLine {
            record: true,
            detection: detection_from_raw(None, Some(&sample_hand(0.3))),
        };
        assert!(s.handle(SessionEvent::Frame(frame), &mut out).unwrap());
        assert_eq!(s.snapshot().label, "Wave");
        assert_eq!(s.snapshot().frames, 1);

        assert!(s.handle(SessionEvent::Record, &mut out).unwrap());
        let snap = s.snapshot();
        assert_eq!(snap.label, "");
        assert!(snap.is_recording);

        assert!(!s.handle(SessionEvent::Shutdown, &mut out).unwrap());
        let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn failed_reload_keeps_previous_config() {
        let dir = crate::testutil::scratch_dir("reload");
        let path = dir.join("config.toml");
        fs::write(&path, DEFAULT_CONFIG).unwrap();
        let missing = dir.join("missing.json");
        let mut cfg = ConfigState::load(Some(path.clone()), Some(missing.clone())).unwrap();

        fs::write(&path, DEFAULT_CONFIG.replace("seq_len = 30", "seq_len = 10")).unwrap();
        assert!(reload(&mut cfg).is_err());
        assert_eq!(cfg.settings.recorder.seq_len, 30);
        assert_eq!(cfg.config_path, path);
        assert_eq!(cfg.library_path(), missing);

        // the loop logs the failure and keeps running on the old recorder
        let mut s = session();
        s.cfg = cfg;
        assert!(s.handle(SessionEvent::Reload, &mut io::sink()).unwrap());
        assert_eq!(s.cfg.settings.recorder.seq_len, 30);
        assert_eq!(s.recorder.library().len(), 3);
    }
}
