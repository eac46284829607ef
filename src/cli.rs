use anyhow::{Context, Result, anyhow};
use pico_args::Arguments;
use std::{
    env,
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

use crate::config::ConfigState;
use crate::ipc;
use crate::recorder::SignRecorder;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains(["-h", "--help"]) {
        print_help();
        return Ok(());
    }

    // options first; pico-args hands out free arguments last
    let config: Option<PathBuf> = pargs.opt_value_from_str("--config")?;
    let library: Option<PathBuf> = pargs.opt_value_from_str("--library")?;

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("library") => {
            let cfg = ConfigState::load(config, library)?;
            let lib = cfg.load_library()?;
            print_response(&serde_json::json!({
                "config": cfg.name(),
                "library": cfg.library_path(),
                "total": lib.len(),
                "signs": lib.sign_counts(),
            }));
            Ok(())
        }

        Some("replay") => {
            let path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: signctl replay <session.jsonl>"))?;
            let cfg = ConfigState::load(config, library)?;
            let mut recorder = SignRecorder::new(cfg.load_library()?, cfg.settings.recorder_settings());
            let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
            let preds = ipc::replay(BufReader::new(file), &mut recorder, io::stdout().lock())
                .with_context(|| format!("replay of {} failed", path.display()))?;
            log::info!("replayed {} frames", preds.len());
            Ok(())
        }

        Some("serve") => {
            let cfg = ConfigState::load(config, library)?;
            ipc::run_session(cfg)
        }

        Some("record") => {
            let r = ipc::client_request(serde_json::json!({"op":"record"}))?;
            print_response(&r);
            Ok(())
        }

        Some("status") => {
            let r = ipc::client_request(serde_json::json!({"op":"status"}))?;
            print_response(&r);
            Ok(())
        }

        Some("reload") => {
            let r = ipc::client_request(serde_json::json!({"op":"reload"}))?;
            print_response(&r);
            Ok(())
        }

        Some("stop") => {
            let r = ipc::client_request(serde_json::json!({"op":"shutdown"}))?;
            print_response(&r);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"signctl — hand sign recognition from landmark streams

USAGE:
  signctl [--config FILE] [--library FILE] <command>

COMMANDS:
  signctl help [command]          Show general or command-specific help
  signctl library                 Show reference sign counts
  signctl replay <session.jsonl>  Run a recorded detection session offline
  signctl serve                   Read detections from stdin, print predictions
  signctl record                  Start recording in the running session
  signctl status                  Show session state
  signctl reload                  Reload config and reference library
  signctl stop                    Stop the running session

TIPS:
  - Config: ~/.config/signctl/config.toml (installed on first use)
  - Input: one JSON object per line, {{"left_hand": [[x,y,z] x21] | null,
    "right_hand": ..., "record": bool}}
  - Logging: RUST_LOG=debug shows the closest matches after every recording
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "library" => println!(
            "usage: signctl library\nLoads the reference library and prints the number of recordings per sign."
        ),
        "replay" => println!(
            "usage: signctl replay <session.jsonl>\nFeeds every line through the recognizer; prints a line whenever the label or recording state changes."
        ),
        "serve" => println!(
            "usage: signctl serve\nReads detections from stdin and writes one prediction per frame to stdout.\nListens for record/status/reload/stop on a Unix socket."
        ),
        "record" => println!("usage: signctl record\nCaptures the next window of frames and ranks it."),
        "status" => println!(
            "usage: signctl status\nShows config, library size, frame count, recording flag and current label."
        ),
        "reload" => println!(
            "usage: signctl reload\nReloads config and library; keeps the previous ones on error."
        ),
        "stop" => println!("usage: signctl stop\nStops the running session."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
