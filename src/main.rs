mod cli;
mod config;
mod distance;
mod dtw;
mod error;
mod hand;
mod ipc;
mod landmarks;
mod library;
mod logging;
mod recorder;
mod sign;
#[cfg(test)]
mod testutil;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
