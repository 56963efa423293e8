//! Chatroom device binary.
//!
//! Reads one command per line from stdin and prints the replies. Logs go to
//! stderr, so replies can be piped.
//!
//! # Usage
//!
//! ```bash
//! printf 'open lobby\nwrite 1 hello\nread 1\nquit\n' | chatroom-device
//!
//! # Tighter limits, verbose logging
//! chatroom-device --max-rooms 16 --max-sessions 64 --log-level debug
//! ```

use std::io::{self, BufRead, Write};

use chatroom_core::RegistryConfig;
use chatroom_device::{
    ChatDevice, DEFAULT_DEVICE_NAME, DeviceConfig, SystemEnv,
    shell::{Command, Shell},
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Chatroom device
#[derive(Parser, Debug)]
#[command(name = "chatroom-device")]
#[command(about = "Multi-room broadcast chat behind device-file operations")]
#[command(version)]
struct Args {
    /// Device name
    #[arg(short, long, default_value = DEFAULT_DEVICE_NAME)]
    name: String,

    /// Maximum number of live rooms
    #[arg(long, default_value_t = RegistryConfig::default().max_rooms)]
    max_rooms: usize,

    /// Maximum number of open sessions across all rooms
    #[arg(long, default_value_t = RegistryConfig::default().max_sessions)]
    max_sessions: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = DeviceConfig {
        name: args.name,
        registry: RegistryConfig { max_rooms: args.max_rooms, max_sessions: args.max_sessions },
    };
    let shell = Shell::new(ChatDevice::new(config, SystemEnv::new()));

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut quit = false;

    for line in stdin.lock().lines() {
        let line = line?;
        let reply = Command::parse(&line).and_then(|command| match command {
            Some(command) => {
                quit = command == Command::Quit;
                shell.execute(&command)
            },
            None => Ok(Vec::new()),
        });

        match reply {
            Ok(lines) => {
                for line in lines {
                    writeln!(stdout, "{line}")?;
                }
            },
            Err(err) => writeln!(stdout, "error: {err}")?,
        }
        stdout.flush()?;

        if quit {
            return Ok(());
        }
    }

    shell.device().shutdown();
    Ok(())
}
