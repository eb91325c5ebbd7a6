// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{path::PathBuf, process::Stdio};

use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, UnixStream},
    process::Command,
};

use speculos_mcu::{server::spawn_servers, vnc, Bridge, Options};

/// Speculos MCU bridge
///
/// Connects to the SeProxyHal socket of an emulated secure element and
/// serves the display, inputs and APDU transport on its behalf.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Firmware SEPH socket, `host:port` or `unix:<path>`
    #[clap(long, env = "SPECULOS_SEPH", default_value = "127.0.0.1:9998")]
    firmware: String,

    #[clap(flatten)]
    opts: Options,

    /// VNC front-end executable, fed pixel records on stdin
    #[clap(long)]
    vnc_server: Option<PathBuf>,

    /// Print recognised text events to stdout as JSON lines
    #[clap(long)]
    print_events: bool,

    /// Log level
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    c.add_filter_ignore_str("speculos_mcu::codec");

    let _ = simplelog::SimpleLogger::init(args.log_level, c.build());

    info!("Connecting to firmware at {}", args.firmware);

    match args.firmware.strip_prefix("unix:") {
        Some(path) => {
            let s = UnixStream::connect(path).await?;
            run_bridge(s, &args).await
        }
        None => {
            let s = TcpStream::connect(args.firmware.as_str()).await?;
            s.set_nodelay(true)?;
            run_bridge(s, &args).await
        }
    }
}

async fn run_bridge<S: AsyncRead + AsyncWrite>(stream: S, args: &Args) -> anyhow::Result<()> {
    let bridge = Bridge::new(&args.opts)?;

    // Start side channels
    let _servers = spawn_servers(&bridge, &args.opts).await?;

    // Print text events
    if args.print_events {
        let mut events = bridge.subscribe_events();
        tokio::spawn(async move {
            while let Ok(ev) = events.recv().await {
                match serde_json::to_string(&ev) {
                    Ok(s) => println!("{s}"),
                    Err(e) => warn!("Failed to encode event: {}", e),
                }
            }
        });
    }

    // Start VNC front-end
    if let Some(path) = &args.vnc_server {
        let (w, h) = bridge.model().screen_size();

        let mut child = Command::new(path)
            .arg(format!("--width={w}"))
            .arg(format!("--height={h}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match (child.stdout.take(), child.stdin.take()) {
            (Some(r), Some(w)) => {
                let b = bridge.clone();
                tokio::spawn(async move {
                    let _ = vnc::run(b, r, w).await;
                    let _ = child.wait().await;
                });
            }
            _ => warn!("VNC front-end pipes unavailable"),
        }
    }

    // Await bridge exit or exit signal
    tokio::select!(
        r = bridge.run(stream) => {
            debug!("Complete!");
            r?;
        }
        _ = tokio::signal::ctrl_c() => {
            debug!("Exit!");
        },
    );

    Ok(())
}
