// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TCP side channels for APDUs, buttons and fingers

use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use crate::{Bridge, Button, Error, Options};

/// A connection handler for a TCP side channel
#[async_trait]
pub trait Service: Clone + Send + Sync + 'static {
    /// Service name for logging
    const NAME: &'static str;

    /// Serve a single connection until the peer disconnects
    async fn serve(&self, s: TcpStream) -> Result<(), Error>;
}

/// Accept connections, serving each on its own task
pub async fn listen<S: Service>(l: TcpListener, svc: S) -> Result<(), Error> {
    info!("{} server listening on {}", S::NAME, l.local_addr()?);

    loop {
        let (s, addr) = l.accept().await?;
        debug!("{} connection from {}", S::NAME, addr);

        let svc = svc.clone();
        tokio::spawn(async move {
            match svc.serve(s).await {
                Ok(()) | Err(Error::Eof) | Err(Error::PeerGone) => {
                    debug!("{} peer {} disconnected", S::NAME, addr)
                }
                Err(e) => warn!("{} peer {}: {}", S::NAME, addr, e),
            }
        });
    }
}

/// Bind and spawn the side channels enabled in the provided options
pub async fn spawn_servers(
    bridge: &Bridge,
    opts: &Options,
) -> Result<Vec<JoinHandle<Result<(), Error>>>, Error> {
    let mut handles = vec![];

    if let Some(p) = opts.apdu_port {
        let l = TcpListener::bind(SocketAddr::new(opts.bind, p)).await?;
        handles.push(tokio::spawn(listen(l, ApduService(bridge.clone()))));
    }
    if let Some(p) = opts.button_port {
        let l = TcpListener::bind(SocketAddr::new(opts.bind, p)).await?;
        handles.push(tokio::spawn(listen(l, ButtonService(bridge.clone()))));
    }
    if let Some(p) = opts.finger_port {
        let l = TcpListener::bind(SocketAddr::new(opts.bind, p)).await?;
        handles.push(tokio::spawn(listen(l, FingerService(bridge.clone()))));
    }

    Ok(handles)
}

fn map_read(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::Eof,
        _ => Error::Io(e),
    }
}

fn map_write(_e: std::io::Error) -> Error {
    Error::PeerGone
}

/// Largest APDU accepted from a client
pub const MAX_APDU_LEN: usize = u16::MAX as usize;

/// Read a `len:u32be || apdu` request, rejecting oversized lengths
pub async fn read_apdu<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>, Error> {
    let len = r.read_u32().await.map_err(map_read)? as usize;
    if len > MAX_APDU_LEN {
        return Err(Error::InvalidInput(format!(
            "apdu length {len} exceeds {MAX_APDU_LEN}"
        )));
    }

    let mut apdu = vec![0u8; len];
    r.read_exact(&mut apdu).await.map_err(map_read)?;

    Ok(apdu)
}

/// Length-prefixed APDU exchange
///
/// Requests are `len:u32be || apdu`, responses `(len - 2):u32be || apdu`
/// with the status word included in the payload.
#[derive(Clone)]
pub struct ApduService(pub Bridge);

#[async_trait]
impl Service for ApduService {
    const NAME: &'static str = "apdu";

    async fn serve(&self, mut s: TcpStream) -> Result<(), Error> {
        loop {
            let apdu = read_apdu(&mut s).await?;

            let resp = self.0.exchange_apdu(&apdu).await?;

            let mut buff = Vec::with_capacity(resp.len() + 4);
            buff.extend_from_slice(&(resp.len().saturating_sub(2) as u32).to_be_bytes());
            buff.extend_from_slice(&resp);

            s.write_all(&buff).await.map_err(map_write)?;
        }
    }
}

/// Parse a button command byte
pub fn button_command(b: u8) -> Option<(Button, bool)> {
    match b {
        b'L' => Some((Button::Left, true)),
        b'l' => Some((Button::Left, false)),
        b'R' => Some((Button::Right, true)),
        b'r' => Some((Button::Right, false)),
        _ => None,
    }
}

/// ASCII button commands, `L`/`R` press and `l`/`r` release
#[derive(Clone)]
pub struct ButtonService(pub Bridge);

#[async_trait]
impl Service for ButtonService {
    const NAME: &'static str = "button";

    async fn serve(&self, mut s: TcpStream) -> Result<(), Error> {
        let mut buff = [0u8; 64];

        loop {
            let n = s.read(&mut buff).await?;
            if n == 0 {
                return Ok(());
            }

            for (button, pressed) in buff[..n].iter().filter_map(|b| button_command(*b)) {
                self.0.queue_button(button, pressed).await;
            }
        }
    }
}

/// Parse a finger command line of `x,y,p` triples
pub fn finger_command(line: &str) -> Result<Vec<(u16, u16, bool)>, Error> {
    let values = line
        .trim()
        .split(',')
        .map(|v| v.trim().parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::InvalidInput(format!("finger command '{line}': {e}")))?;

    if values.is_empty() || values.len() % 3 != 0 {
        return Err(Error::InvalidInput(format!(
            "finger command '{line}' is not a list of x,y,p triples"
        )));
    }

    Ok(values.chunks(3).map(|c| (c[0], c[1], c[2] != 0)).collect())
}

/// ASCII finger commands
#[derive(Clone)]
pub struct FingerService(pub Bridge);

#[async_trait]
impl Service for FingerService {
    const NAME: &'static str = "finger";

    async fn serve(&self, s: TcpStream) -> Result<(), Error> {
        let mut lines = BufReader::new(s).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let events = match finger_command(&line) {
                Ok(v) => v,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            for (x, y, pressed) in events {
                if let Err(e) = self.0.queue_finger(x, y, pressed).await {
                    warn!("{}", e);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buttons() {
        assert_eq!(button_command(b'R'), Some((Button::Right, true)));
        assert_eq!(button_command(b'l'), Some((Button::Left, false)));
        assert_eq!(button_command(b'\n'), None);
    }

    #[test]
    fn fingers() {
        assert_eq!(finger_command("10,20,1").unwrap(), vec![(10, 20, true)]);
        assert_eq!(
            finger_command("10,20,1,10,20,0\n").unwrap(),
            vec![(10, 20, true), (10, 20, false)]
        );
        assert!(finger_command("10,20").is_err());
        assert!(finger_command("a,b,c").is_err());
    }

    #[tokio::test]
    async fn apdu_framing() {
        let (mut a, mut b) = tokio::io::duplex(64);

        a.write_all(&[0, 0, 0, 4, 0xe0, 0x01, 0x00, 0x00]).await.unwrap();
        assert_eq!(read_apdu(&mut b).await.unwrap(), vec![0xe0, 0x01, 0x00, 0x00]);

        // Oversized lengths are rejected before the payload is read
        a.write_all(&0xffff_fff0u32.to_be_bytes()).await.unwrap();
        assert!(matches!(
            read_apdu(&mut b).await,
            Err(Error::InvalidInput(_))
        ));

        drop(a);
        assert!(matches!(read_apdu(&mut b).await, Err(Error::Eof)));
    }
}
