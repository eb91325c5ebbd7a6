// Copyright (c) 2022-2023 The MobileCoin Foundation

//! VNC front-end link
//!
//! The VNC server runs as a separate process. Committed pixels are streamed
//! to it as 9-byte records and input arrives as 6-byte records.

use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::broadcast::error::RecvError,
};

use speculos_mcu_core::Pixel;

use crate::{Bridge, Button, Error};

/// Output record terminator
pub const RECORD_END: u8 = 0x0a;

/// Encode a pixel update as `{y:u16le, x:u16le, rgb:u32le, 0x0a}`
pub fn encode_pixel(p: &Pixel) -> [u8; 9] {
    let mut b = [0u8; 9];
    b[0..2].copy_from_slice(&p.y.to_le_bytes());
    b[2..4].copy_from_slice(&p.x.to_le_bytes());
    b[4..8].copy_from_slice(&p.color.to_le_bytes());
    b[8] = RECORD_END;
    b
}

/// Input from the VNC front-end
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Input {
    Pointer { x: u16, y: u16, pressed: bool },
    Button { button: Button, pressed: bool },
}

impl Input {
    /// Decode a `{x:u16le, y:u16le, pressed:u8, key:u8}` record
    pub fn decode(b: &[u8; 6]) -> Result<Self, Error> {
        let x = u16::from_le_bytes([b[0], b[1]]);
        let y = u16::from_le_bytes([b[2], b[3]]);
        let pressed = b[4] != 0;

        match b[5] {
            0 => Ok(Input::Pointer { x, y, pressed }),
            b'L' => Ok(Input::Button {
                button: Button::Left,
                pressed,
            }),
            b'R' => Ok(Input::Button {
                button: Button::Right,
                pressed,
            }),
            k => Err(Error::InvalidInput(format!("unknown vnc key {k:#04x}"))),
        }
    }
}

/// Queue a single input record on the bridge
async fn forward(bridge: &Bridge, b: &[u8; 6]) -> Result<(), Error> {
    match Input::decode(b)? {
        Input::Pointer { x, y, pressed } => bridge.queue_finger(x, y, pressed).await,
        Input::Button { button, pressed } => {
            bridge.queue_button(button, pressed).await;
            Ok(())
        }
    }
}

/// Stream screen updates to the front-end and forward its input to the bridge
///
/// Returns when either direction closes, a dead front-end does not stop the bridge.
pub async fn run<R, W>(bridge: Bridge, mut r: R, mut w: W) -> Result<(), Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut screen = bridge.subscribe_screen();

    let output = async {
        loop {
            let px = match screen.recv().await {
                Ok(px) => px,
                Err(RecvError::Lagged(n)) => {
                    warn!("vnc lagged by {} updates", n);
                    continue;
                }
                Err(RecvError::Closed) => return Ok(()),
            };

            let mut buff = Vec::with_capacity(px.len() * 9);
            for p in px.iter() {
                buff.extend_from_slice(&encode_pixel(p));
            }

            w.write_all(&buff).await.map_err(|_| Error::PeerGone)?;
            w.flush().await.map_err(|_| Error::PeerGone)?;
        }
    };

    let input = async {
        let mut b = [0u8; 6];
        loop {
            if let Err(e) = r.read_exact(&mut b).await {
                debug!("vnc input closed: {}", e);
                return Err::<(), _>(Error::PeerGone);
            }

            match forward(&bridge, &b).await {
                Ok(()) => (),
                Err(Error::InvalidInput(e)) => warn!("vnc input dropped: {}", e),
                Err(e) => return Err(e),
            }
        }
    };

    let res = tokio::select! {
        r = output => r,
        r = input => r,
    };

    if let Err(e) = &res {
        warn!("vnc link closed: {}", e);
    }

    res
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pixel_record() {
        let p = Pixel {
            x: 0x0102,
            y: 0x0304,
            color: 0x00aabbcc,
        };
        assert_eq!(
            encode_pixel(&p),
            [0x04, 0x03, 0x02, 0x01, 0xcc, 0xbb, 0xaa, 0x00, 0x0a]
        );
    }

    #[test]
    fn input_records() {
        assert_eq!(
            Input::decode(&[10, 0, 20, 0, 1, 0]).unwrap(),
            Input::Pointer {
                x: 10,
                y: 20,
                pressed: true
            }
        );
        assert_eq!(
            Input::decode(&[0, 0, 0, 0, 0, b'R']).unwrap(),
            Input::Button {
                button: Button::Right,
                pressed: false
            }
        );
        assert!(Input::decode(&[0, 0, 0, 0, 0, b'x']).is_err());
    }
}
