// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SEPH packet framing over async byte streams

use std::io::ErrorKind;

use encdec::{DecodeOwned, Encode};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use speculos_mcu_proto::{Packet, PacketHeader};

use crate::Error;

fn map_eof(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => Error::Eof,
        _ => Error::Io(e),
    }
}

/// Read a single packet, a short read is reported as [Error::Eof]
pub async fn read_packet<R: AsyncRead + Unpin>(r: &mut R) -> Result<Packet, Error> {
    let mut h = [0u8; PacketHeader::LEN];
    r.read_exact(&mut h).await.map_err(map_eof)?;

    let (hdr, _) = PacketHeader::decode_owned(&h)?;

    let mut payload = vec![0u8; hdr.len as usize];
    r.read_exact(&mut payload).await.map_err(map_eof)?;

    trace!("seph rx {} ({} bytes)", hdr.tag, hdr.len);

    Ok(Packet {
        tag: hdr.tag,
        payload,
    })
}

/// Write a single packet and flush
pub async fn write_packet<W: AsyncWrite + Unpin>(w: &mut W, p: &Packet) -> Result<(), Error> {
    let mut buff = vec![0u8; p.encode_len()?];
    let n = p.encode(&mut buff)?;

    trace!("seph tx {} ({} bytes)", p.tag, p.payload.len());

    w.write_all(&buff[..n]).await?;
    w.flush().await?;

    Ok(())
}
