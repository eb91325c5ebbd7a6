//! VNC link tests against a firmware stub

use tokio::io::AsyncWriteExt;

use speculos_mcu::{proto::SephTag, vnc, Model, Options};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn bad_input_keeps_link() -> anyhow::Result<()> {
    let (bridge, mut fw, _h) = setup(Options {
        model: Model::Stax,
        ..options()
    })?;

    let (mut front, input) = tokio::io::duplex(256);
    let link = tokio::spawn(vnc::run(bridge.clone(), input, tokio::io::sink()));

    // Unknown key, then a pointer outside the 400x672 screen
    front.write_all(&[0, 0, 0, 0, 1, b'x']).await?;
    front.write_all(&[0x90, 0x01, 0, 0, 1, 0]).await?;

    // Followed by a valid right button press
    front.write_all(&[0, 0, 0, 0, 1, b'R']).await?;

    let p = fw.next_event().await?;
    assert_eq!(p.tag, SephTag::ButtonPushEvent);
    assert_eq!(p.payload, vec![0x04]);
    assert!(!link.is_finished());

    // Closing the front-end ends the link
    drop(front);
    let r = tokio::time::timeout(RECV_TIMEOUT, link).await??;
    assert!(r.is_err());

    Ok(())
}
