//! SeProxyHal dispatcher tests

use encdec::Encode;

use speculos_mcu_core::{
    engine::{Error, Output},
    proto::{
        chunk::{split, HID_CHANNEL, HID_MTU},
        nbgl::{Area, Bpp},
        usb::{PrepareDir, XferKind, HID_EP_IN, HID_EP_OUT},
        SephTag,
    },
    Action, Automation, Model,
};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn nbgl_full_screen_rect() -> anyhow::Result<()> {
    setup_logging();

    let mut e = engine(Model::Stax);

    let a = Area {
        x0: 0,
        y0: 0,
        width: 400,
        height: 672,
        color: 3,
        bpp: Bpp::Two,
    };
    let mut b = [0u8; Area::LEN];
    a.encode(&mut b)?;

    let out = e.update(&pkt(SephTag::NbglDrawRect, &b))?;
    assert!(out.is_empty());
    assert_eq!(e.framebuffer().pixel(199, 335), Some(0xFFFFFF));

    // Nothing is committed until a refresh and the following status
    assert_eq!(e.screenshot().get_pixel(199, 335).0, [0, 0, 0]);

    e.update(&pkt(SephTag::NbglRefresh, &[]))?;
    let out = e.update(&general_status())?;

    assert!(matches!(&out[0], Output::Screen(px) if px.len() == 400 * 672));
    assert_eq!(out.last(), Some(&Output::StatusReceived));
    assert_eq!(e.screenshot().get_pixel(199, 335).0, [0xff, 0xff, 0xff]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn display_status_handshake() -> anyhow::Result<()> {
    setup_logging();

    let mut e = engine(Model::NanoSP);

    let out = e.update(&display_status(label(10, 10), b"Hi"))?;
    assert_eq!(out.len(), 1);
    match &out[0] {
        Output::Reply(p) => {
            assert_eq!(p.tag, SephTag::DisplayProcessedEvent);
            assert_eq!(p.to_vec()?, vec![0x0d, 0x00, 0x00]);
        }
        o => panic!("unexpected output: {o:?}"),
    }

    let out = e.update(&general_status())?;
    assert!(matches!(out[0], Output::Screen(_)));
    assert_eq!(texts(&out), vec!["Hi"]);
    assert_eq!(out.last(), Some(&Output::StatusReceived));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn automation_actions() -> anyhow::Result<()> {
    setup_logging();

    let mut e = engine(Model::NanoSP);
    e.set_automation(Some(Automation::from_json(
        r#"{"version": 1, "rules": [
            {"text": "Application", "actions": [["button", 2, true], ["button", 2, false]]},
            {"text": "Quit", "conditions": [["ready", true]], "actions": [["exit"]]},
            {"text": "Ready", "actions": [["setbool", "ready", true]]}
        ]}"#,
    )?));

    e.update(&display_status(label(35, 3), b"Application\0"))?;
    let out = e.update(&general_status())?;

    let texts: Vec<_> = out
        .iter()
        .filter_map(|o| match o {
            Output::Text(t) => Some((t.text.as_str(), t.x, t.y)),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![("Application", 35, 3)]);

    // Actions follow the text and precede the status
    let n = out.len();
    assert_eq!(
        &out[n - 3..],
        &[
            Output::Action(Action::Button {
                button: 2,
                pressed: true
            }),
            Output::Action(Action::Button {
                button: 2,
                pressed: false
            }),
            Output::StatusReceived,
        ]
    );

    // Conditions read the boolean store
    e.update(&display_status(label(0, 0), b"Quit"))?;
    let out = e.update(&general_status())?;
    assert!(!out.contains(&Output::Exit));

    e.update(&display_status(label(0, 0), b"Ready"))?;
    e.update(&general_status())?;

    e.update(&display_status(label(0, 0), b"Quit"))?;
    let out = e.update(&general_status())?;
    assert!(out.contains(&Output::Exit));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn hid_apdu_exchange() -> anyhow::Result<()> {
    setup_logging();

    let mut e = engine(Model::NanoX);

    // APDUs are held until the device is configured
    let out = e.send_apdu(&[0xe0, 0xc4, 0x00, 0x00, 0x00])?;
    assert!(out.is_empty());

    let out = usb_connect(&mut e);
    let xfers: Vec<_> = out
        .iter()
        .filter_map(|o| match o {
            Output::Event(p) if p.tag == SephTag::UsbEpXferEvent => Some(p.payload.clone()),
            _ => None,
        })
        .collect();

    // SET_ADDRESS, SET_CONFIGURATION, then the held transfer
    assert_eq!(xfers.len(), 3);
    assert_eq!(xfers[0][4], 0x05);
    assert_eq!(xfers[1][4], 0x09);
    assert_eq!(&xfers[2][..3], &[HID_EP_OUT, XferKind::Out as u8, 64]);

    // Response arrives as an IN endpoint preparation
    let resp = [0x1b, 0x30, 0x01, 0x03, 0x08, 0x01, 0x00, 0x03, 0x90, 0x00];
    let frame = &split(HID_CHANNEL, HID_MTU, true, &resp)?[0];

    let mut prep = vec![HID_EP_IN, PrepareDir::In as u8, 64];
    prep.extend_from_slice(frame);

    let out = e.update(&pkt(SephTag::UsbEpPrepare, &prep))?;
    assert!(matches!(&out[0], Output::Event(p) if p.payload == vec![HID_EP_IN, XferKind::In as u8, 0]));
    assert_eq!(out[1], Output::Apdu(resp.to_vec()));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn protocol_faults() -> anyhow::Result<()> {
    setup_logging();

    let mut e = engine(Model::NanoS);

    assert_eq!(
        e.update(&pkt(SephTag::TickerEvent, &[])),
        Err(Error::UnexpectedTag(SephTag::TickerEvent))
    );
    assert_eq!(
        e.update(&pkt(SephTag::NbglRefresh, &[])),
        Err(Error::UnexpectedTag(SephTag::NbglRefresh))
    );
    assert_eq!(
        e.update(&pkt(SephTag::GeneralStatus, &[0x00, 0x01])),
        Err(Error::UnexpectedStatus(0x0001))
    );

    let mut e = engine(Model::Stax);
    assert_eq!(
        e.update(&display_status(label(0, 0), b"x")),
        Err(Error::UnexpectedTag(SephTag::ScreenDisplayStatus))
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn printf_and_misc() -> anyhow::Result<()> {
    setup_logging();

    // printf is acknowledged on every model, printc only on blue
    let mut e = engine(Model::NanoS);
    assert_eq!(e.update(&pkt(SephTag::PrintfStatus, b"hello\n"))?.len(), 1);
    assert!(e.update(&pkt(SephTag::PrintcStatus, b"w"))?.is_empty());

    let mut e = engine(Model::Blue);
    assert_eq!(e.update(&pkt(SephTag::PrintcStatus, b"w"))?.len(), 1);

    // Radio and audio requests are ignored
    assert!(e.update(&pkt(SephTag::BleRadioPower, &[0x01]))?.is_empty());
    assert!(e.update(&pkt(SephTag::PlayTune, &[0x02]))?.is_empty());

    assert_eq!(
        e.update(&pkt(SephTag::SePowerOff, &[]))?,
        vec![Output::Exit]
    );

    Ok(())
}
