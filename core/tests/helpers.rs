#![allow(unused)]

use encdec::Encode;

use speculos_mcu_core::{
    engine::{Config, Engine, Output},
    proto::{
        bagl::{Component, ComponentType},
        usb::{HID_EP_IN, HID_EP_OUT},
        Packet, SephTag,
    },
    Model, TransportKind,
};

/// Setup logging for tests
pub fn setup_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

/// Create an engine for the provided model using HID transport
pub fn engine(model: Model) -> Engine {
    Engine::new(&Config {
        model,
        transport: TransportKind::Hid,
        graphics: None,
    })
}

/// Build a packet
pub fn pkt(tag: SephTag, payload: &[u8]) -> Packet {
    Packet::new(tag, payload.to_vec()).unwrap()
}

/// `GENERAL_STATUS / LAST_COMMAND`
pub fn general_status() -> Packet {
    pkt(SephTag::GeneralStatus, &[0x00, 0x00])
}

/// Encode a BAGL display status with the provided context
pub fn display_status(c: Component, ctx: &[u8]) -> Packet {
    let mut b = vec![0u8; Component::LEN];
    c.encode(&mut b).unwrap();
    b.extend_from_slice(ctx);
    pkt(SephTag::ScreenDisplayStatus, &b)
}

/// Left / top aligned label at `(x, y)`
pub fn label(x: i16, y: i16) -> Component {
    Component {
        kind: ComponentType::Label,
        x,
        y,
        width: 100,
        height: 8,
        fgcolor: 0xffffff,
        ..Default::default()
    }
}

/// Run the USB enumeration sequence, returning the emitted events
pub fn usb_connect(e: &mut Engine) -> Vec<Output> {
    let mut out = vec![];
    out.extend(e.update(&pkt(SephTag::UsbConfig, &[0x01])).unwrap());
    out.extend(e.update(&pkt(SephTag::UsbConfig, &[0x03])).unwrap());
    out.extend(
        e.update(&pkt(
            SephTag::UsbConfig,
            &[0x04, 0x02, HID_EP_IN, 0x03, 0x40, HID_EP_OUT, 0x03, 0x40],
        ))
        .unwrap(),
    );
    out
}

/// Collect text outputs
pub fn texts(out: &[Output]) -> Vec<String> {
    out.iter()
        .filter_map(|o| match o {
            Output::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect()
}
