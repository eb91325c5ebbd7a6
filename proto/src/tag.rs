// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SEPH tag definitions

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

/// Subtag carried by `GENERAL_STATUS` when the firmware has finished a burst
pub const GENERAL_STATUS_LAST_COMMAND: u16 = 0x0000;

/// SeProxyHal packet tags
///
/// Tags below `0x20` are events (MCU → SE), the remainder are commands and
/// statuses (SE → MCU).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum SephTag {
    ButtonPushEvent = 0x05,
    FingerEvent = 0x0C,
    DisplayProcessedEvent = 0x0D,
    TickerEvent = 0x0E,
    UsbEvent = 0x0F,
    UsbEpXferEvent = 0x10,
    CapduEvent = 0x16,

    Mcu = 0x31,
    BleSend = 0x38,
    BleRadioPower = 0x44,
    SePowerOff = 0x46,
    UsbConfig = 0x4F,
    UsbEpPrepare = 0x50,
    RequestStatus = 0x52,
    Rapdu = 0x53,
    PlayTune = 0x56,
    PrintcStatus = 0x5F,
    GeneralStatus = 0x60,
    ScreenDisplayStatus = 0x65,
    PrintfStatus = 0x66,
    ScreenDisplayRawStatus = 0x69,

    NbglDrawRect = 0xFA,
    NbglRefresh = 0xFB,
    NbglDrawLine = 0xFC,
    NbglDrawImage = 0xFD,
    NbglDrawImageFile = 0xFE,
    NbglDrawImageRle = 0xFF,
}

impl SephTag {
    /// Check whether this tag is an event (sent to the firmware)
    pub fn is_event(&self) -> bool {
        (*self as u8) < 0x20
    }

    /// Check whether this tag is an NBGL draw command
    pub fn is_nbgl(&self) -> bool {
        (*self as u8) >= SephTag::NbglDrawRect as u8
    }
}
