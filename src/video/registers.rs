use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy)]
    pub struct Control: u8 {
        const NMI_ENABLE = 0b0000_0001;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    pub struct SpriteControl: u8 {
        const SIZE       = 0b0000_0011;
        const ENABLE     = 0b0000_0100;
        const BOTH_BANKS = 0b0000_1000;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    pub struct PlaneControl1: u8 {
        const X_OFFSET_SIGN = 0b0000_0001;
        const Y_OFFSET_SIGN = 0b0000_0010;
        const SCROLL_MODE   = 0b0000_1100;
        const DIRECT_COLOUR = 0b0001_0000;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    pub struct PlaneControl2: u8 {
        const LARGE_TILES     = 0b0000_0001;
        const BITMAP          = 0b0000_0010;
        const COLOUR_DEPTH    = 0b0000_1100;
        const LAYER           = 0b0011_0000;
        const PALETTE_IN_CELL = 0b0100_0000;
        const ENABLE          = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    pub struct OutputSelect: u8 {
        const LCD_PAL0  = 0b0000_0001;
        const TV_PAL0   = 0b0000_0010;
        const LCD_PAL1  = 0b0000_0100;
        const TV_PAL1   = 0b0000_1000;
        const TV_BLEND  = 0b0001_0000;
        const LCD_BLEND = 0b0010_0000;
    }
}

impl SpriteControl {
    /// Sprite dimensions in pixels selected by the two size bits.
    pub fn size(&self) -> (usize, usize) {
        let bits = self.bits() & Self::SIZE.bits();
        let width = if bits == 2 || bits == 3 { 16 } else { 8 };
        let height = if bits == 1 || bits == 3 { 16 } else { 8 };
        (width, height)
    }
}

impl PlaneControl1 {
    pub fn scroll_bits(&self) -> u8 {
        (self.bits() & Self::SCROLL_MODE.bits()) >> 2
    }
}

impl PlaneControl2 {
    pub fn colour_depth(&self) -> u8 {
        (self.bits() & Self::COLOUR_DEPTH.bits()) >> 2
    }

    pub fn layer(&self) -> u8 {
        (self.bits() & Self::LAYER.bits()) >> 4
    }
}

impl From<u8> for Control {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for SpriteControl {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for PlaneControl1 {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for PlaneControl2 {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for OutputSelect {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}
