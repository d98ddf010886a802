use crate::video::layer::Layer;
use crate::video::palette::Trgb1555;
use crate::video::registers::OutputSelect;
use crate::video::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Merge the four layers into the ARGB8888 output buffer. Within each bank
/// the layers resolve 3 to 0, so layer 0 wins by being applied last. The
/// selection register then decides which banks reach the screen: when both
/// are enabled a solid bank 1 beats a solid bank 0, and both beat the
/// blended pair.
pub fn merge_layers(layers: &[Layer; 4], select: OutputSelect, lcd: bool, out: &mut [u32]) {
    let (pal0_on, pal1_on, blend_on) = if lcd {
        (
            select.contains(OutputSelect::LCD_PAL0),
            select.contains(OutputSelect::LCD_PAL1),
            select.contains(OutputSelect::LCD_BLEND),
        )
    } else {
        (
            select.contains(OutputSelect::TV_PAL0),
            select.contains(OutputSelect::TV_PAL1),
            select.contains(OutputSelect::TV_BLEND),
        )
    };

    for y in 0..SCREEN_HEIGHT {
        for x in 0..SCREEN_WIDTH {
            let mut pal0 = Trgb1555::TRANSPARENT;
            let mut pal1 = Trgb1555::TRANSPARENT;
            for layer in layers.iter().rev() {
                let pixel = layer.pixel(x, y);
                if !pixel.bank0().is_transparent() {
                    pal0 = pixel.bank0();
                }
                if !pixel.bank1().is_transparent() {
                    pal1 = pixel.bank1();
                }
            }

            let mut res = Trgb1555::TRANSPARENT;
            if blend_on && pal0_on && pal1_on {
                res = pal0.blend(pal1);
            }
            if pal0_on && !pal0.is_transparent() {
                res = pal0;
            }
            if pal1_on && !pal1.is_transparent() {
                res = pal1;
            }
            out[y * SCREEN_WIDTH + x] = res.to_argb8888();
        }
    }
}
