use log::trace;

use crate::memory::PhysicalMemory;
use crate::video::blitter::{self, ColourMode};
use crate::video::layer::Layer;
use crate::video::registers::{PlaneControl1, PlaneControl2};
use crate::video::tile::{fetch_char_data, tile_map_addr, ScrollMode};
use crate::video::{
    bit, PALETTE_BANK0_ADDRESS, PALETTE_BANK1_ADDRESS, PLANE_CTRL1_REGISTER, PLANE_CTRL2_REGISTER,
    PLANE_PAL_SEL_REGISTER, PLANE_SEG_LSB_REGISTER, PLANE_SEG_MSB_REGISTER, PLANE_X_REGISTER,
    PLANE_Y_REGISTER,
};

/// Render one background plane into the layer buffers by walking its tile
/// grid under the active scroll window. Only plane 0 may use direct colour
/// or bitmap strips. Each cell names a character vector plus an attribute
/// nibble; the control register decides whether that nibble carries the
/// palette bank or the target layer.
pub fn render_plane(
    plane: usize,
    regs: &[u8; 256],
    vram: &[u8],
    mem: &dyn PhysicalMemory,
    layers: &mut [Layer; 4],
) {
    let ctrl1 = PlaneControl1::from(regs[PLANE_CTRL1_REGISTER[plane] as usize]);
    let ctrl2 = PlaneControl2::from(regs[PLANE_CTRL2_REGISTER[plane] as usize]);
    if !ctrl2.contains(PlaneControl2::ENABLE) {
        return;
    }

    let direct = plane == 0 && ctrl1.contains(PlaneControl1::DIRECT_COLOUR);
    let fmt = if direct {
        ColourMode::Argb1555
    } else {
        ColourMode::from_depth(ctrl2.colour_depth())
    };
    let bmp = plane == 0 && ctrl2.contains(PlaneControl2::BITMAP);
    let palette_in_cell = ctrl2.contains(PlaneControl2::PALETTE_IN_CELL);
    let x8 = ctrl1.contains(PlaneControl1::X_OFFSET_SIGN);
    let y8 = ctrl1.contains(PlaneControl1::Y_OFFSET_SIGN);
    let scroll = ScrollMode::from(ctrl1.scroll_bits());

    let pal_sel = regs[PLANE_PAL_SEL_REGISTER as usize];
    let render_pal0 = bit(pal_sel, 2 * plane as u8);
    let render_pal1 = bit(pal_sel, 2 * plane as u8 + 1);

    let mut xoff = regs[PLANE_X_REGISTER[plane] as usize] as i32;
    if x8 {
        xoff -= 256;
    }
    let mut yoff = regs[PLANE_Y_REGISTER[plane] as usize] as i32;
    if y8 {
        yoff -= 256;
    }

    let tile_width = if bmp {
        256
    } else if ctrl2.contains(PlaneControl2::LARGE_TILES) {
        16
    } else {
        8
    };
    let tile_height = if bmp { 1 } else { tile_width };

    // Scrolling arrangements extend the walk one page back so the wrapped
    // half of the window gets drawn too; bitmap strips never scroll that way.
    let x0 = if (scroll == ScrollMode::Horizontal || scroll == ScrollMode::FourPage) && !bmp {
        -256
    } else {
        0
    };
    let y0 = if (scroll == ScrollMode::Vertical || scroll == ScrollMode::FourPage) && !bmp {
        -256
    } else {
        0
    };

    let seg = (regs[PLANE_SEG_MSB_REGISTER[plane] as usize] as u16 & 0x0f) << 8
        | regs[PLANE_SEG_LSB_REGISTER[plane] as usize] as u16;

    trace!(
        "plane {}: {:?} {:?} {}x{} tiles at ({}, {})",
        plane,
        fmt,
        scroll,
        tile_width,
        tile_height,
        xoff,
        yoff
    );

    let mut chr = [0u8; 512];
    for y in (y0..256).step_by(tile_height) {
        for x in (x0..256).step_by(tile_width) {
            let tx = (x - x0) / tile_width as i32;
            let ty = (y - y0) / tile_height as i32;
            let Some(addr) = tile_map_addr(tx, ty, x8, y8, tile_width, bmp, plane, scroll) else {
                continue;
            };
            let cell = (vram[addr + 1] as u16) << 8 | vram[addr] as u16;
            let vector = cell & 0xfff;
            if vector == 0 {
                // transparent cell
                continue;
            }
            let cell_bank = (cell >> 12) as u8;
            let (depth, pal_bank) = if palette_in_cell {
                let bank = match fmt {
                    ColourMode::Idx16 => cell_bank,
                    ColourMode::Idx64 => cell_bank >> 2,
                    _ => 0,
                };
                (ctrl2.layer(), bank)
            } else {
                let bank = match fmt {
                    ColourMode::Idx16 => ctrl2.layer() | (cell_bank >> 2),
                    ColourMode::Idx64 => cell_bank >> 2,
                    _ => 0,
                };
                (cell_bank & 0x03, bank)
            };

            let len = fetch_char_data(mem, seg, vector, tile_width, tile_height, fmt, bmp, &mut chr);
            let pal_off = match fmt {
                ColourMode::Idx16 => pal_bank as usize * 32,
                ColourMode::Idx64 => pal_bank as usize * 128,
                _ => 0,
            };
            let pal0 = render_pal0.then(|| &vram[PALETTE_BANK0_ADDRESS + pal_off..]);
            let pal1 = render_pal1.then(|| &vram[PALETTE_BANK1_ADDRESS + pal_off..]);
            blitter::blit(
                &mut layers[(depth & 0x03) as usize],
                x + xoff,
                y + yoff,
                &chr[..len],
                tile_width,
                tile_height,
                fmt,
                pal0,
                pal1,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::rom::Rom;
    use crate::video::palette::Trgb1555;
    use crate::video::{LAYER_HEIGHT, LAYER_WIDTH, VRAM_SIZE};

    fn fresh_layers() -> [Layer; 4] {
        std::array::from_fn(|_| Layer::new(LAYER_WIDTH, LAYER_HEIGHT))
    }

    // One 8x8 4bpp character of solid index 1 as vector 1 in segment 0.
    fn solid_char_rom() -> Rom {
        let mut image = vec![0u8; 64];
        for byte in image[32..].iter_mut() {
            *byte = 0x11;
        }
        Rom::new(image)
    }

    fn base_vram() -> Vec<u8> {
        let mut vram = vec![0u8; VRAM_SIZE];
        // bank 0 palette 0, entry 1: solid red
        vram[PALETTE_BANK0_ADDRESS + 2] = 0x1f;
        vram
    }

    #[test]
    fn disabled_planes_draw_nothing() {
        let mut regs = [0u8; 256];
        regs[PLANE_PAL_SEL_REGISTER as usize] = 0x01;
        let vram = base_vram();
        let mut layers = fresh_layers();
        render_plane(0, &regs, &vram, &solid_char_rom(), &mut layers);
        assert!(layers[0].pixel(0, 0).bank0().is_transparent());
    }

    #[test]
    fn cell_attribute_selects_the_layer_when_palette_comes_from_control() {
        let mut regs = [0u8; 256];
        regs[PLANE_CTRL2_REGISTER[0] as usize] = 0b1000_0100; // enable, 4bpp
        regs[PLANE_PAL_SEL_REGISTER as usize] = 0x01;
        let mut vram = base_vram();
        // cell (0, 0): vector 1, attribute nibble 0b0010 -> depth 2
        vram[0] = 0x01;
        vram[1] = 0x20;
        let mut layers = fresh_layers();
        render_plane(0, &regs, &vram, &solid_char_rom(), &mut layers);
        assert_eq!(layers[2].pixel(0, 0).bank0(), Trgb1555(0x001f));
        assert!(layers[2].pixel(7, 7).bank0() == Trgb1555(0x001f));
        assert!(layers[2].pixel(8, 8).bank0().is_transparent());
        assert!(layers[0].pixel(0, 0).bank0().is_transparent());
    }

    #[test]
    fn control_selects_the_layer_when_palette_comes_from_the_cell() {
        let mut regs = [0u8; 256];
        regs[PLANE_CTRL2_REGISTER[0] as usize] = 0b1101_0100; // enable, cell palette, layer 1, 4bpp
        regs[PLANE_PAL_SEL_REGISTER as usize] = 0x01;
        let mut vram = base_vram();
        // palette bank 2 entry 1: solid green
        vram[PALETTE_BANK0_ADDRESS + 2 * 32 + 2] = 0xe0;
        vram[PALETTE_BANK0_ADDRESS + 2 * 32 + 3] = 0x03;
        // cell (0, 0): vector 1, attribute nibble selects palette bank 2
        vram[0] = 0x01;
        vram[1] = 0x20;
        let mut layers = fresh_layers();
        render_plane(0, &regs, &vram, &solid_char_rom(), &mut layers);
        assert_eq!(layers[1].pixel(0, 0).bank0(), Trgb1555(0x03e0));
    }

    #[test]
    fn scroll_offsets_shift_the_blit_window() {
        let mut regs = [0u8; 256];
        regs[PLANE_CTRL2_REGISTER[0] as usize] = 0b1000_0100;
        regs[PLANE_PAL_SEL_REGISTER as usize] = 0x01;
        regs[PLANE_X_REGISTER[0] as usize] = 3;
        regs[PLANE_Y_REGISTER[0] as usize] = 5;
        let mut vram = base_vram();
        vram[0] = 0x01;
        vram[1] = 0x00;
        let mut layers = fresh_layers();
        render_plane(0, &regs, &vram, &solid_char_rom(), &mut layers);
        assert!(layers[0].pixel(2, 4).bank0().is_transparent());
        assert_eq!(layers[0].pixel(3, 5).bank0(), Trgb1555(0x001f));
        assert_eq!(layers[0].pixel(10, 12).bank0(), Trgb1555(0x001f));
        assert!(layers[0].pixel(11, 13).bank0().is_transparent());
    }

    #[test]
    fn negative_scroll_offsets_wrap_through_the_sign_bits() {
        let mut regs = [0u8; 256];
        regs[PLANE_CTRL2_REGISTER[0] as usize] = 0b1000_0100;
        regs[PLANE_CTRL1_REGISTER[0] as usize] = 0b0000_0001; // x sign
        regs[PLANE_PAL_SEL_REGISTER as usize] = 0x01;
        regs[PLANE_X_REGISTER[0] as usize] = 250; // effectively -6
        let mut vram = base_vram();
        // fixed mode with a sign bit set reads the second map page
        vram[0x800] = 0x01;
        vram[0x801] = 0x00;
        let mut layers = fresh_layers();
        render_plane(0, &regs, &vram, &solid_char_rom(), &mut layers);
        assert_eq!(layers[0].pixel(0, 0).bank0(), Trgb1555(0x001f));
        assert_eq!(layers[0].pixel(1, 7).bank0(), Trgb1555(0x001f));
        assert!(layers[0].pixel(2, 0).bank0().is_transparent());
    }
}
