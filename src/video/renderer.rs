use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use log::trace;

use crate::memory::PhysicalMemory;
use crate::video::layer::Layer;
use crate::video::ppu::{RenderCommand, Shared};
use crate::video::registers::OutputSelect;
use crate::video::{
    background, compositor, sprite, LAYER_HEIGHT, LAYER_WIDTH, OUTPUT_SEL_REGISTER, SPRAM_SIZE,
    VRAM_SIZE,
};

/// Worker-side frame producer. Owns the four layer buffers and a private
/// snapshot of the PPU state, and lives on the render thread for the life of
/// the PPU.
pub(crate) struct Renderer {
    shared: Arc<Shared>,
    mem: Arc<dyn PhysicalMemory>,
    regs: [u8; 256],
    vram: Vec<u8>,
    spram: Vec<u8>,
    layers: [Layer; 4],
}

impl Renderer {
    pub(crate) fn new(shared: Arc<Shared>, mem: Arc<dyn PhysicalMemory>) -> Renderer {
        Renderer {
            shared,
            mem,
            regs: [0; 256],
            vram: vec![0; VRAM_SIZE],
            spram: vec![0; SPRAM_SIZE],
            layers: std::array::from_fn(|_| Layer::new(LAYER_WIDTH, LAYER_HEIGHT)),
        }
    }

    pub(crate) fn run(mut self, commands: Receiver<RenderCommand>) {
        while let Ok(command) = commands.recv() {
            match command {
                RenderCommand::Frame => self.render_frame(),
                RenderCommand::Stop => break,
            }
        }
        trace!("render thread exiting");
    }

    fn render_frame(&mut self) {
        self.shared.render_done.store(false, Ordering::SeqCst);
        self.snapshot();
        for layer in &mut self.layers {
            layer.clear();
        }
        // Plane 1 first so plane 0 overwrites it on shared layers, sprites
        // over both.
        for plane in (0..2).rev() {
            background::render_plane(plane, &self.regs, &self.vram, &*self.mem, &mut self.layers);
        }
        sprite::render_sprites(
            &self.regs,
            &self.vram,
            &self.spram,
            &*self.mem,
            &mut self.layers,
        );
        {
            let mut out = self.shared.output.lock().unwrap();
            let select = OutputSelect::from(self.regs[OUTPUT_SEL_REGISTER as usize]);
            compositor::merge_layers(&self.layers, select, false, &mut out);
        }
        self.shared.render_done.store(true, Ordering::SeqCst);
        trace!("frame rendered");
    }

    // The CPU is expected to leave video memory alone outside VBLANK; taking
    // a copy here turns that convention into a guarantee that one frame sees
    // one consistent state.
    fn snapshot(&mut self) {
        self.regs.copy_from_slice(&*self.shared.regs.lock().unwrap());
        self.vram.copy_from_slice(&self.shared.vram.lock().unwrap());
        self.spram.copy_from_slice(&self.shared.spram.lock().unwrap());
    }
}
