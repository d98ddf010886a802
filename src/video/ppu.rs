use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::error;

use crate::memory::PhysicalMemory;
use crate::video::registers::Control;
use crate::video::renderer::Renderer;
use crate::video::{
    CONTROL_REGISTER, SCREEN_HEIGHT, SCREEN_WIDTH, SPRAM_ADDR_LSB_REGISTER,
    SPRAM_ADDR_MSB_REGISTER, SPRAM_DATA_REGISTER, SPRAM_SIZE, SPRITE_SLOT_SIZE, STATUS_REGISTER,
    VRAM_ADDR_LSB_REGISTER, VRAM_ADDR_MSB_REGISTER, VRAM_DATA_REGISTER, VRAM_SIZE,
};

/// Frame and blanking lengths, in CPU clocks.
#[derive(Clone, Copy, Debug)]
pub struct VideoTiming {
    pub vblank_start: u32,
    pub vblank_len: u32,
    pub frame_len: u32,
}

impl Default for VideoTiming {
    /// PAL timing.
    fn default() -> VideoTiming {
        VideoTiming {
            vblank_start: 0,
            vblank_len: 22036,
            frame_len: 106392,
        }
    }
}

pub(crate) enum RenderCommand {
    Frame,
    Stop,
}

/// State both sides touch: the CPU-facing ports write it, the render thread
/// snapshots it at the start of every frame and publishes the finished
/// picture back through `output`.
pub(crate) struct Shared {
    pub(crate) regs: Mutex<[u8; 256]>,
    pub(crate) vram: Mutex<Vec<u8>>,
    pub(crate) spram: Mutex<Vec<u8>>,
    pub(crate) output: Mutex<Vec<u32>>,
    pub(crate) render_done: AtomicBool,
}

/// The picture processing unit. Register and video-memory ports live on this
/// handle; a worker thread renders each frame when `tick` crosses the end of
/// the blanking interval, and `frame` exposes the finished picture once
/// `is_render_done` reports true.
pub struct Ppu {
    shared: Arc<Shared>,
    commands: Sender<RenderCommand>,
    worker: Option<JoinHandle<()>>,
    timing: VideoTiming,
    ticks: u32,
    /// Slot for the CPU core's vblank interrupt callback. Held so the CPU
    /// can subscribe; nothing fires it yet.
    pub nmi_hook: Option<Box<dyn FnMut() + Send>>,
}

impl Ppu {
    pub fn new(mem: Arc<dyn PhysicalMemory>) -> Ppu {
        Ppu::with_timing(mem, VideoTiming::default())
    }

    pub fn with_timing(mem: Arc<dyn PhysicalMemory>, timing: VideoTiming) -> Ppu {
        let shared = Arc::new(Shared {
            regs: Mutex::new([0; 256]),
            vram: Mutex::new(vec![0; VRAM_SIZE]),
            spram: Mutex::new(vec![0; SPRAM_SIZE]),
            output: Mutex::new(vec![0; SCREEN_WIDTH * SCREEN_HEIGHT]),
            render_done: AtomicBool::new(false),
        });
        let (commands, receiver) = mpsc::channel();
        let renderer = Renderer::new(shared.clone(), mem);
        let worker = thread::spawn(move || renderer.run(receiver));
        Ppu {
            shared,
            commands,
            worker: Some(worker),
            timing,
            ticks: 0,
            nmi_hook: None,
        }
    }

    /// Read a PPU register from the CPU side. The data ports read through
    /// their address pointers without advancing them.
    pub fn read(&self, address: u8) -> u8 {
        match address {
            SPRAM_DATA_REGISTER => {
                let regs = self.shared.regs.lock().unwrap();
                let addr = spram_addr(&regs);
                self.shared.spram.lock().unwrap()[addr]
            }
            VRAM_DATA_REGISTER => {
                let regs = self.shared.regs.lock().unwrap();
                let addr = vram_addr(&regs);
                self.shared.vram.lock().unwrap()[addr]
            }
            STATUS_REGISTER => {
                // On the real part this read also acknowledges the vblank
                // IRQ; there is no IRQ line to clear here yet.
                (self.is_vblank() as u8) << 7
            }
            _ => self.shared.regs.lock().unwrap()[address as usize],
        }
    }

    /// Write a PPU register from the CPU side. The SPRAM data port steps its
    /// pointer over each slot's two pad bytes; the VRAM data port steps
    /// linearly through the 13-bit space.
    pub fn write(&mut self, address: u8, data: u8) {
        let mut regs = self.shared.regs.lock().unwrap();
        match address {
            SPRAM_DATA_REGISTER => {
                let mut addr = spram_addr(&regs);
                self.shared.spram.lock().unwrap()[addr] = data;
                addr += 1;
                if (addr & 0x07) >= SPRITE_SLOT_SIZE - 2 {
                    addr = (addr & !0x07) + SPRITE_SLOT_SIZE;
                }
                regs[SPRAM_ADDR_MSB_REGISTER as usize] = (addr >> 8) as u8 & 0x07;
                regs[SPRAM_ADDR_LSB_REGISTER as usize] = addr as u8;
            }
            VRAM_DATA_REGISTER => {
                let mut addr = vram_addr(&regs);
                self.shared.vram.lock().unwrap()[addr] = data;
                addr += 1;
                regs[VRAM_ADDR_MSB_REGISTER as usize] = (addr >> 8) as u8 & 0x1f;
                regs[VRAM_ADDR_LSB_REGISTER as usize] = addr as u8;
            }
            _ => regs[address as usize] = data,
        }
    }

    /// Advance the video counters by one CPU clock. Rendering kicks off on
    /// the clock that leaves the blanking interval.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks >= self.timing.frame_len {
            self.ticks = 0;
            // TODO: fire `nmi_hook` here once the CPU core wires up its
            // interrupt line
        } else if self.ticks == self.timing.vblank_len {
            if self.commands.send(RenderCommand::Frame).is_err() {
                error!("render thread is gone, dropping a frame");
            }
        }
    }

    pub fn is_vblank(&self) -> bool {
        self.ticks >= self.timing.vblank_start && self.ticks < self.timing.vblank_len
    }

    pub fn is_render_done(&self) -> bool {
        self.shared.render_done.load(Ordering::SeqCst)
    }

    pub fn nmi_enabled(&self) -> bool {
        let regs = self.shared.regs.lock().unwrap();
        Control::from(regs[CONTROL_REGISTER as usize]).contains(Control::NMI_ENABLE)
    }

    /// Copy of the last completed frame, ARGB8888, `SCREEN_WIDTH` by
    /// `SCREEN_HEIGHT`.
    pub fn frame(&self) -> Vec<u32> {
        self.shared.output.lock().unwrap().clone()
    }

    /// Ask the worker to exit and wait for it; a frame already underway is
    /// finished first. Runs on drop as well.
    pub fn stop(&mut self) {
        let _ = self.commands.send(RenderCommand::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Ppu {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spram_addr(regs: &[u8; 256]) -> usize {
    (regs[SPRAM_ADDR_MSB_REGISTER as usize] as usize & 0x07) << 8
        | regs[SPRAM_ADDR_LSB_REGISTER as usize] as usize
}

fn vram_addr(regs: &[u8; 256]) -> usize {
    (regs[VRAM_ADDR_MSB_REGISTER as usize] as usize & 0x1f) << 8
        | regs[VRAM_ADDR_LSB_REGISTER as usize] as usize
}
