//! The assembled 32X: two clocked SH-2 cores around one shared bus.

use emu_core::{Lanes, MasterClock, Observable, Ticks, Value};

use crate::bus::SharedBus;
use crate::config::M32xConfig;
use crate::error::ConfigError;
use crate::interrupt::InterruptSource;
use crate::sh2::{ClockedCore, CoreBus, CoreId, CoreOptions, Sh2Interpreter, step_core};
use crate::sync::HostDomain;

pub struct M32x<S> {
    pub(crate) master: ClockedCore<S>,
    pub(crate) slave: ClockedCore<S>,
    pub(crate) shared: SharedBus,
    options: CoreOptions,
    sh2_clock: MasterClock,
}

impl<S: Sh2Interpreter> M32x<S> {
    /// Build a powered-on machine. Both cores start held in reset until
    /// the host sets `RES`.
    pub fn new(config: &M32xConfig, master_cpu: S, slave_cpu: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            master: ClockedCore::new(CoreId::Master, master_cpu, config.sync),
            slave: ClockedCore::new(CoreId::Slave, slave_cpu, config.sync),
            shared: SharedBus::new(config),
            options: CoreOptions::from_config(config),
            sh2_clock: config.sh2_clock(),
        })
    }

    /// Power cycle. ROM images stay loaded; interpreters are reset when
    /// the adapter next releases them.
    pub fn power(&mut self) {
        self.shared.power();
        self.master.ctx.power(self.options.sync);
        self.slave.ctx.power(self.options.sync);
    }

    /// Run both cores and the shared devices up to `until` SH-2 clocks,
    /// always stepping whichever core is furthest behind.
    pub fn run(&mut self, host: &mut dyn HostDomain, until: Ticks) {
        loop {
            let (behind, ahead) = if self.master.ctx.clock() <= self.slave.ctx.clock() {
                (&mut self.master, &mut self.slave)
            } else {
                (&mut self.slave, &mut self.master)
            };
            if behind.ctx.clock() >= until {
                break;
            }
            let ClockedCore { cpu, ctx } = behind;
            let mut bus = CoreBus::new(&mut self.shared, ctx, Some(ahead), host, self.options);
            step_core(cpu, &mut bus);
        }
        self.shared.advance_to(until);
        host.catch_up(&mut self.shared, until);
    }

    /// Run for `clocks` SH-2 clocks past the slower core.
    pub fn run_for(&mut self, host: &mut dyn HostDomain, clocks: u64) {
        let until = self.clock() + clocks;
        self.run(host, until);
    }

    /// Time both cores have reached.
    #[must_use]
    pub fn clock(&self) -> Ticks {
        self.master.ctx.clock().min(self.slave.ctx.clock())
    }

    #[must_use]
    pub fn sh2_clock(&self) -> MasterClock {
        self.sh2_clock
    }

    #[must_use]
    pub fn core(&self, id: CoreId) -> &ClockedCore<S> {
        match id {
            CoreId::Master => &self.master,
            CoreId::Slave => &self.slave,
        }
    }

    pub fn core_mut(&mut self, id: CoreId) -> &mut ClockedCore<S> {
        match id {
            CoreId::Master => &mut self.master,
            CoreId::Slave => &mut self.slave,
        }
    }

    #[must_use]
    pub fn shared(&self) -> &SharedBus {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedBus {
        &mut self.shared
    }

    // === Host surface outside a run ===

    pub fn read_external(&mut self, lanes: Lanes, address: u32, prior: u16) -> u16 {
        self.shared.read_external(lanes, address, prior)
    }

    pub fn write_external(&mut self, lanes: Lanes, address: u32, data: u16) {
        self.shared.write_external(lanes, address, data);
    }

    pub fn vblank(&mut self, line: bool) {
        self.shared.vblank(line);
    }

    pub fn hblank(&mut self, line: bool) {
        self.shared.hblank(line);
    }

    pub fn raise_vres(&mut self) {
        self.shared.raise_vres();
    }

    /// Render one line of the displayed framebuffer.
    pub fn render_scanline(&mut self, line: u16) -> &[u16] {
        self.shared.vdp.render_scanline(line)
    }

    /// PWM samples produced since the last call.
    pub fn take_audio(&mut self) -> Vec<(i16, i16)> {
        self.shared.pwm.take_buffer()
    }

    /// PWM output rate in Hz, or `None` while the engine is stopped.
    #[must_use]
    pub fn audio_sample_rate(&self) -> Option<u64> {
        let period = self.shared.pwm.period()?;
        Some(self.sh2_clock.cycles_per(u64::from(period)))
    }

    fn query_core(&self, core: &ClockedCore<S>, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("irq.") {
            let (name, field) = rest.split_once('.')?;
            let source = InterruptSource::PRIORITY
                .into_iter()
                .find(|source| source.name() == name)?;
            let latch = self.shared.irq.block(core.ctx.id()).latch(source);
            return match field {
                "active" => Some(latch.active.into()),
                "enable" => Some(latch.enable.into()),
                _ => None,
            };
        }
        if let Some(rest) = path.strip_prefix("dma") {
            let (index, field) = rest.split_once('.')?;
            let channel = match index {
                "0" => &core.ctx.dmac.channels[0],
                "1" => &core.ctx.dmac.channels[1],
                _ => return None,
            };
            return match field {
                "source" => Some(channel.source.into()),
                "destination" => Some(channel.destination.into()),
                "count" => Some(channel.count.into()),
                "enable" => Some(channel.enabled().into()),
                "complete" => Some(channel.complete().into()),
                _ => None,
            };
        }
        match path {
            "pc" => Some(core.cpu.pc().into()),
            "clock" => Some(core.ctx.clock().get().into()),
            "in_reset" => Some(core.ctx.in_reset().into()),
            "boot_rom_mapped" => Some(core.ctx.boot_rom_mapped().into()),
            "cache_enabled" => Some(core.ctx.dmac.cache_enabled().into()),
            "interrupt_mask" => Some(core.cpu.interrupt_mask().into()),
            _ => None,
        }
    }
}

impl<S: Sh2Interpreter> Observable for M32x<S> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("master.") {
            self.query_core(&self.master, rest)
        } else if let Some(rest) = path.strip_prefix("slave.") {
            self.query_core(&self.slave, rest)
        } else if let Some(rest) = path.strip_prefix("vdp.") {
            self.shared.vdp.query(rest)
        } else if let Some(rest) = path.strip_prefix("pwm.") {
            self.shared.pwm.query(rest)
        } else if let Some(rest) = path.strip_prefix("dreq.") {
            let dreq = &self.shared.dreq;
            match rest {
                "active" => Some(dreq.active().into()),
                "rom_to_vram" => Some(dreq.rom_to_vram().into()),
                "fifo_len" => Some((dreq.len() as u8).into()),
                "remaining" => Some(dreq.remaining().into()),
                "master.ready" => Some(dreq.ready(CoreId::Master).into()),
                "slave.ready" => Some(dreq.ready(CoreId::Slave).into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("comm.") {
            let port: usize = rest.parse().ok()?;
            self.shared.registers.communication.get(port).map(|&word| word.into())
        } else {
            let registers = &self.shared.registers;
            match path {
                "clock" => Some(self.clock().get().into()),
                "adapter.enabled" => Some(registers.adapter_enable.into()),
                "adapter.reset" => Some(registers.adapter_reset.into()),
                "rom_bank" => Some(registers.rom_bank.into()),
                "hcount" => Some(registers.htarget.into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "clock",
            "adapter.enabled",
            "adapter.reset",
            "rom_bank",
            "hcount",
            "comm.{0-7}",
            "{master,slave}.pc",
            "{master,slave}.clock",
            "{master,slave}.in_reset",
            "{master,slave}.boot_rom_mapped",
            "{master,slave}.cache_enabled",
            "{master,slave}.interrupt_mask",
            "{master,slave}.irq.{vres,vint,hint,cmd,pwm}.{active,enable}",
            "{master,slave}.dma{0,1}.{source,destination,count,enable,complete}",
            "dreq.active",
            "dreq.rom_to_vram",
            "dreq.fifo_len",
            "dreq.remaining",
            "dreq.{master,slave}.ready",
            "vdp.<vdp_paths>",
            "pwm.<pwm_paths>",
        ]
    }
}
