mod common;

use common::{HostAction, OPEN_BUS, Op, ScriptedCpu, ScriptedHost, config, machine, machine_with};
use emu_core::{Lanes, Observable, Value};
use machine_32x::{CoreId, M32x, M32xConfig, NoHost};

const ADAPTER_CONTROL: u32 = 0xA1_5100;

#[test]
fn unmapped_internal_reads_return_the_prior_value() {
    let master = ScriptedCpu::new([
        Op::Read(0x0500_0000),
        Op::Read(0x2000_40FE),
        Op::Read(0x0200_0000),
    ]);
    let mut m32x = machine(master, ScriptedCpu::idle());
    m32x.run_for(&mut NoHost, 100);

    let reads = &m32x.core(CoreId::Master).cpu.reads;
    assert_eq!(reads.len(), 3);
    for &(address, value) in reads {
        assert_eq!(value, OPEN_BUS, "{address:08X}");
    }
}

#[test]
fn communication_ports_cross_between_host_and_cores() {
    let master = ScriptedCpu::new([Op::Write(0x2000_4020, 0x4D53), Op::Idle(200), Op::Read(0x2000_4024)]);
    let slave = ScriptedCpu::new([Op::Idle(400), Op::Read(0x2000_4020)]);
    let mut host = ScriptedHost::new().at(100, HostAction::Write(0xA1_5124, 0x0042));
    let mut m32x = machine(master, slave);
    m32x.run_for(&mut host, 1_000);

    assert_eq!(m32x.core(CoreId::Master).cpu.reads_of(0x2000_4024), vec![0x0042]);
    assert_eq!(m32x.core(CoreId::Slave).cpu.reads_of(0x2000_4020), vec![0x4D53]);
    assert_eq!(m32x.read_external(Lanes::WORD, 0xA1_5120, 0), 0x4D53);
    assert_eq!(m32x.query("comm.2"), Some(Value::U16(0x0042)));
}

#[test]
fn cartridge_passes_through_until_the_adapter_is_enabled() {
    let mut cartridge = vec![0u8; 0x1000];
    cartridge[0x100] = 0x53;
    cartridge[0x101] = 0x45;
    let config = M32xConfig {
        cartridge,
        vector_rom: vec![0xAA; 0x100],
        ..config()
    };
    let mut m32x = M32x::new(&config, ScriptedCpu::idle(), ScriptedCpu::idle()).expect("valid");

    assert_eq!(m32x.read_external(Lanes::WORD, 0x00_0000, 0), 0x0000);
    assert_eq!(m32x.read_external(Lanes::WORD, 0x00_0100, 0), 0x5345);
    assert_eq!(m32x.read_external(Lanes::WORD, 0x84_0000, 0x1234), 0x1234);

    m32x.write_external(Lanes::WORD, ADAPTER_CONTROL, 0x0001);
    assert_eq!(m32x.read_external(Lanes::WORD, 0x00_0000, 0), 0xAAAA);
    assert_eq!(m32x.read_external(Lanes::WORD, 0x88_0100, 0), 0x5345);
    assert_eq!(m32x.query("adapter.enabled"), Some(Value::Bool(true)));
}

#[test]
fn cores_stay_in_reset_until_released() {
    let master = ScriptedCpu::new([Op::Write(0x2000_4020, 0x0001)]);
    let mut m32x = M32x::new(&config(), master, ScriptedCpu::idle()).expect("valid");
    m32x.write_external(Lanes::WORD, ADAPTER_CONTROL, 0x0001);
    m32x.run_for(&mut NoHost, 5_000);

    assert_eq!(m32x.query("master.in_reset"), Some(Value::Bool(true)));
    assert_eq!(m32x.query("slave.in_reset"), Some(Value::Bool(true)));
    assert_eq!(m32x.query("comm.0"), Some(Value::U16(0)));

    m32x.write_external(Lanes::WORD, ADAPTER_CONTROL, 0x0003);
    m32x.run_for(&mut NoHost, 2_000);
    assert_eq!(m32x.query("master.in_reset"), Some(Value::Bool(false)));
    assert_eq!(m32x.query("comm.0"), Some(Value::U16(1)));
}

#[test]
fn boot_rom_is_private_per_core() {
    let config = M32xConfig {
        master_boot_rom: vec![0x4D; 0x800],
        slave_boot_rom: vec![0x53; 0x800],
        ..config()
    };
    let mut m32x = machine_with(
        &config,
        ScriptedCpu::new([Op::Read(0x0000_0010)]),
        ScriptedCpu::new([Op::Read(0x2000_0010)]),
    );
    m32x.run_for(&mut NoHost, 100);

    assert_eq!(m32x.core(CoreId::Master).cpu.reads_of(0x0000_0010), vec![0x4D4D]);
    assert_eq!(m32x.core(CoreId::Slave).cpu.reads_of(0x2000_0010), vec![0x5353]);
}
