mod common;

use common::{Op, ScriptedCpu, machine};
use emu_core::{Observable, Ticks};
use machine_32x::bus::SDRAM_WORDS;
use machine_32x::{CoreId, M32x, NoHost, SnapshotError};

const MASK: u32 = 0x2000_4000;
const CLEAR_PWM: u32 = 0x2000_401C;
const COMM0: u32 = 0x2000_4020;

fn workload() -> (ScriptedCpu, ScriptedCpu) {
    let mut master = vec![
        Op::Write(MASK, 0x0001),
        Op::Write(0x2000_4030, 0x0105),
        Op::Write(0x2000_4032, 61),
    ];
    for i in 0..40u16 {
        master.push(Op::Write(0x2600_0000 + u32::from(i) * 2, 0x4000 | i));
        master.push(Op::Idle(37));
    }
    let master = ScriptedCpu::new(master).on(
        67,
        [Op::Write(CLEAR_PWM, 0), Op::Write(COMM0, 0x1111), Op::Return],
    );

    // SM and DM increment, long units, auto-request, DE
    let slave = ScriptedCpu::new([
        Op::Idle(2_500),
        Op::WriteLong(0xFFFF_FF80, 0x2600_0000),
        Op::WriteLong(0xFFFF_FF84, 0x2600_0800),
        Op::WriteLong(0xFFFF_FF88, 16),
        Op::WriteLong(0xFFFF_FF8C, 0x5A01),
        Op::WriteLong(0xFFFF_FFB0, 1),
    ]);
    (master, slave)
}

fn cpus(m32x: &M32x<ScriptedCpu>) -> (ScriptedCpu, ScriptedCpu) {
    (
        m32x.core(CoreId::Master).cpu.clone(),
        m32x.core(CoreId::Slave).cpu.clone(),
    )
}

#[test]
fn restored_machine_runs_identically() {
    let (master, slave) = workload();
    let mut a = machine(master, slave);
    a.run(&mut NoHost, Ticks::new(700));

    let state = a.save_state().expect("save");
    let (master, slave) = cpus(&a);
    let mut b = machine(master, slave);
    b.load_state(&state).expect("load");
    assert_eq!(b.query("master.clock"), a.query("master.clock"));
    assert_eq!(b.query("slave.clock"), a.query("slave.clock"));

    let until = Ticks::new(6_000);
    a.run(&mut NoHost, until);
    b.run(&mut NoHost, until);

    assert_eq!(a.save_state().expect("save"), b.save_state().expect("save"));
    for core in CoreId::ALL {
        assert_eq!(a.core(core).cpu.taken, b.core(core).cpu.taken, "{core}");
    }
    assert!(a.core(CoreId::Master).cpu.count(67) > 0, "workload took no PWM interrupts");
    assert_eq!(a.query("slave.dma0.complete"), Some(true.into()));
    for offset in (0..0x40).step_by(2) {
        let copied = b.shared().sdram_word(0x800 + offset);
        assert_eq!(copied, a.shared().sdram_word(offset), "{offset:X}");
        assert_eq!(copied, 0x4000 | (offset as u16 / 2));
    }
}

#[test]
fn snapshot_is_stable_without_running() {
    let (master, slave) = workload();
    let mut m32x = machine(master, slave);
    m32x.run(&mut NoHost, Ticks::new(1_500));

    let first = m32x.save_state().expect("save");
    m32x.load_state(&first).expect("load");
    assert_eq!(m32x.save_state().expect("save"), first);
}

#[test]
fn rejects_foreign_and_future_snapshots() {
    let mut m32x = machine(ScriptedCpu::idle(), ScriptedCpu::idle());

    assert!(matches!(m32x.load_state(b"NOPE\x01rest"), Err(SnapshotError::BadMagic)));
    assert!(matches!(
        m32x.load_state(b"32XS\x02rest"),
        Err(SnapshotError::UnsupportedVersion(2))
    ));
    assert!(matches!(m32x.load_state(b"32X"), Err(SnapshotError::Io(_))));

    let state = m32x.save_state().expect("save");
    assert!(m32x.load_state(&state[..8]).is_err());
}

fn encode<T: bincode::Encode>(value: T) -> Vec<u8> {
    bincode::encode_to_vec(value, bincode::config::standard()).expect("encode")
}

#[test]
fn rejects_short_memory_arrays() {
    let mut m32x = machine(ScriptedCpu::idle(), ScriptedCpu::idle());
    let state = m32x.save_state().expect("save");

    // SDRAM and the device clock close the payload.
    let clock = encode(m32x.shared().clock());
    let tail = [encode(vec![0u16; SDRAM_WORDS]), clock.clone()].concat();
    assert!(state.ends_with(&tail));
    let mut short = state[..state.len() - tail.len()].to_vec();
    short.extend(encode(vec![0u16; 4]));
    short.extend(clock);

    assert!(matches!(
        m32x.load_state(&short),
        Err(SnapshotError::Malformed("SDRAM"))
    ));
    assert_eq!(m32x.shared().sdram_word(0x100), 0);
    m32x.load_state(&state).expect("load");
}
