use zwatch_z80::{Access, CpuView, Effect, EffectKind, EffectPredictor, MemorySnapshot, RegisterPair, Z80State};

const fn mr(address: u16, value: u8) -> Effect {
    Effect::memory(address, Access::Read, Some(value))
}

const fn mw(address: u16, value: u8) -> Effect {
    Effect::memory(address, Access::Write, Some(value))
}

const fn pr(address: u16) -> Effect {
    Effect::port(address, Access::Read, None)
}

const fn pw(address: u16, value: u8) -> Effect {
    Effect::port(address, Access::Write, Some(value))
}

/// A = 07, F = 00, BC = 0178, DE = 3000, HL = 4000, IX = 5000, IY = 6000, SP = 8000, PC = 0100
fn init_predict_test() -> MemorySnapshot {
    let mut state = Z80State {
        pc: 0x0100,
        sp: 0x8000,
        ix: 0x5000,
        iy: 0x6000,
        ..Default::default()
    };
    state.set_register_pair(RegisterPair::AF, 0x0700);
    state.set_register_pair(RegisterPair::BC, 0x0178);
    state.set_register_pair(RegisterPair::DE, 0x3000);
    state.set_register_pair(RegisterPair::HL, 0x4000);

    let mut snapshot = MemorySnapshot::new(state);
    snapshot.load(0x2000, &[0x99]);
    snapshot.load(0x4000, &[0x81, 0x42]);
    snapshot.load(0x5005, &[0x81]);
    snapshot.load(0x5FFE, &[0x83]);
    snapshot.load(0x6003, &[0x0F]);
    snapshot.load(0x8000, &[0x34, 0x12]);
    snapshot
}

fn run_predict_test(snapshot: &mut MemorySnapshot, data: &[u8]) -> Vec<Effect> {
    let pc = snapshot.state().pc;
    snapshot.load(pc, data);
    let ops = snapshot.prefetch();
    EffectPredictor::predict(&ops, &*snapshot)
}

#[test]
fn run_all_predict_tests() {
    let mut failures = vec![];

    for (data, expected) in PREDICT_TESTS {
        let mut snapshot = init_predict_test();
        let effects = run_predict_test(&mut snapshot, data);
        if effects != *expected {
            failures.push((data, effects, expected));
        }
    }

    let fails = failures.len();
    for (data, effects, expected) in failures {
        println!("for {:02x?}\nexpected:\t{:?}\nreceived:\t{:?}\n", data, expected, effects);
    }

    if fails > 0 {
        panic!("{} predict tests failed", fails);
    }
}

#[test]
fn instructions_without_bus_access_predict_nothing() {
    for data in NO_EFFECT_TESTS {
        let mut snapshot = init_predict_test();
        let effects = run_predict_test(&mut snapshot, data);
        assert!(effects.is_empty(), "for {:02x?} received {:?}", data, effects);
    }
}

#[test]
fn every_byte_sequence_is_handled() {
    let snapshot = init_predict_test();
    for prefix in [None, Some(0xCB), Some(0xDD), Some(0xED), Some(0xFD)] {
        for op in 0..=0xFF_u8 {
            let mut ops = vec![];
            ops.extend(prefix);
            ops.push(op);
            ops.extend([0x05, 0x06, 0x07]);
            let _ = EffectPredictor::predict(&ops[..4], &snapshot);
            let _ = EffectPredictor::predict(&ops[..2], &snapshot);
        }
    }
}

#[test]
fn store_word_writes_low_byte_first() {
    let mut snapshot = init_predict_test();
    snapshot.state.set_register_pair(RegisterPair::HL, 0x1234);
    let effects = run_predict_test(&mut snapshot, &[0x22, 0x00, 0x40]);
    assert_eq!(effects, vec![mw(0x4000, 0x34), mw(0x4001, 0x12)]);
}

#[test]
fn indexed_and_stack_addresses_wrap() {
    let mut snapshot = init_predict_test();
    snapshot.state.ix = 0xFFFF;
    let effects = run_predict_test(&mut snapshot, &[0xDD, 0x77, 0x01]);
    assert_eq!(effects, vec![mw(0x0000, 0x07)]);

    let mut snapshot = init_predict_test();
    snapshot.state.sp = 0x0000;
    let effects = run_predict_test(&mut snapshot, &[0xC5]);
    assert_eq!(effects, vec![mw(0xFFFF, 0x01), mw(0xFFFE, 0x78)]);
}

#[test]
fn outi_uses_the_decremented_b_register() {
    let mut snapshot = init_predict_test();
    snapshot.state.set_register_pair(RegisterPair::BC, 0x0010);
    let effects = run_predict_test(&mut snapshot, &[0xED, 0xA3]);
    assert_eq!(effects, vec![mr(0x4000, 0x81), pw(0xFF10, 0x81)]);
    assert_eq!(snapshot.state.get_register_pair(RegisterPair::BC), 0x0010);
}

#[test]
fn rotates_through_carry_use_the_carry_flag() {
    let mut snapshot = init_predict_test();
    snapshot.state.set_register_pair(RegisterPair::AF, 0x0701);
    let effects = run_predict_test(&mut snapshot, &[0xCB, 0x16]);
    assert_eq!(effects, vec![mr(0x4000, 0x81), mw(0x4000, 0x03)]);
}

#[test]
fn input_block_writes_an_unknown_value() {
    let mut snapshot = init_predict_test();
    let effects = run_predict_test(&mut snapshot, &[0xED, 0xB2]);
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[0], pr(0x0178));
    assert_eq!(effects[1].kind, EffectKind::Memory);
    assert_eq!(effects[1].address, 0x4000);
    assert_eq!(effects[1].access, Access::Write);
    assert_eq!(effects[1].value, None);
}

#[test]
fn prediction_does_not_touch_the_snapshot() {
    let mut snapshot = init_predict_test();
    snapshot.load(0x0100, &[0xDD, 0xCB, 0x05, 0x06]);
    let before = snapshot.clone();
    let ops = snapshot.prefetch();
    let prediction = EffectPredictor::analyze(&ops, &snapshot).unwrap();
    assert_eq!(prediction.length, 4);
    assert_eq!(prediction.effects, vec![mr(0x5005, 0x81), mw(0x5005, 0x03)]);
    assert_eq!(snapshot.state, before.state);
    assert_eq!(snapshot.memory(), before.memory());
}

#[rustfmt::skip]
const PREDICT_TESTS: &[(&[u8], &[Effect])] = &[
    // direct and register indirect loads
    (&[0x02],                   &[mw(0x0178, 0x07)]),
    (&[0x12],                   &[mw(0x3000, 0x07)]),
    (&[0x0A],                   &[mr(0x0178, 0x00)]),
    (&[0x1A],                   &[mr(0x3000, 0x00)]),
    (&[0x22, 0x00, 0x20],       &[mw(0x2000, 0x00), mw(0x2001, 0x40)]),
    (&[0x2A, 0x00, 0x40],       &[mr(0x4000, 0x81), mr(0x4001, 0x42)]),
    (&[0x32, 0x34, 0x12],       &[mw(0x1234, 0x07)]),
    (&[0x3A, 0x00, 0x20],       &[mr(0x2000, 0x99)]),
    (&[0x34],                   &[mr(0x4000, 0x81), mw(0x4000, 0x82)]),
    (&[0x35],                   &[mr(0x4000, 0x81), mw(0x4000, 0x80)]),
    (&[0x36, 0x55],             &[mw(0x4000, 0x55)]),
    (&[0x46],                   &[mr(0x4000, 0x81)]),
    (&[0x70],                   &[mw(0x4000, 0x01)]),
    (&[0x77],                   &[mw(0x4000, 0x07)]),
    (&[0x86],                   &[mr(0x4000, 0x81)]),
    (&[0xBE],                   &[mr(0x4000, 0x81)]),

    // stack
    (&[0xC5],                   &[mw(0x7FFF, 0x01), mw(0x7FFE, 0x78)]),
    (&[0xE5],                   &[mw(0x7FFF, 0x40), mw(0x7FFE, 0x00)]),
    (&[0xF5],                   &[mw(0x7FFF, 0x07), mw(0x7FFE, 0x00)]),
    (&[0xC1],                   &[mr(0x8000, 0x34), mr(0x8001, 0x12)]),
    (&[0xC9],                   &[mr(0x8000, 0x34), mr(0x8001, 0x12)]),
    (&[0xC0],                   &[mr(0x8000, 0x34), mr(0x8001, 0x12)]),
    (&[0xC8],                   &[]),
    (&[0xCD, 0x00, 0x90],       &[mw(0x7FFF, 0x01), mw(0x7FFE, 0x03)]),
    (&[0xC4, 0x00, 0x90],       &[mw(0x7FFF, 0x01), mw(0x7FFE, 0x03)]),
    (&[0xCC, 0x00, 0x90],       &[]),
    (&[0xFF],                   &[mw(0x7FFF, 0x01), mw(0x7FFE, 0x01)]),
    (&[0xE3],                   &[mr(0x8000, 0x34), mr(0x8001, 0x12), mw(0x8000, 0x00), mw(0x8001, 0x40)]),

    // ports
    (&[0xD3, 0x78],             &[pw(0x0778, 0x07)]),
    (&[0xDB, 0xFE],             &[pr(0x07FE)]),

    // CB rotates, shifts and bit operations on (HL)
    (&[0xCB, 0x06],             &[mr(0x4000, 0x81), mw(0x4000, 0x03)]),
    (&[0xCB, 0x0E],             &[mr(0x4000, 0x81), mw(0x4000, 0xC0)]),
    (&[0xCB, 0x16],             &[mr(0x4000, 0x81), mw(0x4000, 0x02)]),
    (&[0xCB, 0x1E],             &[mr(0x4000, 0x81), mw(0x4000, 0x40)]),
    (&[0xCB, 0x26],             &[mr(0x4000, 0x81), mw(0x4000, 0x02)]),
    (&[0xCB, 0x2E],             &[mr(0x4000, 0x81), mw(0x4000, 0xC0)]),
    (&[0xCB, 0x36],             &[mr(0x4000, 0x81), mw(0x4000, 0x03)]),
    (&[0xCB, 0x3E],             &[mr(0x4000, 0x81), mw(0x4000, 0x40)]),
    (&[0xCB, 0x46],             &[mr(0x4000, 0x81)]),
    (&[0xCB, 0x86],             &[mr(0x4000, 0x81), mw(0x4000, 0x80)]),
    (&[0xCB, 0xEE],             &[mr(0x4000, 0x81), mw(0x4000, 0xA1)]),
    (&[0xCB, 0xFE],             &[mr(0x4000, 0x81), mw(0x4000, 0x81)]),

    // DD and FD indexed
    (&[0xDD, 0x7E, 0x05],       &[mr(0x5005, 0x81)]),
    (&[0xDD, 0x77, 0xFF],       &[mw(0x4FFF, 0x07)]),
    (&[0xDD, 0x36, 0x05, 0x7F], &[mw(0x5005, 0x7F)]),
    (&[0xDD, 0x34, 0x05],       &[mr(0x5005, 0x81), mw(0x5005, 0x82)]),
    (&[0xFD, 0x86, 0x03],       &[mr(0x6003, 0x0F)]),
    (&[0xFD, 0x35, 0x03],       &[mr(0x6003, 0x0F), mw(0x6003, 0x0E)]),
    (&[0xDD, 0x22, 0x00, 0x20], &[mw(0x2000, 0x00), mw(0x2001, 0x50)]),
    (&[0xDD, 0xE5],             &[mw(0x7FFF, 0x50), mw(0x7FFE, 0x00)]),
    (&[0xFD, 0xE1],             &[mr(0x8000, 0x34), mr(0x8001, 0x12)]),
    (&[0xDD, 0xE3],             &[mr(0x8000, 0x34), mr(0x8001, 0x12), mw(0x8000, 0x00), mw(0x8001, 0x50)]),

    // DD CB and FD CB
    (&[0xDD, 0xCB, 0x05, 0x06], &[mr(0x5005, 0x81), mw(0x5005, 0x03)]),
    (&[0xDD, 0xCB, 0x05, 0x46], &[mr(0x5005, 0x81)]),
    (&[0xDD, 0xCB, 0x05, 0x3F], &[mr(0x5005, 0x81), mw(0x5005, 0x40)]),
    (&[0xFD, 0xCB, 0xFE, 0x8E], &[mr(0x5FFE, 0x83), mw(0x5FFE, 0x81)]),
    (&[0xFD, 0xCB, 0x03, 0xE6], &[mr(0x6003, 0x0F), mw(0x6003, 0x1F)]),

    // ED
    (&[0xED, 0x43, 0x00, 0x20], &[mw(0x2000, 0x78), mw(0x2001, 0x01)]),
    (&[0xED, 0x7B, 0x00, 0x40], &[mr(0x4000, 0x81), mr(0x4001, 0x42)]),
    (&[0xED, 0x79],             &[pw(0x0178, 0x07)]),
    (&[0xED, 0x41],             &[pw(0x0178, 0x01)]),
    (&[0xED, 0x71],             &[pw(0x0178, 0x00)]),
    (&[0xED, 0x78],             &[pr(0x0178)]),
    (&[0xED, 0x70],             &[pr(0x0178)]),
    (&[0xED, 0xA0],             &[mr(0x4000, 0x81), mw(0x3000, 0x81)]),
    (&[0xED, 0xB8],             &[mr(0x4000, 0x81), mw(0x3000, 0x81)]),
    (&[0xED, 0xA1],             &[mr(0x4000, 0x81)]),
    (&[0xED, 0xA3],             &[mr(0x4000, 0x81), pw(0x0078, 0x81)]),
    (&[0xED, 0xBB],             &[mr(0x4000, 0x81), pw(0x0078, 0x81)]),
    (&[0xED, 0x6F],             &[mr(0x4000, 0x81), mw(0x4000, 0x17)]),
    (&[0xED, 0x67],             &[mr(0x4000, 0x81), mw(0x4000, 0x78)]),
    (&[0xED, 0x4D],             &[mr(0x8000, 0x34), mr(0x8001, 0x12)]),
];

#[rustfmt::skip]
const NO_EFFECT_TESTS: &[&[u8]] = &[
    &[0x00],
    &[0x08],
    &[0x10, 0xFE],
    &[0x18, 0x05],
    &[0x3E, 0x12],
    &[0x76],
    &[0xC3, 0x00, 0x00],
    &[0xD9],
    &[0xE9],
    &[0xEB],
    &[0xFB],
    &[0xCB, 0x00],
    &[0xDD, 0x00],
    &[0xDD, 0xE9],
    &[0xED, 0x00],
    &[0xED, 0x47],
    &[0xED, 0xFF],
    &[0xFD, 0x21, 0x00, 0x10],
];
