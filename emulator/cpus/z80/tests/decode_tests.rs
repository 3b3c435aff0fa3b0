use zwatch_z80::{
    decode_instruction, Condition, DecodeError, IndexRegister, IndexRegisterHalf, Instruction, InterruptMode, LoadTarget, Register, RegisterPair,
    Target,
};

fn run_decode_test(data: &[u8]) -> Result<(Instruction, u16), DecodeError> {
    decode_instruction(data, 0x0000)
}

#[test]
fn run_all_decode_tests() {
    let mut failures = vec![];

    for (data, expected_instruction, expected_length) in DECODE_TESTS {
        match run_decode_test(data) {
            Ok((instruction, length)) if instruction == *expected_instruction && length == *expected_length => {},
            result => failures.push((data, result, expected_instruction, expected_length)),
        }
    }

    let fails = failures.len();
    for (data, result, expected_instruction, expected_length) in failures {
        println!(
            "for {:?}\nexpected:\t{:?} ({} bytes)\nreceived:\t{:?}\n",
            data, expected_instruction, expected_length, result
        );
    }

    if fails > 0 {
        panic!("{} decode tests failed", fails);
    }
}

#[test]
fn truncated_instructions_are_reported() {
    let tests: &[&[u8]] = &[&[], &[0x01, 0x00], &[0xDD], &[0xDD, 0xCB, 0x05], &[0xED], &[0xCD, 0x00]];
    for data in tests {
        assert_eq!(
            run_decode_test(data),
            Err(DecodeError::Truncated {
                start: 0x0000,
                available: data.len()
            }),
            "for {:?}",
            data
        );
    }
}

#[test]
fn decoding_is_independent_of_the_start_address() {
    let data = [0xDD, 0x36, 0xFE, 0x7F];
    let (instruction, length) = decode_instruction(&data, 0xFFFE).unwrap();
    assert_eq!(
        instruction,
        Instruction::LD(LoadTarget::IndirectOffsetByte(IndexRegister::IX, -2), LoadTarget::ImmediateByte(0x7F))
    );
    assert_eq!(length, 4);
}

#[test]
fn every_opcode_on_every_page_decodes() {
    let pages: &[&[u8]] = &[&[], &[0xCB], &[0xDD], &[0xED], &[0xFD], &[0xDD, 0xCB, 0x10], &[0xFD, 0xCB, 0xF0]];
    for page in pages {
        for opcode in 0..=0xFFu8 {
            let mut data = page.to_vec();
            data.extend_from_slice(&[opcode, 0x34, 0x12, 0x00]);
            let (_, length) = run_decode_test(&data).unwrap();
            assert!(length as usize > page.len() && length <= 4, "for {:02x?} got length {}", &data[..page.len() + 1], length);
        }
    }
}

#[rustfmt::skip]
const DECODE_TESTS: &[(&[u8], Instruction, u16)] = &[
    (&[0x00],                   Instruction::NOP, 1),
    (&[0x01, 0x01, 0x02],       Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::BC), LoadTarget::ImmediateWord(0x0201)), 3),
    (&[0x02],                   Instruction::LD(LoadTarget::IndirectRegByte(RegisterPair::BC), LoadTarget::DirectRegByte(Register::A)), 1),
    (&[0x03],                   Instruction::INC16(RegisterPair::BC), 1),
    (&[0x04],                   Instruction::INC8(Target::DirectReg(Register::B)), 1),
    (&[0x05],                   Instruction::DEC8(Target::DirectReg(Register::B)), 1),
    (&[0x1A],                   Instruction::LD(LoadTarget::DirectRegByte(Register::A), LoadTarget::IndirectRegByte(RegisterPair::DE)), 1),
    (&[0x22, 0x00, 0x40],       Instruction::LD(LoadTarget::IndirectWord(0x4000), LoadTarget::DirectRegWord(RegisterPair::HL)), 3),
    (&[0x32, 0x34, 0x12],       Instruction::LD(LoadTarget::IndirectByte(0x1234), LoadTarget::DirectRegByte(Register::A)), 3),
    (&[0x34],                   Instruction::INC8(Target::IndirectReg(RegisterPair::HL)), 1),
    (&[0x36, 0x55],             Instruction::LD(LoadTarget::IndirectRegByte(RegisterPair::HL), LoadTarget::ImmediateByte(0x55)), 2),
    (&[0x76],                   Instruction::HALT, 1),
    (&[0x86],                   Instruction::ADDa(Target::IndirectReg(RegisterPair::HL)), 1),
    (&[0xC0],                   Instruction::RETcc(Condition::NotZero), 1),
    (&[0xC5],                   Instruction::PUSH(RegisterPair::BC), 1),
    (&[0xCD, 0x00, 0x80],       Instruction::CALL(0x8000), 3),
    (&[0xD3, 0x78],             Instruction::OUTx(0x78), 2),
    (&[0xE3],                   Instruction::EXsp(RegisterPair::HL), 1),
    (&[0xF1],                   Instruction::POP(RegisterPair::AF), 1),
    (&[0xFF],                   Instruction::RST(0x38), 1),

    (&[0xCB, 0x06],             Instruction::RLC(Target::IndirectReg(RegisterPair::HL), None), 2),
    (&[0xCB, 0x46],             Instruction::BIT(0, Target::IndirectReg(RegisterPair::HL)), 2),
    (&[0xCB, 0xFE],             Instruction::SET(7, Target::IndirectReg(RegisterPair::HL), None), 2),

    (&[0xDD, 0x09],             Instruction::ADD16(RegisterPair::IX, RegisterPair::BC), 2),
    (&[0xDD, 0x22, 0x00, 0x50], Instruction::LD(LoadTarget::IndirectWord(0x5000), LoadTarget::DirectRegWord(RegisterPair::IX)), 4),
    (&[0xDD, 0x44],             Instruction::LD(LoadTarget::DirectRegByte(Register::B), LoadTarget::DirectRegHalfByte(IndexRegisterHalf::IXH)), 2),
    (&[0xDD, 0x66, 0x12],       Instruction::LD(LoadTarget::DirectRegByte(Register::H), LoadTarget::IndirectOffsetByte(IndexRegister::IX, 0x12)), 3),
    (&[0xDD, 0x6E, 0x12],       Instruction::LD(LoadTarget::DirectRegByte(Register::L), LoadTarget::IndirectOffsetByte(IndexRegister::IX, 0x12)), 3),
    (&[0xDD, 0x77, 0xFF],       Instruction::LD(LoadTarget::IndirectOffsetByte(IndexRegister::IX, -1), LoadTarget::DirectRegByte(Register::A)), 3),
    (&[0xDD, 0x84],             Instruction::ADDa(Target::DirectRegHalf(IndexRegisterHalf::IXH)), 2),
    (&[0xDD, 0x85],             Instruction::ADDa(Target::DirectRegHalf(IndexRegisterHalf::IXL)), 2),
    (&[0xDD, 0xE5],             Instruction::PUSH(RegisterPair::IX), 2),
    (&[0xFD, 0x35, 0x03],       Instruction::DEC8(Target::IndirectOffset(IndexRegister::IY, 3)), 3),
    (&[0xFD, 0xE3],             Instruction::EXsp(RegisterPair::IY), 2),

    (&[0xDD, 0xCB, 0x05, 0x06], Instruction::RLC(Target::IndirectOffset(IndexRegister::IX, 5), None), 4),
    (&[0xFD, 0xCB, 0xFE, 0x8E], Instruction::RES(1, Target::IndirectOffset(IndexRegister::IY, -2), None), 4),
    (&[0xFD, 0xCB, 0x01, 0xC7], Instruction::SET(0, Target::IndirectOffset(IndexRegister::IY, 1), Some(Target::DirectReg(Register::A))), 4),

    (&[0xED, 0x43, 0x00, 0x60], Instruction::LD(LoadTarget::IndirectWord(0x6000), LoadTarget::DirectRegWord(RegisterPair::BC)), 4),
    (&[0xED, 0x78],             Instruction::INic(Register::A), 2),
    (&[0xED, 0x71],             Instruction::OUTicz, 2),
    (&[0xED, 0x6F],             Instruction::RLD, 2),
    (&[0xED, 0xB0],             Instruction::LDIR, 2),
    (&[0xED, 0xA3],             Instruction::OUTI, 2),
    (&[0xED, 0x00],             Instruction::NOP, 2),
    (&[0xED, 0x4D],             Instruction::RETI, 2),
    (&[0xED, 0x5E],             Instruction::IM(InterruptMode::Mode2), 2),
    (&[0xED, 0x4B, 0x00, 0x70], Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::BC), LoadTarget::IndirectWord(0x7000)), 4),
    (&[0xED, 0xBB],             Instruction::OTDR, 2),

    (&[0xDD, 0x21, 0x34, 0x12], Instruction::LD(LoadTarget::DirectRegWord(RegisterPair::IX), LoadTarget::ImmediateWord(0x1234)), 4),
    (&[0xDD, 0x29],             Instruction::ADD16(RegisterPair::IX, RegisterPair::IX), 2),
    (&[0xFD, 0x2C],             Instruction::INC8(Target::DirectRegHalf(IndexRegisterHalf::IYL)), 2),
    (&[0xDD, 0x65],             Instruction::LD(LoadTarget::DirectRegHalfByte(IndexRegisterHalf::IXH), LoadTarget::DirectRegHalfByte(IndexRegisterHalf::IXL)), 2),
    (&[0xDD, 0x74, 0x02],       Instruction::LD(LoadTarget::IndirectOffsetByte(IndexRegister::IX, 2), LoadTarget::DirectRegByte(Register::H)), 3),
    (&[0xDD, 0x76],             Instruction::HALT, 2),
    (&[0xFD, 0x7E, 0x00],       Instruction::LD(LoadTarget::DirectRegByte(Register::A), LoadTarget::IndirectOffsetByte(IndexRegister::IY, 0)), 3),
    (&[0xDD, 0x47],             Instruction::LD(LoadTarget::DirectRegByte(Register::B), LoadTarget::DirectRegByte(Register::A)), 2),
    (&[0xDD, 0xC9],             Instruction::RET, 2),
];
