use crate::error::BreakpointError;

/// Parse a number the way persisted records write them: `XXXXH` for hex, otherwise decimal
pub fn read_integer(text: &str) -> Result<u32, BreakpointError> {
    let text = text.trim();
    let result = match text.strip_suffix(['H', 'h']) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => text.parse::<u32>(),
    };
    result.map_err(|_| BreakpointError::InvalidNumber(text.to_string()))
}

/// Parse a hex number typed by the user, with or without a trailing `H` or leading `0x`
pub fn parse_hex(text: &str) -> Result<u32, BreakpointError> {
    let text = text.trim();
    let digits = text.strip_suffix(['H', 'h']).unwrap_or(text);
    let digits = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")).unwrap_or(digits);
    u32::from_str_radix(digits, 16).map_err(|_| BreakpointError::InvalidNumber(text.to_string()))
}

pub fn parse_hex_u16(text: &str) -> Result<u16, BreakpointError> {
    narrow_u16(parse_hex(text)?)
}

pub fn parse_hex_u8(text: &str) -> Result<u8, BreakpointError> {
    narrow_u8(parse_hex(text)?)
}

pub fn narrow_u16(value: u32) -> Result<u16, BreakpointError> {
    u16::try_from(value).map_err(|_| BreakpointError::OutOfRange { value, bits: 16 })
}

pub fn narrow_u8(value: u32) -> Result<u8, BreakpointError> {
    u8::try_from(value).map_err(|_| BreakpointError::OutOfRange { value, bits: 8 })
}
