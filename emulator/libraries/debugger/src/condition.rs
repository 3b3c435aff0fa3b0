use core::fmt;
use core::str::FromStr;

use crate::error::BreakpointError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Less,
    LessOrEqual,
    NotEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Less,
        Operator::LessOrEqual,
        Operator::NotEqual,
        Operator::Equal,
        Operator::GreaterOrEqual,
        Operator::Greater,
    ];

    pub fn compare(self, left: u16, right: u16) -> bool {
        match self {
            Operator::Less => left < right,
            Operator::LessOrEqual => left <= right,
            Operator::NotEqual => left != right,
            Operator::Equal => left == right,
            Operator::GreaterOrEqual => left >= right,
            Operator::Greater => left > right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::NotEqual => "<>",
            Operator::Equal => "=",
            Operator::GreaterOrEqual => ">=",
            Operator::Greater => ">",
        }
    }
}

impl FromStr for Operator {
    type Err = BreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Operator::Less),
            "<=" => Ok(Operator::LessOrEqual),
            "<>" | "!=" => Ok(Operator::NotEqual),
            "=" | "==" => Ok(Operator::Equal),
            ">=" => Ok(Operator::GreaterOrEqual),
            ">" => Ok(Operator::Greater),
            other => Err(BreakpointError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn max_value(self) -> u16 {
        match self {
            Width::Byte => 0x00FF,
            Width::Word => 0xFFFF,
        }
    }
}

/// A `(observed & mask) <op> value` test on an 8 or 16 bit quantity
///
/// A mask of zero never matches.  `value` is not required to lie within `mask`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConditionRule {
    pub mask: u16,
    pub operator: Operator,
    pub value: u16,
    pub width: Width,
}

impl ConditionRule {
    pub fn new(width: Width, mask: u16, operator: Operator, value: u16) -> Self {
        let max = width.max_value();
        Self {
            mask: mask & max,
            operator,
            value: value & max,
            width,
        }
    }

    pub fn byte(mask: u8, operator: Operator, value: u8) -> Self {
        Self::new(Width::Byte, mask as u16, operator, value as u16)
    }

    pub fn word(mask: u16, operator: Operator, value: u16) -> Self {
        Self::new(Width::Word, mask, operator, value)
    }

    /// Test an observed value, which the caller has already truncated to the rule's width
    pub fn evaluate(&self, observed: u16) -> bool {
        if self.mask == 0 {
            return false;
        }
        self.operator.compare(observed & self.mask, self.value)
    }
}

impl fmt::Display for ConditionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            Width::Byte => write!(f, "&{:02X}{}{:02X}", self.mask, self.operator, self.value),
            Width::Word => write!(f, "&{:04X}{}{:04X}", self.mask, self.operator, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_parse_and_print() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
        assert_eq!("!=".parse::<Operator>(), Ok(Operator::NotEqual));
        assert!("=>".parse::<Operator>().is_err());
    }

    #[test]
    fn zero_mask_never_matches() {
        for op in Operator::ALL {
            let rule = ConditionRule::byte(0x00, op, 0x00);
            assert!(!rule.evaluate(0x00));
            assert!(!rule.evaluate(0xFF));
        }
    }

    #[test]
    fn masking_happens_before_comparing() {
        let rule = ConditionRule::byte(0x01, Operator::Equal, 0x01);
        assert!(rule.evaluate(0x07));
        assert!(!rule.evaluate(0x06));

        let rule = ConditionRule::word(0xFF00, Operator::Greater, 0x1000);
        assert!(rule.evaluate(0x11FF));
        assert!(!rule.evaluate(0x10FF));
    }

    #[test]
    fn display_uses_the_rule_width() {
        assert_eq!(ConditionRule::byte(0xFF, Operator::LessOrEqual, 0x20).to_string(), "&FF<=20");
        assert_eq!(ConditionRule::word(0xFFFF, Operator::Equal, 0xFFFF).to_string(), "&FFFF=FFFF");
    }
}
