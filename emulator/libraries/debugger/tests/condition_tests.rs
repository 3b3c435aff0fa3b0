use zwatch_debugger::{parse_rule, ConditionRule, Operator, Width};

const BYTE_MASKS: &[u8] = &[0x01, 0x0F, 0x80, 0xF0, 0xFF];
const WORD_MASKS: &[u16] = &[0x0001, 0x00FF, 0xFF00, 0x8001, 0xFFFF];

/// (rule text, observed value, expected result)
const RULE_TESTS: &[(&str, u16, bool)] = &[
    ("=20", 0x20, true),
    ("=20", 0x21, false),
    ("&0F=01", 0x71, true),
    ("&0F=01", 0x72, false),
    ("&F0<>00", 0x0F, false),
    ("&F0<>00", 0x10, true),
    ("<80", 0x7F, true),
    ("<80", 0x80, false),
    ("<=80", 0x80, true),
    (">=80", 0x80, true),
    (">80", 0x80, false),
    (">80", 0x81, true),
    ("&00=00", 0x00, false),
    ("!=01", 0x00, true),
];

fn exactly_one_holds(rule_for: impl Fn(Operator) -> ConditionRule, observed: u16) {
    let less = rule_for(Operator::Less).evaluate(observed);
    let equal = rule_for(Operator::Equal).evaluate(observed);
    let greater = rule_for(Operator::Greater).evaluate(observed);
    assert_eq!([less, equal, greater].iter().filter(|held| **held).count(), 1);

    assert_eq!(rule_for(Operator::LessOrEqual).evaluate(observed), less || equal);
    assert_eq!(rule_for(Operator::GreaterOrEqual).evaluate(observed), greater || equal);
    assert_eq!(rule_for(Operator::NotEqual).evaluate(observed), !equal);
}

#[test]
fn rules_from_text() {
    for (text, observed, expected) in RULE_TESTS {
        let rule = parse_rule(text, Width::Byte).unwrap();
        assert_eq!(rule.evaluate(*observed), *expected, "{} against {:02x}", text, observed);
    }
}

#[test]
fn masked_value_always_equals_itself() {
    for mask in BYTE_MASKS {
        for value in [0x00u8, 0x01, 0x5A, 0x80, 0xFF] {
            let rule = ConditionRule::byte(*mask, Operator::Equal, value & mask);
            assert!(rule.evaluate((value & mask) as u16));
            assert!(rule.evaluate(value as u16));
        }
    }
}

#[test]
fn operators_partition_bytes() {
    for mask in BYTE_MASKS {
        for value in [0x00u8, 0x01, 0x40, 0x80, 0xFF] {
            for observed in 0..=0xFFu16 {
                exactly_one_holds(|op| ConditionRule::byte(*mask, op, value), observed);
            }
        }
    }
}

#[test]
fn operators_partition_words() {
    for mask in WORD_MASKS {
        for value in [0x0000u16, 0x0001, 0x00FF, 0x8000, 0xFFFF] {
            for observed in (0..=0xFFFFu16).step_by(0x0101) {
                exactly_one_holds(|op| ConditionRule::word(*mask, op, value), observed);
            }
        }
    }
}
