//! Flat attribute records for saving and restoring breakpoints and variables
//!
//! A record is the attribute set of one `breakpoint` or `variable` element in a saved
//! session.  Reading and writing the surrounding document is left to the host.  Numbers
//! are written as hex with an `H` suffix, and read back as either that or decimal.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::breakpoint::{
    AccessDirection, AddressRange, Breakpoint, BreakpointKind, IoBreakpoint, MemoryBreakpoint, PcBreakpoint, RegisterCondition,
};
use crate::condition::{ConditionRule, Operator, Width};
use crate::error::{BreakpointError, PersistError};
use crate::interrupt::{find_unique_source, InterruptBreakpoint, InterruptSource};
use crate::parse::{narrow_u16, narrow_u8, read_integer};
use crate::register::RegisterName;
use crate::set::Breakpoints;
use crate::variables::{VarType, Variable, VariableTable};

pub type Record = BTreeMap<String, String>;

pub const TYPE_PC: &str = "pc";
pub const TYPE_MEMORY: &str = "memory";
pub const TYPE_INPUT: &str = "input";
pub const TYPE_OUTPUT: &str = "output";
pub const TYPE_IO: &str = "io";
pub const TYPE_INTERRUPT: &str = "interrupt";
pub const TYPE_VARIABLE: &str = "variable";

/// A restored record, which is either a breakpoint or a variable
#[derive(Clone, Debug)]
pub enum Entry {
    Breakpoint(Breakpoint),
    Variable(Variable),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// The index and reason of each record that was left out
    pub skipped: Vec<(usize, PersistError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn hex_u16(value: u16) -> String {
    format!("{:04X}H", value)
}

fn hex_u8(value: u8) -> String {
    format!("{:02X}H", value)
}

fn hex_width(value: u16, width: Width) -> String {
    match width {
        Width::Byte => hex_u8(value as u8),
        Width::Word => hex_u16(value),
    }
}

struct RecordWriter(Record);

impl RecordWriter {
    fn new(record_type: &str) -> Self {
        let mut record = Record::new();
        record.insert("type".to_string(), record_type.to_string());
        Self(record)
    }

    fn set<V: ToString>(&mut self, name: &str, value: V) {
        self.0.insert(name.to_string(), value.to_string());
    }

    fn set_condition(&mut self, prefix: &str, rule: &ConditionRule) {
        self.set(&format!("{}mask", prefix), hex_width(rule.mask, rule.width));
        self.set(&format!("{}cond", prefix), rule.operator.as_str());
        self.set(&format!("{}value", prefix), hex_width(rule.value, rule.width));
    }
}

pub fn breakpoint_to_record(breakpoint: &Breakpoint) -> Record {
    let mut writer = match breakpoint.kind() {
        BreakpointKind::ProgramCounter(bp) => {
            let mut writer = RecordWriter::new(TYPE_PC);
            writer.set("addr", hex_u16(bp.address));
            if let Some(label) = &bp.label {
                writer.set("name", label);
            }
            writer.set("imported", bp.imported);
            if let Some(cond) = &bp.register_condition {
                writer.set("reg", cond.register);
                writer.set_condition("reg_", &cond.rule);
            }
            if bp.flag_mask != 0 {
                writer.set("flag_mask", hex_u8(bp.flag_mask));
                writer.set("flag_value", hex_u8(bp.flag_value));
            }
            writer
        },
        BreakpointKind::Memory(bp) => {
            let mut writer = RecordWriter::new(TYPE_MEMORY);
            writer.set("begin_addr", hex_u16(bp.range.begin));
            if let Some(end) = bp.range.end {
                writer.set("end_addr", hex_u16(end));
            }
            writer.set("on_read", bp.access.on_read());
            writer.set("on_write", bp.access.on_write());
            if let Some(label) = &bp.label {
                writer.set("name", label);
            }
            writer.set("imported", bp.imported);
            if let Some(rule) = &bp.value_condition {
                writer.set_condition("", rule);
            }
            writer
        },
        BreakpointKind::Io(bp) => {
            let record_type = match bp.direction {
                AccessDirection::Read => TYPE_INPUT,
                AccessDirection::Write => TYPE_OUTPUT,
                AccessDirection::ReadOrWrite => TYPE_IO,
            };
            let mut writer = RecordWriter::new(record_type);
            writer.set("is_8bit", bp.is_8bit);
            writer.set("begin_port", hex_u16(bp.range.begin));
            if let Some(end) = bp.range.end {
                writer.set("end_port", hex_u16(end));
            }
            if let Some(rule) = &bp.value_condition {
                writer.set_condition("", rule);
            }
            writer
        },
        BreakpointKind::Interrupt(bp) => {
            let mut writer = RecordWriter::new(TYPE_INTERRUPT);
            writer.set("source", &bp.source.name);
            writer
        },
    };
    writer.set("log_enabled", breakpoint.log_enabled);
    writer.set("stop_enabled", breakpoint.stop_enabled);
    writer.0
}

pub fn variable_to_record(variable: &Variable) -> Record {
    let mut writer = RecordWriter::new(TYPE_VARIABLE);
    writer.set("name", &variable.name);
    writer.set("addr", hex_u16(variable.address));
    writer.set("var_type", variable.var_type.as_str());
    writer.set("size", variable.size);
    writer.set("imported", variable.imported);
    writer.0
}

/// Every breakpoint followed by every variable, in display order
pub fn save_records(breakpoints: &Breakpoints, variables: &VariableTable) -> Vec<Record> {
    breakpoints
        .iter()
        .map(breakpoint_to_record)
        .chain(variables.iter().map(variable_to_record))
        .collect()
}

struct RecordReader<'a>(&'a Record);

impl<'a> RecordReader<'a> {
    fn text(&self, name: &'static str) -> Option<&'a str> {
        self.0.get(name).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    fn invalid(name: &'static str) -> impl Fn(BreakpointError) -> PersistError {
        move |source| PersistError::InvalidAttribute { name, source }
    }

    fn flag(&self, name: &'static str) -> bool {
        self.text(name).map(|value| value.eq_ignore_ascii_case("true")).unwrap_or(false)
    }

    fn number(&self, name: &'static str) -> Result<Option<u32>, PersistError> {
        self.text(name).map(read_integer).transpose().map_err(Self::invalid(name))
    }

    fn required_u16(&self, name: &'static str) -> Result<u16, PersistError> {
        let value = self.number(name)?.ok_or(PersistError::MissingAttribute(name))?;
        narrow_u16(value).map_err(Self::invalid(name))
    }

    fn optional_u16(&self, name: &'static str) -> Result<Option<u16>, PersistError> {
        self.number(name)?.map(narrow_u16).transpose().map_err(Self::invalid(name))
    }

    fn optional_u8(&self, name: &'static str, default: u8) -> Result<u8, PersistError> {
        self.number(name)?
            .map(narrow_u8)
            .transpose()
            .map(|value| value.unwrap_or(default))
            .map_err(Self::invalid(name))
    }

    fn name(&self) -> Option<String> {
        self.text("name").map(str::to_string)
    }

    /// A value condition, if the record has a compare value
    ///
    /// A missing mask means all bits of the width and a missing operator means equality.
    fn condition(&self, prefix: &str, width: Width) -> Result<Option<ConditionRule>, PersistError> {
        let (mask_name, cond_name, value_name) = match prefix {
            "reg_" => ("reg_mask", "reg_cond", "reg_value"),
            _ => ("mask", "cond", "value"),
        };

        let value = match self.number(value_name)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let mask = self.number(mask_name)?.unwrap_or(width.max_value() as u32);
        let operator = match self.text(cond_name) {
            Some(text) => text.parse::<Operator>().map_err(Self::invalid(cond_name))?,
            None => Operator::Equal,
        };

        let max = width.max_value() as u32;
        if value > max {
            return Err(PersistError::InvalidAttribute {
                name: value_name,
                source: BreakpointError::OutOfRange { value, bits: width_bits(width) },
            });
        }
        if mask > max {
            return Err(PersistError::InvalidAttribute {
                name: mask_name,
                source: BreakpointError::OutOfRange { value: mask, bits: width_bits(width) },
            });
        }
        Ok(Some(ConditionRule::new(width, mask as u16, operator, value as u16)))
    }

    fn range(&self, begin: &'static str, end: &'static str) -> Result<AddressRange, PersistError> {
        let begin_value = self.required_u16(begin)?;
        let end_value = self.optional_u16(end)?;
        AddressRange::new(begin_value, end_value).map_err(Self::invalid(end))
    }
}

fn width_bits(width: Width) -> u8 {
    match width {
        Width::Byte => 8,
        Width::Word => 16,
    }
}

/// Turn one record back into a breakpoint or variable
///
/// Interrupt breakpoints are bound to the source in `sources` with the saved name.
pub fn from_record(record: &Record, sources: &[InterruptSource]) -> Result<Entry, PersistError> {
    let reader = RecordReader(record);
    let record_type = reader.text("type").ok_or(PersistError::MissingType)?;

    let kind = match record_type {
        TYPE_PC => {
            let mut bp = PcBreakpoint::new(reader.required_u16("addr")?);
            bp.label = reader.name();
            bp.imported = reader.flag("imported");
            if let Some(text) = reader.text("reg") {
                let register = text.parse::<RegisterName>().map_err(RecordReader::invalid("reg"))?;
                let rule = reader
                    .condition("reg_", register.width())?
                    .ok_or(PersistError::MissingAttribute("reg_value"))?;
                bp.register_condition = Some(RegisterCondition { register, rule });
            }
            bp.flag_mask = reader.optional_u8("flag_mask", 0)?;
            bp.flag_value = reader.optional_u8("flag_value", 0)? & bp.flag_mask;
            BreakpointKind::ProgramCounter(bp)
        },
        TYPE_MEMORY => {
            let range = reader.range("begin_addr", "end_addr")?;
            // records without either flag watch both directions
            let access = AccessDirection::from_flags(reader.flag("on_read"), reader.flag("on_write"))
                .unwrap_or(AccessDirection::ReadOrWrite);
            let mut bp = MemoryBreakpoint::new(range, access);
            bp.label = reader.name();
            bp.imported = reader.flag("imported");
            bp.value_condition = reader.condition("", Width::Byte)?;
            BreakpointKind::Memory(bp)
        },
        TYPE_INPUT | TYPE_OUTPUT | TYPE_IO => {
            let direction = match record_type {
                TYPE_INPUT => AccessDirection::Read,
                TYPE_OUTPUT => AccessDirection::Write,
                _ => AccessDirection::ReadOrWrite,
            };
            let range = reader.range("begin_port", "end_port")?;
            let mut bp = IoBreakpoint::new(range, reader.flag("is_8bit"), direction).map_err(RecordReader::invalid("end_port"))?;
            bp.value_condition = reader.condition("", Width::Byte)?;
            BreakpointKind::Io(bp)
        },
        TYPE_INTERRUPT => {
            let name = reader.text("source").ok_or(PersistError::MissingAttribute("source"))?;
            let source = find_unique_source(sources, name).ok_or_else(|| PersistError::InvalidAttribute {
                name: "source",
                source: BreakpointError::UnknownInterruptSource(name.to_string()),
            })?;
            BreakpointKind::Interrupt(InterruptBreakpoint::new(source.clone()))
        },
        TYPE_VARIABLE => return variable_from_record(&reader).map(Entry::Variable),
        other => return Err(PersistError::UnknownType(other.to_string())),
    };

    let mut breakpoint = Breakpoint::new(kind);
    breakpoint.log_enabled = reader.flag("log_enabled");
    breakpoint.stop_enabled = reader.flag("stop_enabled");
    Ok(Entry::Breakpoint(breakpoint))
}

fn variable_from_record(reader: &RecordReader<'_>) -> Result<Variable, PersistError> {
    let name = reader.name().ok_or(PersistError::MissingAttribute("name"))?;
    let address = reader.required_u16("addr")?;
    let var_type = reader
        .text("var_type")
        .ok_or(PersistError::MissingAttribute("var_type"))?
        .parse::<VarType>()
        .map_err(RecordReader::invalid("var_type"))?;
    let size = match var_type.fixed_size() {
        Some(size) => size,
        None => match reader.optional_u16("size")? {
            Some(size) if size > 0 => size,
            _ => return Err(PersistError::MissingAttribute("size")),
        },
    };

    let mut variable = Variable::new(name, address, var_type, size);
    variable.imported = reader.flag("imported");
    Ok(variable)
}

/// Restore saved records, leaving out the ones that can't be read
///
/// Each bad record is skipped on its own and logged.  The active list is republished once.
pub fn load_records(
    records: &[Record],
    sources: &[InterruptSource],
    breakpoints: &mut Breakpoints,
    variables: &mut VariableTable,
) -> LoadReport {
    let mut report = LoadReport::default();
    for (index, record) in records.iter().enumerate() {
        match from_record(record, sources) {
            Ok(Entry::Breakpoint(breakpoint)) => {
                breakpoints.put_unpublished(breakpoint);
                report.loaded += 1;
            },
            Ok(Entry::Variable(variable)) => {
                variables.put(variable);
                report.loaded += 1;
            },
            Err(err) => {
                warn!("skipping record {}: {}", index, err);
                report.skipped.push((index, err));
            },
        }
    }
    breakpoints.publish();

    info!("loaded {} records, skipped {}", report.loaded, report.skipped.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(attrs: &[(&str, &str)]) -> Record {
        attrs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
    }

    #[test]
    fn missing_attributes_take_defaults() {
        let entry = from_record(&record(&[("type", "memory"), ("begin_addr", "4000H"), ("value", "20H")]), &[]).unwrap();
        let Entry::Breakpoint(bp) = entry else {
            panic!("expected a breakpoint");
        };
        assert_eq!(bp.text(), "4000 RW &FF=20");
        assert!(!bp.stop_enabled);
        assert!(!bp.log_enabled);
        assert!(!bp.is_imported());
    }

    #[test]
    fn decimal_numbers_are_accepted() {
        let entry = from_record(&record(&[("type", "output"), ("begin_port", "120"), ("is_8bit", "true")]), &[]).unwrap();
        let Entry::Breakpoint(bp) = entry else {
            panic!("expected a breakpoint");
        };
        assert_eq!(bp.text(), "78 OUT");
    }

    #[test]
    fn bad_records_are_reported() {
        assert_eq!(from_record(&record(&[("addr", "0100H")]), &[]).err(), Some(PersistError::MissingType));
        assert_eq!(
            from_record(&record(&[("type", "watch")]), &[]).err(),
            Some(PersistError::UnknownType("watch".to_string()))
        );
        assert_eq!(from_record(&record(&[("type", "pc")]), &[]).err(), Some(PersistError::MissingAttribute("addr")));
        assert!(matches!(
            from_record(&record(&[("type", "pc"), ("addr", "10000H")]), &[]),
            Err(PersistError::InvalidAttribute { name: "addr", .. })
        ));
        assert!(matches!(
            from_record(&record(&[("type", "interrupt"), ("source", "CTC")]), &[]),
            Err(PersistError::InvalidAttribute { name: "source", .. })
        ));
    }

    #[test]
    fn variables_use_the_size_of_their_type() {
        let entry = from_record(
            &record(&[("type", "variable"), ("name", "COUNT"), ("addr", "6000H"), ("var_type", "INT2BE"), ("size", "7")]),
            &[],
        )
        .unwrap();
        let Entry::Variable(variable) = entry else {
            panic!("expected a variable");
        };
        assert_eq!((variable.var_type, variable.size), (VarType::Int2Be, 2));

        let missing_size = from_record(
            &record(&[("type", "variable"), ("name", "BUF"), ("addr", "6000H"), ("var_type", "BYTE_ARRAY")]),
            &[],
        );
        assert_eq!(missing_size.err(), Some(PersistError::MissingAttribute("size")));
    }

    #[test]
    fn loading_skips_bad_records_one_at_a_time() {
        let sources = vec![InterruptSource::new(3, "CTC")];
        let records = vec![
            record(&[("type", "pc"), ("addr", "0100H"), ("stop_enabled", "true")]),
            record(&[("type", "pc"), ("addr", "nowhere")]),
            record(&[("type", "interrupt"), ("source", "CTC"), ("log_enabled", "true")]),
        ];
        let mut breakpoints = Breakpoints::default();
        let mut variables = VariableTable::default();
        let report = load_records(&records, &sources, &mut breakpoints, &mut variables);

        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, 1);
        assert_eq!(breakpoints.active_list().snapshot().len(), 2);
    }
}
