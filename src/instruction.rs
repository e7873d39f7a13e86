//! records consumed by the control-flow driver (C10): the instruction list,
//! its label table, and the data items loaded by `Engine::load_data`.
//!
//! grounded on dustbox-rs's `cpu/instruction.rs` `Instruction` struct shape
//! (a plain record carrying a decoded op plus source bookkeeping), reduced
//! to the string-mnemonic/string-operand record this spec's Instruction
//! Record calls for, since decoding here is the external parser's job, not
//! this crate's.

use std::collections::HashMap;

/// an immutable instruction record produced by the external lexer/parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub line: usize,
    pub mnemonic: String,
    pub operands: Vec<String>,
    pub raw: String,
}

/// label name (case-sensitive) -> instruction index. duplicate detection is
/// the loader's (external) responsibility, not this crate's.
pub type LabelTable = HashMap<String, usize>;

/// one entry of a `loadData` call: `values.len()` entries of `size` bytes
/// each, stored little-endian and sequentially starting at `address`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub address: u32,
    pub size: u8,
    pub values: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_is_a_plain_immutable_record() {
        let i = Instruction {
            line: 3,
            mnemonic: "MOV".to_string(),
            operands: vec!["EAX".to_string(), "5".to_string()],
            raw: "MOV EAX, 5".to_string(),
        };
        assert_eq!(i.mnemonic, "MOV");
        assert_eq!(i.operands.len(), 2);
    }
}
