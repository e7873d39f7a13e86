//! `loadProgram(bytes)`'s wire format: a single `bincode`-encoded bundle of
//! instructions, labels, and initial data, decoded then loaded through the
//! exact same atomic path as `loadInstructions` + `loadData`.
//!
//! grounded on dustbox-rs's `machine.rs::load_exe` (`bincode::deserialize`
//! of a fixed header struct) and its `bincode`/`serde_derive` dependencies;
//! unlike the DOS `.EXE`/`.COM` duality dustbox-rs resolves by sniffing the
//! first two bytes, this format carries no alternate encoding to detect.

use crate::instruction::{DataItem, Instruction};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BytecodeProgram {
    pub instructions: Vec<Instruction>,
    pub labels: Vec<(String, usize)>,
    pub data: Vec<DataItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bincode() {
        let program = BytecodeProgram {
            instructions: vec![Instruction {
                line: 1,
                mnemonic: "HLT".to_string(),
                operands: vec![],
                raw: "HLT".to_string(),
            }],
            labels: vec![("start".to_string(), 0)],
            data: vec![DataItem { address: 0x2000, size: 4, values: vec![42] }],
        };
        let bytes = bincode::serialize(&program).unwrap();
        let back: BytecodeProgram = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.instructions[0].mnemonic, "HLT");
        assert_eq!(back.labels[0].0, "start");
        assert_eq!(back.data[0].values[0], 42);
    }
}
