/// selects whether memory-to-memory MOV is permitted and whether shift/rotate
/// ops additionally define ZF/SF where x86 leaves them undefined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityMode {
    /// permissive dialect: memory-to-memory MOV allowed, undefined flags defined
    Educational,
    /// stricter dialect matching x86's operand constraints
    StrictX86,
}

impl Default for CompatibilityMode {
    fn default() -> Self {
        CompatibilityMode::Educational
    }
}
