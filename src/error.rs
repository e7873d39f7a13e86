quick_error! {
    /// fatal errors that abort the current `step()` and propagate to the host.
    ///
    /// non-fatal conditions (unknown mnemonics, wrong operand arity, division
    /// by zero) are not represented here — they are handled silently by the
    /// dispatcher, per spec.
    #[derive(Debug, PartialEq, Clone)]
    pub enum EngineError {
        /// JMP/Jcc/CALL target not present in the label map
        UnknownLabel(label: String) {
            display("unknown label: {}", label)
        }
        /// MOV with two memory operands while in strict-x86 mode
        StrictMovMemToMem {
            display("MOV between two memory operands is not allowed in strict-x86 mode")
        }
        /// malformed operand syntax
        BadOperand(text: String) {
            display("bad operand: {}", text)
        }
        /// register name not recognized
        OutOfRangeRegister(name: String) {
            display("not a valid register: {}", name)
        }
    }
}
