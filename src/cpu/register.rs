use std::convert::TryFrom;

/// general-purpose 32-bit registers, canonical index order
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum R {
    EAX, ECX, EDX, EBX, ESP, EBP, ESI, EDI,
}

impl R {
    pub fn index(self) -> usize {
        match self {
            R::EAX => 0,
            R::ECX => 1,
            R::EDX => 2,
            R::EBX => 3,
            R::ESP => 4,
            R::EBP => 5,
            R::ESI => 6,
            R::EDI => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            R::EAX => "EAX",
            R::ECX => "ECX",
            R::EDX => "EDX",
            R::EBX => "EBX",
            R::ESP => "ESP",
            R::EBP => "EBP",
            R::ESI => "ESI",
            R::EDI => "EDI",
        }
    }

    /// parses a 32-bit register name, case-insensitive
    pub fn parse(name: &str) -> Option<R> {
        match name.to_ascii_uppercase().as_str() {
            "EAX" => Some(R::EAX),
            "ECX" => Some(R::ECX),
            "EDX" => Some(R::EDX),
            "EBX" => Some(R::EBX),
            "ESP" => Some(R::ESP),
            "EBP" => Some(R::EBP),
            "ESI" => Some(R::ESI),
            "EDI" => Some(R::EDI),
            _ => None,
        }
    }
}

impl TryFrom<usize> for R {
    type Error = ();

    fn try_from(v: usize) -> Result<R, ()> {
        match v {
            0 => Ok(R::EAX),
            1 => Ok(R::ECX),
            2 => Ok(R::EDX),
            3 => Ok(R::EBX),
            4 => Ok(R::ESP),
            5 => Ok(R::EBP),
            6 => Ok(R::ESI),
            7 => Ok(R::EDI),
            _ => Err(()),
        }
    }
}

/// low/high byte sub-registers of EAX/ECX/EDX/EBX
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum R8 {
    AL, CL, DL, BL, AH, CH, DH, BH,
}

impl R8 {
    /// the owning 32-bit register
    pub fn parent(self) -> R {
        match self {
            R8::AL | R8::AH => R::EAX,
            R8::CL | R8::CH => R::ECX,
            R8::DL | R8::DH => R::EDX,
            R8::BL | R8::BH => R::EBX,
        }
    }

    /// true if this is the high byte (bits 8..15), false for the low byte
    pub fn is_high(self) -> bool {
        matches!(self, R8::AH | R8::CH | R8::DH | R8::BH)
    }

    pub fn parse(name: &str) -> Option<R8> {
        match name.to_ascii_uppercase().as_str() {
            "AL" => Some(R8::AL),
            "CL" => Some(R8::CL),
            "DL" => Some(R8::DL),
            "BL" => Some(R8::BL),
            "AH" => Some(R8::AH),
            "CH" => Some(R8::CH),
            "DH" => Some(R8::DH),
            "BH" => Some(R8::BH),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(R::parse("eax"), Some(R::EAX));
        assert_eq!(R::parse("Esp"), Some(R::ESP));
        assert_eq!(R::parse("nope"), None);
    }

    #[test]
    fn r8_maps_to_parent() {
        assert_eq!(R8::AH.parent(), R::EAX);
        assert!(R8::AH.is_high());
        assert!(!R8::AL.is_high());
    }

    #[test]
    fn index_round_trips() {
        for i in 0..8 {
            let r = R::try_from(i).unwrap();
            assert_eq!(r.index(), i);
        }
    }
}
