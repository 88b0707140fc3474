use std::fmt;

use serde::{Deserialize, Serialize};

/// A character ID. 0 means "no character" / not applicable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CharacterId(pub i32);

/// A corporation ID. 0 means "no corporation" / not applicable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorporationId(pub i32);

/// An alliance ID. 0 means "no alliance" / not applicable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AllianceId(pub i32);

impl CharacterId {
    pub const NONE: CharacterId = CharacterId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl CorporationId {
    pub const NONE: CorporationId = CorporationId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl AllianceId {
    pub const NONE: AllianceId = AllianceId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CorporationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AllianceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{AllianceId, CharacterId, CorporationId};

    #[test]
    fn zero_is_the_absent_sentinel() {
        assert!(CharacterId::NONE.is_none());
        assert!(CorporationId::NONE.is_none());
        assert!(AllianceId(0).is_none());
        assert!(!CharacterId(96325318).is_none());
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        assert_eq!(
            serde_json::to_string(&CharacterId(96325318)).expect("serializes"),
            "96325318"
        );
    }
}
