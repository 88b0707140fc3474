use std::{fmt, time::Duration};

/// Static metadata for one ESI operation: where it lives, what scope it
/// needs, and how long the server caches it by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointInfo {
    /// The URL path for this endpoint, with leading and trailing slash.
    pub path: &'static str,
    /// The ESI scope required to request this endpoint, empty for public.
    pub permissions: &'static str,
    /// The server's default cache interval for responses.
    pub default_cache: Duration,
    /// True if the response honors the `lang` query parameter.
    pub localizable: bool,
}

/// The ESI endpoints this subsystem knows how to call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Resolves a list of IDs to names, POST.
    UniverseNames,
    /// Resolves a list of character IDs to affiliations, POST.
    CharactersAffiliation,
    /// Public contracts in a region, GET with the region ID appended.
    ContractsPublic,
}

const UNIVERSE_NAMES: EndpointInfo = EndpointInfo {
    path: "/v2/universe/names/",
    permissions: "",
    default_cache: Duration::from_secs(720),
    localizable: false,
};

const CHARACTERS_AFFILIATION: EndpointInfo = EndpointInfo {
    path: "/v1/characters/affiliation/",
    permissions: "",
    default_cache: Duration::from_secs(720),
    localizable: false,
};

const CONTRACTS_PUBLIC: EndpointInfo = EndpointInfo {
    path: "/v1/contracts/public/",
    permissions: "",
    default_cache: Duration::from_secs(30),
    localizable: false,
};

impl Endpoint {
    pub fn info(self) -> &'static EndpointInfo {
        match self {
            Endpoint::UniverseNames => &UNIVERSE_NAMES,
            Endpoint::CharactersAffiliation => &CHARACTERS_AFFILIATION,
            Endpoint::ContractsPublic => &CONTRACTS_PUBLIC,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info().path)
    }
}
