use std::{collections::BTreeSet, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use evewatch_core::{
    AllianceId, CharacterId, CorporationId, Timestamp,
    events::{EntityEventSink, Notifications},
};
use serde::Deserialize;

use crate::{
    batch::{BatchLookup, BatchQueue},
    client::RequestClient,
    endpoint::Endpoint,
    request::EsiRequest,
    response::EsiResponse,
};

/// Shown whenever an ID has not been resolved to a real name yet.
pub const UNKNOWN_NAME: &str = "Unknown";

/// The wire API caps both bulk endpoints at this many IDs per call.
const MAX_NAME_IDS: usize = 100;
const MAX_AFFILIATION_IDS: usize = 100;

/// One cached entity. Exactly one of the ID roles identifies the entity;
/// a character additionally carries its known corporation and alliance.
/// Entries are replaced whole on update, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Entity {
    character: CharacterId,
    corporation: CorporationId,
    alliance: AllianceId,
    name: String,
    last_update: Timestamp,
}

impl Entity {
    fn character(
        id: i32,
        name: impl Into<String>,
        corporation: CorporationId,
        alliance: AllianceId,
    ) -> Self {
        Self {
            character: CharacterId(id),
            corporation,
            alliance,
            name: name.into(),
            last_update: Timestamp::now(),
        }
    }

    fn corporation(id: i32, name: impl Into<String>) -> Self {
        Self {
            character: CharacterId::NONE,
            corporation: CorporationId(id),
            alliance: AllianceId::NONE,
            name: name.into(),
            last_update: Timestamp::now(),
        }
    }

    fn alliance(id: i32, name: impl Into<String>) -> Self {
        Self {
            character: CharacterId::NONE,
            corporation: CorporationId::NONE,
            alliance: AllianceId(id),
            name: name.into(),
            last_update: Timestamp::now(),
        }
    }

    fn unknown(id: i32) -> Self {
        Self {
            character: CharacterId(id),
            corporation: CorporationId::NONE,
            alliance: AllianceId::NONE,
            name: UNKNOWN_NAME.to_owned(),
            last_update: Timestamp::now(),
        }
    }
}

/// An alliance resolved to its display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAlliance {
    pub id: AllianceId,
    pub name: String,
}

/// A corporation resolved to its display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCorporation {
    pub id: CorporationId,
    pub name: String,
}

/// A character resolved to its display name and affiliation chain. The
/// corporation and alliance are 0 until an affiliation batch completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCharacter {
    pub id: CharacterId,
    pub name: String,
    pub corporation: CorporationId,
    pub alliance: AllianceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NameCategory {
    Alliance,
    Character,
    Corporation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct UniverseName {
    id: i32,
    name: String,
    category: NameCategory,
}

#[derive(Debug, Deserialize)]
struct CharacterAffiliation {
    character_id: i32,
    corporation_id: i32,
    #[serde(default)]
    alliance_id: Option<i32>,
}

/// Best-effort, eventually consistent name and affiliation lookups for
/// character, corporation, and alliance IDs.
///
/// Resolution never blocks: unknown or stale IDs are queued for a
/// background batch fetch and the caller gets the best value currently
/// cached (a sentinel placeholder on a miss). The event sink's
/// `names_updated` fires whenever a batch queue settles, at which point
/// callers should re-resolve whatever they display.
pub struct EntityLookupService {
    entities: Arc<DashMap<i32, Entity>>,
    names: BatchQueue,
    affiliations: BatchQueue,
    refresh_interval: Duration,
}

impl EntityLookupService {
    /// Builds the service and launches both lookup workers.
    pub fn start<N, S>(client: Arc<RequestClient>, notifications: Arc<N>, events: Arc<S>) -> Self
    where
        N: Notifications + 'static,
        S: EntityEventSink + Send + Sync + 'static,
        <S as EntityEventSink>::Error: fmt::Display,
    {
        let entities: Arc<DashMap<i32, Entity>> = Arc::new(DashMap::new());
        // 0 is the permanent "no entity" sentinel.
        entities.insert(0, Entity::unknown(0));

        let names = BatchQueue::start(Arc::new(NameLookup {
            client: Arc::clone(&client),
            entities: Arc::clone(&entities),
            notifications: Arc::clone(&notifications),
            events: Arc::clone(&events),
        }));
        let affiliations = BatchQueue::start(Arc::new(AffiliationLookup {
            client,
            entities: Arc::clone(&entities),
            notifications,
            events,
        }));

        Self {
            entities,
            names,
            affiliations,
            refresh_interval: Endpoint::UniverseNames.info().default_cache,
        }
    }

    /// Resolves a character. A miss or stale hit queues a refresh on both
    /// the name and affiliation engines; the call itself never waits.
    pub fn character(&self, id: CharacterId) -> ResolvedCharacter {
        match self.cached(id.0) {
            None => {
                self.names.enqueue(id.0);
                self.affiliations.enqueue(id.0);
                ResolvedCharacter {
                    id,
                    name: UNKNOWN_NAME.to_owned(),
                    corporation: CorporationId::NONE,
                    alliance: AllianceId::NONE,
                }
            }
            Some(entity) => {
                if self.is_stale(&entity) {
                    self.names.enqueue(id.0);
                    self.affiliations.enqueue(id.0);
                }
                ResolvedCharacter {
                    id,
                    name: entity.name,
                    corporation: entity.corporation,
                    alliance: entity.alliance,
                }
            }
        }
    }

    /// Resolves a corporation name; misses and stale hits queue a name
    /// refresh.
    pub fn corporation(&self, id: CorporationId) -> ResolvedCorporation {
        match self.cached(id.0) {
            None => {
                self.names.enqueue(id.0);
                ResolvedCorporation {
                    id,
                    name: UNKNOWN_NAME.to_owned(),
                }
            }
            Some(entity) => {
                if self.is_stale(&entity) {
                    self.names.enqueue(id.0);
                }
                ResolvedCorporation {
                    id,
                    name: entity.name,
                }
            }
        }
    }

    /// Resolves an alliance name; misses and stale hits queue a name
    /// refresh.
    pub fn alliance(&self, id: AllianceId) -> ResolvedAlliance {
        match self.cached(id.0) {
            None => {
                self.names.enqueue(id.0);
                ResolvedAlliance {
                    id,
                    name: UNKNOWN_NAME.to_owned(),
                }
            }
            Some(entity) => {
                if self.is_stale(&entity) {
                    self.names.enqueue(id.0);
                }
                ResolvedAlliance {
                    id,
                    name: entity.name,
                }
            }
        }
    }

    /// Requests cooperative shutdown of both workers.
    pub fn shutdown(&self) {
        self.names.shutdown();
        self.affiliations.shutdown();
    }

    fn cached(&self, id: i32) -> Option<Entity> {
        self.entities.get(&id).map(|entry| entry.clone())
    }

    fn is_stale(&self, entity: &Entity) -> bool {
        entity.last_update.is_older_than(self.refresh_interval)
    }
}

/// The pending IDs of one batch, deduplicated and sorted, encoded as the
/// JSON integer array both bulk endpoints accept.
fn encode_id_array(ids: Vec<i32>) -> String {
    let unique: BTreeSet<i32> = ids.into_iter().collect();
    let encoded: Vec<String> = unique.iter().map(|id| id.to_string()).collect();
    format!("[{}]", encoded.join(","))
}

struct NameLookup<N, S>
where
    N: Notifications + 'static,
    S: EntityEventSink + Send + Sync + 'static,
    <S as EntityEventSink>::Error: fmt::Display,
{
    client: Arc<RequestClient>,
    entities: Arc<DashMap<i32, Entity>>,
    notifications: Arc<N>,
    events: Arc<S>,
}

#[async_trait]
impl<N, S> BatchLookup for NameLookup<N, S>
where
    N: Notifications + 'static,
    S: EntityEventSink + Send + Sync + 'static,
    <S as EntityEventSink>::Error: fmt::Display,
{
    fn max_batch(&self) -> usize {
        MAX_NAME_IDS
    }

    async fn run_batch(&self, ids: Vec<i32>) {
        // No cache info on these requests, the ID sets differ per call.
        let request = EsiRequest::new(Endpoint::UniverseNames);
        let response: EsiResponse<Vec<UniverseName>> =
            self.client.post(&request, encode_id_array(ids)).await;

        let status = response.status();
        match response.into_payload() {
            Some(names) => {
                for info in names {
                    merge_name(&self.entities, info);
                }
            }
            None => {
                log::error!("name lookup batch failed: {status:?}");
                self.notifications
                    .notify_error("Failed to look up entity names");
            }
        }
    }

    async fn settled(&self) {
        if let Err(err) = self.events.names_updated().await {
            log::warn!("names_updated sink failed: {err}");
        }
    }
}

fn merge_name(entities: &DashMap<i32, Entity>, info: UniverseName) {
    let UniverseName { id, name, category } = info;
    match category {
        NameCategory::Character => match entities.entry(id) {
            // A newly learned name keeps any known affiliation.
            Entry::Occupied(mut occupied) => {
                let previous = occupied.get();
                let merged =
                    Entity::character(id, name, previous.corporation, previous.alliance);
                occupied.insert(merged);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Entity::character(
                    id,
                    name,
                    CorporationId::NONE,
                    AllianceId::NONE,
                ));
            }
        },
        NameCategory::Corporation => {
            entities.insert(id, Entity::corporation(id, name));
        }
        NameCategory::Alliance => {
            entities.insert(id, Entity::alliance(id, name));
        }
        NameCategory::Other => {
            entities.insert(id, Entity::unknown(id));
        }
    }
}

struct AffiliationLookup<N, S>
where
    N: Notifications + 'static,
    S: EntityEventSink + Send + Sync + 'static,
    <S as EntityEventSink>::Error: fmt::Display,
{
    client: Arc<RequestClient>,
    entities: Arc<DashMap<i32, Entity>>,
    notifications: Arc<N>,
    events: Arc<S>,
}

#[async_trait]
impl<N, S> BatchLookup for AffiliationLookup<N, S>
where
    N: Notifications + 'static,
    S: EntityEventSink + Send + Sync + 'static,
    <S as EntityEventSink>::Error: fmt::Display,
{
    fn max_batch(&self) -> usize {
        MAX_AFFILIATION_IDS
    }

    async fn run_batch(&self, ids: Vec<i32>) {
        let request = EsiRequest::new(Endpoint::CharactersAffiliation);
        let response: EsiResponse<Vec<CharacterAffiliation>> =
            self.client.post(&request, encode_id_array(ids)).await;

        let status = response.status();
        match response.into_payload() {
            Some(affiliations) => {
                for info in affiliations {
                    merge_affiliation(&self.entities, info);
                }
            }
            None => {
                log::error!("affiliation lookup batch failed: {status:?}");
                self.notifications
                    .notify_error("Failed to look up character affiliations");
            }
        }
    }

    async fn settled(&self) {
        if let Err(err) = self.events.names_updated().await {
            log::warn!("names_updated sink failed: {err}");
        }
    }
}

fn merge_affiliation(entities: &DashMap<i32, Entity>, info: CharacterAffiliation) {
    let corporation = CorporationId(info.corporation_id);
    let alliance = AllianceId(info.alliance_id.unwrap_or(0));
    match entities.entry(info.character_id) {
        // A newly learned affiliation keeps any known name.
        Entry::Occupied(mut occupied) => {
            let merged = Entity::character(
                info.character_id,
                occupied.get().name.clone(),
                corporation,
                alliance,
            );
            occupied.insert(merged);
        }
        Entry::Vacant(vacant) => {
            vacant.insert(Entity::character(
                info.character_id,
                UNKNOWN_NAME,
                corporation,
                alliance,
            ));
        }
    }
}
