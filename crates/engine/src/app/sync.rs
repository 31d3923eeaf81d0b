use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use super::assets::{AssetKey, AssetStore, ClanVariant};

/// A clan/target record as published by the remote store. Optional fields
/// default to zero at ingestion so draw math never sees a missing value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub level: u32,
    pub hp: i64,
    pub max_hp: i64,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub treasury: i64,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub elder_count: u32,
    #[serde(default)]
    pub formation_level: u32,
    #[serde(default)]
    pub formation_shield: i64,
    #[serde(default)]
    pub max_formation_shield: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One entry of a feed batch. `data` carries the full current record for
/// `Added`/`Modified` and is absent for `Removed`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub data: Option<ClanRecord>,
}

/// Push-based subscription to the remote entity collection. Implementations
/// must never block the caller; dropped subscriptions are theirs to retry.
pub trait ClanFeed: Send {
    /// Drains every batch delivered since the previous poll.
    fn poll_batches(&mut self, out: &mut Vec<Vec<ChangeRecord>>);
}

/// Fire-and-forget remote attack command. The caller has already completed
/// its optimistic visual feedback; failures are the implementation's to
/// surface and never roll anything back.
pub trait AttackSink: Send {
    fn send_attack(&mut self, target_clan_id: &str);
}

pub fn clan_image_path(level: u32) -> String {
    format!("images/castle-lv{}.{}", level.max(1), castle_extension(level))
}

pub fn clan_hit_image_path(level: u32) -> String {
    format!(
        "images/castle-lv{}-hit.{}",
        level.max(1),
        castle_extension(level)
    )
}

pub fn formation_image_path(formation_level: u32) -> String {
    format!("images/formation-lv{formation_level}.png")
}

// Castles above level 1 ship as animated gifs; level 1 is a plain png.
fn castle_extension(level: u32) -> &'static str {
    if level > 1 {
        "gif"
    } else {
        "png"
    }
}

/// Owns every remote entity record plus the single optional target pointer.
/// Mutated only at tick boundaries by the loop thread; the renderer holds a
/// read-only borrow for the duration of a tick.
#[derive(Debug)]
pub struct ClanDirectory {
    clans: HashMap<String, ClanRecord>,
    current_target_id: Option<String>,
    home_clan_id: Option<String>,
}

impl ClanDirectory {
    pub fn new(home_clan_id: Option<String>) -> Self {
        Self {
            clans: HashMap::new(),
            current_target_id: None,
            home_clan_id,
        }
    }

    pub fn clan(&self, id: &str) -> Option<&ClanRecord> {
        self.clans.get(id)
    }

    pub fn clan_count(&self) -> usize {
        self.clans.len()
    }

    pub fn current_target_id(&self) -> Option<&str> {
        self.current_target_id.as_deref()
    }

    pub fn current_target(&self) -> Option<&ClanRecord> {
        self.current_target_id
            .as_deref()
            .and_then(|id| self.clans.get(id))
    }

    pub fn home_clan(&self) -> Option<&ClanRecord> {
        self.home_clan_id
            .as_deref()
            .and_then(|id| self.clans.get(id))
    }

    /// Selecting the viewer's own clan, or an id absent from the snapshot,
    /// is refused.
    pub fn select_target(&mut self, id: &str) -> bool {
        if !self.clans.contains_key(id) || self.home_clan_id.as_deref() == Some(id) {
            return false;
        }
        self.current_target_id = Some(id.to_string());
        true
    }

    pub fn clear_target(&mut self) {
        self.current_target_id = None;
    }

    /// Moves the target pointer to the next selectable clan in id order,
    /// wrapping around and skipping the viewer's own clan. With no
    /// selectable clan the pointer is cleared.
    pub fn cycle_target(&mut self) -> Option<&str> {
        let mut ids: Vec<&String> = self
            .clans
            .keys()
            .filter(|id| self.home_clan_id.as_deref() != Some(id.as_str()))
            .collect();
        if ids.is_empty() {
            self.current_target_id = None;
            return None;
        }
        ids.sort();

        let next = match self.current_target_id.as_deref() {
            Some(current) => ids
                .iter()
                .find(|id| id.as_str() > current)
                .copied()
                .unwrap_or(ids[0]),
            None => ids[0],
        };
        self.current_target_id = Some(next.clone());
        self.current_target_id.as_deref()
    }

    /// Self-heal for an inconsistent target reference: a pointer to an id
    /// missing from the snapshot is cleared instead of being drawn stale.
    pub fn heal_target(&mut self) {
        let dangling = matches!(
            self.current_target_id.as_deref(),
            Some(id) if !self.clans.contains_key(id)
        );
        if dangling {
            warn!(
                target_id = self.current_target_id.as_deref().unwrap_or(""),
                "target_reference_dangling_cleared"
            );
            self.current_target_id = None;
        }
    }

    /// Applies one feed batch in delivery order (last-write-wins per id),
    /// driving asset population and eviction as records change.
    pub fn apply_batch(&mut self, batch: &[ChangeRecord], assets: &mut dyn AssetStore) {
        for change in batch {
            match change.kind {
                ChangeKind::Added | ChangeKind::Modified => {
                    self.apply_upsert(change, assets);
                }
                ChangeKind::Removed => {
                    self.apply_removal(&change.id, assets);
                }
            }
        }
    }

    fn apply_upsert(&mut self, change: &ChangeRecord, assets: &mut dyn AssetStore) {
        let Some(mut record) = change.data.clone() else {
            warn!(clan_id = %change.id, "feed_record_missing_data");
            return;
        };
        // The document id travels beside the payload; stamp it in so the
        // record is self-describing downstream.
        record.id = change.id.clone();
        if let Err(reason) = validate_record(&record) {
            warn!(clan_id = %record.id, reason, "feed_record_quarantined");
            return;
        }

        request_clan_assets(assets, &record);
        debug!(clan_id = %record.id, level = record.level, "clan_record_applied");
        self.clans.insert(record.id.clone(), record);
    }

    fn apply_removal(&mut self, id: &str, assets: &mut dyn AssetStore) {
        self.clans.remove(id);
        assets.evict_clan(id);
        if self.current_target_id.as_deref() == Some(id) {
            debug!(clan_id = %id, "target_removed_pointer_cleared");
            self.current_target_id = None;
        }
    }
}

fn validate_record(record: &ClanRecord) -> Result<(), &'static str> {
    if record.id.is_empty() {
        return Err("empty id");
    }
    if record.name.is_empty() {
        return Err("empty name");
    }
    if record.level == 0 {
        return Err("level zero");
    }
    if record.max_hp <= 0 {
        return Err("non-positive max hp");
    }
    Ok(())
}

/// Derives the expected asset URLs from the record's level/formation fields
/// and (re-)requests them, overwriting any in-flight handle for this clan.
fn request_clan_assets(assets: &mut dyn AssetStore, record: &ClanRecord) {
    assets.request(
        AssetKey::Clan {
            clan_id: record.id.clone(),
            variant: ClanVariant::Base,
        },
        &clan_image_path(record.level),
    );
    assets.request(
        AssetKey::Clan {
            clan_id: record.id.clone(),
            variant: ClanVariant::Hit,
        },
        &clan_hit_image_path(record.level),
    );
    if record.formation_level > 0 {
        assets.request(
            AssetKey::Clan {
                clan_id: record.id.clone(),
                variant: ClanVariant::Formation,
            },
            &formation_image_path(record.formation_level),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingAssets {
        requests: Vec<(AssetKey, String)>,
        evictions: Vec<String>,
    }

    impl AssetStore for RecordingAssets {
        fn request(&mut self, key: AssetKey, relative_path: &str) {
            self.requests.push((key, relative_path.to_string()));
        }

        fn evict_clan(&mut self, clan_id: &str) {
            self.evictions.push(clan_id.to_string());
        }
    }

    fn record(id: &str, level: u32) -> ClanRecord {
        ClanRecord {
            id: id.to_string(),
            name: format!("Clan {id}"),
            level,
            hp: 500,
            max_hp: 1000,
            owner_id: "owner".to_string(),
            owner_name: "Owner".to_string(),
            treasury: 0,
            member_count: 3,
            elder_count: 0,
            formation_level: 0,
            formation_shield: 0,
            max_formation_shield: 0,
        }
    }

    fn added(id: &str, level: u32) -> ChangeRecord {
        ChangeRecord {
            id: id.to_string(),
            kind: ChangeKind::Added,
            data: Some(record(id, level)),
        }
    }

    fn modified(id: &str, data: ClanRecord) -> ChangeRecord {
        ChangeRecord {
            id: id.to_string(),
            kind: ChangeKind::Modified,
            data: Some(data),
        }
    }

    fn removed(id: &str) -> ChangeRecord {
        ChangeRecord {
            id: id.to_string(),
            kind: ChangeKind::Removed,
            data: None,
        }
    }

    #[test]
    fn map_contains_exactly_last_reported_presence() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        directory.apply_batch(
            &[added("clan_A", 1), added("clan_B", 2), removed("clan_A")],
            &mut assets,
        );
        directory.apply_batch(&[added("clan_C", 1)], &mut assets);

        assert!(directory.clan("clan_A").is_none());
        assert!(directory.clan("clan_B").is_some());
        assert!(directory.clan("clan_C").is_some());
        assert_eq!(directory.clan_count(), 2);
    }

    #[test]
    fn within_batch_order_is_last_write_wins_per_id() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        let mut later = record("clan_A", 3);
        later.hp = 1;
        directory.apply_batch(
            &[added("clan_A", 1), modified("clan_A", later)],
            &mut assets,
        );

        let clan = directory.clan("clan_A").expect("clan present");
        assert_eq!(clan.level, 3);
        assert_eq!(clan.hp, 1);
    }

    #[test]
    fn modified_twice_is_idempotent() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();
        directory.apply_batch(&[added("clan_A", 2)], &mut assets);

        let change = modified("clan_A", record("clan_A", 2));
        directory.apply_batch(&[change.clone()], &mut assets);
        let snapshot = directory.clan("clan_A").cloned();
        let requests_after_first = assets.requests.len();

        directory.apply_batch(&[change], &mut assets);
        assert_eq!(directory.clan("clan_A").cloned(), snapshot);
        // Same requests issued again, targeting the same keys: the cache
        // overwrites, so the observable asset state is unchanged too.
        assert_eq!(assets.requests.len(), requests_after_first + 2);
        assert_eq!(
            assets.requests[requests_after_first..],
            assets.requests[requests_after_first - 2..requests_after_first]
        );
    }

    #[test]
    fn level_change_requests_new_variant_urls() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        directory.apply_batch(&[added("clan_A", 1)], &mut assets);
        assert_eq!(assets.requests[0].1, "images/castle-lv1.png");
        assert_eq!(assets.requests[1].1, "images/castle-lv1-hit.png");

        directory.apply_batch(&[modified("clan_A", record("clan_A", 2))], &mut assets);
        assert_eq!(assets.requests[2].1, "images/castle-lv2.gif");
        assert_eq!(assets.requests[3].1, "images/castle-lv2-hit.gif");
    }

    #[test]
    fn formation_asset_requested_only_when_leveled() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        let mut formed = record("clan_A", 1);
        formed.formation_level = 2;
        directory.apply_batch(&[modified("clan_A", formed)], &mut assets);

        assert_eq!(assets.requests.len(), 3);
        assert_eq!(assets.requests[2].1, "images/formation-lv2.png");
    }

    #[test]
    fn removal_evicts_assets_and_clears_target_in_same_update() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        directory.apply_batch(&[added("clan_A", 1)], &mut assets);
        assert!(directory.select_target("clan_A"));

        directory.apply_batch(&[removed("clan_A")], &mut assets);
        assert_eq!(assets.evictions, vec!["clan_A".to_string()]);
        assert!(directory.current_target_id().is_none());
    }

    #[test]
    fn removal_of_unrelated_clan_keeps_target() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        directory.apply_batch(&[added("clan_A", 1), added("clan_B", 1)], &mut assets);
        assert!(directory.select_target("clan_A"));

        directory.apply_batch(&[removed("clan_B")], &mut assets);
        assert_eq!(directory.current_target_id(), Some("clan_A"));
    }

    #[test]
    fn selecting_home_clan_or_absent_id_is_refused() {
        let mut directory = ClanDirectory::new(Some("clan_home".to_string()));
        let mut assets = RecordingAssets::default();
        directory.apply_batch(&[added("clan_home", 1)], &mut assets);

        assert!(!directory.select_target("clan_home"));
        assert!(!directory.select_target("clan_missing"));
        assert!(directory.current_target_id().is_none());
    }

    #[test]
    fn cycle_target_wraps_and_skips_home_clan() {
        let mut directory = ClanDirectory::new(Some("clan_home".to_string()));
        let mut assets = RecordingAssets::default();
        directory.apply_batch(
            &[added("clan_home", 1), added("clan_A", 1), added("clan_B", 1)],
            &mut assets,
        );

        assert_eq!(directory.cycle_target(), Some("clan_A"));
        assert_eq!(directory.cycle_target(), Some("clan_B"));
        assert_eq!(directory.cycle_target(), Some("clan_A"));
    }

    #[test]
    fn cycle_target_with_only_home_clan_clears_pointer() {
        let mut directory = ClanDirectory::new(Some("clan_home".to_string()));
        let mut assets = RecordingAssets::default();
        directory.apply_batch(&[added("clan_home", 1)], &mut assets);

        assert_eq!(directory.cycle_target(), None);
        assert!(directory.current_target_id().is_none());
    }

    #[test]
    fn malformed_record_is_quarantined() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();

        let mut bad = record("clan_A", 1);
        bad.name = String::new();
        directory.apply_batch(
            &[ChangeRecord {
                id: "clan_A".to_string(),
                kind: ChangeKind::Added,
                data: Some(bad),
            }],
            &mut assets,
        );

        assert!(directory.clan("clan_A").is_none());
        assert!(assets.requests.is_empty());
    }

    #[test]
    fn upsert_without_data_is_skipped() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();
        directory.apply_batch(
            &[ChangeRecord {
                id: "clan_A".to_string(),
                kind: ChangeKind::Modified,
                data: None,
            }],
            &mut assets,
        );
        assert!(directory.clan("clan_A").is_none());
    }

    #[test]
    fn heal_target_clears_dangling_pointer() {
        let mut directory = ClanDirectory::new(None);
        let mut assets = RecordingAssets::default();
        directory.apply_batch(&[added("clan_A", 1)], &mut assets);
        assert!(directory.select_target("clan_A"));

        // Simulate the pointer outliving the snapshot entry.
        directory.clans.remove("clan_A");
        directory.heal_target();
        assert!(directory.current_target_id().is_none());
    }

    #[test]
    fn change_record_decodes_from_store_json() {
        let json = r#"{
            "id": "clan_A",
            "type": "modified",
            "data": {
                "name": "Azure Peak",
                "level": 2,
                "hp": 800,
                "maxHp": 1200,
                "ownerId": "u1",
                "ownerName": "Linh",
                "formationLevel": 1,
                "formationShield": 40,
                "maxFormationShield": 100
            }
        }"#;
        let change: ChangeRecord = serde_json::from_str(json).expect("decode");
        assert_eq!(change.kind, ChangeKind::Modified);
        let data = change.data.expect("data");
        assert_eq!(data.level, 2);
        assert_eq!(data.formation_shield, 40);
        // Fields the store omits default to zero.
        assert_eq!(data.treasury, 0);
        assert_eq!(data.member_count, 0);
    }

    #[test]
    fn image_paths_follow_level_extension_rule() {
        assert_eq!(clan_image_path(1), "images/castle-lv1.png");
        assert_eq!(clan_image_path(3), "images/castle-lv3.gif");
        assert_eq!(clan_hit_image_path(1), "images/castle-lv1-hit.png");
        assert_eq!(clan_hit_image_path(2), "images/castle-lv2-hit.gif");
        assert_eq!(formation_image_path(4), "images/formation-lv4.png");
    }
}
