use crate::models::Outline;
use crate::storage::{outline_key, outline_timestamp_key, save_json, KeyValueStore};

/// The local mirror of the last outline the remote store accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineSnapshot {
    pub outline: Outline,
    /// ISO-8601 time of the save that produced this snapshot.
    pub saved_at: Option<String>,
}

pub fn save_outline_snapshot(
    kv: &impl KeyValueStore,
    deposition_id: &str,
    outline: &Outline,
    saved_at: &str,
) {
    if deposition_id.trim().is_empty() {
        return;
    }
    save_json(kv, &outline_key(deposition_id), outline);
    kv.set_item(&outline_timestamp_key(deposition_id), saved_at);
}

/// Reads the mirror back. An unparseable outline is reported and treated
/// as missing.
pub fn load_outline_snapshot(kv: &impl KeyValueStore, deposition_id: &str) -> Option<OutlineSnapshot> {
    if deposition_id.trim().is_empty() {
        return None;
    }
    let raw = kv.get_item(&outline_key(deposition_id))?;
    let outline = match serde_json::from_str::<Outline>(&raw) {
        Ok(o) => o,
        Err(e) => {
            leptos::logging::warn!("discarding corrupt local outline for {deposition_id}: {e}");
            return None;
        }
    };

    Some(OutlineSnapshot {
        outline,
        saved_at: load_saved_at(kv, deposition_id),
    })
}

/// The timestamp alone; it is kept even when the outline itself is absent.
pub fn load_saved_at(kv: &impl KeyValueStore, deposition_id: &str) -> Option<String> {
    if deposition_id.trim().is_empty() {
        return None;
    }
    kv.get_item(&outline_timestamp_key(deposition_id))
        .filter(|s| !s.trim().is_empty())
}

pub fn clear_outline_snapshot(kv: &impl KeyValueStore, deposition_id: &str) {
    if deposition_id.trim().is_empty() {
        return;
    }
    kv.remove_item(&outline_key(deposition_id));
    kv.remove_item(&outline_timestamp_key(deposition_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::test_support::sample_outline;
    use crate::storage::memory::MemoryStorage;

    const AT: &str = "2024-05-01T10:00:00.000Z";

    #[test]
    fn test_snapshot_roundtrip_keeps_indent_levels() {
        let kv = MemoryStorage::default();
        let mut o = sample_outline();
        o.sections[0].questions[1].indent_level = 2;

        save_outline_snapshot(&kv, "dep-1", &o, AT);
        let snap = load_outline_snapshot(&kv, "dep-1").expect("snapshot should load");
        assert_eq!(snap.outline, o);
        assert_eq!(snap.saved_at.as_deref(), Some(AT));

        // Stored as a bare section array under the legacy key.
        let raw = kv.get_item("deposition-outline-dep-1").expect("raw value");
        assert!(raw.starts_with('['));
    }

    #[test]
    fn test_snapshots_are_isolated_per_deposition() {
        let kv = MemoryStorage::default();
        save_outline_snapshot(&kv, "dep-1", &sample_outline(), AT);
        assert!(load_outline_snapshot(&kv, "dep-2").is_none());
    }

    #[test]
    fn test_empty_id_is_ignored() {
        let kv = MemoryStorage::default();
        save_outline_snapshot(&kv, "  ", &sample_outline(), AT);
        assert_eq!(kv.len(), 0);
        assert!(load_outline_snapshot(&kv, "").is_none());
    }

    #[test]
    fn test_corrupt_snapshot_reads_as_missing() {
        let kv = MemoryStorage::default();
        kv.set_item(&outline_key("dep-1"), "{\"sections\":");
        kv.set_item(&outline_timestamp_key("dep-1"), AT);
        assert!(load_outline_snapshot(&kv, "dep-1").is_none());
        assert_eq!(load_saved_at(&kv, "dep-1").as_deref(), Some(AT));
    }

    #[test]
    fn test_clear() {
        let kv = MemoryStorage::default();
        save_outline_snapshot(&kv, "dep-1", &sample_outline(), AT);
        clear_outline_snapshot(&kv, "dep-1");
        assert_eq!(kv.len(), 0);
    }
}
