use serde::{de::DeserializeOwned, Serialize};

pub const TOKEN_KEY: &str = "depo_outline_token";

pub fn outline_key(deposition_id: &str) -> String {
    format!("deposition-outline-{deposition_id}")
}

pub fn outline_timestamp_key(deposition_id: &str) -> String {
    format!("deposition-outline-timestamp-{deposition_id}")
}

/// String key/value persistence. `localStorage` in the browser; an
/// in-memory map in native tests.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// `window.localStorage`. Every call is a no-op when storage is unavailable
/// (private mode, quota, no window).
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(key, value).is_err() {
                leptos::logging::warn!("localStorage write failed for {key}");
            }
        }
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

pub fn load_json<T: DeserializeOwned>(kv: &impl KeyValueStore, key: &str) -> Option<T> {
    let json = kv.get_item(key)?;
    serde_json::from_str(&json).ok()
}

pub fn save_json<T: Serialize>(kv: &impl KeyValueStore, key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        kv.set_item(key, &json);
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;

    #[test]
    fn test_keys_are_per_deposition() {
        assert_eq!(outline_key("d1"), "deposition-outline-d1");
        assert_eq!(outline_timestamp_key("d1"), "deposition-outline-timestamp-d1");
        assert_ne!(outline_key("d1"), outline_key("d2"));
    }

    #[test]
    fn test_json_helpers() {
        let kv = MemoryStorage::default();
        save_json(&kv, "k", &vec![1, 2, 3]);
        assert_eq!(load_json::<Vec<i32>>(&kv, "k"), Some(vec![1, 2, 3]));

        kv.set_item("bad", "{not json");
        assert_eq!(load_json::<Vec<i32>>(&kv, "bad"), None);
        assert_eq!(load_json::<Vec<i32>>(&kv, "missing"), None);
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_browser_storage_roundtrip() {
        let kv = BrowserStorage;
        kv.remove_item("depo_outline_test_key");
        assert!(kv.get_item("depo_outline_test_key").is_none());

        kv.set_item("depo_outline_test_key", "v1");
        assert_eq!(kv.get_item("depo_outline_test_key").as_deref(), Some("v1"));

        kv.remove_item("depo_outline_test_key");
        assert!(kv.get_item("depo_outline_test_key").is_none());
    }
}
