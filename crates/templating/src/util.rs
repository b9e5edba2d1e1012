//! JSON helpers shared by the locals store and the render pipeline.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

// Store mutations never leave a map half-updated, so a poisoned lock is still
// safe to use.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Deep-merges `overlay` into `base`.
///
/// Keys present in both maps take the value from `overlay`, except when both
/// values are objects, in which case they are merged recursively.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use templating::merge_json;
///
/// let mut base = json!({"site": {"name": "Docs", "lang": "en"}, "page": 1});
/// let overlay = json!({"site": {"lang": "fr"}, "page": 2});
///
/// merge_json(base.as_object_mut().unwrap(), overlay.as_object().unwrap());
/// assert_eq!(base, json!({"site": {"name": "Docs", "lang": "fr"}, "page": 2}));
/// ```
pub fn merge_json(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (base.get_mut(key), value)
        {
            merge_json(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}
