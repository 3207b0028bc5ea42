use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tokio::sync::Mutex;

use crate::{
    domain::{names_match, Item, OwnerId, ShoppingList},
    errors::Error,
    Result,
};

/// One row of `/lists` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListSummary {
    pub name: String,
    pub total: usize,
    pub purchased: usize,
}

/// owner id -> that owner's lists, in creation order.
type Snapshot = HashMap<i64, Vec<ShoppingList>>;

/// Owns all shopping-list state and its persistence.
///
/// State lives behind one mutex, so every operation is atomic even across
/// owners; the per-owner locks in the transport layer serialize whole
/// commands. Each successful mutation is written to disk as a JSON snapshot
/// before it becomes visible, via temp-file + rename, so a mutation either
/// fully applies (memory and disk) or leaves the store unchanged.
pub struct ListStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl ListStore {
    /// Open the store, loading the snapshot file if one exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let snapshot = load_snapshot(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    pub async fn create_list(&self, owner: OwnerId, name: &str) -> Result<()> {
        let name = valid_name(name, "list name")?.to_string();
        self.with_owner_mut(owner, |lists| {
            if lists.iter().any(|l| names_match(&l.name, &name)) {
                return Err(Error::DuplicateList(name.clone()));
            }
            lists.push(ShoppingList::new(name.clone()));
            Ok(())
        })
        .await
    }

    /// Delete a list and all its items.
    pub async fn delete_list(&self, owner: OwnerId, name: &str) -> Result<()> {
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, name)?;
            lists.remove(idx);
            Ok(())
        })
        .await
    }

    /// Rename a list. Re-casing an existing name is allowed.
    pub async fn rename_list(&self, owner: OwnerId, name: &str, new_name: &str) -> Result<()> {
        let new_name = valid_name(new_name, "list name")?.to_string();
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, name)?;
            let taken = lists
                .iter()
                .enumerate()
                .any(|(i, l)| i != idx && names_match(&l.name, &new_name));
            if taken {
                return Err(Error::DuplicateList(new_name.clone()));
            }
            lists[idx].name = new_name.clone();
            Ok(())
        })
        .await
    }

    /// Insert an item, or update the quantity of an existing one (names are
    /// unique per list, case-insensitive). Returns true on update.
    pub async fn add_item(
        &self,
        owner: OwnerId,
        list: &str,
        item: &str,
        quantity: &str,
    ) -> Result<bool> {
        let item = valid_name(item, "item name")?.to_string();
        let quantity = if quantity.trim().is_empty() {
            "1".to_string()
        } else {
            quantity.trim().to_string()
        };
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, list)?;
            Ok(lists[idx].upsert_item(&item, &quantity))
        })
        .await
    }

    pub async fn remove_item(&self, owner: OwnerId, list: &str, item: &str) -> Result<()> {
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, list)?;
            if !lists[idx].remove_item(item) {
                return Err(item_not_found(item, &lists[idx].name));
            }
            Ok(())
        })
        .await
    }

    /// Set an item's purchased flag. Idempotent; returns the updated item.
    pub async fn mark_purchased(
        &self,
        owner: OwnerId,
        list: &str,
        item: &str,
        purchased: bool,
    ) -> Result<Item> {
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, list)?;
            let list_name = lists[idx].name.clone();
            lists[idx]
                .set_purchased(item, purchased)
                .cloned()
                .ok_or_else(|| item_not_found(item, &list_name))
        })
        .await
    }

    /// Drop every purchased item from a list. Returns how many were removed.
    pub async fn clear_purchased(&self, owner: OwnerId, list: &str) -> Result<usize> {
        self.with_owner_mut(owner, |lists| {
            let idx = find_list_idx(lists, list)?;
            Ok(lists[idx].clear_purchased())
        })
        .await
    }

    /// Read-only snapshot of a whole list (canonical name + ordered items).
    pub async fn get_list(&self, owner: OwnerId, list: &str) -> Result<ShoppingList> {
        let st = self.state.lock().await;
        let lists = st.get(&owner.0).map(Vec::as_slice).unwrap_or_default();
        let idx = find_list_idx(lists, list)?;
        Ok(lists[idx].clone())
    }

    /// Ordered read-only snapshot of a list's items.
    pub async fn list_items(&self, owner: OwnerId, list: &str) -> Result<Vec<Item>> {
        Ok(self.get_list(owner, list).await?.items)
    }

    /// Summaries of every list the owner has. Empty for unknown owners.
    pub async fn list_all(&self, owner: OwnerId) -> Vec<ListSummary> {
        let st = self.state.lock().await;
        st.get(&owner.0)
            .map(|lists| {
                lists
                    .iter()
                    .map(|l| ListSummary {
                        name: l.name.clone(),
                        total: l.items.len(),
                        purchased: l.purchased_count(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run a mutation against a copy of the owner's lists, persist the
    /// resulting snapshot, and only then commit it to memory. Failures at
    /// any step leave both memory and disk as they were.
    async fn with_owner_mut<T>(
        &self,
        owner: OwnerId,
        mutate: impl FnOnce(&mut Vec<ShoppingList>) -> Result<T>,
    ) -> Result<T> {
        let mut st = self.state.lock().await;
        let mut lists = st.get(&owner.0).cloned().unwrap_or_default();
        let out = mutate(&mut lists)?;

        let mut candidate = st.clone();
        candidate.insert(owner.0, lists);
        save_snapshot(&self.path, &candidate)?;
        *st = candidate;
        Ok(out)
    }
}

fn valid_name<'a>(raw: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

fn find_list_idx(lists: &[ShoppingList], name: &str) -> Result<usize> {
    lists
        .iter()
        .position(|l| names_match(&l.name, name))
        .ok_or_else(|| Error::NotFound(format!("list \"{}\"", name.trim())))
}

fn item_not_found(item: &str, list: &str) -> Error {
    Error::NotFound(format!("item \"{}\" in \"{list}\"", item.trim()))
}

fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let snapshot: Snapshot = serde_json::from_str(&txt)?;
    Ok(Some(snapshot))
}

fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let txt = serde_json::to_string(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, txt)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_store() -> (PathBuf, ListStore) {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        let path = PathBuf::from(format!("/tmp/slb-store-{pid}-{ts}/lists.json"));
        let store = ListStore::open(&path).unwrap();
        (path, store)
    }

    const OWNER: OwnerId = OwnerId(1);

    #[tokio::test]
    async fn create_twice_is_duplicate() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();

        let err = store.create_list(OWNER, "groceries").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateList(_)));

        // A different owner is free to reuse the name.
        store.create_list(OwnerId(2), "Groceries").await.unwrap();
    }

    #[tokio::test]
    async fn add_then_list_contains_item_once() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();

        assert!(!store.add_item(OWNER, "Groceries", "Milk", "2").await.unwrap());
        let items = store.list_items(OWNER, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].quantity, "2");
        assert!(!items[0].purchased);
    }

    #[tokio::test]
    async fn readding_updates_quantity_in_place() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "2").await.unwrap();

        assert!(store.add_item(OWNER, "Groceries", "milk", "3").await.unwrap());
        let items = store.list_items(OWNER, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, "3");
    }

    #[tokio::test]
    async fn mark_purchased_twice_equals_once() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();

        let first = store
            .mark_purchased(OWNER, "Groceries", "Milk", true)
            .await
            .unwrap();
        assert!(first.purchased);
        let second = store
            .mark_purchased(OWNER, "Groceries", "Milk", true)
            .await
            .unwrap();
        assert_eq!(first.purchased, second.purchased);

        let items = store.list_items(OWNER, "Groceries").await.unwrap();
        assert!(items[0].purchased);
    }

    #[tokio::test]
    async fn delete_then_read_is_not_found() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();

        store.delete_list(OWNER, "Groceries").await.unwrap();
        let err = store.list_items(OWNER, "Groceries").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn readd_update_then_purchase_leaves_one_entry() {
        let (_, store) = tmp_store();
        let u1 = OwnerId(101);

        store.create_list(u1, "Groceries").await.unwrap();
        store.add_item(u1, "Groceries", "Milk", "2").await.unwrap();
        assert!(store.add_item(u1, "Groceries", "Milk", "3").await.unwrap());
        store
            .mark_purchased(u1, "Groceries", "Milk", true)
            .await
            .unwrap();

        let items = store.list_items(u1, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].quantity, "3");
        assert!(items[0].purchased);
    }

    #[tokio::test]
    async fn empty_names_are_invalid() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();

        assert!(matches!(
            store.create_list(OWNER, "  ").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            store.add_item(OWNER, "Groceries", "", "1").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn remove_item_and_misses() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();

        store.remove_item(OWNER, "Groceries", "milk").await.unwrap();
        assert!(store.list_items(OWNER, "Groceries").await.unwrap().is_empty());
        assert!(matches!(
            store.remove_item(OWNER, "Groceries", "Milk").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn clear_purchased_reports_count() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();
        store.add_item(OWNER, "Groceries", "Bread", "1").await.unwrap();
        store
            .mark_purchased(OWNER, "Groceries", "Milk", true)
            .await
            .unwrap();

        assert_eq!(store.clear_purchased(OWNER, "Groceries").await.unwrap(), 1);
        let items = store.list_items(OWNER, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bread");
    }

    #[tokio::test]
    async fn rename_list_moves_the_name() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.create_list(OWNER, "Hardware").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();

        store.rename_list(OWNER, "Groceries", "Weekly").await.unwrap();
        assert!(matches!(
            store.list_items(OWNER, "Groceries").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert_eq!(store.list_items(OWNER, "Weekly").await.unwrap().len(), 1);

        assert!(matches!(
            store.rename_list(OWNER, "Weekly", "hardware").await.unwrap_err(),
            Error::DuplicateList(_)
        ));
        // Re-casing the same list is fine.
        store.rename_list(OWNER, "Weekly", "WEEKLY").await.unwrap();
    }

    #[tokio::test]
    async fn list_all_summarizes_counts() {
        let (_, store) = tmp_store();
        assert!(store.list_all(OWNER).await.is_empty());

        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "1").await.unwrap();
        store.add_item(OWNER, "Groceries", "Bread", "1").await.unwrap();
        store
            .mark_purchased(OWNER, "Groceries", "Bread", true)
            .await
            .unwrap();

        let all = store.list_all(OWNER).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Groceries");
        assert_eq!(all[0].total, 2);
        assert_eq!(all[0].purchased, 1);
    }

    #[tokio::test]
    async fn reopened_store_sees_persisted_state() {
        let (path, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "2").await.unwrap();
        store
            .mark_purchased(OWNER, "Groceries", "Milk", true)
            .await
            .unwrap();
        drop(store);

        let reopened = ListStore::open(&path).unwrap();
        let items = reopened.list_items(OWNER, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].quantity, "2");
        assert!(items[0].purchased);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_state_unchanged() {
        let (_, store) = tmp_store();
        store.create_list(OWNER, "Groceries").await.unwrap();
        store.add_item(OWNER, "Groceries", "Milk", "2").await.unwrap();

        let _ = store.add_item(OWNER, "Missing", "Eggs", "1").await.unwrap_err();
        let _ = store.create_list(OWNER, "groceries").await.unwrap_err();

        let items = store.list_items(OWNER, "Groceries").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(store.list_all(OWNER).await.len(), 1);
    }
}
