use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of a set of shopping lists: the numeric Telegram chat id.
///
/// A private chat and a group chat are both owners, so a household group
/// shares one set of lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

/// Telegram user id (numeric). Used for authorization and rate limiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// One entry in a shopping list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Free text: "2", "1 bag", "500g". Defaults to "1" at the command layer.
    pub quantity: String,
    pub purchased: bool,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            purchased: false,
            created_at: Utc::now(),
        }
    }
}

/// A named, insertion-ordered collection of items.
///
/// The owner is not stored here: the store keys lists by owner id, and a
/// list is identified by the (owner, name) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub name: String,
    pub items: Vec<Item>,
    pub created_at: DateTime<Utc>,
}

/// Case-insensitive name comparison used for both list and item lookups.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl ShoppingList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn find_item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| names_match(&i.name, name))
    }

    /// Insert a new item, or update the quantity of an existing one.
    ///
    /// Item names are unique within a list, case-insensitive. On update the
    /// position and purchased flag are preserved; only the quantity changes.
    /// Returns true if an existing entry was updated.
    pub fn upsert_item(&mut self, name: &str, quantity: &str) -> bool {
        if let Some(item) = self.items.iter_mut().find(|i| names_match(&i.name, name)) {
            item.quantity = quantity.to_string();
            return true;
        }
        self.items.push(Item::new(name, quantity));
        false
    }

    /// Remove an item by name. Returns false if no such item exists.
    pub fn remove_item(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !names_match(&i.name, name));
        self.items.len() < before
    }

    /// Set the purchased flag. Idempotent. Returns the item, if present.
    pub fn set_purchased(&mut self, name: &str, purchased: bool) -> Option<&Item> {
        let item = self.items.iter_mut().find(|i| names_match(&i.name, name))?;
        item.purchased = purchased;
        Some(item)
    }

    /// Drop every purchased item, keeping the rest in order.
    /// Returns how many were removed.
    pub fn clear_purchased(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.purchased);
        before - self.items.len()
    }

    pub fn purchased_count(&self) -> usize {
        self.items.iter().filter(|i| i.purchased).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_case_insensitive_and_keeps_position() {
        let mut list = ShoppingList::new("Groceries");
        assert!(!list.upsert_item("Milk", "2"));
        assert!(!list.upsert_item("Bread", "1"));

        // Re-add under different casing: quantity updated, no duplicate.
        assert!(list.upsert_item("milk", "3"));
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].name, "Milk");
        assert_eq!(list.items[0].quantity, "3");
    }

    #[test]
    fn upsert_preserves_purchased_flag() {
        let mut list = ShoppingList::new("Groceries");
        list.upsert_item("Milk", "2");
        list.set_purchased("Milk", true);

        list.upsert_item("Milk", "3");
        assert!(list.items[0].purchased);
    }

    #[test]
    fn set_purchased_is_idempotent() {
        let mut list = ShoppingList::new("Groceries");
        list.upsert_item("Milk", "1");

        assert!(list.set_purchased("milk", true).unwrap().purchased);
        assert!(list.set_purchased("MILK", true).unwrap().purchased);
        assert!(list.set_purchased("Eggs", true).is_none());
    }

    #[test]
    fn clear_purchased_keeps_order_of_the_rest() {
        let mut list = ShoppingList::new("Groceries");
        list.upsert_item("Milk", "1");
        list.upsert_item("Bread", "1");
        list.upsert_item("Eggs", "10");
        list.set_purchased("Milk", true);
        list.set_purchased("Eggs", true);

        assert_eq!(list.clear_purchased(), 2);
        let names: Vec<_> = list.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Bread"]);
    }

    #[test]
    fn remove_item_reports_misses() {
        let mut list = ShoppingList::new("Groceries");
        list.upsert_item("Milk", "1");

        assert!(list.remove_item("MILK"));
        assert!(!list.remove_item("Milk"));
        assert!(list.items.is_empty());
    }
}
