//! The application's list of lists.
//!
//! [`new_list_store`] builds the store every consumer shares; create it once
//! at startup and pass clones of the handle around.

mod list;

pub use list::List;

use crate::store::Store;

/// Observable, ordered sequence of [`List`] records.
pub type ListStore = Store<Vec<List>>;

const SEED: [(&str, &str); 3] = [
    ("list-1", "List 1"),
    ("list-2", "List 2"),
    ("list-3", "List 3"),
];

/// The records a fresh store starts with, in order.
pub fn seed() -> Vec<List> {
    SEED.iter().map(|&(id, name)| List::new(id, name)).collect()
}

/// Create a list store holding the [`seed`] records.
///
/// # Examples
///
/// ```
/// use list_store::{new_list_store, List};
///
/// let lists = new_list_store();
/// lists.update(|current| [current.clone(), vec![List::new("list-4", "List 4")]].concat());
///
/// let ids: Vec<String> = lists.get().into_iter().map(|l| l.id).collect();
/// assert_eq!(ids, ["list-1", "list-2", "list-3", "list-4"]);
/// ```
pub fn new_list_store() -> ListStore {
    Store::new(seed())
}
