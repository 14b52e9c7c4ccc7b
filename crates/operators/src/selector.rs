//! Caller-supplied selector closures shared by the join operators

use std::sync::Arc;

use rill_sequence::SelectorError;

/// Key selector: maps an item to its correlation key
///
/// `None` is the absent key; items carrying it join only against other
/// absent-key items, through a single shared bucket. A selector failure
/// fails the whole operator.
pub type KeyFn<T, K> = Arc<dyn Fn(&T) -> Result<Option<K>, SelectorError> + Send + Sync>;
