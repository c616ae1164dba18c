//! Category-tree crawling
//!
//! Walks the announcement section as a tree rooted at the start page:
//! the start page itself is fetched once (its failure is fatal), and the
//! category pages it links are paginated branch by branch, unioning every
//! list-extraction strategy on every page. Page budgets bound the walk; a
//! fetch failure inside a branch abandons only that branch.

mod collector;

pub use collector::{collect_list_items, CollectedList};
