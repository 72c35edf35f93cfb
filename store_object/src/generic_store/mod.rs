pub mod collection;
pub mod core;
pub mod soft_deletable;
pub mod store_object;
pub mod transaction;

pub use collection::Collection;
pub use core::GenericStore;
pub use transaction::StoreTransaction;
