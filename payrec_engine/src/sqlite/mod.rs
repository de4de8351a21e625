//! SQLite backend for the order store.

mod store_impl;

pub mod db;

pub use store_impl::SqliteOrderStore;
