pub mod couchdb;
pub mod memory;

pub use couchdb::CouchDbStore;
pub use memory::MemoryStore;
