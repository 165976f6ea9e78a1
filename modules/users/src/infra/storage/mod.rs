mod memory_repo;
#[cfg(feature = "mongo")]
mod mongo_repo;

pub use memory_repo::InMemoryUserRepo;
#[cfg(feature = "mongo")]
pub use mongo_repo::MongoUserRepo;
