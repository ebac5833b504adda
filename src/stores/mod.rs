//! Domain subsystems: typed record stores over the shared database.
//!
//! Each store owns its entities and exposes free-function operations taking
//! a `&Store` handle. Mutations go through the keyed broker; reads go
//! through the facade in [`query`].

pub mod identity;
pub mod inspection;
pub mod production;
pub mod query;
