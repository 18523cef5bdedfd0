mod memory;
mod news_repository;
mod postgres;
mod tag_repository;

pub use self::{
    memory::MemoryStore,
    news_repository::NewsRepository,
    postgres::{DBPool, connect, migrate},
    tag_repository::TagRepository,
};
