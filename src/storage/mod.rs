pub mod hasher;
pub mod image_store;
