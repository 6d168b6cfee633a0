pub mod bounding_box;
pub mod id_pool;
