pub mod clients;
pub mod resource_id;
pub mod sdk_types;
