// Adapters layer: concrete implementations for external systems (csv files, local fs, http)

pub mod csv_io;
pub mod http_api;
pub mod local_storage;
