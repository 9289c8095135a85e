// Database Drivers
// Built-in backend descriptors; `all()` is the list handed to the registry at startup

pub mod cosmos;
pub mod databend;
pub mod hive;
pub mod sqlite;

pub use sqlite::{SqliteConnection, SqliteReader};

use crate::db::descriptor::DriverDescriptor;

/// Backends registered without any hooks
const PLAIN: [&str; 5] = ["bigquery", "chai", "godynamo", "maxcompute", "ramsql"];

/// Every built-in descriptor, in registration order
pub fn all() -> Vec<DriverDescriptor> {
    let mut descriptors = vec![
        sqlite::descriptor(),
        databend::descriptor(),
        cosmos::descriptor(),
        hive::descriptor(),
    ];
    descriptors.extend(PLAIN.iter().map(|name| DriverDescriptor::new(name)));
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::registry::DriverRegistry;

    #[test]
    fn test_all_register_cleanly() {
        let registry = DriverRegistry::build(all()).unwrap();
        assert_eq!(registry.supported_names().len(), 9);
        for name in ["sqlite3", "file", "gocosmos", "databend", "hive", "ramsql"] {
            assert!(registry.has_driver(name), "{} missing", name);
        }
        assert!(registry.lookup("bigquery").unwrap().new_metadata_reader.is_none());
    }
}
