// Cosmos Driver
// Azure CosmosDB rejects statements with a trailing semicolon

use crate::db::descriptor::DriverDescriptor;
use crate::db::url::strip_trailing_semicolon;

/// Descriptor for the `cosmos` backend
pub fn descriptor() -> DriverDescriptor {
    DriverDescriptor::new("cosmos")
        .with_aliases(&["gocosmos"])
        .with_process(strip_trailing_semicolon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_strips_semicolon() {
        let desc = descriptor();
        assert_eq!(desc.process("SELECT * FROM c;  "), "SELECT * FROM c");
        assert_eq!(desc.process("SELECT 1"), "SELECT 1");
        assert_eq!(desc.aliases, vec!["gocosmos".to_string()]);
    }
}
