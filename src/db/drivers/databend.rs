// Databend Driver
// information_schema introspection with `?` placeholders and a reduced feature set

use crate::db::descriptor::DriverDescriptor;
use crate::metadata::{ClauseName, DefaultWriter, Feature, InformationSchemaReader, ReaderOptions};

/// Reader configuration for Databend's information_schema
pub fn reader_options() -> ReaderOptions {
    ReaderOptions::new()
        .with_placeholder(|_| "?".to_string())
        // sequences carry no increment column
        .with_custom_clauses([(ClauseName::SequenceColumnsIncrement, "''".to_string())])
        .with_feature(Feature::Functions, false)
        .with_feature(Feature::Indexes, false)
        .with_feature(Feature::Constraints, false)
        .with_feature(Feature::ColumnPrivileges, false)
}

/// Descriptor for the `databend` backend
pub fn descriptor() -> DriverDescriptor {
    let new_reader = InformationSchemaReader::factory(reader_options());
    DriverDescriptor::new("databend")
        .with_column_types()
        .with_writer(move |conn, out, cancel| {
            let reader = InformationSchemaReader::new(conn, reader_options(), cancel);
            Box::new(DefaultWriter::new(Box::new(reader), out))
        })
        .with_reader(new_reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_options() {
        let opts = reader_options();
        assert_eq!(opts.placeholder(1), "?");
        assert_eq!(opts.placeholder(7), "?");
        assert_eq!(opts.clause(ClauseName::SequenceColumnsIncrement), "''");
        for feature in [
            Feature::Functions,
            Feature::Indexes,
            Feature::Constraints,
            Feature::ColumnPrivileges,
        ] {
            assert!(!opts.enabled(feature), "{} should be disabled", feature);
        }
        assert!(opts.enabled(Feature::Sequences));
        assert!(opts.enabled(Feature::TablePrivileges));
    }

    #[test]
    fn test_descriptor() {
        let desc = descriptor();
        assert_eq!(desc.name, "databend");
        assert!(desc.use_column_types);
        assert!(desc.new_metadata_reader.is_some());
        assert!(desc.new_metadata_writer.is_some());
        assert!(desc.process.is_none());
    }
}
