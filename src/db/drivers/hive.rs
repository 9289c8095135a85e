// Hive Driver
// Forces PLAIN authentication for user-authenticated connections

use crate::db::descriptor::DriverDescriptor;
use crate::db::url::{force_query_parameters, DbUrl};
use std::sync::Arc;

/// Set `auth=PLAIN` when the URL names a user but no auth mechanism
pub fn force_plain_auth(url: &mut DbUrl) {
    if url.user().is_some() && url.query_param("auth").map_or(true, |a| a.is_empty()) {
        force_query_parameters(&[("auth", "PLAIN")])(url);
    }
}

/// Descriptor for the `hive` backend
pub fn descriptor() -> DriverDescriptor {
    DriverDescriptor::new("hive").with_force_params(Arc::new(force_plain_auth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_gets_plain_auth() {
        let mut url = DbUrl::parse("hive://alice@warehouse:10000/default").unwrap();
        descriptor().force_params(&mut url);
        assert_eq!(url.query_param("auth").as_deref(), Some("PLAIN"));
    }

    #[test]
    fn test_explicit_auth_kept() {
        let mut url = DbUrl::parse("hive://alice@warehouse:10000/default?auth=KERBEROS").unwrap();
        descriptor().force_params(&mut url);
        assert_eq!(url.query_param("auth").as_deref(), Some("KERBEROS"));
    }

    #[test]
    fn test_anonymous_untouched() {
        let mut url = DbUrl::parse("hive://warehouse:10000/default").unwrap();
        descriptor().force_params(&mut url);
        assert_eq!(url.query_param("auth"), None);
    }
}
