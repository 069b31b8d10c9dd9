//! Unit tests for the Identifiers module
//!
//! Tests cover identifier creation, parsing, conversion and display.

use core_kernel::{BillId, OwnerId, TenantId};
use uuid::Uuid;

mod bill_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(BillId::new(), BillId::new());
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = BillId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = BillId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(BillId::prefix(), "BIL");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("BIL-not-a-uuid".parse::<BillId>().is_err());
    }
}

mod party_id_tests {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        assert_eq!(OwnerId::prefix(), "OWN");
        assert_eq!(TenantId::prefix(), "TNT");
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = TenantId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
        assert!(id.to_string().ends_with(&uuid.to_string()));
    }

    #[test]
    fn test_wrong_prefix_is_not_stripped() {
        let owner = OwnerId::new();
        let as_tenant = owner.to_string().replace("OWN-", "TNT-");
        assert!(as_tenant.parse::<OwnerId>().is_err());
    }
}
