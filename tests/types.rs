// ABOUTME: Integration tests for type-safe identifiers and network sets.
// ABOUTME: Tests ordering, set arithmetic, and display formatting.

use bridgekeeper::types::*;

mod id_tests {
    use super::*;

    #[test]
    fn display_is_raw_value() {
        let id = NetworkId::new("9b1f3c");
        assert_eq!(id.to_string(), "9b1f3c");
        assert_eq!(id.as_str(), "9b1f3c");
    }

    #[test]
    fn short_truncates_long_ids() {
        let id = ContainerId::new("4f2a9c1b7d3e8a6f5c0b");
        assert_eq!(id.short(), "4f2a9c1b7d3e");
        assert_eq!(ContainerId::new("proxy").short(), "proxy");
    }

    #[test]
    fn matches_rejects_empty() {
        let id = ContainerId::new("proxy");
        assert!(id.matches("proxy"));
        assert!(!id.matches(""));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&NetworkId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}

mod network_set_tests {
    use super::*;

    fn set(ids: &[&str]) -> NetworkSet {
        ids.iter().map(|id| NetworkRef::bridge(*id, *id)).collect()
    }

    fn ids(set: &NetworkSet) -> Vec<&str> {
        set.ids().map(|id| id.as_str()).collect()
    }

    #[test]
    fn difference_keeps_only_left_side() {
        let desired = set(&["a", "b", "c"]);
        let current = set(&["b", "d"]);

        assert_eq!(ids(&desired.difference(&current)), ["a", "c"]);
        assert_eq!(ids(&current.difference(&desired)), ["d"]);
    }

    #[test]
    fn remove_and_contains() {
        let mut networks = set(&["a", "b"]);
        assert!(networks.contains(&NetworkId::new("a")));

        let removed = networks.remove(&NetworkId::new("a")).unwrap();
        assert_eq!(removed.name, "a");
        assert!(!networks.contains(&NetworkId::new("a")));
        assert_eq!(networks.len(), 1);
    }

    #[test]
    fn empty_set() {
        let networks = NetworkSet::new();
        assert!(networks.is_empty());
        assert_eq!(networks.iter().count(), 0);
    }

    #[test]
    fn serializes_as_sorted_list() {
        let json = serde_json::to_value(set(&["z", "a"])).unwrap();
        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[1]["id"], "z");
        assert_eq!(json[0]["driver"], "bridge");
    }
}

mod network_ref_tests {
    use super::*;

    #[test]
    fn equality_is_by_id() {
        let a = NetworkRef::bridge("n1", "frontend");
        let b = NetworkRef::new(NetworkId::new("n1"), "renamed", NetworkDriver::Bridge);
        assert_eq!(a, b);
    }

    #[test]
    fn display_falls_back_to_id() {
        let unnamed = NetworkRef::bridge("n1", "");
        assert_eq!(unnamed.to_string(), "n1");
    }

    #[test]
    fn non_bridge_driver() {
        let driver = NetworkDriver::parse("overlay");
        assert!(!driver.is_bridge());
        assert_eq!(driver.to_string(), "overlay");
    }
}
