use super::*;

#[test]
fn test_migration_name_creation() {
    let name = MigrationName::new("create_users");
    assert_eq!(name.as_str(), "create_users");
    assert_eq!(format!("{}", name), "create_users");
}

#[test]
fn test_migration_name_rejects_separators() {
    assert!(MigrationName::try_new("").is_none());
    assert!(MigrationName::try_new("two words").is_none());
    assert!(MigrationName::try_new("a:b").is_none());
    assert!(MigrationName::try_new("a,b").is_none());
    assert!(MigrationName::try_new("add-index_2").is_some());
}

#[test]
fn test_migration_name_borrow_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<MigrationName, i32> = HashMap::new();
    map.insert(MigrationName::new("t1"), 1);
    assert_eq!(map.get("t1"), Some(&1));
}

#[test]
fn test_migration_name_serde_validates() {
    let name: MigrationName = serde_json::from_str(r#""t1""#).unwrap();
    assert_eq!(name, "t1");
    assert!(serde_json::from_str::<MigrationName>(r#""has space""#).is_err());
    assert_eq!(serde_json::to_string(&name).unwrap(), r#""t1""#);
}
