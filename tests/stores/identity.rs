use registro::core::db::initialize_registro_db;
use registro::core::error::RegistroError;
use registro::core::store::Store;
use registro::stores::identity::{
    Role, get_user, hash_credential, list_users, register_user, remove_user, set_user_role,
    user_exists,
};
use tempfile::tempdir;

fn setup_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let data_dir = tmp.path().join(".registro").join("data");
    initialize_registro_db(&data_dir).unwrap();
    let store = Store::open(tmp.path()).unwrap();
    (tmp, store)
}

#[test]
fn test_register_and_exists() {
    let (_tmp, store) = setup_store();

    assert!(!user_exists(&store, "alice").unwrap());

    let user = register_user(
        &store,
        "alice",
        "Alice Silva",
        &hash_credential("s3cret"),
        Role::Producao,
    )
    .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.name, "Alice Silva");
    assert_eq!(user.role, Role::Producao);
    assert_eq!(user.hashed_password, hash_credential("s3cret"));
    assert!(user.created_at.ends_with('Z'));

    assert!(user_exists(&store, "alice").unwrap());
    assert!(!user_exists(&store, "Alice").unwrap());
}

#[test]
fn test_duplicate_username_rejected() {
    let (_tmp, store) = setup_store();

    register_user(&store, "alice", "Alice Silva", "h1", Role::Producao).unwrap();
    let err = register_user(&store, "alice", "Another Alice", "h2", Role::Admin).unwrap_err();
    assert!(matches!(err, RegistroError::DuplicateIdentity(_)));

    // First registration is untouched by the failed attempt.
    let user = get_user(&store, "alice").unwrap().unwrap();
    assert_eq!(user.name, "Alice Silva");
    assert_eq!(user.hashed_password, "h1");
    assert_eq!(user.role, Role::Producao);
}

#[test]
fn test_usernames_are_case_sensitive() {
    let (_tmp, store) = setup_store();

    register_user(&store, "alice", "Alice Silva", "h1", Role::Producao).unwrap();
    register_user(&store, "Alice", "Alice Souza", "h2", Role::Assistencia).unwrap();

    let users = list_users(&store).unwrap();
    assert_eq!(users.len(), 2);
    // ORDER BY username: uppercase sorts before lowercase in SQLite's
    // default BINARY collation.
    assert_eq!(users[0].username, "Alice");
    assert_eq!(users[1].username, "alice");
}

#[test]
fn test_set_role() {
    let (_tmp, store) = setup_store();

    register_user(&store, "bob", "Bob Santos", "h", Role::Producao).unwrap();
    let updated = set_user_role(&store, "bob", Role::Assistencia).unwrap();
    assert_eq!(updated.role, Role::Assistencia);

    let fetched = get_user(&store, "bob").unwrap().unwrap();
    assert_eq!(fetched.role, Role::Assistencia);

    let err = set_user_role(&store, "nobody", Role::Admin).unwrap_err();
    assert!(matches!(err, RegistroError::NotFound(_)));
}

#[test]
fn test_remove_is_always_refused() {
    let (_tmp, store) = setup_store();

    register_user(&store, "alice", "Alice Silva", "h", Role::Producao).unwrap();
    let err = remove_user(&store, "alice").unwrap_err();
    assert!(matches!(err, RegistroError::UnsupportedOperation(_)));

    // Removal of unknown users is refused the same way, not NotFound.
    let err = remove_user(&store, "ghost").unwrap_err();
    assert!(matches!(err, RegistroError::UnsupportedOperation(_)));

    assert!(user_exists(&store, "alice").unwrap());
}

#[test]
fn test_blank_fields_rejected() {
    let (_tmp, store) = setup_store();

    let err = register_user(&store, "", "Alice", "h", Role::Producao).unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    let err = register_user(&store, "alice", "   ", "h", Role::Producao).unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    assert!(!user_exists(&store, "alice").unwrap());
}

#[test]
fn test_hash_credential_shape() {
    let a = hash_credential("s3cret");
    let b = hash_credential("s3cret");
    let c = hash_credential("other");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[test]
fn test_get_missing_user() {
    let (_tmp, store) = setup_store();
    assert!(get_user(&store, "nobody").unwrap().is_none());
}
