//! Integration tests for the key hierarchy (wrap chain and grants).

use bastion::crypto::DataKey;
use bastion::errors::BastionError;
use bastion::vault::hierarchy::{
    create_project_key, grant_collaborator_access, initialize_vault, open_project_key,
    open_secret, open_secrets, seal_secret, unlock_master, unlock_project_key,
};
use bastion::vault::SecretRecord;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

#[test]
fn initialize_then_unlock_with_correct_password() {
    let wrapped = initialize_vault(b"correct-horse").expect("init");

    let m1 = unlock_master(b"correct-horse", &wrapped.salt, &wrapped.wrapped_master_key)
        .expect("unlock 1");
    let m2 = unlock_master(b"correct-horse", &wrapped.salt, &wrapped.wrapped_master_key)
        .expect("unlock 2");
    assert_eq!(m1, m2, "every unlock must yield the same master key");
}

#[test]
fn unlock_with_wrong_password_is_unlock_error() {
    let wrapped = initialize_vault(b"correct-horse").expect("init");

    let err = unlock_master(b"wrong", &wrapped.salt, &wrapped.wrapped_master_key).unwrap_err();
    assert!(matches!(err, BastionError::Unlock(_)));
    assert_eq!(err.to_string(), "Unlock failed — wrong password or corrupted vault");
}

#[test]
fn corrupted_wrap_looks_the_same_as_wrong_password() {
    let wrapped = initialize_vault(b"correct-horse").expect("init");

    let mut bytes = wrapped.wrapped_master_key.as_bytes().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x80;
    let corrupted = bastion::crypto::Envelope::from_bytes(bytes);

    let err = unlock_master(b"correct-horse", &wrapped.salt, &corrupted).unwrap_err();
    assert!(matches!(err, BastionError::Unlock(_)));
}

#[test]
fn each_vault_gets_its_own_salt() {
    let a = initialize_vault(b"same-password").unwrap();
    let b = initialize_vault(b"same-password").unwrap();
    assert_ne!(a.salt, b.salt);
}

// ---------------------------------------------------------------------------
// Project data keys
// ---------------------------------------------------------------------------

#[test]
fn two_projects_never_share_a_data_key() {
    let wrapped = initialize_vault(b"correct-horse").unwrap();
    let master =
        unlock_master(b"correct-horse", &wrapped.salt, &wrapped.wrapped_master_key).unwrap();

    let p1 = create_project_key(&master).unwrap();
    let p2 = create_project_key(&master).unwrap();
    assert_ne!(p1.data_key, p2.data_key);

    assert_eq!(open_project_key(&master, &p1.wrapped_data_key).unwrap(), p1.data_key);
    assert_eq!(open_project_key(&master, &p2.wrapped_data_key).unwrap(), p2.data_key);
}

#[test]
fn secret_opens_only_under_its_own_project_key() {
    let wrapped = initialize_vault(b"correct-horse").unwrap();
    let master =
        unlock_master(b"correct-horse", &wrapped.salt, &wrapped.wrapped_master_key).unwrap();
    let d = create_project_key(&master).unwrap().data_key;
    let other = create_project_key(&master).unwrap().data_key;

    let sealed = seal_secret(&d, "postgres://x").unwrap();
    assert_eq!(open_secret(&d, &sealed).unwrap(), "postgres://x");
    assert!(matches!(
        open_secret(&other, &sealed),
        Err(BastionError::Authentication(_))
    ));
}

// ---------------------------------------------------------------------------
// Collaborator grants
// ---------------------------------------------------------------------------

#[test]
fn independent_grants_unwrap_to_the_same_data_key() {
    let data_key = DataKey::generate().unwrap();

    let alice = grant_collaborator_access(&data_key, b"alice-password").unwrap();
    let bob = grant_collaborator_access(&data_key, b"bob-password").unwrap();

    assert_ne!(alice.salt, bob.salt);
    assert_ne!(alice.wrapped_data_key, bob.wrapped_data_key);

    let via_alice =
        unlock_project_key(b"alice-password", &alice.salt, &alice.wrapped_data_key).unwrap();
    let via_bob = unlock_project_key(b"bob-password", &bob.salt, &bob.wrapped_data_key).unwrap();
    assert_eq!(via_alice, data_key);
    assert_eq!(via_bob, data_key);
}

#[test]
fn regranting_with_same_password_uses_fresh_salt() {
    let data_key = DataKey::generate().unwrap();
    let g1 = grant_collaborator_access(&data_key, b"same-password").unwrap();
    let g2 = grant_collaborator_access(&data_key, b"same-password").unwrap();
    assert_ne!(g1.salt, g2.salt);
    assert_ne!(g1.wrapped_data_key, g2.wrapped_data_key);
}

#[test]
fn collaborator_cannot_use_another_collaborators_wrap() {
    let data_key = DataKey::generate().unwrap();
    let alice = grant_collaborator_access(&data_key, b"alice-password").unwrap();

    let result = unlock_project_key(b"bob-password", &alice.salt, &alice.wrapped_data_key);
    assert!(matches!(result, Err(BastionError::Unlock(_))));
}

#[test]
fn admin_path_and_collaborator_path_agree() {
    let wrapped = initialize_vault(b"admin-password").unwrap();
    let master =
        unlock_master(b"admin-password", &wrapped.salt, &wrapped.wrapped_master_key).unwrap();
    let project = create_project_key(&master).unwrap();

    // Admin path: master -> data key, then re-wrap for the collaborator.
    let admin_dk = open_project_key(&master, &project.wrapped_data_key).unwrap();
    let grant = grant_collaborator_access(&admin_dk, b"collab-password").unwrap();

    // Collaborator path: straight from their own wrap, no master key.
    let collab_dk =
        unlock_project_key(b"collab-password", &grant.salt, &grant.wrapped_data_key).unwrap();

    let sealed = seal_secret(&admin_dk, "shared-value").unwrap();
    assert_eq!(open_secret(&collab_dk, &sealed).unwrap(), "shared-value");
}

// ---------------------------------------------------------------------------
// Batch decryption
// ---------------------------------------------------------------------------

#[test]
fn batch_open_skips_only_the_corrupted_record() {
    let key = DataKey::generate().unwrap();
    let project_id = Uuid::new_v4();

    let good_a = SecretRecord::new(project_id, "A", seal_secret(&key, "alpha").unwrap());
    let mut bad = SecretRecord::new(project_id, "B", seal_secret(&key, "beta").unwrap());
    let good_c = SecretRecord::new(project_id, "C", seal_secret(&key, "gamma").unwrap());

    let mut bytes = bad.value.as_bytes().to_vec();
    bytes[20] ^= 0xff;
    bad.value = bastion::crypto::Envelope::from_bytes(bytes);

    let results = open_secrets(&key, &[good_a.clone(), bad.clone(), good_c.clone()]);
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].0, good_a.id);
    assert_eq!(results[0].1.as_deref().unwrap(), "alpha");
    assert_eq!(results[1].0, bad.id);
    assert!(matches!(results[1].1, Err(BastionError::Authentication(_))));
    assert_eq!(results[2].1.as_deref().unwrap(), "gamma");
}
