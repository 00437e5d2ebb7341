//! Integration tests for `VaultSession`.

use std::time::Duration;

use bastion::errors::BastionError;
use bastion::vault::hierarchy::{initialize_vault, unlock_project_key};
use bastion::vault::{SessionState, VaultRecord, VaultSession};
use zeroize::Zeroizing;

const ADMIN_PW: &str = "correct-horse";

fn pw(s: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(s.as_bytes().to_vec())
}

fn vault() -> VaultRecord {
    VaultRecord::new(initialize_vault(ADMIN_PW.as_bytes()).expect("init"))
}

fn session() -> VaultSession {
    VaultSession::new(Duration::from_secs(600))
}

// ---------------------------------------------------------------------------
// State transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_path_walks_the_state_machine() {
    let vault = vault();
    let session = session();
    assert_eq!(session.state().await, SessionState::Locked);

    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    assert_eq!(
        session.state().await,
        SessionState::MasterUnlocked { projects: vec![] }
    );

    let project = session.create_project("web").await.unwrap();
    assert_eq!(
        session.state().await,
        SessionState::MasterUnlocked {
            projects: vec![project.id]
        }
    );

    session.lock().await;
    assert_eq!(session.state().await, SessionState::Locked);
}

#[tokio::test]
async fn wrong_password_leaves_session_untouched() {
    let vault = vault();
    let session = session();

    let err = session.unlock_master(pw("wrong"), &vault).await.unwrap_err();
    assert!(matches!(err, BastionError::Unlock(_)));
    assert_eq!(session.state().await, SessionState::Locked);

    // Retrying with the right password simply works.
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    assert!(matches!(
        session.state().await,
        SessionState::MasterUnlocked { .. }
    ));
}

#[tokio::test]
async fn admin_unlocks_existing_project_through_master_key() {
    let vault = vault();

    let admin = session();
    admin.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = admin.create_project("api").await.unwrap();
    let sealed = admin
        .seal_secret(project.id, "DB_URL", "postgres://x", None)
        .await
        .unwrap();
    admin.lock().await;

    let later = session();
    assert!(matches!(
        later.unlock_project(&project).await,
        Err(BastionError::SessionLocked)
    ));

    later.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    later.unlock_project(&project).await.unwrap();
    assert_eq!(later.open_secret(&sealed).await.unwrap(), "postgres://x");
}

#[tokio::test]
async fn collaborator_path_skips_the_master_key() {
    let vault = vault();

    let admin = session();
    admin.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = admin.create_project("api").await.unwrap();
    let sealed = admin
        .seal_secret(project.id, "TOKEN", "s3cr3t", None)
        .await
        .unwrap();
    let grant = admin
        .grant_access(project.id, "alice", pw("alice-password"))
        .await
        .unwrap();
    admin.lock().await;

    assert_eq!(grant.project_id, project.id);
    assert_eq!(grant.principal_id, "alice");

    let alice = session();
    alice
        .unlock_project_with_grant(pw("alice-password"), &grant)
        .await
        .unwrap();
    assert_eq!(
        alice.state().await,
        SessionState::ProjectUnlocked {
            projects: vec![project.id]
        }
    );
    assert_eq!(alice.open_secret(&sealed).await.unwrap(), "s3cr3t");

    // Holding a project key gives no master-key powers.
    assert!(matches!(
        alice.create_project("other").await,
        Err(BastionError::SessionLocked)
    ));
}

#[tokio::test]
async fn collaborator_wrong_password_is_rejected() {
    let vault = vault();
    let admin = session();
    admin.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = admin.create_project("api").await.unwrap();
    let grant = admin
        .grant_access(project.id, "bob", pw("bob-password"))
        .await
        .unwrap();

    let bob = session();
    let err = bob
        .unlock_project_with_grant(pw("not-bobs"), &grant)
        .await
        .unwrap_err();
    assert!(matches!(err, BastionError::Unlock(_)));
    assert_eq!(bob.state().await, SessionState::Locked);
}

// ---------------------------------------------------------------------------
// Secrets, versions and slots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sealing_with_previous_record_bumps_version() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = session.create_project("web").await.unwrap();

    let v1 = session
        .seal_secret(project.id, "KEY", "one", None)
        .await
        .unwrap();
    let v2 = session
        .seal_secret(project.id, "KEY", "two", Some(&v1))
        .await
        .unwrap();

    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(v2.id, v1.id);
    assert_eq!(session.open_secret(&v1).await.unwrap(), "one");
    assert_eq!(session.open_secret(&v2).await.unwrap(), "two");
}

#[tokio::test]
async fn next_version_must_come_from_same_project_and_key() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let a = session.create_project("a").await.unwrap();
    let b = session.create_project("b").await.unwrap();

    let prev_a = session
        .seal_secret(a.id, "K", "va", None)
        .await
        .unwrap();

    assert!(matches!(
        session.seal_secret(b.id, "OTHER", "vb", Some(&prev_a)).await,
        Err(BastionError::Store(_))
    ));
    assert!(matches!(
        session.seal_secret(b.id, "K", "vb", Some(&prev_a)).await,
        Err(BastionError::Store(_))
    ));
    assert!(matches!(
        session.seal_secret(a.id, "OTHER", "va2", Some(&prev_a)).await,
        Err(BastionError::Store(_))
    ));

    // The legitimate next version still works.
    let next = session
        .seal_secret(a.id, "K", "va2", Some(&prev_a))
        .await
        .unwrap();
    assert_eq!(next.version, 2);
    assert_eq!(session.open_secret(&next).await.unwrap(), "va2");
}

#[tokio::test]
async fn lock_project_releases_only_that_slot() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let a = session.create_project("a").await.unwrap();
    let b = session.create_project("b").await.unwrap();

    let secret_a = session.seal_secret(a.id, "K", "va", None).await.unwrap();
    let secret_b = session.seal_secret(b.id, "K", "vb", None).await.unwrap();

    session.lock_project(a.id).await;

    assert!(matches!(
        session.open_secret(&secret_a).await,
        Err(BastionError::ProjectNotUnlocked(id)) if id == a.id
    ));
    assert_eq!(session.open_secret(&secret_b).await.unwrap(), "vb");
}

#[tokio::test]
async fn secrets_from_one_project_do_not_open_in_another() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let a = session.create_project("a").await.unwrap();
    let b = session.create_project("b").await.unwrap();

    let mut moved = session
        .seal_secret(a.id, "DB", "postgres://x", None)
        .await
        .unwrap();
    moved.project_id = b.id;

    assert!(matches!(
        session.open_secret(&moved).await,
        Err(BastionError::Authentication(_))
    ));
}

#[tokio::test]
async fn distinct_projects_can_be_used_concurrently() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let a = session.create_project("a").await.unwrap();
    let b = session.create_project("b").await.unwrap();

    let (grant, secret) = tokio::join!(
        session.grant_access(a.id, "alice", pw("alice-pass")),
        session.seal_secret(b.id, "K", "v", None),
    );

    assert_eq!(grant.unwrap().project_id, a.id);
    assert_eq!(secret.unwrap().project_id, b.id);
}

#[tokio::test]
async fn concurrent_grants_on_one_project_wrap_the_same_key() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = session.create_project("web").await.unwrap();
    let sealed = session
        .seal_secret(project.id, "DB_URL", "postgres://x", None)
        .await
        .unwrap();

    let (alice, bob) = tokio::join!(
        session.grant_access(project.id, "alice", pw("alice-pass")),
        session.grant_access(project.id, "bob", pw("bob-pass")),
    );
    let alice = alice.unwrap();
    let bob = bob.unwrap();
    assert_ne!(alice.salt, bob.salt);

    let alice_key = unlock_project_key(b"alice-pass", &alice.salt, &alice.wrapped_data_key).unwrap();
    let bob_key = unlock_project_key(b"bob-pass", &bob.salt, &bob.wrapped_data_key).unwrap();
    assert_eq!(alice_key, bob_key);

    let reader = VaultSession::new(Duration::from_secs(600));
    reader
        .unlock_project_with_grant(pw("bob-pass"), &bob)
        .await
        .unwrap();
    assert_eq!(reader.open_secret(&sealed).await.unwrap(), "postgres://x");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_master_unlock_leaves_session_locked() {
    let vault = vault();
    let session = session();

    tokio::select! {
        biased;
        _ = session.unlock_master(pw(ADMIN_PW), &vault) => {
            panic!("unlock finished before the KDF could be interrupted");
        }
        _ = std::future::ready(()) => {}
    }
    assert_eq!(session.state().await, SessionState::Locked);

    // The slot was released; a fresh attempt goes through.
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    assert!(matches!(
        session.state().await,
        SessionState::MasterUnlocked { .. }
    ));
}

#[tokio::test]
async fn dropped_grant_unlock_leaves_session_locked() {
    let vault = vault();
    let admin = session();
    admin.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = admin.create_project("web").await.unwrap();
    let grant = admin
        .grant_access(project.id, "alice", pw("alice-pass"))
        .await
        .unwrap();

    let alice = session();
    tokio::select! {
        biased;
        _ = alice.unlock_project_with_grant(pw("alice-pass"), &grant) => {
            panic!("unlock finished before the KDF could be interrupted");
        }
        _ = std::future::ready(()) => {}
    }
    assert_eq!(alice.state().await, SessionState::Locked);

    alice
        .unlock_project_with_grant(pw("alice-pass"), &grant)
        .await
        .unwrap();
    assert_eq!(
        alice.state().await,
        SessionState::ProjectUnlocked {
            projects: vec![project.id]
        }
    );
}

// ---------------------------------------------------------------------------
// Lifetime
// ---------------------------------------------------------------------------

#[tokio::test]
async fn idle_session_locks_itself() {
    let vault = vault();
    let session = VaultSession::new(Duration::ZERO);

    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    assert!(matches!(
        session.create_project("late").await,
        Err(BastionError::SessionLocked)
    ));
    assert_eq!(session.state().await, SessionState::Locked);
}

#[tokio::test]
async fn batch_open_through_session() {
    let vault = vault();
    let session = session();
    session.unlock_master(pw(ADMIN_PW), &vault).await.unwrap();
    let project = session.create_project("web").await.unwrap();

    let a = session.seal_secret(project.id, "A", "1", None).await.unwrap();
    let b = session.seal_secret(project.id, "B", "2", None).await.unwrap();

    let results = session.open_secrets(project.id, &[a, b]).await.unwrap();
    let values: Vec<String> = results.into_iter().map(|(_, r)| r.unwrap()).collect();
    assert_eq!(values, vec!["1", "2"]);
}
