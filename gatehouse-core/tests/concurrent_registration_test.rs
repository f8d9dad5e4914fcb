//! Concurrent registration tests
//!
//! Several threads race to register the same email; the uniqueness check and
//! the insert must behave as one step so exactly one of them wins.
//!
//! Run with: cargo test --test concurrent_registration_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use gatehouse_core::adapters::duckdb::DuckDbRepository;
use gatehouse_core::adapters::MemorySessionStore;
use gatehouse_core::config::AuthConfig;
use gatehouse_core::domain::Argon2Params;
use gatehouse_core::services::UserService;
use gatehouse_core::{NewUser, UserRepository};

/// Number of racing registrations
const THREAD_COUNT: usize = 8;

fn create_service(temp_dir: &TempDir) -> (Arc<UserService>, Arc<DuckDbRepository>) {
    let db_path = temp_dir.path().join("test_concurrent.duckdb");
    let repo = Arc::new(DuckDbRepository::new(&db_path).unwrap());
    repo.ensure_schema().unwrap();

    let config = AuthConfig {
        argon2: Argon2Params {
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
        },
        ..AuthConfig::default()
    };
    let service = Arc::new(UserService::new(repo.clone(), config));
    (service, repo)
}

fn race<F>(f: F) -> usize
where
    F: Fn(usize) -> bool + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let winners = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                if f(thread_id) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    winners.load(Ordering::SeqCst)
}

#[test]
fn test_same_email_registers_once() {
    let temp_dir = TempDir::new().unwrap();
    let (service, repo) = create_service(&temp_dir);

    let worker = Arc::clone(&service);
    let successes = race(move |thread_id| {
        let user = NewUser::new(
            format!("racer{}", thread_id),
            "race@example.com",
            format!("password-{}", thread_id),
            "Race",
            "Condition",
        );
        worker.create_user(&user).unwrap().success
    });

    println!("{} of {} registrations succeeded", successes, THREAD_COUNT);
    assert_eq!(successes, 1);
    assert_eq!(repo.count_users().unwrap(), 1);

    // The stored account belongs to whichever thread won, and its own
    // password works
    let stored = repo.find_by_email("race@example.com").unwrap().unwrap();
    let winner: usize = stored.username.trim_start_matches("racer").parse().unwrap();
    let session = MemorySessionStore::new();
    let login = service
        .authenticate(&session, "race@example.com", &format!("password-{}", winner))
        .unwrap();
    assert!(login.success);
}

#[test]
fn test_same_username_registers_once() {
    let temp_dir = TempDir::new().unwrap();
    let (service, repo) = create_service(&temp_dir);

    let worker = Arc::clone(&service);
    let successes = race(move |thread_id| {
        let user = NewUser::new(
            "samename",
            format!("user{}@example.com", thread_id),
            "password123",
            "Same",
            "Name",
        );
        worker.create_user(&user).unwrap().success
    });

    assert_eq!(successes, 1);
    assert_eq!(repo.count_users().unwrap(), 1);
}

#[test]
fn test_distinct_users_all_register() {
    let temp_dir = TempDir::new().unwrap();
    let (service, repo) = create_service(&temp_dir);

    let worker = Arc::clone(&service);
    let successes = race(move |thread_id| {
        let user = NewUser::new(
            format!("user{}", thread_id),
            format!("user{}@example.com", thread_id),
            "password123",
            "Distinct",
            "User",
        );
        worker.create_user(&user).unwrap().success
    });

    assert_eq!(successes, THREAD_COUNT);
    assert_eq!(repo.count_users().unwrap(), THREAD_COUNT as i64);
}

#[test]
fn test_only_one_first_admin() {
    let temp_dir = TempDir::new().unwrap();
    let (service, repo) = create_service(&temp_dir);

    let worker = Arc::clone(&service);
    let successes = race(move |thread_id| {
        let user = NewUser::new(
            format!("admin{}", thread_id),
            format!("admin{}@example.com", thread_id),
            "password123",
            "First",
            "Admin",
        )
        .with_user_type("admin");
        worker.create_user(&user).unwrap().success
    });

    assert_eq!(successes, 1);
    assert_eq!(repo.count_users().unwrap(), 1);
}
