//! Tests for profile stores

use kodegen_debate::AgentId;
use kodegen_debate::driver::{DirProfileStore, MemoryProfileStore, ProfileStore};

#[test]
fn test_dir_store_lifecycle() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let root = tempfile::tempdir()?;
    let store = DirProfileStore::new(root.path().join("browser-data"));
    let claude = AgentId::from("claude");
    let gemini = AgentId::from("gemini");

    // Nothing exists before init
    assert_eq!(store.profile_dir(&claude), None);

    store.init([&claude, &gemini])?;
    let dir = store.profile_dir(&claude).expect("claude profile");
    assert_eq!(dir, root.path().join("browser-data").join("claude"));
    assert!(dir.is_dir());
    assert!(store.profile_dir(&gemini).is_some());
    assert_eq!(store.profile_dir(&AgentId::from("chatgpt")), None);

    // Init is idempotent and keeps existing state
    std::fs::write(dir.join("cookies"), b"session")?;
    store.init([&claude])?;
    assert!(dir.join("cookies").exists());

    store.clear(&claude)?;
    assert_eq!(store.profile_dir(&claude), None);
    assert!(store.profile_dir(&gemini).is_some());

    // Clearing a missing profile is not an error
    store.clear(&claude)?;
    Ok(())
}

#[test]
fn test_memory_store() {
    let store = MemoryProfileStore::new();
    let claude = AgentId::from("claude");
    assert_eq!(store.profile_dir(&claude), None);

    store.insert("claude", "/profiles/a");
    store.insert("claude", "/profiles/b");
    assert_eq!(
        store.profile_dir(&claude).as_deref(),
        Some(std::path::Path::new("/profiles/b"))
    );

    assert!(store.remove(&claude).is_some());
    assert_eq!(store.profile_dir(&claude), None);
}
