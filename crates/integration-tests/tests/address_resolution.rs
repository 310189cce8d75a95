//! Destination resolution against the local cache and the remote directory.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use souk_core::{DeliveryMode, DeskId};
use souk_integration_tests::{
    ALGER_DESK, BLIDA_DESK, CLOSED_DESK, MemoryDatabase, MemoryDirectory, ORAN_DESK, desk, home,
    reference_tables,
};
use souk_storefront::checkout::{AddressResolver, CheckoutError, DestinationSource};
use souk_storefront::directory::DirectoryProvider;

fn local_only() -> AddressResolver {
    AddressResolver::new(Arc::new(MemoryDatabase::new(reference_tables())), None)
}

fn with_remote(db: MemoryDatabase, directory: Arc<MemoryDirectory>) -> AddressResolver {
    let remote: Arc<dyn DirectoryProvider> = directory;
    AddressResolver::new(Arc::new(db), Some(remote))
}

#[tokio::test]
async fn test_home_delivery_matches_names_loosely() {
    let resolved = local_only()
        .resolve(&home("  ALGER ", "bab el oued"))
        .await
        .unwrap();

    assert_eq!(resolved.region_name, "Alger");
    assert_eq!(resolved.sub_region_name, "Bab El Oued");
    assert_eq!(resolved.mode, DeliveryMode::Home);
    assert!(resolved.desk.is_none());
    assert_eq!(resolved.source, DestinationSource::LocalCache);
}

#[tokio::test]
async fn test_unknown_sub_region_is_rejected() {
    let err = local_only()
        .resolve(&home("Alger", "Atlantis"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidDestination(msg) if msg.contains("Atlantis")));
}

#[tokio::test]
async fn test_desk_prefers_sub_region_named_like_region() {
    let resolved = local_only().resolve(&desk("Alger", ALGER_DESK)).await.unwrap();

    assert_eq!(resolved.sub_region_name, "Alger");
    assert_eq!(resolved.mode, DeliveryMode::Desk);
    let desk = resolved.desk.unwrap();
    assert_eq!(desk.id, ALGER_DESK);
    assert_eq!(desk.name.as_deref(), Some("Alger Centre"));
}

#[tokio::test]
async fn test_desk_falls_back_to_first_sub_region() {
    let resolved = local_only().resolve(&desk("Blida", BLIDA_DESK)).await.unwrap();

    assert_eq!(resolved.sub_region_name, "Boufarik");
}

#[tokio::test]
async fn test_desk_falls_back_to_region_name() {
    let resolved = local_only().resolve(&desk("Oran", ORAN_DESK)).await.unwrap();

    assert_eq!(resolved.sub_region_name, "Oran");
}

#[tokio::test]
async fn test_desk_must_be_active_and_in_region() {
    let resolver = local_only();

    let closed = resolver.resolve(&desk("Alger", CLOSED_DESK)).await;
    assert!(matches!(closed, Err(CheckoutError::InvalidDestination(_))));

    let elsewhere = resolver.resolve(&desk("Alger", ORAN_DESK)).await;
    assert!(matches!(elsewhere, Err(CheckoutError::InvalidDestination(_))));

    let missing = resolver.resolve(&desk("Alger", DeskId::new(9_999))).await;
    assert!(matches!(missing, Err(CheckoutError::InvalidDestination(_))));
}

#[tokio::test]
async fn test_unknown_region_without_directory() {
    let err = local_only()
        .resolve(&home("Djelfa", "Messaad"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidDestination(msg) if msg.contains("Djelfa")));
}

#[tokio::test]
async fn test_unknown_region_resolves_through_directory() {
    let directory = Arc::new(MemoryDirectory::with_djelfa());
    let resolver = with_remote(MemoryDatabase::new(reference_tables()), directory.clone());

    let resolved = resolver.resolve(&home("djelfa", "MESSAAD")).await.unwrap();

    assert_eq!(resolved.region_name, "Djelfa");
    assert_eq!(resolved.sub_region_name, "Messaad");
    assert_eq!(resolved.source, DestinationSource::RemoteDirectory);
    assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_remote_desk_keeps_requested_id() {
    let directory = Arc::new(MemoryDirectory::with_djelfa());
    let resolver = with_remote(MemoryDatabase::new(reference_tables()), directory);

    let resolved = resolver.resolve(&desk("Djelfa", DeskId::new(1_700))).await.unwrap();

    assert_eq!(resolved.sub_region_name, "Djelfa");
    let desk = resolved.desk.unwrap();
    assert_eq!(desk.id, DeskId::new(1_700));
    assert!(desk.name.is_none());
}

#[tokio::test]
async fn test_known_region_never_calls_directory() {
    let directory = Arc::new(MemoryDirectory::with_djelfa());
    let resolver = with_remote(MemoryDatabase::new(reference_tables()), directory.clone());

    resolver.resolve(&home("Alger", "Alger")).await.unwrap();

    assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cache_failure_falls_back_to_directory() {
    let db = MemoryDatabase::new(reference_tables());
    db.fail_location_cache(true);
    let directory = Arc::new(MemoryDirectory::with_djelfa());
    let resolver = with_remote(db, directory);

    // Alger is also listed remotely, but without sub-regions.
    let alger = resolver.resolve(&home("Alger", "Bab El Oued")).await;
    assert!(matches!(alger, Err(CheckoutError::InvalidDestination(_))));

    let djelfa = resolver.resolve(&home("Djelfa", "Djelfa")).await.unwrap();
    assert_eq!(djelfa.source, DestinationSource::RemoteDirectory);
}

#[tokio::test]
async fn test_unavailable_directory_is_invalid_destination() {
    let directory = Arc::new(MemoryDirectory::with_djelfa());
    directory.unavailable.store(true, Ordering::SeqCst);
    let resolver = with_remote(MemoryDatabase::new(reference_tables()), directory);

    let err = resolver
        .resolve(&home("Djelfa", "Messaad"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, CheckoutError::InvalidDestination(msg) if msg.contains("unavailable"))
    );
}
