//! 모델 저장소: 저장/로드, 손상 격리, 오래된 모델 정리.

mod common;

use chrono::{Duration, Utc};
use forecast_core::{ManualClock, Ticker};
use forecast_ml::model::{LstmNetwork, NetworkConfig};
use forecast_ml::{LstmRegressor, MinMaxScaler, ModelMetadata, ModelStore, RegistryEntry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;

fn entry(trained_at: &str) -> RegistryEntry {
    let mut rng = StdRng::seed_from_u64(3);
    let network = LstmNetwork::new(NetworkConfig::default(), &mut rng).unwrap();
    let scaler = MinMaxScaler::fit(&[
        [1.0, 2.0, 0.5, 1.5, 100.0],
        [2.0, 3.0, 1.5, 2.5, 200.0],
    ])
    .unwrap();

    RegistryEntry {
        model: LstmRegressor::new(network),
        scaler,
        metadata: Some(ModelMetadata {
            trained_at: trained_at.to_string(),
            train_loss: 0.01,
            val_loss: 0.02,
            train_samples: 24,
            val_samples: 6,
            epochs_trained: 12,
            data_points_used: 90,
            window_size: 60,
            features: vec!["Open".into(), "High".into(), "Low".into(), "Close".into(), "Volume".into()],
            artifacts: None,
        }),
    }
}

fn artifacts_exist(dir: &Path, ticker: &str) -> [bool; 3] {
    [
        dir.join(format!("{}_model.bin", ticker)).exists(),
        dir.join(format!("{}_scaler.json", ticker)).exists(),
        dir.join(format!("{}_info.json", ticker)).exists(),
    ]
}

fn store_in(dir: &Path) -> (Arc<ManualClock>, ModelStore) {
    let clock = Arc::new(ManualClock::new(common::now()));
    let store = ModelStore::new(dir.join("models"), clock.clone());
    (clock, store)
}

#[tokio::test]
async fn test_cleanup_removes_only_stale_models() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let now = common::now();

    let a = Ticker::new("AAA").unwrap();
    let b = Ticker::new("BBB").unwrap();
    store
        .save(&a, entry(&(now - Duration::days(40)).to_rfc3339()))
        .await
        .unwrap();
    store
        .save(&b, entry(&(now - Duration::days(1)).to_rfc3339()))
        .await
        .unwrap();

    let report = store.cleanup(30).await.unwrap();
    assert_eq!(report.removed, vec![a.clone()]);
    assert_eq!(report.remaining, 1);

    assert!(store.get(&a).await.is_none());
    assert!(store.get(&b).await.is_some());
    assert_eq!(artifacts_exist(store.dir(), "AAA"), [false, false, false]);
    assert_eq!(artifacts_exist(store.dir(), "BBB"), [true, true, true]);
}

#[tokio::test]
async fn test_cleanup_skips_unparsable_trained_at() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let odd = Ticker::new("ODD").unwrap();
    store.save(&odd, entry("sometime last year")).await.unwrap();

    let report = store.cleanup(0).await.unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(report.skipped, vec![odd.clone()]);
    assert!(store.contains(&odd).await);
}

#[tokio::test]
async fn test_cleanup_uses_injected_clock() {
    let dir = tempfile::tempdir().unwrap();
    let (clock, store) = store_in(dir.path());
    let t = Ticker::new("AGE").unwrap();
    store.save(&t, entry(&common::now().to_rfc3339())).await.unwrap();

    assert!(store.cleanup(30).await.unwrap().removed.is_empty());
    clock.advance(Duration::days(31));
    assert_eq!(store.cleanup(30).await.unwrap().removed, vec![t]);
}

#[tokio::test]
async fn test_load_all_restores_entries() {
    let dir = tempfile::tempdir().unwrap();
    let t = Ticker::new("LOAD").unwrap();
    let saved_at = Utc::now().to_rfc3339();
    {
        let (_clock, store) = store_in(dir.path());
        store.save(&t, entry(&saved_at)).await.unwrap();
    }

    let (_clock, store) = store_in(dir.path());
    assert_eq!(store.load_all().await.unwrap(), 1);
    let loaded = store.get(&t).await.unwrap();
    assert_eq!(loaded.metadata.as_ref().unwrap().trained_at, saved_at);
    assert_eq!(loaded.scaler, entry(&saved_at).scaler);

    let status = store.status().await;
    let s = &status["LOAD"];
    assert!(s.model_loaded && s.scaler_loaded);
    assert_eq!(s.train_samples, Some(24));
}

#[tokio::test]
async fn test_load_all_isolates_corrupt_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let good = Ticker::new("GOOD").unwrap();
    let models = {
        let (_clock, store) = store_in(dir.path());
        store.save(&good, entry(&Utc::now().to_rfc3339())).await.unwrap();
        store.dir().to_path_buf()
    };
    std::fs::write(models.join("BAD_model.bin"), b"not a model").unwrap();
    std::fs::write(models.join("BAD_scaler.json"), b"{}").unwrap();

    let (_clock, store) = store_in(dir.path());
    assert_eq!(store.load_all().await.unwrap(), 1);
    assert!(store.contains(&good).await);
    assert!(!store.contains(&Ticker::new("BAD").unwrap()).await);
}

#[tokio::test]
async fn test_load_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let t = Ticker::new("NOMETA").unwrap();
    let models = {
        let (_clock, store) = store_in(dir.path());
        store.save(&t, entry(&Utc::now().to_rfc3339())).await.unwrap();
        store.dir().to_path_buf()
    };
    std::fs::remove_file(models.join("NOMETA_info.json")).unwrap();

    let (_clock, store) = store_in(dir.path());
    assert_eq!(store.load_all().await.unwrap(), 1);
    let loaded = store.get(&t).await.unwrap();
    assert!(loaded.metadata.is_none());
    assert_eq!(store.status().await["NOMETA"].trained_at, None);

    // 학습 시각을 모르면 정리하지 않음
    let report = store.cleanup(0).await.unwrap();
    assert_eq!(report.skipped, vec![t]);
}

#[tokio::test]
async fn test_save_replaces_whole_entry() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let t = Ticker::new("SWAP").unwrap();

    store.save(&t, entry("2024-01-01T00:00:00+00:00")).await.unwrap();
    let before = store.get(&t).await.unwrap();
    store.save(&t, entry("2024-02-01T00:00:00+00:00")).await.unwrap();
    let after = store.get(&t).await.unwrap();

    // 이전에 얻은 Arc는 이전 세트를 그대로 유지
    assert_eq!(
        before.metadata.as_ref().unwrap().trained_at,
        "2024-01-01T00:00:00+00:00"
    );
    assert_eq!(
        after.metadata.as_ref().unwrap().trained_at,
        "2024-02-01T00:00:00+00:00"
    );
    assert!(!Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_cleanup_with_huge_age_removes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let t = Ticker::new("KEEP").unwrap();
    store
        .save(&t, entry(&(common::now() - Duration::days(400)).to_rfc3339()))
        .await
        .unwrap();

    // 기준 시각을 표현할 수 없는 값도 오류 없이 처리
    for days in [200_000_000, 200_000_000_000_000, i64::MAX] {
        let report = store.cleanup(days).await.unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.remaining, 1);
    }
    assert!(store.contains(&t).await);
}

#[tokio::test]
async fn test_cleanup_continues_after_delete_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let old = (common::now() - Duration::days(40)).to_rfc3339();

    let stuck = Ticker::new("AAA").unwrap();
    let stale = Ticker::new("BBB").unwrap();
    store.save(&stuck, entry(&old)).await.unwrap();
    store.save(&stale, entry(&old)).await.unwrap();

    // 스케일러 자리에 비어 있지 않은 디렉토리를 두어 삭제를 실패시킴
    let blocker = store.dir().join("AAA_scaler.json");
    std::fs::remove_file(&blocker).unwrap();
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    let report = store.cleanup(30).await.unwrap();
    assert_eq!(report.removed, vec![stale.clone()]);
    assert_eq!(report.failed, vec![stuck.clone()]);
    assert_eq!(report.remaining, 1);

    assert!(store.contains(&stuck).await);
    assert!(!store.contains(&stale).await);
    assert_eq!(artifacts_exist(store.dir(), "BBB"), [false, false, false]);
}

#[tokio::test]
async fn test_load_all_rejects_mixed_artifact_set() {
    let dir = tempfile::tempdir().unwrap();
    let t = Ticker::new("MIX").unwrap();
    let models = {
        let (_clock, store) = store_in(dir.path());
        store.save(&t, entry(&Utc::now().to_rfc3339())).await.unwrap();
        let first_info = std::fs::read(store.dir().join("MIX_info.json")).unwrap();

        // 새 세트 저장 후 메타데이터만 이전 것으로 되돌림 (rename 도중 중단된 상태)
        let mut newer = entry(&Utc::now().to_rfc3339());
        newer.scaler = MinMaxScaler::fit(&[
            [10.0, 20.0, 5.0, 15.0, 1_000.0],
            [20.0, 30.0, 15.0, 25.0, 2_000.0],
        ])
        .unwrap();
        store.save(&t, newer).await.unwrap();
        std::fs::write(store.dir().join("MIX_info.json"), first_info).unwrap();
        store.dir().to_path_buf()
    };
    assert!(models.join("MIX_scaler.json").exists());

    let (_clock, store) = store_in(dir.path());
    assert_eq!(store.load_all().await.unwrap(), 0);
    assert!(!store.contains(&t).await);
}

#[tokio::test]
async fn test_saved_metadata_records_artifact_digests() {
    let dir = tempfile::tempdir().unwrap();
    let (_clock, store) = store_in(dir.path());
    let t = Ticker::new("SHA").unwrap();
    let saved = store.save(&t, entry(&Utc::now().to_rfc3339())).await.unwrap();

    let digests = saved.metadata.as_ref().unwrap().artifacts.clone().unwrap();
    assert_eq!(digests.model_sha256.len(), 64);
    assert_eq!(digests.scaler_sha256.len(), 64);

    let on_disk: ModelMetadata =
        serde_json::from_slice(&std::fs::read(store.dir().join("SHA_info.json")).unwrap()).unwrap();
    assert_eq!(on_disk.artifacts, Some(digests));
    assert!(!store.dir().join("SHA_model.bin.tmp").exists());
}
