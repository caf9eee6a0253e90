use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gemremover::error::EngineError;
use gemremover::services::download::{PNG_MIME, ZIP_MIME};
use gemremover::services::progress::IDLE_STATUS;
use gemremover::{
    App, AppError, BatchScheduler, Config, DecodedImage, DownloadRequest, ProgressEvent,
    ProgressReporter, RunState, SourceFile, WatermarkEngine,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start(u32),
    Finish(u32),
}

/// 假引擎：图片宽度减一即为编号，按编号休眠，记录并发情况
#[derive(Default)]
struct FakeEngine {
    delays_ms: Vec<u64>,
    failing: HashSet<u32>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Mutex<Vec<Event>>,
}

impl FakeEngine {
    fn with_delays(delays_ms: Vec<u64>) -> Self {
        Self {
            delays_ms,
            ..Default::default()
        }
    }

    fn failing(mut self, ids: &[u32]) -> Self {
        self.failing = ids.iter().copied().collect();
        self
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn position(&self, event: Event) -> usize {
        self.events()
            .iter()
            .position(|e| *e == event)
            .unwrap_or_else(|| panic!("missing event {event:?}"))
    }
}

#[async_trait]
impl WatermarkEngine for FakeEngine {
    async fn remove_watermark(
        &self,
        image: &DecodedImage,
        name: &str,
    ) -> Result<DecodedImage, EngineError> {
        let id = image.width() - 1;
        self.events.lock().unwrap().push(Event::Start(id));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays_ms.get(id as usize).copied().unwrap_or(5);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::Finish(id));

        if self.failing.contains(&id) {
            return Err(EngineError::RestoreFailed {
                name: name.to_string(),
                reason: "fake failure".to_string(),
            });
        }

        let mut out = image.clone();
        out.pixels_mut().put_pixel(0, 0, Rgba([id as u8, 0, 0, 255]));
        Ok(out)
    }
}

/// 记录所有进度事件
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    fn percents(&self) -> Vec<u8> {
        self.events.lock().unwrap().iter().map(|e| e.percent).collect()
    }

    fn last(&self) -> ProgressEvent {
        self.events.lock().unwrap().last().cloned().unwrap()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// 编号为 `id` 的 PNG：宽度 id+1，高度 1
fn image_file(id: u32) -> SourceFile {
    named_image_file("img", id)
}

fn named_image_file(prefix: &str, id: u32) -> SourceFile {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(id + 1, 1, Rgba([200, 200, 200, 255])))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    SourceFile::new(format!("{prefix}_{id}.png"), "image/png", buffer.into_inner())
}

async fn wait_until_idle(scheduler: &BatchScheduler) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while scheduler.state() != RunState::Idle {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("scheduler never returned to idle");
}

fn text_file(name: &str) -> SourceFile {
    SourceFile::new(name, "text/plain", b"hello".to_vec())
}

fn test_config() -> Config {
    Config {
        max_concurrent_images: 3,
        ..Config::default()
    }
}

fn scheduler(engine: Arc<FakeEngine>) -> (BatchScheduler, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let scheduler = BatchScheduler::new(engine, &test_config(), reporter.clone());
    (scheduler, reporter)
}

fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        entries.push((entry.name().to_string(), data));
    }
    entries
}

#[tokio::test]
async fn test_all_valid_images_are_registered() {
    let engine = Arc::new(FakeEngine::with_delays(vec![30, 10, 20, 5, 15]));
    let (scheduler, _) = scheduler(engine.clone());

    let files = (0..5).map(image_file).collect();
    let summary = assert_ok!(scheduler.run(files).await);

    assert_eq!(summary.total_submitted, 5);
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.skipped_or_failed, 0);

    let mut indices: Vec<_> = scheduler.registry().all().iter().map(|r| r.source_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(scheduler.state(), RunState::Idle);
}

#[tokio::test]
async fn test_non_image_is_skipped_and_engine_never_sees_it() {
    let engine = Arc::new(FakeEngine::default());
    let (scheduler, _) = scheduler(engine.clone());

    let files = vec![image_file(0), text_file("notes.txt"), image_file(2)];
    let summary = scheduler.run(files).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped_or_failed, 1);
    assert_eq!(engine.events().len(), 4);
    assert!(scheduler
        .registry()
        .all()
        .iter()
        .all(|r| r.original_name != "notes.txt"));
}

#[tokio::test]
async fn test_in_flight_never_exceeds_limit() {
    let engine = Arc::new(FakeEngine::with_delays(vec![20; 10]));
    let (scheduler, _) = scheduler(engine.clone());

    scheduler.run((0..10).map(image_file).collect()).await.unwrap();

    let max = engine.max_in_flight.load(Ordering::SeqCst);
    assert_eq!(scheduler.concurrency_limit(), 3);
    assert!(max <= scheduler.concurrency_limit(), "max in flight was {max}");
    assert!(max >= 1);
}

#[tokio::test]
async fn test_next_chunk_waits_for_whole_previous_chunk() {
    // 第一批中第 1 张最慢，第 4 张仍须等它完成
    let engine = Arc::new(FakeEngine::with_delays(vec![80, 5, 5, 5, 5, 5, 5]));
    let (scheduler, _) = scheduler(engine.clone());

    let summary = scheduler.run((0..7).map(image_file).collect()).await.unwrap();
    assert_eq!(summary.completed, 7);

    for first_chunk in 0..3 {
        assert!(engine.position(Event::Finish(first_chunk)) < engine.position(Event::Start(3)));
    }
    for second_chunk in 3..6 {
        assert!(engine.position(Event::Finish(second_chunk)) < engine.position(Event::Start(6)));
    }
}

#[tokio::test]
async fn test_engine_failure_is_skipped() {
    let engine = Arc::new(FakeEngine::default().failing(&[1, 3]));
    let (scheduler, reporter) = scheduler(engine.clone());

    let summary = scheduler.run((0..5).map(image_file).collect()).await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.skipped_or_failed, 2);
    assert_eq!(scheduler.registry().count(), 3);
    assert_eq!(reporter.last().percent, 100);
    assert_eq!(reporter.last().status, "Vault Update Complete! (3 of 5 restored)");
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let engine = Arc::new(FakeEngine::with_delays(vec![40, 5, 25, 10, 30, 5, 15, 20]));
    let (scheduler, reporter) = scheduler(engine);

    scheduler.run((0..8).map(image_file).collect()).await.unwrap();

    let percents = reporter.percents();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn test_single_image_reports_phases() {
    let engine = Arc::new(FakeEngine::default());
    let (scheduler, reporter) = scheduler(engine);

    let summary = scheduler.run(vec![image_file(0)]).await.unwrap();
    assert_eq!(summary.completed, 1);

    let percents = reporter.percents();
    assert_eq!(percents, vec![0, 20, 40, 70, 100]);
    assert_eq!(reporter.last().status, "Restoration Complete!");
}

#[tokio::test]
async fn test_single_non_image_ends_with_skipped_status() {
    let engine = Arc::new(FakeEngine::default());
    let (scheduler, reporter) = scheduler(engine.clone());

    let summary = scheduler.run(vec![text_file("n.txt")]).await.unwrap();

    assert_eq!(summary.skipped_or_failed, 1);
    assert!(engine.events().is_empty());
    assert_eq!(reporter.last().percent, 100);
    assert_eq!(reporter.last().status, "Restoration Skipped (0 of 1 restored)");
}

#[tokio::test]
async fn test_single_engine_failure_ends_with_failed_status() {
    let engine = Arc::new(FakeEngine::default().failing(&[0]));
    let (scheduler, reporter) = scheduler(engine);

    let summary = scheduler.run(vec![image_file(0)]).await.unwrap();

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.skipped_or_failed, 1);
    assert!(scheduler.registry().is_empty());
    assert_eq!(reporter.percents(), vec![0, 20, 40, 70, 100]);
    assert_eq!(reporter.last().status, "Restoration Failed (0 of 1 restored)");
}

#[tokio::test]
async fn test_dropped_run_does_not_leak_into_next_run() {
    let engine = Arc::new(FakeEngine::with_delays(vec![100, 100, 100]));
    let (scheduler, _) = scheduler(engine.clone());

    let old_files = (0..3).map(|id| named_image_file("old", id)).collect();
    let dropped =
        tokio::time::timeout(Duration::from_millis(20), scheduler.run(old_files)).await;
    assert!(dropped.is_err());

    wait_until_idle(&scheduler).await;

    let new_files = (0..2).map(|id| named_image_file("new", id)).collect();
    let summary = scheduler.run(new_files).await.unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped_or_failed, 0);

    let mut names: Vec<_> = scheduler
        .registry()
        .all()
        .into_iter()
        .map(|r| r.original_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["new_0.png", "new_1.png"]);

    // 被取消的任务不会跑完
    assert!(!engine.events().contains(&Event::Finish(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dropped_run_on_multi_thread_runtime() {
    let engine = Arc::new(FakeEngine::with_delays(vec![60; 6]));
    let (scheduler, _) = scheduler(engine);

    let old_files = (0..6).map(|id| named_image_file("old", id)).collect();
    let dropped =
        tokio::time::timeout(Duration::from_millis(10), scheduler.run(old_files)).await;
    assert!(dropped.is_err());

    wait_until_idle(&scheduler).await;

    let new_files = (0..3).map(|id| named_image_file("new", id)).collect();
    let summary = scheduler.run(new_files).await.unwrap();
    assert_eq!(summary.completed, 3);
    assert!(scheduler
        .registry()
        .all()
        .iter()
        .all(|r| r.original_name.starts_with("new_")));
}

#[tokio::test]
async fn test_second_run_rejected_while_processing() {
    let engine = Arc::new(FakeEngine::with_delays(vec![200, 200, 200, 200]));
    let (scheduler, _) = scheduler(engine);
    let scheduler = Arc::new(scheduler);

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run((0..4).map(image_file).collect()).await })
    };

    while scheduler.state() != RunState::Processing {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let second = scheduler.run(vec![image_file(0), image_file(1)]).await;
    assert!(matches!(assert_err!(second), AppError::ConcurrencyGuardRejection));
    assert!(!scheduler.reset());

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.completed, 4);
    assert_eq!(scheduler.registry().count(), 4);
    assert_eq!(scheduler.state(), RunState::Idle);

    // 守卫释放后可以再次运行
    assert_ok!(scheduler.run(vec![image_file(0), image_file(1)]).await);
}

#[tokio::test]
async fn test_new_run_replaces_previous_results() {
    let engine = Arc::new(FakeEngine::default());
    let (scheduler, _) = scheduler(engine);

    scheduler.run((0..4).map(image_file).collect()).await.unwrap();
    scheduler.run(vec![image_file(0), image_file(1)]).await.unwrap();

    assert_eq!(scheduler.registry().count(), 2);
}

#[tokio::test]
async fn test_empty_submission_is_noop() {
    let engine = Arc::new(FakeEngine::default());
    let (scheduler, _) = scheduler(engine.clone());

    let summary = scheduler.run(Vec::new()).await.unwrap();
    assert_eq!(summary.total_submitted, 0);
    assert!(engine.events().is_empty());
    assert_eq!(scheduler.state(), RunState::Idle);
}

#[tokio::test]
async fn test_mixed_batch_archive_contains_only_restored_images() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        output_folder: dir.path().to_string_lossy().into_owned(),
        ..test_config()
    };
    let app = App::with_engine(
        config,
        Arc::new(FakeEngine::default()),
        Arc::new(RecordingReporter::default()),
    );

    let files = vec![
        image_file(0),
        image_file(1),
        text_file("readme.txt"),
        image_file(3),
        image_file(4),
    ];
    let summary = app.process(files).await.unwrap();
    assert_eq!(summary.completed, 4);

    let path = app.download(DownloadRequest::Primary).await.unwrap().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("gemremover_vault_") && name.ends_with(".zip"));

    let entries = unzip(&std::fs::read(&path).unwrap());
    assert_eq!(entries.len(), 4);

    // 每个条目都与登记表中的字节完全一致
    let registered = app.scheduler().registry().all();
    for (entry_name, data) in &entries {
        let result = registered
            .iter()
            .find(|r| format!("restored_{}", r.original_name) == *entry_name)
            .unwrap();
        assert_eq!(&result.binary_data[..], &data[..]);
    }
}

#[tokio::test]
async fn test_download_branches_on_result_count() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        output_folder: dir.path().to_string_lossy().into_owned(),
        ..test_config()
    };
    let app = App::with_engine(
        config,
        Arc::new(FakeEngine::default()),
        Arc::new(RecordingReporter::default()),
    );

    // 没有结果：不做任何事
    assert!(app.download(DownloadRequest::Primary).await.unwrap().is_none());

    // 单个结果：直接下载 PNG
    app.process(vec![image_file(0)]).await.unwrap();
    let single = app.download(DownloadRequest::Primary).await.unwrap().unwrap();
    assert_eq!(single.file_name().unwrap(), "restored_img_0.png");
    let saved = image::load_from_memory(&std::fs::read(&single).unwrap()).unwrap();
    assert_eq!(saved.to_rgba8().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

    // 全部下载：即使只有一个结果也打包
    let all = app.download(DownloadRequest::All).await.unwrap().unwrap();
    assert_eq!(all.extension().unwrap(), "zip");
    assert_eq!(unzip(&std::fs::read(&all).unwrap()).len(), 1);

    assert_eq!(PNG_MIME, "image/png");
    assert_eq!(ZIP_MIME, "application/zip");
}

#[tokio::test]
async fn test_reset_clears_state_but_keeps_saved_download() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        output_folder: dir.path().to_string_lossy().into_owned(),
        ..test_config()
    };
    let app = App::with_engine(
        config,
        Arc::new(FakeEngine::default()),
        Arc::new(RecordingReporter::default()),
    );

    app.process((0..3).map(image_file).collect()).await.unwrap();
    let path = app.download(DownloadRequest::Primary).await.unwrap().unwrap();
    let before = std::fs::read(&path).unwrap();

    assert!(app.reset());

    let progress = app.scheduler().progress();
    assert_eq!(progress.percent, 0);
    assert_eq!(progress.status, IDLE_STATUS);
    assert!(app.scheduler().registry().is_empty());
    assert!(app.download(DownloadRequest::Primary).await.unwrap().is_none());

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_app_run_processes_input_folder() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for id in 0..3 {
        let file = image_file(id);
        std::fs::write(input.path().join(&file.name), &*file.data).unwrap();
    }
    std::fs::write(input.path().join("notes.txt"), b"not an image").unwrap();

    let config = Config {
        input_folder: input.path().to_string_lossy().into_owned(),
        output_folder: output.path().to_string_lossy().into_owned(),
        output_log_file: output.path().join("log.txt").to_string_lossy().into_owned(),
        ..test_config()
    };
    let app = App::with_engine(
        config,
        Arc::new(FakeEngine::default()),
        Arc::new(RecordingReporter::default()),
    );

    let summary = app.run().await.unwrap();
    assert_eq!(summary.total_submitted, 4);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.skipped_or_failed, 1);

    let saved: Vec<_> = std::fs::read_dir(output.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(saved.iter().any(|name| name.ends_with(".zip")));
    assert!(saved.iter().any(|name| name == "run_summary.json"));
}
