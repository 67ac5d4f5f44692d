//! Render tier scheduling, staleness and recycling through the edit session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use retouch_core::render::{RenderExecutor, RenderJob};
use retouch_core::session::RenderDisposition::{Applied, Stale};
use retouch_core::{
    Bitmap, EditOp, EditPreset, EditSession, EditorConfig, PoolExecutor, RenderDisposition,
    RenderTier,
};

/// Holds jobs until the test runs them, in any order it likes.
#[derive(Default)]
struct DeferredExecutor {
    jobs: Mutex<Vec<RenderJob>>,
}

impl RenderExecutor for DeferredExecutor {
    fn spawn(&self, job: RenderJob) {
        self.jobs.lock().unwrap().push(job);
    }
}

impl DeferredExecutor {
    fn take(&self) -> Vec<RenderJob> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }
}

fn run(jobs: Vec<RenderJob>) {
    for job in jobs {
        job();
    }
}

fn image() -> Bitmap {
    let mut bmp = Bitmap::filled(64, 32, [0, 0, 0]);
    for y in 0..32 {
        for x in 0..64 {
            bmp.set_pixel(x, y, [(x * 4) as u8, (y * 8) as u8, 50]);
        }
    }
    bmp
}

fn deferred_session() -> (Arc<DeferredExecutor>, EditSession) {
    let executor = Arc::new(DeferredExecutor::default());
    let session = EditSession::new(EditorConfig::default(), executor.clone());
    session.load_image(image(), EditPreset::new()).unwrap();
    (executor, session)
}

#[test]
fn partial_render_from_previous_zoom_is_discarded() {
    let (executor, session) = deferred_session();
    session.set_view_size(128, 64);

    // GEOMETRY, FILTERS and HIGHRES from the load, PARTIAL from the view.
    let at_unit_zoom = executor.take();
    assert_eq!(at_unit_zoom.len(), 4);

    assert_eq!(session.set_scale_factor(2.0), 2.0);
    let at_double_zoom = executor.take();
    assert_eq!(at_double_zoom.len(), 2);

    run(at_unit_zoom);
    assert_eq!(session.process_completed(), vec![Applied, Applied, Stale, Stale]);
    assert!(session.tier_bitmap(RenderTier::Partial).is_none());
    assert!(session.tier_bitmap(RenderTier::HighRes).is_none());
    assert_eq!(session.display_bitmap().unwrap().tier, RenderTier::Geometry);
    // The discarded bitmaps went back to the pool.
    assert_eq!(session.cache().idle_count(), 2);

    run(at_double_zoom);
    assert_eq!(session.cache().idle_count(), 0);
    assert_eq!(session.process_completed(), vec![Applied, Applied]);
    let shown = session.display_bitmap().unwrap();
    assert_eq!(shown.tier, RenderTier::Partial);
    assert_eq!((shown.bitmap.width, shown.bitmap.height), (128, 64));
}

#[test]
fn highres_from_superseded_preset_is_discarded_at_same_zoom() {
    let (executor, session) = deferred_session();
    run(executor.take());
    session.process_completed();

    session.apply_edit(EditOp::RotateStep).unwrap();
    let first_edit = executor.take();
    session.apply_edit(EditOp::RotateStep).unwrap();
    let second_edit = executor.take();

    // Each edit re-requests GEOMETRY and HIGHRES; filters are unchanged.
    assert_eq!(first_edit.len(), 2);
    assert_eq!(second_edit.len(), 2);

    run(second_edit);
    run(first_edit);
    let results = session.process_completed();
    assert_eq!(results, vec![Applied, Applied, Stale, Stale]);

    let geometry = session.tier_bitmap(RenderTier::Geometry).unwrap();
    // Two quarter turns keep the landscape shape.
    assert_eq!((geometry.width, geometry.height), (64, 32));
}

#[test]
fn older_geometry_result_cannot_replace_newer() {
    let (executor, session) = deferred_session();
    run(executor.take());
    session.process_completed();

    session.apply_edit(EditOp::RotateStep).unwrap();
    let quarter = executor.take();
    session.undo().unwrap();
    let back = executor.take();

    run(back);
    run(quarter);
    let results = session.process_completed();
    assert_eq!(results, vec![Applied, Applied, Stale, Stale]);
    let geometry = session.tier_bitmap(RenderTier::Geometry).unwrap();
    assert_eq!((geometry.width, geometry.height), (64, 32));
    assert!(!session.has_modifications());
}

#[test]
fn filter_only_edit_keeps_geometry_bitmap() {
    let (executor, session) = deferred_session();
    run(executor.take());
    session.process_completed();
    let before = session.tier_bitmap(RenderTier::Geometry).unwrap();

    session
        .apply_edit(EditOp::SetFilter(retouch_core::CustomFilter::new("grain")))
        .unwrap();
    let jobs = executor.take();
    // FILTERS and HIGHRES only.
    assert_eq!(jobs.len(), 2);
    run(jobs);
    session.process_completed();

    let after = session.tier_bitmap(RenderTier::Geometry).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(session.tier_bitmap(RenderTier::Filters).is_some());
}

#[test]
fn thread_pool_renders_all_base_tiers() {
    let executor = Arc::new(PoolExecutor::new(2).unwrap());
    let session = EditSession::new(EditorConfig::default(), executor);
    session.load_image(image(), EditPreset::new()).unwrap();

    let mut results: Vec<RenderDisposition> = Vec::new();
    while results.len() < 3 {
        match session.wait_for_render(Duration::from_secs(10)) {
            Some(disposition) => results.push(disposition),
            None => panic!("render did not finish"),
        }
    }
    assert!(results.iter().all(|r| *r == Applied));
    for tier in [RenderTier::Geometry, RenderTier::Filters, RenderTier::HighRes] {
        assert!(session.tier_bitmap(tier).is_some(), "{tier:?}");
    }
}
