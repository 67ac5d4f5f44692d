//! The edit session for one image.
//!
//! [`EditSession`] owns the current preset, the loaded preset, the undo
//! history, the view state and the four render tiers. Edits run on the
//! caller's thread and only touch state behind one mutex. Rendering happens
//! on a [`RenderExecutor`]; finished renders come back over a channel and are
//! applied by [`EditSession::process_completed`] after a staleness check:
//!
//! - GEOMETRY and FILTERS results apply when they are newer than the last
//!   applied result of the tier and were rendered from the same component
//!   the tier is waiting for.
//! - PARTIAL and HIGHRES results apply only while the zoom and preset (and
//!   for PARTIAL the viewport) are unchanged since the request.
//!
//! Discarded bitmaps go back to the pool when dropped.

mod history;
mod observers;

pub use history::{HistoryItem, HistoryManager};
pub use observers::{ObserverId, ObserverList, SessionEvent};

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bitmap::{resize_to_fit, Bitmap, BitmapCache, FilterType, PooledBitmap};
use crate::config::EditorConfig;
use crate::crop::CropEngine;
use crate::error::{CacheError, DomainError, RenderError, SessionError};
use crate::geometry::{crop_selection_to_screen_matrix, GeometryState, Matrix, Point, Rect};
use crate::preset::{EditOp, EditPreset};
use crate::render::{
    CompletedRender, FilterStage, PassThrough, RenderExecutor, RenderRequest, RenderTier,
    Renderer, RequestStamp,
};

/// Smallest zoom factor; 1 fits the crop to the view.
pub const MIN_SCALE_FACTOR: f64 = 1.0;

/// What happened to a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDisposition {
    /// Stored in its tier.
    Applied,
    /// Superseded by a later edit or view change and dropped.
    Stale,
    /// No bitmap was produced; the tier is left as it is.
    NotReady,
    /// The render failed.
    Failed,
}

/// A tier bitmap chosen for display.
#[derive(Debug, Clone)]
pub struct DisplayBitmap {
    pub tier: RenderTier,
    pub bitmap: Arc<PooledBitmap>,
}

#[derive(Debug, Default)]
struct TierSlot {
    bitmap: Option<Arc<PooledBitmap>>,
    /// Preset of the cached or in-flight GEOMETRY / FILTERS render.
    source: Option<EditPreset>,
    /// Sequence of the outstanding GEOMETRY / FILTERS request.
    requested: u64,
    last_applied: u64,
}

#[derive(Debug)]
struct LoadedImage {
    renderer: Arc<Renderer>,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Copy)]
struct ViewState {
    width: u32,
    height: u32,
    translation: Point,
    scale_factor: f64,
}

#[derive(Debug)]
struct SessionState {
    image: Option<LoadedImage>,
    preset: EditPreset,
    loaded_preset: EditPreset,
    history: HistoryManager,
    tiers: [TierSlot; 4],
    view: ViewState,
    preset_epoch: u64,
    view_epoch: u64,
    next_sequence: u64,
    show_original: bool,
    has_modifications: bool,
    aborted: Option<CacheError>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            image: None,
            preset: EditPreset::new(),
            loaded_preset: EditPreset::new(),
            history: HistoryManager::new(),
            tiers: Default::default(),
            view: ViewState {
                width: 0,
                height: 0,
                translation: Point::default(),
                scale_factor: MIN_SCALE_FACTOR,
            },
            preset_epoch: 0,
            view_epoch: 0,
            next_sequence: 0,
            show_original: false,
            has_modifications: false,
            aborted: None,
        }
    }

    fn slot(&mut self, tier: RenderTier) -> &mut TierSlot {
        &mut self.tiers[tier.index()]
    }

    /// A GEOMETRY or FILTERS render that produced nothing is asked for
    /// again on the next preset change.
    fn forget_unrendered_source(&mut self, tier: RenderTier, sequence: u64) {
        if !matches!(tier, RenderTier::Geometry | RenderTier::Filters) {
            return;
        }
        let slot = self.slot(tier);
        if slot.requested == sequence {
            slot.source = None;
        }
    }

    fn next_stamp(&mut self) -> RequestStamp {
        self.next_sequence += 1;
        RequestStamp {
            sequence: self.next_sequence,
            preset_epoch: self.preset_epoch,
            view_epoch: self.view_epoch,
            scale_factor: self.view.scale_factor,
        }
    }

    fn can_render(&self) -> bool {
        self.image.is_some() && self.aborted.is_none()
    }

    fn ensure_editable(&self) -> Result<&LoadedImage, SessionError> {
        if let Some(err) = &self.aborted {
            return Err(SessionError::Aborted(err.clone()));
        }
        self.image.as_ref().ok_or(SessionError::NoImage)
    }

    fn image_to_screen(&self) -> Option<Matrix> {
        let image = self.image.as_ref()?;
        let view = self.view;
        if view.width == 0 || view.height == 0 {
            return None;
        }
        let (vw, vh) = (f64::from(view.width), f64::from(view.height));
        let s = view.scale_factor;
        let geometry = self.preset.geometry();
        let m = crop_selection_to_screen_matrix(&geometry, image.width, image.height, view.width, view.height)
            .post_translate(view.translation.x, view.translation.y)
            .post_scale_about(s, s, vw / 2.0, vh / 2.0);
        Some(m)
    }

    /// Whether a finished render still matches the live state.
    fn is_current(&self, request: &RenderRequest) -> bool {
        let tier = request.tier;
        let stamp = request.stamp;
        let slot = &self.tiers[tier.index()];
        if stamp.sequence <= slot.last_applied {
            return false;
        }
        match tier {
            RenderTier::Geometry => slot
                .source
                .as_ref()
                .is_some_and(|src| src.same_geometry(&request.preset)),
            RenderTier::Filters => slot
                .source
                .as_ref()
                .is_some_and(|src| src.same_filters(&request.preset)),
            RenderTier::Partial => {
                stamp.scale_factor == self.view.scale_factor
                    && stamp.preset_epoch == self.preset_epoch
                    && stamp.view_epoch == self.view_epoch
            }
            RenderTier::HighRes => {
                stamp.scale_factor == self.view.scale_factor
                    && stamp.preset_epoch == self.preset_epoch
            }
        }
    }
}

/// Requests and notifications collected under the lock and sent after it
/// is released.
#[derive(Default)]
struct Pending {
    renderer: Option<Arc<Renderer>>,
    requests: Vec<RenderRequest>,
    events: Vec<SessionEvent>,
}

impl Pending {
    fn request(&mut self, state: &SessionState, request: RenderRequest) {
        if let Some(image) = &state.image {
            self.renderer = Some(Arc::clone(&image.renderer));
            self.requests.push(request);
        }
    }
}

pub struct EditSession {
    config: EditorConfig,
    cache: BitmapCache,
    executor: Arc<dyn RenderExecutor>,
    stage: Arc<dyn FilterStage>,
    completed_tx: Sender<CompletedRender>,
    completed_rx: Mutex<Receiver<CompletedRender>>,
    state: Mutex<SessionState>,
    observers: ObserverList,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("config", &self.config)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl EditSession {
    pub fn new(config: EditorConfig, executor: Arc<dyn RenderExecutor>) -> Self {
        let (completed_tx, completed_rx) = mpsc::channel();
        let cache = BitmapCache::new(config.memory_budget_bytes, config.cache_max_per_key);
        Self {
            config,
            cache,
            executor,
            stage: Arc::new(PassThrough),
            completed_tx,
            completed_rx: Mutex::new(completed_rx),
            state: Mutex::new(SessionState::new()),
            observers: ObserverList::default(),
        }
    }

    /// Use `stage` for custom filters in images loaded from now on.
    pub fn with_filter_stage(mut self, stage: Arc<dyn FilterStage>) -> Self {
        self.stage = stage;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    // ========================================================================
    // Image and presets
    // ========================================================================

    /// Start editing `original` from `preset`.
    ///
    /// The history restarts with `preset` as its only item and every tier is
    /// re-rendered.
    pub fn load_image(&self, original: Bitmap, preset: EditPreset) -> Result<(), SessionError> {
        if let Some(err) = &self.lock().aborted {
            return Err(SessionError::Aborted(err.clone()));
        }
        let (width, height) = (original.width, original.height);
        if original.is_empty() || original.pixels.len() != Bitmap::byte_len(width, height) {
            return Err(DomainError::InvalidDimensions { width, height }.into());
        }

        let preview = resize_to_fit(&original, self.config.preview_max_dim, FilterType::Bilinear)?;
        let highres = if self.config.supports_highres
            && (width > preview.width || height > preview.height)
        {
            let highres = resize_to_fit(&original, self.config.highres_max_dim, FilterType::Lanczos3)?;
            Some(Arc::new(highres))
        } else {
            None
        };
        tracing::debug!(
            width,
            height,
            preview_width = preview.width,
            preview_height = preview.height,
            highres = highres.is_some(),
            "loading image"
        );

        let renderer = Arc::new(Renderer::new(
            Arc::new(preview),
            highres,
            (width, height),
            self.cache.clone(),
            Arc::clone(&self.stage),
        ));

        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            state.image = Some(LoadedImage {
                renderer,
                width,
                height,
            });
            state.loaded_preset = preset.clone();
            state.history.reset(HistoryItem::new(preset.clone(), None));
            let floor = state.next_sequence;
            for slot in state.tiers.iter_mut() {
                *slot = TierSlot {
                    last_applied: floor,
                    ..TierSlot::default()
                };
            }
            state.show_original = false;
            pending.events.push(SessionEvent::ImageLoaded { width, height });
            self.install_preset(&mut state, preset, &mut pending);
        }
        self.finish(pending);
        Ok(())
    }

    pub fn preset(&self) -> EditPreset {
        self.lock().preset.clone()
    }

    pub fn loaded_preset(&self) -> EditPreset {
        self.lock().loaded_preset.clone()
    }

    pub fn geometry(&self) -> GeometryState {
        self.lock().preset.geometry()
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.lock().image.as_ref().map(|i| (i.width, i.height))
    }

    /// True when the preset differs from the one the image was loaded with.
    pub fn has_modifications(&self) -> bool {
        self.lock().has_modifications
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted.is_some()
    }

    /// Replace the current preset.
    ///
    /// With `add_to_history` the new preset is appended to the history,
    /// dropping any redo tail; the previous preset is recorded first when the
    /// history is empty.
    pub fn set_preset(
        &self,
        preset: EditPreset,
        edit: Option<EditOp>,
        add_to_history: bool,
    ) -> Result<(), SessionError> {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            state.ensure_editable()?;
            self.commit(&mut state, preset, edit, add_to_history, &mut pending);
        }
        self.finish(pending);
        Ok(())
    }

    /// Apply one user edit and record it in the history.
    ///
    /// Returns whether the preset changed. Invalid edits (a curve point
    /// dragged past its neighbour, a NaN angle) are ignored.
    pub fn apply_edit(&self, op: EditOp) -> Result<bool, SessionError> {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            let image = state.ensure_editable()?;
            let (width, height) = (image.width, image.height);

            let mut next = state.preset.clone();
            if let Err(err) = next.apply_op(&op, width, height) {
                tracing::debug!(%err, ?op, "ignoring invalid edit");
                return Ok(false);
            }
            if next == state.preset {
                return Ok(false);
            }
            self.commit(&mut state, next, Some(op), true, &mut pending);
        }
        self.finish(pending);
        Ok(true)
    }

    /// A crop editor for the current geometry and view.
    pub fn crop_engine(&self) -> Result<CropEngine, SessionError> {
        let state = self.lock();
        let image = state.ensure_editable()?;
        let engine = CropEngine::new(
            state.preset.geometry(),
            image.width,
            image.height,
            state.view.width,
            state.view.height,
            &self.config,
        )?;
        Ok(engine)
    }

    fn commit(
        &self,
        state: &mut SessionState,
        preset: EditPreset,
        edit: Option<EditOp>,
        add_to_history: bool,
        pending: &mut Pending,
    ) {
        if add_to_history {
            if state.history.is_empty() {
                let previous = state.preset.clone();
                state.history.add(HistoryItem::new(previous, None));
            }
            state.history.add(HistoryItem::new(preset.clone(), edit));
        }
        self.install_preset(state, preset, pending);
    }

    fn install_preset(&self, state: &mut SessionState, preset: EditPreset, pending: &mut Pending) {
        state.preset = preset;
        state.preset_epoch += 1;
        self.update_base_tiers(state, pending);
        self.invalidate_preview_locked(state, pending);
        state.has_modifications = state.preset != state.loaded_preset;
        pending.events.push(SessionEvent::PresetChanged {
            has_modifications: state.has_modifications,
        });
    }

    /// Re-request GEOMETRY and FILTERS when their component of the preset
    /// changed. An unchanged component keeps its bitmap.
    fn update_base_tiers(&self, state: &mut SessionState, pending: &mut Pending) {
        if !state.can_render() {
            return;
        }
        for tier in [RenderTier::Geometry, RenderTier::Filters] {
            let unchanged = state.tiers[tier.index()]
                .source
                .as_ref()
                .is_some_and(|src| match tier {
                    RenderTier::Geometry => src.same_geometry(&state.preset),
                    _ => src.same_filters(&state.preset),
                });
            if unchanged {
                continue;
            }
            let stamp = state.next_stamp();
            let request = RenderRequest::new(tier, state.preset.clone(), stamp);
            let slot = state.slot(tier);
            slot.bitmap = None;
            slot.source = Some(request.preset.clone());
            slot.requested = stamp.sequence;
            pending.request(state, request);
        }
    }

    fn invalidate_preview_locked(&self, state: &mut SessionState, pending: &mut Pending) {
        state.slot(RenderTier::HighRes).bitmap = None;
        self.update_partial_locked(state, pending);
        if !state.can_render() {
            return;
        }
        let stamp = state.next_stamp();
        let request = RenderRequest::new(RenderTier::HighRes, state.preset.clone(), stamp);
        pending.request(state, request);
    }

    /// Drop the PARTIAL bitmap and request the region now visible.
    fn update_partial_locked(&self, state: &mut SessionState, pending: &mut Pending) {
        state.slot(RenderTier::Partial).bitmap = None;
        if !state.can_render() || !state.preset.can_do_partial_rendering() {
            return;
        }
        let (Some(matrix), Some(image)) = (state.image_to_screen(), state.image.as_ref()) else {
            return;
        };
        let Some(inverse) = matrix.invert() else {
            tracing::debug!("image to screen matrix is singular; skipping partial render");
            return;
        };
        let view = Rect::from_size(f64::from(state.view.width), f64::from(state.view.height));
        let image_rect = Rect::from_size(f64::from(image.width), f64::from(image.height));
        let Some(bounds) = inverse.map_rect(&view).round_out().intersect(&image_rect) else {
            return;
        };

        let view_size = (state.view.width, state.view.height);
        let stamp = state.next_stamp();
        let request = RenderRequest::partial(state.preset.clone(), stamp, matrix, view_size, bounds);
        pending.request(state, request);
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn undo(&self) -> Result<bool, SessionError> {
        self.navigate(|history| history.undo().map(|item| item.preset.clone()))
    }

    pub fn redo(&self) -> Result<bool, SessionError> {
        self.navigate(|history| history.redo().map(|item| item.preset.clone()))
    }

    pub fn jump_to(&self, position: usize) -> Result<bool, SessionError> {
        self.navigate(|history| history.jump_to(position).map(|item| item.preset.clone()))
    }

    /// Restart the history from an empty preset, or from the loaded one
    /// when the config asks for it.
    pub fn reset_history(&self) -> Result<(), SessionError> {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            state.ensure_editable()?;
            let target = if self.config.reset_to_loaded {
                state.loaded_preset.clone()
            } else {
                EditPreset::new()
            };
            state.history.reset(HistoryItem::new(target.clone(), None));
            self.install_preset(&mut state, target, &mut pending);
        }
        self.finish(pending);
        Ok(())
    }

    fn navigate<F>(&self, step: F) -> Result<bool, SessionError>
    where
        F: FnOnce(&mut HistoryManager) -> Option<EditPreset>,
    {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            state.ensure_editable()?;
            let Some(preset) = step(&mut state.history) else {
                return Ok(false);
            };
            self.install_preset(&mut state, preset, &mut pending);
        }
        self.finish(pending);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().history.can_redo()
    }

    pub fn can_reset(&self) -> bool {
        self.lock().history.can_reset()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn history_position(&self) -> usize {
        self.lock().history.position()
    }

    pub fn history_items(&self) -> Vec<HistoryItem> {
        self.lock().history.items().to_vec()
    }

    // ========================================================================
    // View
    // ========================================================================

    pub fn set_view_size(&self, width: u32, height: u32) {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            if (state.view.width, state.view.height) == (width, height) {
                return;
            }
            state.view.width = width;
            state.view.height = height;
            state.view_epoch += 1;
            self.update_partial_locked(&mut state, &mut pending);
            pending.events.push(SessionEvent::ViewChanged);
        }
        self.finish(pending);
    }

    pub fn view_size(&self) -> (u32, u32) {
        let state = self.lock();
        (state.view.width, state.view.height)
    }

    /// Set the zoom, clamped to `[1, max_scale_factor]`. Returns the value
    /// in effect.
    pub fn set_scale_factor(&self, scale_factor: f64) -> f64 {
        let mut pending = Pending::default();
        let applied = {
            let mut state = self.lock();
            if !scale_factor.is_finite() {
                return state.view.scale_factor;
            }
            let clamped = scale_factor.clamp(MIN_SCALE_FACTOR, self.max_scale_factor());
            if clamped == state.view.scale_factor {
                return clamped;
            }
            state.view.scale_factor = clamped;
            state.view_epoch += 1;
            self.invalidate_preview_locked(&mut state, &mut pending);
            pending.events.push(SessionEvent::ViewChanged);
            clamped
        };
        self.finish(pending);
        applied
    }

    pub fn scale_factor(&self) -> f64 {
        self.lock().view.scale_factor
    }

    pub fn max_scale_factor(&self) -> f64 {
        self.config.max_scale_factor.max(MIN_SCALE_FACTOR)
    }

    /// Pan offset in screen pixels, applied before the zoom.
    pub fn set_translation(&self, translation: Point) {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            if state.view.translation == translation {
                return;
            }
            state.view.translation = translation;
            state.view_epoch += 1;
            self.update_partial_locked(&mut state, &mut pending);
            pending.events.push(SessionEvent::ViewChanged);
        }
        self.finish(pending);
    }

    pub fn translation(&self) -> Point {
        self.lock().view.translation
    }

    /// Original image pixels to view pixels. `None` until an image and a
    /// view size are set.
    pub fn image_to_screen(&self) -> Option<Matrix> {
        self.lock().image_to_screen()
    }

    /// Inverse of [`image_to_screen`](Self::image_to_screen); `None` when it
    /// does not exist.
    pub fn screen_to_image(&self) -> Option<Matrix> {
        self.image_to_screen().and_then(|m| m.invert())
    }

    /// Re-render PARTIAL and HIGHRES for the current preset.
    pub fn invalidate_preview(&self) {
        let mut pending = Pending::default();
        {
            let mut state = self.lock();
            self.invalidate_preview_locked(&mut state, &mut pending);
        }
        self.finish(pending);
    }

    /// Show the image without filters.
    pub fn set_show_original(&self, show: bool) {
        {
            let mut state = self.lock();
            if state.show_original == show {
                return;
            }
            state.show_original = show;
        }
        self.observers.notify(&SessionEvent::ViewChanged);
    }

    pub fn tier_bitmap(&self, tier: RenderTier) -> Option<Arc<PooledBitmap>> {
        self.lock().tiers[tier.index()].bitmap.clone()
    }

    /// The best bitmap to draw right now.
    ///
    /// With "show original" on this is the GEOMETRY tier. Otherwise PARTIAL
    /// while zoomed in, then HIGHRES, then GEOMETRY.
    pub fn display_bitmap(&self) -> Option<DisplayBitmap> {
        let state = self.lock();
        let pick = |tier: RenderTier| {
            state.tiers[tier.index()]
                .bitmap
                .clone()
                .map(|bitmap| DisplayBitmap { tier, bitmap })
        };
        if state.show_original {
            return pick(RenderTier::Geometry);
        }
        let zoomed = state.view.scale_factor > MIN_SCALE_FACTOR;
        zoomed
            .then(|| pick(RenderTier::Partial))
            .flatten()
            .or_else(|| pick(RenderTier::HighRes))
            .or_else(|| pick(RenderTier::Geometry))
    }

    // ========================================================================
    // Render results
    // ========================================================================

    /// Apply every render that has finished so far.
    pub fn process_completed(&self) -> Vec<RenderDisposition> {
        let completed: Vec<CompletedRender> = {
            let rx = self.completed_rx.lock().unwrap_or_else(PoisonError::into_inner);
            rx.try_iter().collect()
        };
        completed
            .into_iter()
            .map(|c| self.on_render_available(c))
            .collect()
    }

    /// Wait up to `timeout` for the next finished render and apply it.
    pub fn wait_for_render(&self, timeout: Duration) -> Option<RenderDisposition> {
        let completed = {
            let rx = self.completed_rx.lock().unwrap_or_else(PoisonError::into_inner);
            rx.recv_timeout(timeout).ok()?
        };
        Some(self.on_render_available(completed))
    }

    /// Store a finished render in its tier if it still matches the live
    /// state. A pool failure aborts the session.
    pub fn on_render_available(&self, completed: CompletedRender) -> RenderDisposition {
        let CompletedRender { request, result } = completed;
        let tier = request.tier;
        let sequence = request.stamp.sequence;
        let mut pending = Pending::default();

        let disposition = {
            let mut state = self.lock();
            if state.aborted.is_some() {
                RenderDisposition::Stale
            } else {
                match result {
                    Err(RenderError::Cache(err)) => {
                        tracing::error!(?tier, %err, "bitmap cache failed; aborting edit session");
                        state.aborted = Some(err.clone());
                        for slot in state.tiers.iter_mut() {
                            slot.bitmap = None;
                        }
                        pending.events.push(SessionEvent::Aborted(err));
                        RenderDisposition::Failed
                    }
                    Err(RenderError::Domain(err)) => {
                        tracing::debug!(?tier, sequence, %err, "render skipped");
                        state.forget_unrendered_source(tier, sequence);
                        RenderDisposition::Failed
                    }
                    Ok(None) => {
                        state.forget_unrendered_source(tier, sequence);
                        RenderDisposition::NotReady
                    }
                    Ok(Some(bitmap)) => {
                        if state.is_current(&request) {
                            let slot = state.slot(tier);
                            slot.bitmap = Some(Arc::new(bitmap));
                            slot.last_applied = sequence;
                            state.has_modifications = state.preset != state.loaded_preset;
                            pending.events.push(SessionEvent::TierUpdated(tier));
                            RenderDisposition::Applied
                        } else {
                            tracing::debug!(?tier, sequence, "discarding stale render");
                            RenderDisposition::Stale
                        }
                    }
                }
            }
        };
        self.finish(pending);
        disposition
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn subscribe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Dispatch requests and notify observers, outside the state lock.
    fn finish(&self, pending: Pending) {
        if let Some(renderer) = pending.renderer {
            for request in pending.requests {
                self.dispatch(Arc::clone(&renderer), request);
            }
        }
        for event in &pending.events {
            self.observers.notify(event);
        }
    }

    fn dispatch(&self, renderer: Arc<Renderer>, request: RenderRequest) {
        tracing::debug!(
            tier = ?request.tier,
            sequence = request.stamp.sequence,
            scale_factor = request.stamp.scale_factor,
            "dispatching render"
        );
        let tx = self.completed_tx.clone();
        self.executor.spawn(Box::new(move || {
            let result = renderer.render(&request);
            // The receiver is gone once the session is dropped.
            let _ = tx.send(CompletedRender { request, result });
        }));
    }
}
