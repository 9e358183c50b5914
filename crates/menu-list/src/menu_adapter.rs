use crate::data::MenuRow;
use crate::row_view::{ParentId, RowView, RowViewId};
use fxhash::FxHashMap;
use image_loader::{FetchCompletion, FetchId, ImageLoader, RequestState};
use log::{debug, error, warn};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Position {position} out of range (row count {count})")]
    PositionOutOfRange { position: usize, count: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Row views created from the row template
    pub inflated: u64,
    /// Binds that reused an existing row view
    pub recycled: u64,
    /// Row views the widget gave up
    pub released: u64,
    /// Binds served straight from the image cache
    pub cache_hits: u64,
    /// Binds that had to wait for a fetch
    pub waits: u64,
    /// Fetch results written into an image slot
    pub applied: u64,
    /// Fetch results dropped because the view was rebound or released in the meantime
    pub discarded_stale: u64,
}

#[derive(Debug, Clone, Copy)]
struct Waiter {
    view: RowViewId,
    generation: u64,
    fetch: FetchId,
}

/// This is the adapter between the menu data and the list widget showing it. The widget asks for a
/// view per visible position and hands back views that scrolled out so they can be reused. Labels
/// are set right away, images come from the loader cache or are fetched in the background and
/// applied on a later `update` call made from the same thread that does the binding.
pub struct MenuAdapter {
    rows: Vec<MenuRow>,
    /// Indexed by `RowViewId`. Released slots are `None` until a new view is inflated into them.
    views: Vec<Option<RowView>>,
    free: Vec<RowViewId>,
    loader: ImageLoader,
    waiting: FxHashMap<String, Vec<Waiter>>,
    stats: AdapterStats,
}

impl MenuAdapter {
    pub fn new(rows: Vec<MenuRow>, loader: ImageLoader) -> Self {
        Self {
            rows,
            views: Vec::new(),
            free: Vec::new(),
            loader,
            waiting: FxHashMap::default(),
            stats: AdapterStats::default(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn item(&self, position: usize) -> Option<&MenuRow> {
        self.rows.get(position)
    }

    /// Replaces the data set. Views keep what they show until they are bound again.
    pub fn set_rows(&mut self, rows: Vec<MenuRow>) {
        self.rows = rows;
    }

    pub fn view(&self, id: RowViewId) -> Option<&RowView> {
        self.views.get(id.0 as usize)?.as_ref()
    }

    /// Number of live row views
    pub fn view_count(&self) -> usize {
        self.views.len() - self.free.len()
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats
    }

    /// True while any bound view is still waiting for an image
    pub fn has_pending(&self) -> bool {
        !self.waiting.is_empty()
    }

    /// Called when the widget throws a row view away. Pending images for it are dropped and the
    /// id may be handed out again by a later inflate. Returns false for an unknown id.
    pub fn release_view(&mut self, id: RowViewId) -> bool {
        let Some(slot) = self.views.get_mut(id.0 as usize) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }

        let mut dropped = 0;
        self.waiting.retain(|_, waiters| {
            let before = waiters.len();
            waiters.retain(|w| w.view != id);
            dropped += before - waiters.len();
            !waiters.is_empty()
        });

        self.free.push(id);
        self.stats.released += 1;
        self.stats.discarded_stale += dropped as u64;
        debug!("Released row view {:?} ({} pending images dropped)", id, dropped);
        true
    }

    fn reuse_or_inflate(&mut self, convert_view: Option<RowViewId>, parent: ParentId) -> RowViewId {
        if let Some(id) = convert_view {
            if let Some(Some(view)) = self.views.get_mut(id.0 as usize) {
                if view.parent != parent {
                    warn!(
                        "Row view {:?} moved from parent {:?} to {:?}",
                        id, view.parent, parent
                    );
                    view.parent = parent;
                }
                self.stats.recycled += 1;
                return id;
            }
            warn!("Unknown row view {:?} offered for reuse, inflating a new one", id);
        }

        let view = RowView::inflate(parent);
        let id = match self.free.pop() {
            Some(id) => {
                self.views[id.0 as usize] = Some(view);
                id
            }
            None => {
                self.views.push(Some(view));
                RowViewId(self.views.len() as u64 - 1)
            }
        };

        self.stats.inflated += 1;
        debug!("Inflated row view {:?} for parent {:?}", id, parent);
        id
    }

    /// Produces a ready to display row view for `position`.
    ///
    /// `convert_view` is a view previously returned by this adapter that the widget no longer
    /// shows. Its slots are reused as-is. If the image is not cached yet the slot is reset to the
    /// placeholder and filled in by `update` once the fetch finishes, provided the view has not been
    /// bound to something else by then.
    pub fn get_view(
        &mut self,
        position: usize,
        convert_view: Option<RowViewId>,
        parent: ParentId,
    ) -> Result<RowViewId, AdapterError> {
        let count = self.rows.len();
        if position >= count {
            return Err(AdapterError::PositionOutOfRange { position, count });
        }

        let id = self.reuse_or_inflate(convert_view, parent);
        let row = &self.rows[position];
        let Some(view) = self.views[id.0 as usize].as_mut() else {
            unreachable!("reuse_or_inflate returns a live view");
        };

        view.generation += 1;
        view.position = Some(position);
        view.state.label.set_text(&row.name);

        match self.loader.request(&row.image_url) {
            Ok(RequestState::Cached(bitmap)) => {
                view.state.image.set_image(Some(bitmap));
                self.stats.cache_hits += 1;
            }
            Ok(RequestState::Started(fetch)) | Ok(RequestState::Pending(fetch)) => {
                view.state.image.set_image(None);
                self.waiting
                    .entry(row.image_url.clone())
                    .or_default()
                    .push(Waiter {
                        view: id,
                        generation: view.generation,
                        fetch,
                    });
                self.stats.waits += 1;
            }
            Err(e) => {
                error!("Unable to request image {}: {}", row.image_url, e);
                view.state.image.set_image(None);
            }
        }

        Ok(id)
    }

    fn apply_completion(&mut self, completion: FetchCompletion) -> usize {
        let Some(waiters) = self.waiting.remove(&completion.url) else {
            return 0;
        };

        // Waiters on a newer fetch of the same url stay queued for that one
        let (mine, later): (Vec<Waiter>, Vec<Waiter>) =
            waiters.into_iter().partition(|w| w.fetch == completion.id);
        if !later.is_empty() {
            self.waiting.insert(completion.url.clone(), later);
        }

        let image = completion.outcome.ok();
        let mut applied = 0;

        for waiter in mine {
            match self.views.get_mut(waiter.view.0 as usize) {
                Some(Some(view)) if view.generation == waiter.generation => {
                    view.state.image.set_image(image.clone());
                    applied += 1;
                }
                _ => {
                    debug!(
                        "Dropping result for {} on stale view {:?}",
                        completion.url, waiter.view
                    );
                    self.stats.discarded_stale += 1;
                }
            }
        }

        self.stats.applied += applied as u64;
        applied
    }

    /// Applies every finished fetch without blocking. Returns the number of image slots updated.
    pub fn update(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.loader.try_completion() {
            applied += self.apply_completion(completion);
        }
        applied
    }

    /// Blocks up to `timeout` for one finished fetch, then applies it along with anything else
    /// that is ready. Returns false if nothing finished in time.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        match self.loader.wait_completion(timeout) {
            Some(completion) => {
                self.apply_completion(completion);
                self.update();
                true
            }
            None => false,
        }
    }
}
