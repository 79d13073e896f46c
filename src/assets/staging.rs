use std::marker::PhantomData;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use crate::foundation::core::RasterImage;
use crate::foundation::error::{NinjaError, NinjaResult};

/// Identifier of the process-wide staging area.
pub const STAGING_AREA_ID: &str = "ninja-container";

static GLOBAL: OnceLock<StagingArea> = OnceLock::new();

/// Handle of a scratch surface attached to a [`StagingArea`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Access raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Counters observed on a staging area.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagingStats {
    /// Surfaces attached since creation.
    pub attached: u64,
    /// Surfaces detached since creation.
    pub detached: u64,
    /// Settle barriers passed since creation.
    pub settles: u64,
    /// Surfaces currently attached.
    pub live: usize,
}

#[derive(Debug)]
struct Slot {
    id: SurfaceId,
    // Recorded by the settle barrier; `None` while layout is pending.
    layout: Option<(u32, u32)>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    slots: Vec<Slot>,
    stats: StagingStats,
}

impl Inner {
    fn detach(&mut self, id: SurfaceId) -> bool {
        let Some(pos) = self.slots.iter().position(|s| s.id == id) else {
            return false;
        };
        self.slots.swap_remove(pos);
        self.stats.detached = self.stats.detached.saturating_add(1);
        self.stats.live = self.slots.len();
        true
    }
}

/// Hidden, zero-footprint registry of scratch surfaces used while decoding and measuring.
///
/// Use goes through [`StagingArea::enter`], which hands out one exclusive
/// [`StagingSession`] at a time. Every surface a session attaches is detached when the
/// session ends, on success and error paths alike.
///
/// The registry lock is only held for the duration of each individual operation, so
/// [`StagingArea::stats`] never waits on a running session.
#[derive(Debug)]
pub struct StagingArea {
    id: String,
    // Thread holding the live session, if any.
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
    inner: Mutex<Inner>,
}

impl StagingArea {
    /// Create a standalone staging area (for injection into a pipeline).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: Mutex::new(None),
            released: Condvar::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Look up the process-wide area, creating it on first use.
    pub fn global() -> &'static StagingArea {
        GLOBAL.get_or_init(|| {
            tracing::debug!(id = STAGING_AREA_ID, "created staging area");
            StagingArea::new(STAGING_AREA_ID)
        })
    }

    /// Identifier of this area.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Begin exclusive use.
    ///
    /// Waits while a session held by another thread is alive. A second `enter` from the
    /// thread that already holds the session is a [`NinjaError::Validation`].
    pub fn enter(&self) -> NinjaResult<StagingSession<'_>> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *owner {
                None => break,
                Some(held) if held == me => {
                    return Err(NinjaError::validation(format!(
                        "staging area '{}' already in use by this call",
                        self.id
                    )));
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        *owner = Some(me);

        Ok(StagingSession {
            area: self,
            owned: Vec::new(),
            _thread_bound: PhantomData,
        })
    }

    /// Snapshot of the area's counters.
    pub fn stats(&self) -> StagingStats {
        self.lock_inner().stats.clone()
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.released.notify_one();
    }
}

/// Exclusive, scoped use of a [`StagingArea`].
pub struct StagingSession<'a> {
    area: &'a StagingArea,
    owned: Vec<SurfaceId>,
    // Ownership is recorded per thread, so the session stays on the thread that entered.
    _thread_bound: PhantomData<*const ()>,
}

impl<'a> StagingSession<'a> {
    /// Attach `raster` as a scratch surface. Its layout is pending until
    /// [`PendingSurface::settle`] runs.
    pub fn attach(&mut self, raster: RasterImage) -> PendingSurface<'_, 'a> {
        let id = {
            let mut inner = self.area.lock_inner();
            let id = SurfaceId(inner.next_id);
            inner.next_id = inner.next_id.wrapping_add(1);
            inner.slots.push(Slot { id, layout: None });
            inner.stats.attached = inner.stats.attached.saturating_add(1);
            inner.stats.live = inner.slots.len();
            id
        };
        self.owned.push(id);
        tracing::trace!(area = %self.area.id, surface = id.0, "attached scratch surface");

        PendingSurface {
            session: self,
            id,
            raster,
        }
    }

    /// Detach one surface early. Returns `false` if it was not attached by this session.
    pub fn detach(&mut self, id: SurfaceId) -> bool {
        let Some(pos) = self.owned.iter().position(|&o| o == id) else {
            return false;
        };
        self.owned.swap_remove(pos);
        self.area.lock_inner().detach(id)
    }

    /// Number of surfaces this session still has attached.
    pub fn live_surfaces(&self) -> usize {
        self.owned.len()
    }

    /// Counters of the underlying area.
    pub fn stats(&self) -> StagingStats {
        self.area.stats()
    }

    /// Recorded layout of an attached surface, `None` while pending or once detached.
    pub fn layout_of(&self, id: SurfaceId) -> Option<(u32, u32)> {
        self.area
            .lock_inner()
            .slots
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.layout)
    }
}

impl Drop for StagingSession<'_> {
    fn drop(&mut self) {
        let owned = std::mem::take(&mut self.owned);
        let n = owned.len();
        {
            let mut inner = self.area.lock_inner();
            for id in owned {
                inner.detach(id);
            }
        }
        if n > 0 {
            tracing::trace!(area = %self.area.id, detached = n, "released staging session");
        }
        self.area.release();
    }
}

/// A freshly attached surface whose layout has not been flushed yet.
///
/// Dimensions are deliberately unavailable here; call [`PendingSurface::settle`].
pub struct PendingSurface<'s, 'a> {
    session: &'s mut StagingSession<'a>,
    id: SurfaceId,
    raster: RasterImage,
}

impl PendingSurface<'_, '_> {
    /// Handle of the attached surface.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Synchronization barrier: flush the pending layout of this surface.
    ///
    /// Dimensions can only be read from the returned [`SettledSurface`].
    pub fn settle(self) -> SettledSurface {
        let dims = (self.raster.width(), self.raster.height());
        let mut inner = self.session.area.lock_inner();
        if let Some(slot) = inner.slots.iter_mut().find(|s| s.id == self.id) {
            slot.layout = Some(dims);
        }
        inner.stats.settles = inner.stats.settles.saturating_add(1);
        drop(inner);
        tracing::trace!(surface = self.id.0, width = dims.0, height = dims.1, "settled");

        SettledSurface {
            id: self.id,
            width: dims.0,
            height: dims.1,
            raster: self.raster,
        }
    }
}

/// A staged surface past the settle barrier.
#[derive(Debug)]
pub struct SettledSurface {
    id: SurfaceId,
    width: u32,
    height: u32,
    raster: RasterImage,
}

impl SettledSurface {
    /// Handle of the attached surface.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Measured `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Borrow the staged raster.
    pub fn raster(&self) -> &RasterImage {
        &self.raster
    }

    /// Mutably borrow the staged raster.
    pub fn raster_mut(&mut self) -> &mut RasterImage {
        &mut self.raster
    }

    /// Take the raster out.
    pub fn into_raster(self) -> RasterImage {
        self.raster
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/staging.rs"]
mod tests;
