// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seamcarve - the orchestrator
//!
//! Drives the energy → cost map → seam → removal cycle once per column
//! to be removed, then transposes the buffer (and its mask) and runs the
//! very same cycle for the rows.  Every removal depends on the buffer
//! left by the one before it, so removals are strictly sequential; the
//! parallelism lives inside each phase.
//!
//! All the state of a carve travels in an explicit `CarveSession`;
//! the carver itself holds only its configuration.

use crate::buffer::PixelBuffer;
use crate::cache::{CacheKey, SeamCache};
use crate::costmap::SeamCostMap;
use crate::energy::{EnergyComputer, EnergyGrid, SobelEnergy};
use crate::error::CarveError;
use crate::mask::{ConstraintMask, ConstraintView, FrameMask, MaskPolicy};
use crate::remover::{remove_seam, sequential_seams};
use crate::seam::{extract_seam, extract_seams, Seam};
use std::time::{Duration, Instant};

/// The direction seams are removed in.  `Width` removes columns,
/// `Height` removes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Width,
    Height,
}

/// Where a single removal has got to.
///
/// A removal always runs `Idle → EnergyComputed → CostMapBuilt →
/// SeamExtracted → SeamRemoved` and then returns to `Idle`.  The only
/// shortcut is `Idle → SeamExtracted`, taken when the seam comes out of
/// a cache and there is no energy or cost map to compute.  `Done` is
/// reached once both passes are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarveState {
    Idle,
    EnergyComputed,
    CostMapBuilt,
    SeamExtracted,
    SeamRemoved,
    Done,
}

impl CarveState {
    fn permits(self, next: CarveState) -> bool {
        use CarveState::*;
        matches!(
            (self, next),
            (Idle, EnergyComputed)
                | (EnergyComputed, CostMapBuilt)
                | (CostMapBuilt, SeamExtracted)
                | (Idle, SeamExtracted)
                | (SeamExtracted, SeamRemoved)
                | (SeamRemoved, Idle)
                | (Idle, Done)
        )
    }
}

/// How the cost map is brought up to date between removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rebuild {
    /// Recompute every cell every time.
    #[default]
    Full,
    /// Recompute only the band around the last seam removed; see
    /// [`SeamCostMap::rebuild`].
    Incremental,
}

/// Carver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarveOptions {
    pub rebuild: Rebuild,
    /// How many seams to take from each cost map.  Anything above one
    /// trades accuracy for speed, since only the bottom-row starts of
    /// those seams are kept apart.
    pub seams_per_pass: usize,
    pub mask_policy: MaskPolicy,
}

impl Default for CarveOptions {
    fn default() -> Self {
        CarveOptions {
            rebuild: Rebuild::Full,
            seams_per_pass: 1,
            mask_policy: MaskPolicy::Lockstep,
        }
    }
}

impl CarveOptions {
    pub fn with_rebuild(mut self, rebuild: Rebuild) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn with_seams_per_pass(mut self, seams: usize) -> Self {
        self.seams_per_pass = seams;
        self
    }

    pub fn with_mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.mask_policy = policy;
        self
    }
}

/// Cumulative time spent in each phase of a carve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub energy: Duration,
    pub cost_map: Duration,
    pub extraction: Duration,
    pub removal: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.energy + self.cost_map + self.extraction + self.removal
    }
}

fn timed<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    *slot += start.elapsed();
    result
}

/// Receives `(axis, remaining)` after every single seam removal, where
/// `remaining` is the width or height left.  Implementations should
/// return promptly, as the next removal waits on them.
pub trait ProgressSink {
    fn report(&mut self, axis: Axis, remaining: u32);
}

impl<F: FnMut(Axis, u32)> ProgressSink for F {
    fn report(&mut self, axis: Axis, remaining: u32) {
        self(axis, remaining)
    }
}

/// A seam cache together with the frame identity to look seams up
/// under.
pub struct CacheBinding<'a> {
    frame: String,
    store: &'a mut dyn SeamCache,
}

/// Everything one carve needs from its caller.
pub struct CarveRequest<'a> {
    buffer: &'a PixelBuffer,
    reduce_width: u32,
    reduce_height: u32,
    mask: Option<&'a FrameMask>,
    cache: Option<CacheBinding<'a>>,
    progress: Option<&'a mut dyn ProgressSink>,
}

impl<'a> CarveRequest<'a> {
    pub fn new(buffer: &'a PixelBuffer) -> Self {
        CarveRequest {
            buffer,
            reduce_width: 0,
            reduce_height: 0,
            mask: None,
            cache: None,
            progress: None,
        }
    }

    /// Remove this many columns.
    pub fn reduce_width(mut self, columns: u32) -> Self {
        self.reduce_width = columns;
        self
    }

    /// Remove this many rows.
    pub fn reduce_height(mut self, rows: u32) -> Self {
        self.reduce_height = rows;
        self
    }

    pub fn with_mask(mut self, mask: &'a FrameMask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_cache(mut self, frame: impl Into<String>, store: &'a mut dyn SeamCache) -> Self {
        self.cache = Some(CacheBinding {
            frame: frame.into(),
            store,
        });
        self
    }

    pub fn with_progress(mut self, sink: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// The result of a completed carve.
#[derive(Debug, Clone)]
pub struct CarveOutcome {
    pub buffer: PixelBuffer,
    pub timings: PhaseTimings,
    /// Column seams, in removal order, each in the coordinates of the
    /// buffer it was removed from.
    pub width_seams: Vec<Seam>,
    /// Row seams, in removal order.  Each is indexed by column and
    /// gives the row removed there.
    pub height_seams: Vec<Seam>,
}

/// The working state of one carve.
#[derive(Debug, Clone)]
pub(crate) struct CarveSession {
    buffer: PixelBuffer,
    mask: Option<ConstraintMask>,
    policy: MaskPolicy,
    axis: Axis,
    state: CarveState,
    cost_map: Option<SeamCostMap>,
    last_seam: Option<Seam>,
    timings: PhaseTimings,
}

impl CarveSession {
    fn new(buffer: PixelBuffer, mask: Option<ConstraintMask>, policy: MaskPolicy) -> Self {
        CarveSession {
            buffer,
            mask,
            policy,
            axis: Axis::Width,
            state: CarveState::Idle,
            cost_map: None,
            last_seam: None,
            timings: PhaseTimings::default(),
        }
    }

    fn advance(&mut self, next: CarveState) -> Result<(), CarveError> {
        if !self.state.permits(next) {
            return Err(CarveError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn constraints(&self) -> ConstraintView<'_> {
        ConstraintView::new(self.mask.as_ref(), self.policy)
    }

    // Swap rows and columns of everything that tracks the image.  Any
    // retained cost map describes the old orientation and is dropped.
    fn transpose(&mut self) -> Result<(), CarveError> {
        self.buffer = self.buffer.transposed()?;
        if let Some(mask) = &self.mask {
            self.mask = Some(mask.transposed()?);
        }
        self.cost_map = None;
        self.last_seam = None;
        Ok(())
    }

    // Cut one seam out of the buffer, and out of the mask when the mask
    // is kept in lockstep.
    fn remove(&mut self, seam: &Seam) -> Result<(), CarveError> {
        let mut removal = self.timings.removal;
        let buffer = timed(&mut removal, || remove_seam(&self.buffer, seam))?;
        let mask = match (&self.mask, self.policy) {
            (Some(mask), MaskPolicy::Lockstep) => {
                Some(timed(&mut removal, || mask.without_seam(seam))?)
            }
            (mask, _) => mask.clone(),
        };
        self.timings.removal = removal;
        self.buffer = buffer;
        self.mask = mask;
        Ok(())
    }
}

/// Carves pixel buffers with a given energy function.
#[derive(Debug, Clone, Default)]
pub struct SeamCarver<E: EnergyComputer = SobelEnergy> {
    energy: E,
    options: CarveOptions,
}

impl SeamCarver<SobelEnergy> {
    /// A carver using the Sobel energy.
    pub fn new(options: CarveOptions) -> Self {
        SeamCarver {
            energy: SobelEnergy,
            options,
        }
    }
}

impl<E: EnergyComputer> SeamCarver<E> {
    pub fn with_energy(energy: E, options: CarveOptions) -> Self {
        SeamCarver { energy, options }
    }

    pub fn options(&self) -> &CarveOptions {
        &self.options
    }

    // Everything that can be known to be wrong is rejected here, before
    // a single seam is looked for.
    fn validate(&self, request: &CarveRequest<'_>) -> Result<(), CarveError> {
        let (width, height) = request.buffer.dimensions();
        if request.reduce_width == 0 && request.reduce_height == 0 {
            return Err(CarveError::InvalidInput("nothing to carve".to_string()));
        }
        if u64::from(width) <= u64::from(request.reduce_width) + 1 {
            return Err(CarveError::InvalidInput(format!(
                "cannot remove {} columns from an image {} wide",
                request.reduce_width, width
            )));
        }
        if u64::from(height) <= u64::from(request.reduce_height) + 1 {
            return Err(CarveError::InvalidInput(format!(
                "cannot remove {} rows from an image {} high",
                request.reduce_height, height
            )));
        }
        if self.options.seams_per_pass == 0 {
            return Err(CarveError::InvalidInput(
                "at least one seam must be taken per pass".to_string(),
            ));
        }
        if let Some(frame) = request.mask {
            let (mw, mh) = frame.mask().dimensions();
            let fits = match self.options.mask_policy {
                MaskPolicy::Lockstep => (mw, mh) == (width, height),
                MaskPolicy::FrameRemap => mw >= width && mh >= height,
            };
            if !fits {
                return Err(CarveError::InvalidInput(format!(
                    "a {}x{} mask cannot constrain a {}x{} image under {:?}",
                    mw, mh, width, height, self.options.mask_policy
                )));
            }
        }
        Ok(())
    }

    /// Remove the requested columns, then the requested rows.
    ///
    /// The request's buffer is only borrowed; if anything fails, it is
    /// still the last good image.
    pub fn carve(&self, request: CarveRequest<'_>) -> Result<CarveOutcome, CarveError> {
        self.validate(&request)?;
        let CarveRequest {
            buffer,
            reduce_width,
            reduce_height,
            mask,
            mut cache,
            mut progress,
        } = request;

        let mask = mask.map(|frame| frame.mask().clone());
        let mut session = CarveSession::new(buffer.clone(), mask, self.options.mask_policy);

        let width_seams = self.carve_axis(
            &mut session,
            Axis::Width,
            reduce_width,
            &mut cache,
            &mut progress,
        )?;

        let mut height_seams = Vec::new();
        if reduce_height > 0 {
            session.transpose()?;
            height_seams = self.carve_axis(
                &mut session,
                Axis::Height,
                reduce_height,
                &mut cache,
                &mut progress,
            )?;
            session.transpose()?;
        }
        session.advance(CarveState::Done)?;

        let timings = session.timings;
        log::info!("The energy map took {:?}.", timings.energy);
        log::info!("The cost map took {:?}.", timings.cost_map);
        log::info!("The seams took {:?}.", timings.extraction);
        log::info!("The removal of seams took {:?}.", timings.removal);
        log::info!("The carving took {:?}.", timings.total());

        Ok(CarveOutcome {
            buffer: session.buffer,
            timings,
            width_seams,
            height_seams,
        })
    }

    // Carve `count` seams out of the session's buffer, treating its rows
    // as rows whatever the axis.
    fn carve_axis(
        &self,
        session: &mut CarveSession,
        axis: Axis,
        count: u32,
        cache: &mut Option<CacheBinding<'_>>,
        progress: &mut Option<&mut dyn ProgressSink>,
    ) -> Result<Vec<Seam>, CarveError> {
        session.axis = axis;
        if count > 0 {
            log::info!(
                "carving {} seams along {:?} from {}x{}",
                count,
                axis,
                session.buffer.width(),
                session.buffer.height()
            );
        }
        let key = cache
            .as_ref()
            .map(|binding| CacheKey::new(binding.frame.clone(), axis));
        let count = count as usize;
        let mut removed: Vec<Seam> = Vec::with_capacity(count);

        while removed.len() < count {
            let index = removed.len();
            let (width, height) = session.buffer.dimensions();

            let recalled = match (&key, cache.as_ref()) {
                (Some(key), Some(binding)) => binding.store.get(key, index).cloned(),
                _ => None,
            };
            let batch = match recalled {
                Some(seam) if seam.check_fits(width, height).is_ok() => {
                    log::debug!("cache hit for seam {} of {:?}", index, key);
                    session.advance(CarveState::SeamExtracted)?;
                    session.cost_map = None;
                    vec![seam]
                }
                stale => {
                    if stale.is_some() {
                        log::debug!(
                            "cached seam {} does not fit a {}x{} image; recomputing",
                            index,
                            width,
                            height
                        );
                    }
                    let wanted = self.options.seams_per_pass.min(count - index);
                    let batch = self.find_seams(session, wanted)?;
                    if let (Some(key), Some(binding)) = (&key, cache.as_mut()) {
                        for (offset, seam) in batch.iter().enumerate() {
                            binding.store.put(key, index + offset, seam.clone());
                        }
                    }
                    batch
                }
            };

            for seam in &batch {
                session.remove(seam)?;
                log::trace!("removed seam {:?}", seam.columns());
                if let Some(sink) = progress.as_deref_mut() {
                    sink.report(session.axis, session.buffer.width());
                }
            }
            session.advance(CarveState::SeamRemoved)?;

            session.last_seam = match batch.len() {
                1 => batch.last().cloned(),
                _ => {
                    session.cost_map = None;
                    None
                }
            };
            removed.extend(batch);
            session.advance(CarveState::Idle)?;
        }
        Ok(removed)
    }

    // Energy, cost map and extraction for one pass: up to `wanted`
    // seams, expressed so they can be removed one after another.
    fn find_seams(&self, session: &mut CarveSession, wanted: usize) -> Result<Vec<Seam>, CarveError> {
        let mut timings = session.timings;

        let energy = timed(&mut timings.energy, || self.energy.compute(&session.buffer))?;
        session.advance(CarveState::EnergyComputed)?;

        let cost = timed(&mut timings.cost_map, || self.cost_map(session, &energy))?;
        session.advance(CarveState::CostMapBuilt)?;

        let seams = timed(&mut timings.extraction, || {
            if wanted <= 1 {
                extract_seam(&cost).map(|seam| vec![seam])
            } else {
                extract_seams(&cost, wanted).and_then(|set| sequential_seams(&set))
            }
        })?;
        session.advance(CarveState::SeamExtracted)?;

        session.cost_map = Some(cost);
        session.timings = timings;
        Ok(seams)
    }

    fn cost_map(
        &self,
        session: &mut CarveSession,
        energy: &EnergyGrid,
    ) -> Result<SeamCostMap, CarveError> {
        let previous = session.cost_map.take();
        let last_seam = session.last_seam.take();
        let view = session.constraints();
        match (self.options.rebuild, previous, last_seam) {
            (Rebuild::Incremental, Some(previous), Some(seam)) => {
                match SeamCostMap::rebuild(Some(&previous), Some(&seam), energy, &view) {
                    Err(CarveError::DimensionMismatch { expected, found }) => {
                        log::debug!(
                            "retained cost map is {:?}, needed {:?}; rebuilding in full",
                            found,
                            expected
                        );
                        SeamCostMap::build(energy, &view)
                    }
                    outcome => outcome,
                }
            }
            _ => SeamCostMap::build(energy, &view),
        }
    }
}

/// Carve `buffer` down to `new_width`x`new_height` with default options.
pub fn seamcarve(
    buffer: &PixelBuffer,
    new_width: u32,
    new_height: u32,
) -> Result<PixelBuffer, CarveError> {
    let (width, height) = buffer.dimensions();
    if width < new_width || height < new_height {
        return Err(CarveError::InvalidInput(
            "seamcarve cannot upscale an image".to_string(),
        ));
    }
    let request = CarveRequest::new(buffer)
        .reduce_width(width - new_width)
        .reduce_height(height - new_height);
    Ok(SeamCarver::new(CarveOptions::default()).carve(request)?.buffer)
}
