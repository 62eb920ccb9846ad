// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Worker fan-out
//!
//! Every data-parallel step in the carver has the same shape: a
//! destination slice made of equally sized units (a row of pixels, a
//! row of energies, a run of cost cells) where each unit is written by
//! exactly one worker, and everything read comes from some *other*
//! slice.  Breaking the destination up by `chunks_mut` and handing each
//! chunk to its own scoped thread gives us that without anything
//! unsafe.
//!
//! With the `threaded` feature off, the same closures run serially on
//! the calling thread.

/// Below this many units, spawning threads costs more than it saves.
#[cfg_attr(not(feature = "threaded"), allow(dead_code))]
pub(crate) const MIN_UNITS_PER_WORKER: usize = 16;

#[cfg(feature = "threaded")]
fn worker_count(units: usize) -> usize {
    num_cpus::get().max(1).min(units / MIN_UNITS_PER_WORKER).max(1)
}

/// Split `data` into contiguous bands of whole `unit`-sized pieces, one
/// band per worker, and call `f(first_unit_index, band)` for each.
///
/// `data.len()` must be a multiple of `unit`.
pub(crate) fn for_each_band<T, F>(data: &mut [T], unit: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    debug_assert!(unit > 0 && data.len() % unit == 0);

    #[cfg(feature = "threaded")]
    {
        let units = data.len() / unit;
        let workers = worker_count(units);
        if workers > 1 {
            let per_worker = (units + workers - 1) / workers;
            let f = &f;
            let outcome = crossbeam::scope(|scope| {
                for (band_index, band) in data.chunks_mut(per_worker * unit).enumerate() {
                    scope.spawn(move |_| f(band_index * per_worker, band));
                }
            });
            if let Err(panic) = outcome {
                std::panic::resume_unwind(panic);
            }
            return;
        }
    }

    f(0, data);
}

/// Convenience over [`for_each_band`] for the common row-at-a-time case:
/// `f(y, row)` is called once for every row of a `row_len`-wide grid.
pub(crate) fn for_each_row<T, F>(data: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    for_each_band(data, row_len, |first_row, band| {
        for (offset, row) in band.chunks_mut(row_len).enumerate() {
            f(first_row + offset, row);
        }
    });
}
