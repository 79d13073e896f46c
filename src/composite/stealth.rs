use std::ops::Range;

use crate::foundation::core::{Placement, RasterImage, StealthParams};

/// Outcome counters of one [`composite`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// QR pixels that landed inside the photo.
    pub visible: u64,
    /// Photo pixels rewritten (visible QR pixels with alpha > 0).
    pub touched: u64,
}

/// Blend `qr` into `photo` in place, anchoring the QR origin at `placement`.
///
/// For each QR pixel with alpha > 0 whose photo-space position `(qx + x, qy + y)` lies
/// inside `photo`, the photo pixel's RGB go through [`StealthParams::transform_channel`]
/// and its alpha is forced to `params.overlay_alpha`. Every other photo pixel is left
/// untouched. Total for any placement; never indexes outside either buffer.
#[tracing::instrument(
    skip_all,
    fields(x = placement.x, y = placement.y, qr_w = qr.width(), qr_h = qr.height())
)]
pub fn composite(
    photo: &mut RasterImage,
    qr: &RasterImage,
    placement: Placement,
    params: &StealthParams,
) -> CompositeStats {
    let mut stats = CompositeStats::default();

    let Some(cols) = clip_axis(qr.width(), photo.width(), placement.x) else {
        return stats;
    };
    let Some(rows) = clip_axis(qr.height(), photo.height(), placement.y) else {
        return stats;
    };

    let qr_w = qr.width() as usize;
    let photo_w = photo.width() as usize;
    let qr_data = qr.data();
    let photo_data = photo.data_mut();

    for qy in rows {
        // In range by construction of `rows`/`cols`.
        let py = (i64::from(qy) + placement.y) as usize;
        for qx in cols.clone() {
            stats.visible += 1;

            let qi = ((qy as usize) * qr_w + (qx as usize)) * 4;
            if qr_data[qi + 3] == 0 {
                continue;
            }

            let px = (i64::from(qx) + placement.x) as usize;
            let pi = (py * photo_w + px) * 4;
            let px_in = [
                photo_data[pi],
                photo_data[pi + 1],
                photo_data[pi + 2],
                photo_data[pi + 3],
            ];
            photo_data[pi..pi + 4].copy_from_slice(&params.transform_pixel(px_in));
            stats.touched += 1;
        }
    }

    tracing::debug!(
        visible = stats.visible,
        touched = stats.touched,
        "composited qr"
    );
    stats
}

/// QR-space coordinates along one axis whose photo-space image `q + offset` is in
/// `[0, photo_len)`. `None` when the intersection is empty.
fn clip_axis(qr_len: u32, photo_len: u32, offset: i64) -> Option<Range<u32>> {
    let start = 0i64.saturating_sub(offset).max(0);
    let end = i64::from(qr_len).min(i64::from(photo_len).saturating_sub(offset));
    if start >= end {
        return None;
    }
    // Both bounds lie within `0..=qr_len`.
    Some(start as u32..end as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/stealth.rs"]
mod tests;
