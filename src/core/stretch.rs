//! Conversion of band data to 8-bit display images
//!
//! Each channel is histogram-equalized, then optionally clipped to its
//! 2nd/98th percentiles and rescaled to the full 0..=255 range.

use crate::types::DisplayImage;
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Histogram bins used for equalization
pub const DEFAULT_BINS: usize = 256;

/// Histogram-equalize one channel into `[0, 1]`.
///
/// Non-finite pixels map to 0 and do not contribute to the histogram.
pub fn equalize_hist(channel: ArrayView2<f32>, nbins: usize) -> Array2<f32> {
    let nbins = nbins.max(1);
    let (min, max) = channel
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if min > max {
        return Array2::zeros(channel.raw_dim());
    }
    if min == max {
        return channel.mapv(|v| if v.is_finite() { 1.0 } else { 0.0 });
    }

    let width = (max - min) as f64 / nbins as f64;
    let bin_of = |v: f32| ((((v - min) as f64) / width) as usize).min(nbins - 1);

    let mut cdf = vec![0f64; nbins];
    let mut total = 0f64;
    for &v in channel.iter().filter(|v| v.is_finite()) {
        cdf[bin_of(v)] += 1.0;
        total += 1.0;
    }
    let mut running = 0f64;
    for bin in cdf.iter_mut() {
        running += *bin;
        *bin = running / total;
    }

    // Linear interpolation of the cdf between bin centres
    let first_centre = min as f64 + width / 2.0;
    channel.mapv(|v| {
        if !v.is_finite() {
            return 0.0;
        }
        let position = (v as f64 - first_centre) / width;
        if position <= 0.0 {
            return cdf[0] as f32;
        }
        let lower = position.floor() as usize;
        if lower >= nbins - 1 {
            return cdf[nbins - 1] as f32;
        }
        let t = position - lower as f64;
        (cdf[lower] + (cdf[lower + 1] - cdf[lower]) * t) as f32
    })
}

/// Percentile with linear interpolation between closest ranks
fn percentile(sorted: &[f64], percent: f64) -> f64 {
    let rank = percent / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Clip an 8-bit channel to its 2nd/98th percentiles and stretch to 0..=255
pub fn two_percent_linear(channel: ArrayView2<u8>) -> Array2<u8> {
    if channel.is_empty() {
        return Array2::zeros(channel.raw_dim());
    }
    let mut sorted: Vec<f64> = channel.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let low = percentile(&sorted, 2.0);
    let high = percentile(&sorted, 98.0);
    if high <= low {
        return Array2::zeros(channel.raw_dim());
    }

    channel.mapv(|v| {
        let clipped = (v as f64).clamp(low, high);
        ((clipped - low) / (high - low) * 255.0) as u8
    })
}

/// Convert a multi-channel image (rows x cols x channels) to 8 bit
pub fn to_uint8(image: &Array3<f32>, linear: bool) -> DisplayImage {
    let mut out = Array3::<u8>::zeros(image.raw_dim());
    for (c, channel) in image.axis_iter(Axis(2)).enumerate() {
        let mut equalized = equalize_hist(channel, DEFAULT_BINS);
        let peak = equalized.fold(0f32, |acc, &v| acc.max(v));
        if peak > 0.0 {
            equalized /= peak;
        }
        let mut channel_u8 = equalized.mapv(|v| (v * 255.0) as u8);
        if linear {
            channel_u8 = two_percent_linear(channel_u8.view());
        }
        out.index_axis_mut(Axis(2), c).assign(&channel_u8);
    }
    out
}

/// Convert a single-channel image to 8 bit
pub fn to_uint8_gray(image: &Array2<f32>, linear: bool) -> Array2<u8> {
    let channel_u8 = equalize_hist(image.view(), DEFAULT_BINS).mapv(|v| (v * 255.0) as u8);
    if linear {
        two_percent_linear(channel_u8.view())
    } else {
        channel_u8
    }
}
