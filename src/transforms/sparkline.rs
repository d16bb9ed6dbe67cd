//! Terminal sparkline rendering.
//!
//! Two renderers over the same input contract: a chronological value
//! sequence and a target character width. Values are min-max normalized to
//! a fixed level count; when the input is longer than the target width it
//! is downsampled by nearest-index selection, never averaged, so spikes
//! stay visible at the cost of aliasing.

use anyhow::{bail, Result};

use crate::models::Observation;

/// Nine block glyphs, blank through full.
const BLOCKS: [char; 9] = [' ', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}', '\u{2588}'];

/// Braille dot masks for the left half-column at heights 0..=4
/// (dots 7, 3, 2, 1 filled bottom-up).
const LEFT_HEIGHTS: [u32; 5] = [0, 0x40, 0x44, 0x46, 0x47];
/// Right half-column at heights 0..=4 (dots 8, 6, 5, 4).
const RIGHT_HEIGHTS: [u32; 5] = [0, 0x80, 0xA0, 0xB0, 0xB8];

const BRAILLE_BASE: u32 = 0x2800;

/// Most recent `points` observations (input is descending by date),
/// reversed to chronological order for rendering.
pub fn prepare_sparkline_data(observations: &[Observation], points: usize) -> Vec<f64> {
    observations
        .iter()
        .take(points)
        .rev()
        .map(|o| o.value)
        .collect()
}

fn ensure_finite(values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        bail!("sparkline input contains a non-finite value");
    }
    Ok(())
}

/// Nearest-index downsample to at most `width` samples.
fn downsample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    let step = values.len() as f64 / width as f64;
    (0..width)
        .map(|i| values[(i as f64 * step) as usize])
        .collect()
}

/// One block glyph per sample, 9 levels. Flat input renders the mid glyph.
pub fn block_sparkline(values: &[f64], width: usize) -> Result<String> {
    ensure_finite(values)?;
    if values.is_empty() || width == 0 {
        return Ok(String::new());
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range == 0.0 {
        return Ok(BLOCKS[4].to_string().repeat(values.len().min(width)));
    }

    let samples = downsample(values, width);
    Ok(samples
        .iter()
        .map(|v| {
            let level = (((v - min) / range) * 8.0) as usize;
            BLOCKS[level.min(8)]
        })
        .collect())
}

/// Two samples per output character, 5 height levels per half-column.
/// Input shorter than `2 * width` is padded with its final value; flat
/// input renders the mid dot pattern.
pub fn braille_sparkline(values: &[f64], width: usize) -> Result<String> {
    ensure_finite(values)?;
    if values.is_empty() || width == 0 {
        return Ok(String::new());
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut samples = downsample(values, width * 2);
    let last = samples.last().copied().unwrap_or(0.0);
    samples.resize(width * 2, last);

    let level = |v: f64| -> usize {
        if range == 0.0 {
            2
        } else {
            (((v - min) / range) * 4.0).round() as usize
        }
    };

    Ok(samples
        .chunks(2)
        .map(|pair| {
            let left = LEFT_HEIGHTS[level(pair[0]).min(4)];
            let right = RIGHT_HEIGHTS[level(pair[1]).min(4)];
            char::from_u32(BRAILLE_BASE + left + right).unwrap_or(' ')
        })
        .collect())
}
