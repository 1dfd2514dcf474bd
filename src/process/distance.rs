//! Inter-trace distance bookkeeping.
//!
//! Each trace carries the geodesic distance to its predecessor in cm; the
//! edge-ground filter weighs its evidence window with these values. Raw
//! GPS fixes are noisy, so the distances are smoothed with a wide flat
//! moving average after computation.

use crate::trace::Trace;

/// Fallback distance when either trace has no position, cm.
const FALLBACK_DIST_CM: f64 = 5.0;

/// Smoothing radius, traces.
const AVG_RADIUS: usize = 600;

/// Fill `prev_dist_cm` for every trace from the geodesic distance to the
/// previous trace. The first trace copies the second one's distance.
pub fn calc_distances(traces: &mut [Trace]) {
    if traces.len() < 2 {
        return;
    }

    for i in 1..traces.len() {
        let dist = match (traces[i - 1].lat_lon(), traces[i].lat_lon()) {
            (Some(prev), Some(cur)) => prev.distance_m(&cur) * 100.0,
            _ => FALLBACK_DIST_CM,
        };
        traces[i].set_prev_dist_cm(dist);
    }
    let first = traces[1].prev_dist_cm();
    traces[0].set_prev_dist_cm(first);
}

/// Flat moving average over the distance vector.
pub fn smooth_distances(traces: &mut [Trace]) {
    let n = traces.len();
    if n == 0 {
        return;
    }

    let dst: Vec<f64> = traces.iter().map(Trace::prev_dist_cm).collect();

    let mut smoothed = vec![0.0f64; n];
    for (i, slot) in smoothed.iter_mut().enumerate() {
        let from = i.saturating_sub(AVG_RADIUS);
        let to = (i + AVG_RADIUS).min(n - 1);
        let sum: f64 = dst[from..=to].iter().sum();
        *slot = sum / (to - from + 1) as f64;
    }

    for (trace, &d) in traces.iter_mut().zip(smoothed.iter()) {
        trace.set_prev_dist_cm(d);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::latlon::LatLon;

    use super::*;

    fn trace_at(latlon: Option<LatLon>) -> Trace {
        let mut trace = Trace::new(
            Arc::from(vec![0u8; 240].into_boxed_slice()),
            vec![0.0; 4],
            latlon,
            None,
        );
        trace.set_prev_dist_cm(0.0);
        trace
    }

    #[test]
    fn test_calc_distances_from_positions() {
        // ~1.11 m apart along a meridian
        let mut traces = vec![
            trace_at(Some(LatLon::new(57.0, 24.0))),
            trace_at(Some(LatLon::new(57.00001, 24.0))),
            trace_at(Some(LatLon::new(57.00002, 24.0))),
        ];
        calc_distances(&mut traces);

        for trace in &traces {
            let d = trace.prev_dist_cm();
            assert!((d - 111.2).abs() < 2.0, "distance {d}");
        }
    }

    #[test]
    fn test_calc_distances_fallback_without_position() {
        let mut traces = vec![
            trace_at(Some(LatLon::new(57.0, 24.0))),
            trace_at(None),
            trace_at(Some(LatLon::new(57.0001, 24.0))),
        ];
        calc_distances(&mut traces);
        assert_eq!(traces[1].prev_dist_cm(), FALLBACK_DIST_CM);
        assert_eq!(traces[2].prev_dist_cm(), FALLBACK_DIST_CM);
    }

    #[test]
    fn test_smooth_preserves_constant_vector() {
        let mut traces: Vec<Trace> = (0..20).map(|_| trace_at(None)).collect();
        for trace in traces.iter_mut() {
            trace.set_prev_dist_cm(7.5);
        }
        smooth_distances(&mut traces);
        for trace in &traces {
            assert!((trace.prev_dist_cm() - 7.5).abs() < 1e-12);
        }
    }
}
