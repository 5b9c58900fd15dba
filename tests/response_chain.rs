//! Integration tests for composing and transforming GSC responses.

use approx::assert_relative_eq;
use maxi_gsc::prelude::*;
use nalgebra::DMatrix;

/// 1201 photon bins (0.45 to 60.5 keV) × 1200 channels (0.5 to 60.5 keV).
///
/// Each photon bin puts 60% of its probability in the matching channel and
/// 20% in each neighbour.
fn create_synthetic_rmf(detector: Detector, mode: u32) -> ResponseMatrix {
    let num_ebins = 1201;
    let num_chans = 1200;
    let photon_edges: Vec<f64> = (0..=num_ebins).map(|k| 0.45 + 0.05 * k as f64).collect();
    let chan_edges: Vec<f64> = (0..=num_chans).map(|k| 0.5 + 0.05 * k as f64).collect();

    let mut matrix = DMatrix::zeros(num_ebins, num_chans);
    for i in 0..num_ebins {
        let c = i.min(num_chans - 1);
        matrix[(i, c)] += 0.6;
        if c > 0 {
            matrix[(i, c - 1)] += 0.2;
        }
        if c + 1 < num_chans {
            matrix[(i, c + 1)] += 0.2;
        }
    }

    ResponseMatrix::from_photon_edges(
        matrix,
        &photon_edges,
        Ebounds::from_edges(&chan_edges).unwrap(),
        detector,
        mode,
    )
    .unwrap()
    .with_filename("mx_gsc0_hv803_detx0000_0000.rmf")
}

/// HVB803 and HVB854 area corrections on 1200 bins from 0.475 to 60.475 keV.
fn create_synthetic_arf(detector: Detector) -> EffectiveAreaCurve {
    let curve = |first: f64, last: f64| {
        let lo: Vec<f64> = (0..1200).map(|i| 0.475 + 0.05 * i as f64).collect();
        let hi: Vec<f64> = lo.iter().map(|l| l + 0.05).collect();
        let area = (0..1200)
            .map(|i| first + (last - first) * i as f64 / 1199.0)
            .collect();
        AreaCurve::new(lo, hi, area).unwrap()
    };
    EffectiveAreaCurve::from_extensions(
        detector,
        vec![
            (Header::new().with("EXTNAME", "HVB803"), curve(0.5928503, 1.0)),
            (Header::new().with("EXTNAME", "HVB854"), curve(1.0013245, 1.0)),
        ],
    )
    .unwrap()
    .with_filename("mx_gsc0_arf.fits")
}

#[test]
fn test_apply_arf_builds_rsp() {
    let rmf = create_synthetic_rmf(Detector::HA0, 803);
    let rsp = rmf.apply_arf(&create_synthetic_arf(Detector::HA0)).unwrap();

    assert_eq!(rsp.num_chans(), 1200);
    assert_eq!(rsp.num_ebins(), 1201);
    assert_eq!(rsp.detector(), Detector::HA0);
    assert_eq!(rsp.filename(), Some("mx_gsc0_hv803_detx0000_0000.rsp"));
    assert_eq!(rsp.tstart(), 0.0);
    assert_eq!(rsp.tstop(), 0.0);
    assert_eq!(rsp.tcent(), 0.0);
    assert_eq!(rsp.trigtime(), None);

    // lowest photon bin sits below the first curve centroid, so it gets the end value
    let row_sum: f64 = rsp.drm().row(0).sum();
    assert_relative_eq!(row_sum, 0.8 * 0.5928503, epsilon = 1e-12);
}

#[test]
fn test_apply_arf_rejects_wrong_detector_and_mode() {
    let arf = create_synthetic_arf(Detector::HA0);

    let other = create_synthetic_rmf(Detector::ZB2, 803);
    assert!(matches!(
        other.apply_arf(&arf),
        Err(GscError::DetectorMismatch { .. })
    ));

    let unsupported = create_synthetic_rmf(Detector::HA0, 888);
    assert!(matches!(
        unsupported.apply_arf(&arf),
        Err(GscError::InvalidArgument(_))
    ));
    assert!(arf.get_arf(888).is_err());
    assert_eq!(arf.modes(), vec![803, 854]);
}

#[test]
fn test_rebin_and_resample_shapes() {
    let rsp = create_synthetic_rmf(Detector::HA0, 854)
        .apply_arf(&create_synthetic_arf(Detector::HA0))
        .unwrap();

    let rebinned = rsp.rebin(2).unwrap();
    assert_eq!(rebinned.num_chans(), 600);
    assert_eq!(rebinned.num_ebins(), 1201);
    assert_eq!(rebinned.ebounds().num_intervals(), 600);

    let resampled = rsp.resample(600).unwrap();
    assert_eq!(resampled.num_chans(), 1200);
    assert_eq!(resampled.num_ebins(), 600);
    let (lo, hi) = resampled.photon_bins();
    assert_relative_eq!(lo[0], 0.45, epsilon = 1e-12);
    assert_relative_eq!(hi[599], 60.5, epsilon = 1e-12);

    assert!(rsp.rebin(0).is_err());
    assert!(rsp.resample(0).is_err());
}

#[test]
fn test_fold_preserved_under_rebin_and_resample() {
    let rsp = create_synthetic_rmf(Detector::HA0, 803)
        .apply_arf(&create_synthetic_arf(Detector::HA0))
        .unwrap();
    let model = PowerLaw::default();
    let params = [0.01, -2.2];

    let folded = rsp.fold_spectrum(&model, &params, 2.0).unwrap();
    assert_eq!(folded.size(), 1200);
    assert!(folded.counts.iter().all(|&c| c >= 0.0));
    assert!(folded.exposure.iter().all(|&e| e == 2.0));
    let total = folded.total_counts();
    assert!(total > 0.0);

    let rebinned = rsp.rebin(2).unwrap().fold_spectrum(&model, &params, 2.0).unwrap();
    assert_eq!(rebinned.size(), 600);
    assert_relative_eq!(rebinned.total_counts(), total, max_relative = 1e-10);

    let resampled = rsp.resample(600).unwrap().fold_spectrum(&model, &params, 2.0).unwrap();
    assert_eq!(resampled.size(), 1200);
    assert_relative_eq!(resampled.total_counts(), total, max_relative = 0.01);
}

#[test]
fn test_fold_with_closure_model() {
    let rsp = create_synthetic_rmf(Detector::HA0, 803)
        .apply_arf(&create_synthetic_arf(Detector::HA0))
        .unwrap();
    let flat = |params: &[f64], _energy: f64| params[0];

    let folded = rsp.fold_spectrum(&flat, &[1.0], 1.0).unwrap();
    let expected: f64 = rsp
        .photon_effective_area()
        .iter()
        .zip(rsp.photon_widths())
        .map(|(a, de)| a * de)
        .sum();
    assert_relative_eq!(folded.total_counts(), expected, max_relative = 1e-10);

    assert!(rsp.fold_spectrum(&PowerLaw::default(), &[1.0], 1.0).is_err());
    assert!(rsp.fold_spectrum(&flat, &[1.0], -1.0).is_err());
}
