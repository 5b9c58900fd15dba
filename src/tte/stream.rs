//! Time-tagged event streams and their reduction.

use crate::binning::{ChannelCombiner, TimeBinner};
use crate::data::{Ebounds, EnergyBins, EventList, TimeEnergyBins};
use crate::detectors::Detector;
use crate::error::{GscError, Result};
use crate::headers::{keys, ExposureKeywords, Header, TimeReference};
use crate::tte::products::{live_exposure, Pha, Phaii};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Channels of the GSC PI grid.
pub const NOMINAL_NUM_CHANS: usize = 1200;

/// Dead time after each recorded event, in seconds.
pub const GSC_EVENT_DEADTIME: f64 = 3e-5;

/// Dead time after an overflow-channel event, in seconds.
pub const GSC_OVERFLOW_DEADTIME: f64 = 3e-5;

/// A time-tagged event stream from one detector (or the merged `ALL` set).
///
/// The event records never change. [`EventStream::set_ebounds`] only swaps
/// the calibration; slicing and rebinning return new streams that share the
/// detector identity and dead-time constants.
#[derive(Debug, Clone)]
pub struct EventStream {
    data: EventList,
    ebounds: Option<Ebounds>,
    detector: Detector,
    event_deadtime: f64,
    overflow_deadtime: f64,
    /// Raw channel count declared by the file
    declared_chans: usize,
    /// Width of the uncalibrated PI grid, shrunk by each rebin
    nominal_chans: usize,
    trigtime: Option<f64>,
    time_ref: Option<TimeReference>,
    file_exposure: ExposureKeywords,
    filename: Option<String>,
}

impl EventStream {
    /// Create a stream with the GSC dead-time constants.
    pub fn new(data: EventList, detector: Detector, declared_chans: usize) -> Self {
        Self {
            data,
            ebounds: None,
            detector,
            event_deadtime: GSC_EVENT_DEADTIME,
            overflow_deadtime: GSC_OVERFLOW_DEADTIME,
            declared_chans,
            nominal_chans: NOMINAL_NUM_CHANS,
            trigtime: None,
            time_ref: None,
            file_exposure: ExposureKeywords::default(),
            filename: None,
        }
    }

    /// Create a stream using the metadata of the events extension header.
    ///
    /// `DETCHANS` is required; `DETNAM` defaults to `ALL`. `TRIGTIME`, the
    /// `MJDREF` pair and the exposure keywords are picked up when present.
    pub fn from_header(data: EventList, header: &Header) -> Result<Self> {
        let declared = header.require_i64(keys::DETCHANS)?;
        if declared <= 0 {
            return Err(GscError::InvalidKeyword {
                key: keys::DETCHANS.to_string(),
                reason: format!("channel count must be positive, got {}", declared),
            });
        }
        let detector = match header.get_str(keys::DETNAM)? {
            Some(name) => name.parse()?,
            None => Detector::All,
        };

        let mut stream = Self::new(data, detector, declared as usize);
        stream.trigtime = header.get_f64(keys::TRIGTIME)?;
        stream.time_ref = TimeReference::from_header(header)?;
        stream.file_exposure = ExposureKeywords::from_header(header)?;
        Ok(stream)
    }

    /// Override the dead-time constants.
    pub fn with_deadtime(mut self, event_deadtime: f64, overflow_deadtime: f64) -> Result<Self> {
        if !(event_deadtime >= 0.0) || !(overflow_deadtime >= 0.0) {
            return Err(GscError::InvalidArgument(
                "Dead time must be non-negative".to_string(),
            ));
        }
        self.event_deadtime = event_deadtime;
        self.overflow_deadtime = overflow_deadtime;
        Ok(self)
    }

    pub fn with_trigtime(mut self, trigtime: f64) -> Self {
        self.trigtime = Some(trigtime);
        self
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    #[inline]
    pub fn data(&self) -> &EventList {
        &self.data
    }

    #[inline]
    pub fn detector(&self) -> Detector {
        self.detector
    }

    #[inline]
    pub fn event_deadtime(&self) -> f64 {
        self.event_deadtime
    }

    #[inline]
    pub fn overflow_deadtime(&self) -> f64 {
        self.overflow_deadtime
    }

    #[inline]
    pub fn trigtime(&self) -> Option<f64> {
        self.trigtime
    }

    pub fn time_reference(&self) -> Option<&TimeReference> {
        self.time_ref.as_ref()
    }

    pub fn file_exposure(&self) -> &ExposureKeywords {
        &self.file_exposure
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn ebounds(&self) -> Option<&Ebounds> {
        self.ebounds.as_ref()
    }

    /// Raw channel count declared by the file (or left by a rebin).
    #[inline]
    pub fn declared_num_chans(&self) -> usize {
        self.declared_chans
    }

    /// Number of channels: the calibration's when attached, else the raw count.
    pub fn num_chans(&self) -> usize {
        self.ebounds
            .as_ref()
            .map_or(self.declared_chans, Ebounds::num_intervals)
    }

    /// `(first, last)` arrival time.
    pub fn time_range(&self) -> Result<(f64, f64)> {
        self.data.time_range()
    }

    /// Attach or replace the channel calibration.
    pub fn set_ebounds(&mut self, ebounds: Ebounds) {
        log::debug!(
            "Attaching {}-channel calibration to {} events",
            ebounds.num_intervals(),
            self.detector
        );
        self.ebounds = Some(ebounds);
    }

    /// Events with `t0 <= time <= t1`.
    pub fn slice_time(&self, (t0, t1): (f64, f64)) -> Self {
        let data = self.data.slice_time(t0, t1);
        self.derive(data, self.ebounds.clone(), self.declared_chans, self.nominal_chans)
    }

    /// Events with `chan_min <= channel <= chan_max`.
    pub fn slice_energy(&self, (chan_min, chan_max): (u32, u32)) -> Self {
        let data = self.data.slice_channels(chan_min, chan_max);
        self.derive(data, self.ebounds.clone(), self.declared_chans, self.nominal_chans)
    }

    /// Merge channels by `factor`.
    ///
    /// The combiner produces the new calibration from the current one; each
    /// event moves to channel `channel / factor`, and events in the trailing
    /// channels that do not fill a group are dropped. Without a calibration
    /// only the channel remap is applied, on the nominal PI grid so that no
    /// event below [`NOMINAL_NUM_CHANS`] is lost to the declared raw count.
    pub fn rebin_energy<C>(&self, combiner: C, factor: usize) -> Result<Self>
    where
        C: ChannelCombiner,
    {
        if factor == 0 {
            return Err(GscError::InvalidArgument(
                "Rebin factor must be at least 1".to_string(),
            ));
        }
        let nominal_chans = self.nominal_chans / factor;
        let (ebounds, n_new, grid) = match &self.ebounds {
            Some(ebounds) => {
                let combined = combiner.combine(&EnergyBins::from_ebounds(ebounds), factor)?;
                let new_ebounds = combined.to_ebounds()?;
                let n_new = new_ebounds.num_intervals();
                (Some(new_ebounds), n_new, n_new)
            }
            None => (None, self.declared_chans / factor, nominal_chans),
        };

        let limit = (grid * factor) as u32;
        let factor32 = factor as u32;
        let data = self
            .data
            .filter_map_channels(|c| (c < limit).then(|| c / factor32));
        log::debug!(
            "Rebinned {} events by {}: {} -> {} channels, {} -> {} events",
            self.detector,
            factor,
            self.num_chans(),
            n_new,
            self.data.len(),
            data.len()
        );

        Ok(self.derive(data, ebounds, n_new, nominal_chans))
    }

    /// Channel histogram of all valid events on the nominal PI grid.
    ///
    /// The grid is always [`NOMINAL_NUM_CHANS`] wide regardless of the
    /// declared raw channel count or any attached calibration; raw channel
    /// `c` lands in bin `c`, with bin edges given in channel numbers.
    pub fn to_spectrum(&self) -> Result<EnergyBins> {
        let (t0, t1) = self.time_range()?;
        let counts = self.data.channel_histogram(NOMINAL_NUM_CHANS);
        self.log_dropped(&counts);
        let exposure = live_exposure(
            t1 - t0,
            &counts,
            self.event_deadtime,
            self.overflow_deadtime,
        );
        EnergyBins::new(
            counts.into_iter().map(|n| n as f64).collect(),
            (0..NOMINAL_NUM_CHANS).map(|c| c as f64).collect(),
            (1..=NOMINAL_NUM_CHANS).map(|c| c as f64).collect(),
            exposure,
        )
    }

    /// Integrated spectrum on the attached calibration, dead-time corrected.
    pub fn to_pha(&self) -> Result<Pha> {
        let ebounds = self.ebounds.as_ref().ok_or_else(|| {
            GscError::NotReady(
                "An energy calibration must be attached with set_ebounds before making a PHA"
                    .to_string(),
            )
        })?;
        let (t0, t1) = self.time_range()?;
        let counts = self.data.channel_histogram(ebounds.num_intervals());
        self.log_dropped(&counts);
        let exposure = live_exposure(
            t1 - t0,
            &counts,
            self.event_deadtime,
            self.overflow_deadtime,
        );
        if let Some(file_exposure) = self.file_exposure.exposure {
            log::debug!(
                "PHA live exposure {:.3} s (channel 0) vs file EXPOSURE {:.3} s",
                exposure.first().copied().unwrap_or(0.0),
                file_exposure
            );
        }

        let data = EnergyBins::new(
            counts.into_iter().map(|n| n as f64).collect(),
            ebounds.low_edges().to_vec(),
            ebounds.high_edges().to_vec(),
            exposure,
        )?;
        Ok(Pha::new(
            data,
            ebounds.clone(),
            (t0, t1),
            self.detector,
            self.trigtime,
        ))
    }

    /// Time-resolved spectrum.
    ///
    /// The binner partitions the arrival times into bins of `bin_width`. The
    /// channel axis is the attached calibration, or the nominal PI grid (its
    /// width divided by any uncalibrated rebin factors) when none is
    /// attached. Each bin's per-channel exposure is its full width less the
    /// dead time of that channel's events. The last bin of [`bin_by_time`]
    /// usually reaches past the final event, so summed PHAII exposure can
    /// exceed the `t_last - t_first` used by [`EventStream::to_pha`].
    ///
    /// [`bin_by_time`]: crate::binning::bin_by_time
    pub fn to_phaii<B>(&self, binner: B, bin_width: f64) -> Result<Phaii>
    where
        B: TimeBinner,
    {
        if !(bin_width > 0.0) {
            return Err(GscError::InvalidArgument(format!(
                "Bin width must be positive, got {}",
                bin_width
            )));
        }
        let times = self.data.times();
        let edges = binner.bin_edges(times, bin_width)?;
        if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(GscError::InvalidArgument(
                "Time binning must return at least two increasing edges".to_string(),
            ));
        }
        let num_times = edges.len() - 1;
        let (emin, emax) = match &self.ebounds {
            Some(eb) => (eb.low_edges().to_vec(), eb.high_edges().to_vec()),
            None => (
                (0..self.nominal_chans).map(|c| c as f64).collect(),
                (1..=self.nominal_chans).map(|c| c as f64).collect(),
            ),
        };
        let num_chans = emin.len();

        let rows: Vec<(Vec<u64>, Vec<f64>)> = (0..num_times)
            .into_par_iter()
            .map(|t| {
                let start = times.partition_point(|&x| x < edges[t]);
                let stop = if t + 1 == num_times {
                    times.partition_point(|&x| x <= edges[t + 1])
                } else {
                    times.partition_point(|&x| x < edges[t + 1])
                };
                let counts = self.data.channel_histogram_range(start, stop.max(start), num_chans);
                let exposure = live_exposure(
                    edges[t + 1] - edges[t],
                    &counts,
                    self.event_deadtime,
                    self.overflow_deadtime,
                );
                (counts, exposure)
            })
            .collect();

        let counts = DMatrix::from_fn(num_times, num_chans, |t, c| rows[t].0[c]);
        let exposure = DMatrix::from_fn(num_times, num_chans, |t, c| rows[t].1[c]);
        let data = TimeEnergyBins::new(
            counts,
            edges[..num_times].to_vec(),
            edges[1..].to_vec(),
            exposure,
            emin,
            emax,
        )?;
        log::debug!(
            "Built {} PHAII: {} time bins × {} channels, {} counts",
            self.detector,
            data.num_times(),
            data.num_chans(),
            data.total_counts()
        );

        Ok(Phaii::new(data, self.ebounds.clone(), self.detector, self.trigtime))
    }

    /// A sibling stream with the same detector metadata.
    fn derive(
        &self,
        data: EventList,
        ebounds: Option<Ebounds>,
        declared_chans: usize,
        nominal_chans: usize,
    ) -> Self {
        Self {
            data,
            ebounds,
            detector: self.detector,
            event_deadtime: self.event_deadtime,
            overflow_deadtime: self.overflow_deadtime,
            declared_chans,
            nominal_chans,
            trigtime: self.trigtime,
            time_ref: self.time_ref,
            file_exposure: self.file_exposure,
            filename: self.filename.clone(),
        }
    }

    fn log_dropped(&self, counts: &[u64]) {
        let histogrammed: u64 = counts.iter().sum();
        let valid = self.data.num_valid() as u64;
        if histogrammed < valid {
            log::debug!(
                "{} valid events fall outside the {}-channel grid",
                valid - histogrammed,
                counts.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{bin_by_time, combine_by_factor};
    use approx::assert_relative_eq;

    fn gsc_ebounds(n: usize) -> Ebounds {
        let edges: Vec<f64> = (0..=n).map(|i| 0.5 + 0.05 * i as f64).collect();
        Ebounds::from_edges(&edges).unwrap()
    }

    fn create_test_stream() -> EventStream {
        // 1000 events over 100 s, channels cycling through 0..1187
        let times: Vec<f64> = (0..1000).map(|i| 1000.0 + 0.1 * i as f64).collect();
        let channels: Vec<u32> = (0..1000).map(|i| (i * 7 % 1187) as u32).collect();
        let data = EventList::from_times_channels(times, channels).unwrap();
        EventStream::new(data, Detector::All, 1187)
    }

    #[test]
    fn test_metadata() {
        let tte = create_test_stream();
        assert_eq!(tte.detector(), Detector::All);
        assert_eq!(tte.event_deadtime(), 3e-5);
        assert_eq!(tte.overflow_deadtime(), 3e-5);
        assert_eq!(tte.num_chans(), 1187);
        assert_eq!(tte.trigtime(), None);
        assert!(tte.ebounds().is_none());
    }

    #[test]
    fn test_from_header() {
        let header = Header::new()
            .with("DETNAM", "ALL")
            .with("DETCHANS", 1187i64)
            .with("MJDREFI", 51544i64)
            .with("MJDREFF", 0.00074287037037037)
            .with("EXPOSURE", 95.0);
        let data = EventList::from_times_channels(vec![1.0, 2.0], vec![3, 4]).unwrap();
        let tte = EventStream::from_header(data.clone(), &header).unwrap();
        assert_eq!(tte.num_chans(), 1187);
        assert_eq!(tte.detector(), Detector::All);
        assert_eq!(tte.time_reference(), Some(&TimeReference::default()));
        assert_eq!(tte.file_exposure().exposure, Some(95.0));

        let missing = Header::new().with("DETNAM", "ALL");
        assert!(matches!(
            EventStream::from_header(data, &missing),
            Err(GscError::MissingKeyword(_))
        ));
    }

    #[test]
    fn test_time_range() {
        let tte = create_test_stream();
        let (t0, t1) = tte.time_range().unwrap();
        assert_relative_eq!(t0, 1000.0);
        assert_relative_eq!(t1, 1099.9, epsilon = 1e-9);

        let empty = tte.slice_time((0.0, 10.0));
        assert!(empty.data().is_empty());
        assert!(matches!(empty.time_range(), Err(GscError::EmptyData(_))));
    }

    #[test]
    fn test_set_ebounds() {
        let mut tte = create_test_stream();
        tte.set_ebounds(gsc_ebounds(1200));
        assert_eq!(tte.ebounds().unwrap().num_intervals(), 1200);
        assert_eq!(tte.num_chans(), 1200);
        assert_eq!(tte.declared_num_chans(), 1187);
    }

    #[test]
    fn test_slice_time() {
        let mut tte = create_test_stream();
        tte.set_ebounds(gsc_ebounds(1200));
        let sliced = tte.slice_time((1010.0, 1020.0));
        let (t0, t1) = sliced.time_range().unwrap();
        assert_relative_eq!(t0, 1010.0, epsilon = 1e-9);
        assert_relative_eq!(t1, 1020.0, epsilon = 1e-9);
        assert_eq!(sliced.detector(), tte.detector());
        assert_eq!(sliced.num_chans(), 1200);
        // original untouched
        assert_eq!(tte.data().len(), 1000);
    }

    #[test]
    fn test_slice_energy() {
        let tte = create_test_stream();
        let sliced = tte.slice_energy((50, 300));
        assert_eq!(sliced.data().channel_range(), Some((50, 300)));
        assert_eq!(sliced.detector(), tte.detector());
        assert!(sliced.time_range().unwrap().0 >= 1000.0);
    }

    #[test]
    fn test_rebin_energy() {
        let mut tte = create_test_stream();
        tte.set_ebounds(gsc_ebounds(1200));
        let rebinned = tte.rebin_energy(combine_by_factor, 2).unwrap();
        assert_eq!(rebinned.num_chans(), 600);
        assert_eq!(rebinned.ebounds().unwrap().num_intervals(), 600);
        let (_, max_chan) = rebinned.data().channel_range().unwrap();
        assert!(max_chan < 600);

        let odd = tte.rebin_energy(combine_by_factor, 7).unwrap();
        assert_eq!(odd.num_chans(), 1200 / 7);
        assert!(tte.rebin_energy(combine_by_factor, 0).is_err());
    }

    #[test]
    fn test_rebin_energy_uncalibrated() {
        let tte = create_test_stream();
        let rebinned = tte.rebin_energy(combine_by_factor, 2).unwrap();
        assert_eq!(rebinned.num_chans(), 593);
        assert!(rebinned.ebounds().is_none());
        // remap runs on the 1200-channel grid, so channel 1186 survives
        assert_eq!(rebinned.data().len(), tte.data().len());
        assert_eq!(rebinned.data().channel_range().unwrap().1, 593);
        assert_eq!(rebinned.to_phaii(bin_by_time, 8.192).unwrap().num_chans(), 600);
    }

    #[test]
    fn test_to_spectrum_nominal_grid() {
        let mut tte = create_test_stream();
        let spec = tte.to_spectrum().unwrap();
        assert_eq!(spec.size(), NOMINAL_NUM_CHANS);
        assert_eq!(spec.total_counts(), 1000.0);

        tte.set_ebounds(gsc_ebounds(1200));
        assert_eq!(tte.to_spectrum().unwrap().size(), NOMINAL_NUM_CHANS);
    }

    #[test]
    fn test_to_pha_requires_ebounds() {
        let mut tte = create_test_stream();
        assert!(matches!(tte.to_pha(), Err(GscError::NotReady(_))));

        tte.set_ebounds(gsc_ebounds(1200));
        let pha = tte.to_pha().unwrap();
        assert_eq!(pha.num_chans(), tte.num_chans());
        assert_eq!(pha.data().total_counts(), 1000.0);
        assert_eq!(pha.detector(), Detector::All);
    }

    #[test]
    fn test_pha_deadtime() {
        let times = vec![0.0, 1.0, 2.0, 3.0, 10.0];
        let channels = vec![0, 0, 1, 2, 2];
        let data = EventList::from_times_channels(times, channels).unwrap();
        let mut tte = EventStream::new(data, Detector::HA0, 3)
            .with_deadtime(0.1, 0.5)
            .unwrap();
        tte.set_ebounds(Ebounds::from_edges(&[1.0, 2.0, 3.0, 4.0]).unwrap());
        let pha = tte.to_pha().unwrap();
        assert_relative_eq!(pha.exposure()[0], 10.0 - 0.2, epsilon = 1e-12);
        assert_relative_eq!(pha.exposure()[1], 10.0 - 0.1, epsilon = 1e-12);
        // last channel is the overflow channel
        assert_relative_eq!(pha.exposure()[2], 10.0 - 1.0, epsilon = 1e-12);
        assert!(EventStream::new(EventList::default(), Detector::HA0, 3)
            .with_deadtime(-1.0, 0.0)
            .is_err());
    }

    #[test]
    fn test_to_phaii() {
        let mut tte = create_test_stream();
        let phaii = tte.to_phaii(bin_by_time, 8.192).unwrap();
        // 99.9 s span / 8.192 s -> 13 bins
        assert_eq!(phaii.num_times(), 13);
        assert_eq!(phaii.num_chans(), NOMINAL_NUM_CHANS);
        assert_eq!(phaii.data().total_counts(), 1000);

        tte.set_ebounds(gsc_ebounds(1200));
        let calibrated = tte.to_phaii(bin_by_time, 8.192).unwrap();
        assert_eq!(calibrated.num_times(), 13);
        assert_eq!(calibrated.data().total_counts(), 1000);

        let lc = calibrated.to_lightcurve(None).unwrap();
        assert_eq!(lc.counts.iter().sum::<f64>(), 1000.0);
        let spec = calibrated.to_spectrum(None).unwrap();
        assert_eq!(spec.size(), 1200);

        assert!(tte.to_phaii(bin_by_time, 0.0).is_err());
    }

    #[test]
    fn test_phaii_counts_independent_of_calibration() {
        // channels above the declared raw count still sit on the PI grid
        let times: Vec<f64> = (0..1200).map(|i| 0.01 * i as f64).collect();
        let channels: Vec<u32> = (0..1200).collect();
        let data = EventList::from_times_channels(times, channels).unwrap();
        let mut tte = EventStream::new(data, Detector::All, 1187);

        let spectrum = tte.to_spectrum().unwrap();
        let uncalibrated = tte.to_phaii(bin_by_time, 1.0).unwrap();
        tte.set_ebounds(gsc_ebounds(1200));
        let calibrated = tte.to_phaii(bin_by_time, 1.0).unwrap();

        assert_eq!(spectrum.total_counts(), 1200.0);
        assert_eq!(uncalibrated.num_chans(), 1200);
        assert_eq!(uncalibrated.data().total_counts(), 1200);
        assert_eq!(
            uncalibrated.data().total_counts(),
            calibrated.data().total_counts()
        );
        assert_eq!(uncalibrated.data().counts, calibrated.data().counts);
    }

    #[test]
    fn test_phaii_last_bin_uses_full_width() {
        let data = EventList::from_times_channels(vec![0.0, 1.0, 2.5], vec![0, 1, 1]).unwrap();
        let mut tte = EventStream::new(data, Detector::HA0, 2)
            .with_deadtime(0.0, 0.0)
            .unwrap();
        tte.set_ebounds(Ebounds::from_edges(&[1.0, 2.0, 3.0]).unwrap());

        let phaii = tte.to_phaii(bin_by_time, 1.0).unwrap();
        assert_eq!(phaii.num_times(), 3);
        // last bin is [2.0, 3.0] although the final event is at 2.5
        let exposure = &phaii.data().exposure;
        assert_relative_eq!(exposure[(2, 0)], 1.0);
        let total: f64 = (0..3).map(|t| exposure[(t, 0)]).sum();
        let pha = tte.to_pha().unwrap();
        assert_relative_eq!(pha.exposure()[0], 2.5);
        assert!(total > pha.exposure()[0]);
    }

    #[test]
    fn test_to_phaii_custom_binner() {
        let tte = create_test_stream();
        let halves = |times: &[f64], _dt: f64| -> Result<Vec<f64>> {
            let (t0, t1) = (times[0], times[times.len() - 1]);
            Ok(vec![t0, 0.5 * (t0 + t1), t1])
        };
        let phaii = tte.to_phaii(halves, 1.0).unwrap();
        assert_eq!(phaii.num_times(), 2);
        assert_eq!(phaii.data().total_counts(), 1000);
    }
}
