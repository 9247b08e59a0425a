use chrono::{DateTime, Local};
use serde::Deserialize;

/// The chart keeps a rolling window of the most recent samples.
pub(crate) const HISTORY_CAP: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum View {
    Input,
    Predictions,
    Statistics,
}

impl View {
    pub(crate) fn all() -> &'static [View] {
        &[View::Input, View::Predictions, View::Statistics]
    }

    pub(crate) fn title(self) -> &'static str {
        match self {
            View::Input => "Input",
            View::Predictions => "Predictions",
            View::Statistics => "Statistics",
        }
    }
}

/// Shape-independent representation of one prediction response.
///
/// Every field is optional on purpose: values absent from the source stay
/// `None` and render as a placeholder, never as zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PredictionRecord {
    pub(crate) predicted_load: Option<f64>,
    pub(crate) predicted_solar: Option<f64>,
    pub(crate) predicted_wind: Option<f64>,
    pub(crate) solar_used: Option<f64>,
    pub(crate) wind_used: Option<f64>,
    pub(crate) grid_import: Option<f64>,
    pub(crate) grid_export: Option<f64>,
    pub(crate) battery_soc_percent: Option<f64>,
    pub(crate) weather: Option<WeatherSnapshot>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub(crate) struct WeatherSnapshot {
    pub(crate) temperature: Option<f64>,
    pub(crate) wind_speed: Option<f64>,
    pub(crate) humidity: Option<f64>,
    pub(crate) pressure: Option<f64>,
    pub(crate) solar_radiance: Option<f64>,
    pub(crate) cloud_cover: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum GridStatus {
    Exporting(f64),
    Importing(f64),
    Balanced,
    Unknown,
}

impl PredictionRecord {
    pub(crate) fn grid_status(&self) -> GridStatus {
        match (self.grid_export, self.grid_import) {
            (Some(e), _) if e > 0.0 => GridStatus::Exporting(e),
            (_, Some(i)) if i > 0.0 => GridStatus::Importing(i),
            (Some(_), Some(_)) => GridStatus::Balanced,
            _ => GridStatus::Unknown,
        }
    }

    pub(crate) fn sample(&self, at: &DateTime<Local>) -> HistorySample {
        HistorySample {
            time: at.format("%I:%M %p").to_string(),
            demand: self.predicted_load,
            solar: self.predicted_solar,
            wind: self.predicted_wind,
        }
    }

    /// One-line reading of the current generation mix for the statistics
    /// view. Needs both generation figures to say anything.
    pub(crate) fn insight(&self) -> Option<String> {
        let solar = self.predicted_solar?;
        let wind = self.predicted_wind?;

        if solar > wind {
            Some(match self.weather.as_ref().and_then(|w| w.solar_radiance) {
                Some(irr) => format!(
                    "Solar generation is dominant. With an irradiance of {irr:.0} W/m² the arrays are performing well."
                ),
                None => "Solar generation is dominant.".to_string(),
            })
        } else if wind > 10.0 {
            Some(match self.weather.as_ref().and_then(|w| w.wind_speed) {
                Some(ws) => format!(
                    "Wind speeds of {ws:.0} kph are driving significant turbine output."
                ),
                None => "Wind is driving significant turbine output.".to_string(),
            })
        } else {
            Some(match self.grid_import {
                Some(gi) => format!(
                    "Low renewable generation. The system relies on the grid for {gi:.1} kW."
                ),
                None => "Low renewable generation.".to_string(),
            })
        }
    }
}

/// One timestamped point in the rolling chart series.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct HistorySample {
    pub(crate) time: String,
    pub(crate) demand: Option<f64>,
    pub(crate) solar: Option<f64>,
    pub(crate) wind: Option<f64>,
}

/// Bounded series of the most recent samples, oldest evicted first.
#[derive(Clone, Debug, Default)]
pub(crate) struct History {
    samples: Vec<HistorySample>,
}

impl History {
    pub(crate) fn push(&mut self, sample: HistorySample) {
        self.samples.push(sample);
        if self.samples.len() > HISTORY_CAP {
            let overflow = self.samples.len() - HISTORY_CAP;
            self.samples.drain(..overflow);
        }
    }

    /// Restart the series with a single fresh sample.
    pub(crate) fn reset(&mut self, sample: HistorySample) {
        self.samples.clear();
        self.samples.push(sample);
    }

    pub(crate) fn samples(&self) -> &[HistorySample] {
        &self.samples
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }
}

pub(crate) fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1} {unit}"),
        None => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(tag: &str) -> HistorySample {
        HistorySample {
            time: tag.to_string(),
            demand: Some(1.0),
            solar: Some(2.0),
            wind: Some(3.0),
        }
    }

    #[test]
    fn history_never_exceeds_cap() {
        let mut h = History::default();
        for i in 0..11 {
            h.push(sample(&format!("t{i}")));
        }
        assert_eq!(h.len(), HISTORY_CAP);
        // Oldest evicted first: t0 gone, t1..t10 remain in order.
        assert_eq!(h.samples()[0].time, "t1");
        assert_eq!(h.samples()[9].time, "t10");
    }

    #[test]
    fn history_reset_restarts_with_one_sample() {
        let mut h = History::default();
        for i in 0..5 {
            h.push(sample(&format!("t{i}")));
        }
        h.reset(sample("fresh"));
        assert_eq!(h.len(), 1);
        assert_eq!(h.samples()[0].time, "fresh");
    }

    #[test]
    fn sample_mirrors_record_fields() {
        let record = PredictionRecord {
            predicted_load: Some(120.0),
            predicted_solar: Some(80.0),
            predicted_wind: None,
            ..PredictionRecord::default()
        };
        let at = Local.with_ymd_and_hms(2026, 8, 6, 14, 30, 0).unwrap();
        let s = record.sample(&at);
        assert_eq!(s.time, "02:30 PM");
        assert_eq!(s.demand, Some(120.0));
        assert_eq!(s.solar, Some(80.0));
        assert_eq!(s.wind, None);
    }

    #[test]
    fn grid_status_prefers_export_then_import() {
        let mut record = PredictionRecord {
            grid_export: Some(2.5),
            grid_import: Some(0.0),
            ..PredictionRecord::default()
        };
        assert_eq!(record.grid_status(), GridStatus::Exporting(2.5));

        record.grid_export = Some(0.0);
        record.grid_import = Some(4.0);
        assert_eq!(record.grid_status(), GridStatus::Importing(4.0));

        record.grid_import = Some(0.0);
        assert_eq!(record.grid_status(), GridStatus::Balanced);

        record.grid_export = None;
        record.grid_import = None;
        assert_eq!(record.grid_status(), GridStatus::Unknown);
    }

    #[test]
    fn missing_values_render_as_placeholder() {
        assert_eq!(fmt_opt(None, "kW"), "--");
        assert_eq!(fmt_opt(Some(12.34), "kW"), "12.3 kW");
    }
}
