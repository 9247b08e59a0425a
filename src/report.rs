use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use thiserror::Error;
use tracing::info;

use crate::model::PredictionRecord;

const PLACEHOLDER: &str = "--";
const RULE: &str = "==============================================";
const FOOTER_RULE: &str = "----------------------------------------------";
const FOOTER: &str = "Generated by GreenGrid, the rural microgrid dashboard";

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("cannot build report: missing {0}")]
    MissingField(&'static str),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BalanceStatus {
    Surplus,
    Deficit,
}

impl BalanceStatus {
    pub(crate) fn label(self) -> &'static str {
        match self {
            BalanceStatus::Surplus => "SURPLUS",
            BalanceStatus::Deficit => "DEFICIT",
        }
    }
}

/// Derived balance metrics for the latest record.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BalanceSummary {
    pub(crate) total_renewable: f64,
    pub(crate) coverage_pct: f64,
    pub(crate) efficiency_pct: f64,
    pub(crate) net_balance: f64,
    pub(crate) status: BalanceStatus,
}

impl BalanceSummary {
    pub(crate) fn derive(
        load: f64,
        solar: f64,
        wind: f64,
        solar_used: f64,
        wind_used: f64,
    ) -> Self {
        let total_renewable = solar + wind;
        // Both ratios report 0.0 instead of dividing by zero.
        let coverage_pct = if load > 0.0 && total_renewable > 0.0 {
            total_renewable / load * 100.0
        } else {
            0.0
        };
        let efficiency_pct = if load > 0.0 {
            (solar_used + wind_used) / load * 100.0
        } else {
            0.0
        };
        let net_balance = total_renewable - load;
        let status = if net_balance >= 0.0 {
            BalanceStatus::Surplus
        } else {
            BalanceStatus::Deficit
        };
        Self {
            total_renewable,
            coverage_pct,
            efficiency_pct,
            net_balance,
            status,
        }
    }
}

fn required(value: Option<f64>, name: &'static str) -> Result<f64, ReportError> {
    value.ok_or(ReportError::MissingField(name))
}

fn kv(out: &mut String, key: &str, value: String) {
    let _ = writeln!(out, "  {key:<22}{value}");
}

fn unit_or_placeholder(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1} {unit}"),
        None => format!("{PLACEHOLDER} {unit}"),
    }
}

/// Builds the full report document. Fails before producing anything if a
/// required numeric field is absent; missing weather data degrades to
/// placeholders instead.
pub(crate) fn assemble_report(
    record: &PredictionRecord,
    location: &str,
    now: DateTime<Local>,
) -> Result<String, ReportError> {
    let load = required(record.predicted_load, "predicted load")?;
    let solar = required(record.predicted_solar, "predicted solar")?;
    let wind = required(record.predicted_wind, "predicted wind")?;
    let solar_used = required(record.solar_used, "solar used")?;
    let wind_used = required(record.wind_used, "wind used")?;
    let grid_import = required(record.grid_import, "grid import")?;
    let grid_export = required(record.grid_export, "grid export")?;

    let summary = BalanceSummary::derive(load, solar, wind, solar_used, wind_used);

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "           ENERGY PREDICTION REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Location & Time");
    kv(&mut out, "Village/City:", location.to_string());
    kv(
        &mut out,
        "Report Generated:",
        now.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Weather Conditions");
    match record.weather.as_ref() {
        Some(w) => {
            kv(
                &mut out,
                "Temperature:",
                unit_or_placeholder(w.temperature, "°C"),
            );
            kv(
                &mut out,
                "Wind Speed:",
                unit_or_placeholder(w.wind_speed, "kph"),
            );
            kv(&mut out, "Humidity:", unit_or_placeholder(w.humidity, "%"));
            kv(
                &mut out,
                "Cloud Cover:",
                unit_or_placeholder(w.cloud_cover, "%"),
            );
        }
        None => {
            let _ = writeln!(out, "  Weather data not available");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Energy Predictions");
    kv(&mut out, "Predicted Demand:", format!("{load:.2} kW"));
    kv(&mut out, "Solar Generation:", format!("{solar:.2} kW"));
    kv(&mut out, "Wind Generation:", format!("{wind:.2} kW"));
    kv(
        &mut out,
        "Total Renewable:",
        format!("{:.2} kW", summary.total_renewable),
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Power Distribution");
    kv(&mut out, "Solar Used:", format!("{solar_used:.2} kW"));
    kv(&mut out, "Wind Used:", format!("{wind_used:.2} kW"));
    kv(&mut out, "Grid Import:", format!("{grid_import:.2} kW"));
    kv(&mut out, "Grid Export:", format!("{grid_export:.2} kW"));
    let _ = writeln!(out);

    let _ = writeln!(out, "Energy Balance Summary");
    kv(
        &mut out,
        "Renewable Coverage:",
        format!("{:.1} %", summary.coverage_pct),
    );
    kv(
        &mut out,
        "System Efficiency:",
        format!("{:.1} %", summary.efficiency_pct),
    );
    kv(
        &mut out,
        "Net Balance:",
        format!(
            "{:.2} kW {}",
            summary.net_balance.abs(),
            summary.status.label()
        ),
    );
    let _ = writeln!(out);

    match summary.status {
        BalanceStatus::Surplus => {
            let _ = writeln!(out, "  [OK] Renewable energy is SUFFICIENT");
            let _ = writeln!(
                out,
                "       Excess {:.2} kW can be exported to the grid",
                summary.net_balance
            );
        }
        BalanceStatus::Deficit => {
            let _ = writeln!(out, "  [!!] Renewable energy is INSUFFICIENT");
            let _ = writeln!(
                out,
                "       Additional {:.2} kW required from the grid",
                summary.net_balance.abs()
            );
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{FOOTER_RULE}");
    let _ = writeln!(out, "{FOOTER}");
    let _ = writeln!(out, "Page 1 of 1");

    Ok(out)
}

/// `Energy_Report_<location>_<date>.txt` with non-alphanumeric runs in the
/// location collapsed to single underscores.
pub(crate) fn report_file_name(location: &str, date: NaiveDate) -> String {
    let mut slug = String::new();
    let mut last_underscore = false;
    for ch in location.chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_underscore = false;
        } else if !last_underscore {
            slug.push('_');
            last_underscore = true;
        }
    }
    let slug = slug.trim_matches('_');
    format!("Energy_Report_{}_{}.txt", slug, date.format("%Y-%m-%d"))
}

/// Assembles first, writes once: a report that fails validation leaves no
/// partial file behind.
pub(crate) fn save_report(
    dir: &Path,
    record: &PredictionRecord,
    location: &str,
    now: DateTime<Local>,
) -> Result<PathBuf, ReportError> {
    let document = assemble_report(record, location, now)?;
    let path = dir.join(report_file_name(location, now.date_naive()));
    fs::write(&path, document)?;
    info!(path = %path.display(), "report exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeatherSnapshot;
    use chrono::TimeZone;

    fn record() -> PredictionRecord {
        PredictionRecord {
            predicted_load: Some(120.0),
            predicted_solar: Some(80.0),
            predicted_wind: Some(48.0),
            solar_used: Some(80.0),
            wind_used: Some(40.0),
            grid_import: Some(0.0),
            grid_export: Some(8.0),
            battery_soc_percent: None,
            weather: Some(WeatherSnapshot {
                temperature: Some(24.0),
                wind_speed: Some(12.0),
                humidity: Some(40.0),
                pressure: None,
                solar_radiance: Some(600.0),
                cloud_cover: None,
            }),
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn zero_load_and_zero_renewables_report_zero_ratios() {
        let s = BalanceSummary::derive(0.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(s.coverage_pct, 0.0);
        assert_eq!(s.efficiency_pct, 0.0);
    }

    #[test]
    fn surplus_when_renewables_cover_the_load() {
        let s = BalanceSummary::derive(10.0, 7.0, 5.0, 7.0, 3.0);
        assert_eq!(s.total_renewable, 12.0);
        assert_eq!(s.net_balance, 2.0);
        assert_eq!(s.status, BalanceStatus::Surplus);
        assert_eq!(s.status.label(), "SURPLUS");
    }

    #[test]
    fn deficit_when_renewables_fall_short() {
        let s = BalanceSummary::derive(100.0, 30.0, 20.0, 30.0, 20.0);
        assert_eq!(s.net_balance, -50.0);
        assert_eq!(s.status, BalanceStatus::Deficit);
        assert!((s.coverage_pct - 50.0).abs() < 1e-9);
        assert!((s.efficiency_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn file_name_collapses_non_alphanumeric_runs() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(
            report_file_name("Kishtwar, Jammu & Kashmir", date),
            "Energy_Report_Kishtwar_Jammu_Kashmir_2026-08-06.txt"
        );
        assert_eq!(
            report_file_name("Leh", date),
            "Energy_Report_Leh_2026-08-06.txt"
        );
    }

    #[test]
    fn sections_appear_in_order() {
        let doc = assemble_report(&record(), "Kishtwar", noon()).unwrap();
        let sections = [
            "ENERGY PREDICTION REPORT",
            "Location & Time",
            "Weather Conditions",
            "Energy Predictions",
            "Power Distribution",
            "Energy Balance Summary",
            "Page 1 of 1",
        ];
        let mut pos = 0;
        for s in sections {
            let found = doc[pos..].find(s).unwrap_or_else(|| panic!("missing {s}"));
            pos += found + s.len();
        }
        assert!(doc.contains("Village/City:         Kishtwar"));
        assert!(doc.contains("Total Renewable:      128.00 kW"));
        assert!(doc.contains("8.00 kW SURPLUS"));
        assert!(doc.contains("[OK] Renewable energy is SUFFICIENT"));
    }

    #[test]
    fn missing_weather_fields_become_placeholders() {
        let doc = assemble_report(&record(), "Kishtwar", noon()).unwrap();
        // cloud_cover is absent in the fixture.
        assert!(doc.contains("Cloud Cover:          -- %"));

        let mut bare = record();
        bare.weather = None;
        let doc = assemble_report(&bare, "Kishtwar", noon()).unwrap();
        assert!(doc.contains("Weather data not available"));
    }

    #[test]
    fn missing_numeric_field_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut incomplete = record();
        incomplete.grid_export = None;

        let err = save_report(dir.path(), &incomplete, "Kishtwar", noon()).unwrap_err();
        assert!(matches!(err, ReportError::MissingField("grid export")));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn save_writes_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_report(dir.path(), &record(), "Kishtwar", noon()).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("Energy_Report_Kishtwar_2026-08-06.txt")
        );
        let body = fs::read_to_string(path).unwrap();
        assert!(body.contains("Predicted Demand:     120.00 kW"));
    }
}
