use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::*,
};

use crate::app::AppState;
use crate::model::{fmt_opt, GridStatus, View, HISTORY_CAP};

pub(crate) fn draw(f: &mut Frame, st: &AppState) {
    let mono = st.mono;
    let area = f.size();

    let status = match (&st.target, st.polling) {
        (Some(loc), true) => format!("{loc} (auto-refresh on)"),
        (Some(loc), false) => format!("{loc} (auto-refresh off)"),
        (None, _) => "no location set".to_string(),
    };

    let outer = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(vec![
            Span::styled(" greengrid ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::styled(
                status,
                Style::default().fg(if mono { Color::White } else { Color::Cyan }),
            ),
        ]))
        .border_style(Style::default().fg(if mono { Color::Gray } else { Color::DarkGray }));
    f.render_widget(outer, area);

    let inner = area.inner(Margin {
        horizontal: 1,
        vertical: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(inner);

    render_tabs(f, rows[0], st);
    match st.view {
        View::Input => render_input(f, rows[1], st),
        View::Predictions => render_predictions(f, rows[1], st),
        View::Statistics => render_statistics(f, rows[1], st),
    }
    render_footer(f, rows[2], st);
}

fn render_tabs(f: &mut Frame, area: Rect, st: &AppState) {
    let titles: Vec<Line> = View::all()
        .iter()
        .map(|v| Line::from(Span::raw(v.title())))
        .collect();

    let idx = View::all()
        .iter()
        .position(|v| *v == st.view)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(idx)
        .block(Block::default().borders(Borders::ALL).title("View"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .divider(" | ");
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame, area: Rect, st: &AppState) {
    let mut spans = vec![
        Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" predict  "),
        Span::styled("←/→", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" views  "),
        Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" refresh  "),
        Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" stop poll  "),
        Span::styled("e", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" report  "),
        Span::styled("c", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" clear  "),
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit"),
    ];

    if let Some(e) = &st.error {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("ERR: {e}"),
            Style::default().fg(if st.mono { Color::White } else { Color::Red }),
        ));
    } else if let Some(n) = &st.notice {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            n.clone(),
            Style::default().fg(if st.mono { Color::White } else { Color::Green }),
        ));
    }

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(p, area);
}

/* ----------------------------
   Input view
---------------------------- */

fn render_input(f: &mut Frame, area: Rect, st: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let mut entry = st.input.clone();
    entry.push('_');
    let title = if st.busy {
        "Location (processing…)"
    } else {
        "Location (Enter to predict)"
    };
    f.render_widget(
        Paragraph::new(entry).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new("Enter a village or city name to generate energy predictions.")
            .style(Style::default().fg(if st.mono { Color::White } else { Color::Gray })),
        chunks[1],
    );

    render_weather_panel(f, chunks[2], st, "Live Weather", true);
}

fn render_weather_panel(f: &mut Frame, area: Rect, st: &AppState, title: &str, wide: bool) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let weather = st.record.as_ref().and_then(|r| r.weather.as_ref());

    let Some(w) = weather else {
        f.render_widget(
            Paragraph::new("No weather yet. Run a prediction to fetch a live snapshot.")
                .style(Style::default().fg(if st.mono { Color::White } else { Color::Yellow }))
                .block(block),
            area,
        );
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut cells: Vec<(&str, String)> = vec![
        ("Temperature", fmt_opt(w.temperature, "°C")),
        ("Wind Speed", fmt_opt(w.wind_speed, "kph")),
        ("Humidity", fmt_opt(w.humidity, "%")),
    ];
    if wide {
        cells.push(("Pressure", fmt_opt(w.pressure, "hPa")));
        cells.push(("Solar Irradiance", fmt_opt(w.solar_radiance, "W/m²")));
    } else {
        cells.push(("Cloud Cover", fmt_opt(w.cloud_cover, "%")));
    }

    let pct = (100 / cells.len()) as u16;
    let constraints: Vec<Constraint> = cells.iter().map(|_| Constraint::Percentage(pct)).collect();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner);

    for (i, (label, value)) in cells.iter().enumerate() {
        f.render_widget(
            Paragraph::new(value.clone())
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(*label)),
            cols[i],
        );
    }
}

/* ----------------------------
   Predictions view
---------------------------- */

fn render_predictions(f: &mut Frame, area: Rect, st: &AppState) {
    let mono = st.mono;
    let Some(record) = st.record.as_ref() else {
        f.render_widget(
            Paragraph::new("No prediction loaded yet. Submit a location on the Input view.")
                .style(Style::default().fg(if mono { Color::White } else { Color::Yellow }))
                .block(Block::default().borders(Borders::ALL).title("Model Predictions")),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(chunks[0]);

    metric_card(
        f,
        cols[0],
        "Demand",
        fmt_opt(record.predicted_load, "kW"),
        "Predicted Load",
        if mono { Color::White } else { Color::Yellow },
    );
    metric_card(
        f,
        cols[1],
        "Solar Output",
        fmt_opt(record.predicted_solar, "kW"),
        "Predicted Generation",
        if mono { Color::White } else { Color::LightRed },
    );
    metric_card(
        f,
        cols[2],
        "Wind Output",
        fmt_opt(record.predicted_wind, "kW"),
        "Predicted Generation",
        if mono { Color::White } else { Color::Blue },
    );

    render_history_chart(f, chunks[1], st);

    let rows = vec![
        Row::new(vec![
            Cell::from("Solar Used"),
            Cell::from(fmt_opt(record.solar_used, "kW")),
        ]),
        Row::new(vec![
            Cell::from("Wind Used"),
            Cell::from(fmt_opt(record.wind_used, "kW")),
        ]),
        Row::new(vec![
            Cell::from("Grid Import"),
            Cell::from(fmt_opt(record.grid_import, "kW")).style(
                Style::default().fg(if mono { Color::White } else { Color::Red }),
            ),
        ]),
        Row::new(vec![
            Cell::from("Grid Export"),
            Cell::from(fmt_opt(record.grid_export, "kW")).style(
                Style::default().fg(if mono { Color::White } else { Color::Green }),
            ),
        ]),
    ];
    let t = Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .header(
            Row::new(vec!["Allocation", "Power"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Energy Optimized Result"),
        )
        .column_spacing(1);
    f.render_widget(t, chunks[2]);

    let (text, color) = match record.grid_status() {
        GridStatus::Exporting(e) => (
            format!("Renewables sufficient: exporting {e:.1} kW to the grid."),
            Color::Green,
        ),
        GridStatus::Importing(i) => (
            format!("Grid support required: importing {i:.1} kW from the grid."),
            Color::Yellow,
        ),
        GridStatus::Balanced => ("Generation matches demand.".to_string(), Color::Cyan),
        GridStatus::Unknown => ("--".to_string(), Color::Gray),
    };
    f.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(if mono { Color::White } else { color }))
            .block(Block::default().borders(Borders::ALL).title("Status")),
        chunks[3],
    );
}

fn metric_card(f: &mut Frame, area: Rect, title: &str, value: String, caption: &str, color: Color) {
    let lines = vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            caption.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        ),
        area,
    );
}

fn render_history_chart(f: &mut Frame, area: Rect, st: &AppState) {
    let mono = st.mono;
    let samples = st.history.samples();
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Real-Time Monitoring ({} of {} samples)",
        st.history.len(),
        HISTORY_CAP
    ));

    if samples.is_empty() {
        f.render_widget(Paragraph::new("No samples yet.").block(block), area);
        return;
    }

    let demand: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.demand.map(|v| (i as f64, v)))
        .collect();
    let solar: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.solar.map(|v| (i as f64, v)))
        .collect();
    let wind: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.wind.map(|v| (i as f64, v)))
        .collect();

    let y_max = demand
        .iter()
        .chain(solar.iter())
        .chain(wind.iter())
        .map(|&(_, v)| v)
        .fold(0.0_f64, f64::max);
    let y_max = if y_max <= 0.0 { 1.0 } else { y_max * 1.2 };
    let x_max = samples.len().saturating_sub(1).max(1) as f64;

    let datasets = vec![
        Dataset::default()
            .name("Demand")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(if mono { Color::White } else { Color::Yellow }))
            .data(&demand),
        Dataset::default()
            .name("Solar")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(if mono { Color::Gray } else { Color::LightRed }))
            .data(&solar),
        Dataset::default()
            .name("Wind")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(if mono { Color::DarkGray } else { Color::Blue }))
            .data(&wind),
    ];

    let x_labels = vec![
        Span::raw(samples.first().map(|s| s.time.clone()).unwrap_or_default()),
        Span::raw(samples.last().map(|s| s.time.clone()).unwrap_or_default()),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(x_labels)
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .title("kW")
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{y_max:.0}")),
                ])
                .style(Style::default().fg(Color::DarkGray)),
        );

    f.render_widget(chart, area);
}

/* ----------------------------
   Statistics view
---------------------------- */

fn render_statistics(f: &mut Frame, area: Rect, st: &AppState) {
    let mono = st.mono;
    let Some(record) = st.record.as_ref() else {
        f.render_widget(
            Paragraph::new("No prediction loaded yet. Submit a location on the Input view.")
                .style(Style::default().fg(if mono { Color::White } else { Color::Yellow }))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Statistics Overview"),
                ),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(6),
        ])
        .split(area);

    render_weather_panel(f, chunks[0], st, "Weather Summary", false);

    let mut entries: Vec<(&str, u64)> = Vec::new();
    if let Some(v) = record.solar_used {
        if v > 0.0 {
            entries.push(("Solar", v.round() as u64));
        }
    }
    if let Some(v) = record.wind_used {
        if v > 0.0 {
            entries.push(("Wind", v.round() as u64));
        }
    }
    if let Some(v) = record.grid_import {
        if v > 0.0 {
            entries.push(("Grid", v.round() as u64));
        }
    }
    let total: f64 = [record.solar_used, record.wind_used, record.grid_import]
        .iter()
        .flatten()
        .filter(|v| **v > 0.0)
        .sum();

    let bars = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Energy Contribution (total {total:.1} kW)"
        )))
        .data(&entries)
        .bar_width(7)
        .bar_gap(2)
        .bar_style(Style::default().fg(if mono { Color::White } else { Color::Green }))
        .value_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(bars, chunks[1]);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(text) = record.insight() {
        lines.push(Line::from(text));
    }
    if let Some(soc) = record.battery_soc_percent {
        lines.push(Line::from(format!("Battery state of charge: {soc:.1}%")));
    }
    if let Some(at) = &st.last_fetch_at {
        lines.push(Line::from(format!("Last updated {at}")));
    }
    lines.push(Line::from(Span::styled(
        "Press e to export the report.",
        Style::default().fg(if mono { Color::White } else { Color::Gray }),
    )));
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Insights")),
        chunks[2],
    );
}
