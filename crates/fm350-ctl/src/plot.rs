//! Terminal signal graph for `--graph`.

use std::io::{self, Read, Write};

use chrono::{DateTime, Local};
use fm350_modem::modem::signal::Signal;
use fm350_modem::telemetry::{SignalHistory, SignalMonitor};
use fm350_modem::Modem;

pub const LOWER_DBM: f64 = -158.0;
pub const UPPER_DBM: f64 = -28.0;
pub const HEIGHT: usize = 20;
pub const WIDTH: usize = 80;

/// Clear the screen and home the cursor.
const CLEAR: &str = "\x1b[2J\x1b[1;1H";

/// Redraw the graph after every sample until interrupted.
pub fn run<T: Read + Write>(modem: &mut Modem<T>) -> anyhow::Result<()> {
    let stdout = io::stdout();
    SignalMonitor::new().run(modem, |signal, history| -> anyhow::Result<()> {
        let mut out = stdout.lock();
        write!(out, "{CLEAR}")?;
        writeln!(out, "{}", header(signal, Local::now()))?;
        writeln!(out, "{}", render(history))?;
        out.flush()?;
        Ok(())
    })
}

pub fn header(signal: &Signal, now: DateTime<Local>) -> String {
    format!(
        "Current Time: {} | p:{} dBm | q:{:.1} dB | n:{:.1} dB",
        now.to_rfc2822(),
        signal.rsrp_dbm,
        signal.rsrq_db,
        signal.sinr_db
    )
}

fn row_of(dbm: f64) -> usize {
    let scaled = (dbm - LOWER_DBM) / (UPPER_DBM - LOWER_DBM) * HEIGHT as f64;
    scaled.round().clamp(0.0, HEIGHT as f64) as usize
}

/// ASCII line plot of `history`, stretched to [`WIDTH`] columns and
/// [`HEIGHT`]` + 1` rows, top row first.
pub fn render(history: &SignalHistory) -> String {
    let samples: Vec<f64> = history.iter().map(f64::from).collect();
    if samples.is_empty() {
        return String::new();
    }

    let mut grid = vec![vec![' '; WIDTH]; HEIGHT + 1];
    let mut prev: Option<usize> = None;
    for col in 0..WIDTH {
        let row = row_of(samples[col * samples.len() / WIDTH]);
        if let Some(p) = prev {
            for r in p.min(row)..=p.max(row) {
                grid[r][col] = '|';
            }
        }
        grid[row][col] = '*';
        prev = Some(row);
    }

    let step = (UPPER_DBM - LOWER_DBM) / HEIGHT as f64;
    grid.iter()
        .enumerate()
        .rev()
        .map(|(r, line)| {
            let label = LOWER_DBM + r as f64 * step;
            format!("{label:>7.1} +{}", line.iter().collect::<String>().trim_end())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(samples: &[i32]) -> SignalHistory {
        let mut h = SignalHistory::default();
        for &s in samples {
            h.push(s);
        }
        h
    }

    #[test]
    fn empty_history_renders_nothing() {
        assert_eq!(render(&SignalHistory::default()), "");
    }

    #[test]
    fn plot_has_fixed_height() {
        let plot = render(&history(&[-95, -90, -100]));
        assert_eq!(plot.lines().count(), HEIGHT + 1);
        assert!(plot.lines().next().unwrap().starts_with("  -28.0 +"));
        assert!(plot.lines().last().unwrap().starts_with(" -158.0 +"));
    }

    #[test]
    fn bounds_map_to_edge_rows() {
        let top = render(&history(&[-28]));
        assert!(top.lines().next().unwrap().contains('*'));
        let bottom = render(&history(&[-200]));
        assert!(bottom.lines().last().unwrap().contains('*'));
        assert!(!bottom.lines().next().unwrap().contains('*'));
    }

    #[test]
    fn header_fields() {
        let signal = Signal {
            rsrq_db: -10.5,
            rsrp_dbm: -95,
            sinr_db: 12.0,
        };
        let h = header(&signal, Local::now());
        assert!(h.starts_with("Current Time: "));
        assert!(h.ends_with("| p:-95 dBm | q:-10.5 dB | n:12.0 dB"));
    }
}
