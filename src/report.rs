//! Fixed-width text reports

use std::fmt::Write;

use crate::aggregation::VwapStore;

/// Render one line per configured instrument, in configured order.
///
/// Each line is `<instrument>\t<vwap>` with the VWAP at six decimals,
/// zero-padded to ten characters. With `with_counts` the line also carries
/// `\tpoints:\t<n>`.
pub fn render<S: VwapStore + ?Sized>(store: &S, with_counts: bool) -> String {
    let mut out = String::new();
    for instrument in store.instruments() {
        let vwap = store.vwap(instrument).unwrap_or(0.0);
        let points = with_counts.then(|| store.points(instrument).unwrap_or(0));
        out.push_str(&format_line(instrument, vwap, points));
    }
    out
}

/// Format a single report line, newline included.
pub fn format_line(instrument: &str, vwap: f64, points: Option<usize>) -> String {
    let mut line = format!("{}\t{:010.6}", instrument, vwap);
    if let Some(n) = points {
        // Writing into a String cannot fail
        let _ = write!(line, "\tpoints:\t{}", n);
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_ten_characters() {
        assert_eq!(format_line("ETH-BTC", 0.0466910, None), "ETH-BTC\t000.046691\n");
        assert_eq!(format_line("BTC-USD", 0.0, None), "BTC-USD\t000.000000\n");
        assert_eq!(format_line("ETH-USD", 3149.35, None), "ETH-USD\t3149.350000\n");
    }

    #[test]
    fn appends_point_count() {
        assert_eq!(
            format_line("BTC-USD", 12.5, Some(3)),
            "BTC-USD\t012.500000\tpoints:\t3\n"
        );
    }
}
