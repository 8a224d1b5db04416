use crate::config::Config;
use serde::Deserialize;

/// Past this many fraction digits a small number switches to scientific
/// notation.
const MAX_SMALL_DECIMALS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "es-ES")]
    EsEs,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    fn decimal_separator(self) -> char {
        match self {
            Self::EsEs => ',',
            Self::EnUs => '.',
        }
    }

    fn group_separator(self) -> char {
        match self {
            Self::EsEs => '.',
            Self::EnUs => ',',
        }
    }

    /// Shortest integer part that gets grouped. Spanish leaves four-digit
    /// numbers ungrouped.
    fn min_grouped_len(self) -> usize {
        match self {
            Self::EsEs => 5,
            Self::EnUs => 4,
        }
    }

    /// Labels for 1e12, 1e9 and 1e6.
    fn scale_labels(self) -> [&'static str; 3] {
        match self {
            Self::EsEs => ["billones", "mil millones", "millones"],
            Self::EnUs => ["trillion", "billion", "million"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    pub locale: Locale,
    pub decimals: usize,
    pub small_number_threshold: f64,
    pub scientific_notation_threshold: f64,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            locale: Locale::EsEs,
            decimals: 2,
            small_number_threshold: 0.01,
            scientific_notation_threshold: 0.000_000_1,
        }
    }
}

impl Formatter {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            locale: cfg.locale,
            decimals: cfg.default_decimals,
            small_number_threshold: cfg.small_number_threshold,
            scientific_notation_threshold: cfg.scientific_notation_threshold,
        }
    }

    pub fn number(&self, num: f64) -> String {
        self.number_with(num, self.decimals)
    }

    /// Locale-aware number with `decimals` fraction digits. Positive values
    /// below the small-number threshold keep three significant digits after
    /// their leading zeros instead.
    pub fn number_with(&self, num: f64, decimals: usize) -> String {
        if !num.is_finite() {
            return "N/A".to_string();
        }

        if num > 0.0 && num < self.small_number_threshold {
            let significant = leading_fraction_zeros(num) + 3;
            if significant > MAX_SMALL_DECIMALS {
                return format!("{:.2e}", num);
            }
            return self.grouped(num, significant);
        }

        if num != 0.0 && num.abs() < self.scientific_notation_threshold {
            return format!("{:.2e}", num);
        }

        self.grouped(num, decimals)
    }

    /// Market cap scaled to trillions, billions or millions.
    pub fn market_cap(&self, value: f64) -> String {
        if !value.is_finite() {
            return "N/A".to_string();
        }
        let [t, b, m] = self.locale.scale_labels();
        for (scale, label) in [(1e12, t), (1e9, b), (1e6, m)] {
            if value >= scale {
                return format!("${} {}", self.grouped(value / scale, 2), label);
            }
        }
        format!("${}", self.number(value))
    }

    pub fn multiplier(&self, value: f64) -> String {
        format!("{}x", self.number(value))
    }

    fn grouped(&self, num: f64, decimals: usize) -> String {
        let digits = format!("{:.*}", decimals, num.abs());
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (digits.as_str(), None),
        };

        let mut out = String::new();
        if num < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }
        out.push_str(&self.group_thousands(int_part));
        if let Some(frac) = frac_part {
            out.push(self.locale.decimal_separator());
            out.push_str(frac);
        }
        out
    }

    fn group_thousands(&self, int_part: &str) -> String {
        if int_part.len() < self.locale.min_grouped_len() {
            return int_part.to_string();
        }
        let sep = self.locale.group_separator();
        let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                out.push(sep);
            }
            out.push(ch);
        }
        out
    }
}

/// Zeros between the decimal point and the first significant digit.
fn leading_fraction_zeros(num: f64) -> usize {
    let fixed = format!("{:.20}", num.abs());
    fixed
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|&c| c == '0').count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> Formatter {
        Formatter {
            locale: Locale::EnUs,
            ..Formatter::default()
        }
    }

    #[test]
    fn groups_thousands_per_locale() {
        let es = Formatter::default();
        assert_eq!(es.number(1234567.891), "1.234.567,89");
        assert_eq!(es.number(1234.0), "1234,00");
        assert_eq!(es.number(12345.0), "12.345,00");
        assert_eq!(es.number(-12345.5), "-12.345,50");
        assert_eq!(es.number(0.0), "0,00");
        assert_eq!(es.number_with(19_600_000.0, 0), "19.600.000");

        assert_eq!(en().number(1234.0), "1,234.00");
        assert_eq!(en().number(999.5), "999.50");
    }

    #[test]
    fn small_prices_keep_significant_digits() {
        let fmt = Formatter::default();
        assert_eq!(fmt.number(0.000015), "0,0000150");
        assert_eq!(fmt.number(0.0012), "0,00120");
        assert_eq!(fmt.number(0.0001219), "0,000122");
        assert_eq!(fmt.number(0.05), "0,05");
    }

    #[test]
    fn tiny_values_switch_to_scientific() {
        let fmt = Formatter::default();
        assert_eq!(fmt.number(1.5e-7), "1.50e-7");
        assert_eq!(fmt.number(2.0e-9), "2.00e-9");
        assert_eq!(fmt.number(-3.0e-8), "-3.00e-8");
    }

    #[test]
    fn non_finite_is_not_available() {
        assert_eq!(Formatter::default().number(f64::NAN), "N/A");
        assert_eq!(Formatter::default().market_cap(f64::INFINITY), "N/A");
    }

    #[test]
    fn market_cap_scales() {
        let es = Formatter::default();
        assert_eq!(es.market_cap(1.28e12), "$1,28 billones");
        assert_eq!(es.market_cap(4.2e11), "$420,00 mil millones");
        assert_eq!(es.market_cap(5.51e6), "$5,51 millones");
        assert_eq!(es.market_cap(950_000.0), "$950.000,00");

        assert_eq!(en().market_cap(1.28e12), "$1.28 trillion");
        assert_eq!(en().market_cap(2.5e9), "$2.50 billion");
    }

    #[test]
    fn multiplier_has_suffix() {
        assert_eq!(Formatter::default().multiplier(2.0), "2,00x");
        assert_eq!(en().multiplier(1500.0), "1,500.00x");
    }
}
