use crate::error::ValidationError;
use crate::format::{Formatter, Locale};
use crate::types::{Asset, DifficultyTier, ProjectionResult, CUSTOM_ASSET_ID};

/// Market cap and multiplier needed for `asset` to trade at `target_price`.
///
/// The multiplier is not clamped: below 1 means the target is already met.
/// `asset.market_cap` must be positive; every constructor of `Asset` in this
/// crate guarantees that.
pub fn calculate_projection(asset: &Asset, target_price: f64) -> ProjectionResult {
    let target_market_cap = asset.circulating_supply * target_price;
    let multiplier = target_market_cap / asset.market_cap;

    ProjectionResult {
        asset: asset.clone(),
        target_price,
        current_price: asset.current_price,
        current_market_cap: asset.market_cap,
        target_market_cap,
        multiplier,
        supply: asset.circulating_supply,
    }
}

pub fn validate_target_price(raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        ValidationError::InvalidInput(format!("target price '{}' is not a valid number", raw.trim()))
    })?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidInput(format!(
            "target price '{}' is not a valid number",
            raw.trim()
        )));
    }
    if value <= 0.0 {
        return Err(ValidationError::InvalidInput(
            "target price must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

/// Build an asset from user-entered fields. Market cap is exactly
/// `price * supply`.
pub fn create_custom_asset(
    name: &str,
    symbol: &str,
    price: &str,
    supply: &str,
) -> Result<Asset, ValidationError> {
    let name = name.trim();
    let symbol = symbol.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if symbol.is_empty() {
        return Err(ValidationError::MissingField("symbol"));
    }

    let current_price = parse_positive("price", price)?;
    let circulating_supply = parse_positive("supply", supply)?;

    Ok(Asset {
        id: CUSTOM_ASSET_ID.to_string(),
        symbol: symbol.to_lowercase(),
        name: name.to_string(),
        current_price,
        market_cap: current_price * circulating_supply,
        circulating_supply,
        image: None,
        last_updated: None,
    })
}

pub fn evaluate_multiplier(multiplier: f64) -> DifficultyTier {
    if multiplier <= 1.0 {
        DifficultyTier::Achieved
    } else if multiplier <= 2.0 {
        DifficultyTier::Easy
    } else if multiplier <= 5.0 {
        DifficultyTier::Moderate
    } else if multiplier <= 10.0 {
        DifficultyTier::Challenging
    } else if multiplier <= 100.0 {
        DifficultyTier::VeryChallenging
    } else {
        DifficultyTier::Extreme
    }
}

impl ProjectionResult {
    pub fn difficulty(&self) -> DifficultyTier {
        evaluate_multiplier(self.multiplier)
    }

    /// Human-readable summary of what the target implies.
    pub fn interpretation(&self, fmt: &Formatter) -> String {
        let name = &self.asset.name;
        let ticker = self.asset.ticker();
        let target = fmt.number(self.target_price);
        let growth = fmt.multiplier(self.multiplier);
        let cap = fmt.market_cap(self.target_market_cap);
        let mut text = match fmt.locale {
            Locale::EsEs => format!(
                "Para que {} ({}) alcance un precio de ${}, su capitalización de mercado tendría que crecer {} hasta {}.",
                name, ticker, target, growth, cap
            ),
            Locale::EnUs => format!(
                "For {} ({}) to reach ${}, its market cap would have to grow {} up to {}.",
                name, ticker, target, growth, cap
            ),
        };
        if self.multiplier > 1.0 {
            text.push(' ');
            text.push_str(self.difficulty().message(fmt.locale));
        }
        text
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::InvalidNumber {
        field,
        value: raw.trim().to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(value)
}
