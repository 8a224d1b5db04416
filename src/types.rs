use crate::format::Locale;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id reserved for assets the user typed in by hand.
pub const CUSTOM_ASSET_ID: &str = "custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub circulating_supply: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Asset {
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_ASSET_ID
    }

    pub fn ticker(&self) -> String {
        self.symbol.to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub asset: Asset,
    pub target_price: f64,
    pub current_price: f64,
    pub current_market_cap: f64,
    pub target_market_cap: f64,
    pub multiplier: f64,
    pub supply: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Achieved,
    Easy,
    Moderate,
    Challenging,
    VeryChallenging,
    Extreme,
}

impl DifficultyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Achieved => "achieved",
            Self::Easy => "easy",
            Self::Moderate => "moderate",
            Self::Challenging => "challenging",
            Self::VeryChallenging => "very_challenging",
            Self::Extreme => "extreme",
        }
    }

    /// Advice shown under a projection, in the formatter's locale.
    pub fn message(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::EsEs, Self::Achieved) => "Este precio ya ha sido alcanzado o superado.",
            (Locale::EsEs, Self::Easy) => {
                "Este objetivo parece razonablemente alcanzable en condiciones favorables del mercado."
            }
            (Locale::EsEs, Self::Moderate) => {
                "Este objetivo requiere un crecimiento notable pero está dentro de lo posible."
            }
            (Locale::EsEs, Self::Challenging) => {
                "Este objetivo representa un crecimiento considerable y podría ser difícil de alcanzar a corto plazo."
            }
            (Locale::EsEs, Self::VeryChallenging) => {
                "Este objetivo representa un crecimiento muy significativo y probablemente requeriría cambios fundamentales en la percepción del mercado."
            }
            (Locale::EsEs, Self::Extreme) => {
                "Este objetivo es extremadamente ambicioso y supondría un crecimiento sin precedentes para llegar a esta capitalización."
            }
            (Locale::EnUs, Self::Achieved) => "This price has already been reached or exceeded.",
            (Locale::EnUs, Self::Easy) => {
                "This target looks reasonably reachable under favorable market conditions."
            }
            (Locale::EnUs, Self::Moderate) => "This target needs notable growth but is within reach.",
            (Locale::EnUs, Self::Challenging) => {
                "This target represents considerable growth and could be hard to reach in the short term."
            }
            (Locale::EnUs, Self::VeryChallenging) => {
                "This target represents very significant growth and would likely need a fundamental shift in market perception."
            }
            (Locale::EnUs, Self::Extreme) => {
                "This target is extremely ambitious and would mean unprecedented growth to reach this market cap."
            }
        }
    }
}
