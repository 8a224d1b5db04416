use crate::types::Asset;

const IMAGE_BASE: &str = "https://assets.coingecko.com/coins/images";

// id, symbol, name, price, market cap, circulating supply, image path
#[rustfmt::skip]
const BUILT_IN: &[(&str, &str, &str, f64, f64, f64, &str)] = &[
    ("bitcoin", "btc", "Bitcoin", 65000.0, 1_280_000_000_000.0, 19_600_000.0, "1/large/bitcoin.png"),
    ("ethereum", "eth", "Ethereum", 3500.0, 420_000_000_000.0, 120_000_000.0, "279/large/ethereum.png"),
    ("tether", "usdt", "Tether", 1.0, 92_000_000_000.0, 92_000_000_000.0, "325/large/Tether.png"),
    ("binancecoin", "bnb", "BNB", 580.0, 85_000_000_000.0, 146_000_000.0, "825/large/bnb-icon2_2x.png"),
    ("solana", "sol", "Solana", 150.0, 65_000_000_000.0, 430_000_000.0, "4128/large/solana.png"),
    ("xrp", "xrp", "XRP", 0.55, 31_000_000_000.0, 56_000_000_000.0, "44/large/xrp-symbol-white-128.png"),
    ("cardano", "ada", "Cardano", 0.45, 15_800_000_000.0, 35_200_000_000.0, "975/large/cardano.png"),
    ("dogecoin", "doge", "Dogecoin", 0.12, 15_600_000_000.0, 130_000_000_000.0, "5/large/dogecoin.png"),
    ("avalanche", "avax", "Avalanche", 30.0, 11_000_000_000.0, 367_000_000.0, "12559/large/Avalanche_Circle_RedWhite_Trans.png"),
    ("polkadot", "dot", "Polkadot", 7.2, 10_500_000_000.0, 1_460_000_000.0, "12171/large/polkadot.png"),
    ("shiba-inu", "shib", "Shiba Inu", 0.000015, 8_700_000_000.0, 589_390_000_000_000.0, "11939/large/shiba.png"),
    ("polygon", "matic", "Polygon", 0.65, 6_500_000_000.0, 10_000_000_000.0, "4713/large/matic-token-icon.png"),
    ("pancakeswap", "cake", "PancakeSwap", 2.5, 750_000_000.0, 300_000_000.0, "12632/large/pancakeswap-cake-logo.png"),
    ("pax-gold", "paxg", "PAX Gold", 2300.0, 460_000_000.0, 200_000.0, "9519/large/paxg.png"),
    ("perpetual-protocol", "perp", "Perpetual Protocol", 0.85, 127_500_000.0, 150_000_000.0, "12381/large/perp.png"),
    ("parsiq", "prq", "PARSIQ", 0.15, 30_000_000.0, 200_000_000.0, "11973/large/parsiq.png"),
    ("pi-network", "pi", "Pi Network", 0.0012, 5_510_000.0, 4_591_666_666.0, "24949/large/pi-network.png"),
    ("the-balkan-dwarf", "kekec", "The Balkan Dwarf", 0.0001219, 4_760_000.0, 39_000_000_000.0, "30615/large/kekec.png"),
];

/// Built-in asset list served when every network tier fails.
pub fn static_assets() -> Vec<Asset> {
    BUILT_IN
        .iter()
        .map(|&(id, symbol, name, price, market_cap, supply, image)| Asset {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            current_price: price,
            market_cap,
            circulating_supply: supply,
            image: Some(format!("{}/{}", IMAGE_BASE, image)),
            last_updated: None,
        })
        .collect()
}

/// Case-insensitive substring match on name or symbol.
pub fn filter_assets(assets: &[Asset], query: &str) -> Vec<Asset> {
    let needle = query.trim().to_lowercase();
    assets
        .iter()
        .filter(|a| {
            a.name.to_lowercase().contains(&needle) || a.symbol.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

pub fn find_asset(assets: &[Asset], id: &str) -> Option<Asset> {
    assets.iter().find(|a| a.id == id).cloned()
}
