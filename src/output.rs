use crate::format::Formatter;
use crate::types::{Asset, ProjectionResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Write};

pub fn write_asset_table(
    out: &mut impl Write,
    assets: &[Asset],
    highlighted: Option<&str>,
    fmt: &Formatter,
) -> io::Result<()> {
    if assets.is_empty() {
        return writeln!(out, "No assets found.");
    }
    writeln!(
        out,
        "\n  {:<4} {:<22} {:<8} {:<22} {:>18} {}",
        "#", "ID", "Symbol", "Name", "Price (USD)", "Market cap"
    )?;
    writeln!(out, "{}", "-".repeat(100))?;
    for (i, a) in assets.iter().enumerate() {
        let marker = if highlighted == Some(a.id.as_str()) { '>' } else { ' ' };
        writeln!(
            out,
            "{} {:<4} {:<22} {:<8} {:<22} {:>18} {}",
            marker,
            i + 1,
            a.id,
            a.ticker(),
            a.name,
            format!("${}", fmt.number(a.current_price)),
            fmt.market_cap(a.market_cap),
        )?;
    }
    writeln!(out)
}

pub fn write_selection(out: &mut impl Write, asset: &Asset, fmt: &Formatter) -> io::Result<()> {
    if asset.is_custom() {
        writeln!(out, "Using custom data for: {}", asset.name)?;
    }
    writeln!(out, "Selected asset:      {} ({})", asset.name, asset.ticker())?;
    writeln!(out, "Current price:       ${}", fmt.number(asset.current_price))?;
    writeln!(out, "Current market cap:  {}", fmt.market_cap(asset.market_cap))?;
    writeln!(
        out,
        "Circulating supply:  {} {}",
        fmt.number_with(asset.circulating_supply, 0),
        asset.ticker()
    )?;
    if let Some(image) = &asset.image {
        writeln!(out, "Image:               {}", image)?;
    }
    if let Some(updated) = asset.last_updated {
        writeln!(out, "Last updated:        {}", updated.format("%Y-%m-%d %H:%M UTC"))?;
    }
    Ok(())
}

pub fn write_projection(
    out: &mut impl Write,
    result: &ProjectionResult,
    fmt: &Formatter,
) -> io::Result<()> {
    let ticker = result.asset.ticker();
    writeln!(out)?;
    writeln!(out, "{:<28} ${}", format!("Current {} price", ticker), fmt.number(result.current_price))?;
    writeln!(out, "{:<28} ${}", "Target price", fmt.number(result.target_price))?;
    writeln!(out, "{:<28} {}", "Current market cap", fmt.market_cap(result.current_market_cap))?;
    writeln!(out, "{:<28} {}", "Required market cap", fmt.market_cap(result.target_market_cap))?;
    writeln!(
        out,
        "{:<28} {} {}",
        "Circulating supply",
        fmt.number_with(result.supply, 0),
        ticker
    )?;
    writeln!(out, "{:<28} {}", "Required multiplier", fmt.multiplier(result.multiplier))?;
    writeln!(out, "{:<28} {}", "Difficulty", result.difficulty().as_str())?;
    writeln!(out)?;
    writeln!(out, "{}", result.interpretation(fmt))?;
    writeln!(out)
}

#[derive(Serialize)]
struct ProjectionReport<'a> {
    asset: &'a Asset,
    target_price: f64,
    current_price: f64,
    current_market_cap: f64,
    target_market_cap: f64,
    multiplier: f64,
    supply: f64,
    difficulty: &'static str,
}

pub fn write_projection_json(out: &mut impl Write, result: &ProjectionResult) -> Result<()> {
    write_json(
        out,
        &ProjectionReport {
            asset: &result.asset,
            target_price: result.target_price,
            current_price: result.current_price,
            current_market_cap: result.current_market_cap,
            target_market_cap: result.target_market_cap,
            multiplier: result.multiplier,
            supply: result.supply,
            difficulty: result.difficulty().as_str(),
        },
    )
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    writeln!(out, "{}", json).context("writing output")?;
    Ok(())
}
