use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;
use voucher_db::models::NewVoucher;

use crate::state::AppState;

/// Reads a voucher definition from TOML or JSON, picked by file extension.
/// Timestamps are RFC 3339 strings in both formats.
pub fn read_voucher_file(path: &Path) -> Result<NewVoucher> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents).context("Invalid voucher JSON")
    } else {
        toml::from_str(&contents).context("Invalid voucher TOML")
    }
}

pub async fn create_voucher(state: &AppState, path: &Path) -> Result<()> {
    let new = read_voucher_file(path)?;
    let (voucher, codes) = state
        .vouchers
        .create_voucher(new)
        .await
        .context("Failed to create voucher")?;

    println!("Voucher {} created.", voucher.id);
    println!("  Window: {} .. {}", voucher.valid_from, voucher.expires_at);
    match voucher.max_redemptions {
        Some(max) => println!("  Capacity: {} ({} per customer)", max, voucher.max_redemptions_per_user),
        None => println!("  Capacity: unlimited ({} per customer)", voucher.max_redemptions_per_user),
    }
    for code in codes {
        println!("  {:<7} {}", code.code_type.as_str(), code.code);
    }
    Ok(())
}

pub async fn publish_voucher(state: &AppState, id: Uuid) -> Result<()> {
    let voucher = state
        .vouchers
        .publish_voucher(id)
        .await
        .context("Failed to publish voucher")?;
    println!(
        "Voucher {} is {} (valid from {}).",
        voucher.id,
        voucher.status(state.clock.now()).as_str(),
        voucher.valid_from
    );
    Ok(())
}

pub async fn voucher_stats(state: &AppState, id: Uuid) -> Result<()> {
    let stats = state
        .vouchers
        .stats(id)
        .await
        .context("Failed to load voucher stats")?;
    println!("\n=== VOUCHER {} ===", stats.voucher_id);
    println!("Status:       {}", stats.status);
    println!("Redemptions:  {}", stats.current_redemptions);
    println!("Rows:         {}", stats.redemption_rows);
    match stats.remaining_redemptions {
        Some(left) => println!("Remaining:    {}", left),
        None => println!("Remaining:    unlimited"),
    }
    println!("Scans:        {}", stats.scans);
    println!("Active codes: {}", stats.active_codes);
    println!("==========================================\n");
    Ok(())
}

pub async fn set_code_active(state: &AppState, code_id: Uuid, active: bool) -> Result<()> {
    let code = state
        .vouchers
        .set_code_active(code_id, active)
        .await
        .context("Failed to update code")?;
    let verb = if code.is_active { "activated" } else { "deactivated" };
    println!("Code {} ({}) {}.", code.code, code.code_type, verb);
    Ok(())
}
