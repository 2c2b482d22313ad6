use crate::card_client::{CardClient, net_type_name};
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;

/// Single-shot card queries rendered for a terminal
pub struct CardInfoService;

impl CardInfoService {
    pub async fn print_scan<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        debug!("print_scan()");
        let networks = client
            .scan_networks()
            .await
            .context("failed to scan for networks")?;

        if networks.is_empty() {
            writeln!(out, "unable to detect any wireless networks")?;
            return Ok(());
        }

        writeln!(out, "Scanned wireless networks:")?;
        for net in networks {
            writeln!(
                out,
                "'{}' type({}): {}, strength: {}",
                net.essid,
                net.net_type,
                net_type_name(net.net_type),
                net.strength
            )?;
        }
        Ok(())
    }

    pub async fn print_configured<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        debug!("print_configured()");
        let networks = client
            .configured_networks()
            .await
            .context("failed to fetch configured networks")?;

        if networks.is_empty() {
            writeln!(out, "No wireless networks configured on card")?;
            return Ok(());
        }

        writeln!(out, "configured wireless networks:")?;
        for net in networks {
            writeln!(out, "'{}'", net.essid)?;
        }
        Ok(())
    }

    pub async fn print_firmware_info<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        let info = client
            .firmware_info()
            .await
            .context("failed to fetch card firmware info")?;

        writeln!(out, "card firmware (len: {}): '{info}'", info.len())?;
        Ok(())
    }

    pub async fn print_card_key<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        debug!("print_card_key()");
        let key = client.card_key().await.context("failed to fetch card key")?;

        writeln!(out, "card key (len: {}): '{key}'", key.len())?;
        Ok(())
    }

    pub async fn print_mac<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        debug!("print_mac()");
        let mac = client
            .mac_address()
            .await
            .context("failed to fetch card mac address")?;

        writeln!(out, "card mac address: {mac}")?;
        Ok(())
    }

    pub async fn print_log<T, W>(client: &T, out: &mut W) -> Result<()>
    where
        T: CardClient,
        W: Write,
    {
        let log = client.card_log().await.context("failed to fetch card log")?;
        debug!("card log: {} bytes", log.len());

        out.write_all(&to_dos_line_endings(&log))?;
        writeln!(out)?;
        Ok(())
    }

    pub async fn reboot<T>(client: &T) -> Result<()>
    where
        T: CardClient,
    {
        info!("rebooting card");
        client.reboot().await.context("failed to reboot card")
    }
}

/// Card log text the way the vendor software shows it: trailing NULs
/// dropped and every `\n` preceded by `\r`
pub fn to_dos_line_endings(log: &[u8]) -> Vec<u8> {
    let end = log.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);

    let mut converted = Vec::with_capacity(end + end / 16);
    for &b in &log[..end] {
        if b == b'\n' {
            converted.push(b'\r');
        }
        converted.push(b);
    }
    converted
}
