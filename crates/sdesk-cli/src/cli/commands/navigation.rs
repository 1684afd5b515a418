//! Menu and dashboard for the logged-in role.

use anyhow::Result;
use sdesk_core::AuthContext;
use sdesk_core::views::{self, BadgeCounts, MenuKey};

use super::require_principal;

pub fn menu(auth: &AuthContext) -> Result<()> {
    let principal = require_principal(auth)?;
    let entries = views::menu_for(principal.role, MenuKey::Dashboard, &BadgeCounts::default());

    println!("{} · {}", principal.name, principal.role.label());
    for entry in entries {
        let badge = entry
            .badge_text()
            .map(|text| format!(" ({text})"))
            .unwrap_or_default();
        println!(
            "  {} {:<18} {}{badge}",
            entry.icon.glyph(),
            entry.label,
            entry.key.as_str()
        );
    }
    Ok(())
}

pub fn dashboard(auth: &AuthContext) -> Result<()> {
    let principal = require_principal(auth)?;
    let kind = views::dashboard_for(principal.role);

    println!("{}", kind.title());
    println!("{}", kind.description());
    println!();
    for card in kind.cards() {
        println!("  ▪ {card}");
    }
    Ok(())
}
