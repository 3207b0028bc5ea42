//! Reply rendering (Telegram HTML subset).

use crate::domain::Item;
use crate::store::ListSummary;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render one list for `/show`.
pub fn render_items(list_name: &str, items: &[Item]) -> String {
    let name = escape_html(list_name);
    if items.is_empty() {
        return format!("🛒 <b>{name}</b> is empty. Add something with /add {name}, Milk");
    }

    let bought = items.iter().filter(|i| i.purchased).count();
    let mut lines = vec![format!(
        "🛒 <b>{name}</b> — {bought} of {} bought",
        items.len()
    )];
    for item in items {
        let mark = if item.purchased { "✅" } else { "⬜" };
        lines.push(format!(
            "{mark} {} — {}",
            escape_html(&item.name),
            escape_html(&item.quantity)
        ));
    }
    lines.join("\n")
}

/// Render the `/lists` overview.
pub fn render_summaries(summaries: &[ListSummary]) -> String {
    if summaries.is_empty() {
        return "You have no lists yet. Create one with /newlist Groceries".to_string();
    }

    let mut lines = vec!["📋 <b>Your lists</b>".to_string()];
    for s in summaries {
        let counts = match s.total {
            0 => "empty".to_string(),
            1 => format!("1 item ({} bought)", s.purchased),
            n => format!("{n} items ({} bought)", s.purchased),
        };
        lines.push(format!("• {} — {counts}", escape_html(&s.name)));
    }
    lines.join("\n")
}
